use serde::{Deserialize, Serialize};

/// * `question_interval_m` - (m) Segment length, one quiz opportunity per segment
/// * `question_time_limit_s` - (s) Time the human racer has to answer a shown question
/// * `max_questions` - Total number of questions the human racer is asked per race
/// * `bot_segments_to_simulate` - Number of segments a bot contests per race
#[derive(Debug, Deserialize, Clone)]
pub struct SegmentPars {
    pub question_interval_m: f64,
    pub question_time_limit_s: f64,
    pub max_questions: u32,
    pub bot_segments_to_simulate: u32,
}

impl Default for SegmentPars {
    fn default() -> Self {
        SegmentPars {
            question_interval_m: 50.0,
            question_time_limit_s: 10.0,
            max_questions: 10,
            bot_segments_to_simulate: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    AwaitingAnswer,
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Correct,
    Wrong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionCause {
    Answered,
    TimeLimit,
    SegmentEnd,
}

/// Resolution of one segment. `seg_meters` is the in-segment distance at resolution time and
/// drives the distance-scaled boost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub segment_idx: u32,
    pub outcome: Outcome,
    pub cause: ResolutionCause,
    pub seg_meters: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingQuestion {
    pub segment_idx: u32,
    pub question_idx: usize,
    pub opened_at_s: f64,
}

/// Result of observing a new distance value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SegmentTransition {
    /// previous segment resolved as wrong because it ended unanswered
    pub resolved: Option<Resolution>,
    /// index of the segment that was entered
    pub entered: Option<u32>,
}

/// SegmentScheduler tracks in which distance segment a racer is and makes sure that every segment
/// is resolved at most once, either by an answer, by the time limit or by the segment ending.
#[derive(Debug, Clone)]
pub struct SegmentScheduler {
    // parameters
    segment_len: f64,
    time_limit_s: Option<f64>,
    max_questions: u32,

    // segment tracking
    cur_segment: Option<u32>,
    segment_start_m: f64,
    state: State,
    pending: Option<PendingQuestion>,
    questions_asked: u32,
    locked: bool,
}

impl SegmentScheduler {
    /// time_limit_s is None for racers without a countdown (bots).
    pub fn new(segment_len: f64, time_limit_s: Option<f64>, max_questions: u32) -> SegmentScheduler {
        SegmentScheduler {
            segment_len,
            time_limit_s,
            max_questions,
            cur_segment: None,
            segment_start_m: 0.0,
            state: State::Idle,
            pending: None,
            questions_asked: 0,
            locked: false,
        }
    }

    /// segment_idx returns the 0-based segment index of a distance, floor(distance / L).
    pub fn segment_idx(&self, distance: f64) -> u32 {
        if !(distance > 0.0) {
            return 0;
        }
        (distance / self.segment_len).floor() as u32
    }

    /// observe checks for a segment change. An unanswered question of the segment that is left is
    /// resolved as wrong. Segments skipped within one step are never opened.
    pub fn observe(&mut self, distance: f64) -> SegmentTransition {
        let seg = self.segment_idx(distance);

        if let Some(cur) = self.cur_segment {
            if seg <= cur {
                return SegmentTransition::default();
            }
        }

        let resolved = if self.state == State::AwaitingAnswer {
            self.resolve(Outcome::Wrong, ResolutionCause::SegmentEnd, distance)
        } else {
            None
        };

        self.cur_segment = Some(seg);
        self.segment_start_m = seg as f64 * self.segment_len;
        self.state = State::Idle;
        self.pending = None;

        SegmentTransition {
            resolved,
            entered: Some(seg),
        }
    }

    /// can_open returns true if a question may be opened for the current segment.
    pub fn can_open(&self) -> bool {
        !self.locked
            && self.state == State::Idle
            && self.cur_segment.is_some()
            && self.questions_asked < self.max_questions
    }

    /// open starts waiting for an answer. Reaching the question cap locks the scheduler for all
    /// following segments.
    pub fn open(&mut self, question_idx: usize, elapsed_s: f64) -> Option<PendingQuestion> {
        if !self.can_open() {
            return None;
        }
        let segment_idx = self.cur_segment?;

        let pending = PendingQuestion {
            segment_idx,
            question_idx,
            opened_at_s: elapsed_s,
        };
        self.pending = Some(pending);
        self.state = State::AwaitingAnswer;
        self.questions_asked += 1;

        if self.questions_asked >= self.max_questions {
            self.locked = true;
        }

        Some(pending)
    }

    /// check_time_limit resolves a pending question as wrong once the time limit elapsed.
    pub fn check_time_limit(&mut self, elapsed_s: f64, distance: f64) -> Option<Resolution> {
        let limit = self.time_limit_s?;
        let pending = self.pending?;

        if self.state == State::AwaitingAnswer && elapsed_s - pending.opened_at_s >= limit {
            self.resolve(Outcome::Wrong, ResolutionCause::TimeLimit, distance)
        } else {
            None
        }
    }

    /// answer resolves the pending question. Answers without a pending question are ignored.
    pub fn answer(&mut self, correct: bool, distance: f64) -> Option<Resolution> {
        let outcome = if correct {
            Outcome::Correct
        } else {
            Outcome::Wrong
        };
        self.resolve(outcome, ResolutionCause::Answered, distance)
    }

    /// retire stops the scheduler for good and drops a pending question without resolving it.
    pub fn retire(&mut self) {
        self.locked = true;
        self.pending = None;
        self.state = State::Idle;
    }

    pub fn reset(&mut self) {
        self.cur_segment = None;
        self.segment_start_m = 0.0;
        self.state = State::Idle;
        self.pending = None;
        self.questions_asked = 0;
        self.locked = false;
    }

    /// seg_meters returns the in-segment distance, clamped to [0, L].
    pub fn seg_meters(&self, distance: f64) -> f64 {
        (distance - self.segment_start_m).clamp(0.0, self.segment_len)
    }

    pub fn get_state(&self) -> State {
        self.state
    }

    pub fn get_pending(&self) -> Option<&PendingQuestion> {
        self.pending.as_ref()
    }

    pub fn get_cur_segment(&self) -> Option<u32> {
        self.cur_segment
    }

    pub fn get_questions_asked(&self) -> u32 {
        self.questions_asked
    }

    pub fn get_time_limit_s(&self) -> Option<f64> {
        self.time_limit_s
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    fn resolve(
        &mut self,
        outcome: Outcome,
        cause: ResolutionCause,
        distance: f64,
    ) -> Option<Resolution> {
        if self.state != State::AwaitingAnswer {
            return None;
        }
        let pending = self.pending.take()?;
        self.state = State::Resolved;

        Some(Resolution {
            segment_idx: pending.segment_idx,
            outcome,
            cause,
            seg_meters: self.seg_meters(distance),
        })
    }
}
