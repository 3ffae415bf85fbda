use crate::core::boost_curve::BoostCurve;
use crate::core::bot_policy::{BotDecision, BotDecisionPolicy, BotRole, Difficulty};
use crate::core::question_pool::{Question, QuestionPool};
use crate::core::race::SessionEvent;
use crate::core::race_clock::{DistanceMode, Odometer};
use crate::core::segment_scheduler::{
    Outcome, PendingQuestion, Resolution, SegmentPars, SegmentScheduler, State,
};
use crate::core::speed_economy::{SpeedEconomy, SpeedPars, StackCounter};
use rand::Rng;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RacerKind {
    Human,
    Bot(BotRole),
}

/// * `name` - Display name, e.g. Player
/// * `color` - Hex color used by the HUD, e.g. #1e90ff
/// * `kind` - Human or bot (with its role)
/// * `start_x` - (units) Start position of the movement proxy
#[derive(Debug, Deserialize, Clone)]
pub struct RacerPars {
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
    pub kind: RacerKind,
    #[serde(default)]
    pub start_x: f64,
}

fn default_color() -> String {
    "#808080".to_owned()
}

#[derive(Debug, Clone)]
pub enum Controller {
    Human,
    Bot {
        role: BotRole,
        policy: BotDecisionPolicy,
        decision: Option<BotDecision>,
    },
}

/// Speed and stack changes caused by one resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionEffect {
    pub stack_changed: bool,
    pub speed_delta: f64,
}

#[derive(Debug, Clone)]
pub struct Racer {
    pub id: usize,
    pub name: String,
    pub color: String,
    pub economy: SpeedEconomy,
    pub stacks: StackCounter,
    pub odometer: Odometer,
    pub scheduler: SegmentScheduler,
    pub pool: QuestionPool,
    pub controller: Controller,
    x: f64,
    start_x: f64,
    retired: bool,
}

impl Racer {
    /// new creates a racer. Bots read the difficulty here, once.
    pub fn new(
        id: usize,
        racer_pars: &RacerPars,
        speed_pars: &SpeedPars,
        segment_pars: &SegmentPars,
        distance_mode: DistanceMode,
        difficulty: Difficulty,
        questions: Vec<Question>,
    ) -> Racer {
        let (controller, scheduler) = match racer_pars.kind {
            RacerKind::Human => (
                Controller::Human,
                SegmentScheduler::new(
                    segment_pars.question_interval_m,
                    Some(segment_pars.question_time_limit_s),
                    segment_pars.max_questions,
                ),
            ),
            RacerKind::Bot(role) => (
                Controller::Bot {
                    role,
                    policy: BotDecisionPolicy::for_role(
                        role,
                        difficulty,
                        segment_pars.question_interval_m,
                    ),
                    decision: None,
                },
                SegmentScheduler::new(
                    segment_pars.question_interval_m,
                    None,
                    segment_pars.bot_segments_to_simulate,
                ),
            ),
        };

        Racer {
            id,
            name: racer_pars.name.to_owned(),
            color: racer_pars.color.to_owned(),
            economy: SpeedEconomy::new(speed_pars),
            stacks: StackCounter::new(speed_pars.max_stacks),
            odometer: Odometer::new(distance_mode, racer_pars.start_x),
            scheduler,
            pool: QuestionPool::new(questions),
            controller,
            x: racer_pars.start_x,
            start_x: racer_pars.start_x,
            retired: false,
        }
    }

    pub fn is_human(&self) -> bool {
        matches!(self.controller, Controller::Human)
    }

    pub fn get_distance(&self) -> f64 {
        self.odometer.get_distance()
    }

    pub fn get_cur_speed(&self) -> f64 {
        self.economy.get_cur_speed()
    }

    pub fn get_x(&self) -> f64 {
        self.x
    }

    pub fn is_retired(&self) -> bool {
        self.retired
    }

    /// advance moves the movement proxy with the current speed and accumulates distance.
    pub fn advance(&mut self, timestep_size: f64) -> f64 {
        let speed = self.economy.get_cur_speed();
        self.x += speed * timestep_size;
        self.odometer.update(self.x, speed, timestep_size)
    }

    /// nudge displaces the movement proxy externally. In positional mode a backward displacement
    /// is never subtracted from the distance.
    pub fn nudge(&mut self, dx: f64) {
        self.x += dx;
    }

    /// update_segments runs the segment logic for one timestep: segment change, opening a
    /// question, time limit and the bot answer.
    pub fn update_segments<R: Rng + ?Sized>(
        &mut self,
        elapsed_s: f64,
        curve: &BoostCurve,
        rng: &mut R,
        events: &mut Vec<SessionEvent>,
    ) {
        if self.retired {
            return;
        }
        let distance = self.get_distance();

        let transition = self.scheduler.observe(distance);
        if let Some(resolution) = transition.resolved {
            self.apply_resolution(resolution, curve, events);
        }

        if transition.entered.is_some() {
            if let Controller::Bot { decision, .. } = &mut self.controller {
                *decision = None;
            }
            self.open_question(elapsed_s, rng, events);
        }

        if let Some(resolution) = self.scheduler.check_time_limit(elapsed_s, distance) {
            self.apply_resolution(resolution, curve, events);
        }

        if let Some(correct) = self.due_bot_answer(distance) {
            if let Some(resolution) = self.scheduler.answer(correct, distance) {
                self.apply_resolution(resolution, curve, events);
            }
        }
    }

    /// submit_answer resolves the pending question of a human racer with the chosen option.
    /// Bots and racers without a pending question ignore the call.
    pub fn submit_answer(
        &mut self,
        option_idx: usize,
        curve: &BoostCurve,
        events: &mut Vec<SessionEvent>,
    ) -> Option<Resolution> {
        if !self.is_human() || self.retired {
            return None;
        }
        let pending = *self.scheduler.get_pending()?;
        let correct = self
            .pool
            .get(pending.question_idx)
            .map_or(false, |q| q.is_correct(option_idx));

        let resolution = self.scheduler.answer(correct, self.get_distance())?;
        self.apply_resolution(resolution, curve, events);
        Some(resolution)
    }

    /// pending_question returns the question the racer currently has to answer.
    pub fn pending_question(&self) -> Option<(&PendingQuestion, &Question)> {
        let pending = self.scheduler.get_pending()?;
        let question = self.pool.get(pending.question_idx)?;
        Some((pending, question))
    }

    /// apply_resolution applies the stack and ledger side effects. A correct answer only boosts
    /// if the stack actually went up, a wrong answer only undoes a boost if the stack went down.
    pub fn apply_resolution(
        &mut self,
        resolution: Resolution,
        curve: &BoostCurve,
        events: &mut Vec<SessionEvent>,
    ) -> ResolutionEffect {
        let effect = match resolution.outcome {
            Outcome::Correct => {
                if self.stacks.try_increase() {
                    let applied = self.economy.apply_boost(curve.boost(resolution.seg_meters));
                    ResolutionEffect {
                        stack_changed: true,
                        speed_delta: applied,
                    }
                } else {
                    ResolutionEffect {
                        stack_changed: false,
                        speed_delta: 0.0,
                    }
                }
            }
            Outcome::Wrong => {
                if self.stacks.try_decrease() {
                    let undone = self.economy.undo_last_boost();
                    ResolutionEffect {
                        stack_changed: true,
                        speed_delta: -undone,
                    }
                } else {
                    // free pass at zero stacks, the segment stays resolved
                    ResolutionEffect {
                        stack_changed: false,
                        speed_delta: 0.0,
                    }
                }
            }
        };

        debug!(
            "{}: segment {} {:?} ({:?}) at {:.1}m -> stacks {}/{}, speed {:.2}",
            self.name,
            resolution.segment_idx,
            resolution.outcome,
            resolution.cause,
            resolution.seg_meters,
            self.stacks.get_cur(),
            self.stacks.get_max(),
            self.economy.get_cur_speed()
        );

        events.push(SessionEvent::SegmentResolved {
            racer_id: self.id,
            resolution,
            effect,
        });
        effect
    }

    /// retire stops contesting segments, e.g. once the racer finished.
    pub fn retire(&mut self) {
        self.retired = true;
        self.scheduler.retire();
        if let Controller::Bot { decision, .. } = &mut self.controller {
            *decision = None;
        }
    }

    pub fn reset(&mut self) {
        self.economy.reset();
        self.stacks.reset();
        self.x = self.start_x;
        self.odometer.reset(self.start_x);
        self.scheduler.reset();
        self.pool.restart();
        self.retired = false;
        if let Controller::Bot { decision, .. } = &mut self.controller {
            *decision = None;
        }
    }

    fn open_question<R: Rng + ?Sized>(
        &mut self,
        elapsed_s: f64,
        rng: &mut R,
        events: &mut Vec<SessionEvent>,
    ) {
        if !self.scheduler.can_open() {
            return;
        }
        let question_idx = match self.pool.draw(rng) {
            Some(idx) => idx,
            None => return,
        };
        let pending = match self.scheduler.open(question_idx, elapsed_s) {
            Some(pending) => pending,
            None => return,
        };

        if let Controller::Bot {
            policy, decision, ..
        } = &mut self.controller
        {
            *decision = Some(policy.decide(rng));
        }

        debug!(
            "{}: question {} shown in segment {}",
            self.name, question_idx, pending.segment_idx
        );
        events.push(SessionEvent::QuestionShown {
            racer_id: self.id,
            segment_idx: pending.segment_idx,
            question_idx,
        });
    }

    /// due_bot_answer returns the planned outcome once the bot reached its answer offset.
    fn due_bot_answer(&self, distance: f64) -> Option<bool> {
        if self.scheduler.get_state() != State::AwaitingAnswer {
            return None;
        }
        match &self.controller {
            Controller::Bot {
                decision: Some(decision),
                ..
            } if self.scheduler.seg_meters(distance) >= decision.answer_offset_m => {
                Some(decision.correct)
            }
            _ => None,
        }
    }
}
