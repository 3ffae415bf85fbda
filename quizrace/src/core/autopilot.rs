use crate::core::race::RaceSession;
use rand::Rng;
use rand_distr::{Bernoulli, Distribution, Normal};
use serde::Deserialize;

/// Smallest reaction time the autopilot can draw.
const MIN_REACTION_S: f64 = 0.3;

/// * `correct_chance` - (-) Probability that the autopilot picks the correct option
/// * `reaction_mean_s` - (s) Mean time between question display and answer
/// * `reaction_std_s` - (s) Standard deviation of the reaction time
#[derive(Debug, Deserialize, Clone)]
pub struct AutopilotPars {
    pub correct_chance: f64,
    pub reaction_mean_s: f64,
    pub reaction_std_s: f64,
}

impl Default for AutopilotPars {
    fn default() -> Self {
        AutopilotPars {
            correct_chance: 0.7,
            reaction_mean_s: 4.0,
            reaction_std_s: 1.5,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PlannedAnswer {
    segment_idx: u32,
    answer_at_s: f64,
    correct: bool,
}

/// Autopilot plays the human racer in headless races. It only talks to the session through
/// the same submit path a real player uses.
#[derive(Debug, Clone)]
pub struct Autopilot {
    racer_id: usize,
    correct_dist: Bernoulli,
    reaction_dist: Normal<f64>,
    planned: Option<PlannedAnswer>,
}

impl Autopilot {
    pub fn new(racer_id: usize, autopilot_pars: &AutopilotPars) -> Autopilot {
        Autopilot {
            racer_id,
            // probability is clamped to [0, 1], standard deviation to >= 0
            correct_dist: Bernoulli::new(autopilot_pars.correct_chance.clamp(0.0, 1.0)).unwrap(),
            reaction_dist: Normal::new(
                autopilot_pars.reaction_mean_s,
                autopilot_pars.reaction_std_s.max(0.0),
            )
            .unwrap(),
            planned: None,
        }
    }

    pub fn get_racer_id(&self) -> usize {
        self.racer_id
    }

    /// poll returns the option to submit once the planned reaction time for the currently shown
    /// question has passed. A new plan is drawn whenever a question of another segment shows up.
    pub fn poll<R: Rng + ?Sized>(&mut self, session: &RaceSession, rng: &mut R) -> Option<usize> {
        let prompt = session.pending_question(self.racer_id)?;
        let segment_idx = prompt.pending.segment_idx;

        let planned = match self.planned {
            Some(planned) if planned.segment_idx == segment_idx => planned,
            _ => {
                let planned = PlannedAnswer {
                    segment_idx,
                    answer_at_s: prompt.pending.opened_at_s
                        + self.reaction_dist.sample(rng).max(MIN_REACTION_S),
                    correct: self.correct_dist.sample(rng),
                };
                self.planned = Some(planned);
                planned
            }
        };

        if session.get_elapsed_s() < planned.answer_at_s {
            return None;
        }

        let question = prompt.question;
        if planned.correct {
            Some(question.correct_idx)
        } else {
            Some((question.correct_idx + 1) % question.options.len().max(2))
        }
    }

    pub fn reset(&mut self) {
        self.planned = None;
    }
}
