use rand::Rng;
use rand_distr::{Bernoulli, Distribution, Uniform};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Difficulty selected before a race, read once per bot at activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Normal
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "normal" => Ok(Difficulty::Normal),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(format!("unknown difficulty '{}' (easy, normal, hard)", s)),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
        };
        write!(f, "{}", name)
    }
}

/// Correct-answer probabilities of both bot roles for one difficulty.
#[derive(Debug, Clone, Copy)]
pub struct DifficultyTuning {
    pub bot1_correct_chance: f64,
    pub bot2_correct_chance: f64,
}

impl Difficulty {
    pub fn tuning(&self) -> DifficultyTuning {
        match self {
            Difficulty::Easy => DifficultyTuning {
                bot1_correct_chance: 0.50,
                bot2_correct_chance: 0.55,
            },
            Difficulty::Normal => DifficultyTuning {
                bot1_correct_chance: 0.70,
                bot2_correct_chance: 0.75,
            },
            Difficulty::Hard => DifficultyTuning {
                bot1_correct_chance: 0.90,
                bot2_correct_chance: 0.95,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BotRole {
    Bot1,
    Bot2,
}

impl BotRole {
    pub fn correct_chance(&self, difficulty: Difficulty) -> f64 {
        let tuning = difficulty.tuning();
        match self {
            BotRole::Bot1 => tuning.bot1_correct_chance,
            BotRole::Bot2 => tuning.bot2_correct_chance,
        }
    }
}

/// Decision drawn once at segment start.
/// * `correct` - Whether the bot will answer correctly
/// * `answer_offset_m` - (m) In-segment distance at which the bot answers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BotDecision {
    pub correct: bool,
    pub answer_offset_m: f64,
}

#[derive(Debug, Clone)]
pub struct BotDecisionPolicy {
    correct_chance: f64,
    outcome_distr: Bernoulli,
    offset_distr: Uniform<f64>,
}

impl BotDecisionPolicy {
    /// new clamps the probability to [0.0, 1.0]. segment_len must be positive.
    pub fn new(correct_chance: f64, segment_len: f64) -> BotDecisionPolicy {
        let correct_chance = if correct_chance.is_nan() {
            0.0
        } else {
            correct_chance.clamp(0.0, 1.0)
        };

        BotDecisionPolicy {
            correct_chance,
            // probability is clamped to [0, 1] above
            outcome_distr: Bernoulli::new(correct_chance).unwrap(),
            offset_distr: Uniform::new(0.0, segment_len.max(f64::EPSILON)),
        }
    }

    pub fn for_role(role: BotRole, difficulty: Difficulty, segment_len: f64) -> BotDecisionPolicy {
        BotDecisionPolicy::new(role.correct_chance(difficulty), segment_len)
    }

    pub fn get_correct_chance(&self) -> f64 {
        self.correct_chance
    }

    pub fn decide<R: Rng + ?Sized>(&self, rng: &mut R) -> BotDecision {
        BotDecision {
            correct: self.outcome_distr.sample(rng),
            answer_offset_m: self.offset_distr.sample(rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn difficulty_maps_to_probability_pairs() {
        assert_abs_diff_eq!(BotRole::Bot1.correct_chance(Difficulty::Easy), 0.50);
        assert_abs_diff_eq!(BotRole::Bot2.correct_chance(Difficulty::Easy), 0.55);
        assert_abs_diff_eq!(BotRole::Bot1.correct_chance(Difficulty::Normal), 0.70);
        assert_abs_diff_eq!(BotRole::Bot2.correct_chance(Difficulty::Normal), 0.75);
        assert_abs_diff_eq!(BotRole::Bot1.correct_chance(Difficulty::Hard), 0.90);
        assert_abs_diff_eq!(BotRole::Bot2.correct_chance(Difficulty::Hard), 0.95);
    }

    #[test]
    fn difficulty_parses_case_insensitive() {
        assert_eq!("HARD".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert!("nightmare".parse::<Difficulty>().is_err());
    }

    #[test]
    fn offsets_stay_inside_segment() {
        let policy = BotDecisionPolicy::new(0.5, 50.0);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..1000 {
            let decision = policy.decide(&mut rng);
            assert!(decision.answer_offset_m >= 0.0);
            assert!(decision.answer_offset_m < 50.0);
        }
    }

    #[test]
    fn outcome_frequency_follows_probability() {
        let policy = BotDecisionPolicy::for_role(BotRole::Bot2, Difficulty::Hard, 50.0);
        let mut rng = StdRng::seed_from_u64(12);
        let n = 10_000;
        let n_correct = (0..n).filter(|_| policy.decide(&mut rng).correct).count();
        let freq = n_correct as f64 / n as f64;
        assert!((freq - 0.95).abs() < 0.02);
    }

    #[test]
    fn degenerate_probabilities_are_clamped() {
        let mut rng = StdRng::seed_from_u64(13);
        let always = BotDecisionPolicy::new(1.5, 50.0);
        let never = BotDecisionPolicy::new(-0.5, 50.0);
        for _ in 0..100 {
            assert!(always.decide(&mut rng).correct);
            assert!(!never.decide(&mut rng).correct);
        }
    }
}
