use crate::core::autopilot::AutopilotPars;
use crate::core::boost_curve::BoostCurve;
use crate::core::question_pool::Question;
use crate::core::race::RacePars;
use crate::core::race_clock::DistanceMode;
use crate::core::racer::{RacerKind, RacerPars};
use crate::core::segment_scheduler::SegmentPars;
use crate::core::speed_economy::SpeedPars;
use anyhow::Context;
use helpers::general::InputValueError;
use serde::Deserialize;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::warn;

/// SimPars is used to store all other parameter structs.
#[derive(Debug, Deserialize, Clone)]
pub struct SimPars {
    pub race_pars: RacePars,
    #[serde(default)]
    pub speed_pars: SpeedPars,
    #[serde(default)]
    pub boost_pars: BoostCurve,
    #[serde(default)]
    pub segment_pars: SegmentPars,
    #[serde(default)]
    pub autopilot_pars: AutopilotPars,
    pub racers: Vec<RacerPars>,
    #[serde(default)]
    pub questions: Vec<Question>,
    /// Question bank file, relative to the parameter file, used if `questions` is empty
    #[serde(default)]
    pub question_file: Option<PathBuf>,
}

/// QuestionBank is the content of a question bank file.
#[derive(Debug, Deserialize, Clone)]
pub struct QuestionBank {
    pub questions: Vec<Question>,
}

impl Default for SimPars {
    fn default() -> Self {
        SimPars {
            race_pars: RacePars::default(),
            speed_pars: SpeedPars::default(),
            boost_pars: BoostCurve::default(),
            segment_pars: SegmentPars::default(),
            autopilot_pars: AutopilotPars::default(),
            racers: Vec::new(),
            questions: Vec::new(),
            question_file: None,
        }
    }
}

impl SimPars {
    /// validate checks the parameters for values the race cannot be run with.
    pub fn validate(&self) -> Result<(), InputValueError> {
        let race_pars = &self.race_pars;
        if !(race_pars.target_distance_m > 0.0) {
            return Err(InputValueError::new("target distance must be positive"));
        }
        if !(race_pars.tie_tolerance_m >= 0.0) {
            return Err(InputValueError::new("tie tolerance must not be negative"));
        }
        match race_pars.distance_mode {
            DistanceMode::Positional { meters_per_unit } if !(meters_per_unit > 0.0) => {
                return Err(InputValueError::new("meters per unit must be positive"));
            }
            DistanceMode::SpeedScaled { rate_factor } if !(rate_factor > 0.0) => {
                return Err(InputValueError::new("rate factor must be positive"));
            }
            _ => {}
        }

        let speed_pars = &self.speed_pars;
        if !(speed_pars.base_speed > 0.0) {
            return Err(InputValueError::new("base speed must be positive"));
        }
        if speed_pars.max_speed < speed_pars.base_speed {
            return Err(InputValueError::new(
                "max speed must not be below the base speed",
            ));
        }

        let boost_pars = &self.boost_pars;
        // a correct answer must always leave a ledger entry for its stack
        if !(boost_pars.min_boost_late > 0.0) || !(boost_pars.max_boost_early > 0.0) {
            return Err(InputValueError::new("boosts must be positive"));
        }
        if boost_pars.min_boost_late > boost_pars.max_boost_early {
            return Err(InputValueError::new(
                "late boost must not exceed the early boost",
            ));
        }
        if boost_pars.early_window_m < 0.0 || boost_pars.late_clamp_m < boost_pars.early_window_m
        {
            return Err(InputValueError::new(
                "late clamp must not be before the early window",
            ));
        }

        let segment_pars = &self.segment_pars;
        if !(segment_pars.question_interval_m > 0.0) {
            return Err(InputValueError::new("question interval must be positive"));
        }
        if !(segment_pars.question_time_limit_s > 0.0) {
            return Err(InputValueError::new("question time limit must be positive"));
        }

        let autopilot_pars = &self.autopilot_pars;
        if !(0.0..=1.0).contains(&autopilot_pars.correct_chance) {
            return Err(InputValueError::new(
                "autopilot correct chance must be in the range [0.0, 1.0]",
            ));
        }
        if !autopilot_pars.reaction_mean_s.is_finite() || !(autopilot_pars.reaction_std_s >= 0.0)
        {
            return Err(InputValueError::new(
                "autopilot reaction time parameters are invalid",
            ));
        }

        let no_humans = self
            .racers
            .iter()
            .filter(|racer_pars| racer_pars.kind == RacerKind::Human)
            .count();
        if no_humans != 1 {
            return Err(InputValueError::new(format!(
                "exactly one human racer is required, found {}",
                no_humans
            )));
        }
        for racer_pars in self.racers.iter() {
            if racer_pars.color.parse::<css_color_parser::Color>().is_err() {
                return Err(InputValueError::new(format!(
                    "could not parse color {} of racer {}",
                    racer_pars.color, racer_pars.name
                )));
            }
        }

        for (idx, question) in self.questions.iter().enumerate() {
            if question.options.is_empty() {
                return Err(InputValueError::new(format!(
                    "question {} has no options",
                    idx
                )));
            }
            if question.correct_idx >= question.options.len() {
                return Err(InputValueError::new(format!(
                    "question {} has correct index {} but only {} options",
                    idx,
                    question.correct_idx,
                    question.options.len()
                )));
            }
        }

        // boosts are clamped at max speed, the ledger then holds less than a full boost
        let speed_reach =
            speed_pars.base_speed + speed_pars.max_stacks as f64 * boost_pars.max_boost_early;
        if speed_reach > speed_pars.max_speed {
            warn!(
                "Full stacks can reach {:.1}m/s which is clamped at the max speed of {:.1}m/s",
                speed_reach, speed_pars.max_speed
            );
        }
        if self.questions.is_empty() {
            warn!("Question bank is empty, racers will not get any questions");
        }

        Ok(())
    }
}

/// read_sim_pars reads the JSON file and decodes the JSON string into the simulation parameters
/// struct. If the file references a question bank instead of inline questions, the bank is read
/// relative to the directory of the parameter file.
pub fn read_sim_pars(filepath: &Path) -> anyhow::Result<SimPars> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open parameter file {}!",
            filepath.display()
        ))?;
    let mut pars: SimPars = serde_json::from_reader(&fh).context(format!(
        "Failed to parse parameter file {}!",
        filepath.display()
    ))?;

    if pars.questions.is_empty() {
        if let Some(question_file) = &pars.question_file {
            let bank_path = match filepath.parent() {
                Some(dir) => dir.join(question_file),
                None => question_file.to_owned(),
            };
            pars.questions = read_question_bank(&bank_path)?.questions;
        }
    }

    Ok(pars)
}

/// read_question_bank reads a question bank file of the form { "questions": [...] }.
pub fn read_question_bank(filepath: &Path) -> anyhow::Result<QuestionBank> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open question bank file {}!",
            filepath.display()
        ))?;
    let bank = serde_json::from_reader(&fh).context(format!(
        "Failed to parse question bank file {}!",
        filepath.display()
    ))?;
    Ok(bank)
}
