use crate::core::boost_curve::BoostCurve;
use crate::core::bot_policy::Difficulty;
use crate::core::question_pool::Question;
use crate::core::race_clock::{DistanceMode, RaceClock};
use crate::core::racer::{Racer, RacerPars, ResolutionEffect};
use crate::core::ranking::{LiveStanding, RaceRanking};
use crate::core::segment_scheduler::{PendingQuestion, Resolution, SegmentPars};
use crate::core::speed_economy::SpeedPars;
use crate::post::race_result::RaceResult;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use tracing::info;

/// * `target_distance_m` - (m) Finish line distance
/// * `tie_tolerance_m` - (m) Maximum distance delta at which racers are shown as tied
/// * `distance_mode` - How race distance is accumulated (same for all racers)
/// * `difficulty` - Bot difficulty, read once per bot at activation
#[derive(Debug, Deserialize, Clone)]
pub struct RacePars {
    pub target_distance_m: f64,
    pub tie_tolerance_m: f64,
    #[serde(default)]
    pub distance_mode: DistanceMode,
    #[serde(default)]
    pub difficulty: Difficulty,
}

impl Default for RacePars {
    fn default() -> Self {
        RacePars {
            target_distance_m: 500.0,
            tie_tolerance_m: 0.5,
            distance_mode: DistanceMode::default(),
            difficulty: Difficulty::default(),
        }
    }
}

/// Things that happened during a timestep or command, drained by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    QuestionShown {
        racer_id: usize,
        segment_idx: u32,
        question_idx: usize,
    },
    SegmentResolved {
        racer_id: usize,
        resolution: Resolution,
        effect: ResolutionEffect,
    },
    RacerFinished {
        racer_id: usize,
        finish_time_s: f64,
    },
    RaceFinished,
}

/// Read-only view on one racer for presentation collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct RacerView {
    pub id: usize,
    pub name: String,
    pub is_human: bool,
    pub cur_speed: f64,
    pub distance: f64,
    pub stacks: u32,
    pub max_stacks: u32,
    pub finished: bool,
    pub finish_time_s: Option<f64>,
}

/// Question currently shown to a racer.
#[derive(Debug, Clone, PartialEq)]
pub struct ShownQuestion<'a> {
    pub pending: PendingQuestion,
    pub question: &'a Question,
    /// (s) None for racers without a time limit
    pub remaining_s: Option<f64>,
}

/// RaceSession owns all racers of one race and is passed explicitly to every caller. It is
/// driven by simulate_timestep and the command methods.
#[derive(Debug)]
pub struct RaceSession {
    clock: RaceClock,
    racers: Vec<Racer>,
    ranking: RaceRanking,
    boost_curve: BoostCurve,
    rng: StdRng,
    events: Vec<SessionEvent>,
    game_over: bool,
}

impl RaceSession {
    /// new creates a session. Without a seed the RNG is seeded from entropy.
    pub fn new(
        race_pars: &RacePars,
        speed_pars: &SpeedPars,
        boost_curve: &BoostCurve,
        segment_pars: &SegmentPars,
        racer_pars_all: &[RacerPars],
        questions: &[Question],
        seed: Option<u64>,
    ) -> RaceSession {
        let racers: Vec<Racer> = racer_pars_all
            .iter()
            .enumerate()
            .map(|(id, racer_pars)| {
                Racer::new(
                    id,
                    racer_pars,
                    speed_pars,
                    segment_pars,
                    race_pars.distance_mode,
                    race_pars.difficulty,
                    questions.to_vec(),
                )
            })
            .collect();

        let names = racers.iter().map(|r| r.name.to_owned()).collect();

        RaceSession {
            clock: RaceClock::new(),
            racers,
            ranking: RaceRanking::new(
                names,
                race_pars.target_distance_m,
                race_pars.tie_tolerance_m,
            ),
            boost_curve: boost_curve.to_owned(),
            rng: match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            },
            events: Vec::new(),
            game_over: false,
        }
    }

    // ---------------------------------------------------------------------------------------------
    // MAIN METHOD ---------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// simulate_timestep advances the race by timestep_size seconds: movement and distance,
    /// finish detection, then segment handling of all racers still in the race.
    pub fn simulate_timestep(&mut self, timestep_size: f64) {
        if self.game_over {
            return;
        }
        let timestep_size = self.clock.tick(timestep_size);
        if timestep_size <= 0.0 {
            return;
        }
        let elapsed_s = self.clock.get_elapsed_s();

        // update race progress
        for racer in self.racers.iter_mut() {
            racer.advance(timestep_size);
        }

        // handle finishers
        self.handle_finish(elapsed_s);

        // handle segments
        for racer in self.racers.iter_mut() {
            racer.update_segments(elapsed_s, &self.boost_curve, &mut self.rng, &mut self.events);
        }
    }

    // ---------------------------------------------------------------------------------------------
    // COMMANDS ------------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// submit_answer is the human input path. Calls for bots, unknown racers, without a pending
    /// question or after game over are ignored.
    pub fn submit_answer(&mut self, racer_id: usize, option_idx: usize) -> Option<Resolution> {
        if self.game_over {
            return None;
        }
        let racer = self.racers.get_mut(racer_id)?;
        racer.submit_answer(option_idx, &self.boost_curve, &mut self.events)
    }

    /// nudge displaces the movement proxy of a racer (positional distance mode).
    pub fn nudge(&mut self, racer_id: usize, dx: f64) {
        if let Some(racer) = self.racers.get_mut(racer_id) {
            racer.nudge(dx);
        }
    }

    /// new_game resets racers, distances, timers and stacks. A stored result is kept until
    /// clear_results is called.
    pub fn new_game(&mut self) {
        self.clock.reset();
        for racer in self.racers.iter_mut() {
            racer.reset();
        }
        self.ranking.new_race();
        self.events.clear();
        self.game_over = false;
        info!("New game started with {} racers", self.racers.len());
    }

    /// game_over freezes the published speed at zero and halts ticking.
    pub fn game_over(&mut self) {
        self.game_over = true;
        self.clock.halt();
        info!("Game over after {:.2}s", self.clock.get_elapsed_s());
    }

    pub fn clear_results(&mut self) {
        self.ranking.clear_result();
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    // ---------------------------------------------------------------------------------------------
    // READ-ONLY ACCESS ----------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    pub fn get_elapsed_s(&self) -> f64 {
        self.clock.get_elapsed_s()
    }

    pub fn get_no_racers(&self) -> usize {
        self.racers.len()
    }

    pub fn get_racers(&self) -> &[Racer] {
        &self.racers
    }

    pub fn get_human_id(&self) -> Option<usize> {
        self.racers.iter().position(|r| r.is_human())
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn get_all_finished(&self) -> bool {
        self.ranking.get_all_finished()
    }

    pub fn get_result(&self) -> Option<&RaceResult> {
        self.ranking.get_result()
    }

    pub fn get_target_distance_m(&self) -> f64 {
        self.ranking.get_target_distance_m()
    }

    pub fn get_distances(&self) -> Vec<f64> {
        self.racers.iter().map(|r| r.get_distance()).collect()
    }

    /// get_speeds returns the published speeds, all zero after game over.
    pub fn get_speeds(&self) -> Vec<f64> {
        self.racers.iter().map(|r| self.published_speed(r)).collect()
    }

    pub fn racer_view(&self, racer_id: usize) -> Option<RacerView> {
        let racer = self.racers.get(racer_id)?;
        let finish_time_s = self.ranking.get_finish_time(racer_id);

        Some(RacerView {
            id: racer.id,
            name: racer.name.to_owned(),
            is_human: racer.is_human(),
            cur_speed: self.published_speed(racer),
            distance: racer.get_distance(),
            stacks: racer.stacks.get_cur(),
            max_stacks: racer.stacks.get_max(),
            finished: finish_time_s.is_some(),
            finish_time_s,
        })
    }

    pub fn live_ranking(&self) -> Vec<LiveStanding> {
        self.ranking.live_ranking(&self.get_distances())
    }

    pub fn pending_question(&self, racer_id: usize) -> Option<ShownQuestion> {
        let racer = self.racers.get(racer_id)?;
        let (pending, question) = racer.pending_question()?;
        let remaining_s = racer
            .scheduler
            .get_time_limit_s()
            .map(|limit| (limit - (self.clock.get_elapsed_s() - pending.opened_at_s)).max(0.0));

        Some(ShownQuestion {
            pending: *pending,
            question,
            remaining_s,
        })
    }

    // ---------------------------------------------------------------------------------------------
    // METHODS (HELPERS) ---------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    fn handle_finish(&mut self, elapsed_s: f64) {
        let distances = self.get_distances();
        let update = self.ranking.observe(&distances, elapsed_s);

        for racer_id in update.newly_finished {
            self.racers[racer_id].retire();
            self.events.push(SessionEvent::RacerFinished {
                racer_id,
                finish_time_s: elapsed_s,
            });
        }

        if update.race_finished {
            if let Some(result) = self.ranking.get_result() {
                if let Some(winner) = result.get_winner() {
                    info!("Race finished, winner {} in {:.2}s", winner.name, winner.time_s);
                }
            }
            self.events.push(SessionEvent::RaceFinished);
        }
    }

    fn published_speed(&self, racer: &Racer) -> f64 {
        if self.game_over {
            0.0
        } else {
            racer.get_cur_speed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bot_policy::BotRole;
    use crate::core::racer::RacerKind;
    use crate::core::segment_scheduler::{Outcome, ResolutionCause};
    use approx::assert_abs_diff_eq;

    fn racer_pars_all() -> Vec<RacerPars> {
        vec![
            RacerPars {
                name: "Player".to_owned(),
                color: "#1e90ff".to_owned(),
                kind: RacerKind::Human,
                start_x: 0.0,
            },
            RacerPars {
                name: "Bot 1".to_owned(),
                color: "#ff4500".to_owned(),
                kind: RacerKind::Bot(BotRole::Bot1),
                start_x: 0.0,
            },
            RacerPars {
                name: "Bot 2".to_owned(),
                color: "#32cd32".to_owned(),
                kind: RacerKind::Bot(BotRole::Bot2),
                start_x: 0.0,
            },
        ]
    }

    fn questions() -> Vec<Question> {
        (0..4)
            .map(|i| Question {
                text: format!("Question {}", i),
                options: vec!["a".to_owned(), "b".to_owned(), "c".to_owned()],
                correct_idx: i % 3,
            })
            .collect()
    }

    fn session_with(segment_pars: &SegmentPars, seed: u64) -> RaceSession {
        RaceSession::new(
            &RacePars::default(),
            &SpeedPars::default(),
            &BoostCurve::default(),
            segment_pars,
            &racer_pars_all(),
            &questions(),
            Some(seed),
        )
    }

    fn session(seed: u64) -> RaceSession {
        session_with(&SegmentPars::default(), seed)
    }

    fn correct_option(session: &RaceSession) -> usize {
        session.pending_question(0).unwrap().question.correct_idx
    }

    #[test]
    fn human_question_shown_at_segment_start() {
        let mut session = session(1);
        session.simulate_timestep(0.1);

        let prompt = session.pending_question(0).unwrap();
        assert_eq!(prompt.pending.segment_idx, 0);
        assert_abs_diff_eq!(prompt.remaining_s.unwrap(), 10.0);
        let shown = session
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, SessionEvent::QuestionShown { racer_id: 0, .. }))
            .count();
        assert_eq!(shown, 1);
    }

    #[test]
    fn late_correct_answer_near_segment_end() {
        let mut session = session(2);
        session.simulate_timestep(0.1);
        let option = correct_option(&session);
        session.submit_answer(0, option).unwrap();
        assert_eq!(session.racer_view(0).unwrap().stacks, 1);
        assert_abs_diff_eq!(session.racer_view(0).unwrap().cur_speed, 8.0);

        // 0.8m per tick from 0.5m ends at 99.7m, i.e. 49.7m into segment 1
        while session.racer_view(0).unwrap().distance < 99.0 {
            session.simulate_timestep(0.1);
        }
        assert_eq!(session.pending_question(0).unwrap().pending.segment_idx, 1);

        let option = correct_option(&session);
        let resolution = session.submit_answer(0, option).unwrap();
        assert_eq!(resolution.outcome, Outcome::Correct);
        assert!(resolution.seg_meters > 40.0);
        let view = session.racer_view(0).unwrap();
        assert_eq!(view.stacks, 2);
        assert_abs_diff_eq!(view.cur_speed, 8.5, epsilon = 1e-9);
    }

    #[test]
    fn time_limit_resolves_wrong() {
        let segment_pars = SegmentPars {
            question_time_limit_s: 3.0,
            ..SegmentPars::default()
        };
        let mut session = session_with(&segment_pars, 3);
        session.simulate_timestep(0.1);
        session.drain_events();

        for _ in 0..40 {
            session.simulate_timestep(0.1);
        }

        let timed_out = session.drain_events().into_iter().any(|e| {
            matches!(e, SessionEvent::SegmentResolved { racer_id: 0, resolution, .. }
                if resolution.cause == ResolutionCause::TimeLimit && resolution.segment_idx == 0)
        });
        assert!(timed_out);
        assert!(session.pending_question(0).is_none());
        // late answer for the timed out segment is ignored
        assert!(session.submit_answer(0, 0).is_none());
    }

    #[test]
    fn wrong_answer_at_zero_stacks_is_free() {
        let mut session = session(4);
        session.simulate_timestep(0.1);
        let wrong = (correct_option(&session) + 1) % 3;

        let resolution = session.submit_answer(0, wrong).unwrap();
        assert_eq!(resolution.outcome, Outcome::Wrong);
        let view = session.racer_view(0).unwrap();
        assert_eq!(view.stacks, 0);
        assert_abs_diff_eq!(view.cur_speed, 5.0);
        assert!(session.submit_answer(0, wrong).is_none());
    }

    #[test]
    fn bots_cannot_take_human_input() {
        let mut session = session(5);
        session.simulate_timestep(0.1);
        assert!(session.submit_answer(1, 0).is_none());
        assert!(session.submit_answer(2, 0).is_none());
        assert!(session.submit_answer(7, 0).is_none());
    }

    #[test]
    fn race_runs_to_single_result() {
        let mut session = session(6);
        let mut n_race_finished = 0;

        for _ in 0..20_000 {
            session.simulate_timestep(0.05);
            if let Some(prompt) = session.pending_question(0) {
                let option = prompt.question.correct_idx;
                session.submit_answer(0, option);
            }
            n_race_finished += session
                .drain_events()
                .iter()
                .filter(|e| matches!(e, SessionEvent::RaceFinished))
                .count();
        }

        assert_eq!(n_race_finished, 1);
        let result = session.get_result().unwrap();
        assert_eq!(result.entries.len(), 3);
        assert_abs_diff_eq!(result.target_distance_m, 500.0);
        for pair in result.entries.windows(2) {
            assert!(pair[0].time_s <= pair[1].time_s);
        }
        for id in 0..3 {
            let view = session.racer_view(id).unwrap();
            assert!(view.finished);
            assert_eq!(view.stacks as usize, session.get_racers()[id].economy.get_ledger().len());
        }
    }

    #[test]
    fn live_ranking_is_available_every_tick() {
        let mut session = session(7);
        session.simulate_timestep(0.1);
        let standings = session.live_ranking();
        assert_eq!(standings.len(), 3);
        // everyone starts equally fast, so all are tied
        assert!(standings[1].tied_with_prev);
        assert!(standings[2].tied_with_prev);
    }

    #[test]
    fn game_over_freezes_speed_and_ticking() {
        let mut session = session(8);
        session.simulate_timestep(0.1);
        session.game_over();
        let distance = session.racer_view(0).unwrap().distance;

        session.simulate_timestep(0.1);
        let view = session.racer_view(0).unwrap();
        assert_abs_diff_eq!(view.cur_speed, 0.0);
        assert_abs_diff_eq!(view.distance, distance);
        assert!(session.submit_answer(0, 0).is_none());
    }

    #[test]
    fn new_game_resets_everything_but_result() {
        let mut session = session(9);
        while session.get_result().is_none() {
            session.simulate_timestep(0.1);
        }
        session.new_game();

        assert_abs_diff_eq!(session.get_elapsed_s(), 0.0);
        for id in 0..3 {
            let view = session.racer_view(id).unwrap();
            assert_abs_diff_eq!(view.distance, 0.0);
            assert_abs_diff_eq!(view.cur_speed, 5.0);
            assert_eq!(view.stacks, 0);
            assert!(!view.finished);
        }
        assert!(session.get_result().is_some());
        session.clear_results();
        assert!(session.get_result().is_none());

        session.simulate_timestep(0.1);
        assert!(session.pending_question(0).is_some());
    }

    #[test]
    fn empty_question_bank_only_tracks_distance() {
        let mut session = RaceSession::new(
            &RacePars::default(),
            &SpeedPars::default(),
            &BoostCurve::default(),
            &SegmentPars::default(),
            &racer_pars_all(),
            &[],
            Some(10),
        );
        for _ in 0..300 {
            session.simulate_timestep(0.1);
        }
        assert!(session.pending_question(0).is_none());
        assert!(session.drain_events().iter().all(|e| !matches!(
            e,
            SessionEvent::QuestionShown { .. } | SessionEvent::SegmentResolved { .. }
        )));
        assert_abs_diff_eq!(session.racer_view(1).unwrap().distance, 150.0, epsilon = 1e-6);
    }

    #[test]
    fn speed_scaled_race_uses_speed_and_rate() {
        let race_pars = RacePars {
            distance_mode: DistanceMode::SpeedScaled { rate_factor: 2.0 },
            ..RacePars::default()
        };
        let mut session = RaceSession::new(
            &race_pars,
            &SpeedPars::default(),
            &BoostCurve::default(),
            &SegmentPars::default(),
            &racer_pars_all(),
            &questions(),
            Some(11),
        );

        // 5m/s * 2.0 * 0.1s per tick
        session.simulate_timestep(0.1);
        assert_abs_diff_eq!(session.racer_view(0).unwrap().distance, 1.0, epsilon = 1e-9);

        let option = correct_option(&session);
        session.submit_answer(0, option).unwrap();
        session.simulate_timestep(0.1);
        assert_abs_diff_eq!(session.racer_view(0).unwrap().distance, 2.6, epsilon = 1e-9);

        while session.get_result().is_none() {
            session.simulate_timestep(0.1);
        }
        let result = session.get_result().unwrap();
        assert_eq!(result.entries.len(), 3);
        // never slower than 10m/s of distance over 500m
        for entry in result.entries.iter() {
            assert!(entry.time_s <= 50.0 + 0.1 + 1e-9);
        }
    }
}
