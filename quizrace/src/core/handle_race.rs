use crate::core::autopilot::Autopilot;
use crate::core::race::{RaceSession, SessionEvent};
use crate::core::race_clock::DistanceMode;
use crate::interfaces::hud_interface::{
    live_board_lines, QuestionPrompt, RaceState, RacerState, RgbColor, MAX_HUD_UPDATE_FREQUENCY,
};
use crate::post::race_result::RaceResult;
use crate::post::race_trace::RaceTrace;
use crate::pre::read_sim_pars::SimPars;
use anyhow::Context;
use flume::{Receiver, Sender, TryRecvError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::thread::sleep;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const TRACE_SAMPLE_INTERVAL_S: f64 = 0.5;

/// RaceOutput bundles everything a finished race hands over for post-processing.
#[derive(Debug, Clone)]
pub struct RaceOutput {
    pub result: RaceResult,
    pub trace: RaceTrace,
}

/// handle_race creates and simulates a race on the basis of the inserted parameters, and returns
/// the results for post-processing. If a sender is inserted the race runs in real time and
/// publishes HUD snapshots, human answers are then taken from rx_answers. Without a receiver the
/// human racer is played by the autopilot.
pub fn handle_race(
    sim_pars: &SimPars,
    timestep_size: f64,
    seed: Option<u64>,
    print_debug: bool,
    tx: Option<&Sender<RaceState>>,
    rx_answers: Option<&Receiver<usize>>,
    realtime_factor: f64,
) -> anyhow::Result<RaceOutput> {
    let mut session = RaceSession::new(
        &sim_pars.race_pars,
        &sim_pars.speed_pars,
        &sim_pars.boost_pars,
        &sim_pars.segment_pars,
        &sim_pars.racers,
        &sim_pars.questions,
        seed,
    );
    let human_id = session
        .get_human_id()
        .context("Race requires a human racer!")?;

    // the autopilot gets its own generator so bot decisions do not depend on it
    let mut autopilot = Autopilot::new(human_id, &sim_pars.autopilot_pars);
    let mut rng_autopilot = match seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
        None => StdRng::from_entropy(),
    };

    let names = session.get_racers().iter().map(|r| r.name.to_owned()).collect();
    let mut trace = RaceTrace::new(names, TRACE_SAMPLE_INTERVAL_S);
    trace.force_record(0.0, &session.get_distances(), &session.get_speeds());

    let t_race_max = max_race_time(sim_pars);

    // check if sender was inserted -> in that case use real-time simulation for the HUD
    let sim_realtime = tx.is_some();
    let mut t_race_update_print = 0.0;
    let mut t_race_update_hud = f64::NEG_INFINITY;

    while session.get_result().is_none() {
        let t_start = Instant::now();

        // answer the pending question of the human racer
        let answer = match rx_answers {
            Some(rx) => match rx.try_recv() {
                Ok(option_idx) => Some(option_idx),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
            },
            None => autopilot.poll(&session, &mut rng_autopilot),
        };
        if let Some(option_idx) = answer {
            session.submit_answer(human_id, option_idx);
        }

        session.simulate_timestep(timestep_size);
        let elapsed_s = session.get_elapsed_s();
        trace.record(elapsed_s, &session.get_distances(), &session.get_speeds());

        for event in session.drain_events() {
            log_event(&session, &event);
        }

        if print_debug && elapsed_s > t_race_update_print + 0.9999 {
            let standings = session.live_ranking();
            if let Some(leader) = standings.first() {
                info!(
                    "Simulating... Current race time is {:.3}s, leader {} at {:.1}m",
                    elapsed_s, leader.name, leader.distance
                );
            }
            t_race_update_print = elapsed_s;
        }

        if elapsed_s > t_race_max {
            anyhow::bail!(
                "Race did not finish within {:.1}s, check the speed and distance parameters!",
                t_race_max
            );
        }

        if let Some(tx) = tx {
            if elapsed_s > t_race_update_hud + 1.0 / MAX_HUD_UPDATE_FREQUENCY - 0.001 {
                let race_state = build_race_state(&session, human_id)?;
                tx.send(race_state)
                    .context("Failed to send race state to HUD!")?;
                t_race_update_hud = elapsed_s;
            }
        }

        if sim_realtime {
            // sleep until time step is finished in real-time as well (calculation in ms)
            let t_sleep = (timestep_size * 1000.0 / realtime_factor) as i64
                - t_start.elapsed().as_millis() as i64;

            if t_sleep > 0 {
                sleep(Duration::from_millis(t_sleep as u64));
            } else {
                warn!("Could not keep up with real-time!");
            }
        }
    }

    trace.force_record(
        session.get_elapsed_s(),
        &session.get_distances(),
        &session.get_speeds(),
    );
    let result = session
        .get_result()
        .cloned()
        .context("Race finished without a result!")?;

    // after real-time loop finishes, send final result once
    if let Some(tx) = tx {
        let mut final_msg = build_race_state(&session, human_id)?;
        final_msg.final_result = Some(result.clone());
        tx.send(final_msg)
            .context("Failed to send final race result to HUD!")?;
    }

    Ok(RaceOutput { result, trace })
}

/// max_race_time returns an upper bound of the race time. Racers never fall below the base speed,
/// so every racer must have finished by then.
fn max_race_time(sim_pars: &SimPars) -> f64 {
    let rate = match sim_pars.race_pars.distance_mode {
        DistanceMode::Positional { meters_per_unit } => meters_per_unit,
        DistanceMode::SpeedScaled { rate_factor } => rate_factor,
    };
    let min_distance_rate = (sim_pars.speed_pars.base_speed * rate).max(f64::EPSILON);
    1.1 * sim_pars.race_pars.target_distance_m / min_distance_rate + 1.0
}

/// build_race_state creates the HUD snapshot of the current session state.
fn build_race_state(session: &RaceSession, human_id: usize) -> anyhow::Result<RaceState> {
    let mut race_state = RaceState {
        elapsed_s: session.get_elapsed_s(),
        target_distance_m: session.get_target_distance_m(),
        racer_states: Vec::with_capacity(session.get_no_racers()),
        live_board: live_board_lines(&session.live_ranking()),
        prompt: session
            .pending_question(human_id)
            .map(|prompt| QuestionPrompt {
                segment_idx: prompt.pending.segment_idx,
                text: prompt.question.text.to_owned(),
                options: prompt.question.options.to_owned(),
                remaining_s: prompt.remaining_s,
            }),
        final_result: None,
    };

    for racer in session.get_racers().iter() {
        let tmp_color = racer
            .color
            .parse::<css_color_parser::Color>()
            .context("Could not parse hex color!")?;

        if let Some(view) = session.racer_view(racer.id) {
            race_state.racer_states.push(RacerState {
                racer_id: view.id,
                name: view.name,
                color: RgbColor {
                    r: tmp_color.r,
                    g: tmp_color.g,
                    b: tmp_color.b,
                },
                is_human: view.is_human,
                distance: view.distance,
                velocity: view.cur_speed,
                stacks: view.stacks,
                max_stacks: view.max_stacks,
                finished: view.finished,
            });
        }
    }

    Ok(race_state)
}

fn log_event(session: &RaceSession, event: &SessionEvent) {
    let racers = session.get_racers();
    match event {
        SessionEvent::QuestionShown {
            racer_id,
            segment_idx,
            ..
        } => debug!(
            "{} got a question in segment {}",
            racers[*racer_id].name, segment_idx
        ),
        SessionEvent::SegmentResolved {
            racer_id,
            resolution,
            effect,
        } => debug!(
            "{} resolved segment {} as {:?}, speed {:+.2}m/s",
            racers[*racer_id].name, resolution.segment_idx, resolution.outcome, effect.speed_delta
        ),
        SessionEvent::RacerFinished {
            racer_id,
            finish_time_s,
        } => debug!(
            "{} crossed the line after {:.2}s",
            racers[*racer_id].name, finish_time_s
        ),
        SessionEvent::RaceFinished => debug!("All racers finished"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bot_policy::BotRole;
    use crate::core::question_pool::Question;
    use crate::core::racer::{RacerKind, RacerPars};

    fn sim_pars() -> SimPars {
        SimPars {
            racers: vec![
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
            ],
            questions: vec![
                Question {
                    text: "2 + 2".to_owned(),
                    options: vec!["3".to_owned(), "4".to_owned()],
                    correct_idx: 1,
                },
                Question {
                    text: "3 * 3".to_owned(),
                    options: vec!["9".to_owned(), "6".to_owned()],
                    correct_idx: 0,
                },
            ],
            ..SimPars::default()
        }
    }

    #[test]
    fn headless_race_finishes() {
        let output = handle_race(&sim_pars(), 0.05, Some(41), false, None, None, 1.0).unwrap();
        assert_eq!(output.result.entries.len(), 2);
        // never slower than the base speed
        for entry in output.result.entries.iter() {
            assert!(entry.time_s <= 100.0 + 0.05 + 1e-9);
        }
        let last = output.trace.samples.last().unwrap();
        assert!(last.distances.iter().all(|&d| d >= 500.0));
    }

    #[test]
    fn realtime_race_publishes_states() {
        let mut pars = sim_pars();
        pars.race_pars.target_distance_m = 60.0;
        let (tx, rx) = flume::unbounded();
        let (_tx_answers, rx_answers) = flume::unbounded();

        let output =
            handle_race(&pars, 0.1, Some(42), false, Some(&tx), Some(&rx_answers), 1000.0)
                .unwrap();

        let states: Vec<RaceState> = rx.try_iter().collect();
        assert!(states.len() > 2);
        assert!(states.iter().any(|s| s.prompt.is_some()));
        let final_state = states.last().unwrap();
        assert_eq!(final_state.final_result.as_ref(), Some(&output.result));
        assert_eq!(final_state.racer_states.len(), 2);
        assert_eq!(final_state.racer_states[1].color.r, 255);
    }
}
