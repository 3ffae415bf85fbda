use crate::post::race_result::{RaceResult, ResultEntry};
use helpers::general::{argsort, SortOrder};
use serde::{Deserialize, Serialize};
use tracing::info;

/// One line of the live board.
/// * `place` - 1-based place, tied racers share the place of the racer in front
/// * `tied_with_prev` - True if the racer is within the tie tolerance of the racer in front
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveStanding {
    pub racer_id: usize,
    pub name: String,
    pub distance: f64,
    pub place: u32,
    pub tied_with_prev: bool,
}

/// live_ranking sorts racers descending by distance. Adjacent racers whose distance differs by
/// at most tie_tolerance are reported as tied.
pub fn live_ranking(names: &[String], distances: &[f64], tie_tolerance: f64) -> Vec<LiveStanding> {
    let no_racers = names.len().min(distances.len());
    let idxs_sorted = argsort(&distances[..no_racers], SortOrder::Descending);
    let mut standings: Vec<LiveStanding> = Vec::with_capacity(no_racers);

    for (pos, &idx) in idxs_sorted.iter().enumerate() {
        let (place, tied_with_prev) = match standings.last() {
            Some(prev) if (prev.distance - distances[idx]).abs() <= tie_tolerance => {
                (prev.place, true)
            }
            _ => (pos as u32 + 1, false),
        };

        standings.push(LiveStanding {
            racer_id: idx,
            name: names[idx].to_owned(),
            distance: distances[idx],
            place,
            tied_with_prev,
        });
    }

    standings
}

/// What changed during one ranking observation.
#[derive(Debug, Clone, Default)]
pub struct RankingUpdate {
    pub newly_finished: Vec<usize>,
    pub race_finished: bool,
}

/// RaceRanking detects finishers and produces the final result exactly once per race.
#[derive(Debug, Clone)]
pub struct RaceRanking {
    names: Vec<String>,
    target_distance_m: f64,
    tie_tolerance_m: f64,
    finish_times: Vec<Option<f64>>,
    finish_order: Vec<usize>,
    finalized: bool,
    result: Option<RaceResult>,
}

impl RaceRanking {
    pub fn new(names: Vec<String>, target_distance_m: f64, tie_tolerance_m: f64) -> RaceRanking {
        let no_racers = names.len();
        RaceRanking {
            names,
            target_distance_m,
            tie_tolerance_m,
            finish_times: vec![None; no_racers],
            finish_order: Vec::with_capacity(no_racers),
            finalized: false,
            result: None,
        }
    }

    /// observe captures finish times of racers that reached the target distance and builds the
    /// result once every racer finished. Racers without a distance entry count as not finished.
    pub fn observe(&mut self, distances: &[f64], elapsed_s: f64) -> RankingUpdate {
        let mut update = RankingUpdate::default();

        for (idx, finish_time) in self.finish_times.iter_mut().enumerate() {
            if finish_time.is_some() {
                continue;
            }
            if let Some(&distance) = distances.get(idx) {
                if distance >= self.target_distance_m {
                    *finish_time = Some(elapsed_s);
                    self.finish_order.push(idx);
                    update.newly_finished.push(idx);
                    info!(
                        "{} finished after {:.2}s",
                        self.names[idx], elapsed_s
                    );
                }
            }
        }

        if !self.finalized && self.get_all_finished() {
            self.finalized = true;
            self.result = Some(self.build_result());
            update.race_finished = true;
        }

        update
    }

    pub fn live_ranking(&self, distances: &[f64]) -> Vec<LiveStanding> {
        live_ranking(&self.names, distances, self.tie_tolerance_m)
    }

    pub fn get_all_finished(&self) -> bool {
        !self.finish_times.is_empty() && self.finish_times.iter().all(|t| t.is_some())
    }

    pub fn get_finish_time(&self, racer_id: usize) -> Option<f64> {
        self.finish_times.get(racer_id).copied().flatten()
    }

    pub fn get_result(&self) -> Option<&RaceResult> {
        self.result.as_ref()
    }

    pub fn get_target_distance_m(&self) -> f64 {
        self.target_distance_m
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// clear_result drops the stored result, finish state is kept.
    pub fn clear_result(&mut self) {
        self.result = None;
    }

    /// new_race forgets all finish state so the next race can finalize again. A stored result is
    /// kept until clear_result is called.
    pub fn new_race(&mut self) {
        self.finish_times.iter_mut().for_each(|t| *t = None);
        self.finish_order.clear();
        self.finalized = false;
    }

    fn build_result(&self) -> RaceResult {
        // finish order first, so the stable sort breaks ties by it
        let times: Vec<f64> = self
            .finish_order
            .iter()
            .map(|&idx| self.finish_times[idx].unwrap_or(f64::INFINITY))
            .collect();

        let entries = argsort(&times, SortOrder::Ascending)
            .into_iter()
            .map(|pos| ResultEntry {
                name: self.names[self.finish_order[pos]].to_owned(),
                time_s: times[pos],
            })
            .collect();

        RaceResult {
            entries,
            target_distance_m: self.target_distance_m,
        }
    }
}
