use crate::core::ranking::LiveStanding;
use crate::post::race_result::{place_label, RaceResult};

pub const MAX_HUD_UPDATE_FREQUENCY: f64 = 20.0;

#[derive(Debug, Clone, Default)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, Default)]
pub struct RacerState {
    pub racer_id: usize,
    pub name: String,
    pub color: RgbColor,
    pub is_human: bool,
    pub distance: f64,
    pub velocity: f64,
    pub stacks: u32,
    pub max_stacks: u32,
    pub finished: bool,
}

/// Question shown to the human player.
#[derive(Debug, Clone, Default)]
pub struct QuestionPrompt {
    pub segment_idx: u32,
    pub text: String,
    pub options: Vec<String>,
    pub remaining_s: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct RaceState {
    pub elapsed_s: f64,
    pub target_distance_m: f64,
    pub racer_states: Vec<RacerState>,
    pub live_board: Vec<String>,

    // pending question of the human player, if any
    pub prompt: Option<QuestionPrompt>,

    // final results payload (sent once when race finishes)
    pub final_result: Option<RaceResult>,
}

/// format_clock formats race time as MM:SS.
pub fn format_clock(elapsed_s: f64) -> String {
    let secs_tot = elapsed_s.max(0.0).floor() as u64;
    format!("{:02}:{:02}", secs_tot / 60, secs_tot % 60)
}

/// live_board_lines groups tied racers into one line, e.g. "1st: Bot 1" or
/// "Tied 2nd: Player & Bot 2".
pub fn live_board_lines(standings: &[LiveStanding]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut group: Vec<&LiveStanding> = Vec::new();

    for standing in standings.iter() {
        if !standing.tied_with_prev && !group.is_empty() {
            lines.push(board_line(&group));
            group.clear();
        }
        group.push(standing);
    }
    if !group.is_empty() {
        lines.push(board_line(&group));
    }

    lines
}

fn board_line(group: &[&LiveStanding]) -> String {
    let label = place_label(group[0].place as usize - 1);
    let names: Vec<&str> = group.iter().map(|s| s.name.as_str()).collect();

    if group.len() > 1 {
        format!("Tied {}: {}", label, names.join(" & "))
    } else {
        format!("{}: {}", label, names[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ranking::live_ranking;

    #[test]
    fn clock_format() {
        assert_eq!(format_clock(0.0), "00:00");
        assert_eq!(format_clock(59.99), "00:59");
        assert_eq!(format_clock(61.0), "01:01");
        assert_eq!(format_clock(3600.0), "60:00");
        assert_eq!(format_clock(-3.0), "00:00");
    }

    #[test]
    fn board_groups_ties() {
        let names = vec!["Player".to_owned(), "Bot 1".to_owned(), "Bot 2".to_owned()];
        let standings = live_ranking(&names, &[120.0, 140.0, 119.8], 0.5);
        assert_eq!(
            live_board_lines(&standings),
            vec!["1st: Bot 1", "Tied 2nd: Player & Bot 2"]
        );

        let standings = live_ranking(&names, &[10.0, 10.0, 10.0], 0.5);
        assert_eq!(
            live_board_lines(&standings),
            vec!["Tied 1st: Player & Bot 1 & Bot 2"]
        );
    }
}
