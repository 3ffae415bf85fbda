use std::fmt::Write;
use std::io::Write as IoWrite;

use serde::{Deserialize, Serialize};

/// ResultEntry is one line of the final classification.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ResultEntry {
    pub name: String,
    pub time_s: f64,
}

/// RaceResult contains the final classification, sorted ascending by finish time, and the target
/// distance the race was run over. It is created once per race and never modified afterwards.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RaceResult {
    pub entries: Vec<ResultEntry>,
    pub target_distance_m: f64,
}

/// place_label returns "1st", "2nd", "3rd", "4th", ... for a 0-based position.
pub fn place_label(pos: usize) -> String {
    let place = pos + 1;
    let suffix = match (place % 10, place % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", place, suffix)
}

impl RaceResult {
    pub fn get_winner(&self) -> Option<&ResultEntry> {
        self.entries.first()
    }

    /// result_lines returns the printable classification, one line per racer.
    pub fn result_lines(&self) -> Vec<String> {
        self.entries
            .iter()
            .enumerate()
            .map(|(pos, entry)| format!("{}: {} - {:.2}s", place_label(pos), entry.name, entry.time_s))
            .collect()
    }

    /// write_results_to_file writes the classification to a text file in output/. Returns the
    /// path to the written file.
    pub fn write_results_to_file(&self, path: Option<&std::path::Path>) -> anyhow::Result<String> {
        let mut content = String::new();
        writeln!(&mut content, "RESULT: Final results over {:.0}m", self.target_distance_m)?;
        for line in self.result_lines() {
            writeln!(&mut content, "{}", line)?;
        }

        let out_dir = std::path::Path::new("output");
        let out_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                std::fs::create_dir_all(out_dir)?;
                out_dir.join("last_run.txt")
            }
        };
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&out_path)?;
        file.write_all(content.as_bytes())?;
        file.flush()?;

        Ok(out_path.to_string_lossy().into_owned())
    }

    /// print_results prints the classification to the console output.
    pub fn print_results(&self) {
        if self.entries.is_empty() {
            println!("RESULT: No results.");
            return;
        }
        println!("RESULT: Final results over {:.0}m", self.target_distance_m);
        for line in self.result_lines() {
            println!("{}", line);
        }
    }
}
