use anyhow::Context;
use std::path::Path;

/// TraceSample holds the distances of all racers at one point in race time.
#[derive(Debug, Clone)]
pub struct TraceSample {
    pub t_s: f64,
    pub distances: Vec<f64>,
    pub speeds: Vec<f64>,
}

/// RaceTrace records racer progress over the race for post-processing (CSV export, plots).
#[derive(Debug, Clone)]
pub struct RaceTrace {
    pub names: Vec<String>,
    pub samples: Vec<TraceSample>,
    sample_interval_s: f64,
    t_last_sample: Option<f64>,
}

impl RaceTrace {
    pub fn new(names: Vec<String>, sample_interval_s: f64) -> RaceTrace {
        RaceTrace {
            names,
            samples: Vec::new(),
            sample_interval_s,
            t_last_sample: None,
        }
    }

    /// record stores a sample if at least one sample interval passed since the last one.
    pub fn record(&mut self, t_s: f64, distances: &[f64], speeds: &[f64]) -> bool {
        if let Some(t_last) = self.t_last_sample {
            if t_s < t_last + self.sample_interval_s - 1e-9 {
                return false;
            }
        }
        self.force_record(t_s, distances, speeds);
        true
    }

    /// force_record stores a sample regardless of the interval, e.g. at race end.
    pub fn force_record(&mut self, t_s: f64, distances: &[f64], speeds: &[f64]) {
        self.samples.push(TraceSample {
            t_s,
            distances: distances.to_vec(),
            speeds: speeds.to_vec(),
        });
        self.t_last_sample = Some(t_s);
    }

    /// series returns (t, distance) pairs of one racer.
    pub fn series(&self, racer_id: usize) -> Vec<(f64, f64)> {
        self.samples
            .iter()
            .filter_map(|s| s.distances.get(racer_id).map(|&d| (s.t_s, d)))
            .collect()
    }

    /// write_csv writes one row per sample: time, then distance and speed per racer.
    pub fn write_csv(&self, path: &Path) -> anyhow::Result<()> {
        let mut wtr = csv::Writer::from_path(path)
            .context(format!("Failed to create trace file {}!", path.display()))?;

        let mut header = vec!["t_s".to_owned()];
        for name in self.names.iter() {
            header.push(format!("{} distance_m", name));
            header.push(format!("{} speed_mps", name));
        }
        wtr.write_record(&header)?;

        for sample in self.samples.iter() {
            let mut record = vec![format!("{:.3}", sample.t_s)];
            for (distance, speed) in sample.distances.iter().zip(sample.speeds.iter()) {
                record.push(format!("{:.3}", distance));
                record.push(format!("{:.3}", speed));
            }
            wtr.write_record(&record)?;
        }

        wtr.flush()
            .context(format!("Failed to write trace file {}!", path.display()))?;
        Ok(())
    }
}
