use crate::core::bot_policy::Difficulty;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(
    version = "0.1.0",
    author = "Alexander Heilmeier <alexander.heilmeier@tum.de>",
    name = "QR-TD",
    about = "A time-discrete quiz race simulator written in Rust"
)]
pub struct SimOpts {
    // FLAGS ---------------------------------------------------------------------------------------
    /// Activate debug printing
    #[clap(short, long)]
    pub debug: bool,

    /// Activate interactive mode - race will be simulated in real-time and questions are
    /// answered on the console
    #[clap(short, long)]
    pub interactive: bool,

    // OPTIONS -------------------------------------------------------------------------------------
    /// Set number of simulation runs (only for non-interactive mode)
    #[clap(short, long, default_value = "1")]
    pub no_sim_runs: u32,

    /// Set path to the simulation parameter file
    #[clap(short, long, default_value = "input/parameters/quiz_race.json")]
    pub parfile_path: PathBuf,

    /// Set real-time factor (only relevant in interactive mode)
    #[clap(short, long, default_value = "1.0")]
    pub realtime_factor: f64,

    /// Set simulation timestep size in seconds, should be in the range [0.001, 1.0]
    #[clap(short, long, default_value = "0.05")]
    pub timestep_size: f64,

    /// Override the bot difficulty of the parameter file (easy, normal, hard)
    #[clap(long)]
    pub difficulty: Option<Difficulty>,

    /// Set the random seed, runs are reproducible if set
    #[clap(short, long)]
    pub seed: Option<u64>,
}
