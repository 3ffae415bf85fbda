use clap::Parser;
use plotters::prelude::*;
use quizrace::core::handle_race::{handle_race, RaceOutput};
use quizrace::core::racer::RacerKind;
use quizrace::interfaces::hud_interface::{format_clock, RaceState};
use quizrace::post::race_result::place_label;
use quizrace::post::race_trace::RaceTrace;
use quizrace::pre::read_sim_pars::{read_sim_pars, SimPars};
use quizrace::pre::sim_opts::SimOpts;
use rayon::prelude::*;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;
use std::thread;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn export_distance_plot(trace: &RaceTrace, target_distance_m: f64) -> anyhow::Result<String> {
    let out_dir = Path::new("output");
    std::fs::create_dir_all(out_dir)?;
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_secs();
    let out_path = out_dir.join(format!("race_plot_{}.png", ts));

    let t_max = trace
        .samples
        .last()
        .map_or(1.0, |sample| sample.t_s)
        .max(1.0);
    let y_max = target_distance_m * 1.05;

    let root = BitMapBackend::new(&out_path, (1280, 720)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Distance over race time", ("sans-serif", 24).into_font())
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..t_max, 0.0..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Race time in s")
        .y_desc("Distance in m")
        .label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 16))
        .draw()?;

    // finish line
    chart.draw_series(std::iter::once(PathElement::new(
        vec![(0.0, target_distance_m), (t_max, target_distance_m)],
        BLACK.stroke_width(1),
    )))?;

    let palette = Palette99::pick;
    for (i, name) in trace.names.iter().enumerate() {
        chart
            .draw_series(LineSeries::new(trace.series(i), palette(i)))?
            .label(name.to_owned())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], palette(i)));
    }

    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .background_style(&WHITE.mix(0.8))
        .label_font(("sans-serif", 16))
        .position(plotters::chart::SeriesLabelPosition::LowerRight)
        .draw()?;

    root.present()?;
    Ok(out_path.to_string_lossy().into_owned())
}

fn run_batch(sim_pars: &SimPars, sim_opts: &SimOpts) -> anyhow::Result<()> {
    println!(
        "INFO: Running {} simulations in parallel...",
        sim_opts.no_sim_runs
    );
    let t_start = Instant::now();

    let outputs: Vec<RaceOutput> = (0..sim_opts.no_sim_runs as u64)
        .into_par_iter()
        .map(|run| {
            handle_race(
                sim_pars,
                sim_opts.timestep_size,
                sim_opts.seed.map(|seed| seed.wrapping_add(run)),
                false,
                None,
                None,
                1.0,
            )
        })
        .collect::<anyhow::Result<Vec<RaceOutput>>>()?;

    println!(
        "INFO: Execution time: {}ms",
        t_start.elapsed().as_millis()
    );

    let mut no_wins: HashMap<&str, u32> = HashMap::new();
    let mut t_sums: HashMap<&str, f64> = HashMap::new();
    for output in outputs.iter() {
        if let Some(winner) = output.result.get_winner() {
            *no_wins.entry(winner.name.as_str()).or_insert(0) += 1;
        }
        for entry in output.result.entries.iter() {
            *t_sums.entry(entry.name.as_str()).or_insert(0.0) += entry.time_s;
        }
    }

    println!("RESULT: Wins and mean finish times over {} runs", outputs.len());
    for racer_pars in sim_pars.racers.iter() {
        let name = racer_pars.name.as_str();
        println!(
            "{}: {} wins, mean time {:.2}s",
            name,
            no_wins.get(name).copied().unwrap_or(0),
            t_sums.get(name).copied().unwrap_or(0.0) / outputs.len().max(1) as f64
        );
    }
    Ok(())
}

fn run_single(sim_pars: &SimPars, sim_opts: &SimOpts) -> anyhow::Result<()> {
    println!("INFO: Running simulation without interaction...");
    let t_start = Instant::now();

    let output = handle_race(
        sim_pars,
        sim_opts.timestep_size,
        sim_opts.seed,
        sim_opts.debug,
        None,
        None,
        1.0,
    )?;

    println!(
        "INFO: Execution time: {}ms",
        t_start.elapsed().as_millis()
    );

    output.result.print_results();
    let results_path = output.result.write_results_to_file(None)?;
    println!("INFO: Results written to {}", results_path);

    let trace_path = Path::new("output").join("last_trace.csv");
    output.trace.write_csv(&trace_path)?;
    println!("INFO: Trace written to {}", trace_path.display());

    match export_distance_plot(&output.trace, sim_pars.race_pars.target_distance_m) {
        Ok(path) => println!("INFO: Plot written to {}", path),
        Err(e) => eprintln!("WARNING: Could not write plot: {}", e),
    }
    Ok(())
}

fn print_hud(race_state: &RaceState) {
    let stacks = race_state
        .racer_states
        .iter()
        .find(|s| s.is_human)
        .map_or(String::new(), |s| {
            format!(" | {:.1}m/s, stacks {}/{}", s.velocity, s.stacks, s.max_stacks)
        });
    println!(
        "[{}] {}{}",
        format_clock(race_state.elapsed_s),
        race_state.live_board.join(" | "),
        stacks
    );
}

fn run_interactive(sim_pars: &SimPars, sim_opts: &SimOpts) -> anyhow::Result<()> {
    println!("INFO: Starting interactive race, answer with the option number and Enter...");

    let (tx, rx) = flume::unbounded::<RaceState>();
    let (tx_answers, rx_answers) = flume::unbounded::<usize>();

    let sim_pars_thread = sim_pars.clone();
    let sim_opts_thread = sim_opts.clone();
    let h_sim = thread::spawn(move || {
        handle_race(
            &sim_pars_thread,
            sim_opts_thread.timestep_size,
            sim_opts_thread.seed,
            false,
            Some(&tx),
            Some(&rx_answers),
            sim_opts_thread.realtime_factor,
        )
    });

    // console input, options are entered 1-based
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines().flatten() {
            match line.trim().parse::<usize>() {
                Ok(option_no) if option_no >= 1 => {
                    if tx_answers.send(option_no - 1).is_err() {
                        break;
                    }
                }
                _ => println!("WARNING: Please enter an option number"),
            }
        }
    });

    let mut last_prompt_segment = None;
    let mut t_last_hud = f64::NEG_INFINITY;

    for race_state in rx.iter() {
        if let Some(result) = &race_state.final_result {
            print_hud(&race_state);
            result.print_results();
            let human_name = sim_pars
                .racers
                .iter()
                .find(|r| r.kind == RacerKind::Human)
                .map(|r| r.name.as_str());
            if let Some(pos) = result
                .entries
                .iter()
                .position(|e| Some(e.name.as_str()) == human_name)
            {
                println!("INFO: You finished {}", place_label(pos));
            }
            let results_path = result.write_results_to_file(None)?;
            println!("INFO: Results written to {}", results_path);
            break;
        }

        match &race_state.prompt {
            Some(prompt) if last_prompt_segment != Some(prompt.segment_idx) => {
                println!("QUESTION: {}", prompt.text);
                for (i, option) in prompt.options.iter().enumerate() {
                    println!("  {}) {}", i + 1, option);
                }
                if let Some(remaining_s) = prompt.remaining_s {
                    println!("  ({:.0}s left)", remaining_s);
                }
                last_prompt_segment = Some(prompt.segment_idx);
            }
            _ => {}
        }

        if race_state.elapsed_s > t_last_hud + 0.9999 {
            print_hud(&race_state);
            t_last_hud = race_state.elapsed_s;
        }
    }

    match h_sim.join() {
        Ok(res) => {
            res?;
        }
        Err(_) => anyhow::bail!("Simulation thread panicked!"),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // PRE-PROCESSING ------------------------------------------------------------------------------
    // get simulation options from the command line arguments
    let sim_opts: SimOpts = SimOpts::parse();

    let default_filter = if sim_opts.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .compact()
        .init();

    if !(0.001..=1.0).contains(&sim_opts.timestep_size) {
        anyhow::bail!(
            "Timestep size {}s is outside the range [0.001, 1.0]!",
            sim_opts.timestep_size
        );
    }
    if !(sim_opts.realtime_factor > 0.0) {
        anyhow::bail!("Real-time factor must be positive!");
    }

    // get simulation parameters
    println!(
        "INFO: Reading simulation parameters from {:?}",
        sim_opts.parfile_path
    );
    let mut sim_pars = read_sim_pars(&sim_opts.parfile_path)?;
    if let Some(difficulty) = sim_opts.difficulty {
        sim_pars.race_pars.difficulty = difficulty;
    }
    sim_pars.validate()?;

    // print race details
    println!(
        "INFO: Simulating a {:.0}m race with {} racers, {} questions and {} bots, time step size {:.3}s",
        sim_pars.race_pars.target_distance_m,
        sim_pars.racers.len(),
        sim_pars.questions.len(),
        sim_pars.race_pars.difficulty,
        sim_opts.timestep_size
    );

    // EXECUTION -----------------------------------------------------------------------------------
    if sim_opts.interactive {
        run_interactive(&sim_pars, &sim_opts)
    } else if sim_opts.no_sim_runs > 1 {
        run_batch(&sim_pars, &sim_opts)
    } else {
        run_single(&sim_pars, &sim_opts)
    }
}
