use clap::Parser;
use std::path::PathBuf;

use intersection_rl::communication::headless::HeadlessPresenter;
use intersection_rl::global_variables::DEFAULT_STORE_PATH;
use intersection_rl::monitoring::persistence::FileStore;
use intersection_rl::monitoring::report::RunReport;
use intersection_rl::simulation_engine::simulation::{run_simulation, EngineHandle, RunOptions};
use intersection_rl::{Engine, SimConfig};

#[derive(Debug, Parser)]
#[command(
    name = "intersection_sim",
    about = "Runs the four-way intersection simulation with a learning signal controller"
)]
struct Args {
    /// JSON config file; missing fields use built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where learned values and session time are kept between runs.
    #[arg(long, default_value = DEFAULT_STORE_PATH)]
    store: PathBuf,

    /// Ticks per wall-clock second (overrides the config file).
    #[arg(long)]
    speed: Option<u32>,

    /// Stop after this many ticks.
    #[arg(long)]
    ticks: Option<u64>,

    /// Do not wait between ticks.
    #[arg(long)]
    fast: bool,

    /// Seed for a reproducible run.
    #[arg(long)]
    seed: Option<u64>,

    /// Write report.csv and reward.png into this directory.
    #[arg(long)]
    report_dir: Option<PathBuf>,

    /// Sample the report every N ticks.
    #[arg(long, default_value_t = 100)]
    report_every: u64,

    /// Export the event log as CSV on exit.
    #[arg(long)]
    log_csv: Option<PathBuf>,

    #[arg(long, default_value_t = 30)]
    autosave_secs: u64,

    /// Start the session timer from zero, in memory and in the store.
    #[arg(long)]
    clear_session_time: bool,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match SimConfig::from_json_file(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Could not load {}: {}. Using defaults.", path.display(), e);
                SimConfig::default()
            }
        },
        None => SimConfig::default(),
    };
    if let Some(speed) = args.speed {
        config.sim_speed = speed.max(1);
    }

    let mut engine = match args.seed {
        Some(seed) => Engine::seeded(config, seed),
        None => Engine::from_entropy(config),
    };
    let mut store = FileStore::new(&args.store);
    let loaded = engine.load_from(&store);
    log::info!(
        "Starting with {} learned states and {}s of previous session time",
        loaded.merged_entries,
        engine.session_seconds()
    );

    let handle = EngineHandle::new();
    handle.install(engine);
    if args.clear_session_time && handle.clear_session_time(&mut store) {
        log::info!("Session time cleared");
    }

    let mut presenter = HeadlessPresenter::new();
    let mut report = RunReport::new(args.report_every);
    let options = RunOptions {
        max_ticks: args.ticks,
        fast: args.fast,
        autosave_secs: args.autosave_secs,
    };
    let ticks = run_simulation(handle.clone(), options, &mut presenter, &mut store, &mut report).await;

    if let Some(snapshot) = handle.snapshot() {
        println!("Ticks run: {}", ticks);
        println!("Cumulative reward: {:.2}", snapshot.cumulative_reward);
        println!("Average wait: {:.2} vehicles/tick", snapshot.stats.average_wait);
        println!("Cars passed: {}", snapshot.stats.cars_passed);
        println!(
            "Emergencies crossed/crashed/waited: {}/{}/{}",
            snapshot.emergency_stats.crossed,
            snapshot.emergency_stats.crashed,
            snapshot.emergency_stats.waited
        );
    }

    if let Some(dir) = &args.report_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            log::warn!("Could not create {}: {}", dir.display(), e);
        } else {
            if let Err(e) = report.write_csv(dir.join("report.csv")) {
                log::warn!("Report CSV failed: {}", e);
            }
            if let Err(e) = report.plot_reward_curve(dir.join("reward.png")) {
                log::warn!("Reward chart failed: {}", e);
            }
        }
    }

    if let Some(path) = &args.log_csv {
        let exported = handle.with_engine(|engine| engine.event_log().write_csv(path));
        if let Some(Err(e)) = exported {
            log::warn!("Event log export failed: {}", e);
        }
    }
}
