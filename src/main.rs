use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info};

use fishcast::{
    clock::TimeOfDay,
    config::Config,
    forecast::ScheduleWindow,
    host::{OutcomeId, ProbeSite, Tile},
    logging::init_logging,
    preview::{CatchPrediction, SeededForecast},
    rng::LoggingRng,
    scenario::{Lake, Scenario, ScenarioLoader},
    session::SessionId,
    tracker::RodSignals,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Deterministic catch preview and splash forecast runner")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, global = true, default_value = "scenarios/lakeside.yaml")]
    scenario: PathBuf,

    /// Predictor configuration (defaults when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print reports as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Walk the actor path and print predictions each tick
    Preview {
        /// Override tick count (uses scenario default when omitted)
        #[arg(long)]
        ticks: Option<u32>,
    },
    /// Print the day's splash schedule for the scenario location
    Forecast,
    /// Cast at predicted tiles and check that every real catch matches its prediction
    Verify {
        #[arg(long)]
        ticks: Option<u32>,
    },
}

#[derive(Debug, Serialize)]
struct TickReport {
    tick: u32,
    time: TimeOfDay,
    actor: Tile,
    snapshotted: bool,
    recomputed: bool,
    predictions: Vec<CatchPrediction>,
    seeded: Option<SeededForecast>,
}

#[derive(Debug, Serialize)]
struct ForecastReport {
    location: String,
    windows: Vec<ScheduleWindow>,
}

#[derive(Debug, Serialize)]
struct CastReport {
    tick: u32,
    time: TimeOfDay,
    tile: Tile,
    predicted: OutcomeId,
    actual: Option<OutcomeId>,
}

#[derive(Debug, Serialize)]
struct VerifyReport {
    casts: Vec<CastReport>,
    mismatches: usize,
}

struct Run {
    scenario: Scenario,
    lake: Lake,
    live: LoggingRng<ChaCha8Rng>,
    config: Config,
}

impl Run {
    fn load(cli: &Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => Config::from_yaml(path)?,
            None => Config::default(),
        };
        init_logging(&config.logging.level, cli.verbose, config.logging.format)?;
        let scenario = ScenarioLoader::new(".").load(&cli.scenario)?;
        let lake = scenario.build_lake()?;
        let mut live = LoggingRng::new(ChaCha8Rng::seed_from_u64(scenario.live_seed), "live");
        live.set_enabled(cli.verbose >= 2);
        info!(scenario = %scenario.name, location = %lake.location(), "scenario loaded");
        Ok(Self {
            scenario,
            lake,
            live,
            config,
        })
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn preview(run: Run, ticks: Option<u32>, json: bool) -> Result<()> {
    let Run {
        scenario,
        mut lake,
        mut live,
        config,
    } = run;
    let id = SessionId::PRIMARY;
    let mut predictor = Lake::predictor(config);
    predictor.start_session(id);
    predictor.set_enabled(id, true);

    let mut reports = Vec::new();
    for tick in 0..scenario.ticks(ticks) {
        if let Some(tile) = scenario.actor_tile(tick as usize) {
            lake.move_actor(tile);
        }
        let refresh = predictor.tick(id, &mut lake, &mut live);
        let report = TickReport {
            tick,
            time: lake.time(),
            actor: lake.actor(),
            snapshotted: refresh.snapshotted,
            recomputed: refresh.recomputed,
            predictions: predictor.predictions(id).to_vec(),
            seeded: predictor.seeded_forecast(id).cloned(),
        };
        if !json {
            print_tick(&report);
        }
        reports.push(report);
        lake.advance(scenario.tick_minutes, &mut live);
    }
    debug!(draws = live.draws(), "live generator draws");
    if json {
        print_json(&reports)?;
    }
    Ok(())
}

fn print_tick(report: &TickReport) {
    println!(
        "[{}] actor {} {} ({} predictions)",
        report.time,
        report.actor,
        if report.snapshotted {
            "snapshot"
        } else if report.recomputed {
            "replayed"
        } else {
            "cached"
        },
        report.predictions.len()
    );
    for prediction in &report.predictions {
        println!("    {} -> {}", prediction.tile, prediction.outcome);
    }
    if let Some(seeded) = &report.seeded {
        match seeded.required.known() {
            Some(required) => println!(
                "    seeded: {} after {} more catches",
                seeded
                    .outcomes
                    .iter()
                    .map(OutcomeId::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
                required
            ),
            None => println!("    seeded: not within reach"),
        }
    }
}

fn forecast(run: Run, json: bool) -> Result<()> {
    let Run {
        mut lake, config, ..
    } = run;
    let id = SessionId::PRIMARY;
    let mut predictor = Lake::predictor(config);
    let now = lake.time();
    predictor.on_location_changed(id, &mut lake, now);
    let windows = predictor
        .splash_schedule(id, lake.location())
        .map(<[ScheduleWindow]>::to_vec)
        .unwrap_or_default();
    let report = ForecastReport {
        location: lake.location().to_string(),
        windows,
    };
    if json {
        return print_json(&report);
    }
    println!("Splashes at {}:", report.location);
    for window in &report.windows {
        match &window.special {
            Some(special) => println!(
                "  {} - {} at {} (frenzy: {special})",
                window.start, window.end, window.tile
            ),
            None => println!("  {} - {} at {}", window.start, window.end, window.tile),
        }
    }
    if let Some(countdown) = predictor.splash_countdown(id, now) {
        println!("Next: {countdown:?}");
    }
    Ok(())
}

fn verify(run: Run, ticks: Option<u32>, json: bool) -> Result<()> {
    let Run {
        scenario,
        mut lake,
        mut live,
        config,
    } = run;
    let id = SessionId::PRIMARY;
    let mut predictor = Lake::predictor(config);
    predictor.start_session(id);
    predictor.set_enabled(id, true);

    let mut casts = Vec::new();
    for tick in 0..scenario.ticks(ticks) {
        if let Some(tile) = scenario.actor_tile(tick as usize) {
            lake.move_actor(tile);
        }
        predictor.tick(id, &mut lake, &mut live);
        let predictions = predictor.predictions(id);
        if predictions.is_empty() {
            lake.advance(scenario.tick_minutes, &mut live);
            continue;
        }
        let target = predictions[tick as usize % predictions.len()].clone();

        let cast = RodSignals {
            casting: true,
            ..RodSignals::default()
        };
        predictor.on_rod_signals(id, cast, &mut lake, &mut live);
        lake.cast();
        let site = ProbeSite::new(lake.location().clone(), target.tile);
        let actual = predictor.resolve_actual(id, &mut lake, &mut live, &site)?;
        let pulled = RodSignals {
            pulling: true,
            caught: actual.is_some(),
            ..RodSignals::default()
        };
        if let Some(outcome) = &actual {
            lake.land(outcome);
        }
        predictor.on_rod_signals(id, pulled, &mut lake, &mut live);
        predictor.on_rod_signals(id, RodSignals::default(), &mut lake, &mut live);

        casts.push(CastReport {
            tick,
            time: lake.time(),
            tile: target.tile,
            predicted: target.outcome,
            actual,
        });
        lake.advance(scenario.tick_minutes, &mut live);
    }

    debug!(draws = live.draws(), "live generator draws");
    let mismatches = casts
        .iter()
        .filter(|cast| cast.actual.as_ref() != Some(&cast.predicted))
        .count();
    let report = VerifyReport { casts, mismatches };
    if json {
        print_json(&report)?;
    } else {
        for cast in &report.casts {
            let actual = cast.actual.as_ref().map_or("nothing", OutcomeId::as_str);
            let marker = if Some(&cast.predicted) == cast.actual.as_ref() {
                "ok"
            } else {
                "MISMATCH"
            };
            println!(
                "[{}] {} predicted {} caught {} {marker}",
                cast.time, cast.tile, cast.predicted, actual
            );
        }
    }
    if report.mismatches > 0 {
        bail!("{} of {} casts did not match their prediction", report.mismatches, report.casts.len());
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let run = Run::load(&cli)?;
    match cli.command {
        Command::Preview { ticks } => preview(run, ticks, cli.json),
        Command::Forecast => forecast(run, cli.json),
        Command::Verify { ticks } => verify(run, ticks, cli.json),
    }
}
