#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless command-line runner for Code & Conquer sessions.
//!
//! Plays the requested number of waves with the adaptive opponent building
//! defenses, logs every plan, outcome and AI snapshot, and persists the
//! learned table when a path is given.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use conquer_core::Event;
use conquer_session::{Session, SessionConfig};
use conquer_system_opponent::{AdaptiveOpponent, JsonFileStore, QTableStore};
use conquer_world::query;
use log::{info, warn, LevelFilter};

/// Command-line arguments of the `conquer` binary.
#[derive(Debug, Parser)]
#[command(name = "conquer", about = "Runs a headless tower-defense session")]
struct Args {
    /// Number of waves to play.
    #[arg(long, default_value_t = 10)]
    waves: u32,
    /// Seed for the director and the opponent.
    #[arg(long)]
    seed: Option<u64>,
    /// TOML file overriding session tunables.
    #[arg(long)]
    config: Option<PathBuf>,
    /// JSON file the opponent's learned values are loaded from and saved to.
    #[arg(long = "q-table")]
    q_table: Option<PathBuf>,
    /// Simulated milliseconds per frame.
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,
    /// Log verbosity (off, error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
    /// Simulated seconds after which a wave is abandoned.
    #[arg(long, default_value_t = 300)]
    max_wave_secs: u64,
}

/// Result of a headless run.
#[derive(Debug, PartialEq)]
struct Summary {
    waves_completed: u32,
    result: Option<bool>,
    lives: u32,
    towers: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level)?;
    let summary = run(&args)?;

    let verdict = match summary.result {
        Some(true) => "defenders win",
        Some(false) => "defenders lose",
        None => "undecided",
    };
    println!(
        "{} waves completed, {} lives left, {} towers standing: {}",
        summary.waves_completed, summary.lives, summary.towers, verdict
    );
    Ok(())
}

fn init_logging(level: LevelFilter) -> Result<()> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {}] {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
        .context("failed to install logger")
}

fn load_config(args: &Args) -> Result<SessionConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            SessionConfig::from_toml_str(&source)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None => SessionConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.reseed(seed);
    }
    config.frame.waves_to_win = args.waves;
    Ok(config)
}

fn run(args: &Args) -> Result<Summary> {
    let config = load_config(args)?;
    let mut store = args.q_table.as_ref().map(JsonFileStore::new);
    let opponent = match &store {
        Some(store) => AdaptiveOpponent::load(config.opponent.clone(), store),
        None => AdaptiveOpponent::new(config.opponent.clone()),
    };
    let mut session = Session::new(config).with_opponent(opponent);

    let frame_ms = args.frame_ms.max(1);
    let dt = frame_ms as f32 / 1_000.0;
    let frame_budget = args.max_wave_secs.saturating_mul(1_000) / frame_ms;

    'waves: for _ in 0..args.waves {
        let Some(plan) = session.start_wave() else {
            break;
        };
        info!(
            "wave {}: {} with {} enemies",
            plan.wave(),
            plan.archetype(),
            plan.total_enemies()
        );

        let mut frames = 0;
        while session.active_wave().is_some() && session.result().is_none() {
            if frames >= frame_budget {
                warn!(
                    "wave {} still running after {}s; stopping",
                    plan.wave(),
                    args.max_wave_secs
                );
                break 'waves;
            }
            frames += 1;

            for event in session.update(dt) {
                if let Event::WaveCompleted { outcome, wave } = event {
                    info!(
                        "wave {wave} done in {:.1}s: {} lives lost, {:.0} damage",
                        outcome.completion_time.as_secs_f32(),
                        outcome.lives_lost,
                        outcome.damage_dealt
                    );
                }
            }
            if let (Some(blob), Some(store)) = (session.take_save_request(), store.as_mut()) {
                if let Err(error) = store.save(&blob) {
                    warn!("could not persist q-table: {error}");
                }
            }
        }
        info!("{}", session.ai_stats());
    }

    if let (Some(opponent), Some(store)) = (session.opponent(), store.as_mut()) {
        opponent
            .table()
            .save_to(store)
            .with_context(|| format!("failed to save q-table to {}", store.path().display()))?;
    }

    Ok(Summary {
        waves_completed: session.waves_completed(),
        result: session.result(),
        lives: query::lives(session.world()),
        towers: query::towers(session.world()).len(),
    })
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let args = Args::try_parse_from(["conquer"]).expect("no arguments needed");
        assert_eq!(args.waves, 10);
        assert_eq!(args.frame_ms, 16);
        assert_eq!(args.max_wave_secs, 300);
        assert_eq!(args.log_level, LevelFilter::Info);
        assert!(args.seed.is_none());
    }

    #[test]
    fn single_wave_run_persists_the_table() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_nanos());
        let path = std::env::temp_dir().join(format!("conquer-cli-{nanos}.json"));
        let args = Args::try_parse_from([
            "conquer",
            "--waves",
            "1",
            "--seed",
            "9",
            "--frame-ms",
            "50",
            "--q-table",
            path.to_str().expect("utf-8 temp path"),
        ])
        .expect("valid arguments");

        let summary = run(&args).expect("headless run succeeds");
        let saved = fs::read_to_string(&path).expect("table saved");
        let _ = fs::remove_file(&path);

        assert_eq!(summary.waves_completed, 1);
        assert_eq!(summary.result, Some(true));
        assert!(saved.starts_with('{'));
    }
}
