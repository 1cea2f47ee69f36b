//! Headless match runner.
//!
//! Loads a unit catalog and a level, auto-picks units during planning and
//! runs the simulation until the match ends or the tick limit is reached.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use lanewar_core::commands::Command;
use lanewar_core::definitions::{LevelDefinition, UnitCatalog};
use lanewar_core::enums::{RoundPhase, Team};
use lanewar_core::error::ConfigError;
use lanewar_core::state::GameStateSnapshot;
use lanewar_sim::{SimConfig, SimulationEngine};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lanewar-runner")]
#[command(about = "Run a lanewar level headlessly and report the result")]
struct Args {
    /// Unit catalog (TOML, `[[unit]]` tables)
    #[arg(long, default_value = "data/units.toml")]
    catalog: PathBuf,

    /// Level definition (TOML, `[[round]]` tables)
    #[arg(long, default_value = "data/levels/level1.toml")]
    level: PathBuf,

    /// Optional simulation config (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the RNG seed from the config
    #[arg(long)]
    seed: Option<u64>,

    /// Give up after this many ticks
    #[arg(long, default_value_t = 36_000)]
    max_ticks: u64,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize)]
struct RunReport {
    level: String,
    seed: u64,
    ticks: u64,
    finished: bool,
    snapshot: GameStateSnapshot,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(report) => {
            if let Err(err) = print_report(&report, args.format) {
                tracing::error!(%err, "failed to write report");
                return ExitCode::FAILURE;
            }
            if report.snapshot.phase == RoundPhase::Halted {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            tracing::error!(%err, "run aborted");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<RunReport, ConfigError> {
    let catalog = UnitCatalog::load(&args.catalog)?;
    let level = LevelDefinition::load(&args.level)?;
    let mut config = match &args.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    let seed = config.seed;
    let level_name = level.name.clone();

    tracing::info!(
        level = %level_name,
        rounds = level.rounds_count(),
        units = catalog.units.len(),
        seed,
        "starting run"
    );

    let mut engine = SimulationEngine::new(config, catalog);
    engine.queue_command(Command::StartLevel { level });

    let mut snapshot = engine.tick();
    let mut ticks = 1;
    while !snapshot.phase.is_terminal() && ticks < args.max_ticks {
        if snapshot.phase == RoundPhase::Planning && snapshot.picks_done < snapshot.picks_required {
            engine.queue_command(auto_pick(&engine, snapshot.souls));
        }
        snapshot = engine.tick();
        ticks += 1;
    }

    let finished = snapshot.phase.is_terminal();
    if !finished {
        tracing::warn!(ticks, phase = ?snapshot.phase, "tick limit reached");
    }
    tracing::info!(ticks, phase = ?snapshot.phase, outcome = ?snapshot.outcome, "run finished");

    Ok(RunReport {
        level: level_name,
        seed,
        ticks,
        finished,
        snapshot,
    })
}

/// Pick the cheapest affordable unit, or start the battle when nothing is.
fn auto_pick(engine: &SimulationEngine, souls: u32) -> Command {
    engine
        .catalog()
        .units
        .iter()
        .filter(|def| def.soul_cost <= souls)
        .min_by_key(|def| def.soul_cost)
        .map_or(Command::CommitBattle, |def| Command::PickUnit {
            definition_id: def.id.clone(),
        })
}

fn print_report(report: &RunReport, format: OutputFormat) -> Result<(), serde_json::Error> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            let snap = &report.snapshot;
            println!("Level: {} (seed {})", report.level, report.seed);
            println!(
                "Ticks: {} ({:.1}s simulated)",
                report.ticks, snap.time.elapsed_secs
            );
            println!("Phase: {:?}", snap.phase);
            match snap.outcome {
                Some(outcome) => println!("Outcome: {outcome:?}"),
                None => println!("Outcome: none"),
            }
            println!(
                "Round: {}/{}",
                (snap.round_index + 1).min(snap.rounds_total),
                snap.rounds_total
            );
            println!("Souls: {}", snap.souls);
            println!(
                "Score: {} rounds won, {} enemies killed, {} allies lost, {} damage dealt",
                snap.score.rounds_won,
                snap.score.enemies_killed,
                snap.score.allies_lost,
                snap.score.damage_dealt
            );
            let survivors = |team: Team| {
                snap.units
                    .iter()
                    .filter(|u| u.team == team && u.alive)
                    .count()
            };
            println!(
                "Survivors: {} allies, {} enemies",
                survivors(Team::Ally),
                survivors(Team::Enemy)
            );
        }
    }
    Ok(())
}
