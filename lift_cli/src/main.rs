mod calibrate;
mod checks;
mod cli;
mod error_fmt;
mod logging;
mod replay;
mod simulate;
mod store;

use std::fs;
use std::path::Path;

use clap::Parser;
use lift_config::Config;
use lift_core::LiftError;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::store::StoreHandle;

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if !cli.json {
        // pretty reports for anything that escapes `run`
        let _ = color_eyre::install();
    }

    if let Err(err) = run(cli) {
        // lands in the log file too when one is configured
        tracing::error!(error = %err, "command failed");
        let json = JSON_MODE.get().copied().unwrap_or(false);
        if json {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn run(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    logging::init(&cli.log_level, cli.json, &cfg.logging)?;
    tracing::debug!(config = ?cli.config, store = ?cli.store, "configuration loaded");

    let store = StoreHandle::open(cli.store.as_deref())?;

    match cli.cmd {
        Commands::Simulate {
            duration_ms,
            scenario,
            soc,
        } => simulate::run(
            &cfg,
            &store,
            &simulate::SimulateArgs {
                duration_ms,
                scenario: scenario.as_deref(),
                soc,
                json: cli.json,
            },
        ),
        Commands::Calibrate => calibrate::run(&cfg, &store, cli.json),
        Commands::Replay { trace, bottom, top } => replay::run(
            &cfg,
            &replay::ReplayArgs {
                trace: &trace,
                bottom,
                top,
                json: cli.json,
            },
        ),
        Commands::SelfCheck => checks::self_check(&cfg, &store, cli.json),
        Commands::Health => checks::health(&cfg, &store, cli.json),
    }
}

/// Read, parse and validate the config; built-in defaults without a path.
fn load_config(path: Option<&Path>) -> eyre::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let text = fs::read_to_string(path)
        .map_err(|e| LiftError::Config(format!("read {}: {e}", path.display())))?;
    let cfg = lift_config::load_toml(&text)
        .map_err(|e| LiftError::Config(format!("parse {}: {e}", path.display())))?;
    cfg.validate()
        .map_err(|e| LiftError::Config(format!("{}: {e}", path.display())))?;
    Ok(cfg)
}
