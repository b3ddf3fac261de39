mod cli;
mod commands;
mod error_fmt;
mod logging;

use clap::Parser;
use cli::{Cli, Commands, DEFAULT_CONFIG_PATH, JSON_MODE};
use commands::Context;
use eyre::WrapErr;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    // Panic reports only; command errors are formatted below.
    let _ = color_eyre::install();

    if let Err(err) = run(cli) {
        tracing::error!(error = %err, "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", error_fmt::format_error_json(&err));
        } else {
            eprintln!("{}", error_fmt::humanize(&err));
        }
        std::process::exit(error_fmt::exit_code_for_error(&err));
    }
}

fn load_config(explicit: Option<&Path>) -> eyre::Result<loadcell_config::Config> {
    match explicit {
        Some(path) => loadcell_config::load_config(path),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            loadcell_config::load_config(Path::new(DEFAULT_CONFIG_PATH))
        }
        None => {
            let cfg = loadcell_config::Config::default();
            cfg.validate()?;
            Ok(cfg)
        }
    }
}

fn run(cli: Cli) -> eyre::Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    logging::init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;

    let store_path = cli
        .store
        .clone()
        .unwrap_or_else(|| cfg.calibration.file.clone());
    tracing::debug!(
        config = ?cli.config,
        store = %store_path.display(),
        "configuration loaded"
    );
    let ctx = Context {
        cfg,
        store_path,
        json: cli.json,
    };

    match cli.cmd {
        Commands::Tare => commands::run_tare(&ctx),
        Commands::Calibrate { weight, tare_first } => {
            commands::run_calibrate(&ctx, weight, tare_first)
        }
        Commands::Watch { interval_ms, count } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = shutdown.clone();
            ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
                .wrap_err("install Ctrl-C handler")?;
            commands::run_watch(&ctx, interval_ms, count, shutdown)
        }
        Commands::Show => commands::run_show(&ctx),
        Commands::SelfCheck => commands::run_self_check(&ctx),
    }
}
