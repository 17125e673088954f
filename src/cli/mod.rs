//! `justmark` command runner.
//!
//! Options are layered: built-in defaults, then `justmark.toml`, then
//! command-line flags.

mod args;

use std::path::Path;
use std::sync::mpsc;

use anyhow::{Context, Result};
use clap::ColorChoice;

use crate::config::Config;
use crate::logger;
use crate::options::CompileOptions;

pub use args::{Cli, Commands, CompileArgs};

/// Run a parsed command line to completion.
pub fn run(cli: &Cli) -> Result<()> {
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let options = compile_options(cli.config.as_deref(), cli.compile_args(), cli.silent)?;
    match &cli.command {
        Commands::Build { .. } => crate::build(options),
        Commands::Watch { .. } => watch_until_interrupted(options),
    }
}

/// Merge defaults, the config file and command-line flags.
pub fn compile_options(
    config_path: Option<&Path>,
    args: &CompileArgs,
    silent: bool,
) -> Result<CompileOptions> {
    let config = Config::load(config_path, &args.input)?;

    let mut options = CompileOptions::new(&args.input, &args.output, []);
    options.silent = silent;
    config.apply(&mut options);
    args.apply(&mut options);
    Ok(options)
}

fn watch_until_interrupted(options: CompileOptions) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        tx.send(()).ok();
    })
    .context("Failed to set Ctrl+C handler")?;

    let handle = crate::watch(options)?;
    rx.recv().ok();
    handle.stop();
    handle.wait()
}
