//! modelwatch - Model Availability Monitor
//!
//! CLI entry point.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use std::io::IsTerminal;
use std::process::ExitCode;

use clap::Parser;

use modelwatch::cli::{Cli, Commands};
use modelwatch::core::logging::{self, LogSettings};
use modelwatch::storage::config::ResolvedConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    logging::init(&LogSettings::resolve(
        cli.log_level.as_deref(),
        cli.json_output,
        cli.verbose,
    ));

    let format = cli.effective_format();
    let pretty = cli.pretty;
    let no_color = cli.no_color || !std::io::stdout().is_terminal();

    match run(cli, no_color).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = e.error_code(), "{e}");
            let error_output = modelwatch::render::render_error(
                &e,
                format,
                no_color || !std::io::stderr().is_terminal(),
                pretty,
            );
            eprintln!("{error_output}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

async fn run(cli: Cli, tty_no_color: bool) -> modelwatch::Result<()> {
    // classify needs neither configuration nor network.
    if let Some(Commands::Classify(args)) = &cli.command {
        return modelwatch::cli::classify::execute(
            args,
            cli.effective_format(),
            cli.pretty,
            tty_no_color,
        );
    }

    let mut config = ResolvedConfig::resolve(&cli)?;
    config.no_color |= tty_no_color;
    tracing::debug!(
        config_path = %config.config_path.display(),
        api_base = %config.monitor.api_base,
        mode = config.monitor.refresh_mode.label(),
        "Configuration resolved"
    );

    match cli.command {
        None | Some(Commands::Status) => modelwatch::cli::status::execute(&config).await,
        Some(Commands::Refresh) => modelwatch::cli::refresh::execute(&config).await,
        Some(Commands::Models) => modelwatch::cli::models::execute(&config).await,
        Some(Commands::Watch(args)) => modelwatch::cli::watch::execute(&args, &config).await,
        Some(Commands::Classify(_)) => Ok(()),
    }
}
