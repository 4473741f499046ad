//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};

use crate::storage::config::RefreshMode;

/// Model availability monitor - probe every model an inference API exposes.
#[derive(Parser, Debug)]
#[command(name = "modelwatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    // === Global flags ===
    /// Output format
    #[arg(long, value_enum, default_value = "human", global = true)]
    pub format: OutputFormat,

    /// Shorthand for --format json
    #[arg(long, global = true)]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log level
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit JSONL logs to stderr
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Upstream API base URL
    #[arg(long, value_name = "URL", global = true)]
    pub api_base: Option<String>,

    /// Refresh policy
    #[arg(long, value_enum, value_name = "MODE", global = true)]
    pub mode: Option<RefreshMode>,
}

impl Cli {
    /// Resolve the effective output format.
    #[must_use]
    pub fn effective_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show model statuses, refreshing first if the cache is stale (default)
    Status,

    /// Rediscover models and probe all of them now
    Refresh,

    /// Keep monitoring in the background and redraw periodically
    Watch(WatchArgs),

    /// List the models the API exposes without probing them
    Models,

    /// Show how each model identifier would be probed
    Classify(ClassifyArgs),
}

/// Arguments for the `watch` command.
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Seconds between redraws
    #[arg(long, default_value = "30", value_name = "SECONDS")]
    pub interval: u64,
}

/// Arguments for the `classify` command.
#[derive(Parser, Debug)]
pub struct ClassifyArgs {
    /// Model identifiers
    #[arg(required = true, value_name = "ID")]
    pub ids: Vec<String>,
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Human,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_defaults_to_none() {
        let cli = Cli::try_parse_from(["modelwatch"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.effective_format(), OutputFormat::Human);
    }

    #[test]
    fn json_shorthand_wins() {
        let cli = Cli::try_parse_from(["modelwatch", "status", "--json"]).unwrap();
        assert_eq!(cli.effective_format(), OutputFormat::Json);
    }

    #[test]
    fn watch_interval_and_global_mode() {
        let cli =
            Cli::try_parse_from(["modelwatch", "watch", "--interval", "5", "--mode", "lazy"]).unwrap();
        match cli.command {
            Some(Commands::Watch(args)) => assert_eq!(args.interval, 5),
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.mode, Some(RefreshMode::Lazy));
    }

    #[test]
    fn classify_requires_ids() {
        assert!(Cli::try_parse_from(["modelwatch", "classify"]).is_err());
        let cli = Cli::try_parse_from(["modelwatch", "classify", "gpt-4", "whisper-1"]).unwrap();
        match cli.command {
            Some(Commands::Classify(args)) => assert_eq!(args.ids, vec!["gpt-4", "whisper-1"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
