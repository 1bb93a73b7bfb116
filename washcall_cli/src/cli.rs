//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;
use washcall_core::Weekday;
use washcall_ui::Locale;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

/// Config path used when `--config` is not given. A missing file here means defaults.
pub const DEFAULT_CONFIG: &str = "etc/washcall.toml";

#[derive(Parser, Debug)]
#[command(name = "washcall", version, about = "Laundry room status client")]
pub struct Cli {
    /// Path to config TOML; defaults to etc/washcall.toml when present
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Emit JSON lines (cards, events, logs and errors) instead of text
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    pub json: bool,

    /// Console log level or filter directive (overrides RUST_LOG and the config)
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Override server.base_url
    #[arg(long, value_name = "URL", global = true)]
    pub server: Option<String>,

    /// Use the in-memory simulated server
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    pub simulate: bool,

    /// Display language
    #[arg(long, value_enum, value_name = "LOCALE", global = true)]
    pub locale: Option<Locale>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print every machine once
    List,
    /// Print machines, then follow realtime updates until Ctrl-C
    Watch {
        /// Stop after this many dashboard events
        #[arg(long, value_name = "N")]
        max_events: Option<usize>,
        /// Stop after this many milliseconds
        #[arg(long, value_name = "MS")]
        duration_ms: Option<u64>,
    },
    /// Start a course on an idle machine (subscribes to its completion)
    Start {
        #[arg(long, value_name = "ID")]
        machine: u32,
        #[arg(long, value_name = "NAME")]
        course: String,
    },
    /// Subscribe to (or with --off, unsubscribe from) a running machine
    Notify {
        #[arg(long, value_name = "ID")]
        machine: u32,
        #[arg(long, action = ArgAction::SetTrue)]
        off: bool,
    },
    /// Weekly congestion chart (daytime hours)
    Congestion {
        /// Only this day, e.g. `sat` or `토`
        #[arg(long, value_name = "DAY", value_parser = parse_weekday)]
        day: Option<Weekday>,
    },
    /// Current congestion tip
    Tip,
    /// Subscribe to (or with --off, unsubscribe from) alerts for a whole room
    Reserve {
        #[arg(long, value_name = "ID")]
        room: u32,
        #[arg(long, action = ArgAction::SetTrue)]
        off: bool,
    },
    /// Health check for operational monitoring
    Health,
}

fn parse_weekday(s: &str) -> Result<Weekday, String> {
    s.parse().map_err(|e: washcall_core::ClientError| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn congestion_day_accepts_both_languages() {
        for raw in ["sat", "토", "토요일"] {
            let cli = Cli::parse_from(["washcall", "congestion", "--day", raw]);
            assert!(
                matches!(cli.cmd, Commands::Congestion { day: Some(Weekday::Sat) }),
                "{raw}"
            );
        }
        assert!(Cli::try_parse_from(["washcall", "congestion", "--day", "funday"]).is_err());
    }
}
