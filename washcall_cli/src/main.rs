#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `washcall`: terminal client for the WashCall laundry room service.

mod app;
mod cli;
mod error_fmt;
mod logging;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use eyre::{Result, WrapErr};
use washcall_config::Config;

use crate::app::{Output, Session, WatchLimits};
use crate::cli::{Cli, Commands, DEFAULT_CONFIG, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

/// Environment variable that overrides `server.token`.
const TOKEN_ENV: &str = "WASHCALL_TOKEN";

fn main() {
    if let Err(err) = real_main() {
        let json = JSON_MODE.get().copied().unwrap_or(false);
        if json {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn load_config(explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) => washcall_config::load_path(path),
        None => {
            let default = Path::new(DEFAULT_CONFIG);
            if default.exists() {
                washcall_config::load_path(default)
            } else {
                Ok(Config::default())
            }
        }
    }
}

/// Command-line flags and the environment win over the file.
fn apply_overrides(cfg: &mut Config, cli: &Cli) {
    if let Ok(token) = std::env::var(TOKEN_ENV)
        && !token.trim().is_empty()
    {
        cfg.server.token = Some(token.trim().to_string());
    }
    if let Some(server) = &cli.server {
        cfg.server.base_url.clone_from(server);
    }
    if cli.simulate {
        cfg.simulation.enabled = true;
    }
    if let Some(locale) = cli.locale {
        cfg.ui.locale = locale;
    }
}

fn real_main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    let mut cfg = load_config(cli.config.as_deref())?;
    apply_overrides(&mut cfg, &cli);
    cfg.validate().wrap_err("invalid config")?;

    logging::init(cli.json, cli.log_level.as_deref(), &cfg.logging)?;
    tracing::info!(
        base_url = %cfg.server.base_url,
        simulate = cfg.simulation.enabled,
        locale = %cfg.ui.locale,
        "washcall starting"
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::Relaxed);
        })
        .wrap_err("installing Ctrl-C handler")?;
    }

    let out = Output {
        json: cli.json,
        locale: cfg.ui.locale,
    };
    let mut session = Session::open(&cfg)?;

    match cli.cmd {
        Commands::List => app::list(&session, &out),
        Commands::Watch {
            max_events,
            duration_ms,
        } => {
            let limits = WatchLimits {
                max_events,
                duration: duration_ms.map(Duration::from_millis),
            };
            let delay = Duration::from_millis(cfg.realtime.reconnect_delay_ms);
            app::watch(session, &out, &limits, delay, &shutdown)
        }
        Commands::Start { machine, course } => app::start(&mut session, &out, machine, &course),
        Commands::Notify { machine, off } => app::notify(&mut session, &out, machine, !off),
        Commands::Congestion { day } => app::congestion(&mut session, &out, day),
        Commands::Tip => app::tip(&mut session, &out),
        Commands::Reserve { room, off } => app::reserve(&mut session, &out, room, !off),
        Commands::Health => app::health(&session, &out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_file_values() {
        let cli = Cli::parse_from([
            "washcall",
            "--server",
            "http://10.1.2.3:8000",
            "--simulate",
            "--locale",
            "en",
            "list",
        ]);
        let mut cfg = Config::default();
        apply_overrides(&mut cfg, &cli);
        assert_eq!(cfg.server.base_url, "http://10.1.2.3:8000");
        assert!(cfg.simulation.enabled);
        assert_eq!(cfg.ui.locale, washcall_ui::Locale::En);
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        assert!(load_config(Some(Path::new("/nonexistent/washcall.toml"))).is_err());
    }
}
