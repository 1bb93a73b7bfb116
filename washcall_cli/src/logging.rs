//! Tracing subscriber setup.
//!
//! Console output always goes to stderr so stdout carries only cards and
//! events. An optional JSON file layer is added when `logging.file` is set.

use std::path::Path;

use eyre::WrapErr;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use washcall_config::{Logging, Rotation};

use crate::cli::FILE_GUARD;

/// Filter precedence: `--log-level`, then `RUST_LOG`, then `logging.level`,
/// then `info`.
fn build_filter(flag: Option<&str>, cfg: &Logging) -> eyre::Result<EnvFilter> {
    if let Some(level) = flag {
        return EnvFilter::try_new(level).wrap_err_with(|| format!("invalid --log-level {level:?}"));
    }
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        return Ok(EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .from_env_lossy());
    }
    let level = cfg.level.as_deref().unwrap_or("info");
    EnvFilter::try_new(level).wrap_err_with(|| format!("invalid logging.level {level:?}"))
}

pub fn init(json: bool, flag: Option<&str>, cfg: &Logging) -> eyre::Result<()> {
    let filter = build_filter(flag, cfg)?;

    let console = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    };

    let file = match file_path(cfg) {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name: {}", path.display()))?;
            let appender = match cfg.rotation {
                Rotation::Never => tracing_appender::rolling::never(dir, name),
                Rotation::Daily => tracing_appender::rolling::daily(dir, name),
                Rotation::Hourly => tracing_appender::rolling::hourly(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_ansi(false).with_writer(writer).boxed())
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .wrap_err("installing tracing subscriber")?;
    Ok(())
}

fn file_path(cfg: &Logging) -> Option<&Path> {
    cfg.file
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Path::new)
}
