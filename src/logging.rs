use anyhow::{Context, Result};
use std::io;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber, fmt, prelude::*};

pub const LOG_ENV: &str = "SMART_TASK_LOG";
const DEFAULT_LEVEL: &str = "warn";

/// Picks the filter directive: explicit level, then `SMART_TASK_LOG`, then `warn`.
pub fn resolve_level(cli_level: Option<&str>, env_level: Option<String>) -> String {
    cli_level
        .map(str::to_string)
        .or(env_level)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string())
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
}

/// Logs go to stderr, or to `log_file` without ANSI colors when one is given.
pub fn init_logging(level: &str, log_file: Option<&Path>) -> Result<()> {
    match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("create log file: {}", path.display()))?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(build_filter(level))
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true)
                .with_writer(std::sync::Arc::new(file))
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => {
            tracing_subscriber::registry()
                .with(build_filter(level))
                .with(fmt::layer().with_writer(io::stderr))
                .try_init()?;
        }
    }
    info!(level, "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_level_priority() {
        assert_eq!(resolve_level(Some("debug"), Some("info".into())), "debug");
        assert_eq!(resolve_level(None, Some("info".into())), "info");
        assert_eq!(resolve_level(None, None), "warn");
        assert_eq!(resolve_level(Some(" "), None), "warn");
    }
}
