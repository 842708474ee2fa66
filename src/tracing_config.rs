use std::env;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const FORMAT_VAR: &str = "CONFLAB_LOG_FORMAT";

/// Initialize tracing for a long running process
///
/// Sets up structured logging with info level by default.
/// Uses RUST_LOG environment variable if set, otherwise defaults to "info".
/// Supports both pretty console output and JSON output based on CONFLAB_LOG_FORMAT.
/// Logs go to stderr so stdout stays free for command output.
///
/// # Errors
/// Returns error if tracing subscriber initialization fails
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    init_with_default("info", false)
}

/// Initialize tracing for one-shot CLI commands
///
/// Same as [`init`] but only warnings are shown unless RUST_LOG says otherwise,
/// and the pretty format is compacted.
///
/// # Errors
/// Returns error if tracing subscriber initialization fails
pub fn init_cli_mode() -> Result<(), Box<dyn std::error::Error>> {
    init_with_default("warn", true)
}

fn init_with_default(level: &str, compact: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let format = env::var(FORMAT_VAR).unwrap_or_else(|_| "pretty".to_string());

    let registry = tracing_subscriber::registry().with(env_filter);

    match format.as_str() {
        "json" => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true)
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
        _ if compact => {
            registry
                .with(
                    fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_level(true)
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
        _ => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_level(true)
                        .with_thread_ids(true)
                        .with_thread_names(true)
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
    }

    Ok(())
}
