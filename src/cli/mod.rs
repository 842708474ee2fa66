//! Command-line interface for inspecting and editing configuration.
//!
//! `dump` and `watch` resolve the local application's configuration the
//! same way a service would. The remaining commands talk to the remote
//! store directly through [`AdminApi`](crate::remote::AdminApi).

mod commands;
pub mod formatting;
mod types;

#[cfg(test)]
mod tests;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub use types::{CliError, CommandResult};

/// Inspect and edit layered configuration.
#[derive(Debug, Parser)]
#[command(name = "conflab", version)]
#[command(about = "Inspect and edit layered configuration")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Flags shared by every command.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Directory holding the application's configuration files
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Directory holding library default files
    #[arg(long, global = true)]
    pub library_dir: Option<PathBuf>,

    /// Environment name
    #[arg(long, global = true)]
    pub env: Option<String>,

    /// Remote store endpoint as host:port
    #[arg(long, global = true)]
    pub etcd: Option<String>,

    /// Service name used for remote keys
    #[arg(long, global = true)]
    pub service: Option<String>,

    /// Root of every remote key
    #[arg(long, global = true)]
    pub prefix: Option<String>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load the configuration and print the merged view
    Dump {
        /// Only print the value at this path
        #[arg(long)]
        path: Option<String>,

        /// Arguments for the argv layer
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// Load the configuration and print every change until interrupted
    Watch {
        /// Only report changes matching this pattern
        #[arg(long, default_value = "*")]
        pattern: String,

        /// Arguments for the argv layer
        #[arg(last = true)]
        args: Vec<String>,
    },
    /// List services known to the remote store
    Services,
    /// List a service's environments and their heartbeat status
    Environments {
        /// Service name
        service: String,
    },
    /// List the mirrored files of a service environment
    Files {
        /// Service name
        service: String,
        /// Environment name
        environment: String,
    },
    /// Print a mirrored file, or the live tree for `etcd`
    Show {
        /// Service name
        service: String,
        /// Environment name
        environment: String,
        /// Layer name or `etcd`
        file: String,
    },
    /// Set a key in a service's live tree
    Set {
        /// Service name
        service: String,
        /// Environment name
        environment: String,
        /// Dotted or slash separated key
        key: String,
        /// New value
        value: String,
    },
    /// Remove a key from a service's live tree
    Delete {
        /// Service name
        service: String,
        /// Environment name
        environment: String,
        /// Dotted or slash separated key
        key: String,
    },
}

/// Runs a parsed command and returns its output.
///
/// # Errors
/// Returns an error if loading, the remote store or output rendering fails.
pub async fn run(cli: Cli) -> CommandResult {
    let global = cli.global;

    match cli.command {
        Commands::Dump { path, args } => commands::local::dump(&global, path.as_deref(), args).await,
        Commands::Watch { pattern, args } => commands::local::watch(&global, &pattern, args).await,
        Commands::Services => commands::admin::services(&global).await,
        Commands::Environments { service } => {
            commands::admin::environments(&global, &service).await
        }
        Commands::Files {
            service,
            environment,
        } => commands::admin::files(&global, &service, &environment).await,
        Commands::Show {
            service,
            environment,
            file,
        } => commands::admin::show(&global, &service, &environment, &file).await,
        Commands::Set {
            service,
            environment,
            key,
            value,
        } => commands::admin::set(&global, &service, &environment, &key, &value).await,
        Commands::Delete {
            service,
            environment,
            key,
        } => commands::admin::delete(&global, &service, &environment, &key).await,
    }
}
