//! `conflab` command-line tool.

use std::{error::Error, process};

use clap::Parser;
use conflab::{
    cli::{self, Cli, formatting::format_error},
    tracing_config,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_config::init_cli_mode()?;

    let cli = Cli::parse();

    match cli::run(cli).await {
        Ok(output) => {
            if !output.trim().is_empty() {
                println!("{output}");
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", format_error(&e.to_string()));
            process::exit(1);
        }
    }
}
