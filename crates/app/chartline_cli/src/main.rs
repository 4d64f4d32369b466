// Import and re-export the `error` module
pub use self::error::{Error, Result};
mod error;

use std::io::Read;
use std::path::Path;

use chartline_core::prompt::SYSTEM_PROMPT;
use chartline_core::reply::ChatReply;
use clap::Parser;
use cli::{Cli, Commands};

mod cli;
mod logging;

fn main() -> Result<()> {
    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<()> {
    logging::init()?;

    let args = Cli::parse();

    match &args.command {
        Commands::Prompt => {
            println!("{SYSTEM_PROMPT}");
        }
        Commands::Normalize { file } => {
            let raw = read_input(file.as_deref())?;
            let reply = ChatReply::from_model_output(&raw)?;
            if !reply.has_tool_use {
                log::info!("reply carries no chart");
            }
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
        Commands::Version => {
            println!(
                "{} {} (core {})",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                chartline_core::version()
            );
        }
    }

    Ok(())
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| Error::Custom(format!("cannot read {}: {e}", path.display()))),
        None => {
            let mut raw = String::new();
            std::io::stdin().read_to_string(&mut raw)?;
            Ok(raw)
        }
    }
}
