// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sendloop - multi-tenant messaging session and dispatch engine.
//!
//! This is the binary entry point for the Sendloop server.

use clap::{Parser, Subcommand};

mod serve;
mod shutdown;
mod status;

/// Sendloop - multi-tenant messaging session and dispatch engine.
#[derive(Parser, Debug)]
#[command(name = "sendloop", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Sendloop server: session manager, inbound router, and
    /// schedule dispatcher.
    Serve,
    /// Show persisted session state and scheduled-job counts.
    Status {
        /// Output structured JSON for scripting.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match sendloop_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            sendloop_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Status { json }) => status::run_status(&config, json).await,
        None => {
            println!("sendloop: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn binary_loads_config_defaults() {
        // Config loads with defaults; no config file needed.
        let config = sendloop_config::load_and_validate()
            .expect("default config should be valid");
        assert!(config.dispatcher.poll_interval_secs >= 1);
    }
}
