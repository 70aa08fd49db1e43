// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Omnidesk - omnichannel contact-center routing server.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Omnidesk - omnichannel contact-center routing server.
#[derive(Parser, Debug)]
#[command(name = "omnidesk", version, about, long_about = None)]
struct Cli {
    /// Load this file instead of the standard configuration hierarchy.
    #[arg(long, short, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the webhook gateway, agent protocol server and telephony bridge.
    Serve,
    /// Load and validate configuration, then exit.
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => omnidesk_config::load_and_validate_path(path),
        None => omnidesk_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            omnidesk_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("omnidesk: {e}");
                std::process::exit(1);
            }
        }
        Commands::CheckConfig => {
            println!(
                "omnidesk: config ok (service={}, agents={}, telephony={}, whatsapp={}, viber={})",
                config.service.name,
                config.agents.len(),
                config.telephony.enabled,
                config.whatsapp.is_configured(),
                config.viber.auth_token.is_some(),
            );
        }
    }
}
