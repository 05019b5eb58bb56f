//! # Grain
//!
//! The main binary for the Grain accounting engine.
//!
//! ## Usage
//!
//! ```bash
//! # Preview the next payouts without writing anything
//! grain -I ./instance distribute --simulation
//!
//! # Pay out every completed epoch and refresh output/accounts.json
//! grain -I ./instance distribute
//!
//! # Identities and transfers
//! grain identity add alice
//! grain transfer --from alice --to bob --amount 12.5 --memo "thanks"
//! ```

use clap::Parser;
use grain::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // GRAIN_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("GRAIN_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "grain=debug,grain_core=debug"
    } else if cli.quiet {
        "grain=warn,grain_core=warn"
    } else {
        "grain=info,grain_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
