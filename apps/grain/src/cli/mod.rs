//! # Grain CLI Module
//!
//! This module implements the CLI interface for Grain.
//!
//! ## Available Commands
//!
//! - `distribute` - Run every due distribution
//! - `accounts` - Recompute and show the cred account projection
//! - `identity` - Add, rename, alias and list identities
//! - `transfer` - Move grain between identities
//! - `hash` - Compute BLAKE3 checksum of the ledger

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use grain_core::GrainError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Grain - cred-weighted currency ledger
///
/// Distributes grain to contributors of an instance in proportion to their
/// cred, and keeps the append-only ledger of every payout and transfer.
#[derive(Parser, Debug)]
#[command(name = "grain")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress informational output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Instance directory
    #[arg(short = 'I', long, global = true, default_value = ".")]
    pub instance: PathBuf,

    /// Storage backend for ledger state
    #[arg(short = 'B', long, global = true, value_enum, default_value_t = Backend::File)]
    pub backend: Backend,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Where ledger state is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// One file per key under the instance directory
    File,
    /// A single redb database at `data/state.redb`
    Redb,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Distribute grain for every completed, undistributed epoch
    Distribute {
        /// Compute and report without writing anything
        #[arg(short, long)]
        simulation: bool,

        /// Processing time in ms since the Unix epoch (defaults to now)
        #[arg(long)]
        now: Option<i64>,
    },

    /// Recompute the cred account projection
    Accounts,

    /// Manage identities
    Identity {
        #[command(subcommand)]
        action: IdentityCommand,
    },

    /// Transfer grain between identities
    Transfer {
        /// Sender name
        #[arg(long)]
        from: String,

        /// Receiver name
        #[arg(long)]
        to: String,

        /// Amount in grain, e.g. "12.5"
        #[arg(long)]
        amount: String,

        /// Free-form note recorded with the transfer
        #[arg(long)]
        memo: Option<String>,
    },

    /// Compute BLAKE3 checksum of the serialized ledger
    Hash,
}

#[derive(Subcommand, Debug)]
pub enum IdentityCommand {
    /// Create a new identity
    Add { name: String },

    /// Rename an identity
    Rename { name: String, new_name: String },

    /// Attach an alias to an identity
    Alias { name: String, alias: String },

    /// List all identities with balances
    List,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), GrainError> {
    let instance = open_instance(&cli.instance, cli.backend)?;
    let json_mode = cli.json_mode;

    match cli.command {
        Commands::Distribute { simulation, now } => {
            cmd_distribute(&instance, json_mode, simulation, now.unwrap_or_else(now_ms))
        }
        Commands::Accounts => cmd_accounts(&instance, json_mode),
        Commands::Identity { action } => match action {
            IdentityCommand::Add { name } => cmd_identity_add(&instance, json_mode, &name),
            IdentityCommand::Rename { name, new_name } => {
                cmd_identity_rename(&instance, &name, &new_name)
            }
            IdentityCommand::Alias { name, alias } => {
                cmd_identity_alias(&instance, &name, &alias)
            }
            IdentityCommand::List => cmd_identity_list(&instance, json_mode),
        },
        Commands::Transfer {
            from,
            to,
            amount,
            memo,
        } => cmd_transfer(&instance, &from, &to, &amount, memo),
        Commands::Hash => cmd_hash(&instance, json_mode),
    }
}
