use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::models::{RegistrationParams, TransactionFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config/config.toml")]
    pub config: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Private key for registry writes
    #[arg(long, env = "XBRIDGE_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the Li.Fi proxy server
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the bubble layout of the market snapshot as JSON
    Bubbles {
        #[arg(long, default_value_t = 1200.0)]
        width: f64,
        #[arg(long, default_value_t = 600.0)]
        height: f64,
    },
    /// List registry records of an address
    History {
        address: String,
        #[arg(long, default_value = "all")]
        filter: TransactionFilter,
    },
    /// Register a bridge transaction, or queue it if the wallet is off-chain
    Register {
        source_chain: String,
        target_chain: String,
        source_token: String,
        target_token: String,
        amount_in: String,
        amount_out: String,
        tx_hash: String,
    },
    /// Mark a registered transaction as successful or not
    UpdateStatus {
        id: u64,
        #[arg(action = clap::ArgAction::Set)]
        successful: bool,
    },
    /// Submit registrations queued while the wallet was on another chain
    FlushPending,
}

impl Command {
    pub fn registration_params(&self) -> Option<RegistrationParams> {
        match self {
            Command::Register {
                source_chain,
                target_chain,
                source_token,
                target_token,
                amount_in,
                amount_out,
                tx_hash,
            } => Some(RegistrationParams {
                source_chain: source_chain.clone(),
                target_chain: target_chain.clone(),
                source_token: source_token.clone(),
                target_token: target_token.clone(),
                amount_in: amount_in.clone(),
                amount_out: amount_out.clone(),
                transaction_hash: tx_hash.clone(),
            }),
            _ => None,
        }
    }
}
