use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Kestrel - ledger transaction processing node
#[derive(Parser)]
#[command(name = "kestrel")]
#[command(about = "Kestrel ledger node and utilities")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new node configuration
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = "config.json")]
        output: PathBuf,
    },

    /// Generate a new keypair
    Keygen {
        /// Output file for secret key
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run stateless checks on a batch of transactions
    Validate {
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,
        /// JSON array of transactions
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Dry-run a batch against the current ledger
    Verify {
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Apply a batch and commit it when every transaction succeeds
    Apply {
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Undo a batch, given newest first, and commit it when every undo succeeds
    Undo {
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Check a co-signature against a pending multisignature transaction
    Sign {
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,
        /// Transaction JSON file
        #[arg(short, long)]
        file: PathBuf,
        /// Signature JSON file
        #[arg(short, long)]
        signature: PathBuf,
    },

    /// List ledger accounts
    Accounts {
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,
    },

    /// Generate signed transactions for testing
    Txgen {
        #[command(subcommand)]
        command: TxGenCommands,
    },
}

#[derive(Subcommand)]
pub enum TxGenCommands {
    /// Create a transfer transaction
    Transfer {
        /// Sender secret key hex
        #[arg(long)]
        from_secret: String,
        /// Recipient address, e.g. 1234L
        #[arg(long)]
        to: String,
        /// Amount to send
        #[arg(long)]
        amount: u64,
        /// Optional memo
        #[arg(long)]
        data: Option<String>,
        /// Seconds since the chain epoch (defaults to now)
        #[arg(long)]
        timestamp: Option<u32>,
        /// Output file (JSON)
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Create a vote transaction
    Vote {
        #[arg(long)]
        from_secret: String,
        /// Delegate public keys to vote for (comma-separated hex)
        #[arg(long, default_value = "")]
        add: String,
        /// Delegate public keys to unvote (comma-separated hex)
        #[arg(long, default_value = "")]
        remove: String,
        #[arg(long)]
        timestamp: Option<u32>,
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Create a multisignature registration transaction
    Multisignature {
        #[arg(long)]
        from_secret: String,
        /// Member public keys (comma-separated hex)
        #[arg(long)]
        keysgroup: String,
        /// Co-signatures required on later transactions
        #[arg(long)]
        min: u8,
        #[arg(long)]
        timestamp: Option<u32>,
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Co-sign a transaction as a keysgroup member
    Cosign {
        /// Member secret key hex
        #[arg(long)]
        secret: String,
        /// Transaction JSON file
        #[arg(short, long)]
        file: PathBuf,
        /// Output file for the signature (JSON)
        #[arg(short, long)]
        out: PathBuf,
    },
}
