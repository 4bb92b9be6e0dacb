use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use kestrel_core::TransactionResponse;
use kestrel_transactions::{SignatureObject, Transaction, WireTransaction};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod cli;
mod config;
mod node;
mod txgen;

use cli::{Cli, Commands};
use config::{generate_sample_config, NodeConfig};
use node::Node;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { output } => {
            init_config(output)?;
        }
        Commands::Keygen { output } => {
            generate_keypair(output)?;
        }
        Commands::Validate { config, file } => {
            let node = open_node(&config).await?;
            let transactions = load_transactions(&file)?;
            print_responses(&node.validate(&transactions))?;
        }
        Commands::Verify { config, file } => {
            let node = open_node(&config).await?;
            let transactions = load_transactions(&file)?;
            print_responses(&node.verify(&transactions).await?)?;
        }
        Commands::Apply { config, file } => {
            let node = open_node(&config).await?;
            let transactions = load_transactions(&file)?;
            let (responses, committed) = node.apply(&transactions).await?;
            print_responses(&responses)?;
            println!("Committed: {}", committed);
        }
        Commands::Undo { config, file } => {
            let node = open_node(&config).await?;
            let transactions = load_transactions(&file)?;
            let (responses, committed) = node.undo(&transactions).await?;
            print_responses(&responses)?;
            println!("Committed: {}", committed);
        }
        Commands::Sign {
            config,
            file,
            signature,
        } => {
            let node = open_node(&config).await?;
            let wire: WireTransaction = serde_json::from_str(&std::fs::read_to_string(&file)?)?;
            let mut transaction = wire.into_transaction()?;
            let signature: SignatureObject =
                serde_json::from_str(&std::fs::read_to_string(&signature)?)?;

            let response = node
                .process_signature(transaction.as_mut(), &signature)
                .await?;
            print_responses(std::slice::from_ref(&response))?;
        }
        Commands::Accounts { config } => {
            let node = open_node(&config).await?;
            for account in node.accounts().await? {
                println!("{}  balance: {}", account.address, account.balance);
            }
        }
        Commands::Txgen { command } => {
            txgen::handle_txgen(command)?;
        }
    }

    Ok(())
}

async fn open_node(config_path: &Path) -> Result<Node> {
    info!("Loading configuration from {:?}", config_path);

    if !config_path.exists() {
        error!(
            "Configuration file not found: {:?}. Run 'kestrel init' to create one.",
            config_path
        );
        return Err(anyhow::anyhow!("Configuration file not found"));
    }
    let config = NodeConfig::load(config_path)?;
    Node::open(&config).await
}

fn load_transactions(file: &Path) -> Result<Vec<Box<dyn Transaction>>> {
    txgen::read_transactions(file)?
        .into_iter()
        .map(|wire| wire.into_transaction().map_err(anyhow::Error::from))
        .collect()
}

fn print_responses(responses: &[TransactionResponse]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(responses)?);
    Ok(())
}

/// Initialize a new configuration file
fn init_config(output: PathBuf) -> Result<()> {
    info!("Generating sample configuration");

    let (config, user) = generate_sample_config();
    config.save(&output)?;

    info!("Configuration saved to {:?}", output);
    println!("\nConfiguration file created: {}", output.display());
    println!("Genesis account secret key: {}", user.secret.to_hex());
    println!("\nTo apply transactions, run:");
    println!("  kestrel apply --config {} --file batch.json", output.display());

    Ok(())
}

/// Generate a new keypair
fn generate_keypair(output: Option<PathBuf>) -> Result<()> {
    let keypair = kestrel_core::KeyPair::generate();

    println!("Generated new keypair:");
    println!("  Public key:  {}", keypair.public.to_hex());
    println!("  Secret key:  {}", keypair.secret.to_hex());
    println!(
        "  Address:     {}",
        kestrel_core::Address::from_public_key(&keypair.public)
    );

    if let Some(path) = output {
        std::fs::write(&path, keypair.secret.to_hex())?;
        info!("Secret key saved to {:?}", path);
    }

    println!("\nWARNING: Keep your secret key safe! Do not share it with anyone.");

    Ok(())
}
