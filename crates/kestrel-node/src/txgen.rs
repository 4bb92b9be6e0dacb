use std::path::Path;

use anyhow::{anyhow, bail, Result};
use kestrel_chain::{EpochSlots, ProcessorConfig};
use kestrel_core::{serialize, Address, PublicKey, SecretKey};
use kestrel_transactions::{
    Asset, MultisignatureAsset, SignatureObject, SignedTransaction, TransferAsset, Vote,
    VoteAsset, WireTransaction,
};

use crate::cli::TxGenCommands;

pub fn handle_txgen(command: TxGenCommands) -> Result<()> {
    match command {
        TxGenCommands::Transfer {
            from_secret,
            to,
            amount,
            data,
            timestamp,
            out,
        } => {
            let recipient: Address = to.parse()?;
            let mut asset = TransferAsset::new(recipient, amount);
            asset.data = data;

            let tx = sign_asset(&from_secret, timestamp, asset)?;
            write_json(&WireTransaction::Transfer(tx.fields().clone()), &out)?;
        }

        TxGenCommands::Vote {
            from_secret,
            add,
            remove,
            timestamp,
            out,
        } => {
            let mut votes: Vec<Vote> = parse_pubkey_list(&add)?
                .into_iter()
                .map(Vote::add)
                .collect();
            votes.extend(parse_pubkey_list(&remove)?.into_iter().map(Vote::remove));
            if votes.is_empty() {
                bail!("At least one of --add or --remove is required");
            }

            let tx = sign_asset(&from_secret, timestamp, VoteAsset { votes })?;
            write_json(&WireTransaction::Vote(tx.fields().clone()), &out)?;
        }

        TxGenCommands::Multisignature {
            from_secret,
            keysgroup,
            min,
            timestamp,
            out,
        } => {
            let asset = MultisignatureAsset {
                keysgroup: parse_pubkey_list(&keysgroup)?,
                min,
            };
            let tx = sign_asset(&from_secret, timestamp, asset)?;
            write_json(&WireTransaction::Multisignature(tx.fields().clone()), &out)?;
        }

        TxGenCommands::Cosign { secret, file, out } => {
            let member = parse_secret(&secret)?;
            let wire: WireTransaction = serde_json::from_str(&std::fs::read_to_string(&file)?)?;
            let tx = wire.into_transaction()?;

            write_json(&SignatureObject::new(tx.id(), &member), &out)?;
        }
    }

    Ok(())
}

fn sign_asset<A: Asset>(
    secret_hex: &str,
    timestamp: Option<u32>,
    asset: A,
) -> Result<SignedTransaction<A>> {
    let secret = parse_secret(secret_hex)?;
    let timestamp = match timestamp {
        Some(timestamp) => timestamp,
        None => epoch_now()?,
    };
    Ok(SignedTransaction::new_signed(timestamp, asset, &secret)?)
}

/// Seconds since the default chain epoch
fn epoch_now() -> Result<u32> {
    let defaults = ProcessorConfig::default();
    let elapsed = EpochSlots::new(defaults.epoch_unix, defaults.slot_interval).epoch_time();
    u32::try_from(elapsed).map_err(|_| anyhow!("Epoch time {} does not fit a timestamp", elapsed))
}

fn write_json<T: serde::Serialize>(value: &T, out: &Path) -> Result<()> {
    let json = serialize::to_json_pretty(value)?;
    std::fs::write(out, json)?;
    Ok(())
}

fn parse_secret(hex_str: &str) -> Result<SecretKey> {
    SecretKey::from_hex(hex_str).map_err(|e| anyhow!(e))
}

fn parse_pubkey(hex_str: &str) -> Result<PublicKey> {
    PublicKey::from_hex(hex_str).map_err(|e| anyhow!(e))
}

fn parse_pubkey_list(input: &str) -> Result<Vec<PublicKey>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(parse_pubkey)
        .collect()
}

/// Read a transaction file holding either one transaction or an array
pub fn read_transactions(path: &Path) -> Result<Vec<WireTransaction>> {
    let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    Ok(if value.is_array() {
        serde_json::from_value(value)?
    } else {
        vec![serde_json::from_value(value)?]
    })
}
