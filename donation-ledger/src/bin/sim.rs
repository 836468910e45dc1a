//! Donation ledger simulator
//!
//! Runs a fundraising scenario against an in-process runtime and prints a
//! JSON summary. Usage: `donation-sim [config.toml]`

use anyhow::Context;
use donation_ledger::{query, Config, DonationClient, KeyPair, Runtime};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const AIRDROP: u64 = 10_000_000_000;

fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("loading config from {}", path))?
            .with_env_overrides()?,
        None => Config::from_env()?,
    };

    // Initialize tracing
    let filter = EnvFilter::try_new(&config.log.filter).unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(service = %config.service_name, "Starting donation simulator");

    let runtime = match config.snapshot_path() {
        Some(path) if path.exists() => Arc::new(Runtime::from_snapshot(&config, &path)?),
        _ => Arc::new(Runtime::new(&config)?),
    };
    let client = DonationClient::new(runtime.clone());
    let events = runtime.subscribe();

    let authority1 = KeyPair::generate();
    let authority2 = KeyPair::generate();
    let donor1 = KeyPair::generate();
    let donor2 = KeyPair::generate();
    let destination = KeyPair::generate();
    for keypair in [&authority1, &authority2, &donor1, &donor2, &destination] {
        runtime.airdrop(&keypair.pubkey(), AIRDROP)?;
    }

    let bank1 = client.initialize(&authority1, &authority1.pubkey())?;
    let bank2 = client.initialize(&authority2, &authority2.pubkey())?;

    client.make_donation(&donor2, &bank1, 10_000)?;
    client.make_donation(&donor2, &bank1, 20_000)?;
    client.make_donation(&donor1, &bank1, 10_000)?;
    client.make_donation(&donor1, &bank2, 5_000)?;

    if let Err(e) = client.make_donation(&donor1, &bank1, 0) {
        tracing::info!(error = %e, "zero donation rejected as expected");
    }

    let registries = query::list_registries(&runtime, &bank1)?;
    let raised = query::total_raised(&runtime, &bank1)?;
    let withdrawable = query::withdrawable(&runtime, &bank1)?;

    let receipt = client.withdraw(&authority1, &bank1, &destination.pubkey())?;

    let streamed: Vec<_> = events.try_iter().map(|r| r.event.name()).collect();

    let summary = serde_json::json!({
        "program_id": runtime.program_id().to_string(),
        "slot": runtime.slot(),
        "bank": bank1.to_string(),
        "registries": registries
            .iter()
            .map(|(address, registry)| serde_json::json!({
                "address": address.to_string(),
                "donor": registry.donor.to_string(),
                "amount": registry.amount,
            }))
            .collect::<Vec<_>>(),
        "total_raised": raised.to_string(),
        "withdrawn": withdrawable,
        "withdraw_slot": receipt.slot,
        "bank_balance": runtime.get_balance(&bank1),
        "other_bank_raised": query::total_raised(&runtime, &bank2)?.to_string(),
        "events": streamed,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(path) = config.snapshot_path() {
        runtime.save_snapshot(&path)?;
    }

    tracing::debug!(metrics = %runtime.metrics().render(), "final metrics");
    tracing::info!("Simulation complete");
    Ok(())
}
