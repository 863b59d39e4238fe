//! EggNS operator CLI
//!
//! Thin command-line driver over the cross-chain core: health checks, lookups,
//! consistency verification, registration, bridging, transfers and claims.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin eggns -- --config config/eggns.toml register alice
//! ```
//!
//! Or set the config path via environment variable:
//!
//! ```bash
//! EGGNS_CONFIG_PATH=config/eggns.toml cargo run --bin eggns -- verify alice
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use eggns::{
    app::log_filter,
    config::{EggnsConfig, CONFIG_PATH_ENV},
    service::{BridgeApi, NameRegistryApi},
    EggnsContext, NetworkId,
};
use ethereum_types::U256;
use serde::Serialize;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "eggns")]
#[command(about = "EggNS cross-chain name registration and bridging")]
struct Args {
    /// Path to configuration file (default: config/eggns.toml or EGGNS_CONFIG_PATH env var)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Probe every chain and report provider health
    Health {
        /// Re-probe chains already cached as unavailable
        #[arg(long)]
        recheck: bool,
    },
    /// Resolve a name on one chain
    Resolve {
        name: String,
        /// Network id (default: registration source)
        #[arg(short, long)]
        network: Option<NetworkId>,
    },
    /// Check name availability on one chain
    Available {
        name: String,
        #[arg(short, long)]
        network: Option<NetworkId>,
    },
    /// Compare a name across every chain
    Verify { name: String },
    /// List an owner's names on every chain
    Names { owner: String },
    /// Show registration and renewal fees per chain
    Fees,
    /// Register on the source chain and bridge to the destination
    Register { name: String },
    /// Bridge an existing native name to another chain
    BridgeName {
        name: String,
        #[arg(long)]
        from: NetworkId,
        #[arg(long)]
        to: NetworkId,
        /// Send this much wei with bridgeAndCall instead of a plain message
        #[arg(long)]
        value_wei: Option<String>,
    },
    /// Transfer a name and propagate the new owner to another chain
    Transfer {
        name: String,
        new_owner: String,
        #[arg(long)]
        from: NetworkId,
        #[arg(long)]
        to: NetworkId,
    },
    /// Bridge status of a transaction
    Status {
        tx_hash: String,
        #[arg(long)]
        source: NetworkId,
    },
    /// Wait until a bridge transaction is ready to claim
    Wait {
        tx_hash: String,
        #[arg(long)]
        source: NetworkId,
        /// Timeout in seconds (default: bridge.claim_timeout_ms)
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Claim a bridge transaction on its destination
    Claim {
        tx_hash: String,
        #[arg(long)]
        source: NetworkId,
        #[arg(long)]
        destination: NetworkId,
        /// Claim the asset deposit instead of the message
        #[arg(long)]
        asset: bool,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize structured logging (RUST_LOG controls the level, default info)
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref()))
        .init();

    let config = if let Some(path) = args.config.as_deref() {
        info!("Loading configuration from: {}", path);
        EggnsConfig::load_from_path(Some(path))?
    } else {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            info!("Loading configuration from {}: {}", CONFIG_PATH_ENV, path);
        } else {
            info!("Loading configuration from default location");
        }
        EggnsConfig::load()?
    };
    info!(
        "Route: network {} -> network {} via forwarder {}",
        config.registration.source_network,
        config.registration.destination_network,
        config.registration.forwarder_address
    );

    let default_network = config.registration.source_network;
    let ctx = EggnsContext::from_config(config).context("Failed to build services")?;

    match args.command {
        Command::Health { recheck } => {
            let reports = if recheck {
                ctx.pool.recheck_all().await
            } else {
                ctx.pool.initialize().await
            };
            print_json(&reports)?;
        }
        Command::Resolve { name, network } => {
            let record = ctx
                .registry
                .resolve_name(network.unwrap_or(default_network), &name)
                .await?;
            let expired = record.as_ref().map(|r| r.is_expired());
            print_json(&serde_json::json!({ "expired": expired, "record": record }))?;
        }
        Command::Available { name, network } => {
            let available = ctx
                .registry
                .is_name_available(network.unwrap_or(default_network), &name)
                .await?;
            print_json(&serde_json::json!({ "name": name, "available": available }))?;
        }
        Command::Verify { name } => {
            let report = ctx.consistency.verify(&name).await?;
            print_json(&report)?;
        }
        Command::Names { owner } => {
            let chains = ctx.directory.fetch_names_from_all_chains(&owner).await?;
            let merged = eggns::service::directory::merge_names(&chains);
            print_json(&serde_json::json!({ "chains": chains, "names": merged }))?;
        }
        Command::Fees => {
            let quotes = ctx.fees.quote_all(&ctx.pool.supported_networks()).await;
            print_json(&quotes)?;
        }
        Command::Register { name } => {
            let mut progress = ctx.orchestrator.subscribe();
            let watcher = tokio::spawn(async move {
                while progress.changed().await.is_ok() {
                    let snapshot = progress.borrow().clone();
                    if let Some(step) = snapshot.current_step {
                        info!("[{:>3}%] {}", snapshot.progress, step);
                    }
                }
            });
            let result = ctx.orchestrator.register(&name).await;
            watcher.abort();
            print_json(&result)?;
            if !result.success {
                anyhow::bail!("Registration failed at {}", result.step);
            }
        }
        Command::BridgeName {
            name,
            from,
            to,
            value_wei,
        } => {
            let tracked = match value_wei {
                Some(value) => {
                    let amount = U256::from_dec_str(&value)
                        .map_err(|e| anyhow::anyhow!("Invalid value_wei '{}': {:?}", value, e))?;
                    ctx.cross_chain
                        .bridge_name_with_value(&name, from, to, amount)
                        .await?
                }
                None => ctx.cross_chain.bridge_name_to_chain(&name, from, to).await?,
            };
            print_json(&tracked)?;
        }
        Command::Transfer {
            name,
            new_owner,
            from,
            to,
        } => {
            let transfer = ctx
                .cross_chain
                .transfer_name_cross_chain(&name, &new_owner, from, to)
                .await?;
            print_json(&transfer)?;
        }
        Command::Status { tx_hash, source } => {
            let status = ctx
                .bridge
                .get_bridge_transaction_status(&tx_hash, source)
                .await?;
            print_json(&serde_json::json!({ "transaction_hash": tx_hash, "status": status }))?;
        }
        Command::Wait {
            tx_hash,
            source,
            timeout_secs,
        } => {
            let ready = ctx
                .bridge
                .wait_for_global_exit_root_update(
                    &tx_hash,
                    source,
                    timeout_secs.map(Duration::from_secs),
                )
                .await;
            print_json(&serde_json::json!({ "transaction_hash": tx_hash, "ready": ready }))?;
        }
        Command::Claim {
            tx_hash,
            source,
            destination,
            asset,
        } => {
            let claim = if asset {
                ctx.bridge.claim_asset(&tx_hash, source, destination).await?
            } else {
                ctx.bridge
                    .claim_message(&tx_hash, source, destination)
                    .await?
            };
            print_json(&claim)?;
        }
    }

    Ok(())
}
