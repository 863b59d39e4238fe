//! Cross-Chain Consistency Checker
//!
//! Resolves a name on every supported chain at once and classifies the aggregate:
//! not registered anywhere, present on a single chain, consistent, or inconsistent.
//! An inconsistent result is reported as-is and never reconciled.

use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::contract_gateway::NameRegistryApi;
use crate::error::Result;
use crate::name::normalize_name;
use crate::types::{NameRecord, NetworkId};

/// Aggregate classification of a name across chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyStatus {
    NotRegistered,
    SingleChain,
    Consistent,
    Inconsistent,
}

/// Outcome of resolving the name on one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainPresence {
    Registered { record: NameRecord },
    NotRegistered,
    /// The chain could not answer; counted as not holding the name
    Error { message: String },
}

impl ChainPresence {
    pub fn record(&self) -> Option<&NameRecord> {
        match self {
            ChainPresence::Registered { record } => Some(record),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    pub name: String,
    pub status: ConsistencyStatus,
    pub chains: BTreeMap<NetworkId, ChainPresence>,
}

/// Classifies the records found, in network order.
///
/// Records are compared on owner and resolved address against the first one.
pub fn classify(records: &[&NameRecord]) -> ConsistencyStatus {
    match records {
        [] => ConsistencyStatus::NotRegistered,
        [_] => ConsistencyStatus::SingleChain,
        [first, rest @ ..] => {
            let matches = |other: &&NameRecord| {
                other.owner.eq_ignore_ascii_case(&first.owner)
                    && other
                        .resolved_address
                        .eq_ignore_ascii_case(&first.resolved_address)
            };
            if rest.iter().all(matches) {
                ConsistencyStatus::Consistent
            } else {
                ConsistencyStatus::Inconsistent
            }
        }
    }
}

pub struct ConsistencyChecker {
    registry: Arc<dyn NameRegistryApi>,
    networks: Vec<NetworkId>,
}

impl ConsistencyChecker {
    pub fn new(registry: Arc<dyn NameRegistryApi>, networks: Vec<NetworkId>) -> Self {
        Self { registry, networks }
    }

    /// Resolves `name` on every network concurrently; a failing chain never hides the
    /// others' answers.
    pub async fn presence(&self, name: &str) -> Result<BTreeMap<NetworkId, ChainPresence>> {
        let name = normalize_name(name)?;
        let lookups = self.networks.iter().map(|network_id| {
            let name = name.as_str();
            async move {
                let presence = match self.registry.resolve_name(*network_id, name).await {
                    Ok(Some(record)) => ChainPresence::Registered { record },
                    Ok(None) => ChainPresence::NotRegistered,
                    Err(e) => {
                        warn!("Resolving '{}' on network {} failed: {}", name, network_id, e);
                        ChainPresence::Error {
                            message: e.to_string(),
                        }
                    }
                };
                (*network_id, presence)
            }
        });
        Ok(join_all(lookups).await.into_iter().collect())
    }

    /// Compares `name` across every network.
    ///
    /// # Returns
    ///
    /// * `Ok(ConsistencyReport)` - Per-chain presence and the overall classification
    /// * `Err(EggnsError::InvalidNameFormat)` - Rejected before any chain is queried
    pub async fn verify(&self, name: &str) -> Result<ConsistencyReport> {
        let name = normalize_name(name)?;
        let chains = self.presence(&name).await?;
        let records: Vec<&NameRecord> = chains.values().filter_map(ChainPresence::record).collect();
        let status = classify(&records);

        if status == ConsistencyStatus::Inconsistent {
            warn!("Name '{}' is inconsistent across chains", name);
        } else {
            info!("Name '{}' consistency: {:?}", name, status);
        }

        Ok(ConsistencyReport {
            name,
            status,
            chains,
        })
    }
}
