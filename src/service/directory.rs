//! Multi-chain name directory.
//!
//! Lists the names an owner holds on every chain and merges them into one view keyed by
//! name. A chain that fails keeps its error in the per-chain data and contributes no names.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

use super::contract_gateway::NameRegistryApi;
use crate::chains::abi;
use crate::config::ChainInfo;
use crate::error::{EggnsError, Result};
use crate::types::NetworkId;

/// Names held by an owner on one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainNameData {
    pub network_id: NetworkId,
    pub chain_name: String,
    pub names: Vec<String>,
    pub error: Option<String>,
    pub last_fetched: DateTime<Utc>,
}

/// One name and the chains it appears on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedName {
    pub name: String,
    /// Ascending network ids
    pub networks: Vec<NetworkId>,
}

/// Merges per-chain listings, sorted by name.
pub fn merge_names(chains: &[ChainNameData]) -> Vec<MergedName> {
    let mut merged: BTreeMap<String, Vec<NetworkId>> = BTreeMap::new();
    for chain in chains {
        for name in &chain.names {
            let networks = merged.entry(name.to_lowercase()).or_default();
            if !networks.contains(&chain.network_id) {
                networks.push(chain.network_id);
            }
        }
    }
    merged
        .into_iter()
        .map(|(name, mut networks)| {
            networks.sort_unstable();
            MergedName { name, networks }
        })
        .collect()
}

pub struct NameDirectory {
    registry: Arc<dyn NameRegistryApi>,
    chains: Vec<ChainInfo>,
}

impl NameDirectory {
    pub fn new(registry: Arc<dyn NameRegistryApi>, chains: Vec<ChainInfo>) -> Self {
        Self { registry, chains }
    }

    /// Owner's names on every chain, queried concurrently.
    ///
    /// # Arguments
    ///
    /// * `owner` - Owner address, hex with `0x` prefix
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<ChainNameData>)` - One entry per chain in config order; a failed chain
    ///   carries its error and no names
    /// * `Err(EggnsError::InvalidAddress)` - `owner` is not an address
    pub async fn fetch_names_from_all_chains(&self, owner: &str) -> Result<Vec<ChainNameData>> {
        let owner = abi::normalize_address(owner)
            .map_err(|_| EggnsError::InvalidAddress(owner.to_string()))?;

        let fetches = self.chains.iter().map(|chain| {
            let owner = owner.as_str();
            async move {
                let (names, error) =
                    match self.registry.get_owner_names(chain.network_id, owner).await {
                        Ok(names) => (names, None),
                        Err(e) => {
                            warn!("Fetching names on {} failed: {}", chain.name, e);
                            (Vec::new(), Some(e.to_string()))
                        }
                    };
                ChainNameData {
                    network_id: chain.network_id,
                    chain_name: chain.name.clone(),
                    names,
                    error,
                    last_fetched: Utc::now(),
                }
            }
        });
        Ok(join_all(fetches).await)
    }

    pub async fn owner_names(&self, owner: &str) -> Result<Vec<MergedName>> {
        let chains = self.fetch_names_from_all_chains(owner).await?;
        Ok(merge_names(&chains))
    }
}
