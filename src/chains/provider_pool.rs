//! Chain Provider Pool
//!
//! Produces a live, tested connection handle per configured chain.
//!
//! Flow per chain:
//! 1. **Untested**: nothing probed yet. The first `get_provider` call runs endpoint
//!    selection (primary URL, then each fallback in order).
//! 2. **Connected**: an endpoint answered `eth_blockNumber` within the probe timeout. The
//!    handle (RPC client plus bound registry contract) is shared by every caller.
//! 3. **Unavailable**: every endpoint failed. Calls fail fast with `ChainUnavailable`
//!    until `recheck_health` clears the state.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::registry::RegistryContract;
use super::rpc::RpcClient;
use crate::config::{ChainInfo, EggnsConfig};
use crate::error::{EggnsError, Result};
use crate::types::NetworkId;

// ============================================================================
// ENDPOINT SELECTION
// ============================================================================

/// Every endpoint failed its probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllFailed {
    /// `(endpoint, reason)` in probe order
    pub failures: Vec<(String, String)>,
}

impl std::fmt::Display for AllFailed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.failures.is_empty() {
            return f.write_str("no endpoints configured");
        }
        let details: Vec<String> = self
            .failures
            .iter()
            .map(|(endpoint, reason)| format!("{} ({})", endpoint, reason))
            .collect();
        write!(f, "all endpoints failed: {}", details.join("; "))
    }
}

impl std::error::Error for AllFailed {}

/// Tries `endpoints` in order and returns the first handle whose probe succeeds.
///
/// # Arguments
///
/// * `endpoints` - Candidate endpoints, primary first
/// * `probe` - Connects to one endpoint and checks it is live
///
/// # Returns
///
/// * `Ok((endpoint, handle))` - First endpoint that passed the probe
/// * `Err(AllFailed)` - Every endpoint failed, with each endpoint's error
pub async fn select_provider<H, F, Fut>(
    endpoints: &[String],
    mut probe: F,
) -> std::result::Result<H, AllFailed>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = std::result::Result<H, String>>,
{
    let mut failures = Vec::with_capacity(endpoints.len());
    for endpoint in endpoints {
        match probe(endpoint.clone()).await {
            Ok(handle) => return Ok(handle),
            Err(reason) => {
                warn!("Endpoint {} failed liveness probe: {}", endpoint, reason);
                failures.push((endpoint.clone(), reason));
            }
        }
    }
    Err(AllFailed { failures })
}

/// Liveness probe: `eth_blockNumber` within `probe_timeout`.
pub async fn probe_endpoint(
    url: String,
    probe_timeout: Duration,
    request_timeout: Duration,
) -> std::result::Result<Arc<RpcClient>, String> {
    let rpc = RpcClient::new(&url, request_timeout).map_err(|e| e.to_string())?;
    match tokio::time::timeout(probe_timeout, rpc.block_number()).await {
        Ok(Ok(block)) => {
            debug!("Endpoint {} is live at block {}", url, block);
            Ok(Arc::new(rpc))
        }
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("no answer within {:?}", probe_timeout)),
    }
}

// ============================================================================
// POOL
// ============================================================================

/// Connected chain: selected endpoint plus the registry bound to it.
#[derive(Debug)]
pub struct ChainHandle {
    pub info: ChainInfo,
    pub endpoint: String,
    pub rpc: Arc<RpcClient>,
    pub registry: RegistryContract,
}

#[derive(Debug, Clone)]
enum ChainState {
    Untested,
    Connected(Arc<ChainHandle>),
    Unavailable {
        reason: String,
        since: DateTime<Utc>,
    },
}

/// Health of one chain as reported to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ChainHealth {
    Untested,
    Connected {
        endpoint: String,
        latest_block: Option<u64>,
    },
    Unavailable {
        reason: String,
        since: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainHealthReport {
    pub network_id: NetworkId,
    pub name: String,
    pub health: ChainHealth,
}

impl ChainHealthReport {
    pub fn is_healthy(&self) -> bool {
        matches!(self.health, ChainHealth::Connected { .. })
    }
}

/// Shared pool of chain connections.
pub struct ChainProviderPool {
    chains: BTreeMap<NetworkId, ChainInfo>,
    state: RwLock<HashMap<NetworkId, ChainState>>,
    /// Serializes endpoint selection per chain so concurrent callers probe once
    connect_locks: HashMap<NetworkId, Mutex<()>>,
    probe_timeout: Duration,
    request_timeout: Duration,
}

impl ChainProviderPool {
    pub fn new(chains: Vec<ChainInfo>, probe_timeout: Duration, request_timeout: Duration) -> Self {
        let chains: BTreeMap<NetworkId, ChainInfo> =
            chains.into_iter().map(|c| (c.network_id, c)).collect();
        let state = chains
            .keys()
            .map(|id| (*id, ChainState::Untested))
            .collect();
        let connect_locks = chains.keys().map(|id| (*id, Mutex::new(()))).collect();

        Self {
            chains,
            state: RwLock::new(state),
            connect_locks,
            probe_timeout,
            request_timeout,
        }
    }

    pub fn from_config(config: &EggnsConfig) -> Self {
        Self::new(
            config.chain.clone(),
            config.service.probe_timeout(),
            config.service.request_timeout(),
        )
    }

    /// Network ids in ascending order.
    pub fn supported_networks(&self) -> Vec<NetworkId> {
        self.chains.keys().copied().collect()
    }

    pub fn chain_info(&self, network_id: NetworkId) -> Result<&ChainInfo> {
        self.chains
            .get(&network_id)
            .ok_or(EggnsError::UnsupportedChain(network_id))
    }

    /// Returns the connected handle for `network_id`, connecting on first use.
    ///
    /// Unavailability is cached: once every endpoint has failed, later calls fail without
    /// a request until `recheck_health` or `recheck_all`.
    ///
    /// # Arguments
    ///
    /// * `network_id` - LxLy network id of the chain
    ///
    /// # Returns
    ///
    /// * `Ok(Arc<ChainHandle>)` - Handle bound to the first endpoint that answered the probe
    /// * `Err(EggnsError::UnsupportedChain)` - No chain is configured for `network_id`
    /// * `Err(EggnsError::ChainUnavailable)` - Every endpoint failed, now or earlier
    pub async fn get_provider(&self, network_id: NetworkId) -> Result<Arc<ChainHandle>> {
        let info = self.chain_info(network_id)?;

        if let Some(handle) = self.cached(network_id).await? {
            return Ok(handle);
        }

        let lock = self
            .connect_locks
            .get(&network_id)
            .ok_or(EggnsError::UnsupportedChain(network_id))?;
        let _guard = lock.lock().await;

        // Another caller may have finished selection while we waited
        if let Some(handle) = self.cached(network_id).await? {
            return Ok(handle);
        }

        let state = self.connect(info).await;
        let result = match &state {
            ChainState::Connected(handle) => Ok(handle.clone()),
            ChainState::Unavailable { reason, .. } => Err(EggnsError::ChainUnavailable {
                network_id,
                reason: reason.clone(),
            }),
            ChainState::Untested => Err(EggnsError::ChainUnavailable {
                network_id,
                reason: "not connected".to_string(),
            }),
        };
        self.state.write().await.insert(network_id, state);
        result
    }

    /// Cached handle, cached unavailability, or `None` when untested.
    async fn cached(&self, network_id: NetworkId) -> Result<Option<Arc<ChainHandle>>> {
        let state = self.state.read().await;
        match state.get(&network_id) {
            Some(ChainState::Connected(handle)) => Ok(Some(handle.clone())),
            Some(ChainState::Unavailable { reason, .. }) => Err(EggnsError::ChainUnavailable {
                network_id,
                reason: reason.clone(),
            }),
            Some(ChainState::Untested) | None => Ok(None),
        }
    }

    async fn connect(&self, info: &ChainInfo) -> ChainState {
        let probe_timeout = self.probe_timeout;
        let request_timeout = self.request_timeout;
        let endpoints = info.endpoints();

        let selected = select_provider(&endpoints, |url| async move {
            let rpc = probe_endpoint(url.clone(), probe_timeout, request_timeout).await?;
            Ok((url, rpc))
        })
        .await;

        match selected {
            Ok((endpoint, rpc)) => {
                if endpoint != info.rpc_url {
                    warn!("{} using fallback RPC {}", info.name, endpoint);
                }
                info!("Connected {} (network {}) via {}", info.name, info.network_id, endpoint);
                let registry =
                    RegistryContract::new(rpc.clone(), &info.contract_address, info.network_id);
                ChainState::Connected(Arc::new(ChainHandle {
                    info: info.clone(),
                    endpoint,
                    rpc,
                    registry,
                }))
            }
            Err(all_failed) => {
                warn!(
                    "{} (network {}) marked unavailable: {}",
                    info.name, info.network_id, all_failed
                );
                ChainState::Unavailable {
                    reason: all_failed.to_string(),
                    since: Utc::now(),
                }
            }
        }
    }

    /// Connects every configured chain concurrently.
    pub async fn initialize(&self) -> Vec<ChainHealthReport> {
        let networks = self.supported_networks();
        join_all(networks.iter().map(|id| self.get_provider(*id))).await;
        self.health_status().await
    }

    /// Drops a connected handle after a transport failure on `endpoint`, so the next
    /// call re-runs selection. A handle that already moved to another endpoint is kept.
    pub async fn invalidate(&self, network_id: NetworkId, endpoint: &str) {
        let mut state = self.state.write().await;
        if let Some(ChainState::Connected(handle)) = state.get(&network_id) {
            if handle.endpoint == endpoint {
                debug!("Invalidating {} for network {}", endpoint, network_id);
                state.insert(network_id, ChainState::Untested);
            }
        }
    }

    /// Clears cached state for `network_id` and probes again.
    ///
    /// # Returns
    ///
    /// * `Ok(Arc<ChainHandle>)` - Freshly selected handle
    /// * `Err(EggnsError)` - Unknown network, or every endpoint still fails
    pub async fn recheck_health(&self, network_id: NetworkId) -> Result<Arc<ChainHandle>> {
        self.chain_info(network_id)?;
        self.state
            .write()
            .await
            .insert(network_id, ChainState::Untested);
        self.get_provider(network_id).await
    }

    /// Forgets every cached state, including cached unavailability, and reconnects all chains.
    ///
    /// # Returns
    ///
    /// * One report per configured chain, ordered by network id
    pub async fn recheck_all(&self) -> Vec<ChainHealthReport> {
        {
            let mut state = self.state.write().await;
            for id in self.chains.keys() {
                state.insert(*id, ChainState::Untested);
            }
        }
        self.initialize().await
    }

    /// Current state of every chain; connected chains also report their latest block.
    pub async fn health_status(&self) -> Vec<ChainHealthReport> {
        let snapshot: Vec<(NetworkId, ChainState)> = {
            let state = self.state.read().await;
            self.chains
                .keys()
                .map(|id| (*id, state.get(id).cloned().unwrap_or(ChainState::Untested)))
                .collect()
        };

        let reports = snapshot.into_iter().map(|(network_id, state)| async move {
            let name = self
                .chains
                .get(&network_id)
                .map(|c| c.name.clone())
                .unwrap_or_default();
            let health = match state {
                ChainState::Untested => ChainHealth::Untested,
                ChainState::Connected(handle) => ChainHealth::Connected {
                    endpoint: handle.endpoint.clone(),
                    latest_block: handle.rpc.block_number().await.ok(),
                },
                ChainState::Unavailable { reason, since } => {
                    ChainHealth::Unavailable { reason, since }
                }
            };
            ChainHealthReport {
                network_id,
                name,
                health,
            }
        });
        join_all(reports).await
    }

    /// True when every chain is connected.
    pub async fn is_healthy(&self) -> bool {
        let state = self.state.read().await;
        self.chains
            .keys()
            .all(|id| matches!(state.get(id), Some(ChainState::Connected(_))))
    }
}
