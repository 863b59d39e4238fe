//! Configuration Management Module
//!
//! Loads the EggNS service configuration from TOML: supported chains, retry and timeout
//! settings, bridge parameters and the registration route (source, destination, forwarder).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::chains::abi;
use crate::types::NetworkId;

/// Environment variable overriding the configuration path.
pub const CONFIG_PATH_ENV: &str = "EGGNS_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config/eggns.toml";

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure.
///
/// Holds:
/// - Service tuning (retries, timeouts, tracker size)
/// - Bridge settings (proof service, claim polling, bridge value)
/// - Registration route (source and destination networks, forwarder)
/// - Signer address
/// - Supported chains (use [[chain]] in TOML)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EggnsConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    pub bridge: BridgeConfig,
    pub registration: RegistrationConfig,
    pub signer: SignerConfig,
    #[serde(default)]
    pub chain: Vec<ChainInfo>,
}

/// Static descriptor of a supported chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainInfo {
    /// EVM chain id (e.g. 11155111 for Sepolia)
    pub chain_id: u64,
    /// Bridge network id (0 for the L1)
    pub network_id: NetworkId,
    pub name: String,
    /// Primary RPC endpoint
    pub rpc_url: String,
    /// Tried in order when the primary endpoint fails
    #[serde(default)]
    pub fallback_rpc_urls: Vec<String>,
    /// Name registry contract
    pub contract_address: String,
    /// LxLy bridge contract (bridgeMessage, claimMessage, claimAsset)
    pub bridge_address: String,
    /// Bridge extension contract (bridgeAndCall)
    pub bridge_extension_address: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub short_name: String,
}

impl ChainInfo {
    /// Primary endpoint followed by the fallbacks, in probe order.
    pub fn endpoints(&self) -> Vec<String> {
        std::iter::once(self.rpc_url.clone())
            .chain(self.fallback_rpc_urls.iter().cloned())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Attempts for read calls (first try included)
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    /// Liveness probe timeout per endpoint
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// HTTP timeout for JSON-RPC requests
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,
    #[serde(default = "default_receipt_timeout_ms")]
    pub receipt_timeout_ms: u64,
    /// Maximum operations kept in the tracker
    #[serde(default = "default_tracker_capacity")]
    pub tracker_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            receipt_poll_interval_ms: default_receipt_poll_interval_ms(),
            receipt_timeout_ms: default_receipt_timeout_ms(),
            tracker_capacity: default_tracker_capacity(),
        }
    }
}

impl ServiceConfig {
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_interval_ms)
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_millis(self.receipt_timeout_ms)
    }
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_probe_timeout_ms() -> u64 {
    5000
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_receipt_poll_interval_ms() -> u64 {
    2000
}

fn default_receipt_timeout_ms() -> u64 {
    180_000
}

fn default_tracker_capacity() -> usize {
    10
}

/// Bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Bridge proof service base URL
    pub proof_api_url: String,
    #[serde(default = "default_claim_poll_interval_ms")]
    pub claim_poll_interval_ms: u64,
    #[serde(default = "default_claim_timeout_ms")]
    pub claim_timeout_ms: u64,
    #[serde(default = "default_force_update")]
    pub force_update_global_exit_root: bool,
    /// Value in wei sent with bridgeAndCall
    #[serde(default = "default_bridge_value_wei")]
    pub bridge_value_wei: String,
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
}

impl BridgeConfig {
    pub fn claim_poll_interval(&self) -> Duration {
        Duration::from_millis(self.claim_poll_interval_ms)
    }

    pub fn claim_timeout(&self) -> Duration {
        Duration::from_millis(self.claim_timeout_ms)
    }
}

fn default_claim_poll_interval_ms() -> u64 {
    10_000
}

fn default_claim_timeout_ms() -> u64 {
    300_000
}

fn default_force_update() -> bool {
    true
}

fn default_bridge_value_wei() -> String {
    "1000000000000000".to_string()
}

fn default_gas_limit() -> u64 {
    5_000_000
}

/// Registration route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationConfig {
    pub source_network: NetworkId,
    pub destination_network: NetworkId,
    /// Forwarder on the destination that receives the bridged call
    pub forwarder_address: String,
    /// Display fallback when the registration fee cannot be read
    #[serde(default = "default_registration_fee_wei")]
    pub default_registration_fee_wei: String,
    #[serde(default = "default_renewal_fee_wei")]
    pub default_renewal_fee_wei: String,
}

fn default_registration_fee_wei() -> String {
    "1000000000000000".to_string()
}

fn default_renewal_fee_wei() -> String {
    "500000000000000".to_string()
}

/// Signer configuration. The account must be unlocked on the RPC endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerConfig {
    pub address: String,
}

// ============================================================================
// LOADING AND VALIDATION
// ============================================================================

impl EggnsConfig {
    /// Loads configuration from a TOML file.
    ///
    /// Uses `path` if given, then `EGGNS_CONFIG_PATH`, then `config/eggns.toml`.
    pub fn load_from_path(path: Option<&str>) -> Result<Self> {
        let config_path = path
            .map(|p| p.to_string())
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        if !std::path::Path::new(&config_path).exists() {
            return Err(anyhow::anyhow!(
                "Configuration file '{}' not found. Please copy the template:\n\
                cp config/eggns.template.toml config/eggns.toml\n\
                Then edit config/eggns.toml with your actual values.",
                config_path
            ));
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path))?;
        Self::from_toml_str(&content).with_context(|| format!("Invalid config {}", config_path))
    }

    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EggnsConfig = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn chain_by_network(&self, network_id: NetworkId) -> Option<&ChainInfo> {
        self.chain.iter().find(|c| c.network_id == network_id)
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - At least one chain, with unique chain and network ids
    /// - Well-formed endpoint URLs and contract addresses
    /// - Source and destination networks differ and are both configured
    /// - Non-zero retry attempts and tracker capacity
    pub fn validate(&self) -> Result<()> {
        if self.chain.is_empty() {
            anyhow::bail!("Configuration error: At least one [[chain]] must be configured");
        }

        let mut chain_ids = HashSet::new();
        let mut network_ids = HashSet::new();
        for chain in &self.chain {
            if !chain_ids.insert(chain.chain_id) {
                anyhow::bail!(
                    "Configuration error: Duplicate chain_id {} ({})",
                    chain.chain_id,
                    chain.name
                );
            }
            if !network_ids.insert(chain.network_id) {
                anyhow::bail!(
                    "Configuration error: Duplicate network_id {} ({})",
                    chain.network_id,
                    chain.name
                );
            }
            for endpoint in chain.endpoints() {
                validate_http_url(&endpoint)
                    .with_context(|| format!("Chain {} has an invalid RPC URL", chain.name))?;
            }
            for (field, value) in [
                ("contract_address", &chain.contract_address),
                ("bridge_address", &chain.bridge_address),
                ("bridge_extension_address", &chain.bridge_extension_address),
            ] {
                if !abi::is_valid_address(value) {
                    anyhow::bail!(
                        "Configuration error: Chain {} has invalid {}: {}",
                        chain.name,
                        field,
                        value
                    );
                }
            }
        }

        let route = &self.registration;
        if route.source_network == route.destination_network {
            anyhow::bail!(
                "Configuration error: source_network and destination_network are both {}",
                route.source_network
            );
        }
        for network_id in [route.source_network, route.destination_network] {
            if self.chain_by_network(network_id).is_none() {
                anyhow::bail!(
                    "Configuration error: Registration network {} is not a configured chain",
                    network_id
                );
            }
        }
        if !abi::is_valid_address(&route.forwarder_address) {
            anyhow::bail!(
                "Configuration error: Invalid forwarder_address: {}",
                route.forwarder_address
            );
        }
        for (field, value) in [
            ("default_registration_fee_wei", &route.default_registration_fee_wei),
            ("default_renewal_fee_wei", &route.default_renewal_fee_wei),
            ("bridge_value_wei", &self.bridge.bridge_value_wei),
        ] {
            ethereum_types::U256::from_dec_str(value).map_err(|e| {
                anyhow::anyhow!("Configuration error: Invalid {} '{}': {:?}", field, value, e)
            })?;
        }

        if !abi::is_valid_address(&self.signer.address) {
            anyhow::bail!(
                "Configuration error: Invalid signer address: {}",
                self.signer.address
            );
        }
        validate_http_url(&self.bridge.proof_api_url).context("Invalid proof_api_url")?;

        if self.service.retry_attempts == 0 {
            anyhow::bail!("Configuration error: retry_attempts must be at least 1");
        }
        if self.service.tracker_capacity == 0 {
            anyhow::bail!("Configuration error: tracker_capacity must be at least 1");
        }
        if self.bridge.claim_poll_interval_ms == 0 {
            anyhow::bail!("Configuration error: claim_poll_interval_ms must be positive");
        }

        Ok(())
    }
}

fn validate_http_url(value: &str) -> Result<()> {
    let parsed = url::Url::parse(value).with_context(|| format!("Malformed URL '{}'", value))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => anyhow::bail!("Unsupported URL scheme '{}' in '{}'", other, value),
    }
}
