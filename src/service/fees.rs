//! Fee schedule for display.
//!
//! Reads the registry fees per chain and falls back to the configured defaults when a
//! read fails. Quotes are for display only: paid writes read the fee directly from the
//! registry and fail instead of guessing.

use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use super::contract_gateway::NameRegistryApi;
use crate::config::EggnsConfig;
use crate::types::NetworkId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeeQuote {
    pub network_id: NetworkId,
    pub registration_fee_wei: String,
    pub renewal_fee_wei: String,
    /// True when at least one fee is a configured default
    pub uses_default: bool,
}

pub struct FeeSchedule {
    registry: Arc<dyn NameRegistryApi>,
    default_registration_fee_wei: String,
    default_renewal_fee_wei: String,
}

impl FeeSchedule {
    pub fn new(
        registry: Arc<dyn NameRegistryApi>,
        default_registration_fee_wei: &str,
        default_renewal_fee_wei: &str,
    ) -> Self {
        Self {
            registry,
            default_registration_fee_wei: default_registration_fee_wei.to_string(),
            default_renewal_fee_wei: default_renewal_fee_wei.to_string(),
        }
    }

    pub fn from_config(registry: Arc<dyn NameRegistryApi>, config: &EggnsConfig) -> Self {
        Self::new(
            registry,
            &config.registration.default_registration_fee_wei,
            &config.registration.default_renewal_fee_wei,
        )
    }

    pub async fn quote(&self, network_id: NetworkId) -> FeeQuote {
        let (registration, renewal) = futures::join!(
            self.registry.get_registration_fee(network_id),
            self.registry.get_renewal_fee(network_id)
        );
        let mut uses_default = false;

        let registration_fee_wei = registration.unwrap_or_else(|e| {
            warn!("Registration fee unavailable on network {}: {}", network_id, e);
            uses_default = true;
            self.default_registration_fee_wei.clone()
        });
        let renewal_fee_wei = renewal.unwrap_or_else(|e| {
            warn!("Renewal fee unavailable on network {}: {}", network_id, e);
            uses_default = true;
            self.default_renewal_fee_wei.clone()
        });

        FeeQuote {
            network_id,
            registration_fee_wei,
            renewal_fee_wei,
            uses_default,
        }
    }

    /// Quotes for several networks, in the order given.
    pub async fn quote_all(&self, networks: &[NetworkId]) -> Vec<FeeQuote> {
        join_all(networks.iter().map(|id| self.quote(*id))).await
    }
}
