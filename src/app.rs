//! Composition root.
//!
//! Builds every component once from the configuration and shares them through `Arc`.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::chains::ChainProviderPool;
use crate::config::EggnsConfig;
use crate::error::Result;
use crate::service::{
    BridgeApi, ConsistencyChecker, ContractGateway, CrossChainNameService, FeeSchedule,
    LxlyBridgeGateway, NameDirectory, NameRegistryApi, OperationTracker, OrchestratorSettings,
    RegistrationOrchestrator,
};

/// Level used when no usable filter directives are given.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Builds the log filter from `RUST_LOG` style directives.
///
/// # Arguments
///
/// * `directives` - Filter directives, usually the value of `RUST_LOG`
///
/// # Returns
///
/// * The parsed filter, or `info` when `directives` is absent or does not parse
pub fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

pub struct EggnsContext {
    pub config: EggnsConfig,
    pub pool: Arc<ChainProviderPool>,
    pub registry: Arc<ContractGateway>,
    pub bridge: Arc<LxlyBridgeGateway>,
    pub tracker: Arc<OperationTracker>,
    pub orchestrator: RegistrationOrchestrator,
    pub cross_chain: CrossChainNameService,
    pub consistency: ConsistencyChecker,
    pub directory: NameDirectory,
    pub fees: FeeSchedule,
}

impl EggnsContext {
    pub fn from_config(config: EggnsConfig) -> Result<Self> {
        let pool = Arc::new(ChainProviderPool::from_config(&config));
        let registry = Arc::new(ContractGateway::from_config(pool.clone(), &config));
        let bridge = Arc::new(LxlyBridgeGateway::from_config(pool.clone(), &config)?);
        let tracker = Arc::new(OperationTracker::new(config.service.tracker_capacity));

        let registry_api: Arc<dyn NameRegistryApi> = registry.clone();
        let bridge_api: Arc<dyn BridgeApi> = bridge.clone();

        let orchestrator = RegistrationOrchestrator::new(
            registry_api.clone(),
            bridge_api.clone(),
            tracker.clone(),
            OrchestratorSettings::from_config(&config)?,
        );
        let cross_chain = CrossChainNameService::new(
            registry_api.clone(),
            bridge_api,
            tracker.clone(),
            config.bridge.force_update_global_exit_root,
        );
        let consistency = ConsistencyChecker::new(registry_api.clone(), pool.supported_networks());
        let directory = NameDirectory::new(registry_api.clone(), config.chain.clone());
        let fees = FeeSchedule::from_config(registry_api, &config);

        Ok(Self {
            config,
            pool,
            registry,
            bridge,
            tracker,
            orchestrator,
            cross_chain,
            consistency,
            directory,
            fees,
        })
    }
}
