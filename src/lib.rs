//! EggNS cross-chain core
//!
//! Name registration on a source chain, bridging to a destination chain over the LxLy
//! bridge, claim tracking and cross-chain consistency checks.

pub mod app;
pub mod chains;
pub mod config;
pub mod error;
pub mod name;
pub mod service;
pub mod types;

// Re-export public types for convenience
pub use app::EggnsContext;
pub use chains::{ChainHandle, ChainProviderPool};
pub use config::{ChainInfo, EggnsConfig};
pub use error::EggnsError;
pub use name::normalize_name;
pub use service::{
    BridgeApi, ConsistencyChecker, ConsistencyStatus, ContractGateway, CrossChainNameService,
    LxlyBridgeGateway, NameRegistryApi, OperationTracker, RegistrationOrchestrator,
    RegistrationResult, RegistrationStep,
};
pub use types::{
    BridgeStatus, BridgeTransaction, CrossChainOperation, NameRecord, NetworkId,
    OperationStatus, OperationType, RecordOrigin,
};
