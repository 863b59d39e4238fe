//! Service layer: gateways, orchestration, consistency checks and operation tracking.

pub mod bridge_gateway;
pub mod consistency;
pub mod contract_gateway;
pub mod cross_chain;
pub mod directory;
pub mod fees;
pub mod orchestrator;
pub mod retry;
pub mod tracker;

pub use bridge_gateway::{
    BridgeAndCallRequest, BridgeApi, ClaimReadiness, ExitRootWatch, LxlyBridgeGateway,
};
pub use consistency::{ChainPresence, ConsistencyChecker, ConsistencyReport, ConsistencyStatus};
pub use contract_gateway::{ContractGateway, NameRegistryApi, RegisterNameRequest};
pub use cross_chain::{CrossChainNameService, CrossChainTransfer, TrackedBridge};
pub use directory::{ChainNameData, MergedName, NameDirectory};
pub use fees::{FeeQuote, FeeSchedule};
pub use orchestrator::{
    OrchestratorSettings, RegistrationOrchestrator, RegistrationProgress, RegistrationResult,
    RegistrationStep,
};
pub use retry::{AttemptError, RetryPolicy};
pub use tracker::OperationTracker;
