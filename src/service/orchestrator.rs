//! Cross-Chain Registration Orchestrator
//!
//! Drives one name through the registration protocol and publishes step-level progress.
//!
//! Steps (progress weight in parentheses):
//! 1. **availability_check (10)**: validate the name locally, then ask the source registry.
//! 2. **source_registration (30)**: `registerName` on the source chain, paying the
//!    on-chain registration fee.
//! 3. **data_verification (50)**: read the owner back with `getNameData`. The on-chain
//!    owner is the signer, which is what the destination must receive.
//! 4. **destination_precheck (70)**: the forwarder must be deployed and the name must not
//!    exist on the destination registry yet.
//! 5. **bridge_to_destination (90)**: `bridgeAndCall` to the forwarder carrying
//!    `receiveBridgedName(name, owner)`, with the owner as fallback.
//! 6. **completed (100)**: the bridge hash is returned. Destination execution is claimed
//!    later through the bridge gateway and the operation tracker.
//!
//! Each step completes or fails the whole registration. Nothing is retried here.

use ethereum_types::U256;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::bridge_gateway::{BridgeAndCallRequest, BridgeApi};
use super::contract_gateway::{NameRegistryApi, RegisterNameRequest};
use super::tracker::OperationTracker;
use crate::chains::{abi, registry};
use crate::config::EggnsConfig;
use crate::error::{EggnsError, Result};
use crate::name::normalize_name;
use crate::types::{NetworkId, OperationStatus, OperationType};

// ============================================================================
// STEPS AND RESULTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStep {
    AvailabilityCheck,
    SourceRegistration,
    DataVerification,
    DestinationPrecheck,
    BridgeToDestination,
    Completed,
}

impl RegistrationStep {
    /// Progress percentage shown while this step runs.
    pub fn progress(&self) -> u8 {
        match self {
            RegistrationStep::AvailabilityCheck => 10,
            RegistrationStep::SourceRegistration => 30,
            RegistrationStep::DataVerification => 50,
            RegistrationStep::DestinationPrecheck => 70,
            RegistrationStep::BridgeToDestination => 90,
            RegistrationStep::Completed => 100,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStep::AvailabilityCheck => "availability_check",
            RegistrationStep::SourceRegistration => "source_registration",
            RegistrationStep::DataVerification => "data_verification",
            RegistrationStep::DestinationPrecheck => "destination_precheck",
            RegistrationStep::BridgeToDestination => "bridge_to_destination",
            RegistrationStep::Completed => "completed",
        }
    }
}

impl std::fmt::Display for RegistrationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result of one registration. Failures carry the step and any hash obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationResult {
    pub success: bool,
    pub message: String,
    pub step: RegistrationStep,
    pub name: String,
    /// Bridge transaction on success; latest transaction obtained on failure
    pub transaction_hash: Option<String>,
    /// `registerName` transaction on the source chain
    pub source_transaction_hash: Option<String>,
    pub owner: Option<String>,
    pub error: Option<String>,
    pub forwarder_address: String,
    pub registry_address: Option<String>,
    pub operation_id: Option<Uuid>,
}

/// Progress snapshot published to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct RegistrationProgress {
    pub is_loading: bool,
    pub current_step: Option<RegistrationStep>,
    /// 0 to 100
    pub progress: u8,
    pub result: Option<RegistrationResult>,
    pub error: Option<String>,
}

/// Registration route and bridge parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub source_network: NetworkId,
    pub source_name: String,
    pub destination_network: NetworkId,
    pub destination_name: String,
    pub forwarder_address: String,
    /// Value sent with `bridgeAndCall`
    pub bridge_value: U256,
    pub force_update_global_exit_root: bool,
}

impl OrchestratorSettings {
    pub fn from_config(config: &EggnsConfig) -> Result<Self> {
        let route = &config.registration;
        let chain_name = |network_id| {
            config
                .chain_by_network(network_id)
                .map(|c| c.name.clone())
                .ok_or(EggnsError::UnsupportedChain(network_id))
        };
        let bridge_value = U256::from_dec_str(&config.bridge.bridge_value_wei).map_err(|_| {
            EggnsError::InvalidRequest(format!(
                "invalid bridge_value_wei '{}'",
                config.bridge.bridge_value_wei
            ))
        })?;

        Ok(Self {
            source_network: route.source_network,
            source_name: chain_name(route.source_network)?,
            destination_network: route.destination_network,
            destination_name: chain_name(route.destination_network)?,
            forwarder_address: route.forwarder_address.to_lowercase(),
            bridge_value,
            force_update_global_exit_root: config.bridge.force_update_global_exit_root,
        })
    }
}

/// Failure at a given step.
#[derive(Debug)]
struct StepFailure {
    step: RegistrationStep,
    message: String,
    error: EggnsError,
}

trait AtStep<T> {
    fn at_step(self, step: RegistrationStep, message: &str) -> std::result::Result<T, StepFailure>;
}

impl<T> AtStep<T> for Result<T> {
    fn at_step(self, step: RegistrationStep, message: &str) -> std::result::Result<T, StepFailure> {
        self.map_err(|error| StepFailure {
            step,
            message: message.to_string(),
            error,
        })
    }
}

/// What a registration has produced so far; reported on failure.
#[derive(Debug, Default)]
struct Attempt {
    name: String,
    operation_id: Option<Uuid>,
    source_transaction_hash: Option<String>,
    owner: Option<String>,
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

pub struct RegistrationOrchestrator {
    registry: Arc<dyn NameRegistryApi>,
    bridge: Arc<dyn BridgeApi>,
    tracker: Arc<OperationTracker>,
    settings: OrchestratorSettings,
    progress: watch::Sender<RegistrationProgress>,
}

impl RegistrationOrchestrator {
    pub fn new(
        registry: Arc<dyn NameRegistryApi>,
        bridge: Arc<dyn BridgeApi>,
        tracker: Arc<OperationTracker>,
        settings: OrchestratorSettings,
    ) -> Self {
        let (progress, _) = watch::channel(RegistrationProgress::default());
        Self {
            registry,
            bridge,
            tracker,
            settings,
            progress,
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Receiver that observes every progress update.
    pub fn subscribe(&self) -> watch::Receiver<RegistrationProgress> {
        self.progress.subscribe()
    }

    pub fn progress(&self) -> RegistrationProgress {
        self.progress.borrow().clone()
    }

    /// Clears progress back to idle.
    pub fn reset(&self) {
        self.progress.send_replace(RegistrationProgress::default());
    }

    fn enter(&self, step: RegistrationStep) {
        info!("Registration step: {} ({}%)", step, step.progress());
        self.progress.send_replace(RegistrationProgress {
            is_loading: step != RegistrationStep::Completed,
            current_step: Some(step),
            progress: step.progress(),
            result: None,
            error: None,
        });
    }

    /// Registers `name` on the source chain and bridges it to the destination.
    ///
    /// Never returns an error: every failure is a result with `success == false`.
    ///
    /// # Arguments
    ///
    /// * `name` - Name as typed; normalized before any chain is touched
    ///
    /// # Returns
    ///
    /// * `RegistrationResult` - Last step reached, the source and bridge hashes that were
    ///   mined, and the error message on failure
    pub async fn register(&self, name: &str) -> RegistrationResult {
        let mut attempt = Attempt {
            name: name.trim().to_lowercase(),
            ..Attempt::default()
        };

        match self.run(name, &mut attempt).await {
            Ok(result) => {
                self.progress.send_replace(RegistrationProgress {
                    is_loading: false,
                    current_step: Some(RegistrationStep::Completed),
                    progress: RegistrationStep::Completed.progress(),
                    result: Some(result.clone()),
                    error: None,
                });
                result
            }
            Err(failure) => self.fail(attempt, failure).await,
        }
    }

    async fn run(
        &self,
        raw_name: &str,
        attempt: &mut Attempt,
    ) -> std::result::Result<RegistrationResult, StepFailure> {
        let source = self.settings.source_network;
        let destination = self.settings.destination_network;

        // 1. Availability
        let step = RegistrationStep::AvailabilityCheck;
        self.enter(step);
        let name = normalize_name(raw_name).at_step(step, "Invalid name format")?;
        attempt.name = name.clone();
        let available = self
            .registry
            .is_name_available(source, &name)
            .await
            .at_step(step, "Failed to check name availability")?;
        if !available {
            return Err(EggnsError::NameNotAvailable(name)).at_step(step, "Name is not available");
        }

        // 2. Source registration
        let step = RegistrationStep::SourceRegistration;
        self.enter(step);
        let source_failure = format!("Failed to register name on {}", self.settings.source_name);
        let fee = self
            .registry
            .get_registration_fee(source)
            .await
            .and_then(|fee| {
                U256::from_dec_str(&fee).map_err(|_| EggnsError::ContractCall {
                    network_id: source,
                    method: "registrationFee".to_string(),
                    reason: format!("invalid fee '{}'", fee),
                })
            })
            .at_step(step, &source_failure)?;
        let operation_id = self
            .tracker
            .record(OperationType::Register, &name, source, destination)
            .await;
        attempt.operation_id = Some(operation_id);

        let request = RegisterNameRequest {
            name: name.clone(),
            resolved_address: self.registry.signer_address(),
            content_hash: None,
            fee,
        };
        let registration = self
            .registry
            .register_name(source, &request)
            .await
            .at_step(step, &source_failure)?;
        attempt.source_transaction_hash = Some(registration.transaction_hash.clone());

        // 3. Read-after-write verification
        let step = RegistrationStep::DataVerification;
        self.enter(step);
        let verify_failure = format!(
            "Failed to retrieve name data from {}",
            self.settings.source_name
        );
        let owner = self
            .registry
            .get_name_owner(source, &name)
            .await
            .and_then(|owner| {
                owner.ok_or_else(|| EggnsError::ContractCall {
                    network_id: source,
                    method: "getNameData".to_string(),
                    reason: "name missing after registration".to_string(),
                })
            })
            .at_step(step, &verify_failure)?;
        attempt.owner = Some(owner.clone());

        // 4. Destination pre-check
        let step = RegistrationStep::DestinationPrecheck;
        self.enter(step);
        let precheck_failure = format!(
            "Failed to check name on {}",
            self.settings.destination_name
        );
        let forwarder = self.settings.forwarder_address.clone();
        let deployed = self
            .bridge
            .is_contract_deployed(destination, &forwarder)
            .await
            .at_step(step, &precheck_failure)?;
        if !deployed {
            return Err(EggnsError::InvalidRequest(format!(
                "forwarder {} has no code on network {}",
                forwarder, destination
            )))
            .at_step(step, "Forwarder contract not deployed on destination chain");
        }
        let existing = self
            .registry
            .get_name_owner(destination, &name)
            .await
            .at_step(step, &precheck_failure)?;
        if existing.is_some() {
            let message = format!("Name already exists on {}", self.settings.destination_name);
            return Err(EggnsError::DestinationCollision {
                name: name.clone(),
                network_id: destination,
            })
            .at_step(step, &message);
        }

        // 5. Bridge-and-call through the forwarder
        let step = RegistrationStep::BridgeToDestination;
        self.enter(step);
        let bridge_failure = format!("Failed to bridge name to {}", self.settings.destination_name);
        let owner_bytes = abi::parse_address(&owner)
            .map_err(|_| EggnsError::InvalidAddress(owner.clone()))
            .at_step(step, &bridge_failure)?;
        let request = BridgeAndCallRequest {
            source_network: source,
            destination_network: destination,
            call_address: forwarder.clone(),
            fallback_address: owner.clone(),
            call_data: registry::encode_receive_bridged_name(&name, &owner_bytes),
            force_update_global_exit_root: self.settings.force_update_global_exit_root,
            amount: Some(self.settings.bridge_value),
            token: None,
        };
        let bridge_tx = self
            .bridge
            .bridge_and_call(request)
            .await
            .at_step(step, &bridge_failure)?;

        if let Err(e) = self
            .tracker
            .set_bridge_transaction(operation_id, &bridge_tx.transaction_hash)
            .await
        {
            warn!("Could not update tracked registration: {}", e);
        }

        info!(
            "Registered '{}' on network {} and bridged to network {}: {}",
            name, source, destination, bridge_tx.transaction_hash
        );
        Ok(RegistrationResult {
            success: true,
            message: "Name registered and bridged successfully through forwarder".to_string(),
            step: RegistrationStep::Completed,
            name,
            transaction_hash: Some(bridge_tx.transaction_hash),
            source_transaction_hash: Some(registration.transaction_hash),
            owner: Some(owner),
            error: None,
            forwarder_address: forwarder,
            registry_address: self.registry.registry_address(destination).ok(),
            operation_id: Some(operation_id),
        })
    }

    async fn fail(&self, attempt: Attempt, failure: StepFailure) -> RegistrationResult {
        error!(
            "Registration of '{}' failed at {}: {}",
            attempt.name, failure.step, failure.error
        );

        if let Some(id) = attempt.operation_id {
            if let Err(e) = self.tracker.update_status(id, OperationStatus::Failed).await {
                warn!("Could not update tracked registration: {}", e);
            }
        }

        let transaction_hash = failure
            .error
            .transaction_hash()
            .map(str::to_string)
            .or_else(|| attempt.source_transaction_hash.clone());
        let error = failure.error.to_string();
        let result = RegistrationResult {
            success: false,
            message: failure.message,
            step: failure.step,
            name: attempt.name,
            transaction_hash,
            source_transaction_hash: attempt.source_transaction_hash,
            owner: attempt.owner,
            error: Some(error.clone()),
            forwarder_address: self.settings.forwarder_address.clone(),
            registry_address: self
                .registry
                .registry_address(self.settings.destination_network)
                .ok(),
            operation_id: attempt.operation_id,
        };

        self.progress.send_replace(RegistrationProgress {
            is_loading: false,
            current_step: Some(failure.step),
            progress: failure.step.progress(),
            result: Some(result.clone()),
            error: Some(error),
        });
        result
    }
}
