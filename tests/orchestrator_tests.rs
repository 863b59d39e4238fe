//! Unit tests for the cross-chain registration orchestrator

use eggns::chains::{abi, registry};
use eggns::error::EggnsError;
use eggns::service::{
    OperationTracker, OrchestratorSettings, RegistrationOrchestrator, RegistrationProgress,
    RegistrationStep,
};
use eggns::types::{OperationStatus, OperationType};
use ethereum_types::U256;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[path = "helpers.rs"]
mod test_helpers;
use test_helpers::{
    create_default_record, MockBridge, MockRegistry, DESTINATION_NETWORK, DUMMY_FORWARDER,
    DUMMY_OTHER_OWNER, DUMMY_OWNER, DUMMY_REGISTRY_DESTINATION, DUMMY_TX_BRIDGE,
    DUMMY_TX_REGISTER, SOURCE_NETWORK,
};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

struct Harness {
    registry: Arc<MockRegistry>,
    bridge: Arc<MockBridge>,
    tracker: Arc<OperationTracker>,
    orchestrator: RegistrationOrchestrator,
}

fn create_default_settings() -> OrchestratorSettings {
    OrchestratorSettings {
        source_network: SOURCE_NETWORK,
        source_name: "Sepolia".to_string(),
        destination_network: DESTINATION_NETWORK,
        destination_name: "Cardona".to_string(),
        forwarder_address: DUMMY_FORWARDER.to_string(),
        bridge_value: U256::from(1_000_000_000_000_000u64),
        force_update_global_exit_root: true,
    }
}

fn create_harness() -> Harness {
    let registry = Arc::new(MockRegistry::default());
    let bridge = Arc::new(MockBridge::default());
    let tracker = Arc::new(OperationTracker::new(10));
    let orchestrator = RegistrationOrchestrator::new(
        registry.clone(),
        bridge.clone(),
        tracker.clone(),
        create_default_settings(),
    );
    Harness {
        registry,
        bridge,
        tracker,
        orchestrator,
    }
}

// ============================================================================
// SUCCESS PATH
// ============================================================================

/// What is tested: a free name is registered on the source and bridged through the forwarder
/// Why: this is the main registration flow
#[tokio::test]
async fn test_register_and_bridge_success() {
    let h = create_harness();

    let result = h.orchestrator.register("alice").await;

    assert!(result.success, "unexpected failure: {:?}", result.error);
    assert_eq!(result.step, RegistrationStep::Completed);
    assert_eq!(
        result.message,
        "Name registered and bridged successfully through forwarder"
    );
    assert_eq!(result.name, "alice");
    assert_eq!(result.transaction_hash.as_deref(), Some(DUMMY_TX_BRIDGE));
    assert_eq!(result.source_transaction_hash.as_deref(), Some(DUMMY_TX_REGISTER));
    assert_eq!(result.owner.as_deref(), Some(DUMMY_OWNER));
    assert_eq!(result.forwarder_address, DUMMY_FORWARDER);
    assert_eq!(result.registry_address.as_deref(), Some(DUMMY_REGISTRY_DESTINATION));
    assert!(result.error.is_none());
    assert_eq!(h.registry.calls("register_name"), 1);
}

/// What is tested: bridgeAndCall targets the forwarder with the owner as fallback and
/// carries receiveBridgedName(name, owner)
/// Why: the destination registry credits whoever the message names
#[tokio::test]
async fn test_bridge_request_contents() {
    let h = create_harness();

    h.orchestrator.register("alice").await;

    let requests = h.bridge.bridge_and_call_requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.source_network, SOURCE_NETWORK);
    assert_eq!(request.destination_network, DESTINATION_NETWORK);
    assert_eq!(request.call_address, DUMMY_FORWARDER);
    assert_eq!(request.fallback_address, DUMMY_OWNER);
    assert_eq!(request.amount, Some(U256::from(1_000_000_000_000_000u64)));
    assert_eq!(request.token, None);
    assert!(request.force_update_global_exit_root);

    let owner = abi::parse_address(DUMMY_OWNER).unwrap();
    assert_eq!(
        request.call_data,
        registry::encode_receive_bridged_name("alice", &owner)
    );
}

/// What is tested: the tracker holds one bridged Register operation after success
/// Why: the destination side is claimed later from the tracked bridge hash
#[tokio::test]
async fn test_success_is_tracked() {
    let h = create_harness();

    let result = h.orchestrator.register("alice").await;

    let ops = h.tracker.operations().await;
    assert_eq!(ops.len(), 1);
    assert_eq!(Some(ops[0].id), result.operation_id);
    assert_eq!(ops[0].operation_type, OperationType::Register);
    assert_eq!(ops[0].status, OperationStatus::Bridged);
    assert_eq!(ops[0].bridge_transaction_hash.as_deref(), Some(DUMMY_TX_BRIDGE));
}

/// What is tested: the name is normalized before use
/// Why: " Alice " must register "alice"
#[tokio::test]
async fn test_name_normalized() {
    let h = create_harness();

    let result = h.orchestrator.register("  Alice ").await;

    assert!(result.success);
    assert_eq!(result.name, "alice");
    assert!(h
        .registry
        .records
        .lock()
        .unwrap()
        .contains_key(&(SOURCE_NETWORK, "alice".to_string())));
}

/// What is tested: final progress is 100 and no longer loading
/// Why: subscribers stop their spinner on the final snapshot
#[tokio::test]
async fn test_progress_after_success() {
    let h = create_harness();
    let receiver = h.orchestrator.subscribe();

    let result = h.orchestrator.register("alice").await;

    let progress = receiver.borrow().clone();
    assert!(!progress.is_loading);
    assert_eq!(progress.current_step, Some(RegistrationStep::Completed));
    assert_eq!(progress.progress, 100);
    assert_eq!(progress.result, Some(result));

    h.orchestrator.reset();
    assert_eq!(h.orchestrator.progress(), RegistrationProgress::default());
}

/// What is tested: step progress values increase monotonically from 10 to 100
/// Why: progress bars must never move backwards
#[test]
fn test_step_progress_values() {
    let steps = [
        RegistrationStep::AvailabilityCheck,
        RegistrationStep::SourceRegistration,
        RegistrationStep::DataVerification,
        RegistrationStep::DestinationPrecheck,
        RegistrationStep::BridgeToDestination,
        RegistrationStep::Completed,
    ];
    let values: Vec<u8> = steps.iter().map(|s| s.progress()).collect();
    assert_eq!(values, vec![10, 30, 50, 70, 90, 100]);
    assert_eq!(RegistrationStep::DestinationPrecheck.to_string(), "destination_precheck");
}

// ============================================================================
// AVAILABILITY FAILURES
// ============================================================================

/// What is tested: an invalid name fails at availability_check without any registry call
/// Why: malformed names must never reach the chain
#[tokio::test]
async fn test_invalid_name() {
    let h = create_harness();

    let result = h.orchestrator.register("a!").await;

    assert!(!result.success);
    assert_eq!(result.step, RegistrationStep::AvailabilityCheck);
    assert_eq!(result.message, "Invalid name format");
    assert_eq!(h.registry.total_calls(), 0);
    assert!(h.tracker.is_empty().await);
}

/// What is tested: a taken name fails at availability_check before registering
/// Why: registering a taken name would revert and waste the fee
#[tokio::test]
async fn test_name_not_available() {
    let h = create_harness();
    h.registry
        .insert(create_default_record(SOURCE_NETWORK, "alice", DUMMY_OTHER_OWNER));

    let result = h.orchestrator.register("alice").await;

    assert!(!result.success);
    assert_eq!(result.step, RegistrationStep::AvailabilityCheck);
    assert_eq!(result.message, "Name is not available");
    assert_eq!(h.registry.calls("register_name"), 0);
    assert!(h.tracker.is_empty().await);
}

/// What is tested: an unreachable source chain fails at availability_check with no
/// tracked operation and no write
/// Why: nothing has happened on chain, so there is nothing to track
#[tokio::test]
async fn test_source_chain_unavailable() {
    let h = create_harness();
    h.registry.fail_network(SOURCE_NETWORK);

    let result = h.orchestrator.register("alice").await;

    assert!(!result.success);
    assert_eq!(result.step, RegistrationStep::AvailabilityCheck);
    assert!(result.error.unwrap().contains("unavailable"));
    assert_eq!(h.registry.calls("register_name"), 0);
    assert!(h.tracker.is_empty().await);
}

// ============================================================================
// SOURCE REGISTRATION FAILURES
// ============================================================================

/// What is tested: an unreadable fee fails source_registration before the write
/// Why: the fee is never guessed for a paid write
#[tokio::test]
async fn test_fee_unreadable() {
    let h = create_harness();
    *h.registry.registration_fee.lock().unwrap() = None;

    let result = h.orchestrator.register("alice").await;

    assert_eq!(result.step, RegistrationStep::SourceRegistration);
    assert_eq!(result.message, "Failed to register name on Sepolia");
    assert_eq!(h.registry.calls("register_name"), 0);
}

/// What is tested: a reverted registration reports its hash and fails the tracked operation
/// Why: the user needs the hash to inspect the revert
#[tokio::test]
async fn test_registration_reverted() {
    let h = create_harness();
    *h.registry.register_error.lock().unwrap() = Some(EggnsError::RegistrationReverted {
        network_id: SOURCE_NETWORK,
        method: "registerName".to_string(),
        reason: "transaction reverted".to_string(),
        transaction_hash: Some(DUMMY_TX_REGISTER.to_string()),
    });

    let result = h.orchestrator.register("alice").await;

    assert!(!result.success);
    assert_eq!(result.step, RegistrationStep::SourceRegistration);
    assert_eq!(result.transaction_hash.as_deref(), Some(DUMMY_TX_REGISTER));
    assert_eq!(h.bridge.bridge_and_call_count(), 0);

    let ops = h.tracker.operations().await;
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].status, OperationStatus::Failed);
}

/// What is tested: a name missing after registration fails data_verification
/// Why: bridging an owner that was never read back would send garbage
#[tokio::test]
async fn test_data_verification_failure() {
    let h = create_harness();
    h.registry.drop_registrations.store(true, Ordering::SeqCst);

    let result = h.orchestrator.register("alice").await;

    assert_eq!(result.step, RegistrationStep::DataVerification);
    assert_eq!(result.message, "Failed to retrieve name data from Sepolia");
    assert_eq!(result.transaction_hash.as_deref(), Some(DUMMY_TX_REGISTER));
    assert_eq!(h.bridge.bridge_and_call_count(), 0);
}

// ============================================================================
// DESTINATION FAILURES
// ============================================================================

/// What is tested: a name already on the destination fails destination_precheck and
/// nothing is bridged
/// Why: a bridged message for an existing name would revert on the destination
#[tokio::test]
async fn test_destination_collision() {
    let h = create_harness();
    h.registry
        .insert(create_default_record(DESTINATION_NETWORK, "alice", DUMMY_OTHER_OWNER));

    let result = h.orchestrator.register("alice").await;

    assert!(!result.success);
    assert_eq!(result.step, RegistrationStep::DestinationPrecheck);
    assert_eq!(result.message, "Name already exists on Cardona");
    assert_eq!(
        result.error.as_deref(),
        Some("Name already registered on destination chain")
    );
    assert_eq!(result.source_transaction_hash.as_deref(), Some(DUMMY_TX_REGISTER));
    assert_eq!(h.bridge.bridge_and_call_count(), 0);

    let progress = h.orchestrator.progress();
    assert!(!progress.is_loading);
    assert_eq!(progress.progress, 70);
    assert_eq!(progress.current_step, Some(RegistrationStep::DestinationPrecheck));
    assert!(progress.error.is_some());
}

/// What is tested: a forwarder without code fails destination_precheck
/// Why: bridgeAndCall to an empty address would strand the bridged value
#[tokio::test]
async fn test_forwarder_not_deployed() {
    let h = create_harness();
    h.bridge.forwarder_deployed.store(false, Ordering::SeqCst);

    let result = h.orchestrator.register("alice").await;

    assert_eq!(result.step, RegistrationStep::DestinationPrecheck);
    assert_eq!(
        result.message,
        "Forwarder contract not deployed on destination chain"
    );
    assert_eq!(h.bridge.bridge_and_call_count(), 0);
}

/// What is tested: a failed bridge submission fails bridge_to_destination with its hash
/// Why: the source registration stays, and the user needs the failing hash
#[tokio::test]
async fn test_bridge_submission_failure() {
    let h = create_harness();
    *h.bridge.bridge_error.lock().unwrap() = Some(EggnsError::BridgeSubmission {
        network_id: SOURCE_NETWORK,
        reason: "bridgeAndCall reverted".to_string(),
        transaction_hash: Some(DUMMY_TX_BRIDGE.to_string()),
    });

    let result = h.orchestrator.register("alice").await;

    assert_eq!(result.step, RegistrationStep::BridgeToDestination);
    assert_eq!(result.message, "Failed to bridge name to Cardona");
    assert_eq!(result.transaction_hash.as_deref(), Some(DUMMY_TX_BRIDGE));
    assert_eq!(result.source_transaction_hash.as_deref(), Some(DUMMY_TX_REGISTER));
    assert_eq!(h.tracker.operations().await[0].status, OperationStatus::Failed);
}
