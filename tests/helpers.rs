//! Shared test helpers for EggNS tests
//!
//! Constants, default configuration builders, JSON-RPC mock helpers for wiremock, and
//! in-process mocks of the registry and bridge gateways.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use eggns::chains::abi::{self, Token};
use eggns::config::{
    BridgeConfig, ChainInfo, EggnsConfig, RegistrationConfig, ServiceConfig, SignerConfig,
};
use eggns::error::{EggnsError, Result};
use eggns::service::{BridgeAndCallRequest, BridgeApi, NameRegistryApi, RegisterNameRequest};
use eggns::types::{
    BridgeStatus, BridgeTransaction, NameRecord, NetworkId, ReceiptLog, RecordOrigin,
    SubmittedTransaction, TransactionReceipt,
};
use ethereum_types::U256;
use serde_json::json;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use wiremock::{Match, Request, ResponseTemplate};

// ============================================================================
// CONSTANTS
// ============================================================================

// ------------------------------- NETWORKS -------------------------------

/// Source network id (L1)
pub const SOURCE_NETWORK: NetworkId = 0;

/// Destination network id (rollup 1)
pub const DESTINATION_NETWORK: NetworkId = 1;

/// Endpoint that refuses connections
pub const UNREACHABLE_RPC: &str = "http://127.0.0.1:1";

// -------------------------------- USERS ---------------------------------

/// Signer and on-chain owner of names registered in tests
pub const DUMMY_OWNER: &str = "0x1111111111111111111111111111111111111111";

/// Second account, used as a transfer recipient or a conflicting owner
pub const DUMMY_OTHER_OWNER: &str = "0x2222222222222222222222222222222222222222";

/// Resolved address of test records
pub const DUMMY_RESOLVED: &str = "0x3333333333333333333333333333333333333333";

// ------------------------------ CONTRACTS -------------------------------

pub const DUMMY_REGISTRY_SOURCE: &str = "0x00000000000000000000000000000000000000a0";
pub const DUMMY_REGISTRY_DESTINATION: &str = "0x00000000000000000000000000000000000000a1";
pub const DUMMY_BRIDGE: &str = "0x00000000000000000000000000000000000000b0";
pub const DUMMY_BRIDGE_EXTENSION: &str = "0x00000000000000000000000000000000000000b1";
pub const DUMMY_FORWARDER: &str = "0x00000000000000000000000000000000000000f0";

// ----------------------------- TRANSACTIONS -----------------------------

pub const DUMMY_TX_REGISTER: &str =
    "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub const DUMMY_TX_BRIDGE: &str =
    "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
pub const DUMMY_TX_CLAIM: &str =
    "0xcccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccc";
pub const DUMMY_TX_TRANSFER: &str =
    "0xdddddddddddddddddddddddddddddddddddddddddddddddddddddddddddddddd";

/// Expiration far in the future (2100-01-01)
pub const DUMMY_EXPIRATION: u64 = 4_102_444_800;

// ============================================================================
// CONFIGURATION BUILDERS
// ============================================================================

pub fn create_default_chain(network_id: NetworkId, rpc_url: &str) -> ChainInfo {
    let (chain_id, name, registry) = if network_id == SOURCE_NETWORK {
        (11155111, "Sepolia", DUMMY_REGISTRY_SOURCE)
    } else {
        (2442, "Cardona", DUMMY_REGISTRY_DESTINATION)
    };
    ChainInfo {
        chain_id,
        network_id,
        name: name.to_string(),
        rpc_url: rpc_url.to_string(),
        fallback_rpc_urls: vec![],
        contract_address: registry.to_string(),
        bridge_address: DUMMY_BRIDGE.to_string(),
        bridge_extension_address: DUMMY_BRIDGE_EXTENSION.to_string(),
        color: "#3B82F6".to_string(),
        short_name: name[..3].to_uppercase(),
    }
}

/// Service settings with millisecond timings so tests run fast.
pub fn create_fast_service_config() -> ServiceConfig {
    ServiceConfig {
        retry_attempts: 3,
        retry_base_delay_ms: 1,
        probe_timeout_ms: 2000,
        request_timeout_ms: 2000,
        receipt_poll_interval_ms: 5,
        receipt_timeout_ms: 500,
        tracker_capacity: 10,
    }
}

pub fn create_default_config(
    source_rpc: &str,
    destination_rpc: &str,
    proof_api: &str,
) -> EggnsConfig {
    EggnsConfig {
        service: create_fast_service_config(),
        bridge: BridgeConfig {
            proof_api_url: proof_api.to_string(),
            claim_poll_interval_ms: 10_000,
            claim_timeout_ms: 300_000,
            force_update_global_exit_root: true,
            bridge_value_wei: "1000000000000000".to_string(),
            gas_limit: 5_000_000,
        },
        registration: RegistrationConfig {
            source_network: SOURCE_NETWORK,
            destination_network: DESTINATION_NETWORK,
            forwarder_address: DUMMY_FORWARDER.to_string(),
            default_registration_fee_wei: "1000000000000000".to_string(),
            default_renewal_fee_wei: "500000000000000".to_string(),
        },
        signer: SignerConfig {
            address: DUMMY_OWNER.to_string(),
        },
        chain: vec![
            create_default_chain(SOURCE_NETWORK, source_rpc),
            create_default_chain(DESTINATION_NETWORK, destination_rpc),
        ],
    }
}

pub fn create_default_record(network_id: NetworkId, name: &str, owner: &str) -> NameRecord {
    NameRecord {
        name: name.to_string(),
        owner: owner.to_string(),
        resolved_address: DUMMY_RESOLVED.to_string(),
        expiration_time: DUMMY_EXPIRATION,
        is_active: true,
        content_hash: eggns::types::ZERO_HASH.to_string(),
        network_id,
        origin: RecordOrigin::Native,
    }
}

pub fn create_default_receipt(tx_hash: &str) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: tx_hash.to_string(),
        block_number: 100,
        status: true,
        gas_used: 21_000,
        logs: vec![],
    }
}

// ============================================================================
// JSON-RPC MOCKING
// ============================================================================

/// Matches a JSON-RPC request by method and, for `eth_call`, by function selector.
pub struct RpcCall {
    method: String,
    selector: Option<String>,
}

impl RpcCall {
    pub fn method(method: &str) -> Self {
        Self {
            method: method.to_string(),
            selector: None,
        }
    }

    /// `eth_call` of the function with this signature.
    pub fn eth_call(signature: &str) -> Self {
        Self {
            method: "eth_call".to_string(),
            selector: Some(hex::encode(abi::selector(signature))),
        }
    }
}

impl Match for RpcCall {
    fn matches(&self, request: &Request) -> bool {
        let body: serde_json::Value = match serde_json::from_slice(&request.body) {
            Ok(body) => body,
            Err(_) => return false,
        };
        if body["method"] != self.method.as_str() {
            return false;
        }
        match &self.selector {
            None => true,
            Some(selector) => body["params"][0]["data"]
                .as_str()
                .map(|data| data.trim_start_matches("0x").starts_with(selector.as_str()))
                .unwrap_or(false),
        }
    }
}

/// Number of JSON-RPC requests the server received for `method`.
pub async fn count_rpc_requests(server: &wiremock::MockServer, method: &str) -> usize {
    rpc_request_bodies(server, method).await.len()
}

/// Parsed bodies of the JSON-RPC requests received for `method`.
pub async fn rpc_request_bodies(
    server: &wiremock::MockServer,
    method: &str,
) -> Vec<serde_json::Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|r| serde_json::from_slice::<serde_json::Value>(&r.body).ok())
        .filter(|body| body["method"] == method)
        .collect()
}

pub fn rpc_result(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "result": result,
    }))
}

pub fn rpc_error(code: i64, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "error": { "code": code, "message": message },
    }))
}

/// ABI-encoded return data as a 0x-prefixed hex string.
pub fn abi_result(tokens: &[Token]) -> serde_json::Value {
    json!(format!("0x{}", hex::encode(abi::encode(tokens))))
}

pub fn address_token(address: &str) -> Token {
    Token::Address(abi::parse_address(address).unwrap())
}

/// `getNameRecord` return value.
pub fn name_record_tokens(
    owner: &str,
    resolved: &str,
    is_active: bool,
    origin_network: u32,
    is_bridged: bool,
) -> Vec<Token> {
    vec![
        address_token(owner),
        address_token(resolved),
        Token::Uint(U256::from(DUMMY_EXPIRATION)),
        Token::Bool(is_active),
        Token::FixedBytes([0x42; 32]),
        Token::Uint(U256::from(origin_network)),
        Token::Bool(is_bridged),
    ]
}

/// Raw receipt as returned by `eth_getTransactionReceipt`.
pub fn receipt_json(tx_hash: &str, status: bool, logs: serde_json::Value) -> serde_json::Value {
    json!({
        "transactionHash": tx_hash,
        "blockNumber": "0x64",
        "status": if status { "0x1" } else { "0x0" },
        "gasUsed": "0x5208",
        "logs": logs,
    })
}

/// `BridgeEvent` log emitted by the bridge contract. The origin address is `DUMMY_OWNER`.
pub fn bridge_event(
    leaf_type: u8,
    origin_network: u32,
    destination_network: u32,
    destination_address: &str,
    metadata: &[u8],
    deposit_count: u32,
) -> ReceiptLog {
    let data = abi::encode(&[
        Token::Uint(U256::from(leaf_type)),
        Token::Uint(U256::from(origin_network)),
        address_token(DUMMY_OWNER),
        Token::Uint(U256::from(destination_network)),
        address_token(destination_address),
        Token::Uint(U256::zero()),
        Token::Bytes(metadata.to_vec()),
        Token::Uint(U256::from(deposit_count)),
    ]);
    ReceiptLog {
        address: DUMMY_BRIDGE.to_string(),
        topics: vec![abi::event_topic(eggns::service::bridge_gateway::BRIDGE_EVENT)],
        data: format!("0x{}", hex::encode(data)),
    }
}

/// JSON form of a receipt log, as returned inside `eth_getTransactionReceipt`.
pub fn log_json(log: &ReceiptLog) -> serde_json::Value {
    json!({
        "address": log.address,
        "topics": log.topics,
        "data": log.data,
    })
}

// ============================================================================
// REGISTRY MOCK
// ============================================================================

/// In-memory registry with call recording and fault injection.
pub struct MockRegistry {
    pub signer: String,
    pub records: Mutex<HashMap<(NetworkId, String), NameRecord>>,
    pub owner_names: Mutex<HashMap<NetworkId, Vec<String>>>,
    /// Reads on these networks fail with `ChainUnavailable`
    pub failing_networks: Mutex<HashSet<NetworkId>>,
    pub register_error: Mutex<Option<EggnsError>>,
    pub transfer_error: Mutex<Option<EggnsError>>,
    /// When set, successful registrations are not readable afterwards
    pub drop_registrations: AtomicBool,
    /// `None` makes fee reads fail
    pub registration_fee: Mutex<Option<String>>,
    pub renewal_fee: Mutex<Option<String>>,
    calls: Mutex<Vec<String>>,
}

impl Default for MockRegistry {
    fn default() -> Self {
        Self {
            signer: DUMMY_OWNER.to_string(),
            records: Mutex::new(HashMap::new()),
            owner_names: Mutex::new(HashMap::new()),
            failing_networks: Mutex::new(HashSet::new()),
            register_error: Mutex::new(None),
            transfer_error: Mutex::new(None),
            drop_registrations: AtomicBool::new(false),
            registration_fee: Mutex::new(Some("1000000000000000".to_string())),
            renewal_fee: Mutex::new(Some("500000000000000".to_string())),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl MockRegistry {
    pub fn insert(&self, record: NameRecord) {
        self.records
            .lock()
            .unwrap()
            .insert((record.network_id, record.name.clone()), record);
    }

    pub fn fail_network(&self, network_id: NetworkId) {
        self.failing_networks.lock().unwrap().insert(network_id);
    }

    /// Number of calls to `method`.
    pub fn calls(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == method)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record_call(&self, method: &str, network_id: NetworkId) -> Result<()> {
        self.calls.lock().unwrap().push(method.to_string());
        if self.failing_networks.lock().unwrap().contains(&network_id) {
            return Err(EggnsError::ChainUnavailable {
                network_id,
                reason: "connection refused".to_string(),
            });
        }
        Ok(())
    }

    fn get(&self, network_id: NetworkId, name: &str) -> Option<NameRecord> {
        self.records
            .lock()
            .unwrap()
            .get(&(network_id, name.to_string()))
            .cloned()
    }
}

#[async_trait]
impl NameRegistryApi for MockRegistry {
    async fn is_name_available(&self, network_id: NetworkId, name: &str) -> Result<bool> {
        self.record_call("is_name_available", network_id)?;
        Ok(self.get(network_id, name).is_none())
    }

    async fn resolve_name(&self, network_id: NetworkId, name: &str) -> Result<Option<NameRecord>> {
        self.record_call("resolve_name", network_id)?;
        Ok(self.get(network_id, name))
    }

    async fn get_name_owner(&self, network_id: NetworkId, name: &str) -> Result<Option<String>> {
        self.record_call("get_name_owner", network_id)?;
        Ok(self.get(network_id, name).map(|r| r.owner))
    }

    async fn get_owner_names(&self, network_id: NetworkId, _owner: &str) -> Result<Vec<String>> {
        self.record_call("get_owner_names", network_id)?;
        Ok(self
            .owner_names
            .lock()
            .unwrap()
            .get(&network_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn register_name(
        &self,
        network_id: NetworkId,
        request: &RegisterNameRequest,
    ) -> Result<SubmittedTransaction> {
        self.record_call("register_name", network_id)?;
        if let Some(error) = self.register_error.lock().unwrap().clone() {
            return Err(error);
        }
        if !self.drop_registrations.load(Ordering::SeqCst) {
            let mut record = create_default_record(network_id, &request.name, &self.signer);
            record.resolved_address = request.resolved_address.clone();
            self.insert(record);
        }
        Ok(SubmittedTransaction {
            transaction_hash: DUMMY_TX_REGISTER.to_string(),
            receipt: create_default_receipt(DUMMY_TX_REGISTER),
        })
    }

    async fn transfer_name(
        &self,
        network_id: NetworkId,
        name: &str,
        new_owner: &str,
    ) -> Result<SubmittedTransaction> {
        self.record_call("transfer_name", network_id)?;
        if let Some(error) = self.transfer_error.lock().unwrap().clone() {
            return Err(error);
        }
        if let Some(record) = self
            .records
            .lock()
            .unwrap()
            .get_mut(&(network_id, name.to_string()))
        {
            record.owner = new_owner.to_string();
        }
        Ok(SubmittedTransaction {
            transaction_hash: DUMMY_TX_TRANSFER.to_string(),
            receipt: create_default_receipt(DUMMY_TX_TRANSFER),
        })
    }

    async fn renew_name(
        &self,
        network_id: NetworkId,
        _name: &str,
        _renewal_fee: U256,
    ) -> Result<SubmittedTransaction> {
        self.record_call("renew_name", network_id)?;
        Ok(SubmittedTransaction {
            transaction_hash: DUMMY_TX_REGISTER.to_string(),
            receipt: create_default_receipt(DUMMY_TX_REGISTER),
        })
    }

    async fn get_registration_fee(&self, network_id: NetworkId) -> Result<String> {
        self.record_call("get_registration_fee", network_id)?;
        self.registration_fee
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| EggnsError::ContractCall {
                network_id,
                method: "registrationFee".to_string(),
                reason: "execution reverted".to_string(),
            })
    }

    async fn get_renewal_fee(&self, network_id: NetworkId) -> Result<String> {
        self.record_call("get_renewal_fee", network_id)?;
        self.renewal_fee
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| EggnsError::ContractCall {
                network_id,
                method: "renewalFee".to_string(),
                reason: "execution reverted".to_string(),
            })
    }

    fn registry_address(&self, network_id: NetworkId) -> Result<String> {
        match network_id {
            SOURCE_NETWORK => Ok(DUMMY_REGISTRY_SOURCE.to_string()),
            DESTINATION_NETWORK => Ok(DUMMY_REGISTRY_DESTINATION.to_string()),
            other => Err(EggnsError::UnsupportedChain(other)),
        }
    }

    fn signer_address(&self) -> String {
        self.signer.clone()
    }
}

// ============================================================================
// BRIDGE MOCK
// ============================================================================

/// Recorded `bridge_message` call.
#[derive(Debug, Clone)]
pub struct BridgeMessageCall {
    pub source_network: NetworkId,
    pub destination_network: NetworkId,
    pub destination_address: String,
    pub metadata: Vec<u8>,
}

/// In-memory bridge with scripted statuses and call counters.
pub struct MockBridge {
    pub forwarder_deployed: AtomicBool,
    pub bridge_error: Mutex<Option<EggnsError>>,
    pub claim_error: Mutex<Option<EggnsError>>,
    /// Returned in order by status queries; `default_status` afterwards
    pub statuses: Mutex<VecDeque<Result<BridgeStatus>>>,
    pub default_status: Mutex<BridgeStatus>,
    pub bridge_and_call_requests: Mutex<Vec<BridgeAndCallRequest>>,
    pub bridge_message_calls: Mutex<Vec<BridgeMessageCall>>,
    pub status_calls: AtomicUsize,
    pub claim_calls: AtomicUsize,
}

impl Default for MockBridge {
    fn default() -> Self {
        Self {
            forwarder_deployed: AtomicBool::new(true),
            bridge_error: Mutex::new(None),
            claim_error: Mutex::new(None),
            statuses: Mutex::new(VecDeque::new()),
            default_status: Mutex::new(BridgeStatus::Pending),
            bridge_and_call_requests: Mutex::new(Vec::new()),
            bridge_message_calls: Mutex::new(Vec::new()),
            status_calls: AtomicUsize::new(0),
            claim_calls: AtomicUsize::new(0),
        }
    }
}

impl MockBridge {
    pub fn bridge_and_call_count(&self) -> usize {
        self.bridge_and_call_requests.lock().unwrap().len()
    }

    pub fn bridge_message_count(&self) -> usize {
        self.bridge_message_calls.lock().unwrap().len()
    }

    fn transaction(
        &self,
        source: NetworkId,
        destination: NetworkId,
        destination_address: &str,
        status: BridgeStatus,
        hash: &str,
    ) -> BridgeTransaction {
        BridgeTransaction {
            transaction_hash: hash.to_string(),
            receipt: create_default_receipt(hash),
            source_network_id: source,
            destination_network_id: destination,
            destination_address: destination_address.to_string(),
            status,
            timestamp: Utc::now(),
            call_data: None,
            amount: None,
            token: None,
        }
    }
}

#[async_trait]
impl BridgeApi for MockBridge {
    async fn bridge_message(
        &self,
        source_network: NetworkId,
        destination_network: NetworkId,
        destination_address: &str,
        _force_update_global_exit_root: bool,
        metadata: Vec<u8>,
    ) -> Result<BridgeTransaction> {
        self.bridge_message_calls.lock().unwrap().push(BridgeMessageCall {
            source_network,
            destination_network,
            destination_address: destination_address.to_string(),
            metadata,
        });
        if let Some(error) = self.bridge_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self.transaction(
            source_network,
            destination_network,
            destination_address,
            BridgeStatus::Pending,
            DUMMY_TX_BRIDGE,
        ))
    }

    async fn bridge_and_call(&self, request: BridgeAndCallRequest) -> Result<BridgeTransaction> {
        self.bridge_and_call_requests
            .lock()
            .unwrap()
            .push(request.clone());
        if let Some(error) = self.bridge_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self.transaction(
            request.source_network,
            request.destination_network,
            &request.call_address,
            BridgeStatus::Pending,
            DUMMY_TX_BRIDGE,
        ))
    }

    async fn claim_message(
        &self,
        _bridge_tx_hash: &str,
        source_network: NetworkId,
        destination_network: NetworkId,
    ) -> Result<BridgeTransaction> {
        self.claim_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.claim_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self.transaction(
            source_network,
            destination_network,
            DUMMY_FORWARDER,
            BridgeStatus::Completed,
            DUMMY_TX_CLAIM,
        ))
    }

    async fn claim_asset(
        &self,
        bridge_tx_hash: &str,
        source_network: NetworkId,
        destination_network: NetworkId,
    ) -> Result<BridgeTransaction> {
        self.claim_message(bridge_tx_hash, source_network, destination_network)
            .await
    }

    async fn get_bridge_transaction_status(
        &self,
        _bridge_tx_hash: &str,
        _source_network: NetworkId,
    ) -> Result<BridgeStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(next) = self.statuses.lock().unwrap().pop_front() {
            return next;
        }
        Ok(*self.default_status.lock().unwrap())
    }

    async fn is_contract_deployed(&self, _network_id: NetworkId, _address: &str) -> Result<bool> {
        Ok(self.forwarder_deployed.load(Ordering::SeqCst))
    }
}
