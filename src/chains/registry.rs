//! EggNS registry contract binding.
//!
//! Typed wrappers around the registry's read functions and encoders for its write
//! functions. Reads go through `eth_call`; writes are built here and submitted by the
//! contract gateway.

use ethereum_types::U256;
use std::sync::Arc;

use super::abi::{self, AbiError, AbiReader, Token};
use super::rpc::{RpcClient, RpcError};
use crate::types::{NameRecord, NetworkId, RecordOrigin, ZERO_ADDRESS};

pub const IS_NAME_AVAILABLE: &str = "isNameAvailable(string)";
pub const GET_NAME_RECORD: &str = "getNameRecord(string)";
pub const GET_NAME_DATA: &str = "getNameData(string)";
pub const GET_OWNER_NAMES: &str = "getOwnerNames(address)";
pub const REGISTRATION_FEE: &str = "registrationFee()";
pub const RENEWAL_FEE: &str = "renewalFee()";
pub const REGISTER_NAME: &str = "registerName(string,address,bytes32)";
pub const TRANSFER_NAME: &str = "transferName(string,address)";
pub const RENEW_NAME: &str = "renewName(string)";
pub const RECEIVE_BRIDGED_NAME: &str = "receiveBridgedName(string,address)";
pub const CREATE_BRIDGED_NAME: &str =
    "createBridgedName(string,address,address,uint256,bytes32,uint32)";

/// Failure of a registry read: transport or undecodable return data.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error("undecodable return data: {0}")]
    Abi(#[from] AbiError),
}

/// Registry contract bound to one provider.
#[derive(Debug, Clone)]
pub struct RegistryContract {
    rpc: Arc<RpcClient>,
    address: String,
    network_id: NetworkId,
}

impl RegistryContract {
    pub fn new(rpc: Arc<RpcClient>, address: &str, network_id: NetworkId) -> Self {
        Self {
            rpc,
            address: address.to_string(),
            network_id,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn read(&self, signature: &str, tokens: &[Token]) -> Result<AbiReader, RegistryError> {
        let data = abi::encode_call(signature, tokens);
        let result = self.rpc.call(&self.address, &data).await?;
        let reader = AbiReader::from_hex(&result)?;
        if reader.is_empty() {
            // No contract at the address, or the function does not exist
            return Err(RegistryError::Abi(AbiError::OutOfBounds {
                needed: 32,
                available: 0,
            }));
        }
        Ok(reader)
    }

    pub async fn is_name_available(&self, name: &str) -> Result<bool, RegistryError> {
        let reader = self
            .read(IS_NAME_AVAILABLE, &[Token::String(name.to_string())])
            .await?;
        Ok(reader.bool(0)?)
    }

    /// Full record, `None` when the owner is the zero address.
    ///
    /// Layout: `(owner, resolvedAddress, expirationTime, isActive, contentHash,
    /// originNetwork, isBridged)`.
    pub async fn get_name_record(&self, name: &str) -> Result<Option<NameRecord>, RegistryError> {
        let reader = self
            .read(GET_NAME_RECORD, &[Token::String(name.to_string())])
            .await?;

        let owner = reader.address(0)?;
        if owner == ZERO_ADDRESS {
            return Ok(None);
        }

        let origin = if reader.bool(6)? {
            RecordOrigin::Bridged {
                origin_network: reader.u32(5)?,
            }
        } else {
            RecordOrigin::Native
        };

        Ok(Some(NameRecord {
            name: name.to_string(),
            owner,
            resolved_address: reader.address(1)?,
            expiration_time: reader.u64(2)?,
            is_active: reader.bool(3)?,
            content_hash: reader.bytes32(4)?,
            network_id: self.network_id,
            origin,
        }))
    }

    /// Owner from `getNameData`, `None` when the name does not exist.
    pub async fn get_name_owner(&self, name: &str) -> Result<Option<String>, RegistryError> {
        let reader = self
            .read(GET_NAME_DATA, &[Token::String(name.to_string())])
            .await?;
        let owner = reader.address(0)?;
        let exists = reader.bool(1)?;
        if !exists || owner == ZERO_ADDRESS {
            return Ok(None);
        }
        Ok(Some(owner))
    }

    pub async fn get_owner_names(&self, owner: &[u8; 20]) -> Result<Vec<String>, RegistryError> {
        let reader = self
            .read(GET_OWNER_NAMES, &[Token::Address(*owner)])
            .await?;
        Ok(reader.string_array(0)?)
    }

    pub async fn registration_fee(&self) -> Result<U256, RegistryError> {
        Ok(self.read(REGISTRATION_FEE, &[]).await?.uint(0)?)
    }

    pub async fn renewal_fee(&self) -> Result<U256, RegistryError> {
        Ok(self.read(RENEWAL_FEE, &[]).await?.uint(0)?)
    }
}

// ============================================================================
// CALL DATA ENCODERS
// ============================================================================

pub fn encode_register_name(
    name: &str,
    resolved_address: &[u8; 20],
    content_hash: &[u8; 32],
) -> Vec<u8> {
    abi::encode_call(
        REGISTER_NAME,
        &[
            Token::String(name.to_string()),
            Token::Address(*resolved_address),
            Token::FixedBytes(*content_hash),
        ],
    )
}

pub fn encode_transfer_name(name: &str, new_owner: &[u8; 20]) -> Vec<u8> {
    abi::encode_call(
        TRANSFER_NAME,
        &[Token::String(name.to_string()), Token::Address(*new_owner)],
    )
}

pub fn encode_renew_name(name: &str) -> Vec<u8> {
    abi::encode_call(RENEW_NAME, &[Token::String(name.to_string())])
}

/// Call executed on the destination registry (through the forwarder) for a bridged name.
pub fn encode_receive_bridged_name(name: &str, owner: &[u8; 20]) -> Vec<u8> {
    abi::encode_call(
        RECEIVE_BRIDGED_NAME,
        &[Token::String(name.to_string()), Token::Address(*owner)],
    )
}

/// Full-record copy used when bridging an existing name.
pub fn encode_create_bridged_name(
    record: &NameRecord,
    source_network: NetworkId,
) -> Result<Vec<u8>, AbiError> {
    Ok(abi::encode_call(
        CREATE_BRIDGED_NAME,
        &[
            Token::String(record.name.clone()),
            Token::Address(abi::parse_address(&record.owner)?),
            Token::Address(abi::parse_address(&record.resolved_address)?),
            Token::Uint(U256::from(record.expiration_time)),
            Token::FixedBytes(abi::parse_bytes32(&record.content_hash)?),
            Token::Uint(U256::from(source_network)),
        ],
    ))
}
