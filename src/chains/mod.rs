//! Chain access: JSON-RPC transport, ABI codec, registry binding, proof service client
//! and the provider pool.

pub mod abi;
pub mod proof_api;
pub mod provider_pool;
pub mod registry;
pub mod rpc;

pub use provider_pool::{ChainHandle, ChainHealth, ChainHealthReport, ChainProviderPool};
pub use rpc::{RpcClient, RpcError};
