//! JSON-RPC clients of the bundler (`eth`, `rundler` namespaces) and the sponsor (`pm`,
//! `alchemy` namespaces)

mod bundler;
mod error;
pub mod eth_api;
mod paymaster;
pub mod paymaster_api;
mod types;

pub use bundler::{BundlerClient, JsonRpcBundlerClient};
pub use error::RpcError;
pub use paymaster::{JsonRpcPaymasterClient, PaymasterClient};
pub use types::{Erc20Context, GasAndPaymasterRequest, SponsorInfo, SponsorshipResponse};
