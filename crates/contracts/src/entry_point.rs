pub use super::{error::EntryPointError, gen::EntryPointAPI};
use super::gen::entry_point_api::EntryPointAPIErrors;
use crate::error::decode_revert_error;
use ethers::{
    prelude::ContractError,
    providers::Middleware,
    types::{Address, Bytes, U256},
};
use std::sync::Arc;

/// Entry point contract (read-only view used while building user operations)
#[derive(Clone)]
pub struct EntryPoint<M: Middleware + 'static> {
    eth_client: Arc<M>,
    address: Address,
    entry_point_api: EntryPointAPI<M>,
}

impl<M: Middleware + 'static> EntryPoint<M> {
    pub fn new(eth_client: Arc<M>, address: Address) -> Self {
        let entry_point_api = EntryPointAPI::new(address, eth_client.clone());
        Self { eth_client, address, entry_point_api }
    }

    pub fn eth_client(&self) -> Arc<M> {
        self.eth_client.clone()
    }

    pub fn address(&self) -> Address {
        self.address
    }

    fn decode_contract_error(
        err: ContractError<M>,
    ) -> Result<EntryPointAPIErrors, EntryPointError> {
        match err {
            ContractError::DecodingError(e) => {
                Err(EntryPointError::Decode { inner: e.to_string() })
            }
            ContractError::AbiError(e) => Err(EntryPointError::Abi { inner: e.to_string() }),
            ContractError::MiddlewareError { e } => EntryPointError::from_middleware_error::<M>(e),
            ContractError::ProviderError { e } => EntryPointError::from_provider_error(&e),
            ContractError::Revert(data) => decode_revert_error(data),
            _ => Err(EntryPointError::Other { inner: err.to_string() }),
        }
    }

    /// Next nonce of the sender for the given 192-bit nonce key
    pub async fn get_nonce(&self, address: &Address, key: U256) -> Result<U256, EntryPointError> {
        self.entry_point_api.get_nonce(*address, key).call().await.map_err(|err| {
            match Self::decode_contract_error(err) {
                Ok(EntryPointAPIErrors::FailedOp(op)) => EntryPointError::FailedOp(op),
                Ok(op) => EntryPointError::Other { inner: format!("get nonce reverted: {op:?}") },
                Err(err) => err,
            }
        })
    }

    /// Simulates the deployment of the account and returns the address it would be deployed at
    ///
    /// The entry point always reverts with `SenderAddressResult(address)`.
    pub async fn get_sender_address(&self, init_code: Bytes) -> Result<Address, EntryPointError> {
        let res = self.entry_point_api.get_sender_address(init_code).call().await;

        match res {
            Ok(_) => Err(EntryPointError::NoRevert { function: "get_sender_address".into() }),
            Err(e) => Self::decode_contract_error(e).and_then(|op| match op {
                EntryPointAPIErrors::SenderAddressResult(res) => Ok(res.sender),
                EntryPointAPIErrors::FailedOp(err) => Err(EntryPointError::FailedOp(err)),
                _ => Err(EntryPointError::Other {
                    inner: format!("get sender address error: {op:?}"),
                }),
            }),
        }
    }
}
