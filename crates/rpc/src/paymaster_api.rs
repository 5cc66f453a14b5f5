use crate::types::{GasAndPaymasterRequest, SponsorshipResponse};
use corvus_primitives::UserOperationRequest;
use ethers::types::Address;
use jsonrpsee::{core::RpcResult, proc_macros::rpc};
use serde_json::Value;

/// The [ERC-7677](https://eips.ethereum.org/EIPS/eip-7677) `pm` namespace RPC methods trait
#[rpc(client, namespace = "pm")]
pub trait PaymasterApi {
    /// Sponsorship data to estimate gas with (may be final, see `isFinal`).
    ///
    /// # Arguments
    /// * `user_operation: UserOperationRequest` - The unsigned user operation.
    /// * `entry_point: Address` - The address of the entry point.
    /// * `chain_id: String` - Hex encoded chain id.
    /// * `context: Value` - Sponsor specific context (e.g. policy id).
    #[method(name = "getPaymasterStubData")]
    async fn get_paymaster_stub_data(
        &self,
        user_operation: UserOperationRequest,
        entry_point: Address,
        chain_id: String,
        context: Value,
    ) -> RpcResult<SponsorshipResponse>;

    /// Final sponsorship data for a fully estimated user operation.
    #[method(name = "getPaymasterData")]
    async fn get_paymaster_data(
        &self,
        user_operation: UserOperationRequest,
        entry_point: Address,
        chain_id: String,
        context: Value,
    ) -> RpcResult<SponsorshipResponse>;
}

/// Gas manager methods (`alchemy` namespace)
#[rpc(client, namespace = "alchemy")]
pub trait GasManagerApi {
    /// Gas limits, fees and sponsorship data in a single round trip.
    #[method(name = "requestGasAndPaymasterAndData")]
    async fn request_gas_and_paymaster_and_data(
        &self,
        request: GasAndPaymasterRequest,
    ) -> RpcResult<SponsorshipResponse>;
}
