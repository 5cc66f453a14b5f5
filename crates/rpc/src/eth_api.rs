use corvus_primitives::{
    UserOperationByHash, UserOperationGasEstimation, UserOperationHash, UserOperationReceipt,
    UserOperationRequest,
};
use ethers::types::{Address, Block, BlockNumber, H256, U256, U64};
use jsonrpsee::{core::RpcResult, proc_macros::rpc};

/// The ERC-4337 `eth` namespace RPC methods trait (bundler side)
#[rpc(client, namespace = "eth")]
pub trait EthApi {
    /// Retrieve the current [EIP-155](https://eips.ethereum.org/EIPS/eip-155) chain ID.
    #[method(name = "chainId")]
    async fn chain_id(&self) -> RpcResult<U64>;

    /// Get the entry points the bundler accepts user operations for.
    #[method(name = "supportedEntryPoints")]
    async fn supported_entry_points(&self) -> RpcResult<Vec<Address>>;

    /// Send a signed user operation.
    ///
    /// # Arguments
    /// * `user_operation: UserOperationRequest` - The signed user operation, normalized for the
    ///   entry point version.
    /// * `entry_point: Address` - The address of the entry point.
    ///
    /// # Returns
    /// * `RpcResult<UserOperationHash>` - The hash the bundler computed for the user operation.
    #[method(name = "sendUserOperation")]
    async fn send_user_operation(
        &self,
        user_operation: UserOperationRequest,
        entry_point: Address,
    ) -> RpcResult<UserOperationHash>;

    /// Estimate the gas limits of a user operation. The signature may be a dummy one.
    /// See [How ERC-4337 Gas Estimation Works](https://www.alchemy.com/blog/erc-4337-gas-estimation).
    #[method(name = "estimateUserOperationGas")]
    async fn estimate_user_operation_gas(
        &self,
        user_operation: UserOperationRequest,
        entry_point: Address,
    ) -> RpcResult<UserOperationGasEstimation>;

    /// Retrieve the receipt of a user operation, or None if it is not included yet.
    #[method(name = "getUserOperationReceipt")]
    async fn get_user_operation_receipt(
        &self,
        user_operation_hash: UserOperationHash,
    ) -> RpcResult<Option<UserOperationReceipt>>;

    /// Retrieve a user operation by its hash, or None if it is unknown.
    #[method(name = "getUserOperationByHash")]
    async fn get_user_operation_by_hash(
        &self,
        user_operation_hash: UserOperationHash,
    ) -> RpcResult<Option<UserOperationByHash>>;

    /// Block header lookup (used to read the base fee of the latest block).
    #[method(name = "getBlockByNumber")]
    async fn get_block_by_number(
        &self,
        block: BlockNumber,
        full_transactions: bool,
    ) -> RpcResult<Option<Block<H256>>>;
}

/// Rundler specific methods exposed by the bundler
#[rpc(client, namespace = "rundler")]
pub trait RundlerApi {
    /// Priority fee the bundler currently requires for user operations to be included.
    #[method(name = "maxPriorityFeePerGas")]
    async fn max_priority_fee_per_gas(&self) -> RpcResult<U256>;
}
