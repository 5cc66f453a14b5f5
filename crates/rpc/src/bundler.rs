use crate::{
    eth_api::{EthApiClient, RundlerApiClient},
    error::RpcError,
};
use async_trait::async_trait;
use corvus_primitives::{
    UserOperationByHash, UserOperationGasEstimation, UserOperationHash, UserOperationReceipt,
    UserOperationRequest,
};
use ethers::types::{Address, BlockNumber, U256};
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use std::{fmt::Debug, sync::Arc};
use tracing::{debug, trace};

/// Bundler the user operations are estimated with and submitted to
#[async_trait]
pub trait BundlerClient: Send + Sync + Debug {
    async fn chain_id(&self) -> Result<u64, RpcError>;

    async fn supported_entry_points(&self) -> Result<Vec<Address>, RpcError>;

    async fn estimate_user_operation_gas(
        &self,
        uo: &UserOperationRequest,
        entry_point: Address,
    ) -> Result<UserOperationGasEstimation, RpcError>;

    async fn send_user_operation(
        &self,
        uo: &UserOperationRequest,
        entry_point: Address,
    ) -> Result<UserOperationHash, RpcError>;

    async fn get_user_operation_receipt(
        &self,
        hash: UserOperationHash,
    ) -> Result<Option<UserOperationReceipt>, RpcError>;

    async fn get_user_operation_by_hash(
        &self,
        hash: UserOperationHash,
    ) -> Result<Option<UserOperationByHash>, RpcError>;

    /// Base fee of the latest block
    async fn base_fee(&self) -> Result<U256, RpcError>;

    /// Priority fee required by the bundler (`rundler_maxPriorityFeePerGas`)
    async fn max_priority_fee_per_gas(&self) -> Result<U256, RpcError>;
}

#[async_trait]
impl<T: BundlerClient + ?Sized> BundlerClient for Arc<T> {
    async fn chain_id(&self) -> Result<u64, RpcError> {
        (**self).chain_id().await
    }

    async fn supported_entry_points(&self) -> Result<Vec<Address>, RpcError> {
        (**self).supported_entry_points().await
    }

    async fn estimate_user_operation_gas(
        &self,
        uo: &UserOperationRequest,
        entry_point: Address,
    ) -> Result<UserOperationGasEstimation, RpcError> {
        (**self).estimate_user_operation_gas(uo, entry_point).await
    }

    async fn send_user_operation(
        &self,
        uo: &UserOperationRequest,
        entry_point: Address,
    ) -> Result<UserOperationHash, RpcError> {
        (**self).send_user_operation(uo, entry_point).await
    }

    async fn get_user_operation_receipt(
        &self,
        hash: UserOperationHash,
    ) -> Result<Option<UserOperationReceipt>, RpcError> {
        (**self).get_user_operation_receipt(hash).await
    }

    async fn get_user_operation_by_hash(
        &self,
        hash: UserOperationHash,
    ) -> Result<Option<UserOperationByHash>, RpcError> {
        (**self).get_user_operation_by_hash(hash).await
    }

    async fn base_fee(&self) -> Result<U256, RpcError> {
        (**self).base_fee().await
    }

    async fn max_priority_fee_per_gas(&self) -> Result<U256, RpcError> {
        (**self).max_priority_fee_per_gas().await
    }
}

/// Bundler client over JSON-RPC (HTTP)
#[derive(Clone, Debug)]
pub struct JsonRpcBundlerClient {
    client: HttpClient,
    url: String,
}

impl JsonRpcBundlerClient {
    pub fn new(url: impl Into<String>) -> Result<Self, RpcError> {
        let url = url.into();
        let client = HttpClientBuilder::default().build(&url)?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl BundlerClient for JsonRpcBundlerClient {
    async fn chain_id(&self) -> Result<u64, RpcError> {
        Ok(EthApiClient::chain_id(&self.client).await?.as_u64())
    }

    async fn supported_entry_points(&self) -> Result<Vec<Address>, RpcError> {
        Ok(EthApiClient::supported_entry_points(&self.client).await?)
    }

    async fn estimate_user_operation_gas(
        &self,
        uo: &UserOperationRequest,
        entry_point: Address,
    ) -> Result<UserOperationGasEstimation, RpcError> {
        trace!("eth_estimateUserOperationGas request: {uo:?}");
        let estimation =
            EthApiClient::estimate_user_operation_gas(&self.client, uo.clone(), entry_point)
                .await?;
        debug!("eth_estimateUserOperationGas response: {estimation:?}");
        Ok(estimation)
    }

    async fn send_user_operation(
        &self,
        uo: &UserOperationRequest,
        entry_point: Address,
    ) -> Result<UserOperationHash, RpcError> {
        trace!("eth_sendUserOperation request: {uo:?}");
        let hash =
            EthApiClient::send_user_operation(&self.client, uo.clone(), entry_point).await?;
        debug!("eth_sendUserOperation response: {hash}");
        Ok(hash)
    }

    async fn get_user_operation_receipt(
        &self,
        hash: UserOperationHash,
    ) -> Result<Option<UserOperationReceipt>, RpcError> {
        Ok(EthApiClient::get_user_operation_receipt(&self.client, hash).await?)
    }

    async fn get_user_operation_by_hash(
        &self,
        hash: UserOperationHash,
    ) -> Result<Option<UserOperationByHash>, RpcError> {
        Ok(EthApiClient::get_user_operation_by_hash(&self.client, hash).await?)
    }

    async fn base_fee(&self) -> Result<U256, RpcError> {
        let block = EthApiClient::get_block_by_number(&self.client, BlockNumber::Latest, false)
            .await?
            .ok_or(RpcError::MissingValue { what: "latest block".into() })?;
        block.base_fee_per_gas.ok_or(RpcError::MissingValue { what: "base fee".into() })
    }

    async fn max_priority_fee_per_gas(&self) -> Result<U256, RpcError> {
        Ok(RundlerApiClient::max_priority_fee_per_gas(&self.client).await?)
    }
}
