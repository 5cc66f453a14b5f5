use crate::{
    error::RpcError,
    paymaster_api::{GasManagerApiClient, PaymasterApiClient},
    types::{GasAndPaymasterRequest, SponsorshipResponse},
};
use async_trait::async_trait;
use corvus_primitives::{chain_id_hex, UserOperationRequest};
use ethers::types::Address;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use serde_json::Value;
use std::{fmt::Debug, sync::Arc};
use tracing::debug;

/// Sponsor (paymaster service) of user operations
#[async_trait]
pub trait PaymasterClient: Send + Sync + Debug {
    async fn get_paymaster_stub_data(
        &self,
        uo: &UserOperationRequest,
        entry_point: Address,
        chain_id: u64,
        context: &Value,
    ) -> Result<SponsorshipResponse, RpcError>;

    async fn get_paymaster_data(
        &self,
        uo: &UserOperationRequest,
        entry_point: Address,
        chain_id: u64,
        context: &Value,
    ) -> Result<SponsorshipResponse, RpcError>;

    async fn request_gas_and_paymaster_and_data(
        &self,
        request: &GasAndPaymasterRequest,
    ) -> Result<SponsorshipResponse, RpcError>;
}

#[async_trait]
impl<T: PaymasterClient + ?Sized> PaymasterClient for Arc<T> {
    async fn get_paymaster_stub_data(
        &self,
        uo: &UserOperationRequest,
        entry_point: Address,
        chain_id: u64,
        context: &Value,
    ) -> Result<SponsorshipResponse, RpcError> {
        (**self).get_paymaster_stub_data(uo, entry_point, chain_id, context).await
    }

    async fn get_paymaster_data(
        &self,
        uo: &UserOperationRequest,
        entry_point: Address,
        chain_id: u64,
        context: &Value,
    ) -> Result<SponsorshipResponse, RpcError> {
        (**self).get_paymaster_data(uo, entry_point, chain_id, context).await
    }

    async fn request_gas_and_paymaster_and_data(
        &self,
        request: &GasAndPaymasterRequest,
    ) -> Result<SponsorshipResponse, RpcError> {
        (**self).request_gas_and_paymaster_and_data(request).await
    }
}

/// Sponsor client over JSON-RPC (HTTP)
#[derive(Clone, Debug)]
pub struct JsonRpcPaymasterClient {
    client: HttpClient,
}

impl JsonRpcPaymasterClient {
    pub fn new(url: impl AsRef<str>) -> Result<Self, RpcError> {
        Ok(Self { client: HttpClientBuilder::default().build(url)? })
    }
}

#[async_trait]
impl PaymasterClient for JsonRpcPaymasterClient {
    async fn get_paymaster_stub_data(
        &self,
        uo: &UserOperationRequest,
        entry_point: Address,
        chain_id: u64,
        context: &Value,
    ) -> Result<SponsorshipResponse, RpcError> {
        let res = PaymasterApiClient::get_paymaster_stub_data(
            &self.client,
            uo.clone(),
            entry_point,
            chain_id_hex(chain_id),
            context.clone(),
        )
        .await?;
        debug!("pm_getPaymasterStubData response: {res:?}");
        Ok(res)
    }

    async fn get_paymaster_data(
        &self,
        uo: &UserOperationRequest,
        entry_point: Address,
        chain_id: u64,
        context: &Value,
    ) -> Result<SponsorshipResponse, RpcError> {
        let res = PaymasterApiClient::get_paymaster_data(
            &self.client,
            uo.clone(),
            entry_point,
            chain_id_hex(chain_id),
            context.clone(),
        )
        .await?;
        debug!("pm_getPaymasterData response: {res:?}");
        Ok(res)
    }

    async fn request_gas_and_paymaster_and_data(
        &self,
        request: &GasAndPaymasterRequest,
    ) -> Result<SponsorshipResponse, RpcError> {
        let res =
            GasManagerApiClient::request_gas_and_paymaster_and_data(&self.client, request.clone())
                .await?;
        debug!("alchemy_requestGasAndPaymasterAndData response: {res:?}");
        Ok(res)
    }
}
