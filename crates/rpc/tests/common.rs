#![allow(dead_code)]

use async_trait::async_trait;
use corvus_primitives::{
    UserOperationGasEstimation, UserOperationHash, UserOperationReceipt, UserOperationRequest,
};
use corvus_rpc::{GasAndPaymasterRequest, SponsorshipResponse};
use ethers::types::{Address, Block, BlockNumber, H256, U256, U64};
use jsonrpsee::{
    core::RpcResult,
    proc_macros::rpc,
    server::{ServerBuilder, ServerHandle},
    types::ErrorObjectOwned,
    RpcModule,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::{net::SocketAddr, sync::Arc};

#[rpc(server, namespace = "eth")]
pub trait DummyEthApi {
    #[method(name = "chainId")]
    async fn chain_id(&self) -> RpcResult<U64>;

    #[method(name = "supportedEntryPoints")]
    async fn supported_entry_points(&self) -> RpcResult<Vec<Address>>;

    #[method(name = "sendUserOperation")]
    async fn send_user_operation(
        &self,
        user_operation: UserOperationRequest,
        entry_point: Address,
    ) -> RpcResult<UserOperationHash>;

    #[method(name = "estimateUserOperationGas")]
    async fn estimate_user_operation_gas(
        &self,
        user_operation: UserOperationRequest,
        entry_point: Address,
    ) -> RpcResult<UserOperationGasEstimation>;

    #[method(name = "getUserOperationReceipt")]
    async fn get_user_operation_receipt(
        &self,
        user_operation_hash: UserOperationHash,
    ) -> RpcResult<Option<UserOperationReceipt>>;

    #[method(name = "getBlockByNumber")]
    async fn get_block_by_number(
        &self,
        block: BlockNumber,
        full_transactions: bool,
    ) -> RpcResult<Option<Block<H256>>>;
}

#[rpc(server, namespace = "rundler")]
pub trait DummyRundlerApi {
    #[method(name = "maxPriorityFeePerGas")]
    async fn max_priority_fee_per_gas(&self) -> RpcResult<U256>;
}

#[rpc(server, namespace = "pm")]
pub trait DummyPaymasterApi {
    #[method(name = "getPaymasterStubData")]
    async fn get_paymaster_stub_data(
        &self,
        user_operation: UserOperationRequest,
        entry_point: Address,
        chain_id: String,
        paymaster_context: Value,
    ) -> RpcResult<SponsorshipResponse>;
}

#[rpc(server, namespace = "alchemy")]
pub trait DummyGasManagerApi {
    #[method(name = "requestGasAndPaymasterAndData")]
    async fn request_gas_and_paymaster_and_data(
        &self,
        request: GasAndPaymasterRequest,
    ) -> RpcResult<SponsorshipResponse>;
}

/// Requests the dummy server received, by method
#[derive(Default)]
pub struct Recorded {
    pub sent: Vec<(UserOperationRequest, Address)>,
    pub stub_params: Vec<(String, Value)>,
    pub gas_manager: Vec<GasAndPaymasterRequest>,
}

#[derive(Clone)]
pub struct DummyServerImpl {
    pub chain_id: U64,
    pub base_fee: Option<U256>,
    pub recorded: Arc<Mutex<Recorded>>,
}

impl DummyServerImpl {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id: chain_id.into(),
            base_fee: Some(U256::from(10_000_000_000_u64)),
            recorded: Default::default(),
        }
    }
}

#[async_trait]
impl DummyEthApiServer for DummyServerImpl {
    async fn chain_id(&self) -> RpcResult<U64> {
        Ok(self.chain_id)
    }

    async fn supported_entry_points(&self) -> RpcResult<Vec<Address>> {
        Ok(vec!["0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789".parse().unwrap()])
    }

    async fn send_user_operation(
        &self,
        user_operation: UserOperationRequest,
        entry_point: Address,
    ) -> RpcResult<UserOperationHash> {
        if user_operation.signature.is_none() {
            return Err(ErrorObjectOwned::owned(-32602, "missing signature", None::<()>));
        }
        let hash = user_operation.hash(&entry_point, self.chain_id.as_u64(), Default::default());
        self.recorded.lock().sent.push((user_operation, entry_point));
        Ok(hash)
    }

    async fn estimate_user_operation_gas(
        &self,
        _user_operation: UserOperationRequest,
        _entry_point: Address,
    ) -> RpcResult<UserOperationGasEstimation> {
        Ok(UserOperationGasEstimation {
            pre_verification_gas: 45_000.into(),
            verification_gas_limit: 100_000.into(),
            call_gas_limit: 33_100.into(),
            paymaster_verification_gas_limit: None,
        })
    }

    async fn get_user_operation_receipt(
        &self,
        _user_operation_hash: UserOperationHash,
    ) -> RpcResult<Option<UserOperationReceipt>> {
        Ok(None)
    }

    async fn get_block_by_number(
        &self,
        _block: BlockNumber,
        _full_transactions: bool,
    ) -> RpcResult<Option<Block<H256>>> {
        Ok(Some(Block { base_fee_per_gas: self.base_fee, ..Default::default() }))
    }
}

#[async_trait]
impl DummyRundlerApiServer for DummyServerImpl {
    async fn max_priority_fee_per_gas(&self) -> RpcResult<U256> {
        Ok(U256::from(1_000_000_000_u64))
    }
}

#[async_trait]
impl DummyPaymasterApiServer for DummyServerImpl {
    async fn get_paymaster_stub_data(
        &self,
        _user_operation: UserOperationRequest,
        _entry_point: Address,
        chain_id: String,
        paymaster_context: Value,
    ) -> RpcResult<SponsorshipResponse> {
        self.recorded.lock().stub_params.push((chain_id, paymaster_context));
        Ok(SponsorshipResponse {
            paymaster_and_data: Some("0x1234".parse().unwrap()),
            is_final: Some(true),
            ..Default::default()
        })
    }
}

#[async_trait]
impl DummyGasManagerApiServer for DummyServerImpl {
    async fn request_gas_and_paymaster_and_data(
        &self,
        request: GasAndPaymasterRequest,
    ) -> RpcResult<SponsorshipResponse> {
        self.recorded.lock().gas_manager.push(request);
        Ok(SponsorshipResponse {
            paymaster: Some(Address::repeat_byte(0x11)),
            paymaster_data: Some("0xabcd".parse().unwrap()),
            call_gas_limit: Some(50_000.into()),
            max_fee_per_gas: Some(7.into()),
            ..Default::default()
        })
    }
}

/// Starts the dummy server on a free local port
pub async fn start_server(dummy: DummyServerImpl) -> eyre::Result<(SocketAddr, ServerHandle)> {
    let mut module = RpcModule::new(());
    module.merge(DummyEthApiServer::into_rpc(dummy.clone()))?;
    module.merge(DummyRundlerApiServer::into_rpc(dummy.clone()))?;
    module.merge(DummyPaymasterApiServer::into_rpc(dummy.clone()))?;
    module.merge(DummyGasManagerApiServer::into_rpc(dummy))?;

    let server = ServerBuilder::default().build("127.0.0.1:0").await?;
    let addr = server.local_addr()?;
    Ok((addr, server.start(module)))
}
