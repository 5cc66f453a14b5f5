#![allow(dead_code)]

use async_trait::async_trait;
use corvus_account::{multisig, AccountVersion};
use corvus_builder::{AccountSigner, LocalSigner, SmartAccount, UserOperationErrorKind};
use corvus_primitives::{
    AccountDeployment, EntryPointVersion, UserOperationByHash, UserOperationGasEstimation,
    UserOperationHash, UserOperationReceipt, UserOperationRequest,
};
use corvus_rpc::{
    BundlerClient, GasAndPaymasterRequest, PaymasterClient, RpcError, SponsorshipResponse,
};
use ethers::types::{Address, Bytes, TransactionReceipt, H256, U256};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tokio::time::Instant;

pub const CHAIN_ID: u64 = 1;
pub const PHRASE: &str = "test test test test test test test test test test test junk";

pub fn tx_hash() -> H256 {
    H256::repeat_byte(0x77)
}

#[derive(Debug, Default)]
pub struct BundlerCalls {
    pub sent: Vec<(UserOperationRequest, Address)>,
    pub estimations: usize,
    pub fee_lookups: usize,
    pub receipt_lookups: Vec<Instant>,
}

/// Bundler double: fixed gas estimation, base fee 100 and priority fee 10
#[derive(Debug)]
pub struct MockBundler {
    pub calls: Mutex<BundlerCalls>,
    /// Lookup (1-based) from which on the receipt is found, never if unset
    pub receipt_from: Option<usize>,
    /// Base fee lookups fail, as on a node without `eth_getBlockByNumber`
    pub base_fee_fails: bool,
}

impl MockBundler {
    pub fn new() -> Self {
        Self { calls: Default::default(), receipt_from: None, base_fee_fails: false }
    }

    pub fn sent(&self) -> Vec<UserOperationRequest> {
        self.calls.lock().sent.iter().map(|(uo, _)| uo.clone()).collect()
    }
}

#[async_trait]
impl BundlerClient for MockBundler {
    async fn chain_id(&self) -> Result<u64, RpcError> {
        Ok(CHAIN_ID)
    }

    async fn supported_entry_points(&self) -> Result<Vec<Address>, RpcError> {
        Ok(vec![EntryPointVersion::V06.address(), EntryPointVersion::V07.address()])
    }

    async fn estimate_user_operation_gas(
        &self,
        _uo: &UserOperationRequest,
        _entry_point: Address,
    ) -> Result<UserOperationGasEstimation, RpcError> {
        self.calls.lock().estimations += 1;
        Ok(UserOperationGasEstimation {
            pre_verification_gas: 21_000.into(),
            verification_gas_limit: 100_000.into(),
            call_gas_limit: 30_000.into(),
            paymaster_verification_gas_limit: None,
        })
    }

    async fn send_user_operation(
        &self,
        uo: &UserOperationRequest,
        entry_point: Address,
    ) -> Result<UserOperationHash, RpcError> {
        if !uo.is_signed() {
            return Err(RpcError::Call {
                code: -32602,
                message: "missing signature".into(),
                data: None,
            });
        }
        let version = EntryPointVersion::from_address(&entry_point).unwrap_or_default();
        self.calls.lock().sent.push((uo.clone(), entry_point));
        Ok(uo.hash(&entry_point, CHAIN_ID, version))
    }

    async fn get_user_operation_receipt(
        &self,
        hash: UserOperationHash,
    ) -> Result<Option<UserOperationReceipt>, RpcError> {
        let lookups = {
            let mut calls = self.calls.lock();
            calls.receipt_lookups.push(Instant::now());
            calls.receipt_lookups.len()
        };
        if self.receipt_from.map_or(true, |from| lookups < from) {
            return Ok(None);
        }
        Ok(Some(UserOperationReceipt {
            user_operation_hash: hash,
            sender: Address::zero(),
            nonce: U256::zero(),
            paymaster: None,
            actual_gas_cost: U256::zero(),
            actual_gas_used: U256::zero(),
            success: true,
            reason: String::new(),
            logs: vec![],
            tx_receipt: TransactionReceipt { transaction_hash: tx_hash(), ..Default::default() },
        }))
    }

    async fn get_user_operation_by_hash(
        &self,
        _hash: UserOperationHash,
    ) -> Result<Option<UserOperationByHash>, RpcError> {
        Ok(None)
    }

    async fn base_fee(&self) -> Result<U256, RpcError> {
        self.calls.lock().fee_lookups += 1;
        if self.base_fee_fails {
            return Err(RpcError::Call {
                code: -32000,
                message: "eth_getBlockByNumber unavailable".into(),
                data: None,
            });
        }
        Ok(100.into())
    }

    async fn max_priority_fee_per_gas(&self) -> Result<U256, RpcError> {
        Ok(10.into())
    }
}

#[derive(Debug, Default)]
pub struct PaymasterCalls {
    pub stub: usize,
    pub data: usize,
    pub gas_manager: Vec<GasAndPaymasterRequest>,
}

/// Sponsor double: always sponsors with `paymasterAndData = 0x1234`
#[derive(Debug, Default)]
pub struct MockPaymaster {
    pub calls: Mutex<PaymasterCalls>,
    /// Gas values returned by the gas manager
    pub sponsored_gas: SponsorshipResponse,
}

fn sponsorship(is_final: bool) -> SponsorshipResponse {
    SponsorshipResponse {
        paymaster_and_data: Some("0x1234".parse().unwrap()),
        is_final: Some(is_final),
        ..Default::default()
    }
}

#[async_trait]
impl PaymasterClient for MockPaymaster {
    async fn get_paymaster_stub_data(
        &self,
        _uo: &UserOperationRequest,
        _entry_point: Address,
        _chain_id: u64,
        _context: &Value,
    ) -> Result<SponsorshipResponse, RpcError> {
        self.calls.lock().stub += 1;
        Ok(sponsorship(false))
    }

    async fn get_paymaster_data(
        &self,
        _uo: &UserOperationRequest,
        _entry_point: Address,
        _chain_id: u64,
        _context: &Value,
    ) -> Result<SponsorshipResponse, RpcError> {
        self.calls.lock().data += 1;
        Ok(sponsorship(true))
    }

    async fn request_gas_and_paymaster_and_data(
        &self,
        request: &GasAndPaymasterRequest,
    ) -> Result<SponsorshipResponse, RpcError> {
        self.calls.lock().gas_manager.push(request.clone());
        Ok(SponsorshipResponse {
            paymaster_and_data: Some("0x1234".parse().unwrap()),
            ..self.sponsored_gas.clone()
        })
    }
}

/// Account double signing with a local signer (entry point v0.6)
#[derive(Debug)]
pub struct MockAccount {
    pub signer: Arc<LocalSigner>,
    pub address: Address,
    pub version: AccountVersion,
    pub threshold: Option<usize>,
    pub owners: Vec<Address>,
    pub nonce: U256,
    pub deployed: bool,
}

pub fn phrase_signer(index: u32) -> LocalSigner {
    LocalSigner::from_phrase(PHRASE, index).unwrap()
}

impl MockAccount {
    pub fn new(index: u32) -> Self {
        let signer = Arc::new(phrase_signer(index));
        Self {
            address: Address::repeat_byte(0xac),
            version: AccountVersion::LightAccountV1_1_0,
            threshold: None,
            owners: vec![signer.address()],
            nonce: U256::from(3),
            deployed: true,
            signer,
        }
    }

    /// Signer `index` of the multisig account owned by the first three signers of the phrase
    pub fn multisig(index: u32, threshold: usize) -> Self {
        let mut owners: Vec<Address> = (0..3).map(|i| phrase_signer(i).address()).collect();
        owners.sort();
        Self {
            version: AccountVersion::MultisigModularAccountV1_0_0,
            threshold: Some(threshold),
            owners,
            ..Self::new(index)
        }
    }
}

#[async_trait]
impl SmartAccount for MockAccount {
    fn address(&self) -> Address {
        self.address
    }

    fn version(&self) -> AccountVersion {
        self.version
    }

    fn entry_point(&self) -> Address {
        EntryPointVersion::V06.address()
    }

    fn entry_point_version(&self) -> EntryPointVersion {
        EntryPointVersion::V06
    }

    fn threshold(&self) -> Option<usize> {
        self.threshold
    }

    fn owners(&self) -> Vec<Address> {
        self.owners.clone()
    }

    fn signer(&self) -> Arc<dyn AccountSigner> {
        self.signer.clone()
    }

    async fn is_deployed(&self) -> Result<bool, UserOperationErrorKind> {
        Ok(self.deployed)
    }

    async fn get_nonce(&self, _key: U256) -> Result<U256, UserOperationErrorKind> {
        Ok(self.nonce)
    }

    async fn deployment(&self) -> Result<Option<AccountDeployment>, UserOperationErrorKind> {
        Ok((!self.deployed).then(|| {
            AccountDeployment::from_factory(self.version.default_factory(), Bytes::from(vec![1]))
        }))
    }

    fn dummy_signature(&self) -> Bytes {
        match self.threshold {
            Some(threshold) => multisig::dummy_signature(threshold),
            None => self.version.dummy_signature(),
        }
    }

    async fn sign_user_operation(
        &self,
        _uo: &UserOperationRequest,
        hash: UserOperationHash,
    ) -> Result<Bytes, UserOperationErrorKind> {
        Ok(self.signer.sign_message(hash.as_bytes()).await?)
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Bytes, UserOperationErrorKind> {
        Ok(self.signer.sign_message(message).await?)
    }
}
