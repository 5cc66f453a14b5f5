//! User operation pipeline
//!
//! A user operation moves through the stages in a fixed order:
//! init code and nonce, fees, stub sponsorship, gas, final sponsorship, the custom stage,
//! overrides, validation, signing and submission. Overrides are applied last so they always
//! win over computed values. A gas manager prices the operation in the sponsorship round trip,
//! so with one the sponsorship is requested ahead of the fees and the network fees are skipped.
//!
//! A sealed operation is submitted at most once per pipeline.

use crate::{
    account::SmartAccount,
    error::{Stage, UserOperationError, UserOperationErrorKind, UserOperationResult},
    waiter::{ConfirmationWaiter, RetryPolicy},
};
use async_trait::async_trait;
use corvus_account::Call;
use corvus_paymaster::{estimate_network_fees, FeeEstimate, SponsorOptions, SponsorshipAdapter};
use corvus_primitives::{
    constants::fees::REPLACEMENT_FEE_BUMP_PERCENT, SignedUserOperation, UserOperationByHash,
    UserOperationHash, UserOperationOverrides, UserOperationReceipt, UserOperationRequest,
    ValueOverride,
};
use corvus_rpc::{BundlerClient, RpcError};
use ethers::types::{Address, H256, U256};
use parking_lot::Mutex;
use std::{collections::HashSet, fmt::Debug, sync::Arc};
use tracing::{debug, info, trace, warn};

/// Pipeline configuration
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineOptions {
    pub chain_id: u64,
    /// Entry point deployment, the canonical one of the account's entry point version if unset
    pub entry_point: Option<Address>,
    /// 192-bit key of the nonce sequence
    pub nonce_key: U256,
    pub retry: RetryPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self { chain_id: 1, entry_point: None, nonce_key: U256::zero(), retry: Default::default() }
    }
}

/// Custom stage, runs after sponsorship and before the overrides
#[async_trait]
pub trait UserOperationMiddleware: Send + Sync + Debug {
    async fn process(
        &self,
        uo: UserOperationRequest,
    ) -> Result<UserOperationRequest, UserOperationErrorKind>;
}

fn fail<E: Into<UserOperationErrorKind>>(
    uo: &UserOperationRequest,
    stage: Stage,
) -> impl FnOnce(E) -> UserOperationError {
    let (sender, nonce) = (uo.sender, uo.nonce);
    move |err| UserOperationError { sender, nonce, stage, kind: err.into() }
}

/// Builds, sponsors, signs and submits user operations of a smart account
#[derive(Debug)]
pub struct OperationPipeline {
    bundler: Arc<dyn BundlerClient>,
    account: Option<Arc<dyn SmartAccount>>,
    sponsor: Option<Arc<SponsorshipAdapter>>,
    middleware: Option<Arc<dyn UserOperationMiddleware>>,
    waiter: ConfirmationWaiter,
    options: PipelineOptions,
    /// Hashes of the operations submitted (or being submitted) so far
    submitted: Mutex<HashSet<UserOperationHash>>,
}

impl OperationPipeline {
    pub fn new(bundler: Arc<dyn BundlerClient>, options: PipelineOptions) -> Self {
        Self {
            waiter: ConfirmationWaiter::new(bundler.clone(), options.retry),
            bundler,
            account: None,
            sponsor: None,
            middleware: None,
            options,
            submitted: Default::default(),
        }
    }

    pub fn with_account(mut self, account: Arc<dyn SmartAccount>) -> Self {
        self.account = Some(account);
        self
    }

    pub fn with_sponsor(mut self, sponsor: Arc<SponsorshipAdapter>) -> Self {
        self.sponsor = Some(sponsor);
        self
    }

    pub fn with_middleware(mut self, middleware: Arc<dyn UserOperationMiddleware>) -> Self {
        self.middleware = Some(middleware);
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn account(&self) -> Option<&Arc<dyn SmartAccount>> {
        self.account.as_ref()
    }

    pub(crate) fn connected_account(
        &self,
    ) -> Result<&Arc<dyn SmartAccount>, UserOperationErrorKind> {
        self.account
            .as_ref()
            .filter(|account| account.is_connected())
            .ok_or(UserOperationErrorKind::AccountNotConnected)
    }

    pub(crate) fn entry_point(&self, account: &dyn SmartAccount) -> Address {
        self.options.entry_point.unwrap_or_else(|| account.entry_point())
    }

    /// Builds the (unsigned) user operation executing the calls
    pub async fn build_user_operation(
        &self,
        calls: &[Call],
        options: &SponsorOptions,
    ) -> UserOperationResult<UserOperationRequest> {
        let uo = UserOperationRequest::default();
        let account = self.connected_account().map_err(fail(&uo, Stage::Building))?;
        let uo = uo.call_data(account.encode_calls(calls));
        self.process(uo, options, true).await
    }

    /// Runs a partially filled user operation through the pipeline
    ///
    /// Unset fields are resolved, fields already set are kept. A zero nonce is resolved from
    /// the entry point.
    pub async fn build_raw_user_operation(
        &self,
        uo: UserOperationRequest,
        options: &SponsorOptions,
    ) -> UserOperationResult<UserOperationRequest> {
        let fetch_nonce = uo.nonce.is_zero();
        self.process(uo, options, fetch_nonce).await
    }

    async fn process(
        &self,
        mut uo: UserOperationRequest,
        options: &SponsorOptions,
        fetch_nonce: bool,
    ) -> UserOperationResult<UserOperationRequest> {
        if uo.is_signed() {
            return Err(fail(&uo, Stage::Sealed)(UserOperationErrorKind::AlreadySealed));
        }
        let account = self.connected_account().map_err(fail(&uo, Stage::Building))?;
        let entry_point = self.entry_point(account.as_ref());
        let version = account.entry_point_version();

        // init code and nonce
        if uo.sender.is_zero() {
            uo.sender = account.address();
        }
        if uo.deployment.is_none() {
            uo.deployment = account.deployment().await.map_err(fail(&uo, Stage::Building))?;
        }
        if fetch_nonce {
            uo.nonce = account
                .get_nonce(self.options.nonce_key)
                .await
                .map_err(fail(&uo, Stage::Building))?;
        }
        uo.signature = Some(account.dummy_signature());
        info!("Building user operation of {:?} with nonce {}", uo.sender, uo.nonce);

        // the gas manager's fees are cached with its sponsorship
        if let Some(sponsor) = self.sponsor.as_ref().filter(|s| s.mode().estimates_gas()) {
            sponsor.get_stub_data(&uo, options).await.map_err(fail(&uo, Stage::Sponsoring))?;
        }

        // fees
        let fees = match &self.sponsor {
            Some(sponsor) => {
                sponsor.estimate_fees(&uo).await.map_err(fail(&uo, Stage::Estimating))?
            }
            None => estimate_network_fees(self.bundler.as_ref())
                .await
                .map_err(fail(&uo, Stage::Estimating))?,
        };
        uo.max_fee_per_gas = uo.max_fee_per_gas.or(Some(fees.max_fee_per_gas));
        uo.max_priority_fee_per_gas =
            uo.max_priority_fee_per_gas.or(Some(fees.max_priority_fee_per_gas));

        // stub sponsorship
        let mut sponsored_gas = false;
        if let Some(sponsor) = &self.sponsor {
            let stub =
                sponsor.get_stub_data(&uo, options).await.map_err(fail(&uo, Stage::Sponsoring))?;
            sponsored_gas = stub.gas.is_some();
            uo = stub.apply(uo);
        }

        // gas
        if !sponsored_gas {
            let estimation = self
                .bundler
                .estimate_user_operation_gas(&uo.clone().normalize(version), entry_point)
                .await
                .map_err(fail(&uo, Stage::Estimating))?;
            debug!("Gas estimation of {:?}: {estimation:?}", uo.sender);
            uo.call_gas_limit = uo.call_gas_limit.or(Some(estimation.call_gas_limit));
            uo.verification_gas_limit =
                uo.verification_gas_limit.or(Some(estimation.verification_gas_limit));
            uo.pre_verification_gas =
                uo.pre_verification_gas.or(Some(estimation.pre_verification_gas));
        }

        // final sponsorship
        let mut overrides_applied = false;
        if let Some(sponsor) = &self.sponsor {
            let sponsorship =
                sponsor.get_final_data(&uo, options).await.map_err(fail(&uo, Stage::Sponsoring))?;
            overrides_applied = sponsorship.overrides_applied;
            uo = sponsorship.apply(uo);
        }

        if let Some(middleware) = &self.middleware {
            let (sender, nonce) = (uo.sender, uo.nonce);
            uo = middleware.process(uo).await.map_err(|kind| UserOperationError {
                sender,
                nonce,
                stage: Stage::Sponsoring,
                kind,
            })?;
        }

        // overrides (the sponsor already honoured the multipliers it was sent)
        uo = if overrides_applied {
            options.overrides.absolute_only().apply(uo)
        } else {
            options.overrides.apply(uo)
        };

        let missing = uo.missing_fields();
        if !missing.is_empty() {
            return Err(fail(&uo, Stage::Estimating)(UserOperationErrorKind::IncompleteOperation {
                fields: missing.into_iter().map(String::from).collect(),
            }));
        }

        uo.signature = None;
        trace!("Built user operation {uo:?}");
        Ok(uo)
    }

    /// Seals the user operation with the account's signature
    pub async fn sign_user_operation(
        &self,
        uo: UserOperationRequest,
    ) -> UserOperationResult<SignedUserOperation> {
        if uo.is_signed() {
            return Err(fail(&uo, Stage::Sealed)(UserOperationErrorKind::AlreadySealed));
        }
        let account = self.connected_account().map_err(fail(&uo, Stage::Signing))?;
        let missing = uo.missing_fields();
        if !missing.is_empty() {
            return Err(fail(&uo, Stage::Signing)(UserOperationErrorKind::IncompleteOperation {
                fields: missing.into_iter().map(String::from).collect(),
            }));
        }

        let entry_point = self.entry_point(account.as_ref());
        let version = account.entry_point_version();
        let hash = uo.hash(&entry_point, self.options.chain_id, version);
        let signature =
            account.sign_user_operation(&uo, hash).await.map_err(fail(&uo, Stage::Signing))?;
        debug!("Signed user operation {hash}");

        Ok(SignedUserOperation::new(hash, entry_point, version, uo.signature(signature)))
    }

    /// Submits the sealed user operation to the bundler
    ///
    /// An operation is submitted once, later attempts fail with
    /// [`UserOperationErrorKind::AlreadySubmitted`]. A rejected submission can be retried.
    pub async fn submit(
        &self,
        signed: &SignedUserOperation,
    ) -> UserOperationResult<UserOperationHash> {
        if !self.submitted.lock().insert(signed.hash) {
            return Err(fail(signed, Stage::Submitted)(UserOperationErrorKind::AlreadySubmitted {
                hash: signed.hash,
            }));
        }

        let hash = match self
            .bundler
            .send_user_operation(&signed.user_operation, signed.entry_point)
            .await
        {
            Ok(hash) => hash,
            Err(err) => {
                self.submitted.lock().remove(&signed.hash);
                return Err(fail(signed, Stage::Sealed)(err));
            }
        };
        if hash != signed.hash {
            warn!("Bundler returned hash {hash} for user operation {}", signed.hash);
        }
        info!("Submitted user operation {} of {:?}", signed.hash, signed.sender);
        Ok(hash)
    }

    /// Builds, signs and submits a user operation executing the calls
    pub async fn send_user_operation(
        &self,
        calls: &[Call],
        options: &SponsorOptions,
    ) -> UserOperationResult<SignedUserOperation> {
        let uo = self.build_user_operation(calls, options).await?;
        let signed = self.sign_user_operation(uo).await?;
        self.submit(&signed).await?;
        Ok(signed)
    }

    /// Builds, signs and submits a partially filled user operation
    pub async fn send_raw_user_operation(
        &self,
        uo: UserOperationRequest,
        options: &SponsorOptions,
    ) -> UserOperationResult<SignedUserOperation> {
        let uo = self.build_raw_user_operation(uo, options).await?;
        let signed = self.sign_user_operation(uo).await?;
        self.submit(&signed).await?;
        Ok(signed)
    }

    /// Sends the calls and waits until the user operation is mined
    pub async fn send_and_wait(
        &self,
        calls: &[Call],
        options: &SponsorOptions,
    ) -> UserOperationResult<H256> {
        let signed = self.send_user_operation(calls, options).await?;
        self.wait_for_user_operation_transaction(signed.hash)
            .await
            .map_err(fail(&signed, Stage::Submitted))
    }

    /// Replaces a pending user operation with one of the same nonce
    ///
    /// Fees are the current network fees (with the caller's fee overrides), but at least the
    /// old fees bumped by the replacement minimum.
    pub async fn drop_and_replace(
        &self,
        pending: &SignedUserOperation,
        options: &SponsorOptions,
    ) -> UserOperationResult<SignedUserOperation> {
        let mut uo = pending.user_operation.clone();
        uo.signature = None;
        uo.paymaster = None;

        let old = FeeEstimate {
            max_fee_per_gas: uo.max_fee_per_gas.unwrap_or_default(),
            max_priority_fee_per_gas: uo.max_priority_fee_per_gas.unwrap_or_default(),
        };
        let network = estimate_network_fees(self.bundler.as_ref())
            .await
            .map_err(fail(&uo, Stage::Estimating))?;
        let requested = options.overrides.fees_only().apply(
            UserOperationRequest::default()
                .max_fee_per_gas(network.max_fee_per_gas)
                .max_priority_fee_per_gas(network.max_priority_fee_per_gas),
        );
        let fees = FeeEstimate {
            max_fee_per_gas: requested.max_fee_per_gas.unwrap_or(network.max_fee_per_gas),
            max_priority_fee_per_gas: requested
                .max_priority_fee_per_gas
                .unwrap_or(network.max_priority_fee_per_gas),
        }
        .max(old.bump(REPLACEMENT_FEE_BUMP_PERCENT));
        info!(
            "Replacing user operation {} (max fee {} -> {})",
            pending.hash, old.max_fee_per_gas, fees.max_fee_per_gas
        );

        if let Some(sponsor) = &self.sponsor {
            sponsor.invalidate().await;
        }

        uo.max_fee_per_gas = Some(fees.max_fee_per_gas);
        uo.max_priority_fee_per_gas = Some(fees.max_priority_fee_per_gas);
        let options = SponsorOptions {
            overrides: UserOperationOverrides {
                max_fee_per_gas: Some(ValueOverride::Value(fees.max_fee_per_gas)),
                max_priority_fee_per_gas: Some(ValueOverride::Value(
                    fees.max_priority_fee_per_gas,
                )),
                ..options.overrides.clone()
            },
            permit: options.permit.clone(),
        };

        let uo = self.process(uo, &options, false).await?;
        let signed = self.sign_user_operation(uo).await?;
        self.submit(&signed).await?;
        Ok(signed)
    }

    /// Polls the bundler until the user operation is included, returns the transaction hash
    pub async fn wait_for_user_operation_transaction(
        &self,
        hash: UserOperationHash,
    ) -> Result<H256, crate::ConfirmationTimeout> {
        self.waiter.wait_for_user_operation_transaction(hash).await
    }

    pub async fn get_user_operation_receipt(
        &self,
        hash: UserOperationHash,
    ) -> Result<Option<UserOperationReceipt>, RpcError> {
        self.bundler.get_user_operation_receipt(hash).await
    }

    pub async fn get_user_operation_by_hash(
        &self,
        hash: UserOperationHash,
    ) -> Result<Option<UserOperationByHash>, RpcError> {
        self.bundler.get_user_operation_by_hash(hash).await
    }
}
