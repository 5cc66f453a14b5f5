//! Sponsorship adapter with a single-slot, single-flight cache
//!
//! The adapter remembers the last sponsorship it obtained, keyed by the fingerprint of the user
//! operation (sender, nonce, call data). The slot is locked for the whole round trip, so
//! concurrent requests for the same operation coalesce into a single RPC call. A request for a
//! different operation replaces the slot.
//!
//! Stub data is usable for signing unless the paymaster service flags it `isFinal: false`, only
//! then does [`SponsorshipAdapter::get_final_data`] go back to the service.

use crate::{
    fees::{estimate_network_fees, FeeEstimate},
    mode::{Erc20Payment, SponsorMode},
    sponsorship::{SponsoredGas, Sponsorship, SponsorshipData, SponsorshipKind},
    SponsorError, SponsorWarning,
};
use corvus_primitives::{EntryPointVersion, UserOperationOverrides, UserOperationRequest};
use corvus_rpc::{
    BundlerClient, Erc20Context, GasAndPaymasterRequest, PaymasterClient, SponsorshipResponse,
};
use ethers::types::{Address, Bytes, H256};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

/// Per-request sponsorship options
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SponsorOptions {
    /// Overrides the sponsor should honour when it signs the sponsorship
    pub overrides: UserOperationOverrides,
    /// ERC-20 permit allowing the paymaster to pull the token (gas manager with ERC-20 only)
    pub permit: Option<Bytes>,
}

#[derive(Debug)]
struct CacheEntry {
    fingerprint: H256,
    sponsorship: Sponsorship,
}

/// Obtains sponsorship (paymaster data) for user operations
#[derive(Debug)]
pub struct SponsorshipAdapter {
    paymaster: Arc<dyn PaymasterClient>,
    bundler: Arc<dyn BundlerClient>,
    mode: SponsorMode,
    entry_point: Address,
    entry_point_version: EntryPointVersion,
    chain_id: u64,
    cache: Mutex<Option<CacheEntry>>,
}

impl SponsorshipAdapter {
    pub fn new(
        paymaster: Arc<dyn PaymasterClient>,
        bundler: Arc<dyn BundlerClient>,
        mode: SponsorMode,
        entry_point_version: EntryPointVersion,
        chain_id: u64,
    ) -> Self {
        Self {
            paymaster,
            bundler,
            mode,
            entry_point: entry_point_version.address(),
            entry_point_version,
            chain_id,
            cache: Mutex::new(None),
        }
    }

    /// Uses a non-canonical entry point deployment
    pub fn with_entry_point(mut self, entry_point: Address) -> Self {
        self.entry_point = entry_point;
        self
    }

    pub fn mode(&self) -> &SponsorMode {
        &self.mode
    }

    /// Sponsorship to estimate gas with
    ///
    /// Any cached sponsorship of the same operation satisfies the request.
    pub async fn get_stub_data(
        &self,
        uo: &UserOperationRequest,
        options: &SponsorOptions,
    ) -> Result<Sponsorship, SponsorError> {
        let fingerprint = uo.fingerprint();
        let mut slot = self.cache.lock().await;
        if let Some(entry) = slot.as_ref().filter(|entry| entry.fingerprint == fingerprint) {
            trace!("Sponsorship cache hit for {fingerprint:?} ({:?})", entry.sponsorship.kind);
            return Ok(entry.sponsorship.clone());
        }

        let warnings = self.permit_warnings(options);
        let sponsorship = match &self.mode {
            SponsorMode::Erc7677 { context } => {
                let res = self
                    .paymaster
                    .get_paymaster_stub_data(
                        &self.prepare(uo, options),
                        self.entry_point,
                        self.chain_id,
                        context,
                    )
                    .await?;
                let kind = if res.is_final == Some(false) {
                    SponsorshipKind::Stub
                } else {
                    SponsorshipKind::Final
                };
                Self::decode(&res, kind, None, false, warnings)?
            }
            SponsorMode::GasManager { policy_id, erc20 } => {
                self.request_gas_and_paymaster(uo, options, policy_id, erc20.as_ref(), warnings)
                    .await?
            }
        };

        *slot = Some(CacheEntry { fingerprint, sponsorship: sponsorship.clone() });
        Ok(sponsorship)
    }

    /// Sponsorship ready to be signed and submitted
    ///
    /// A cached sponsorship of the same operation satisfies the request unless it is a stub.
    pub async fn get_final_data(
        &self,
        uo: &UserOperationRequest,
        options: &SponsorOptions,
    ) -> Result<Sponsorship, SponsorError> {
        let fingerprint = uo.fingerprint();
        let mut slot = self.cache.lock().await;
        if let Some(entry) = slot
            .as_ref()
            .filter(|entry| entry.fingerprint == fingerprint && entry.sponsorship.is_final())
        {
            trace!("Sponsorship cache hit for {fingerprint:?} (final)");
            return Ok(entry.sponsorship.clone());
        }

        let warnings = self.permit_warnings(options);
        let sponsorship = match &self.mode {
            SponsorMode::Erc7677 { context } => {
                let res = self
                    .paymaster
                    .get_paymaster_data(
                        &self.prepare(uo, options),
                        self.entry_point,
                        self.chain_id,
                        context,
                    )
                    .await?;
                Self::decode(&res, SponsorshipKind::Final, None, false, warnings)?
            }
            SponsorMode::GasManager { policy_id, erc20 } => {
                self.request_gas_and_paymaster(uo, options, policy_id, erc20.as_ref(), warnings)
                    .await?
            }
        };

        *slot = Some(CacheEntry { fingerprint, sponsorship: sponsorship.clone() });
        Ok(sponsorship)
    }

    /// Fees for the operation: the gas manager's fees if they are cached for it, the network
    /// fees otherwise
    pub async fn estimate_fees(
        &self,
        uo: &UserOperationRequest,
    ) -> Result<FeeEstimate, SponsorError> {
        let fingerprint = uo.fingerprint();
        let cached = self
            .cache
            .lock()
            .await
            .as_ref()
            .filter(|entry| entry.fingerprint == fingerprint)
            .and_then(|entry| entry.sponsorship.gas);
        if let Some(gas) = cached {
            trace!("Using sponsor fees for {fingerprint:?}");
            return Ok(FeeEstimate {
                max_fee_per_gas: gas.max_fee_per_gas,
                max_priority_fee_per_gas: gas.max_priority_fee_per_gas,
            });
        }

        Ok(estimate_network_fees(self.bundler.as_ref()).await?)
    }

    /// Drops the cached sponsorship
    pub async fn invalidate(&self) {
        if let Some(entry) = self.cache.lock().await.take() {
            debug!("Invalidated sponsorship of {:?}", entry.fingerprint);
        }
    }

    fn prepare(&self, uo: &UserOperationRequest, options: &SponsorOptions) -> UserOperationRequest {
        options.overrides.apply(uo.clone()).normalize(self.entry_point_version)
    }

    fn permit_warnings(&self, options: &SponsorOptions) -> Vec<SponsorWarning> {
        if options.permit.is_some() && !self.mode.accepts_permit() {
            warn!("Sponsor mode {} can't forward an ERC-20 permit, ignoring it", self.mode.name());
            return vec![SponsorWarning::PermitIgnored { mode: self.mode.name() }];
        }
        vec![]
    }

    async fn request_gas_and_paymaster(
        &self,
        uo: &UserOperationRequest,
        options: &SponsorOptions,
        policy_id: &str,
        erc20: Option<&Erc20Payment>,
        warnings: Vec<SponsorWarning>,
    ) -> Result<Sponsorship, SponsorError> {
        let request = GasAndPaymasterRequest {
            policy_id: policy_id.to_string(),
            entry_point: self.entry_point,
            user_operation: uo.clone().normalize(self.entry_point_version),
            dummy_signature: uo.signature.clone().unwrap_or_default(),
            overrides: options.overrides.clone(),
            erc20_context: erc20.map(|erc20| Erc20Context {
                token_address: erc20.token,
                max_token_amount: erc20.max_token_amount,
                permit: options.permit.clone(),
            }),
        };
        let res = self.paymaster.request_gas_and_paymaster_and_data(&request).await?;
        let gas = SponsoredGas::try_from(&res)?;
        Self::decode(&res, SponsorshipKind::Final, Some(gas), true, warnings)
    }

    fn decode(
        res: &SponsorshipResponse,
        kind: SponsorshipKind,
        gas: Option<SponsoredGas>,
        overrides_applied: bool,
        warnings: Vec<SponsorWarning>,
    ) -> Result<Sponsorship, SponsorError> {
        Ok(Sponsorship {
            data: SponsorshipData::try_from(res)?,
            kind,
            gas,
            sponsor: res.sponsor.clone(),
            overrides_applied,
            warnings,
        })
    }
}
