//! Sponsorship results decoded from the sponsor responses

use crate::{SponsorError, SponsorWarning};
use corvus_primitives::{
    constants::sponsorship::{
        DEFAULT_PAYMASTER_POST_OP_GAS_LIMIT, DEFAULT_PAYMASTER_VERIFICATION_GAS_LIMIT,
    },
    PaymasterFields, UserOperationRequest,
};
use corvus_rpc::{SponsorInfo, SponsorshipResponse};
use ethers::types::{Address, Bytes, U256};

/// Paymaster fields returned by the sponsor
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SponsorshipData {
    Combined {
        paymaster_and_data: Bytes,
    },
    Decomposed {
        paymaster: Address,
        paymaster_data: Bytes,
        verification_gas_limit: U256,
        post_op_gas_limit: U256,
    },
}

impl SponsorshipData {
    pub fn paymaster_fields(&self) -> PaymasterFields {
        match self.clone() {
            Self::Combined { paymaster_and_data } => {
                PaymasterFields::Combined { paymaster_and_data }
            }
            Self::Decomposed {
                paymaster,
                paymaster_data,
                verification_gas_limit,
                post_op_gas_limit,
            } => PaymasterFields::Decomposed {
                paymaster,
                paymaster_data,
                verification_gas_limit,
                post_op_gas_limit,
            },
        }
    }
}

impl TryFrom<&SponsorshipResponse> for SponsorshipData {
    type Error = SponsorError;

    fn try_from(res: &SponsorshipResponse) -> Result<Self, Self::Error> {
        if let Some(paymaster_and_data) = &res.paymaster_and_data {
            return Ok(Self::Combined { paymaster_and_data: paymaster_and_data.clone() });
        }

        let paymaster = res.paymaster.ok_or(SponsorError::SponsorDataMissing)?;
        Ok(Self::Decomposed {
            paymaster,
            paymaster_data: res.paymaster_data.clone().unwrap_or_default(),
            verification_gas_limit: res
                .paymaster_verification_gas_limit
                .unwrap_or_else(|| DEFAULT_PAYMASTER_VERIFICATION_GAS_LIMIT.into()),
            post_op_gas_limit: res
                .paymaster_post_op_gas_limit
                .unwrap_or_else(|| DEFAULT_PAYMASTER_POST_OP_GAS_LIMIT.into()),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SponsorshipKind {
    /// Good enough to estimate gas with, must be replaced before signing
    Stub,
    /// Signed by the sponsor, ready to be submitted
    Final,
}

/// Gas limits and fees returned by the gas manager
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SponsoredGas {
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

impl TryFrom<&SponsorshipResponse> for SponsoredGas {
    type Error = SponsorError;

    fn try_from(res: &SponsorshipResponse) -> Result<Self, Self::Error> {
        let field = |value: Option<U256>, field| value.ok_or(SponsorError::IncompleteGas { field });
        Ok(Self {
            call_gas_limit: field(res.call_gas_limit, "callGasLimit")?,
            verification_gas_limit: field(res.verification_gas_limit, "verificationGasLimit")?,
            pre_verification_gas: field(res.pre_verification_gas, "preVerificationGas")?,
            max_fee_per_gas: field(res.max_fee_per_gas, "maxFeePerGas")?,
            max_priority_fee_per_gas: field(res.max_priority_fee_per_gas, "maxPriorityFeePerGas")?,
        })
    }
}

/// Outcome of a sponsorship request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sponsorship {
    pub data: SponsorshipData,
    pub kind: SponsorshipKind,
    /// Gas and fees (gas manager only)
    pub gas: Option<SponsoredGas>,
    pub sponsor: Option<SponsorInfo>,
    /// Whether the caller's overrides were already applied by the sponsor
    pub overrides_applied: bool,
    pub warnings: Vec<SponsorWarning>,
}

impl Sponsorship {
    pub fn is_final(&self) -> bool {
        self.kind == SponsorshipKind::Final
    }

    /// Sets the paymaster fields on the user operation
    ///
    /// The sponsor's gas values, if any, only fill the gas and fee fields that are still unset.
    pub fn apply(&self, mut uo: UserOperationRequest) -> UserOperationRequest {
        if let Some(gas) = self.gas {
            uo.call_gas_limit = uo.call_gas_limit.or(Some(gas.call_gas_limit));
            uo.verification_gas_limit =
                uo.verification_gas_limit.or(Some(gas.verification_gas_limit));
            uo.pre_verification_gas = uo.pre_verification_gas.or(Some(gas.pre_verification_gas));
            uo.max_fee_per_gas = uo.max_fee_per_gas.or(Some(gas.max_fee_per_gas));
            uo.max_priority_fee_per_gas =
                uo.max_priority_fee_per_gas.or(Some(gas.max_priority_fee_per_gas));
        }
        uo.paymaster = Some(self.data.paymaster_fields());
        uo
    }
}
