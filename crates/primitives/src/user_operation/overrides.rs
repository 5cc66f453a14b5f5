//! Caller supplied gas and fee overrides

use super::UserOperationRequest;
use ethers::types::U256;
use serde::{Deserialize, Serialize};

/// Precision of the multiplier when applied to integer gas values
const MULTIPLIER_PRECISION: u64 = 10_000;

/// Override of a single gas or fee field
///
/// Serializes the way sponsors expect it: either a plain quantity or `{"multiplier": 1.2}`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueOverride {
    /// Replaces the computed value unconditionally
    Value(U256),
    /// Scales the computed value
    Multiplier { multiplier: f64 },
}

impl ValueOverride {
    /// Applies the override on top of the computed value
    ///
    /// A multiplier over an unset value leaves the value unset.
    pub fn apply(&self, computed: Option<U256>) -> Option<U256> {
        match self {
            Self::Value(value) => Some(*value),
            Self::Multiplier { multiplier } => computed.map(|value| {
                let scaled = (multiplier.max(0.0) * MULTIPLIER_PRECISION as f64).round() as u64;
                value.saturating_mul(scaled.into()) / MULTIPLIER_PRECISION
            }),
        }
    }

    pub fn is_absolute(&self) -> bool {
        matches!(self, Self::Value(_))
    }
}

impl From<U256> for ValueOverride {
    fn from(value: U256) -> Self {
        Self::Value(value)
    }
}

/// Overrides for the gas and fee fields of a user operation
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_gas_limit: Option<ValueOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_gas_limit: Option<ValueOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_verification_gas: Option<ValueOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<ValueOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<ValueOverride>,
}

impl UserOperationOverrides {
    pub fn is_empty(&self) -> bool {
        self.call_gas_limit.is_none() &&
            self.verification_gas_limit.is_none() &&
            self.pre_verification_gas.is_none() &&
            self.max_fee_per_gas.is_none() &&
            self.max_priority_fee_per_gas.is_none()
    }

    /// Applies every set override to the user operation
    pub fn apply(&self, mut uo: UserOperationRequest) -> UserOperationRequest {
        let apply = |ov: &Option<ValueOverride>, computed: Option<U256>| match ov {
            Some(ov) => ov.apply(computed),
            None => computed,
        };

        uo.call_gas_limit = apply(&self.call_gas_limit, uo.call_gas_limit);
        uo.verification_gas_limit = apply(&self.verification_gas_limit, uo.verification_gas_limit);
        uo.pre_verification_gas = apply(&self.pre_verification_gas, uo.pre_verification_gas);
        uo.max_fee_per_gas = apply(&self.max_fee_per_gas, uo.max_fee_per_gas);
        uo.max_priority_fee_per_gas =
            apply(&self.max_priority_fee_per_gas, uo.max_priority_fee_per_gas);
        uo
    }

    /// Only the absolute overrides (multipliers dropped)
    pub fn absolute_only(&self) -> Self {
        let absolute = |ov: Option<ValueOverride>| ov.filter(ValueOverride::is_absolute);
        Self {
            call_gas_limit: absolute(self.call_gas_limit),
            verification_gas_limit: absolute(self.verification_gas_limit),
            pre_verification_gas: absolute(self.pre_verification_gas),
            max_fee_per_gas: absolute(self.max_fee_per_gas),
            max_priority_fee_per_gas: absolute(self.max_priority_fee_per_gas),
        }
    }

    /// Only the fee overrides (used when re-estimating fees of a replacement)
    pub fn fees_only(&self) -> Self {
        Self {
            max_fee_per_gas: self.max_fee_per_gas,
            max_priority_fee_per_gas: self.max_priority_fee_per_gas,
            ..Default::default()
        }
    }
}
