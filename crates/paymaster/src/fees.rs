use corvus_primitives::constants::fees::{
    BASE_FEE_MULTIPLIER_DENOMINATOR, BASE_FEE_MULTIPLIER_NUMERATOR,
};
use corvus_rpc::{BundlerClient, RpcError};
use ethers::types::U256;
use tracing::debug;

/// EIP-1559 fees of a user operation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeeEstimate {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

impl FeeEstimate {
    /// Fees from the latest base fee and the priority fee the bundler requires
    /// (`maxFeePerGas = baseFee * 1.5 + priorityFee`)
    pub fn from_network(base_fee: U256, priority_fee: U256) -> Self {
        Self {
            max_fee_per_gas: base_fee * BASE_FEE_MULTIPLIER_NUMERATOR /
                BASE_FEE_MULTIPLIER_DENOMINATOR +
                priority_fee,
            max_priority_fee_per_gas: priority_fee,
        }
    }

    /// Fees raised by at least `percent` (rounded up)
    pub fn bump(&self, percent: u64) -> Self {
        let bump = |fee: U256| {
            let scaled = fee * (100 + percent);
            (scaled + 99) / 100
        };
        Self {
            max_fee_per_gas: bump(self.max_fee_per_gas),
            max_priority_fee_per_gas: bump(self.max_priority_fee_per_gas),
        }
    }

    /// Component-wise maximum
    pub fn max(self, other: Self) -> Self {
        Self {
            max_fee_per_gas: self.max_fee_per_gas.max(other.max_fee_per_gas),
            max_priority_fee_per_gas: self
                .max_priority_fee_per_gas
                .max(other.max_priority_fee_per_gas),
        }
    }
}

/// Queries the bundler for the current base fee and the required priority fee
pub async fn estimate_network_fees<B: BundlerClient + ?Sized>(
    bundler: &B,
) -> Result<FeeEstimate, RpcError> {
    let base_fee = bundler.base_fee().await?;
    let priority_fee = bundler.max_priority_fee_per_gas().await?;
    let fees = FeeEstimate::from_network(base_fee, priority_fee);
    debug!("Estimated fees {fees:?} (base fee {base_fee})");
    Ok(fees)
}
