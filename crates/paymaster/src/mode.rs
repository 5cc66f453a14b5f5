use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How user operations get sponsored
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SponsorMode {
    /// ERC-7677 paymaster service (`pm_getPaymasterStubData` / `pm_getPaymasterData`)
    Erc7677 {
        /// Service specific context sent with every request
        #[serde(default)]
        context: Value,
    },
    /// Gas manager policy (`alchemy_requestGasAndPaymasterAndData`), estimating gas and fees in
    /// the same round trip
    GasManager {
        policy_id: String,
        /// Pay gas with an ERC-20 token instead of having it sponsored
        #[serde(default, skip_serializing_if = "Option::is_none")]
        erc20: Option<Erc20Payment>,
    },
}

impl SponsorMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Erc7677 { .. } => "erc7677",
            Self::GasManager { .. } => "gas-manager",
        }
    }

    /// Whether the sponsor returns gas limits and fees as well
    pub fn estimates_gas(&self) -> bool {
        matches!(self, Self::GasManager { .. })
    }

    /// Whether an ERC-20 permit can be forwarded in this mode
    pub fn accepts_permit(&self) -> bool {
        matches!(self, Self::GasManager { erc20: Some(_), .. })
    }
}

impl Default for SponsorMode {
    fn default() -> Self {
        Self::Erc7677 { context: Value::Null }
    }
}

/// ERC-20 token used to pay for gas through the gas manager
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc20Payment {
    pub token: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_token_amount: Option<U256>,
}
