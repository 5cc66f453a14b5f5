//! Sponsor request and response shapes

use corvus_primitives::{as_checksum_addr, UserOperationOverrides, UserOperationRequest};
use ethers::types::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// Sponsor display information (ERC-7677 stub responses)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Raw sponsor response
///
/// Covers `pm_getPaymasterStubData`, `pm_getPaymasterData` and
/// `alchemy_requestGasAndPaymasterAndData`. Every field is optional on the wire; which
/// combination is present decides how the sponsorship is applied.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorshipResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_and_data: Option<Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_data: Option<Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_verification_gas_limit: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_post_op_gas_limit: Option<U256>,
    /// Whether the stub data can be used as final data (ERC-7677)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_final: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sponsor: Option<SponsorInfo>,

    // gas and fees (combined gas manager call only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_gas_limit: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_gas_limit: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_verification_gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<U256>,
}

/// ERC-20 token the user pays the gas manager with
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc20Context {
    #[serde(serialize_with = "as_checksum_addr")]
    pub token_address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_token_amount: Option<U256>,
    /// Signed EIP-2612 permit for the paymaster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permit: Option<Bytes>,
}

/// Parameters of `alchemy_requestGasAndPaymasterAndData`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasAndPaymasterRequest {
    pub policy_id: String,
    #[serde(serialize_with = "as_checksum_addr")]
    pub entry_point: Address,
    pub user_operation: UserOperationRequest,
    pub dummy_signature: Bytes,
    #[serde(default, skip_serializing_if = "UserOperationOverrides::is_empty")]
    pub overrides: UserOperationOverrides,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub erc20_context: Option<Erc20Context>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_stub_response() {
        let res: SponsorshipResponse = serde_json::from_value(json!({
            "sponsor": {"name": "Corvus"},
            "paymaster": "0x9c5754De1443984659E1b3a8d1931D83475ba29C",
            "paymasterData": "0x1234",
            "paymasterPostOpGasLimit": "0xc350",
            "isFinal": false,
        }))
        .unwrap();
        assert_eq!(res.paymaster_post_op_gas_limit, Some(50_000.into()));
        assert_eq!(res.paymaster_verification_gas_limit, None);
        assert_eq!(res.is_final, Some(false));
        assert_eq!(res.sponsor.unwrap().name, "Corvus");
    }

    #[test]
    fn gas_and_paymaster_request_shape() {
        let request = GasAndPaymasterRequest {
            policy_id: "policy".into(),
            entry_point: "0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789".parse().unwrap(),
            user_operation: UserOperationRequest::default(),
            dummy_signature: "0x1234".parse().unwrap(),
            ..Default::default()
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["policyId"], json!("policy"));
        assert_eq!(value["entryPoint"], json!("0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789"));
        assert!(value.get("overrides").is_none());
        assert!(value.get("erc20Context").is_none());
    }
}
