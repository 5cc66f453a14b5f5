//! Basic transaction type for account abstraction (ERC-4337)

mod hash;
mod overrides;
mod request;

use crate::{entry_point::EntryPointVersion, utils::as_checksum_addr};
use ethers::types::{Address, Log, TransactionReceipt, H256, U256, U64};
pub use hash::UserOperationHash;
pub use overrides::{UserOperationOverrides, ValueOverride};
pub use request::{AccountDeployment, PaymasterFields, UserOperationRequest};
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// Sealed user operation: every field is set, the signature is attached and the hash is fixed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUserOperation {
    /// Hash of the user operation
    pub hash: UserOperationHash,

    /// Entry point the user operation is submitted to
    #[serde(serialize_with = "as_checksum_addr")]
    pub entry_point: Address,

    /// Entry point version the user operation is packed for
    pub entry_point_version: EntryPointVersion,

    /// User operation (normalized for the entry point version)
    pub user_operation: UserOperationRequest,
}

impl SignedUserOperation {
    pub fn new(
        hash: UserOperationHash,
        entry_point: Address,
        entry_point_version: EntryPointVersion,
        user_operation: UserOperationRequest,
    ) -> Self {
        Self {
            hash,
            entry_point,
            entry_point_version,
            user_operation: user_operation.normalize(entry_point_version),
        }
    }
}

impl Deref for SignedUserOperation {
    type Target = UserOperationRequest;

    fn deref(&self) -> &Self::Target {
        &self.user_operation
    }
}

/// Receipt of the user operation (returned from the RPC endpoint eth_getUserOperationReceipt)
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationReceipt {
    #[serde(rename = "userOpHash")]
    pub user_operation_hash: UserOperationHash,
    #[serde(serialize_with = "as_checksum_addr")]
    pub sender: Address,
    pub nonce: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster: Option<Address>,
    pub actual_gas_cost: U256,
    pub actual_gas_used: U256,
    pub success: bool,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub logs: Vec<Log>,
    #[serde(rename = "receipt")]
    pub tx_receipt: TransactionReceipt,
}

/// Struct that is returned from the RPC endpoint eth_getUserOperationByHash
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationByHash {
    pub user_operation: UserOperationRequest,
    #[serde(serialize_with = "as_checksum_addr")]
    pub entry_point: Address,
    pub transaction_hash: H256,
    pub block_hash: H256,
    pub block_number: U64,
}

/// Gas estimations for user operation (returned from the RPC endpoint eth_estimateUserOperationGas)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationGasEstimation {
    pub pre_verification_gas: U256,
    pub verification_gas_limit: U256,
    pub call_gas_limit: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_verification_gas_limit: Option<U256>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn signed_user_operation_is_normalized() {
        let uo = UserOperationRequest::default()
            .sender("0x9c5754De1443984659E1b3a8d1931D83475ba29C".parse().unwrap())
            .signature("0x1234".parse().unwrap());
        let signed = SignedUserOperation::new(
            UserOperationHash::default(),
            EntryPointVersion::V06.address(),
            EntryPointVersion::V06,
            uo,
        );
        assert_eq!(signed.init_code().len(), 0);
        let value = serde_json::to_value(&signed).unwrap();
        assert_eq!(value["userOperation"]["paymasterAndData"], json!("0x"));
        assert_eq!(value["entryPointVersion"], json!("v0.6"));
    }

    #[test]
    fn gas_estimation_without_paymaster_limit() {
        let estimation: UserOperationGasEstimation = serde_json::from_value(json!({
            "preVerificationGas": "0xafc8",
            "verificationGasLimit": "0x186a0",
            "callGasLimit": "0x814c",
        }))
        .unwrap();
        assert_eq!(estimation.call_gas_limit, 33_100.into());
        assert_eq!(estimation.paymaster_verification_gas_limit, None);
    }
}
