//! User operation request (optional fields, filled in stage by stage)

use crate::{
    entry_point::EntryPointVersion,
    utils::{
        as_checksum_addr, pack_factory_data, pack_paymaster_data, pack_uint128,
        unpack_factory_data, unpack_paymaster_data,
    },
    UserOperationHash,
};
use ethers::{
    abi::{encode, AbiEncode, Token},
    contract::{EthAbiCodec, EthAbiType},
    types::{Address, Bytes, H256, U256},
    utils::keccak256,
};
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// Deployment data of an account that does not exist on-chain yet
///
/// Entry point v0.6 expects a single `initCode` blob, v0.7 splits it into `factory` and
/// `factoryData`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccountDeployment {
    Factory {
        #[serde(serialize_with = "as_checksum_addr")]
        factory: Address,
        #[serde(rename = "factoryData")]
        factory_data: Bytes,
    },
    InitCode {
        #[serde(rename = "initCode")]
        init_code: Bytes,
    },
}

impl AccountDeployment {
    pub fn from_factory(factory: Address, factory_data: Bytes) -> Self {
        Self::Factory { factory, factory_data }
    }

    /// Concatenated `factory ‖ factoryData`
    pub fn init_code(&self) -> Bytes {
        match self {
            Self::Factory { factory, factory_data } => {
                pack_factory_data(*factory, factory_data).into()
            }
            Self::InitCode { init_code } => init_code.clone(),
        }
    }

    /// Factory address and the raw call data sent to it
    pub fn factory_and_data(&self) -> Option<(Address, Bytes)> {
        match self {
            Self::Factory { factory, factory_data } => Some((*factory, factory_data.clone())),
            Self::InitCode { init_code } if init_code.len() >= 20 => {
                Some(unpack_factory_data(init_code))
            }
            Self::InitCode { .. } => None,
        }
    }

    fn is_empty(&self) -> bool {
        self.factory_and_data().is_none()
    }
}

/// Sponsorship fields of a user operation
///
/// The combined blob and the decomposed fields are mutually exclusive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PaymasterFields {
    Decomposed {
        #[serde(serialize_with = "as_checksum_addr")]
        paymaster: Address,
        #[serde(rename = "paymasterData")]
        paymaster_data: Bytes,
        #[serde(rename = "paymasterVerificationGasLimit")]
        verification_gas_limit: U256,
        #[serde(rename = "paymasterPostOpGasLimit")]
        post_op_gas_limit: U256,
    },
    Combined {
        #[serde(rename = "paymasterAndData")]
        paymaster_and_data: Bytes,
    },
}

impl PaymasterFields {
    /// Paymaster address, if any
    pub fn paymaster(&self) -> Option<Address> {
        match self {
            Self::Decomposed { paymaster, .. } => Some(*paymaster),
            Self::Combined { paymaster_and_data } => crate::get_address(paymaster_and_data),
        }
    }

    /// The `paymasterAndData` blob as the given entry point version packs it
    pub fn paymaster_and_data(&self, version: EntryPointVersion) -> Bytes {
        match (self, version) {
            (Self::Combined { paymaster_and_data }, _) => paymaster_and_data.clone(),
            (Self::Decomposed { paymaster, paymaster_data, .. }, EntryPointVersion::V06) => {
                [paymaster.0.to_vec(), paymaster_data.to_vec()].concat().into()
            }
            (
                Self::Decomposed {
                    paymaster,
                    paymaster_data,
                    verification_gas_limit,
                    post_op_gas_limit,
                },
                EntryPointVersion::V07,
            ) => pack_paymaster_data(
                *paymaster,
                *verification_gas_limit,
                *post_op_gas_limit,
                paymaster_data,
            )
            .into(),
        }
    }

    /// Converts into the wire shape the entry point version expects
    pub fn into_version(self, version: EntryPointVersion) -> Self {
        match version {
            EntryPointVersion::V06 => {
                Self::Combined { paymaster_and_data: self.paymaster_and_data(version) }
            }
            EntryPointVersion::V07 => match self {
                Self::Combined { paymaster_and_data } if paymaster_and_data.len() >= 52 => {
                    let (paymaster, verification_gas_limit, post_op_gas_limit, paymaster_data) =
                        unpack_paymaster_data(&paymaster_and_data);
                    Self::Decomposed {
                        paymaster,
                        paymaster_data,
                        verification_gas_limit,
                        post_op_gas_limit,
                    }
                }
                other => other,
            },
        }
    }

    fn is_empty(&self) -> bool {
        matches!(self, Self::Combined { paymaster_and_data } if paymaster_and_data.is_empty())
    }
}

/// User operation with gas, sponsorship and signature fields being optional
///
/// This is the shape the operation has while it moves through the builder. It serializes to the
/// JSON-RPC shape of the entry point version it was normalized for.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationRequest {
    /// Sender of the user operation
    #[serde(default = "Address::zero", serialize_with = "as_checksum_addr")]
    pub sender: Address,

    /// Nonce (anti replay protection), the upper 192 bits are the nonce key
    #[serde(default)]
    pub nonce: U256,

    /// Deployment data (only present if the account is not deployed yet)
    #[serde(flatten)]
    pub deployment: Option<AccountDeployment>,

    /// The data that is passed to the sender during the main execution call
    #[serde(default)]
    pub call_data: Bytes,

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

    /// Sponsorship data (absent if the account pays for itself)
    #[serde(flatten)]
    pub paymaster: Option<PaymasterFields>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Bytes>,
}

/// User operation without signature (helper for packing v0.6 user operations)
#[derive(EthAbiCodec, EthAbiType)]
struct UserOperationNoSignature {
    pub sender: Address,
    pub nonce: U256,
    pub init_code: H256,
    pub call_data: H256,
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub paymaster_and_data: H256,
}

/// Packed user operation without signature (helper for packing v0.7 user operations)
#[derive(EthAbiCodec, EthAbiType)]
struct PackedUserOperationNoSignature {
    pub sender: Address,
    pub nonce: U256,
    pub init_code: H256,
    pub call_data: H256,
    pub account_gas_limits: H256,
    pub pre_verification_gas: U256,
    pub gas_fees: H256,
    pub paymaster_and_data: H256,
}

impl UserOperationRequest {
    /// Gas and fee fields that are still unset, by their JSON-RPC name
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("callGasLimit", self.call_gas_limit.is_none()),
            ("verificationGasLimit", self.verification_gas_limit.is_none()),
            ("preVerificationGas", self.pre_verification_gas.is_none()),
            ("maxFeePerGas", self.max_fee_per_gas.is_none()),
            ("maxPriorityFeePerGas", self.max_priority_fee_per_gas.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, missing)| missing.then_some(name))
        .collect()
    }

    /// Whether a signature was already attached
    pub fn is_signed(&self) -> bool {
        self.signature.as_ref().is_some_and(|sig| !sig.is_empty())
    }

    /// Init code (`factory ‖ factoryData`), empty if the account is deployed
    pub fn init_code(&self) -> Bytes {
        self.deployment.as_ref().map(AccountDeployment::init_code).unwrap_or_default()
    }

    /// Paymaster address, if the operation is sponsored
    pub fn paymaster_address(&self) -> Option<Address> {
        self.paymaster.as_ref().and_then(PaymasterFields::paymaster)
    }

    /// `paymasterAndData` blob as packed by the given entry point version
    pub fn paymaster_and_data(&self, version: EntryPointVersion) -> Bytes {
        self.paymaster.as_ref().map(|p| p.paymaster_and_data(version)).unwrap_or_default()
    }

    /// Rewrites deployment and sponsorship fields into the shape the entry point version
    /// expects on the wire
    pub fn normalize(mut self, version: EntryPointVersion) -> Self {
        match version {
            EntryPointVersion::V06 => {
                self.deployment = Some(AccountDeployment::InitCode { init_code: self.init_code() });
                self.paymaster = Some(PaymasterFields::Combined {
                    paymaster_and_data: self.paymaster_and_data(version),
                });
            }
            EntryPointVersion::V07 => {
                self.deployment = self
                    .deployment
                    .filter(|d| !d.is_empty())
                    .and_then(|d| d.factory_and_data())
                    .map(|(factory, factory_data)| {
                        AccountDeployment::from_factory(factory, factory_data)
                    });
                self.paymaster = self
                    .paymaster
                    .filter(|p| !p.is_empty())
                    .map(|p| p.into_version(version));
            }
        }
        self
    }

    /// Fingerprint of the identity-relevant fields (sender, nonce, call data)
    pub fn fingerprint(&self) -> H256 {
        H256::from(keccak256(encode(&[
            Token::Address(self.sender),
            Token::Uint(self.nonce),
            Token::FixedBytes(keccak256(self.call_data.deref()).to_vec()),
        ])))
    }

    /// Packs the user operation without signature (used for calculating the hash)
    ///
    /// Unset gas fields are packed as zero.
    pub fn pack_without_signature(&self, version: EntryPointVersion) -> Bytes {
        let init_code: H256 = keccak256(self.init_code().deref()).into();
        let call_data: H256 = keccak256(self.call_data.deref()).into();
        let paymaster_and_data: H256 = keccak256(self.paymaster_and_data(version).deref()).into();

        match version {
            EntryPointVersion::V06 => UserOperationNoSignature {
                sender: self.sender,
                nonce: self.nonce,
                init_code,
                call_data,
                call_gas_limit: self.call_gas_limit.unwrap_or_default(),
                verification_gas_limit: self.verification_gas_limit.unwrap_or_default(),
                pre_verification_gas: self.pre_verification_gas.unwrap_or_default(),
                max_fee_per_gas: self.max_fee_per_gas.unwrap_or_default(),
                max_priority_fee_per_gas: self.max_priority_fee_per_gas.unwrap_or_default(),
                paymaster_and_data,
            }
            .encode()
            .into(),
            EntryPointVersion::V07 => PackedUserOperationNoSignature {
                sender: self.sender,
                nonce: self.nonce,
                init_code,
                call_data,
                account_gas_limits: H256(pack_uint128(
                    self.verification_gas_limit.unwrap_or_default(),
                    self.call_gas_limit.unwrap_or_default(),
                )),
                pre_verification_gas: self.pre_verification_gas.unwrap_or_default(),
                gas_fees: H256(pack_uint128(
                    self.max_priority_fee_per_gas.unwrap_or_default(),
                    self.max_fee_per_gas.unwrap_or_default(),
                )),
                paymaster_and_data,
            }
            .encode()
            .into(),
        }
    }

    /// Calculates the hash of the user operation (what the account signs)
    pub fn hash(
        &self,
        entry_point: &Address,
        chain_id: u64,
        version: EntryPointVersion,
    ) -> UserOperationHash {
        H256::from_slice(
            keccak256(
                [
                    keccak256(self.pack_without_signature(version).deref()).to_vec(),
                    entry_point.encode(),
                    U256::from(chain_id).encode(),
                ]
                .concat(),
            )
            .as_slice(),
        )
        .into()
    }

    // Builder pattern helpers

    /// Sets the sender of the user operation
    pub fn sender(mut self, sender: Address) -> Self {
        self.sender = sender;
        self
    }

    /// Sets the nonce of the user operation
    pub fn nonce(mut self, nonce: U256) -> Self {
        self.nonce = nonce;
        self
    }

    /// Sets the deployment data of the user operation
    pub fn deployment(mut self, deployment: AccountDeployment) -> Self {
        self.deployment = Some(deployment);
        self
    }

    /// Sets the call data of the user operation
    pub fn call_data(mut self, call_data: Bytes) -> Self {
        self.call_data = call_data;
        self
    }

    /// Sets the call gas limit of the user operation
    pub fn call_gas_limit(mut self, call_gas_limit: U256) -> Self {
        self.call_gas_limit = Some(call_gas_limit);
        self
    }

    /// Sets the verification gas limit of the user operation
    pub fn verification_gas_limit(mut self, verification_gas_limit: U256) -> Self {
        self.verification_gas_limit = Some(verification_gas_limit);
        self
    }

    /// Sets the pre-verification gas of the user operation
    pub fn pre_verification_gas(mut self, pre_verification_gas: U256) -> Self {
        self.pre_verification_gas = Some(pre_verification_gas);
        self
    }

    /// Sets the max fee per gas of the user operation
    pub fn max_fee_per_gas(mut self, max_fee_per_gas: U256) -> Self {
        self.max_fee_per_gas = Some(max_fee_per_gas);
        self
    }

    /// Sets the max priority fee per gas of the user operation
    pub fn max_priority_fee_per_gas(mut self, max_priority_fee_per_gas: U256) -> Self {
        self.max_priority_fee_per_gas = Some(max_priority_fee_per_gas);
        self
    }

    /// Sets the sponsorship fields of the user operation
    pub fn paymaster(mut self, paymaster: PaymasterFields) -> Self {
        self.paymaster = Some(paymaster);
        self
    }

    /// Sets the signature of the user operation
    pub fn signature(mut self, signature: Bytes) -> Self {
        self.signature = Some(signature);
        self
    }

    /// Creates random user operation (for testing purposes)
    #[cfg(feature = "test-utils")]
    pub fn random() -> Self {
        UserOperationRequest::default()
            .sender(Address::random())
            .verification_gas_limit(100_000.into())
            .pre_verification_gas(21_000.into())
            .max_priority_fee_per_gas(1_000_000_000.into())
    }
}
