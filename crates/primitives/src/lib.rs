//! Account abstraction (ERC-4337) primitive types
//!
//! This crate contains the user operation types shared by the account, sponsorship and builder
//! crates, together with packing and hashing helpers for entry point v0.6 and v0.7.

pub mod constants;
pub mod entry_point;
mod user_operation;
mod utils;

pub use entry_point::EntryPointVersion;
pub use user_operation::{
    AccountDeployment, PaymasterFields, SignedUserOperation, UserOperationByHash,
    UserOperationGasEstimation, UserOperationHash, UserOperationOverrides, UserOperationReceipt,
    UserOperationRequest, ValueOverride,
};
pub use utils::{
    as_checksum_addr, chain_id_hex, get_address, pack_factory_data, pack_paymaster_data,
    pack_uint128, unpack_factory_data, unpack_paymaster_data, unpack_uint128,
};
