//! Account abstraction (ERC-4337) smart contract interfaces
//!
//! Bindings for the entry point, the account factories, the account execute interfaces and the
//! session key permission updates interface.

pub mod entry_point;
mod error;
mod gen;

pub use entry_point::EntryPoint;
pub use error::{decode_revert_error, decode_revert_string, EntryPointError};
pub use gen::{
    entry_point_api, light_account_api, light_account_batch_with_value_api,
    light_account_factory_api, modular_account_api, multi_owner_light_account_factory_api,
    multi_owner_modular_account_factory_api, multisig_modular_account_factory_api,
    session_key_permissions_updates_api, FailedOp,
};
