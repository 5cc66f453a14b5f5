//! Smart account helpers for account abstraction (ERC-4337)
//!
//! Pure functions around the supported smart accounts: counterfactual address prediction, call
//! data encoding, session key permissions and threshold signature aggregation.

pub mod codec;
mod error;
pub mod message;
pub mod multisig;
pub mod permissions;
pub mod predictor;
pub mod session_key;
mod version;

pub use codec::{decode_calls, encode_batch_execute, encode_calls, encode_execute, Call};
pub use error::AccountError;
pub use multisig::{
    aggregate, split_aggregated_signature, AggregateSignature, GasLimits, MultisigProposal,
    PartialSignature, SignatureStatus, SignerType,
};
pub use permissions::{AllowlistInput, HookInputs, Permission, PermissionSet};
pub use predictor::{
    canonicalize_owners, factory_data, predict, predict_from_factory_data, AccountOwners,
};
pub use session_key::{AccessListType, SessionKeyPermissions};
pub use version::{
    AccountDeploymentInfo, AccountVersion, ExecuteLayout, OwnershipKind, ReplaySafeDomain,
};
