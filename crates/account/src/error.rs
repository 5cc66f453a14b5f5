use crate::AccountVersion;
use ethers::types::Address;
use thiserror::Error;

/// Errors of the pure account helpers (prediction, encoding, aggregation)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountError {
    /// Factory is not the canonical factory of the version, the address has to be resolved
    /// on-chain
    #[error("address can't be predicted for factory {factory:?} ({version})")]
    AddressPredictionUnavailable { factory: Address, version: AccountVersion },

    /// Owner set doesn't fit the account version
    #[error("invalid owners: {inner}")]
    InvalidOwners { inner: String },

    /// Permission can't be combined with the permissions already in the set
    #[error("permission conflict: {inner}")]
    PermissionConflict { inner: String },

    /// Signature of an address that doesn't own the account
    #[error("{signer:?} is not an owner of the account")]
    NotAnOwner { signer: Address },

    /// Fewer distinct signers than the threshold
    #[error("threshold not met: {signers} of {threshold} signatures")]
    ThresholdNotMet { signers: usize, threshold: usize },

    /// Operation is not supported by the account version
    #[error("{operation} is not supported by {version}")]
    UnsupportedOperation { operation: String, version: AccountVersion },

    /// Call data (or signature) can't be encoded or decoded
    #[error("codec error: {inner}")]
    Codec { inner: String },
}
