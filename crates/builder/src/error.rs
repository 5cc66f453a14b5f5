use corvus_account::AccountError;
use corvus_contracts::EntryPointError;
use corvus_paymaster::SponsorError;
use corvus_primitives::UserOperationHash;
use corvus_rpc::RpcError;
use ethers::types::{Address, U256};
use strum_macros::Display;
use thiserror::Error;

pub type UserOperationResult<T> = Result<T, UserOperationError>;

/// Stage of the user operation pipeline
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Stage {
    /// Sender, nonce, deployment data and call data
    Building,
    /// Fees and gas limits
    Estimating,
    /// Paymaster data
    Sponsoring,
    Signing,
    /// Signed, ready to be submitted
    Sealed,
    Submitted,
}

/// User operation pipeline error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("user operation of {sender:?} (nonce {nonce}) failed while {stage}: {kind}")]
pub struct UserOperationError {
    pub sender: Address,
    pub nonce: U256,
    /// Stage the pipeline was in
    pub stage: Stage,
    pub kind: UserOperationErrorKind,
}

/// User operation pipeline error kind
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UserOperationErrorKind {
    /// No smart account is attached to the pipeline, or its signer is disconnected
    #[error("account not connected")]
    AccountNotConnected,
    /// The operation already carries a signature and can't go through the pipeline again
    #[error("user operation is already signed")]
    AlreadySealed,
    /// The sealed operation was already handed to the bundler
    #[error("user operation {hash} was already submitted")]
    AlreadySubmitted { hash: UserOperationHash },
    /// Gas or fee fields are still unset after every stage ran
    #[error("user operation is incomplete, missing {}", fields.join(", "))]
    IncompleteOperation { fields: Vec<String> },
    #[error(transparent)]
    Sponsor(#[from] SponsorError),
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error(transparent)]
    Signer(#[from] SignerError),
    #[error(transparent)]
    Confirmation(#[from] ConfirmationTimeout),
    /// Chain read (entry point or account contract) failed
    #[error("contract error: {inner}")]
    Contract { inner: String },
    #[error("{inner}")]
    Other { inner: String },
}

impl From<EntryPointError> for UserOperationErrorKind {
    fn from(err: EntryPointError) -> Self {
        Self::Contract { inner: err.to_string() }
    }
}

/// Signer error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignerError {
    #[error("wallet error: {inner}")]
    Wallet { inner: String },
    #[error("signer is disconnected")]
    Disconnected,
    #[error("{operation} is not supported by the signer")]
    Unsupported { operation: String },
}

/// No receipt was found for the user operation within the retry budget
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("user operation {hash} not mined after {attempts} attempts")]
pub struct ConfirmationTimeout {
    pub hash: UserOperationHash,
    pub attempts: u32,
    /// Last lookup error, if the last attempt failed
    pub last_error: Option<String>,
}
