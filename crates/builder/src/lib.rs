//! Account abstraction (ERC-4337) user operation pipeline
//!
//! [`OperationPipeline`] builds user operations for a [`SmartAccount`], prices and sponsors
//! them, signs them with the account's [`AccountSigner`] and submits them to a bundler.
//! [`ConfirmationWaiter`] then polls for the transaction that included the operation.

mod account;
mod error;
mod multisig;
mod pipeline;
mod signer;
mod waiter;

pub use account::{SmartAccount, SmartContractAccount};
pub use error::{
    ConfirmationTimeout, SignerError, Stage, UserOperationError, UserOperationErrorKind,
    UserOperationResult,
};
pub use pipeline::{OperationPipeline, PipelineOptions, UserOperationMiddleware};
pub use signer::{AccountSigner, LocalSigner, SignerStatus};
pub use waiter::{ConfirmationWaiter, RetryPolicy};
