use corvus_rpc::RpcError;
use thiserror::Error;

/// Errors of the sponsorship adapter
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SponsorError {
    /// The sponsor answered without `paymasterAndData` nor `paymaster`
    #[error("sponsor response carries neither paymasterAndData nor paymaster")]
    SponsorDataMissing,
    /// The sponsor answered with partial gas values
    #[error("sponsor response is missing {field}")]
    IncompleteGas { field: &'static str },
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// Non-fatal conditions reported alongside a sponsorship
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SponsorWarning {
    /// An ERC-20 permit was supplied but the sponsor mode can't forward it
    PermitIgnored { mode: &'static str },
}
