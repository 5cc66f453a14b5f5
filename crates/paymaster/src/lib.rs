//! Sponsorship (paymaster) adapter for account abstraction (ERC-4337) user operations
//!
//! Supports ERC-7677 paymaster services and gas manager policies, which return gas limits and
//! fees together with the sponsorship.

mod adapter;
mod error;
mod fees;
mod mode;
mod sponsorship;

pub use adapter::{SponsorOptions, SponsorshipAdapter};
pub use error::{SponsorError, SponsorWarning};
pub use fees::{estimate_network_fees, FeeEstimate};
pub use mode::{Erc20Payment, SponsorMode};
pub use sponsorship::{SponsoredGas, Sponsorship, SponsorshipData, SponsorshipKind};
