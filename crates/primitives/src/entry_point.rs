//! Entry point versions

use crate::constants::entry_point::{ADDRESS_V06, ADDRESS_V07, VERSION_V06, VERSION_V07};
use ethers::types::Address;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

lazy_static! {
    static ref ENTRY_POINT_V06: Address = ADDRESS_V06.parse().expect("valid v0.6 entry point");
    static ref ENTRY_POINT_V07: Address = ADDRESS_V07.parse().expect("valid v0.7 entry point");
}

/// Version of the entry point contract a user operation targets
///
/// The version decides the wire shape of the user operation (`initCode`/`paymasterAndData` for
/// v0.6, `factory`/`paymaster` fields for v0.7) and how it is packed for hashing.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum EntryPointVersion {
    #[default]
    #[strum(to_string = "v0.6", serialize = "0.6", serialize = "0.6.0")]
    #[serde(rename = "v0.6")]
    V06,
    #[strum(to_string = "v0.7", serialize = "0.7", serialize = "0.7.0")]
    #[serde(rename = "v0.7")]
    V07,
}

impl EntryPointVersion {
    /// Canonical deployment address of this entry point version
    pub fn address(&self) -> Address {
        match self {
            Self::V06 => *ENTRY_POINT_V06,
            Self::V07 => *ENTRY_POINT_V07,
        }
    }

    /// Semantic version string
    pub fn semver(&self) -> &'static str {
        match self {
            Self::V06 => VERSION_V06,
            Self::V07 => VERSION_V07,
        }
    }

    /// Resolves the version from a canonical entry point address
    pub fn from_address(address: &Address) -> Option<Self> {
        if *address == *ENTRY_POINT_V06 {
            Some(Self::V06)
        } else if *address == *ENTRY_POINT_V07 {
            Some(Self::V07)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn entry_point_version_roundtrip() {
        assert_eq!(EntryPointVersion::from_str("v0.7").unwrap(), EntryPointVersion::V07);
        assert_eq!(EntryPointVersion::from_str("0.6.0").unwrap(), EntryPointVersion::V06);
        assert_eq!(
            EntryPointVersion::from_address(&EntryPointVersion::V07.address()),
            Some(EntryPointVersion::V07)
        );
        assert_eq!(EntryPointVersion::from_address(&Address::zero()), None);
    }
}
