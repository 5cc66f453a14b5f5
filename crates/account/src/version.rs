//! Smart account versions and their canonical deployments

use corvus_primitives::{
    constants::{accounts::*, signature::DUMMY_ECDSA_SIGNATURE},
    EntryPointVersion,
};
use ethers::types::{Address, Bytes};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, str::FromStr};
use strum_macros::{Display, EnumIter, EnumString};

/// Smart account implementation and version
///
/// The version selects the factory, the call data encoding, the hashing scheme of signed
/// messages and the entry point the account validates against.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
pub enum AccountVersion {
    #[strum(to_string = "light-account-v1.0.1")]
    #[serde(rename = "light-account-v1.0.1")]
    LightAccountV1_0_1,
    #[strum(to_string = "light-account-v1.0.2")]
    #[serde(rename = "light-account-v1.0.2")]
    LightAccountV1_0_2,
    #[strum(to_string = "light-account-v1.1.0")]
    #[serde(rename = "light-account-v1.1.0")]
    LightAccountV1_1_0,
    #[strum(to_string = "light-account-v2.0.0")]
    #[serde(rename = "light-account-v2.0.0")]
    LightAccountV2_0_0,
    #[strum(to_string = "multi-owner-light-account-v2.0.0")]
    #[serde(rename = "multi-owner-light-account-v2.0.0")]
    MultiOwnerLightAccountV2_0_0,
    #[strum(to_string = "multi-owner-modular-account-v1.0.0")]
    #[serde(rename = "multi-owner-modular-account-v1.0.0")]
    MultiOwnerModularAccountV1_0_0,
    #[strum(to_string = "multisig-modular-account-v1.0.0")]
    #[serde(rename = "multisig-modular-account-v1.0.0")]
    MultisigModularAccountV1_0_0,
}

/// How the owners of an account are configured
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OwnershipKind {
    /// Exactly one owner
    Single,
    /// Any of the owners can sign
    Multi,
    /// `threshold` out of the owners must sign
    Threshold,
}

/// Call data layout of the account's `execute`/`executeBatch`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecuteLayout {
    /// `executeBatch(address[],bytes[])` for value-less batches, values otherwise
    LightAccountLegacy,
    /// `executeBatch(address[],uint256[],bytes[])`
    LightAccount,
    /// `executeBatch((address,uint256,bytes)[])`
    ModularAccount,
}

/// Parameters of the EIP-712 wrapper used for replay-safe message signing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplaySafeDomain {
    pub name: &'static str,
    pub version: &'static str,
    pub message_type: &'static str,
}

/// Canonical deployment of an account version
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccountDeploymentInfo {
    pub factory: Address,
    pub implementation: Address,
}

fn parse(addr: &str) -> Address {
    Address::from_str(addr).unwrap_or_default()
}

lazy_static! {
    static ref DEPLOYMENTS: HashMap<AccountVersion, AccountDeploymentInfo> = HashMap::from([
        (
            AccountVersion::LightAccountV1_0_1,
            AccountDeploymentInfo {
                factory: parse(LIGHT_ACCOUNT_V1_0_1_FACTORY),
                implementation: parse(LIGHT_ACCOUNT_V1_0_1_IMPLEMENTATION),
            }
        ),
        (
            AccountVersion::LightAccountV1_0_2,
            AccountDeploymentInfo {
                factory: parse(LIGHT_ACCOUNT_V1_0_2_FACTORY),
                implementation: parse(LIGHT_ACCOUNT_V1_0_2_IMPLEMENTATION),
            }
        ),
        (
            AccountVersion::LightAccountV1_1_0,
            AccountDeploymentInfo {
                factory: parse(LIGHT_ACCOUNT_V1_1_0_FACTORY),
                implementation: parse(LIGHT_ACCOUNT_V1_1_0_IMPLEMENTATION),
            }
        ),
        (
            AccountVersion::LightAccountV2_0_0,
            AccountDeploymentInfo {
                factory: parse(LIGHT_ACCOUNT_V2_0_0_FACTORY),
                implementation: parse(LIGHT_ACCOUNT_V2_0_0_IMPLEMENTATION),
            }
        ),
        (
            AccountVersion::MultiOwnerLightAccountV2_0_0,
            AccountDeploymentInfo {
                factory: parse(MULTI_OWNER_LIGHT_ACCOUNT_V2_0_0_FACTORY),
                implementation: parse(MULTI_OWNER_LIGHT_ACCOUNT_V2_0_0_IMPLEMENTATION),
            }
        ),
        (
            AccountVersion::MultiOwnerModularAccountV1_0_0,
            AccountDeploymentInfo {
                factory: parse(MULTI_OWNER_MODULAR_ACCOUNT_FACTORY),
                implementation: parse(MODULAR_ACCOUNT_IMPLEMENTATION),
            }
        ),
        (
            AccountVersion::MultisigModularAccountV1_0_0,
            AccountDeploymentInfo {
                factory: parse(MULTISIG_MODULAR_ACCOUNT_FACTORY),
                implementation: parse(MODULAR_ACCOUNT_IMPLEMENTATION),
            }
        ),
    ]);
}

impl AccountVersion {
    /// Canonical factory and implementation addresses
    pub fn deployment(&self) -> AccountDeploymentInfo {
        DEPLOYMENTS.get(self).copied().unwrap_or(AccountDeploymentInfo {
            factory: Address::zero(),
            implementation: Address::zero(),
        })
    }

    pub fn default_factory(&self) -> Address {
        self.deployment().factory
    }

    pub fn implementation(&self) -> Address {
        self.deployment().implementation
    }

    pub fn ownership(&self) -> OwnershipKind {
        match self {
            Self::LightAccountV1_0_1 |
            Self::LightAccountV1_0_2 |
            Self::LightAccountV1_1_0 |
            Self::LightAccountV2_0_0 => OwnershipKind::Single,
            Self::MultiOwnerLightAccountV2_0_0 | Self::MultiOwnerModularAccountV1_0_0 => {
                OwnershipKind::Multi
            }
            Self::MultisigModularAccountV1_0_0 => OwnershipKind::Threshold,
        }
    }

    pub fn execute_layout(&self) -> ExecuteLayout {
        match self {
            Self::LightAccountV1_0_1 | Self::LightAccountV1_0_2 => {
                ExecuteLayout::LightAccountLegacy
            }
            Self::LightAccountV1_1_0 |
            Self::LightAccountV2_0_0 |
            Self::MultiOwnerLightAccountV2_0_0 => ExecuteLayout::LightAccount,
            Self::MultiOwnerModularAccountV1_0_0 | Self::MultisigModularAccountV1_0_0 => {
                ExecuteLayout::ModularAccount
            }
        }
    }

    /// Entry point the account validates user operations against
    pub fn entry_point_version(&self) -> EntryPointVersion {
        match self {
            Self::LightAccountV2_0_0 | Self::MultiOwnerLightAccountV2_0_0 => EntryPointVersion::V07,
            _ => EntryPointVersion::V06,
        }
    }

    /// Legacy versions neither take a salt into account nor sign messages replay-safely
    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::LightAccountV1_0_1 | Self::LightAccountV1_0_2)
    }

    /// Whether the version binds signed messages and the account address to the chain
    pub fn is_replay_safe(&self) -> bool {
        self.replay_safe_domain().is_some()
    }

    /// EIP-712 domain used to wrap signed messages, `None` for legacy versions
    pub fn replay_safe_domain(&self) -> Option<ReplaySafeDomain> {
        match self {
            Self::LightAccountV1_0_1 | Self::LightAccountV1_0_2 => None,
            Self::LightAccountV1_1_0 => Some(ReplaySafeDomain {
                name: "LightAccount",
                version: "1",
                message_type: "LightAccountMessage(bytes message)",
            }),
            Self::LightAccountV2_0_0 => Some(ReplaySafeDomain {
                name: "LightAccount",
                version: "2",
                message_type: "LightAccountMessage(bytes message)",
            }),
            Self::MultiOwnerLightAccountV2_0_0 => Some(ReplaySafeDomain {
                name: "MultiOwnerLightAccount",
                version: "2",
                message_type: "LightAccountMessage(bytes message)",
            }),
            Self::MultiOwnerModularAccountV1_0_0 => Some(ReplaySafeDomain {
                name: "Multi Owner Plugin",
                version: "1.0.0",
                message_type: "AlchemyModularAccountMessage(bytes message)",
            }),
            Self::MultisigModularAccountV1_0_0 => Some(ReplaySafeDomain {
                name: "Multisig Plugin",
                version: "1.0.0",
                message_type: "AlchemyMultisigMessage(bytes message)",
            }),
        }
    }

    /// Signature used in place of the real one while estimating gas
    ///
    /// v2 light accounts prefix signatures with the signature type (`0x00` for EOA owners).
    pub fn dummy_signature(&self) -> Bytes {
        let ecdsa = Bytes::from_str(DUMMY_ECDSA_SIGNATURE).unwrap_or_default();
        match self {
            Self::LightAccountV2_0_0 | Self::MultiOwnerLightAccountV2_0_0 => {
                [vec![0u8], ecdsa.to_vec()].concat().into()
            }
            _ => ecdsa,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn versions_parse_from_display() {
        for version in AccountVersion::iter() {
            assert_eq!(AccountVersion::from_str(&version.to_string()).unwrap(), version);
            assert!(!version.default_factory().is_zero(), "{version} has no factory");
            assert!(!version.implementation().is_zero(), "{version} has no implementation");
        }
        assert_eq!(
            AccountVersion::from_str("multisig-modular-account-v1.0.0").unwrap(),
            AccountVersion::MultisigModularAccountV1_0_0
        );
    }

    #[test]
    fn legacy_versions_have_no_replay_safe_domain() {
        assert!(AccountVersion::LightAccountV1_0_2.replay_safe_domain().is_none());
        assert!(AccountVersion::LightAccountV1_1_0.replay_safe_domain().is_some());
        assert!(!AccountVersion::LightAccountV1_0_1.is_replay_safe());
        assert!(AccountVersion::MultisigModularAccountV1_0_0.is_replay_safe());
    }

    #[test]
    fn dummy_signature_length() {
        assert_eq!(AccountVersion::LightAccountV1_1_0.dummy_signature().len(), 65);
        assert_eq!(AccountVersion::LightAccountV2_0_0.dummy_signature().len(), 66);
    }
}
