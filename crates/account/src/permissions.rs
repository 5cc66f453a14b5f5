//! Permission sets for modular account session keys
//!
//! A [`PermissionSet`] collects typed capability grants and compiles them into the inputs of the
//! modular account validation hooks (allowlist, native token limit, time range).

use crate::AccountError;
use ethers::{
    abi::{encode, Tokenizable},
    contract::{EthAbiCodec, EthAbiType},
    types::{Address, Bytes, U256},
};
use serde::{Deserialize, Serialize};

/// Capability granted to a session key
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum Permission {
    /// Spend up to `allowance` of the native token
    NativeTokenTransfer { allowance: U256 },
    /// Transfer up to `allowance` of the ERC-20 token at `address`
    Erc20TokenTransfer { address: Address, allowance: U256 },
    /// Spend up to `limit` on gas
    GasLimit { limit: U256 },
    /// Call any function of the contract at `address`
    ContractAccess { address: Address },
    /// Call the given functions of the account itself
    AccountFunctions { functions: Vec<[u8; 4]> },
    /// Call the given functions on any contract
    FunctionsOnAllContracts { functions: Vec<[u8; 4]> },
    /// Call the given functions of the contract at `address`
    FunctionsOnContract { address: Address, functions: Vec<[u8; 4]> },
    /// Unrestricted access
    Root,
}

impl Permission {
    fn kind(&self) -> &'static str {
        match self {
            Self::NativeTokenTransfer { .. } => "native-token-transfer",
            Self::Erc20TokenTransfer { .. } => "erc20-token-transfer",
            Self::GasLimit { .. } => "gas-limit",
            Self::ContractAccess { .. } => "contract-access",
            Self::AccountFunctions { .. } => "account-functions",
            Self::FunctionsOnAllContracts { .. } => "functions-on-all-contracts",
            Self::FunctionsOnContract { .. } => "functions-on-contract",
            Self::Root => "root",
        }
    }

    /// Contract the permission is scoped to (zero address = every contract)
    fn allowlist_target(&self, account: Address) -> Option<Address> {
        match self {
            Self::Erc20TokenTransfer { address, .. } |
            Self::ContractAccess { address } |
            Self::FunctionsOnContract { address, .. } => Some(*address),
            Self::AccountFunctions { .. } => Some(account),
            Self::FunctionsOnAllContracts { .. } => Some(Address::zero()),
            _ => None,
        }
    }
}

/// Allowlist hook entry
#[derive(Clone, Debug, Default, PartialEq, Eq, EthAbiType, EthAbiCodec)]
pub struct AllowlistInput {
    pub target: Address,
    pub has_selector_allowlist: bool,
    pub has_erc20_spend_limit: bool,
    pub erc20_spend_limit: U256,
    pub selectors: Vec<[u8; 4]>,
}

/// Validation hook inputs compiled from a permission set
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HookInputs {
    pub allowlist: Vec<AllowlistInput>,
    pub native_token_limit: Option<U256>,
    pub gas_limit: Option<U256>,
    pub time_range: Option<(u64, u64)>,
    /// Session key may call every function (root)
    pub is_global: bool,
}

impl HookInputs {
    /// ABI encoded allowlist (`AllowlistInput[]`)
    pub fn encode_allowlist(&self) -> Bytes {
        encode(&[self.allowlist.clone().into_token()]).into()
    }
}

/// Set of permissions granted to one session key
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    permissions: Vec<Permission>,
    time_range: Option<(u64, u64)>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }

    /// Adds a permission
    ///
    /// `Root` can't be combined with any other permission, and singleton limits (native token,
    /// gas) or per-contract grants can't be given twice.
    pub fn add(mut self, permission: Permission) -> Result<Self, AccountError> {
        let conflict = |inner: String| Err(AccountError::PermissionConflict { inner });

        if let Some(existing) = self.permissions.first() {
            if matches!(permission, Permission::Root) || matches!(existing, Permission::Root) {
                return conflict(format!(
                    "root permission is exclusive (adding {} to {})",
                    permission.kind(),
                    existing.kind()
                ));
            }
        }

        for existing in &self.permissions {
            let same_kind = existing.kind() == permission.kind();
            let duplicate = match (&permission, existing) {
                (Permission::NativeTokenTransfer { .. }, _) |
                (Permission::GasLimit { .. }, _) |
                (Permission::AccountFunctions { .. }, _) |
                (Permission::FunctionsOnAllContracts { .. }, _) => same_kind,
                (Permission::Erc20TokenTransfer { address, .. }, other) |
                (Permission::ContractAccess { address }, other) |
                (Permission::FunctionsOnContract { address, .. }, other) => {
                    other.allowlist_target(Address::zero()) == Some(*address)
                }
                (Permission::Root, _) => true,
            };
            if duplicate {
                return conflict(format!("{} is already granted", permission.kind()));
            }
        }

        self.permissions.push(permission);
        Ok(self)
    }

    /// Restricts the session key to a validity window
    pub fn time_range(mut self, valid_after: u64, valid_until: u64) -> Self {
        self.time_range = Some((valid_after, valid_until));
        self
    }

    /// Compiles the permissions into validation hook inputs for the given account
    pub fn compile(&self, account: Address) -> HookInputs {
        let mut inputs = HookInputs { time_range: self.time_range, ..Default::default() };

        for permission in &self.permissions {
            match permission {
                Permission::Root => inputs.is_global = true,
                Permission::NativeTokenTransfer { allowance } => {
                    inputs.native_token_limit = Some(*allowance)
                }
                Permission::GasLimit { limit } => inputs.gas_limit = Some(*limit),
                Permission::Erc20TokenTransfer { address, allowance } => {
                    inputs.allowlist.push(AllowlistInput {
                        target: *address,
                        has_selector_allowlist: false,
                        has_erc20_spend_limit: true,
                        erc20_spend_limit: *allowance,
                        selectors: vec![],
                    })
                }
                Permission::ContractAccess { address } => inputs.allowlist.push(AllowlistInput {
                    target: *address,
                    ..Default::default()
                }),
                Permission::AccountFunctions { functions } |
                Permission::FunctionsOnAllContracts { functions } |
                Permission::FunctionsOnContract { functions, .. } => {
                    inputs.allowlist.push(AllowlistInput {
                        target: permission.allowlist_target(account).unwrap_or_default(),
                        has_selector_allowlist: true,
                        selectors: functions.clone(),
                        ..Default::default()
                    })
                }
            }
        }

        inputs
    }
}
