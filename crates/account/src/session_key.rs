//! Session key permission updates
//!
//! The session key plugin takes a list of independent `ISessionKeyPermissionsUpdates` calls
//! per session key. [`SessionKeyPermissions`] collects the facets to change and encodes them in
//! the order the plugin applies them.

use corvus_contracts::session_key_permissions_updates_api::{
    SetAccessListTypeCall, SetERC20SpendLimitCall, SetGasSpendLimitCall,
    SetNativeTokenSpendLimitCall, SetRequiredPaymasterCall, UpdateAccessListAddressEntryCall,
    UpdateAccessListFunctionEntryCall, UpdateTimeRangeCall,
};
use ethers::{
    abi::AbiEncode,
    types::{Address, Bytes, U256},
};
use serde::{Deserialize, Serialize};

/// How the session key's contract access list is interpreted
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum AccessListType {
    AllowList = 0,
    DenyList = 1,
    AllowAll = 2,
}

/// Spend limit refreshed every `refresh_interval` seconds (0 = never refreshed)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendLimit {
    pub limit: U256,
    pub refresh_interval: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressEntry {
    pub contract: Address,
    pub is_on_list: bool,
    pub check_selectors: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionEntry {
    pub contract: Address,
    pub selector: [u8; 4],
    pub is_on_list: bool,
}

/// Validity window of the session key (unix timestamps, 0 = unbounded)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub valid_after: u64,
    pub valid_until: u64,
}

/// Permission changes for a session key
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionKeyPermissions {
    access_list_type: Option<AccessListType>,
    address_entries: Vec<AddressEntry>,
    function_entries: Vec<FunctionEntry>,
    time_range: Option<TimeRange>,
    native_token_spend_limit: Option<SpendLimit>,
    gas_spend_limit: Option<SpendLimit>,
    required_paymaster: Option<Address>,
    erc20_spend_limits: Vec<(Address, SpendLimit)>,
}

impl SessionKeyPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn access_list_type(mut self, access_list_type: AccessListType) -> Self {
        self.access_list_type = Some(access_list_type);
        self
    }

    pub fn address_entry(
        mut self,
        contract: Address,
        is_on_list: bool,
        check_selectors: bool,
    ) -> Self {
        self.address_entries.push(AddressEntry { contract, is_on_list, check_selectors });
        self
    }

    pub fn function_entry(
        mut self,
        contract: Address,
        selector: [u8; 4],
        is_on_list: bool,
    ) -> Self {
        self.function_entries.push(FunctionEntry { contract, selector, is_on_list });
        self
    }

    pub fn time_range(mut self, valid_after: u64, valid_until: u64) -> Self {
        self.time_range = Some(TimeRange { valid_after, valid_until });
        self
    }

    pub fn native_token_spend_limit(mut self, limit: U256, refresh_interval: u64) -> Self {
        self.native_token_spend_limit = Some(SpendLimit { limit, refresh_interval });
        self
    }

    pub fn gas_spend_limit(mut self, limit: U256, refresh_interval: u64) -> Self {
        self.gas_spend_limit = Some(SpendLimit { limit, refresh_interval });
        self
    }

    /// Requires every user operation of the session key to be sponsored by `paymaster`
    /// (zero address removes the requirement)
    pub fn required_paymaster(mut self, paymaster: Address) -> Self {
        self.required_paymaster = Some(paymaster);
        self
    }

    pub fn erc20_spend_limit(mut self, token: Address, limit: U256, refresh_interval: u64) -> Self {
        self.erc20_spend_limits.push((token, SpendLimit { limit, refresh_interval }));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.encode().is_empty()
    }

    /// Encoded permission update calls (unset facets are omitted)
    pub fn encode(&self) -> Vec<Bytes> {
        let mut updates: Vec<Vec<u8>> = vec![];

        if let Some(access_list_type) = self.access_list_type {
            updates.push(
                SetAccessListTypeCall { contract_access_control_type: access_list_type as u8 }
                    .encode(),
            );
        }

        updates.extend(self.address_entries.iter().map(|entry| {
            UpdateAccessListAddressEntryCall {
                contract_address: entry.contract,
                is_on_list: entry.is_on_list,
                check_selectors: entry.check_selectors,
            }
            .encode()
        }));

        updates.extend(self.function_entries.iter().map(|entry| {
            UpdateAccessListFunctionEntryCall {
                contract_address: entry.contract,
                selector: entry.selector,
                is_on_list: entry.is_on_list,
            }
            .encode()
        }));

        if let Some(range) = self.time_range {
            updates.push(
                UpdateTimeRangeCall {
                    valid_after: range.valid_after,
                    valid_until: range.valid_until,
                }
                .encode(),
            );
        }

        if let Some(limit) = self.native_token_spend_limit {
            updates.push(
                SetNativeTokenSpendLimitCall {
                    eth_spend_limit: limit.limit,
                    refresh_interval: limit.refresh_interval,
                }
                .encode(),
            );
        }

        if let Some(limit) = self.gas_spend_limit {
            updates.push(
                SetGasSpendLimitCall {
                    gas_spend_limit: limit.limit,
                    refresh_interval: limit.refresh_interval,
                }
                .encode(),
            );
        }

        if let Some(paymaster) = self.required_paymaster {
            updates.push(SetRequiredPaymasterCall { required_paymaster: paymaster }.encode());
        }

        updates.extend(self.erc20_spend_limits.iter().map(|(token, limit)| {
            SetERC20SpendLimitCall {
                token: *token,
                spend_limit: limit.limit,
                refresh_interval: limit.refresh_interval,
            }
            .encode()
        }));

        updates.into_iter().map(Bytes::from).collect()
    }
}
