//! Call data of the account's `execute` and `executeBatch`

use crate::{
    version::{AccountVersion, ExecuteLayout},
    AccountError,
};
use corvus_contracts::{
    light_account_api::{self, LightAccountAPICalls},
    light_account_batch_with_value_api,
    modular_account_api::{self, ModularAccountAPICalls},
};
use ethers::{
    abi::{AbiDecode, AbiEncode},
    types::{Address, Bytes, U256},
};
use serde::{Deserialize, Serialize};

/// Single call executed by the account
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub target: Address,
    #[serde(default)]
    pub value: U256,
    #[serde(default)]
    pub data: Bytes,
}

impl Call {
    pub fn new(target: Address, value: U256, data: Bytes) -> Self {
        Self { target, value, data }
    }
}

/// Encodes a single call
pub fn encode_execute(version: AccountVersion, target: Address, value: U256, data: Bytes) -> Bytes {
    match version.execute_layout() {
        ExecuteLayout::LightAccountLegacy | ExecuteLayout::LightAccount => {
            light_account_api::ExecuteCall { dest: target, value, func: data }.encode().into()
        }
        ExecuteLayout::ModularAccount => {
            modular_account_api::ExecuteCall { target, value, data }.encode().into()
        }
    }
}

/// Encodes a batch of calls
pub fn encode_batch_execute(version: AccountVersion, calls: &[Call]) -> Bytes {
    let dest = || calls.iter().map(|c| c.target).collect::<Vec<_>>();
    let func = || calls.iter().map(|c| c.data.clone()).collect::<Vec<_>>();
    let with_values = || -> Bytes {
        light_account_batch_with_value_api::ExecuteBatchCall {
            dest: dest(),
            value: calls.iter().map(|c| c.value).collect(),
            func: func(),
        }
        .encode()
        .into()
    };

    match version.execute_layout() {
        ExecuteLayout::LightAccountLegacy if calls.iter().all(|c| c.value.is_zero()) => {
            light_account_api::ExecuteBatchCall { dest: dest(), func: func() }.encode().into()
        }
        ExecuteLayout::LightAccountLegacy | ExecuteLayout::LightAccount => with_values(),
        ExecuteLayout::ModularAccount => modular_account_api::ExecuteBatchCall {
            calls: calls
                .iter()
                .map(|c| modular_account_api::Call {
                    target: c.target,
                    value: c.value,
                    data: c.data.clone(),
                })
                .collect(),
        }
        .encode()
        .into(),
    }
}

/// Encodes the calls the way the account expects them (`execute` for one call, `executeBatch`
/// otherwise)
pub fn encode_calls(version: AccountVersion, calls: &[Call]) -> Bytes {
    match calls {
        [call] => encode_execute(version, call.target, call.value, call.data.clone()),
        _ => encode_batch_execute(version, calls),
    }
}

fn zip_calls(
    dest: Vec<Address>,
    value: Vec<U256>,
    func: Vec<Bytes>,
) -> Result<Vec<Call>, AccountError> {
    if dest.len() != value.len() || dest.len() != func.len() {
        return Err(AccountError::Codec {
            inner: format!(
                "batch length mismatch: {} targets, {} values, {} payloads",
                dest.len(),
                value.len(),
                func.len()
            ),
        });
    }
    Ok(dest
        .into_iter()
        .zip(value)
        .zip(func)
        .map(|((target, value), data)| Call { target, value, data })
        .collect())
}

/// Decodes `execute` or `executeBatch` call data back into calls
pub fn decode_calls(version: AccountVersion, data: &[u8]) -> Result<Vec<Call>, AccountError> {
    let codec = |e: ethers::abi::AbiError| AccountError::Codec { inner: e.to_string() };

    match version.execute_layout() {
        ExecuteLayout::LightAccountLegacy | ExecuteLayout::LightAccount => {
            if let Ok(batch) = light_account_batch_with_value_api::ExecuteBatchCall::decode(data) {
                return zip_calls(batch.dest, batch.value, batch.func);
            }
            match LightAccountAPICalls::decode(data).map_err(codec)? {
                LightAccountAPICalls::Execute(call) => {
                    Ok(vec![Call { target: call.dest, value: call.value, data: call.func }])
                }
                LightAccountAPICalls::ExecuteBatch(batch) => {
                    let value = vec![U256::zero(); batch.dest.len()];
                    zip_calls(batch.dest, value, batch.func)
                }
            }
        }
        ExecuteLayout::ModularAccount => {
            match ModularAccountAPICalls::decode(data).map_err(codec)? {
                ModularAccountAPICalls::Execute(call) => {
                    Ok(vec![Call { target: call.target, value: call.value, data: call.data }])
                }
                ModularAccountAPICalls::ExecuteBatch(batch) => Ok(batch
                    .calls
                    .into_iter()
                    .map(|c| Call { target: c.target, value: c.value, data: c.data })
                    .collect()),
            }
        }
    }
}
