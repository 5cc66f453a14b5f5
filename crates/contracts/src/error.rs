use crate::gen::{EntryPointAPIErrors, FailedOp};
use ethers::{
    abi::AbiDecode,
    providers::{JsonRpcError, Middleware, MiddlewareError, ProviderError},
    types::Bytes,
};
use regex::Regex;
use serde_json::Value;
use std::str::FromStr;
use thiserror::Error;

/// `Error(string)` selector used by `require` and `revert("...")`
const REVERT_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Errors returned while reading from the entry point contract
#[derive(Debug, Error, Clone)]
pub enum EntryPointError {
    /// The entry point rejected the user operation (`AAxx` reason)
    #[error("{0}")]
    FailedOp(FailedOp),

    /// A simulation returned instead of reverting with its result
    #[error("{function} should revert")]
    NoRevert { function: String },

    #[error("provider error: {inner}")]
    Provider { inner: String },

    #[error("abi error: {inner}")]
    Abi { inner: String },

    /// Revert data missing or not an entry point error
    #[error("decode error: {inner}")]
    Decode { inner: String },

    #[error("other error: {inner}")]
    Other { inner: String },
}

impl EntryPointError {
    /// Revert data of a failed `eth_call`
    ///
    /// Nodes either return the data itself or a message embedding it (`"Reverted 0x..."`).
    fn revert_data(err: &JsonRpcError) -> Result<Bytes, Self> {
        let data = match &err.data {
            Some(Value::String(data)) => data,
            Some(other) => {
                return Err(Self::Decode {
                    inner: format!("json-rpc error data is not a string: {other:?}"),
                })
            }
            None => {
                return Err(Self::Provider {
                    inner: format!("json-rpc error without revert data: {err:?}"),
                })
            }
        };

        let re = Regex::new(r"0x[0-9a-fA-F]*").map_err(|e| Self::Other { inner: e.to_string() })?;
        let hex = re
            .find(data)
            .ok_or_else(|| Self::Decode { inner: format!("no hex data in {data:?}") })?;
        Bytes::from_str(hex.as_str())
            .map_err(|e| Self::Decode { inner: format!("invalid hex data {data:?}: {e:?}") })
    }

    pub fn from_json_rpc_error(err: &JsonRpcError) -> Result<EntryPointAPIErrors, Self> {
        decode_revert_error(Self::revert_data(err)?)
    }

    pub fn from_provider_error(err: &ProviderError) -> Result<EntryPointAPIErrors, Self> {
        match err {
            ProviderError::JsonRpcClientError(err) => match err.as_error_response() {
                Some(err) => Self::from_json_rpc_error(err),
                None => Err(Self::Provider { inner: format!("json-rpc client error: {err:?}") }),
            },
            ProviderError::HTTPError(err) => {
                Err(Self::Provider { inner: format!("HTTP error: {err:?}") })
            }
            _ => Err(Self::Provider { inner: format!("{err:?}") }),
        }
    }

    pub fn from_middleware_error<M: Middleware>(
        err: M::Error,
    ) -> Result<EntryPointAPIErrors, Self> {
        if let Some(err) = err.as_error_response() {
            Self::from_json_rpc_error(err)
        } else if let Some(err) = err.as_provider_error() {
            Self::from_provider_error(err)
        } else {
            Err(Self::Provider { inner: format!("middleware error: {err:?}") })
        }
    }
}

/// Reason of a plain `require`/`revert` string
pub fn decode_revert_string(data: &[u8]) -> Option<String> {
    match data.split_first_chunk::<4>() {
        Some((selector, reason)) if *selector == REVERT_STRING_SELECTOR => {
            String::decode(reason).ok()
        }
        _ => None,
    }
}

/// Decodes revert data into one of the entry point's errors
pub fn decode_revert_error(data: Bytes) -> Result<EntryPointAPIErrors, EntryPointError> {
    EntryPointAPIErrors::decode(data.as_ref()).or_else(|err| {
        decode_revert_string(&data).map(EntryPointAPIErrors::RevertString).ok_or_else(|| {
            EntryPointError::Decode { inner: format!("unknown revert data {data}: {err:?}") }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SENDER_ADDRESS_RESULT: &str =
        "0x6ca7b8060000000000000000000000009c5754de1443984659e1b3a8d1931d83475ba29c";

    fn json_rpc_error(data: Option<Value>) -> JsonRpcError {
        JsonRpcError { code: 3, message: "execution reverted".into(), data }
    }

    #[test]
    fn require_reason_is_decoded() {
        let data = Bytes::from_str("0x08c379a00000000000000000000000000000000000000000000000000000000000000020000000000000000000000000000000000000000000000000000000000000001841413934206761732076616c756573206f766572666c6f770000000000000000").unwrap();
        match decode_revert_error(data) {
            Ok(EntryPointAPIErrors::RevertString(s)) => assert_eq!(s, "AA94 gas values overflow"),
            other => panic!("unexpected decoding result: {other:?}"),
        }
    }

    #[test]
    fn failed_op_is_decoded() {
        let data = Bytes::from_str("0x220266b600000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000040000000000000000000000000000000000000000000000000000000000000001e41413430206f76657220766572696669636174696f6e4761734c696d69740000").unwrap();
        match decode_revert_error(data) {
            Ok(EntryPointAPIErrors::FailedOp(op)) => {
                assert_eq!(op.reason, "AA40 over verificationGasLimit")
            }
            other => panic!("unexpected decoding result: {other:?}"),
        }
    }

    #[test]
    fn revert_data_is_found_in_messages() {
        for data in [SENDER_ADDRESS_RESULT.to_string(), format!("Reverted {SENDER_ADDRESS_RESULT}")]
        {
            let err = json_rpc_error(Some(json!(data)));
            match EntryPointError::from_json_rpc_error(&err) {
                Ok(EntryPointAPIErrors::SenderAddressResult(res)) => assert_eq!(
                    res.sender,
                    "0x9c5754De1443984659E1b3a8d1931D83475ba29C".parse().unwrap()
                ),
                other => panic!("unexpected decoding result: {other:?}"),
            }
        }
    }

    #[test]
    fn missing_or_unknown_revert_data() {
        let res = EntryPointError::from_json_rpc_error(&json_rpc_error(None));
        assert!(matches!(res, Err(EntryPointError::Provider { .. })));

        let res = EntryPointError::from_json_rpc_error(&json_rpc_error(Some(json!(42))));
        assert!(matches!(res, Err(EntryPointError::Decode { .. })));

        let res = decode_revert_error(Bytes::from(vec![0xde, 0xad, 0xbe, 0xef, 0x00]));
        assert!(matches!(res, Err(EntryPointError::Decode { .. })));
        assert_eq!(decode_revert_string(&[0x08, 0xc3]), None);
    }
}
