use jsonrpsee::core::ClientError;
use thiserror::Error;

/// Errors returned by the bundler and sponsor clients
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// The endpoint answered with a JSON-RPC error object
    #[error("rpc error {code}: {message}")]
    Call { code: i32, message: String, data: Option<String> },
    /// The request didn't reach the endpoint or the connection failed
    #[error("transport error: {inner}")]
    Transport { inner: String },
    /// The response couldn't be decoded
    #[error("invalid response: {inner}")]
    InvalidResponse { inner: String },
    /// The endpoint answered but a required value is absent
    #[error("{what} missing from response")]
    MissingValue { what: String },
}

impl RpcError {
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Call { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<ClientError> for RpcError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Call(obj) => Self::Call {
                code: obj.code(),
                message: obj.message().to_string(),
                data: obj.data().map(|data| data.get().to_string()),
            },
            ClientError::ParseError(err) => Self::InvalidResponse { inner: err.to_string() },
            err => Self::Transport { inner: err.to_string() },
        }
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse { inner: err.to_string() }
    }
}
