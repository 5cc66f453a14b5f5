use alloy_chains::NamedChain;
use corvus_account::Call;
use corvus_primitives::{constants::supported_chains::CHAINS, UserOperationHash};
use dirs::home_dir;
use ethers::types::{Address, Bytes, U256};
use expanded_pathbuf::ExpandedPathBuf;
use pin_utils::pin_mut;
use std::{future::Future, str::FromStr};
use tracing::info;

/// Unwrap path or returns home directory
pub fn unwrap_path_or_home(path: Option<ExpandedPathBuf>) -> eyre::Result<ExpandedPathBuf> {
    if let Some(path) = path {
        Ok(path)
    } else {
        home_dir()
            .map(|h| h.join(".corvus"))
            .ok_or_else(|| eyre::eyre!("Get Home directory error"))
            .map(ExpandedPathBuf)
    }
}

/// Parses address from string
pub fn parse_address(s: &str) -> Result<Address, String> {
    Address::from_str(s).map_err(|_| format!("String {s} is not a valid address"))
}

/// Parses U256 from string
pub fn parse_u256(s: &str) -> Result<U256, String> {
    U256::from_str_radix(s, 10).map_err(|_| format!("String {s} is not a valid U256"))
}

/// Parses hex encoded bytes from string
pub fn parse_bytes(s: &str) -> Result<Bytes, String> {
    Bytes::from_str(s).map_err(|_| format!("String {s} is not valid hex data"))
}

/// Parses user operation hash from string
pub fn parse_user_operation_hash(s: &str) -> Result<UserOperationHash, String> {
    UserOperationHash::from_str(s)
        .map_err(|_| format!("String {s} is not a valid user operation hash"))
}

/// Parses the name of a supported chain
pub fn parse_chain(s: &str) -> Result<NamedChain, String> {
    NamedChain::from_str(s)
        .ok()
        .filter(|chain| CHAINS.contains(chain))
        .ok_or_else(|| format!("Chain {s} is not supported"))
}

/// Parses call from `target[:value[:data]]`, value in wei
pub fn parse_call(s: &str) -> Result<Call, String> {
    let mut parts = s.splitn(3, ':');
    let target = parse_address(parts.next().unwrap_or_default())?;
    let value = match parts.next() {
        Some(value) if !value.is_empty() => parse_u256(value)?,
        _ => U256::zero(),
    };
    let data = match parts.next() {
        Some(data) => parse_bytes(data)?,
        None => Bytes::default(),
    };
    Ok(Call::new(target, value, data))
}

/// Runs the future to completion or until:
/// - `ctrl-c` is received.
/// - `SIGTERM` is received (unix only).
pub async fn run_until_ctrl_c<F, E>(fut: F) -> Result<(), E>
where
    F: Future<Output = Result<(), E>>,
    E: Send + Sync + 'static + From<std::io::Error>,
{
    let ctrl_c = tokio::signal::ctrl_c();

    let mut stream = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let sigterm = stream.recv();
    pin_mut!(sigterm, ctrl_c, fut);

    tokio::select! {
        _ = ctrl_c => {
            info!("Received ctrl-c signal.");
        },
        _ = sigterm => {
            info!("Received SIGTERM signal.");
        },
        res = fut => res?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calls_are_parsed() {
        let target = "0x000000000000000000000000000000000000dEaD";

        let call = parse_call(target).unwrap();
        assert_eq!(call, Call::new(target.parse().unwrap(), U256::zero(), Bytes::default()));

        let call = parse_call(&format!("{target}:1000:0xdeadbeef")).unwrap();
        assert_eq!(call.value, U256::from(1000));
        assert_eq!(call.data, Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]));

        let call = parse_call(&format!("{target}::0x01")).unwrap();
        assert_eq!(call.value, U256::zero());
        assert_eq!(call.data, Bytes::from(vec![1]));

        assert!(parse_call("0x1234").is_err());
        assert!(parse_call(&format!("{target}:0x10")).is_err());
    }

    #[test]
    fn only_supported_chains_are_parsed() {
        assert_eq!(parse_chain("sepolia"), Ok(NamedChain::Sepolia));
        assert_eq!(parse_chain("mainnet"), Ok(NamedChain::Mainnet));
        assert!(parse_chain("goerli").is_err());
        assert!(parse_chain("not-a-chain").is_err());
    }
}
