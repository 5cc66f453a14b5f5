//! Replay-safe message hashing (ERC-1271)
//!
//! Accounts from v1.1.0 on verify signed messages against an EIP-712 wrapper that binds the
//! message to the chain and the account address, so a signature can't be replayed on another
//! chain or by another account of the same owner.

use crate::{AccountError, AccountVersion};
use ethers::{
    abi::{encode, Token},
    types::{transaction::eip712::EIP712Domain, Address, H256, U256},
    utils::{hash_message, keccak256},
};

/// Hash the owner signs for a personal message
pub fn replay_safe_message_hash(
    version: AccountVersion,
    account: Address,
    chain_id: u64,
    message: &[u8],
) -> Result<H256, AccountError> {
    replay_safe_hash(version, account, chain_id, hash_message(message))
}

/// Wraps an arbitrary hash in the account's EIP-712 message type
pub fn replay_safe_hash(
    version: AccountVersion,
    account: Address,
    chain_id: u64,
    hash: H256,
) -> Result<H256, AccountError> {
    let domain = version.replay_safe_domain().ok_or_else(|| {
        AccountError::UnsupportedOperation { operation: "replay-safe signing".into(), version }
    })?;

    let separator = EIP712Domain {
        name: Some(domain.name.into()),
        version: Some(domain.version.into()),
        chain_id: Some(U256::from(chain_id)),
        verifying_contract: Some(account),
        salt: None,
    }
    .separator();

    // message = abi.encode(hash)
    let struct_hash = keccak256(encode(&[
        Token::FixedBytes(keccak256(domain.message_type).to_vec()),
        Token::FixedBytes(keccak256(hash.as_bytes()).to_vec()),
    ]));

    let digest = keccak256([&[0x19, 0x01][..], &separator[..], &struct_hash[..]].concat());
    Ok(H256::from(digest))
}
