//! Threshold signature aggregation for multisig modular accounts
//!
//! Layout of an aggregated signature:
//!
//! ```text
//! upperLimitPvg ‖ upperLimitMaxFeePerGas ‖ upperLimitMaxPriorityFeePerGas (32 bytes each)
//! ‖ slot_0 ‖ … ‖ slot_n-1 (65 bytes each, sorted by signer)
//! ‖ dynamic tail (contract signatures, length prefixed)
//! ```
//!
//! EOA slots are `r ‖ s ‖ v`, contract slots are `owner ‖ offset ‖ 0` where the offset points
//! into the dynamic tail and is relative to the first slot.

use crate::{predictor::canonicalize_owners, AccountError};
use corvus_primitives::{
    constants::signature::{DUMMY_ECDSA_SIGNATURE, ECDSA_SIGNATURE_LENGTH},
    UserOperationRequest,
};
use ethers::{
    abi::AbiEncode,
    types::{Address, Bytes, RecoveryMessage, Signature, H256, U256},
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, str::FromStr};

const GAS_LIMITS_LENGTH: usize = 96;
const EOA_V_OFFSET: u8 = 32;

/// Gas values the signers agreed on
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasLimits {
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

impl GasLimits {
    /// Gas values of the user operation (unset fields are zero)
    pub fn from_user_operation(uo: &UserOperationRequest) -> Self {
        Self {
            pre_verification_gas: uo.pre_verification_gas.unwrap_or_default(),
            max_fee_per_gas: uo.max_fee_per_gas.unwrap_or_default(),
            max_priority_fee_per_gas: uo.max_priority_fee_per_gas.unwrap_or_default(),
        }
    }

    fn encode(&self) -> Vec<u8> {
        [
            self.pre_verification_gas.encode(),
            self.max_fee_per_gas.encode(),
            self.max_priority_fee_per_gas.encode(),
        ]
        .concat()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignerType {
    Eoa,
    Contract,
}

/// Signature of a single owner
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialSignature {
    pub signer: Address,
    pub signer_type: SignerType,
    pub signature: Bytes,
}

impl PartialSignature {
    pub fn eoa(signer: Address, signature: Bytes) -> Self {
        Self { signer, signer_type: SignerType::Eoa, signature }
    }

    pub fn contract(signer: Address, signature: Bytes) -> Self {
        Self { signer, signer_type: SignerType::Contract, signature }
    }
}

/// Whether the aggregate can be submitted
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureStatus {
    /// Fewer signers than the threshold
    Proposed,
    /// Threshold reached
    Actual,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregateSignature {
    pub signature: Bytes,
    pub status: SignatureStatus,
    pub signers: Vec<Address>,
}

/// Aggregates partial signatures of `owners` into the multisig signature layout
///
/// Partials are deduplicated by signer (first one wins) and ordered by signer address. If the
/// actual gas values differ from the upper limits the signers agreed on, EOA `v` values are
/// shifted by 32 so the plugin verifies them against the upper limits.
pub fn aggregate(
    partials: &[PartialSignature],
    threshold: usize,
    owners: &[Address],
    upper_limits: GasLimits,
    actual: GasLimits,
) -> Result<AggregateSignature, AccountError> {
    let mut by_signer: BTreeMap<Address, &PartialSignature> = BTreeMap::new();
    for partial in partials {
        if !owners.contains(&partial.signer) {
            return Err(AccountError::NotAnOwner { signer: partial.signer });
        }
        if partial.signer_type == SignerType::Eoa &&
            partial.signature.len() != ECDSA_SIGNATURE_LENGTH
        {
            return Err(AccountError::Codec {
                inner: format!(
                    "signature of {:?} has {} bytes, expected {ECDSA_SIGNATURE_LENGTH}",
                    partial.signer,
                    partial.signature.len()
                ),
            });
        }
        by_signer.entry(partial.signer).or_insert(partial);
    }

    let shift_v = upper_limits != actual;
    let mut slots: Vec<u8> = Vec::with_capacity(by_signer.len() * ECDSA_SIGNATURE_LENGTH);
    let mut tail: Vec<u8> = vec![];
    let tail_start = by_signer.len() * ECDSA_SIGNATURE_LENGTH;

    for partial in by_signer.values() {
        match partial.signer_type {
            SignerType::Eoa => {
                let mut slot = partial.signature.to_vec();
                if shift_v {
                    slot[64] = slot[64].wrapping_add(EOA_V_OFFSET);
                }
                slots.extend(slot);
            }
            SignerType::Contract => {
                let offset = U256::from(tail_start + tail.len());
                slots.extend(partial.signer.encode());
                slots.extend(offset.encode());
                slots.push(0);
                tail.extend(U256::from(partial.signature.len()).encode());
                tail.extend(partial.signature.iter());
            }
        }
    }

    let signers: Vec<Address> = by_signer.keys().copied().collect();
    let status = if signers.len() >= threshold {
        SignatureStatus::Actual
    } else {
        SignatureStatus::Proposed
    };

    Ok(AggregateSignature {
        signature: [upper_limits.encode(), slots, tail].concat().into(),
        status,
        signers,
    })
}

fn read_word(buf: &[u8], at: usize) -> Result<U256, AccountError> {
    at.checked_add(32)
        .and_then(|end| buf.get(at..end))
        .map(U256::from_big_endian)
        .ok_or_else(|| AccountError::Codec {
            inner: format!("signature too short to read word at {at}"),
        })
}

/// Word read as an offset or a length into `buf`, which it can't exceed
fn read_len(buf: &[u8], at: usize) -> Result<usize, AccountError> {
    let word = read_word(buf, at)?;
    if word > U256::from(buf.len()) {
        return Err(AccountError::Codec {
            inner: format!("offset or length {word} at {at} exceeds {} bytes", buf.len()),
        });
    }
    Ok(word.as_usize())
}

/// Splits an aggregated signature into the upper limits and the partial signatures
///
/// EOA signers are recovered from `digest` (the hash every owner signed as an EIP-191
/// message), `v` values are returned unshifted.
pub fn split_aggregated_signature(
    signature: &[u8],
    digest: H256,
) -> Result<(GasLimits, Vec<PartialSignature>), AccountError> {
    let upper_limits = GasLimits {
        pre_verification_gas: read_word(signature, 0)?,
        max_fee_per_gas: read_word(signature, 32)?,
        max_priority_fee_per_gas: read_word(signature, 64)?,
    };

    let body = &signature[GAS_LIMITS_LENGTH..];
    let mut partials = vec![];
    let mut slots_end = body.len();
    let mut pos = 0;

    while pos + ECDSA_SIGNATURE_LENGTH <= slots_end {
        let slot = &body[pos..pos + ECDSA_SIGNATURE_LENGTH];
        let v = slot[64];
        if v == 0 {
            let signer = Address::from_slice(&slot[12..32]);
            let offset = read_len(body, pos + 32)?;
            let length = read_len(body, offset)?;
            let data = (offset + 32)
                .checked_add(length)
                .and_then(|end| body.get(offset + 32..end))
                .ok_or_else(|| AccountError::Codec {
                    inner: format!("contract signature of {signer:?} out of bounds"),
                })?;
            slots_end = slots_end.min(offset);
            partials.push(PartialSignature::contract(signer, data.to_vec().into()));
        } else {
            let mut eoa = slot.to_vec();
            if v > 30 {
                eoa[64] = v - EOA_V_OFFSET;
            }
            let signer = recover_signer(&eoa, digest)?;
            partials.push(PartialSignature::eoa(signer, eoa.into()));
        }
        pos += ECDSA_SIGNATURE_LENGTH;
    }

    Ok((upper_limits, partials))
}

fn recover_signer(signature: &[u8], digest: H256) -> Result<Address, AccountError> {
    Signature::try_from(signature)
        .and_then(|sig| sig.recover(RecoveryMessage::Data(digest.as_bytes().to_vec())))
        .map_err(|e| AccountError::Codec { inner: e.to_string() })
}

/// Signature used while estimating gas: zero upper limits followed by `threshold` dummy slots
pub fn dummy_signature(threshold: usize) -> Bytes {
    let dummy = Bytes::from_str(DUMMY_ECDSA_SIGNATURE).unwrap_or_default();
    let slots = (0..threshold).flat_map(|_| dummy.to_vec()).collect::<Vec<u8>>();
    [vec![0u8; GAS_LIMITS_LENGTH], slots].concat().into()
}

/// User operation waiting for co-signers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultisigProposal {
    pub user_operation: UserOperationRequest,
    pub upper_limits: GasLimits,
    pub threshold: usize,
    /// Owners of the account, the only accepted signers
    pub owners: Vec<Address>,
    pub partials: Vec<PartialSignature>,
}

impl MultisigProposal {
    /// Proposes the user operation with the proposer's signature
    ///
    /// The gas values of the user operation become the upper limits every co-signer agrees on.
    pub fn propose(
        user_operation: UserOperationRequest,
        threshold: usize,
        owners: &[Address],
        proposer: PartialSignature,
    ) -> Result<Self, AccountError> {
        let upper_limits = GasLimits::from_user_operation(&user_operation);
        let mut proposal = Self {
            user_operation,
            upper_limits,
            threshold,
            owners: canonicalize_owners(owners),
            partials: vec![],
        };
        proposal.co_sign(proposer)?;
        Ok(proposal)
    }

    /// Distinct owners that signed so far
    pub fn signers(&self) -> Vec<Address> {
        let mut signers: Vec<Address> = self
            .partials
            .iter()
            .map(|p| p.signer)
            .filter(|signer| self.owners.contains(signer))
            .collect();
        signers.sort();
        signers.dedup();
        signers
    }

    /// Adds one more owner's signature
    pub fn co_sign(&mut self, partial: PartialSignature) -> Result<(), AccountError> {
        if !self.owners.contains(&partial.signer) {
            return Err(AccountError::NotAnOwner { signer: partial.signer });
        }
        if !self.partials.iter().any(|p| p.signer == partial.signer) {
            self.partials.push(partial);
        }
        Ok(())
    }

    pub fn status(&self) -> SignatureStatus {
        if self.signers().len() >= self.threshold {
            SignatureStatus::Actual
        } else {
            SignatureStatus::Proposed
        }
    }

    /// Current aggregate, whether or not the threshold is reached
    pub fn aggregate(&self) -> Result<AggregateSignature, AccountError> {
        aggregate(
            &self.partials,
            self.threshold,
            &self.owners,
            self.upper_limits,
            GasLimits::from_user_operation(&self.user_operation),
        )
    }

    /// User operation with the aggregated signature attached
    pub fn assemble(&self) -> Result<UserOperationRequest, AccountError> {
        let aggregate = self.aggregate()?;
        if aggregate.status != SignatureStatus::Actual {
            return Err(AccountError::ThresholdNotMet {
                signers: aggregate.signers.len(),
                threshold: self.threshold,
            });
        }
        Ok(self.user_operation.clone().signature(aggregate.signature))
    }
}
