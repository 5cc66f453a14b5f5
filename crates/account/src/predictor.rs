//! Counterfactual address prediction
//!
//! Every supported factory deploys an ERC-1967 clone of the version's implementation with
//! CREATE2, so the address is a pure function of the factory, the owners, the salt, the version
//! and (for replay-safe versions) the chain id.

use crate::{
    version::{AccountVersion, OwnershipKind},
    AccountError,
};
use corvus_contracts::{
    light_account_factory_api as light,
    multi_owner_light_account_factory_api as multi_owner_light,
    multi_owner_modular_account_factory_api as multi_owner_modular,
    multisig_modular_account_factory_api as multisig_modular,
};
use ethers::{
    abi::{encode, AbiDecode, AbiEncode, Token},
    types::{Address, Bytes, H256, U256},
    utils::{get_create2_address_from_hash, keccak256},
};
use tracing::debug;

const ERC1967_CLONE_PREFIX: [u8; 9] = [0x60, 0x3d, 0x3d, 0x81, 0x60, 0x22, 0x3d, 0x39, 0x73];
const ERC1967_CLONE_INFIX: [u8; 2] = [0x60, 0x09];
const ERC1967_CLONE_SUFFIX: [u8; 64] = [
    0x51, 0x55, 0xf3, 0x36, 0x3d, 0x3d, 0x37, 0x3d, 0x3d, 0x36, 0x3d, 0x7f, 0x36, 0x08, 0x94, 0xa1,
    0x3b, 0xa1, 0xa3, 0x21, 0x06, 0x67, 0xc8, 0x28, 0x49, 0x2d, 0xb9, 0x8d, 0xca, 0x3e, 0x20, 0x76,
    0xcc, 0x37, 0x35, 0xa9, 0x20, 0xa3, 0xca, 0x50, 0x5d, 0x38, 0x2b, 0xbc, 0x54, 0x5a, 0xf4, 0x3d,
    0x60, 0x00, 0x80, 0x3e, 0x60, 0x38, 0x57, 0x3d, 0x60, 0x00, 0xfd, 0x5b, 0x3d, 0x60, 0x00, 0xf3,
];

/// Owners of a (not yet deployed) account
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountOwners {
    Single(Address),
    Multi(Vec<Address>),
    Threshold { owners: Vec<Address>, threshold: u128 },
}

impl AccountOwners {
    /// Owners in canonical order
    pub fn owners(&self) -> Vec<Address> {
        match self {
            Self::Single(owner) => vec![*owner],
            Self::Multi(owners) | Self::Threshold { owners, .. } => canonicalize_owners(owners),
        }
    }
}

/// Removes duplicates and the zero address, sorts ascending
pub fn canonicalize_owners(owners: &[Address]) -> Vec<Address> {
    let mut owners: Vec<Address> = owners.iter().copied().filter(|o| !o.is_zero()).collect();
    owners.sort();
    owners.dedup();
    owners
}

/// Hash of the creation code of an ERC-1967 clone pointing to `implementation`
pub fn erc1967_clone_init_code_hash(implementation: Address) -> H256 {
    let code = [
        ERC1967_CLONE_PREFIX.as_slice(),
        implementation.as_bytes(),
        ERC1967_CLONE_INFIX.as_slice(),
        ERC1967_CLONE_SUFFIX.as_slice(),
    ]
    .concat();
    keccak256(code).into()
}

fn check_owners(version: AccountVersion, owners: &AccountOwners) -> Result<(), AccountError> {
    let invalid = |inner: String| Err(AccountError::InvalidOwners { inner });
    match (version.ownership(), owners) {
        (OwnershipKind::Single, AccountOwners::Single(owner)) if owner.is_zero() => {
            invalid("owner is the zero address".into())
        }
        (OwnershipKind::Single, AccountOwners::Single(_)) => Ok(()),
        (OwnershipKind::Multi, AccountOwners::Multi(_)) if owners.owners().is_empty() => {
            invalid("no owners".into())
        }
        (OwnershipKind::Multi, AccountOwners::Multi(_)) => Ok(()),
        (OwnershipKind::Threshold, AccountOwners::Threshold { threshold, .. }) => {
            let count = owners.owners().len() as u128;
            if *threshold == 0 || *threshold > count {
                invalid(format!("threshold {threshold} out of range for {count} owners"))
            } else {
                Ok(())
            }
        }
        (kind, _) => invalid(format!("{version} expects {kind:?} ownership")),
    }
}

/// Salt argument of the factory's `createAccount`
///
/// Replay-safe versions fold the chain id into the salt, `keccak256(abi.encode(salt, chainId))`,
/// so the same owners get a different account on every chain.
pub fn factory_salt(version: AccountVersion, salt: U256, chain_id: u64) -> U256 {
    if version.is_replay_safe() {
        U256::from(keccak256(encode(&[Token::Uint(salt), Token::Uint(chain_id.into())])))
    } else {
        salt
    }
}

/// Salt the factory passes to CREATE2 for its `createAccount` salt argument
fn create2_salt(
    version: AccountVersion,
    owners: &AccountOwners,
    factory_salt: U256,
) -> Result<H256, AccountError> {
    check_owners(version, owners)?;

    let owner_tokens = || Token::Array(owners.owners().into_iter().map(Token::Address).collect());
    let salt = Token::Uint(factory_salt);
    let encoded = match owners {
        // legacy factories ignore the salt
        AccountOwners::Single(owner) if version.is_legacy() => {
            encode(&[Token::Address(*owner), Token::Uint(U256::zero())])
        }
        AccountOwners::Single(owner) => encode(&[Token::Address(*owner), salt]),
        AccountOwners::Multi(_) => match version {
            AccountVersion::MultiOwnerLightAccountV2_0_0 => encode(&[owner_tokens(), salt]),
            _ => encode(&[salt, owner_tokens()]),
        },
        AccountOwners::Threshold { threshold, .. } => {
            encode(&[salt, owner_tokens(), Token::Uint(U256::from(*threshold))])
        }
    };

    Ok(keccak256(encoded).into())
}

/// Salt the factory passes to CREATE2
pub fn combined_salt(
    version: AccountVersion,
    owners: &AccountOwners,
    salt: U256,
    chain_id: u64,
) -> Result<H256, AccountError> {
    create2_salt(version, owners, factory_salt(version, salt, chain_id))
}

/// Predicts the address the factory deploys the account to on chain `chain_id`
pub fn predict(
    factory: Address,
    owners: &AccountOwners,
    salt: U256,
    version: AccountVersion,
    chain_id: u64,
) -> Result<Address, AccountError> {
    let combined_salt = combined_salt(version, owners, salt, chain_id)?;
    let init_code_hash = erc1967_clone_init_code_hash(version.implementation());
    Ok(get_create2_address_from_hash(factory, combined_salt, init_code_hash))
}

/// Call data of the factory's `createAccount`
pub fn factory_data(
    version: AccountVersion,
    owners: &AccountOwners,
    salt: U256,
    chain_id: u64,
) -> Result<Bytes, AccountError> {
    check_owners(version, owners)?;

    let salt = factory_salt(version, salt, chain_id);
    let data = match owners {
        AccountOwners::Single(owner) => light::CreateAccountCall { owner: *owner, salt }.encode(),
        AccountOwners::Multi(_) => match version {
            AccountVersion::MultiOwnerLightAccountV2_0_0 => {
                multi_owner_light::CreateAccountCall { owners: owners.owners(), salt }.encode()
            }
            _ => multi_owner_modular::CreateAccountCall { salt, owners: owners.owners() }.encode(),
        },
        AccountOwners::Threshold { threshold, .. } => multisig_modular::CreateAccountCall {
            salt,
            owners: owners.owners(),
            threshold: *threshold,
        }
        .encode(),
    };

    Ok(data.into())
}

/// Decodes the owners and the salt argument from the factory's `createAccount` call data
pub fn decode_factory_data(
    version: AccountVersion,
    factory_data: &[u8],
) -> Result<(AccountOwners, U256), AccountError> {
    let codec = |e: ethers::abi::AbiError| AccountError::Codec { inner: e.to_string() };

    match version.ownership() {
        OwnershipKind::Single => {
            let call = light::CreateAccountCall::decode(factory_data).map_err(codec)?;
            Ok((AccountOwners::Single(call.owner), call.salt))
        }
        OwnershipKind::Multi => match version {
            AccountVersion::MultiOwnerLightAccountV2_0_0 => {
                let call =
                    multi_owner_light::CreateAccountCall::decode(factory_data).map_err(codec)?;
                Ok((AccountOwners::Multi(call.owners), call.salt))
            }
            _ => {
                let call =
                    multi_owner_modular::CreateAccountCall::decode(factory_data).map_err(codec)?;
                Ok((AccountOwners::Multi(call.owners), call.salt))
            }
        },
        OwnershipKind::Threshold => {
            let call = multisig_modular::CreateAccountCall::decode(factory_data).map_err(codec)?;
            Ok((
                AccountOwners::Threshold { owners: call.owners, threshold: call.threshold },
                call.salt,
            ))
        }
    }
}

/// Predicts the address from the deployment data of a user operation
///
/// The salt in the call data already carries the chain id of replay-safe versions. Only the
/// canonical factory of the version is known to deploy ERC-1967 clones of the version's
/// implementation, for any other factory [`AccountError::AddressPredictionUnavailable`] is
/// returned and the address has to be resolved with the entry point's `getSenderAddress`.
pub fn predict_from_factory_data(
    version: AccountVersion,
    factory: Address,
    factory_data: &[u8],
) -> Result<Address, AccountError> {
    if factory != version.default_factory() {
        debug!(?factory, %version, "Factory is not canonical, address has to be resolved on-chain");
        return Err(AccountError::AddressPredictionUnavailable { factory, version });
    }

    let (owners, salt) = decode_factory_data(version, factory_data)?;
    let combined_salt = create2_salt(version, &owners, salt)?;
    let init_code_hash = erc1967_clone_init_code_hash(version.implementation());
    Ok(get_create2_address_from_hash(factory, combined_salt, init_code_hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::utils::get_create2_address;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    fn owner(i: usize) -> Address {
        [
            "0x9c5754De1443984659E1b3a8d1931D83475ba29C",
            "0x1F9090AAE28B8A3DCEADF281B0F12828E676C326",
            "0xce0fefa6f7979c4c9b5373e0f5105b7259092c6d",
        ][i]
            .parse()
            .unwrap()
    }

    fn addr(s: &str) -> Address {
        s.parse().unwrap()
    }

    #[test]
    fn clone_init_code_hash() {
        assert_eq!(
            erc1967_clone_init_code_hash(addr("0x0046000000000151008789797b54fdb500E2a61e")),
            "0x6d803e8e88365cb78f80fada5417854f762259eb434a4d432fec11330e932ee8"
                .parse::<H256>()
                .unwrap()
        );
    }

    #[test]
    fn clone_creation_code_matches_create2_of_full_init_code() {
        // LibClone.initCodeERC1967 with the implementation spliced in
        let creation_code = |implementation: Address| {
            Bytes::from_str(&format!(
                "0x603d3d8160223d3973{implementation:x}60095155f3363d3d373d3d363d7f360894a13ba1a\
                 3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc545af43d6000803e6038573d6000fd5b\
                 3d6000f3"
            ))
            .unwrap()
        };

        let owners = AccountOwners::Single(owner(0));
        for version in AccountVersion::iter().filter(|v| v.ownership() == OwnershipKind::Single) {
            let factory = version.default_factory();
            let salt = combined_salt(version, &owners, U256::one(), 1).unwrap();
            assert_eq!(
                predict(factory, &owners, U256::one(), version, 1).unwrap(),
                get_create2_address(
                    factory,
                    salt.as_bytes().to_vec(),
                    creation_code(version.implementation())
                ),
                "{version}"
            );
        }
    }

    #[test]
    fn predict_single_owner() {
        let version = AccountVersion::LightAccountV1_1_0;
        let factory = version.default_factory();
        let owners = AccountOwners::Single(owner(0));

        assert_eq!(
            predict(factory, &owners, U256::zero(), version, 1).unwrap(),
            addr("0x47a4e9ae021f3c964ccc59a3bc1a2cc83295c0ac")
        );
        assert_eq!(
            predict(factory, &owners, U256::one(), version, 1).unwrap(),
            addr("0x2006adad25506405c0df361e9c6730d84e7c1913")
        );

        let version = AccountVersion::LightAccountV2_0_0;
        assert_eq!(
            predict(version.default_factory(), &owners, U256::zero(), version, 1).unwrap(),
            addr("0x4896ecc61f993a2c2f17fe1a03a3734de082e12b")
        );
    }

    #[test]
    fn legacy_versions_ignore_salt_and_chain() {
        let version = AccountVersion::LightAccountV1_0_1;
        let factory = version.default_factory();
        let owners = AccountOwners::Single(owner(0));

        let expected = addr("0xb4f4b45dc8cd785366ea12cc369f6b164fa110ae");
        assert_eq!(predict(factory, &owners, U256::zero(), version, 1).unwrap(), expected);
        assert_eq!(predict(factory, &owners, 42.into(), version, 1).unwrap(), expected);
        assert_eq!(predict(factory, &owners, 42.into(), version, 10).unwrap(), expected);
        assert_eq!(factory_salt(version, 42.into(), 10), 42.into());
    }

    #[test]
    fn replay_safe_versions_fold_chain_id() {
        let owners = AccountOwners::Single(owner(0));
        for (version, mainnet, optimism) in [
            (
                AccountVersion::LightAccountV1_1_0,
                "0x47a4e9ae021f3c964ccc59a3bc1a2cc83295c0ac",
                "0x00946165644c9fd9a5f9e973244401d388007678",
            ),
            (
                AccountVersion::LightAccountV2_0_0,
                "0x4896ecc61f993a2c2f17fe1a03a3734de082e12b",
                "0xaed52b2771ed98e0e1b941395b7c5a54bc510f80",
            ),
        ] {
            let factory = version.default_factory();
            assert_eq!(predict(factory, &owners, U256::zero(), version, 1).unwrap(), addr(mainnet));
            assert_eq!(
                predict(factory, &owners, U256::zero(), version, 10).unwrap(),
                addr(optimism)
            );
        }

        let version = AccountVersion::MultisigModularAccountV1_0_0;
        let owners =
            AccountOwners::Threshold { owners: vec![owner(0), owner(1), owner(2)], threshold: 2 };
        assert_eq!(
            predict(version.default_factory(), &owners, U256::zero(), version, 10).unwrap(),
            addr("0x3252c29b8acea0772ceae1d39df41c86cc3ed2ca")
        );

        assert_eq!(
            factory_salt(AccountVersion::LightAccountV2_0_0, U256::zero(), 1),
            U256::from_str("0xa6eef7e35abe7026729641147f7915573c7e97b47efa546f5f6e3230263bcb49")
                .unwrap()
        );
    }

    #[test]
    fn predict_multi_owner() {
        let version = AccountVersion::MultiOwnerLightAccountV2_0_0;
        let owners = AccountOwners::Multi(vec![owner(0), owner(1)]);
        assert_eq!(
            predict(version.default_factory(), &owners, U256::zero(), version, 1).unwrap(),
            addr("0x2c2afeda3e4828aff58eb2a557e9fbc8b025b8c2")
        );

        let version = AccountVersion::MultiOwnerModularAccountV1_0_0;
        let owners = AccountOwners::Multi(vec![owner(0), owner(1), owner(2)]);
        assert_eq!(
            predict(version.default_factory(), &owners, U256::zero(), version, 1).unwrap(),
            addr("0xfdb5cb5a7cb640dec9e18ffa3fd6cfd8093c732a")
        );
    }

    #[test]
    fn predict_multisig() {
        let version = AccountVersion::MultisigModularAccountV1_0_0;
        let owners =
            AccountOwners::Threshold { owners: vec![owner(0), owner(1), owner(2)], threshold: 2 };
        assert_eq!(
            predict(version.default_factory(), &owners, U256::zero(), version, 1).unwrap(),
            addr("0x7d0f8e117a26e06f7ddd78bca4b5131e93d7194f")
        );
    }

    #[test]
    fn owner_order_does_not_matter() {
        let version = AccountVersion::MultiOwnerModularAccountV1_0_0;
        let factory = version.default_factory();
        let expected = predict(
            factory,
            &AccountOwners::Multi(vec![owner(0), owner(1), owner(2)]),
            U256::zero(),
            version,
            1,
        )
        .unwrap();

        for owners in [
            vec![owner(2), owner(1), owner(0)],
            vec![owner(1), owner(2), owner(0)],
            vec![owner(1), owner(1), owner(2), owner(0), owner(2)],
            vec![Address::zero(), owner(0), owner(2), Address::zero(), owner(1)],
        ] {
            assert_eq!(
                predict(factory, &AccountOwners::Multi(owners), U256::zero(), version, 1).unwrap(),
                expected
            );
        }
    }

    #[test]
    fn invalid_owners() {
        let version = AccountVersion::MultisigModularAccountV1_0_0;
        let factory = version.default_factory();
        for threshold in [0, 4] {
            let owners = AccountOwners::Threshold {
                owners: vec![owner(0), owner(1), owner(2)],
                threshold,
            };
            assert!(matches!(
                predict(factory, &owners, U256::zero(), version, 1),
                Err(AccountError::InvalidOwners { .. })
            ));
        }

        assert!(matches!(
            predict(factory, &AccountOwners::Single(owner(0)), U256::zero(), version, 1),
            Err(AccountError::InvalidOwners { .. })
        ));
        assert!(matches!(
            predict(
                factory,
                &AccountOwners::Multi(vec![Address::zero()]),
                U256::zero(),
                AccountVersion::MultiOwnerModularAccountV1_0_0,
                1
            ),
            Err(AccountError::InvalidOwners { .. })
        ));
    }

    #[test]
    fn predict_from_factory_data_matches_forward_path() {
        let version = AccountVersion::MultisigModularAccountV1_0_0;
        let owners = AccountOwners::Threshold { owners: vec![owner(2), owner(0)], threshold: 1 };
        let salt = U256::from(7);
        let data = factory_data(version, &owners, salt, 10).unwrap();
        assert_eq!(&data[..4], &[0x28, 0xd8, 0x76, 0x25]);

        assert_eq!(
            predict_from_factory_data(version, version.default_factory(), &data).unwrap(),
            predict(version.default_factory(), &owners, salt, version, 10).unwrap()
        );
        assert_ne!(
            predict_from_factory_data(version, version.default_factory(), &data).unwrap(),
            predict(version.default_factory(), &owners, salt, version, 1).unwrap()
        );
    }

    #[test]
    fn unknown_factory_is_unavailable() {
        let version = AccountVersion::LightAccountV1_1_0;
        let data =
            factory_data(version, &AccountOwners::Single(owner(0)), U256::zero(), 1).unwrap();
        assert_eq!(&data[..4], &[0x5f, 0xbf, 0xb9, 0xcf]);

        let factory = Address::random();
        assert_eq!(
            predict_from_factory_data(version, factory, &data),
            Err(AccountError::AddressPredictionUnavailable { factory, version })
        );
    }
}
