use crate::utils::{parse_address, parse_call, parse_chain, parse_u256};
use alloy_chains::NamedChain;
use clap::Parser;
use corvus_account::{AccountOwners, AccountVersion, Call, OwnershipKind};
use corvus_paymaster::{Erc20Payment, SponsorMode};
use ethers::types::{Address, U256};
use expanded_pathbuf::ExpandedPathBuf;
use serde_json::Value;

/// Bundler connection CLI args
#[derive(Debug, Clone, Parser, PartialEq)]
pub struct BundlerArgs {
    /// Bundler JSON-RPC endpoint.
    #[clap(long, default_value = "http://127.0.0.1:3000")]
    pub bundler_url: String,

    /// Chain the bundler is expected to serve.
    #[clap(long, value_parser = parse_chain)]
    pub chain: Option<NamedChain>,

    /// Entry point address, the canonical deployment of the account's version if not set.
    #[clap(long, value_parser = parse_address)]
    pub entry_point: Option<Address>,
}

/// Smart account CLI args
#[derive(Debug, Clone, Parser, PartialEq)]
pub struct AccountArgs {
    /// Account version.
    #[clap(long, default_value_t = AccountVersion::LightAccountV2_0_0)]
    pub account_version: AccountVersion,

    /// Account owners, the owner derived from the mnemonic if not set.
    #[clap(long, value_delimiter = ',', value_parser = parse_address)]
    pub owners: Vec<Address>,

    /// Number of owners that must sign (multisig accounts only).
    #[clap(long)]
    pub threshold: Option<u128>,

    /// Salt of the counterfactual address.
    #[clap(long, default_value = "0", value_parser = parse_u256)]
    pub salt: U256,

    /// Account factory, the canonical factory of the version if not set.
    #[clap(long, value_parser = parse_address)]
    pub factory: Option<Address>,
}

impl AccountArgs {
    /// Owners as configured for the account version
    pub fn account_owners(&self, signer: Option<Address>) -> eyre::Result<AccountOwners> {
        let mut owners = self.owners.clone();
        if owners.is_empty() {
            owners.extend(signer);
        }
        if owners.is_empty() {
            return Err(eyre::eyre!("At least one owner is required"));
        }

        Ok(match self.account_version.ownership() {
            OwnershipKind::Single => {
                if owners.len() > 1 {
                    return Err(eyre::eyre!(
                        "Account {} has a single owner, got {}",
                        self.account_version,
                        owners.len()
                    ));
                }
                AccountOwners::Single(owners[0])
            }
            OwnershipKind::Multi => AccountOwners::Multi(owners),
            OwnershipKind::Threshold => {
                AccountOwners::Threshold { owners, threshold: self.threshold.unwrap_or(1) }
            }
        })
    }
}

/// Signer CLI args
#[derive(Debug, Clone, Parser)]
pub struct SignerArgs {
    /// Ethereum execution client endpoint.
    #[clap(long, default_value = "http://127.0.0.1:8545")]
    pub eth_client_address: String,

    /// Path to the mnemonic file.
    #[clap(long)]
    pub mnemonic_file: ExpandedPathBuf,

    /// Index of the key derived from the mnemonic.
    #[clap(long, default_value_t = 0)]
    pub signer_index: u32,
}

/// Sponsorship CLI args
#[derive(Debug, Clone, Parser, PartialEq)]
pub struct SponsorArgs {
    /// Paymaster service endpoint, operations are not sponsored if not set.
    #[clap(long)]
    pub paymaster_url: Option<String>,

    /// Gas manager policy, ERC-7677 paymaster service if not set.
    #[clap(long)]
    pub policy_id: Option<String>,

    /// Token paying for gas through the gas manager.
    #[clap(long, value_parser = parse_address, requires = "policy_id")]
    pub erc20_token: Option<Address>,

    /// Context sent to the ERC-7677 paymaster service (JSON).
    #[clap(long)]
    pub paymaster_context: Option<String>,
}

impl SponsorArgs {
    pub fn mode(&self) -> eyre::Result<SponsorMode> {
        Ok(match &self.policy_id {
            Some(policy_id) => SponsorMode::GasManager {
                policy_id: policy_id.clone(),
                erc20: self
                    .erc20_token
                    .map(|token| Erc20Payment { token, max_token_amount: None }),
            },
            None => SponsorMode::Erc7677 {
                context: match &self.paymaster_context {
                    Some(context) => serde_json::from_str(context)?,
                    None => Value::Null,
                },
            },
        })
    }
}

/// Calls CLI args
#[derive(Debug, Clone, Parser, PartialEq)]
pub struct CallArgs {
    /// Call to execute as `target[:value[:data]]`, repeat for a batch.
    #[clap(long = "call", required = true, value_parser = parse_call)]
    pub calls: Vec<Call>,
}

/// Create wallet CLI args
#[derive(Debug, Clone, Parser)]
pub struct CreateWalletArgs {
    /// The path where the wallet will be stored.
    #[clap(long, short)]
    pub output_path: Option<ExpandedPathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(version: AccountVersion, owners: Vec<Address>) -> AccountArgs {
        AccountArgs {
            account_version: version,
            owners,
            threshold: None,
            salt: U256::zero(),
            factory: None,
        }
    }

    #[test]
    fn owners_follow_the_account_version() {
        let signer = Address::repeat_byte(1);

        let owners = args(AccountVersion::LightAccountV2_0_0, vec![]).account_owners(Some(signer));
        assert_eq!(owners.unwrap(), AccountOwners::Single(signer));

        let many = vec![Address::repeat_byte(2), Address::repeat_byte(3)];
        assert!(args(AccountVersion::LightAccountV1_1_0, many.clone())
            .account_owners(Some(signer))
            .is_err());

        let owners = args(AccountVersion::MultiOwnerModularAccountV1_0_0, many.clone())
            .account_owners(Some(signer));
        assert_eq!(owners.unwrap(), AccountOwners::Multi(many.clone()));

        let owners = args(AccountVersion::MultisigModularAccountV1_0_0, many.clone())
            .account_owners(None);
        assert_eq!(owners.unwrap(), AccountOwners::Threshold { owners: many, threshold: 1 });

        assert!(args(AccountVersion::LightAccountV2_0_0, vec![]).account_owners(None).is_err());
    }

    #[test]
    fn sponsor_mode_from_args() {
        let args = SponsorArgs {
            paymaster_url: Some("http://127.0.0.1:4337".into()),
            policy_id: None,
            erc20_token: None,
            paymaster_context: Some(r#"{"sponsorshipPolicyId":"sp_1"}"#.into()),
        };
        let mode = args.mode().unwrap();
        assert!(matches!(mode, SponsorMode::Erc7677 { context } if context.is_object()));

        let args = SponsorArgs {
            policy_id: Some("policy".into()),
            erc20_token: Some(Address::repeat_byte(5)),
            ..args
        };
        assert!(args.mode().unwrap().accepts_permit());
    }
}
