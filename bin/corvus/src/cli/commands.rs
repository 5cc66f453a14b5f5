use super::args::{AccountArgs, BundlerArgs, CallArgs, CreateWalletArgs, SignerArgs, SponsorArgs};
use crate::utils::{parse_u256, parse_user_operation_hash, unwrap_path_or_home};
use alloy_chains::Chain;
use clap::Parser;
use corvus_account::{encode_calls, factory_data, predict_from_factory_data, AccountVersion};
use corvus_builder::{
    AccountSigner, LocalSigner, OperationPipeline, PipelineOptions, SmartAccount,
    SmartContractAccount,
};
use corvus_paymaster::{SponsorOptions, SponsorshipAdapter};
use corvus_primitives::UserOperationHash;
use corvus_rpc::{BundlerClient, JsonRpcBundlerClient, JsonRpcPaymasterClient};
use ethers::{
    providers::{Http, Provider},
    types::U256,
};
use std::sync::Arc;
use tracing::info;

/// Connects to the bundler, checking it serves the expected chain
async fn connect_bundler(args: &BundlerArgs) -> eyre::Result<(Arc<JsonRpcBundlerClient>, u64)> {
    let bundler = Arc::new(JsonRpcBundlerClient::new(args.bundler_url.clone())?);
    let chain_id = bundler.chain_id().await?;

    if let Some(chain) = args.chain {
        let expected = Chain::from(chain);
        if expected.id() != chain_id {
            return Err(eyre::format_err!(
                "Tried to connect to the bundler of different chain: {} != {}",
                expected,
                Chain::from(chain_id)
            ));
        }
    }

    info!("Connected to bundler {} on chain {chain_id}", args.bundler_url);
    Ok((bundler, chain_id))
}

/// Predict the counterfactual address of a smart account
#[derive(Debug, Parser)]
pub struct PredictAddressCommand {
    /// Account args
    #[clap(flatten)]
    account: AccountArgs,

    /// Chain the account is deployed on.
    #[clap(long, default_value_t = 1)]
    chain_id: u64,
}

impl PredictAddressCommand {
    /// Execute the command
    pub fn execute(self) -> eyre::Result<()> {
        let version = self.account.account_version;
        let owners = self.account.account_owners(None)?;
        let factory = self.account.factory.unwrap_or_else(|| version.default_factory());

        let data = factory_data(version, &owners, self.account.salt, self.chain_id)?;
        let address = predict_from_factory_data(version, factory, &data)?;
        println!("{address:?}");
        Ok(())
    }
}

/// Encode calls into the call data of a smart account
#[derive(Debug, Parser)]
pub struct EncodeCallsCommand {
    /// Account version.
    #[clap(long, default_value_t = AccountVersion::LightAccountV2_0_0)]
    account_version: AccountVersion,

    /// Calls args
    #[clap(flatten)]
    calls: CallArgs,
}

impl EncodeCallsCommand {
    /// Execute the command
    pub fn execute(self) -> eyre::Result<()> {
        println!("{}", encode_calls(self.account_version, &self.calls.calls));
        Ok(())
    }
}

/// Send a user operation and wait until it is included
#[derive(Debug, Parser)]
pub struct SendCommand {
    /// Bundler args
    #[clap(flatten)]
    bundler: BundlerArgs,

    /// Signer args
    #[clap(flatten)]
    signer: SignerArgs,

    /// Account args
    #[clap(flatten)]
    account: AccountArgs,

    /// Sponsorship args
    #[clap(flatten)]
    sponsor: SponsorArgs,

    /// Calls args
    #[clap(flatten)]
    calls: CallArgs,

    /// Key of the nonce sequence.
    #[clap(long, default_value = "0", value_parser = parse_u256)]
    nonce_key: U256,

    /// Return once submitted instead of waiting for the transaction.
    #[clap(long, default_value_t = false)]
    no_wait: bool,
}

impl SendCommand {
    /// Execute the command
    pub async fn execute(self) -> eyre::Result<()> {
        let (bundler, chain_id) = connect_bundler(&self.bundler).await?;

        let signer =
            Arc::new(LocalSigner::from_file(self.signer.mnemonic_file, self.signer.signer_index)?);
        let owners = self.account.account_owners(Some(signer.address()))?;
        let eth_client = Arc::new(Provider::<Http>::try_from(self.signer.eth_client_address)?);
        let account = SmartContractAccount::new(
            eth_client,
            signer,
            self.account.account_version,
            owners,
            self.account.salt,
            self.account.factory,
        )
        .await?;
        let entry_point_version = account.entry_point_version();

        let options = PipelineOptions {
            chain_id,
            entry_point: self.bundler.entry_point,
            nonce_key: self.nonce_key,
            ..Default::default()
        };
        let mut pipeline =
            OperationPipeline::new(bundler.clone(), options).with_account(Arc::new(account));

        if let Some(url) = &self.sponsor.paymaster_url {
            let paymaster = Arc::new(JsonRpcPaymasterClient::new(url)?);
            let mut adapter = SponsorshipAdapter::new(
                paymaster,
                bundler,
                self.sponsor.mode()?,
                entry_point_version,
                chain_id,
            );
            if let Some(entry_point) = self.bundler.entry_point {
                adapter = adapter.with_entry_point(entry_point);
            }
            info!("Sponsoring user operations through {url} ({})", adapter.mode().name());
            pipeline = pipeline.with_sponsor(Arc::new(adapter));
        }

        let signed =
            pipeline.send_user_operation(&self.calls.calls, &SponsorOptions::default()).await?;
        println!("{}", signed.hash);

        if !self.no_wait {
            let tx_hash = pipeline.wait_for_user_operation_transaction(signed.hash).await?;
            println!("{tx_hash:?}");
        }
        Ok(())
    }
}

/// Fetch the receipt of a user operation
#[derive(Debug, Parser)]
pub struct ReceiptCommand {
    /// Bundler args
    #[clap(flatten)]
    bundler: BundlerArgs,

    /// User operation hash.
    #[clap(long, value_parser = parse_user_operation_hash)]
    hash: UserOperationHash,
}

impl ReceiptCommand {
    /// Execute the command
    pub async fn execute(self) -> eyre::Result<()> {
        let (bundler, _) = connect_bundler(&self.bundler).await?;
        match bundler.get_user_operation_receipt(self.hash).await? {
            Some(receipt) => println!("{}", serde_json::to_string_pretty(&receipt)?),
            None => info!("No receipt for user operation {}", self.hash),
        }
        Ok(())
    }
}

/// Fetch a user operation by its hash
#[derive(Debug, Parser)]
pub struct UserOperationCommand {
    /// Bundler args
    #[clap(flatten)]
    bundler: BundlerArgs,

    /// User operation hash.
    #[clap(long, value_parser = parse_user_operation_hash)]
    hash: UserOperationHash,
}

impl UserOperationCommand {
    /// Execute the command
    pub async fn execute(self) -> eyre::Result<()> {
        let (bundler, _) = connect_bundler(&self.bundler).await?;
        match bundler.get_user_operation_by_hash(self.hash).await? {
            Some(uo) => println!("{}", serde_json::to_string_pretty(&uo)?),
            None => info!("User operation {} not found", self.hash),
        }
        Ok(())
    }
}

/// Create a wallet (mnemonic) for signing user operations
#[derive(Debug, Parser)]
pub struct CreateWalletCommand {
    /// All create wallet args
    #[clap(flatten)]
    create_wallet: CreateWalletArgs,
}

impl CreateWalletCommand {
    /// Execute the command
    pub fn execute(self) -> eyre::Result<()> {
        info!("Creating wallet... Storing to: {:?}", self.create_wallet.output_path);

        let path = unwrap_path_or_home(self.create_wallet.output_path)?;
        let signer = LocalSigner::build_random(path)?;
        info!("Wallet signer {:?}", signer.address());
        Ok(())
    }
}
