//! Smart accounts the pipeline builds user operations for

use crate::{error::UserOperationErrorKind, signer::AccountSigner, SignerStatus};
use async_trait::async_trait;
use corvus_account::{
    encode_calls, factory_data, message::replay_safe_message_hash, multisig,
    predict_from_factory_data,
    AccountError, AccountOwners, AccountVersion, Call, GasLimits, PartialSignature,
    SignatureStatus,
};
use corvus_contracts::EntryPoint;
use corvus_primitives::{
    AccountDeployment, EntryPointVersion, UserOperationHash, UserOperationRequest,
};
use ethers::{
    providers::Middleware,
    types::{Address, Bytes, U256},
};
use parking_lot::RwLock;
use std::{
    fmt::{self, Debug},
    sync::Arc,
};
use tracing::{debug, info};

/// Account the user operations are sent from
#[async_trait]
pub trait SmartAccount: Send + Sync + Debug {
    fn address(&self) -> Address;

    fn version(&self) -> AccountVersion;

    fn entry_point(&self) -> Address;

    fn entry_point_version(&self) -> EntryPointVersion;

    /// Number of signatures a user operation needs (threshold accounts only)
    fn threshold(&self) -> Option<usize> {
        None
    }

    /// Owners allowed to sign, in canonical order
    fn owners(&self) -> Vec<Address>;

    /// Signer of this owner
    fn signer(&self) -> Arc<dyn AccountSigner>;

    async fn is_deployed(&self) -> Result<bool, UserOperationErrorKind>;

    /// Next nonce for the 192-bit nonce key
    async fn get_nonce(&self, key: U256) -> Result<U256, UserOperationErrorKind>;

    /// Deployment data of the account, `None` once the account is deployed
    async fn deployment(&self) -> Result<Option<AccountDeployment>, UserOperationErrorKind>;

    fn encode_calls(&self, calls: &[Call]) -> Bytes {
        encode_calls(self.version(), calls)
    }

    /// Signature used while estimating gas
    fn dummy_signature(&self) -> Bytes;

    /// Signs the user operation (its hash is `hash`) the way the account validates it
    async fn sign_user_operation(
        &self,
        uo: &UserOperationRequest,
        hash: UserOperationHash,
    ) -> Result<Bytes, UserOperationErrorKind>;

    /// Signs a message the account validates through ERC-1271
    async fn sign_message(&self, message: &[u8]) -> Result<Bytes, UserOperationErrorKind>;

    /// Whether the signer is ready to sign
    fn is_connected(&self) -> bool {
        *self.signer().status().borrow() == SignerStatus::Connected
    }
}

/// Smart account deployed (or to be deployed) by an account factory
pub struct SmartContractAccount<M: Middleware + 'static> {
    entry_point: EntryPoint<M>,
    entry_point_version: EntryPointVersion,
    signer: Arc<dyn AccountSigner>,
    version: AccountVersion,
    owners: AccountOwners,
    factory: Address,
    factory_data: Bytes,
    address: Address,
    chain_id: u64,
    deployed: RwLock<bool>,
}

impl<M: Middleware + 'static> Debug for SmartContractAccount<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmartContractAccount")
            .field("address", &self.address)
            .field("version", &self.version)
            .field("owners", &self.owners)
            .field("factory", &self.factory)
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

impl<M: Middleware + 'static> SmartContractAccount<M> {
    /// Connects the account of the owners
    ///
    /// The address is predicted for the canonical factory of the version, any other factory is
    /// asked through the entry point's `getSenderAddress`.
    pub async fn new(
        eth_client: Arc<M>,
        signer: Arc<dyn AccountSigner>,
        version: AccountVersion,
        owners: AccountOwners,
        salt: U256,
        factory: Option<Address>,
    ) -> Result<Self, UserOperationErrorKind> {
        let entry_point_version = version.entry_point_version();
        let entry_point = EntryPoint::new(eth_client.clone(), entry_point_version.address());
        let chain_id = eth_client
            .get_chainid()
            .await
            .map_err(|err| UserOperationErrorKind::Contract { inner: err.to_string() })?
            .as_u64();

        let factory = factory.unwrap_or_else(|| version.default_factory());
        let factory_data = factory_data(version, &owners, salt, chain_id)?;

        let address = match predict_from_factory_data(version, factory, &factory_data) {
            Ok(address) => address,
            Err(AccountError::AddressPredictionUnavailable { .. }) => {
                let init_code = AccountDeployment::from_factory(factory, factory_data.clone());
                entry_point.get_sender_address(init_code.init_code()).await?
            }
            Err(err) => return Err(err.into()),
        };

        info!("Connected {version} account {address:?} on chain {chain_id}");
        Ok(Self {
            entry_point,
            entry_point_version,
            signer,
            version,
            owners,
            factory,
            factory_data,
            address,
            chain_id,
            deployed: RwLock::new(false),
        })
    }

    pub fn account_owners(&self) -> &AccountOwners {
        &self.owners
    }

    pub fn factory(&self) -> Address {
        self.factory
    }

    fn owner_signature(&self, signature: Bytes) -> Bytes {
        match self.version {
            // signature type prefix (EOA owner)
            AccountVersion::LightAccountV2_0_0 | AccountVersion::MultiOwnerLightAccountV2_0_0 => {
                [vec![0u8], signature.to_vec()].concat().into()
            }
            _ => signature,
        }
    }
}

#[async_trait]
impl<M: Middleware + 'static> SmartAccount for SmartContractAccount<M> {
    fn address(&self) -> Address {
        self.address
    }

    fn version(&self) -> AccountVersion {
        self.version
    }

    fn entry_point(&self) -> Address {
        self.entry_point.address()
    }

    fn entry_point_version(&self) -> EntryPointVersion {
        self.entry_point_version
    }

    fn threshold(&self) -> Option<usize> {
        match &self.owners {
            AccountOwners::Threshold { threshold, .. } => Some(*threshold as usize),
            _ => None,
        }
    }

    fn owners(&self) -> Vec<Address> {
        self.owners.owners()
    }

    fn signer(&self) -> Arc<dyn AccountSigner> {
        self.signer.clone()
    }

    async fn is_deployed(&self) -> Result<bool, UserOperationErrorKind> {
        if *self.deployed.read() {
            return Ok(true);
        }

        let code = self
            .entry_point
            .eth_client()
            .get_code(self.address, None)
            .await
            .map_err(|err| UserOperationErrorKind::Contract { inner: err.to_string() })?;
        let deployed = !code.is_empty();
        if deployed {
            debug!("Account {:?} is deployed", self.address);
            *self.deployed.write() = true;
        }
        Ok(deployed)
    }

    async fn get_nonce(&self, key: U256) -> Result<U256, UserOperationErrorKind> {
        Ok(self.entry_point.get_nonce(&self.address, key).await?)
    }

    async fn deployment(&self) -> Result<Option<AccountDeployment>, UserOperationErrorKind> {
        if self.is_deployed().await? {
            return Ok(None);
        }
        Ok(Some(AccountDeployment::from_factory(self.factory, self.factory_data.clone())))
    }

    fn dummy_signature(&self) -> Bytes {
        match self.threshold() {
            Some(threshold) => multisig::dummy_signature(threshold),
            None => self.version.dummy_signature(),
        }
    }

    async fn sign_user_operation(
        &self,
        uo: &UserOperationRequest,
        hash: UserOperationHash,
    ) -> Result<Bytes, UserOperationErrorKind> {
        let signature = self.signer.sign_message(hash.as_bytes()).await?;

        if let Some(threshold) = self.threshold() {
            // a single owner can only complete a 1-of-n multisig, see `MultisigProposal`
            let partial = PartialSignature::eoa(self.signer.address(), signature);
            let limits = GasLimits::from_user_operation(uo);
            let owners = self.owners.owners();
            let aggregate = multisig::aggregate(&[partial], threshold, &owners, limits, limits)?;
            if aggregate.status != SignatureStatus::Actual {
                return Err(AccountError::ThresholdNotMet {
                    signers: aggregate.signers.len(),
                    threshold,
                }
                .into());
            }
            return Ok(aggregate.signature);
        }

        Ok(self.owner_signature(signature))
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Bytes, UserOperationErrorKind> {
        let digest = replay_safe_message_hash(self.version, self.address, self.chain_id, message)?;
        let signature = self.signer.sign_hash(digest).await?;
        Ok(self.owner_signature(signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LocalSigner;
    use corvus_contracts::entry_point_api::SenderAddressResult;
    use ethers::{
        abi::AbiEncode,
        providers::{JsonRpcError, MockProvider, MockResponse, Provider},
        types::{Signature, H256},
        utils::hash_message,
    };
    use serde_json::json;

    const PHRASE: &str = "test test test test test test test test test test test junk";

    async fn connect(
        version: AccountVersion,
        owners: impl FnOnce(Address) -> AccountOwners,
    ) -> (SmartContractAccount<Provider<MockProvider>>, MockProvider) {
        let (provider, mock) = Provider::mocked();
        let signer = Arc::new(LocalSigner::from_phrase(PHRASE, 0).unwrap());
        let owners = owners(signer.address());
        mock.push::<U256, _>(U256::from(1)).unwrap();
        let account = SmartContractAccount::new(
            Arc::new(provider),
            signer,
            version,
            owners,
            U256::zero(),
            None,
        )
        .await
        .unwrap();
        (account, mock)
    }

    #[tokio::test]
    async fn address_is_predicted_for_canonical_factory() {
        let version = AccountVersion::LightAccountV2_0_0;
        let (account, _) = connect(version, AccountOwners::Single).await;
        assert_eq!(
            account.address(),
            "0xa041b743a7e8a1f00e8259141cfc2419974b2278".parse::<Address>().unwrap()
        );
        assert_eq!(account.entry_point_version(), EntryPointVersion::V07);
        assert_eq!(account.entry_point(), EntryPointVersion::V07.address());
    }

    #[tokio::test]
    async fn other_factories_ask_the_entry_point() {
        let (provider, mock) = Provider::mocked();
        let signer = Arc::new(LocalSigner::from_phrase(PHRASE, 0).unwrap());
        let owners = AccountOwners::Single(signer.address());
        let factory = Address::repeat_byte(0x11);
        let sender: Address = "0x80d5398f121f8f6c8b09dba989d09d8a0da1178a".parse().unwrap();

        // responses are popped last in, first out
        mock.push_response(MockResponse::Error(JsonRpcError {
            code: 3,
            message: "execution reverted".into(),
            data: Some(json!(Bytes::from(SenderAddressResult { sender }.encode()))),
        }));
        mock.push::<U256, _>(U256::from(1)).unwrap();

        let account = SmartContractAccount::new(
            Arc::new(provider),
            signer,
            AccountVersion::LightAccountV1_1_0,
            owners,
            U256::zero(),
            Some(factory),
        )
        .await
        .unwrap();
        assert_eq!(account.address(), sender);
        assert_eq!(account.factory(), factory);
    }

    #[tokio::test]
    async fn deployment_is_dropped_once_deployed() {
        let (account, mock) =
            connect(AccountVersion::LightAccountV1_1_0, AccountOwners::Single).await;

        mock.push::<Bytes, _>(Bytes::default()).unwrap();
        let deployment = account.deployment().await.unwrap().unwrap();
        assert_eq!(deployment.factory_and_data().unwrap().0, account.factory());

        mock.push::<Bytes, _>(Bytes::from(vec![0x60])).unwrap();
        assert!(account.is_deployed().await.unwrap());
        // cached, no more chain reads
        assert_eq!(account.deployment().await.unwrap(), None);
    }

    #[tokio::test]
    async fn v2_signatures_carry_the_signature_type() {
        let (account, _) = connect(AccountVersion::LightAccountV2_0_0, AccountOwners::Single).await;
        let hash = UserOperationHash::from(H256::random());

        let signature =
            account.sign_user_operation(&UserOperationRequest::default(), hash).await.unwrap();
        assert_eq!(signature.len(), 66);
        assert_eq!(signature[0], 0);
        let raw = Signature::try_from(&signature[1..]).unwrap();
        assert_eq!(raw.recover(hash_message(hash.as_bytes())).unwrap(), account.signer().address());
        assert_eq!(account.dummy_signature().len(), 66);
    }

    #[tokio::test]
    async fn threshold_account_needs_co_signers() {
        let other: Address = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".parse().unwrap();
        let (account, _) = connect(AccountVersion::MultisigModularAccountV1_0_0, |owner| {
            AccountOwners::Threshold { owners: vec![owner, other], threshold: 2 }
        })
        .await;
        assert_eq!(account.threshold(), Some(2));
        assert_eq!(account.dummy_signature().len(), 96 + 2 * 65);

        let res = account
            .sign_user_operation(&UserOperationRequest::default(), UserOperationHash::default())
            .await;
        assert_eq!(
            res,
            Err(UserOperationErrorKind::Account(AccountError::ThresholdNotMet {
                signers: 1,
                threshold: 2
            }))
        );
    }

    #[tokio::test]
    async fn single_signer_completes_one_of_n() {
        let other: Address = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8".parse().unwrap();
        let (account, _) = connect(AccountVersion::MultisigModularAccountV1_0_0, |owner| {
            AccountOwners::Threshold { owners: vec![owner, other], threshold: 1 }
        })
        .await;

        let signature = account
            .sign_user_operation(&UserOperationRequest::default(), UserOperationHash::default())
            .await
            .unwrap();
        assert_eq!(signature.len(), 96 + 65);
    }

    #[tokio::test]
    async fn signer_outside_the_owners_cannot_sign() {
        let owners: Vec<Address> = ["0x70997970C51812dc3A010C7d01b50e0d17dc79C8"]
            .iter()
            .map(|o| o.parse().unwrap())
            .collect();
        let (account, _) = connect(AccountVersion::MultisigModularAccountV1_0_0, |_| {
            AccountOwners::Threshold { owners: owners.clone(), threshold: 1 }
        })
        .await;
        assert_eq!(account.owners(), owners);

        let res = account
            .sign_user_operation(&UserOperationRequest::default(), UserOperationHash::default())
            .await;
        assert_eq!(
            res,
            Err(UserOperationErrorKind::Account(AccountError::NotAnOwner {
                signer: account.signer().address()
            }))
        );
    }

    #[tokio::test]
    async fn legacy_accounts_do_not_sign_messages() {
        let (account, _) = connect(AccountVersion::LightAccountV1_0_2, AccountOwners::Single).await;
        let res = account.sign_message(b"hello").await;
        assert!(matches!(
            res,
            Err(UserOperationErrorKind::Account(AccountError::UnsupportedOperation { .. }))
        ));

        let (account, _) = connect(AccountVersion::LightAccountV1_1_0, AccountOwners::Single).await;
        assert_eq!(account.sign_message(b"hello").await.unwrap().len(), 65);
    }
}
