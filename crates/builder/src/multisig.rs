//! Threshold (multisig) account flow: one owner proposes, the others co-sign, anyone submits
//! once the threshold is reached

use crate::{
    error::{Stage, UserOperationError, UserOperationErrorKind, UserOperationResult},
    pipeline::OperationPipeline,
};
use corvus_account::{AccountError, Call, MultisigProposal, PartialSignature, SignatureStatus};
use corvus_paymaster::SponsorOptions;
use corvus_primitives::{SignedUserOperation, UserOperationRequest};
use tracing::info;

fn error(
    uo: &UserOperationRequest,
    stage: Stage,
    kind: impl Into<UserOperationErrorKind>,
) -> UserOperationError {
    UserOperationError { sender: uo.sender, nonce: uo.nonce, stage, kind: kind.into() }
}

impl OperationPipeline {
    async fn partial_signature(
        &self,
        uo: &UserOperationRequest,
    ) -> UserOperationResult<PartialSignature> {
        let account = self.connected_account().map_err(|kind| error(uo, Stage::Signing, kind))?;
        let hash = uo.hash(
            &self.entry_point(account.as_ref()),
            self.options().chain_id,
            account.entry_point_version(),
        );
        let signer = account.signer();
        let signature = signer
            .sign_message(hash.as_bytes())
            .await
            .map_err(|err| error(uo, Stage::Signing, err))?;
        Ok(PartialSignature::eoa(signer.address(), signature))
    }

    /// Builds the user operation and signs it as the first owner
    ///
    /// The gas values of the built operation become the upper limits the co-signers agree on.
    pub async fn propose_user_operation(
        &self,
        calls: &[Call],
        options: &SponsorOptions,
    ) -> UserOperationResult<MultisigProposal> {
        let uo = self.build_user_operation(calls, options).await?;
        let account = self.connected_account().map_err(|kind| error(&uo, Stage::Signing, kind))?;
        let threshold = account.threshold().ok_or_else(|| {
            error(
                &uo,
                Stage::Signing,
                AccountError::UnsupportedOperation {
                    operation: "multisig proposal".into(),
                    version: account.version(),
                },
            )
        })?;

        let owners = account.owners();
        let proposer = self.partial_signature(&uo).await?;
        info!("Proposed user operation of {:?} signed by {:?}", uo.sender, proposer.signer);
        MultisigProposal::propose(uo.clone(), threshold, &owners, proposer)
            .map_err(|err| error(&uo, Stage::Signing, err))
    }

    /// Adds this owner's signature to the proposal
    pub async fn co_sign(&self, proposal: &mut MultisigProposal) -> UserOperationResult<()> {
        let partial = self.partial_signature(&proposal.user_operation).await?;
        let signer = partial.signer;
        proposal
            .co_sign(partial)
            .map_err(|err| error(&proposal.user_operation, Stage::Signing, err))?;
        info!("Co-signed user operation of {:?} as {signer:?}", proposal.user_operation.sender);
        Ok(())
    }

    /// Submits the proposal with the aggregated signature
    pub async fn send_proposal(
        &self,
        proposal: &MultisigProposal,
    ) -> UserOperationResult<SignedUserOperation> {
        let uo = &proposal.user_operation;
        if proposal.status() != SignatureStatus::Actual {
            return Err(error(
                uo,
                Stage::Signing,
                AccountError::ThresholdNotMet {
                    signers: proposal.signers().len(),
                    threshold: proposal.threshold,
                },
            ));
        }
        let account = self.connected_account().map_err(|kind| error(uo, Stage::Signing, kind))?;
        let entry_point = self.entry_point(account.as_ref());
        let version = account.entry_point_version();
        let hash = uo.hash(&entry_point, self.options().chain_id, version);

        let assembled = proposal.assemble().map_err(|err| error(uo, Stage::Signing, err))?;
        let signed = SignedUserOperation::new(hash, entry_point, version, assembled);
        self.submit(&signed).await?;
        Ok(signed)
    }
}
