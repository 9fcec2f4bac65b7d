//! Threshold and signer changes, checked locally before anything is written

use crate::service::{CallOptions, VaultService};
use signet_errors::Result;
use signet_types::{SignerId, Vault};
use tracing::{info, instrument};

#[derive(Debug, Clone, Default)]
pub struct VaultSettings {
    call: CallOptions,
}

impl VaultSettings {
    pub fn new(call: CallOptions) -> Self {
        Self { call }
    }

    /// Checked vault built from a fresh read of threshold and signers
    async fn current_vault(&self, service: &dyn VaultService, address: &str) -> Result<Vault> {
        let (threshold, signers) = tokio::try_join!(
            self.call.run(service.get_threshold()),
            self.call.run(service.get_signers()),
        )?;
        Vault::new(address, address, threshold, signers)
    }

    /// Change the number of approvals the vault requires.
    ///
    /// `threshold` must lie in `1..=signers` for the signer set read just now.
    #[instrument(skip(self, service))]
    pub async fn set_threshold(
        &self,
        service: &dyn VaultService,
        address: &str,
        threshold: u32,
    ) -> Result<Vault> {
        let updated = self
            .current_vault(service, address)
            .await?
            .with_threshold(threshold)?;

        self.call.run(service.set_threshold(threshold)).await?;
        info!(threshold, signers = updated.signers().len(), "threshold updated");
        Ok(updated)
    }

    /// Add a signer identity to the vault
    #[instrument(skip(self, service))]
    pub async fn add_signer(
        &self,
        service: &dyn VaultService,
        address: &str,
        identity: &str,
    ) -> Result<SignerId> {
        let signer = SignerId::parse(identity)?;
        self.current_vault(service, address)
            .await?
            .with_signer(signer.clone())?;

        self.call.run(service.add_signer(&signer)).await?;
        info!(signer = %signer, "signer added");
        Ok(signer)
    }
}
