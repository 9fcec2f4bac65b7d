//! End-to-end vault flows for one signer identity

use crate::cache::{ClientCache, Connector};
use crate::config::ClientConfig;
use crate::coordinator::{Coordinator, SubmitOutcome};
use crate::history::{history_from_service_order, ViewEntry};
use crate::intent::IntentDraft;
use crate::poller::{fetch_snapshot, VaultPoller, VaultSnapshot};
use crate::service::{CallOptions, VaultService};
use crate::settings::VaultSettings;
use serde::Serialize;
use signet_errors::{Error, Result};
use signet_types::{
    Network, SignerId, TokenDescriptor, TokenId, TransactionStatus, Vault, NATIVE_DECIMALS,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const ETH_DECIMALS: u8 = 18;

/// How amounts of a token are shown
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TokenDisplay {
    pub symbol: String,
    pub decimals: u8,
}

/// A token held by the vault
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Asset {
    pub token: TokenId,
    pub balance: u64,
    #[serde(flatten)]
    pub display: TokenDisplay,
}

/// A signer identity talking to one or more vaults through a shared cache
pub struct Session<C> {
    identity: SignerId,
    cache: ClientCache<C>,
    call: CallOptions,
    coordinator: Coordinator,
    settings: VaultSettings,
    poll_interval: Duration,
}

impl<C: Connector> Session<C> {
    pub fn new(config: &ClientConfig, identity: SignerId, connector: C) -> Self {
        let call = config.call_options();
        Self {
            identity,
            cache: ClientCache::new(connector),
            coordinator: Coordinator::new(call.clone()),
            settings: VaultSettings::new(call.clone()),
            call,
            poll_interval: config.poll_interval(),
        }
    }

    pub fn identity(&self) -> &SignerId {
        &self.identity
    }

    /// Cancels every call made through this session
    pub fn cancel(&self) {
        self.call.cancel.cancel();
    }

    /// Cached service handle for `address`
    pub fn vault(&mut self, address: &str) -> Result<Arc<dyn VaultService>> {
        Ok(self.cache.get_client(address, &self.identity)?)
    }

    /// Validate, propose and possibly execute a transfer.
    ///
    /// Without an explicit `sender` the vault's subaccount for the token is used.
    #[instrument(skip(self), fields(identity = %self.identity))]
    pub async fn send(
        &mut self,
        vault: &str,
        amount: &str,
        token: &str,
        recipient: &str,
        sender: Option<&str>,
    ) -> Result<SubmitOutcome> {
        let draft = IntentDraft::parse(amount, token, recipient)?;
        let service = self.vault(vault)?;

        let sender = match sender {
            Some(sender) => sender.to_string(),
            None => {
                let token_id = TokenId::from(&draft.token);
                self.call.run(service.get_subaccount(&token_id)).await?
            }
        };
        debug!(sender = %sender, "resolved sending account");

        let intent = draft.with_sender(&sender)?;
        self.coordinator.submit(service.as_ref(), &intent).await
    }

    /// Merged view of executed and pending transactions, newest first
    #[instrument(skip(self))]
    pub async fn history(&mut self, vault: &str) -> Result<Vec<ViewEntry>> {
        let service = self.vault(vault)?;
        let (executed, proposed) = tokio::try_join!(
            self.call.run(service.get_transactions()),
            self.call.run(service.get_proposed_transactions()),
        )?;
        Ok(history_from_service_order(executed, &proposed))
    }

    /// Request execution of a pending proposal
    pub async fn execute(&mut self, vault: &str, proposal_id: u64) -> Result<TransactionStatus> {
        let service = self.vault(vault)?;
        self.coordinator.execute(service.as_ref(), proposal_id).await
    }

    pub async fn vault_info(&mut self, vault: &str) -> Result<VaultSnapshot> {
        let service = self.vault(vault)?;
        fetch_snapshot(service.as_ref(), vault, &self.call).await
    }

    /// Balance of `token` held by the vault, in base units
    #[instrument(skip(self))]
    pub async fn balance(&mut self, vault: &str, token: &str) -> Result<u64> {
        let descriptor = TokenDescriptor::parse(token)?;
        let service = self.vault(vault)?;
        balance_of(service.as_ref(), &self.call, &descriptor).await
    }

    /// Symbol and decimals used to display amounts of `token`
    pub async fn token_display(&mut self, vault: &str, token: &str) -> Result<TokenDisplay> {
        let descriptor = TokenDescriptor::parse(token)?;
        if descriptor.address.is_none() {
            return Ok(native_display(descriptor.network));
        }
        let service = self.vault(vault)?;
        display_of(service.as_ref(), &self.call, &descriptor).await
    }

    /// Every token the vault holds, native first, with balance and display info.
    ///
    /// Tracked tokens reported with a malformed identifier are skipped.
    #[instrument(skip(self))]
    pub async fn assets(&mut self, vault: &str) -> Result<Vec<Asset>> {
        let service = self.vault(vault)?;
        let tracked = self.call.run(service.get_tokens()).await?;

        let mut descriptors = vec![TokenDescriptor::native()];
        for token in &tracked {
            match token.descriptor() {
                Ok(descriptor) if !descriptors.contains(&descriptor) => descriptors.push(descriptor),
                Ok(_) => {}
                Err(err) => warn!(token = %token, error = %err, "skipping tracked token"),
            }
        }

        let mut assets = Vec::with_capacity(descriptors.len());
        for descriptor in &descriptors {
            let (balance, display) = tokio::try_join!(
                balance_of(service.as_ref(), &self.call, descriptor),
                display_of(service.as_ref(), &self.call, descriptor),
            )?;
            assets.push(Asset {
                token: TokenId::from(descriptor),
                balance,
                display,
            });
        }
        debug!(count = assets.len(), "assets loaded");
        Ok(assets)
    }

    /// Start tracking `token` in the vault.
    ///
    /// The identifier is checked locally, then against the vault's current
    /// token list, before anything is written.
    #[instrument(skip(self))]
    pub async fn add_token(&mut self, vault: &str, token: &str) -> Result<TokenId> {
        let descriptor = TokenDescriptor::parse(token)?;
        let token_id = TokenId::from(&descriptor);
        if descriptor.is_native() {
            return Err(Error::DuplicateToken(token_id.to_string()));
        }

        let service = self.vault(vault)?;
        let tracked = self.call.run(service.get_tokens()).await?;
        if tracked.contains(&token_id) {
            return Err(Error::DuplicateToken(token_id.to_string()));
        }

        self.call.run(service.add_token(&token_id)).await?;
        info!(token = %token_id, "token added");
        Ok(token_id)
    }

    /// Display info for each distinct token in `tokens`.
    ///
    /// Tokens whose lookup fails are left out; callers show their raw amounts.
    pub async fn token_displays<'a, I>(&mut self, vault: &str, tokens: I) -> HashMap<TokenId, TokenDisplay>
    where
        I: IntoIterator<Item = &'a TokenId>,
    {
        let mut displays = HashMap::new();
        let mut seen = HashSet::new();
        for token in tokens {
            if !seen.insert(token) {
                continue;
            }
            match self.token_display(vault, token.as_str()).await {
                Ok(display) => {
                    displays.insert(token.clone(), display);
                }
                Err(err) => warn!(token = %token, error = %err, "skipping token display"),
            }
        }
        displays
    }

    pub async fn set_threshold(&mut self, vault: &str, threshold: u32) -> Result<Vault> {
        let service = self.vault(vault)?;
        self.settings.set_threshold(service.as_ref(), vault, threshold).await
    }

    pub async fn add_signer(&mut self, vault: &str, identity: &str) -> Result<SignerId> {
        let service = self.vault(vault)?;
        self.settings.add_signer(service.as_ref(), vault, identity).await
    }

    /// Start a background poller for `vault`
    pub fn watch(&mut self, vault: &str) -> Result<VaultPoller> {
        let service = self.vault(vault)?;
        let mut poller = VaultPoller::new(self.poll_interval, self.call.child());
        poller.switch_vault(service, vault);
        Ok(poller)
    }
}

async fn balance_of(
    service: &dyn VaultService,
    call: &CallOptions,
    descriptor: &TokenDescriptor,
) -> Result<u64> {
    if descriptor.is_native() {
        return Ok(call.run(service.get_balance(descriptor.network)).await?);
    }

    let token_id = TokenId::from(descriptor);
    let subaccount = call.run(service.get_subaccount(&token_id)).await?;
    Ok(call
        .run(service.get_token_balance(&token_id, &subaccount))
        .await?)
}

fn native_display(network: Network) -> TokenDisplay {
    let (symbol, decimals) = match network {
        Network::Icp => ("ICP", NATIVE_DECIMALS),
        Network::Eth => ("ETH", ETH_DECIMALS),
    };
    TokenDisplay {
        symbol: symbol.to_string(),
        decimals,
    }
}

async fn display_of(
    service: &dyn VaultService,
    call: &CallOptions,
    descriptor: &TokenDescriptor,
) -> Result<TokenDisplay> {
    let Some(address) = &descriptor.address else {
        return Ok(native_display(descriptor.network));
    };

    let (symbol, decimals) = tokio::try_join!(
        call.run(service.token_symbol(address)),
        call.run(service.token_decimals(address)),
    )?;
    Ok(TokenDisplay { symbol, decimals })
}

impl<C> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

/// Error used when no identity is configured
pub fn missing_identity() -> Error {
    Error::InvalidSigner("no identity configured; pass --identity or set `identity`".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::ServiceResult;
    use crate::testing::{signer, MockVault, ACCOUNT_ID};
    use signet_types::{ExecutedTransaction, NATIVE_TOKEN};

    const ALICE: &str = "aaaaa-aa";
    const BOB: &str = "rrkah-fqaaa-aaaaa-aaaaq-cai";
    const CKBTC: &str = "icp:icrc1:mxzaz-hqaaa-aaaar-qaada-cai";

    struct SharedConnector(Arc<MockVault>);

    impl Connector for SharedConnector {
        fn connect(&self, _address: &str, _identity: &SignerId) -> ServiceResult<Arc<dyn VaultService>> {
            Ok(self.0.clone())
        }
    }

    fn session(mock: &Arc<MockVault>) -> Session<SharedConnector> {
        Session::new(
            &ClientConfig::default(),
            signer(ALICE),
            SharedConnector(mock.clone()),
        )
    }

    #[tokio::test]
    async fn test_send_resolves_sender_then_submits() {
        let mock = Arc::new(MockVault::new(1, &[ALICE]));
        let mut session = session(&mock);

        let outcome = session
            .send("vault-1", "10", NATIVE_TOKEN, ACCOUNT_ID, None)
            .await
            .unwrap();

        assert_eq!(outcome.proposal().intent.sender, "subaccount-of-icp:native");
        assert_eq!(
            mock.calls(),
            vec![
                "get_subaccount",
                "propose_transaction",
                "get_threshold",
                "execute_transaction"
            ]
        );
    }

    #[tokio::test]
    async fn test_send_with_explicit_sender() {
        let mock = Arc::new(MockVault::new(2, &[ALICE, BOB]));
        let mut session = session(&mock);

        let outcome = session
            .send("vault-1", "10", NATIVE_TOKEN, ACCOUNT_ID, Some("main"))
            .await
            .unwrap();

        assert!(matches!(outcome, SubmitOutcome::PendingApproval { .. }));
        assert_eq!(outcome.proposal().intent.sender, "main");
        assert_eq!(mock.count("get_subaccount"), 0);
    }

    #[tokio::test]
    async fn test_invalid_send_makes_no_calls() {
        let mock = Arc::new(MockVault::new(1, &[ALICE]));
        let mut session = session(&mock);

        let err = session
            .send("vault-1", "ten", NATIVE_TOKEN, ACCOUNT_ID, None)
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_history_merges_both_lists() {
        let mock = Arc::new(MockVault::new(2, &[ALICE, BOB]));
        let mut session = session(&mock);

        session
            .send("vault-1", "10", NATIVE_TOKEN, ACCOUNT_ID, Some("main"))
            .await
            .unwrap();
        session
            .send("vault-1", "20", NATIVE_TOKEN, ACCOUNT_ID, Some("main"))
            .await
            .unwrap();
        session.execute("vault-1", 1).await.unwrap();

        let view = session.history("vault-1").await.unwrap();
        assert_eq!(view.len(), 2);
        let executed: Vec<&ExecutedTransaction> = view
            .iter()
            .filter_map(|entry| match entry {
                ViewEntry::Executed(tx) => Some(tx),
                ViewEntry::Proposed(_) => None,
            })
            .collect();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].intent.amount, 10);
    }

    #[tokio::test]
    async fn test_single_signer_history_shows_execution() {
        let mock = Arc::new(MockVault::new(1, &[ALICE]));
        let mut session = session(&mock);

        session
            .send("vault-1", "10", NATIVE_TOKEN, ACCOUNT_ID, None)
            .await
            .unwrap();

        let view = session.history("vault-1").await.unwrap();
        assert_eq!(view.len(), 1);
        match &view[0] {
            ViewEntry::Executed(tx) => assert!(matches!(tx.status, TransactionStatus::Completed(_))),
            other => panic!("expected executed entry, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_quorum_vault_history_shows_proposal() {
        let mock = Arc::new(
            MockVault::new(2, &[ALICE, BOB, "ryjl3-tyaaa-aaaaa-aaaba-cai"])
                .counting_proposer_approval(ALICE),
        );
        let mut session = session(&mock);

        session
            .send("vault-1", "10", NATIVE_TOKEN, ACCOUNT_ID, None)
            .await
            .unwrap();

        let vault = session.vault_info("vault-1").await.unwrap().to_vault().unwrap();
        let view = session.history("vault-1").await.unwrap();
        assert_eq!(view.len(), 1);
        match &view[0] {
            ViewEntry::Proposed(proposal) => {
                assert!(proposal.approvals() < 2);
                assert!(!crate::coordinator::can_execute(proposal, &vault));
            }
            other => panic!("expected proposed entry, got {other:?}"),
        }
        assert_eq!(mock.count("execute_transaction"), 0);
    }

    #[tokio::test]
    async fn test_balance_routes_by_token() {
        let mock = Arc::new(MockVault::new(1, &[ALICE]).with_balance(900));
        let mut session = session(&mock);

        assert_eq!(session.balance("vault-1", NATIVE_TOKEN).await.unwrap(), 900);
        assert_eq!(mock.count("get_subaccount"), 0);

        assert_eq!(session.balance("vault-1", CKBTC).await.unwrap(), 42);
        assert_eq!(mock.count("get_subaccount"), 1);
        assert_eq!(mock.count("get_token_balance"), 1);

        assert!(matches!(
            session.balance("vault-1", "icp").await,
            Err(Error::MalformedTokenId(_))
        ));
    }

    #[tokio::test]
    async fn test_token_display() {
        let mock = Arc::new(MockVault::new(1, &[ALICE]));
        let mut session = session(&mock);

        let native = session.token_display("vault-1", NATIVE_TOKEN).await.unwrap();
        assert_eq!(native.symbol, "ICP");
        assert_eq!(native.decimals, 8);
        assert!(mock.calls().is_empty());

        let ckbtc = session.token_display("vault-1", CKBTC).await.unwrap();
        assert_eq!(ckbtc, TokenDisplay { symbol: "ckBTC".into(), decimals: 8 });
    }

    #[tokio::test]
    async fn test_token_displays_skip_malformed_tokens() {
        let mock = Arc::new(MockVault::new(1, &[ALICE]));
        let mut session = session(&mock);
        let tokens = [
            TokenId::from(CKBTC),
            TokenId::from("icp:icrc1"),
            TokenId::from(CKBTC),
            TokenId::native(),
        ];

        let displays = session.token_displays("vault-1", &tokens).await;

        assert_eq!(displays.len(), 2);
        assert_eq!(displays[&TokenId::native()].symbol, "ICP");
        assert_eq!(displays[&TokenId::from(CKBTC)].symbol, "ckBTC");
        assert!(!displays.contains_key(&TokenId::from("icp:icrc1")));
        assert_eq!(mock.count("token_symbol"), 1);
    }

    #[tokio::test]
    async fn test_assets_list_native_then_tracked() {
        let mock = Arc::new(
            MockVault::new(1, &[ALICE])
                .with_balance(250_000_000)
                .tracking(&[CKBTC, "icp:icrc1", CKBTC]),
        );
        let mut session = session(&mock);

        let assets = session.assets("vault-1").await.unwrap();

        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].token, TokenId::native());
        assert_eq!(assets[0].balance, 250_000_000);
        assert_eq!(assets[0].display.symbol, "ICP");
        assert_eq!(assets[1].token, TokenId::from(CKBTC));
        assert_eq!(assets[1].balance, 42);
        assert_eq!(assets[1].display, TokenDisplay { symbol: "ckBTC".into(), decimals: 8 });
        assert_eq!(mock.count("get_tokens"), 1);

        let value = serde_json::to_value(&assets[1]).unwrap();
        assert_eq!(value["token"], CKBTC);
        assert_eq!(value["symbol"], "ckBTC");
    }

    #[tokio::test]
    async fn test_add_token() {
        let mock = Arc::new(MockVault::new(1, &[ALICE]));
        let mut session = session(&mock);

        let added = session.add_token("vault-1", CKBTC).await.unwrap();
        assert_eq!(added, TokenId::from(CKBTC));
        assert_eq!(mock.tokens(), vec![TokenId::from(CKBTC)]);

        let err = session.add_token("vault-1", CKBTC).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateToken(_)));
        assert_eq!(mock.count("add_token"), 1);
    }

    #[tokio::test]
    async fn test_add_token_validates_locally() {
        let mock = Arc::new(MockVault::new(1, &[ALICE]));
        let mut session = session(&mock);

        let err = session.add_token("vault-1", "icp:icrc1").await.unwrap_err();
        assert!(matches!(err, Error::MalformedTokenId(_)));

        let err = session.add_token("vault-1", NATIVE_TOKEN).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateToken(_)));

        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_settings_and_info() {
        let mock = Arc::new(MockVault::new(1, &[ALICE]).with_balance(5));
        let mut session = session(&mock);

        session.add_signer("vault-1", BOB).await.unwrap();
        session.set_threshold("vault-1", 2).await.unwrap();

        let info = session.vault_info("vault-1").await.unwrap();
        assert_eq!(info.threshold, 2);
        assert_eq!(info.signers, vec![signer(ALICE), signer(BOB)]);
        assert_eq!(info.native_balance, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_publishes_snapshot() {
        let mock = Arc::new(MockVault::new(1, &[ALICE]));
        let mut session = session(&mock);

        let poller = session.watch("vault-1").unwrap();
        let mut updates = poller.subscribe();
        updates.changed().await.unwrap();

        let update = updates.borrow().clone().unwrap();
        assert_eq!(update.vault, "vault-1");
        assert!(update.result.is_ok());
    }
}
