//! JSON-RPC 2.0 over HTTP transport for the vault service
//!
//! Every request carries the vault address and the caller identity next to
//! the method arguments:
//!
//! ```json
//! {"jsonrpc":"2.0","id":7,"method":"get_threshold","params":{"vault":"...","caller":"...","args":{}}}
//! ```

use crate::cache::Connector;
use crate::service::{ServiceError, ServiceResult, VaultService};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use signet_types::{
    ExecutedTransaction, Network, Proposal, SignerId, TokenId, TransactionIntent,
    TransactionStatus,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;
use url::Url;

/// RPC request
#[derive(Serialize, Debug)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: Value,
}

/// RPC response
#[derive(Deserialize, Debug)]
pub struct RpcResponse {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

/// RPC error
#[derive(Deserialize, Debug)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

/// Decode a response body whose `result` is required
pub fn decode_response<T: DeserializeOwned>(body: &str) -> ServiceResult<T> {
    let response: RpcResponse = serde_json::from_str(body)?;
    if let Some(error) = response.error {
        return Err(ServiceError::Rpc {
            code: error.code,
            message: error.message,
        });
    }

    let result = response
        .result
        .ok_or_else(|| ServiceError::InvalidResponse("missing result field".to_string()))?;
    Ok(serde_json::from_value(result)?)
}

/// Decode a response body where only the absence of an error matters
pub fn decode_ack(body: &str) -> ServiceResult<()> {
    let response: RpcResponse = serde_json::from_str(body)?;
    match response.error {
        Some(error) => Err(ServiceError::Rpc {
            code: error.code,
            message: error.message,
        }),
        None => Ok(()),
    }
}

/// Vault service client bound to one vault and one caller identity
#[derive(Debug)]
pub struct RpcVaultClient {
    endpoint: Url,
    vault: String,
    caller: SignerId,
    http: HttpClient,
    next_id: AtomicU64,
}

impl RpcVaultClient {
    pub fn new(endpoint: Url, vault: &str, caller: &SignerId, http: HttpClient) -> Self {
        Self {
            endpoint,
            vault: vault.to_string(),
            caller: caller.clone(),
            http,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn vault(&self) -> &str {
        &self.vault
    }

    pub fn caller(&self) -> &SignerId {
        &self.caller
    }

    fn request(&self, method: &str, args: Value) -> RpcRequest {
        RpcRequest {
            jsonrpc: "2.0".to_string(),
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method: method.to_string(),
            params: json!({
                "vault": self.vault,
                "caller": self.caller,
                "args": args,
            }),
        }
    }

    async fn post(&self, method: &str, args: Value) -> ServiceResult<String> {
        let request = self.request(method, args);
        trace!(method, id = request.id, vault = %self.vault, "rpc request");

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await?;
        Ok(response.text().await?)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, args: Value) -> ServiceResult<T> {
        decode_response(&self.post(method, args).await?)
    }

    async fn call_ack(&self, method: &str, args: Value) -> ServiceResult<()> {
        decode_ack(&self.post(method, args).await?)
    }
}

#[async_trait]
impl VaultService for RpcVaultClient {
    async fn get_threshold(&self) -> ServiceResult<u32> {
        self.call("get_threshold", json!({})).await
    }

    async fn get_signers(&self) -> ServiceResult<Vec<SignerId>> {
        self.call("get_signers", json!({})).await
    }

    async fn set_threshold(&self, threshold: u32) -> ServiceResult<()> {
        self.call_ack("set_threshold", json!({ "threshold": threshold }))
            .await
    }

    async fn add_signer(&self, signer: &SignerId) -> ServiceResult<()> {
        self.call_ack("add_signer", json!({ "signer": signer })).await
    }

    async fn propose_transaction(&self, intent: &TransactionIntent) -> ServiceResult<Proposal> {
        self.call("propose_transaction", serde_json::to_value(intent)?)
            .await
    }

    async fn execute_transaction(&self, proposal_id: u64) -> ServiceResult<TransactionStatus> {
        self.call("execute_transaction", json!({ "id": proposal_id }))
            .await
    }

    async fn get_transactions(&self) -> ServiceResult<Vec<ExecutedTransaction>> {
        self.call("get_transactions", json!({})).await
    }

    async fn get_proposed_transactions(&self) -> ServiceResult<Vec<Proposal>> {
        self.call("get_proposed_transactions", json!({})).await
    }

    async fn get_balance(&self, network: Network) -> ServiceResult<u64> {
        self.call("get_balance", json!({ "network": network })).await
    }

    async fn get_subaccount(&self, token: &TokenId) -> ServiceResult<String> {
        self.call("get_subaccount", json!({ "token": token })).await
    }

    async fn get_token_balance(&self, token: &TokenId, subaccount: &str) -> ServiceResult<u64> {
        self.call(
            "get_token_balance",
            json!({ "token": token, "subaccount": subaccount }),
        )
        .await
    }

    async fn get_tokens(&self) -> ServiceResult<Vec<TokenId>> {
        self.call("get_tokens", json!({})).await
    }

    async fn add_token(&self, token: &TokenId) -> ServiceResult<()> {
        self.call_ack("add_token", json!({ "token": token })).await
    }

    async fn token_symbol(&self, token_address: &str) -> ServiceResult<String> {
        self.call("token_symbol", json!({ "token": token_address }))
            .await
    }

    async fn token_decimals(&self, token_address: &str) -> ServiceResult<u8> {
        self.call("token_decimals", json!({ "token": token_address }))
            .await
    }
}

/// Opens [`RpcVaultClient`]s against one JSON-RPC endpoint.
///
/// All handles share a single HTTP connection pool.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    endpoint: Url,
    http: HttpClient,
}

impl HttpConnector {
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> ServiceResult<Self> {
        let endpoint = Url::parse(endpoint)?;
        let mut builder = HttpClient::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            endpoint,
            http: builder.build()?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl Connector for HttpConnector {
    fn connect(&self, address: &str, identity: &SignerId) -> ServiceResult<Arc<dyn VaultService>> {
        Ok(Arc::new(RpcVaultClient::new(
            self.endpoint.clone(),
            address,
            identity,
            self.http.clone(),
        )))
    }
}
