use crate::{errors::VelwalletError, signer::SignedTransfer};
use eyre::Context as _;
use reqwest::{Client, StatusCode, Url};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::{future::Future, time::Duration};

/// What the wallet needs from a ledger node. The node is authoritative for balances and for
/// whether a transfer (and its hash) exists.
pub trait LedgerNode {
    fn balance(&self, address: &str)
        -> impl Future<Output = Result<Decimal, VelwalletError>> + Send;

    fn submit(
        &self,
        transfer: &SignedTransfer,
    ) -> impl Future<Output = Result<TransferReceipt, VelwalletError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub tx_hash: String,
}

#[derive(Debug, Clone, Deserialize)]
struct BalanceResponse {
    #[serde(default, with = "rust_decimal::serde::arbitrary_precision_option")]
    balance: Option<Decimal>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TransferResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    tx_hash: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn is_loopback_http(url: &str) -> bool {
    fn host_prefix_ok(s: &str, prefix: &str) -> bool {
        if !s.starts_with(prefix) {
            return false;
        }
        matches!(s.as_bytes().get(prefix.len()), None | Some(b':' | b'/'))
    }
    let u = url.trim();
    host_prefix_ok(u, "http://127.0.0.1")
        || host_prefix_ok(u, "http://localhost")
        || host_prefix_ok(u, "http://[::1]")
}

fn ensure_https_or_loopback(url: &str) -> eyre::Result<()> {
    let u = url.trim();
    if u.starts_with("https://") || is_loopback_http(u) {
        return Ok(());
    }
    eyre::bail!("node base_url must use https (or http://localhost for local testing)");
}

fn interpret_balance(status: StatusCode, body: &[u8]) -> Result<Decimal, VelwalletError> {
    let Ok(v) = serde_json::from_slice::<BalanceResponse>(body) else {
        return Err(undecodable(status));
    };
    match (v.balance, v.error) {
        (Some(b), None) => Ok(b),
        (_, Some(e)) => Err(VelwalletError::NodeRejected(Some(e))),
        (None, None) => Err(VelwalletError::NodeRejected(Some(
            "balance missing from response".to_owned(),
        ))),
    }
}

fn interpret_transfer(status: StatusCode, body: &[u8]) -> Result<TransferReceipt, VelwalletError> {
    let Ok(v) = serde_json::from_slice::<TransferResponse>(body) else {
        return Err(undecodable(status));
    };
    match (v.status.as_deref(), v.tx_hash) {
        (Some("success"), Some(tx_hash)) if !tx_hash.trim().is_empty() => {
            Ok(TransferReceipt { tx_hash })
        }
        (Some("success"), _) => Err(VelwalletError::NodeRejected(Some(
            "node reported success without a transaction hash".to_owned(),
        ))),
        _ => Err(VelwalletError::NodeRejected(v.message.or(v.error))),
    }
}

fn undecodable(status: StatusCode) -> VelwalletError {
    if status.is_success() {
        VelwalletError::NodeUnreachable("undecodable response from node".to_owned())
    } else {
        VelwalletError::NodeRejected(Some(format!("http {status}")))
    }
}

/// JSON-over-HTTP ledger node client.
#[derive(Debug, Clone)]
pub struct HttpNode {
    base: Url,
    client: Client,
}

impl HttpNode {
    pub fn new(base_url: &str, timeout: Duration) -> eyre::Result<Self> {
        ensure_https_or_loopback(base_url)?;
        let base = Url::parse(base_url.trim()).context("parse node base_url")?;
        if base.cannot_be_a_base() {
            eyre::bail!("node base_url cannot be used as a base: {base_url}");
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self { base, client })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, VelwalletError> {
        let mut url = self.base.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                VelwalletError::NodeUnreachable("node base_url cannot be a base".to_owned())
            })?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }
}

fn transport_error(e: &reqwest::Error) -> VelwalletError {
    VelwalletError::NodeUnreachable(e.to_string())
}

impl LedgerNode for HttpNode {
    async fn balance(&self, address: &str) -> Result<Decimal, VelwalletError> {
        let url = self.endpoint(&["balance", address.trim()])?;
        let resp = self.client.get(url).send().await.map_err(|e| {
            tracing::warn!(error = %e, "balance request failed");
            transport_error(&e)
        })?;
        let status = resp.status();
        let body = resp.bytes().await.map_err(|e| transport_error(&e))?;
        interpret_balance(status, &body)
    }

    async fn submit(&self, transfer: &SignedTransfer) -> Result<TransferReceipt, VelwalletError> {
        let url = self.endpoint(&["transfer"])?;
        let resp = self
            .client
            .post(url)
            .json(transfer)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "transfer request failed");
                transport_error(&e)
            })?;
        let status = resp.status();
        let body = resp.bytes().await.map_err(|e| transport_error(&e))?;
        interpret_transfer(status, &body)
    }
}
