use crate::{error::LookupError, settings::TimestampServiceSettings};
use anyhow::Result;
use async_trait::async_trait;
use backon::Retryable;
use chrono::{DateTime, Utc};
use mockall::automock;
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};
use tracing::{debug, warn};

/// Partial transaction document returned by an Esplora-style explorer.
#[derive(Debug, Clone, Default)]
pub struct TxResponse {
    pub status: Option<TxStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct TxStatus {
    pub confirmed: bool,
    pub block_time: Option<i64>,
}

/// Reads the status leniently: any field of the wrong shape is treated as absent,
/// which makes the response unconfirmed rather than undecodable.
impl From<&Value> for TxResponse {
    fn from(body: &Value) -> Self {
        let status = body
            .get("status")
            .filter(|status| status.is_object())
            .map(|status| TxStatus {
                confirmed: status
                    .get("confirmed")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                block_time: status.get("block_time").and_then(Value::as_i64),
            });
        Self { status }
    }
}

impl TxResponse {
    pub fn confirmed_at(block_time: i64) -> Self {
        Self {
            status: Some(TxStatus {
                confirmed: true,
                block_time: Some(block_time),
            }),
        }
    }

    pub fn unconfirmed() -> Self {
        Self {
            status: Some(TxStatus {
                confirmed: false,
                block_time: None,
            }),
        }
    }

    /// Confirmation instant, if the explorer reports one that fits in a `DateTime`.
    pub fn confirmation_time(&self) -> Option<DateTime<Utc>> {
        let status = self.status.as_ref().filter(|status| status.confirmed)?;
        DateTime::from_timestamp(status.block_time?, 0)
    }
}

#[automock]
#[async_trait]
pub trait TxLookup {
    async fn fetch_transaction(&self, txid: &str) -> Result<TxResponse, LookupError>;
}

/// Looks transactions up at `{base_url}/tx/{txid}`.
#[derive(Debug, Clone)]
pub struct HttpTxLookup {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTxLookup {
    pub fn new(settings: &TimestampServiceSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl TxLookup for HttpTxLookup {
    async fn fetch_transaction(&self, txid: &str) -> Result<TxResponse, LookupError> {
        let url = format!("{}/tx/{}", self.base_url, txid);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let body: Value =
            serde_json::from_slice(&body).map_err(|e| LookupError::Decode(e.to_string()))?;
        Ok(TxResponse::from(&body))
    }
}

/// Resolves funding transactions to their confirmation time.
///
/// Confirmed results are cached for the lifetime of the resolver, so one report run
/// queries each txid at most once. Unconfirmed and failed lookups are not cached.
pub struct TimestampResolver<L> {
    lookup: L,
    service: TimestampServiceSettings,
    cache: HashMap<String, DateTime<Utc>>,
    lookups: usize,
}

impl<L: TxLookup> TimestampResolver<L> {
    pub fn new(lookup: L, settings: &TimestampServiceSettings) -> Self {
        Self {
            lookup,
            service: settings.clone(),
            cache: HashMap::new(),
            lookups: 0,
        }
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Number of cache misses that went out to the timestamp service.
    pub fn lookups(&self) -> usize {
        self.lookups
    }

    /// Returns `None` when the time is unknown; lookup failures never escape.
    pub async fn resolve(&mut self, txid: &str) -> Option<DateTime<Utc>> {
        if let Some(timestamp) = self.cache.get(txid) {
            debug!(txid, "timestamp cache hit");
            return Some(*timestamp);
        }

        let interval = self.service.request_interval();
        if self.lookups > 0 && !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }
        self.lookups += 1;

        let lookup = &self.lookup;
        let max_attempts = self.service.max_attempts;
        let failures = AtomicUsize::new(0);

        let response = (|| async { lookup.fetch_transaction(txid).await })
            .retry(self.service.backoff())
            .notify(|err: &LookupError, dur: Duration| {
                let attempt = failures.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    "Error fetching timestamp for {} (attempt {}/{}): {}. Retrying in {:?}",
                    txid, attempt, max_attempts, err, dur
                );
            })
            .await;

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    "Failed to retrieve timestamp for {} after {} attempts: {}",
                    txid, max_attempts, err
                );
                return None;
            }
        };

        match response.confirmation_time() {
            Some(timestamp) => {
                self.cache.insert(txid.to_string(), timestamp);
                Some(timestamp)
            }
            None => {
                warn!(
                    "Transaction {} not confirmed or status missing, no timestamp available",
                    txid
                );
                None
            }
        }
    }
}
