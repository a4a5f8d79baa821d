use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

pub const ENV_STORE_URL: &str = "RIVA_STORE_URL";
pub const ENV_API_KEY: &str = "RIVA_STORE_API_KEY";
pub const ENV_TIMEOUT_SECS: &str = "RIVA_REQUEST_TIMEOUT_SECS";

const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Connection settings for the remote store. Two values are required at
/// startup; everything else has a default.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl StoreConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads `RIVA_STORE_URL` and `RIVA_STORE_API_KEY`, failing fast with the
    /// name of whichever is missing. `RIVA_REQUEST_TIMEOUT_SECS` is optional.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var(ENV_STORE_URL).map_err(|_| Error::MissingEnv(ENV_STORE_URL))?;
        let api_key = std::env::var(ENV_API_KEY).map_err(|_| Error::MissingEnv(ENV_API_KEY))?;
        let timeout = std::env::var(ENV_TIMEOUT_SECS)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Ok(Self::new(base_url, api_key).with_timeout(Duration::from_secs(timeout)))
    }
}

/// Query-string builder for one collection request. Filter values are
/// percent-encoded; the remaining directives are URL-safe literals.
#[derive(Debug, Clone)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    /// No directives; filters only. Used for deletes.
    pub fn new() -> Self {
        Self { pairs: Vec::new() }
    }

    /// `select=*`
    pub fn all() -> Self {
        Self {
            pairs: vec![("select".into(), "*".into())],
        }
    }

    /// `select=<cols>` projection.
    pub fn columns(cols: &str) -> Self {
        Self {
            pairs: vec![("select".into(), cols.into())],
        }
    }

    /// `select=count` result-shaping directive.
    pub fn count() -> Self {
        Self {
            pairs: vec![("select".into(), "count".into())],
        }
    }

    /// Equality filter on one column.
    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.pairs
            .push((column.into(), format!("eq.{}", urlencoding::encode(value))));
        self
    }

    /// Server-side ordering, e.g. `created_at.desc`.
    pub fn order(mut self, order: &str) -> Self {
        self.pairs.push(("order".into(), order.into()));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.pairs.push(("limit".into(), n.to_string()));
        self
    }

    fn query_string(&self) -> String {
        if self.pairs.is_empty() {
            return String::new();
        }
        let joined = self
            .pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("?{joined}")
    }
}

#[derive(Deserialize)]
struct CountRow {
    count: u64,
}

/// HTTP client for the remote relational store. Every request carries the
/// same static API key as both identifying key and bearer credential.
#[derive(Clone)]
pub struct StoreClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl StoreClient {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(&StoreConfig::from_env()?)
    }

    fn request(&self, method: Method, table: &str, query: &Query) -> reqwest::RequestBuilder {
        let url = format!(
            "{}/rest/v1/{}{}",
            self.base_url,
            table,
            query.query_string()
        );
        debug!(%method, %url, "store request");
        self.http
            .request(method, url)
            .header("apikey", self.api_key.as_str())
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(CONTENT_TYPE, "application/json")
    }

    async fn expect_ok(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Transport {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Filtered, ordered read of a collection. The store returns the full
    /// result set in one reply; there is no pagination.
    pub async fn select<T: DeserializeOwned>(&self, table: &str, query: &Query) -> Result<Vec<T>> {
        let response = self.request(Method::GET, table, query).send().await?;
        let rows = Self::expect_ok(response).await?.json().await?;
        Ok(rows)
    }

    /// Single-row lookup; absence is a present-but-empty result, not an error.
    pub async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query,
    ) -> Result<Option<T>> {
        let rows: Vec<T> = self.select(table, query).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn insert<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        table: &str,
        row: &B,
    ) -> Result<T> {
        let response = self
            .request(Method::POST, table, &Query::all())
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await?;
        let mut rows: Vec<T> = Self::expect_ok(response).await?.json().await?;
        if rows.is_empty() {
            return Err(Error::EmptyReply);
        }
        Ok(rows.remove(0))
    }

    /// Partial update scoped by the query's filters; only the fields present
    /// in `patch` are sent.
    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        table: &str,
        query: &Query,
        patch: &B,
    ) -> Result<T> {
        let response = self
            .request(Method::PATCH, table, query)
            .header("Prefer", "return=representation")
            .json(patch)
            .send()
            .await?;
        let mut rows: Vec<T> = Self::expect_ok(response).await?.json().await?;
        if rows.is_empty() {
            return Err(Error::EmptyReply);
        }
        Ok(rows.remove(0))
    }

    pub async fn delete(&self, table: &str, query: &Query) -> Result<()> {
        let response = self.request(Method::DELETE, table, query).send().await?;
        Self::expect_ok(response).await?;
        Ok(())
    }

    /// Cheap row count via the `select=count` directive.
    pub async fn count(&self, table: &str) -> Result<u64> {
        let rows: Vec<CountRow> = self.select(table, &Query::count()).await?;
        Ok(rows.first().map(|r| r.count).unwrap_or(0))
    }
}
