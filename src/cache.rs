use std::future::Future;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;

/// Logical query families. Cache keys are derived from one of these tags plus
/// any parameterizing argument, mirroring the read paths of the console.
pub mod family {
    pub const RADIOS: &str = "radios";
    pub const RADIO_STATS: &str = "radio-stats";
    pub const RADIO_HISTORY: &str = "radio-history";
    pub const ACCESSORIES: &str = "accessories";
    pub const ISSUES: &str = "issues";
    pub const INSTALLATIONS: &str = "installations";
    pub const BRANDS: &str = "brands";
    pub const CATEGORIES: &str = "categories";
    pub const MODELS: &str = "models";
    pub const BRAND_STATS: &str = "brand-stats";
    pub const BRANDS_WITH_RADIOS: &str = "brands-with-radios";
    pub const RADIO_MODELS: &str = "radio-models";
    pub const DASHBOARD: &str = "dashboard-stats";
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub family: &'static str,
    pub param: Option<String>,
}

impl QueryKey {
    pub fn family(family: &'static str) -> Self {
        Self {
            family,
            param: None,
        }
    }

    pub fn scoped(family: &'static str, param: &str) -> Self {
        Self {
            family,
            param: Some(param.to_string()),
        }
    }
}

struct Entry {
    value: serde_json::Value,
    fetched_at: Instant,
}

/// Process-wide memo of the most recent successful result per query key.
///
/// A cached result is served as long as it is fresh (5 minutes by default);
/// after that the next read loads from the store again. Failed loads are
/// retried within a bounded budget (2 extra attempts for reads, 1 for
/// writes) before the error surfaces. Mutation paths call [`invalidate`]
/// so stale reads are dropped rather than updated in place.
///
/// [`invalidate`]: QueryCache::invalidate
pub struct QueryCache {
    entries: DashMap<QueryKey, Entry>,
    fresh_for: Duration,
    read_retries: u32,
    write_retries: u32,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        Self::with_settings(Duration::from_secs(5 * 60), 2, 1)
    }

    pub fn with_settings(fresh_for: Duration, read_retries: u32, write_retries: u32) -> Self {
        Self {
            entries: DashMap::new(),
            fresh_for,
            read_retries,
            write_retries,
        }
    }

    /// Returns the cached result for `key` while it is fresh, otherwise runs
    /// `load` (with the read retry budget) and memoizes its result.
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, load: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(entry) = self.entries.get(&key) {
            if entry.fetched_at.elapsed() < self.fresh_for {
                debug!(family = key.family, param = ?key.param, "cache hit");
                return Ok(serde_json::from_value(entry.value.clone())?);
            }
        }
        debug!(family = key.family, param = ?key.param, "cache miss");
        let value = retry(self.read_retries, &load).await?;
        self.entries.insert(
            key,
            Entry {
                value: serde_json::to_value(&value)?,
                fetched_at: Instant::now(),
            },
        );
        Ok(value)
    }

    /// Runs a mutation with the write retry budget. Callers invalidate the
    /// affected families on success.
    pub async fn write<T, F, Fut>(&self, op: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        retry(self.write_retries, &op).await
    }

    /// Drops one cached key, or with `param: None` every key of the family
    /// regardless of parameter. Catalog mutations rely on the family-wide
    /// sweep: a category rename must disappear from every brand-scoped
    /// categories query, not only the one that was touched.
    pub fn invalidate(&self, family: &'static str, param: Option<&str>) {
        match param {
            Some(p) => {
                self.entries.remove(&QueryKey::scoped(family, p));
            }
            None => {
                self.entries.retain(|k, _| k.family != family);
            }
        }
    }

    #[cfg(test)]
    fn contains(&self, key: &QueryKey) -> bool {
        self.entries.contains_key(key)
    }
}

async fn retry<T, F, Fut>(budget: u32, op: &F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut remaining = budget;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if remaining > 0 => {
                warn!(%err, remaining, "retrying failed store call");
                remaining -= 1;
            }
            Err(err) => return Err(err),
        }
    }
}
