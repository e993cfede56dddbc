use std::{sync::Arc, time::Duration};
use tokio::{sync::RwLock, time::Instant};
use url::Url;

use crate::{
    error::{DestinationError, ProviderError},
    models::{Row, ShortcutMap},
    provider::Provider,
};

/// Shortcut -> destination mapping refreshed from a [`Provider`] on demand.
///
/// The mapping is rebuilt at most once per `ttl`. A refresh holds the write
/// lock for its whole duration (provider round-trip included), so readers
/// always see either the previous mapping or the new one in full. Lookups
/// between refreshes only take the read lock and run concurrently.
///
/// A failed refresh leaves the previous mapping and refresh time in place;
/// the next lookup tries again.
pub struct ShortcutCache {
    state: RwLock<CacheState>,
    provider: Arc<dyn Provider>,
    ttl: Duration,
    query_timeout: Duration,
}

#[derive(Default)]
struct CacheState {
    map: ShortcutMap,
    /// `None` until the first successful refresh.
    last_refresh: Option<Instant>,
}

impl CacheState {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.last_refresh
            .map(|at| at.elapsed() <= ttl)
            .unwrap_or(false)
    }
}

impl ShortcutCache {
    pub fn new(provider: Arc<dyn Provider>, ttl: Duration, query_timeout: Duration) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            provider,
            ttl,
            query_timeout,
        }
    }

    /// Look up a shortcut, refreshing the mapping first if it has expired.
    ///
    /// Returns `Ok(None)` when the shortcut is unknown. If the refresh fails
    /// but an earlier one succeeded, the stale mapping answers; the error is
    /// only returned when there is nothing cached to fall back on.
    pub async fn get(&self, key: &str) -> Result<Option<Url>, ProviderError> {
        let refreshed = self.refresh().await;

        let state = self.state.read().await;
        if let Err(e) = refreshed {
            if state.last_refresh.is_none() {
                return Err(e);
            }
            tracing::warn!("shortcut refresh failed, serving stale mapping: {}", e);
        }

        Ok(state.map.get(key).cloned())
    }

    /// Look up a shortcut in the current mapping without refreshing it.
    pub async fn lookup(&self, key: &str) -> Option<Url> {
        self.state.read().await.map.get(key).cloned()
    }

    /// Re-query the provider if the mapping is older than the TTL.
    pub async fn refresh(&self) -> Result<(), ProviderError> {
        if self.state.read().await.is_fresh(self.ttl) {
            return Ok(());
        }

        let mut state = self.state.write().await;
        // Another task may have refreshed while we waited for the lock.
        if state.is_fresh(self.ttl) {
            return Ok(());
        }

        let rows = tokio::time::timeout(self.query_timeout, self.provider.query())
            .await
            .map_err(|_| ProviderError::Timeout(self.query_timeout))??;

        state.map = shortcut_map(rows);
        state.last_refresh = Some(Instant::now());
        tracing::debug!("shortcut cache refreshed with {} entries", state.map.len());

        Ok(())
    }
}

/// Turn provider rows into a fresh mapping.
///
/// Rows without two non-empty string cells are skipped silently, rows with an
/// unparsable destination are skipped with a warning, and a repeated shortcut
/// overwrites the earlier one.
pub fn shortcut_map(rows: Vec<Row>) -> ShortcutMap {
    let mut out = ShortcutMap::new();

    for row in rows {
        if row.len() < 2 {
            continue;
        }

        let (Some(key), Some(value)) = (row[0].non_empty_text(), row[1].non_empty_text()) else {
            continue;
        };

        let key = key.to_lowercase();

        let url = match parse_destination(value) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("shortcut {:?} dropped: {}", key, e);
                continue;
            }
        };

        if out.insert(key.clone(), url).is_some() {
            tracing::warn!("shortcut {:?} redeclared, overwriting", key);
        }
    }

    out
}

/// Destinations end up in a `Location` header, so they must be absolute.
fn parse_destination(value: &str) -> Result<Url, DestinationError> {
    Url::parse(value).map_err(|e| match e {
        url::ParseError::RelativeUrlWithoutBase => DestinationError::NotAbsolute(value.to_owned()),
        e => DestinationError::Invalid(value.to_owned(), e),
    })
}
