use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::models::City;
use crate::storage::KeyValueStore;

/// Snapshots older than this are not served without a re-fetch.
const FRESHNESS_WINDOW_HOURS: i64 = 24;

/// Versioned storage key. Bumping the suffix invalidates old payloads on
/// format changes.
const CITIES_STORE_KEY: &str = "cities-v1";

/// Remote source of the city directory.
#[async_trait]
pub trait CitySource: Send + Sync {
    /// Single bulk read of the whole reference collection.
    async fn fetch_all(&self) -> anyhow::Result<Vec<City>>;
}

/// An immutable, timestamped copy of the full city list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub cities: Vec<City>,
    pub fetched_at: DateTime<Utc>,
}

impl CacheSnapshot {
    pub fn new(cities: Vec<City>) -> Self {
        Self {
            cities,
            fetched_at: Utc::now(),
        }
    }

    /// Fresh means strictly younger than the freshness window.
    pub fn is_fresh(&self) -> bool {
        Utc::now() - self.fetched_at < Duration::hours(FRESHNESS_WINDOW_HOURS)
    }
}

/// Deduplicate by id: first occurrence wins, encounter order is preserved.
/// Returns the deduplicated list and how many records were dropped.
fn dedupe_cities(cities: Vec<City>) -> (Vec<City>, usize) {
    let mut seen: HashSet<String> = HashSet::with_capacity(cities.len());
    let mut deduped = Vec::with_capacity(cities.len());
    let mut dropped = 0;

    for city in cities {
        if seen.insert(city.id.clone()) {
            deduped.push(city);
        } else {
            dropped += 1;
        }
    }

    (deduped, dropped)
}

type InFlightFetch = Shared<BoxFuture<'static, Vec<City>>>;

struct CacheState {
    snapshot: Option<CacheSnapshot>,
    in_flight: Option<InFlightFetch>,
}

/// A poisoned lock still holds structurally valid state.
fn lock_state(state: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// Process-wide cache for the city directory.
///
/// Owns the canonical in-memory snapshot and guarantees at most one
/// concurrent remote fetch: callers that arrive while a fetch is pending
/// await the exact same outcome instead of issuing a second request.
/// Persisted storage is advisory - read once on cold start, written after
/// every successful fetch, and never allowed to fail the in-memory path.
///
/// Lifetime is the application runtime; construct once and hand clones to
/// consumers (clones share state).
#[derive(Clone)]
pub struct DirectoryCache {
    source: Arc<dyn CitySource>,
    store: Arc<dyn KeyValueStore>,
    state: Arc<Mutex<CacheState>>,
}

impl DirectoryCache {
    pub fn new(source: Arc<dyn CitySource>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            source,
            store,
            state: Arc::new(Mutex::new(CacheState {
                snapshot: None,
                in_flight: None,
            })),
        }
    }

    /// Current list of cities.
    ///
    /// Serves the in-memory snapshot when present, restores a fresh
    /// persisted snapshot on cold start, and otherwise joins or starts the
    /// single in-flight remote fetch. A failed fetch yields an empty list
    /// and commits nothing, so the next call retries.
    pub async fn get_cities(&self) -> Vec<City> {
        let fetch = {
            let mut state = lock_state(&self.state);

            // In-memory snapshots are not re-validated during a process
            // lifetime; freshness applies again after restart.
            if let Some(ref snapshot) = state.snapshot {
                return snapshot.cities.clone();
            }

            if let Some(snapshot) = self.restore_persisted() {
                let cities = snapshot.cities.clone();
                state.snapshot = Some(snapshot);
                return cities;
            }

            match state.in_flight {
                Some(ref fetch) => fetch.clone(),
                None => {
                    let fetch = self.start_fetch();
                    state.in_flight = Some(fetch.clone());
                    fetch
                }
            }
        };

        fetch.await
    }

    /// True while a remote fetch is in flight.
    pub fn is_loading(&self) -> bool {
        lock_state(&self.state).in_flight.is_some()
    }

    /// Non-blocking view of the in-memory snapshot, if any.
    pub fn snapshot(&self) -> Option<Vec<City>> {
        lock_state(&self.state)
            .snapshot
            .as_ref()
            .map(|s| s.cities.clone())
    }

    /// Read the persisted snapshot, treating read errors, parse errors and
    /// expired payloads all as a miss.
    fn restore_persisted(&self) -> Option<CacheSnapshot> {
        let payload = match self.store.get(CITIES_STORE_KEY) {
            Ok(Some(payload)) => payload,
            Ok(None) => return None,
            Err(e) => {
                debug!(error = %e, "Failed to read persisted city snapshot");
                return None;
            }
        };

        let snapshot: CacheSnapshot = match serde_json::from_str(&payload) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!(error = %e, "Malformed persisted city snapshot, ignoring");
                return None;
            }
        };

        if !snapshot.is_fresh() {
            debug!(fetched_at = %snapshot.fetched_at, "Persisted city snapshot expired");
            return None;
        }

        debug!(count = snapshot.cities.len(), "Restored city snapshot from storage");
        Some(snapshot)
    }

    /// Build the shared fetch future. Completion is the single writer path
    /// for cache state: it clears the in-flight handle and, on success,
    /// installs and persists the new snapshot in one step.
    fn start_fetch(&self) -> InFlightFetch {
        let source = Arc::clone(&self.source);
        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.state);

        async move {
            let outcome = source.fetch_all().await;

            let mut state = lock_state(&state);
            state.in_flight = None;

            match outcome {
                Ok(cities) => {
                    let (cities, dropped) = dedupe_cities(cities);
                    if dropped > 0 {
                        warn!(dropped, "Dropped duplicate city ids from fetched directory");
                    }

                    let snapshot = CacheSnapshot::new(cities.clone());
                    persist_snapshot(store.as_ref(), &snapshot);
                    state.snapshot = Some(snapshot);

                    info!(count = cities.len(), "City directory fetched");
                    cities
                }
                Err(e) => {
                    warn!(error = %e, "Failed to fetch city directory");
                    Vec::new()
                }
            }
        }
        .boxed()
        .shared()
    }
}

/// Best-effort write; failures are logged and never propagated.
fn persist_snapshot(store: &dyn KeyValueStore, snapshot: &CacheSnapshot) {
    let payload = match serde_json::to_string(snapshot) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Failed to serialize city snapshot");
            return;
        }
    };

    if let Err(e) = store.set(CITIES_STORE_KEY, &payload) {
        warn!(error = %e, "Failed to persist city snapshot");
    }
}

// ============================================================================
// Tests
// ============================================================================
