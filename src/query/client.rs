//! The query cache engine
//!
//! A [`QueryClient`] owns every cache entry. Consumers never see entries
//! directly; they go through lookup, fetch, prefetch, invalidate and
//! subscribe operations and read back [`QueryState`] snapshots.
//!
//! ```text
//! QueryClient (Arc<Inner>)
//!     ├── store: Mutex<HashMap<QueryKey, Entry>>
//!     │      Entry
//!     │        ├── data / error / status / updated_at
//!     │        ├── in_flight: Shared<BoxFuture>   // one per key
//!     │        ├── generation                     // latest issued fetch
//!     │        ├── subscriber ids + listeners
//!     │        └── gc: spawned timer, aborted on resubscribe
//!     └── tokens: AtomicU64                       // generations, gc tokens, listener ids
//! ```
//!
//! The store lock is never held across an `.await`. Change listeners run,
//! and replaced fetchers, listeners and data are dropped, only after it is
//! released.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use super::key::QueryKey;
use super::policy::CachePolicy;
use super::retry::RetryPolicy;
use crate::error::{Error, Result};

type AnyData = Arc<dyn Any + Send + Sync>;
type FetchOutcome = std::result::Result<AnyData, Arc<Error>>;
type SharedFetch = Shared<BoxFuture<'static, FetchOutcome>>;
type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, Result<AnyData>> + Send + Sync>;
type Listener = Arc<dyn Fn(&QueryKey) + Send + Sync>;

/// Where an entry is in its fetch lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QueryStatus {
    /// Created but never fetched
    #[default]
    Idle,
    /// A fetch is running; earlier data, if any, is still exposed
    Pending,
    Success,
    /// The last fetch failed after exhausting its retries
    Error,
}

/// Snapshot of one key as seen by a consumer
#[derive(Debug)]
pub struct QueryState<T> {
    pub data: Option<Arc<T>>,
    pub error: Option<Arc<Error>>,
    pub status: QueryStatus,
    pub is_fetching: bool,
    pub is_stale: bool,
    /// `data` belongs to a previous key
    pub is_placeholder: bool,
    pub updated_at: Option<Instant>,
    /// Consecutive failures since the last success
    pub failure_count: u32,
}

impl<T> QueryState<T> {
    pub fn idle() -> Self {
        Self {
            data: None,
            error: None,
            status: QueryStatus::Idle,
            is_fetching: false,
            is_stale: true,
            is_placeholder: false,
            updated_at: None,
            failure_count: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    /// Fetching with nothing to show yet
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Pending && self.data.is_none()
    }
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self::idle()
    }
}

impl<T> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            error: self.error.clone(),
            status: self.status,
            is_fetching: self.is_fetching,
            is_stale: self.is_stale,
            is_placeholder: self.is_placeholder,
            updated_at: self.updated_at,
            failure_count: self.failure_count,
        }
    }
}

/// Engine-wide settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientOptions {
    pub retry: RetryPolicy,
}

struct GcTimer {
    token: u64,
    handle: Option<JoinHandle<()>>,
}

impl GcTimer {
    fn cancel(self) {
        if let Some(handle) = self.handle {
            handle.abort();
        }
    }
}

struct Entry {
    data: Option<AnyData>,
    error: Option<Arc<Error>>,
    status: QueryStatus,
    updated_at: Option<Instant>,
    policy: CachePolicy,
    subscribers: HashSet<u64>,
    failure_count: u32,
    invalidated: bool,
    generation: u64,
    in_flight: Option<SharedFetch>,
    fetcher: Option<Fetcher>,
    gc: Option<GcTimer>,
    listeners: Vec<(u64, Listener)>,
}

impl Entry {
    fn new(policy: CachePolicy) -> Self {
        Self {
            data: None,
            error: None,
            status: QueryStatus::Idle,
            updated_at: None,
            policy,
            subscribers: HashSet::new(),
            failure_count: 0,
            invalidated: false,
            generation: 0,
            in_flight: None,
            fetcher: None,
            gc: None,
            listeners: Vec::new(),
        }
    }

    fn is_stale(&self, now: Instant) -> bool {
        if self.invalidated || self.data.is_none() {
            return true;
        }
        match self.updated_at {
            Some(at) => now.saturating_duration_since(at) > self.policy.stale_time,
            None => true,
        }
    }

    fn listeners(&self) -> Vec<Listener> {
        self.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
    }

    fn snapshot<T: Send + Sync + 'static>(&self, now: Instant) -> QueryState<T> {
        QueryState {
            data: self.data.clone().and_then(|d| d.downcast::<T>().ok()),
            error: self.error.clone(),
            status: self.status,
            is_fetching: self.in_flight.is_some(),
            is_stale: self.is_stale(now),
            is_placeholder: false,
            updated_at: self.updated_at,
            failure_count: self.failure_count,
        }
    }
}

struct Inner {
    store: Mutex<HashMap<QueryKey, Entry>>,
    tokens: AtomicU64,
    options: ClientOptions,
}

/// Process-wide query cache. Clones share one store.
///
/// Fetches and GC timers run as Tokio tasks, so the client should be used
/// from within a runtime.
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<Inner>,
}

impl QueryClient {
    pub fn new(options: ClientOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                store: Mutex::new(HashMap::new()),
                tokens: AtomicU64::new(0),
                options,
            }),
        }
    }

    /// Drop every entry and cancel every GC timer
    ///
    /// Fetches already running complete, but their results are discarded.
    pub fn dispose(&self) {
        let entries: Vec<Entry> = self.inner.lock().drain().map(|(_, e)| e).collect();
        debug!(entries = entries.len(), "disposing query cache");
        for entry in entries {
            if let Some(gc) = entry.gc {
                gc.cancel();
            }
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lookup and Fetch
    // ─────────────────────────────────────────────────────────────────────────

    /// Lookup-or-fetch without waiting
    ///
    /// Registers `fetch` for the key. When the data is absent, stale or
    /// invalidated and nothing is in flight, a background fetch starts.
    /// Returns the current snapshot immediately.
    pub fn query<T, F, Fut>(&self, key: &QueryKey, policy: CachePolicy, fetch: F) -> QueryState<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        if self.inner.register(key, policy, erase(fetch)) {
            self.inner.start_fetch(key, false);
        }
        self.state(key)
    }

    /// Lookup-or-fetch, waiting for data when it is not fresh
    pub async fn fetch_query<T, F, Fut>(
        &self,
        key: &QueryKey,
        policy: CachePolicy,
        fetch: F,
    ) -> std::result::Result<Arc<T>, Arc<Error>>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        if !self.inner.register(key, policy, erase(fetch)) {
            if let Some(data) = self.inner.data(key) {
                return downcast(key, data);
            }
        }
        let fetch = self
            .inner
            .start_fetch(key, false)
            .ok_or_else(|| Arc::new(Error::UnknownQuery { key: key.to_string() }))?;
        downcast(key, fetch.await?)
    }

    /// Warm an entry without subscribing to it
    ///
    /// Follows the same dedup and staleness rules as [`fetch_query`](Self::fetch_query).
    /// Failures are recorded on the entry, not returned.
    pub async fn prefetch<T, F, Fut>(&self, key: &QueryKey, policy: CachePolicy, fetch: F)
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        if let Err(err) = self.fetch_query::<T, F, Fut>(key, policy, fetch).await {
            debug!(%key, error = %err, "prefetch failed");
        }
    }

    /// Fetch again with the registered fetch function, even if a fetch is
    /// already running. The newer result wins.
    pub async fn refetch<T: Send + Sync + 'static>(
        &self,
        key: &QueryKey,
    ) -> std::result::Result<Arc<T>, Arc<Error>> {
        let fetch = self
            .inner
            .start_fetch(key, true)
            .ok_or_else(|| Arc::new(Error::UnknownQuery { key: key.to_string() }))?;
        downcast(key, fetch.await?)
    }

    /// Wait until no fetch is in flight for the key
    pub async fn wait_for(&self, key: &QueryKey) {
        loop {
            let in_flight = self.inner.lock().get(key).and_then(|e| e.in_flight.clone());
            match in_flight {
                Some(fetch) => {
                    let _ = fetch.await;
                }
                None => return,
            }
        }
    }

    /// Mark every entry under `prefix` stale
    ///
    /// Entries with subscribers are refetched right away. Returns the number
    /// of entries invalidated.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut refetch = Vec::new();
        let mut notifications = Vec::new();
        {
            let mut store = self.inner.lock();
            for (key, entry) in store.iter_mut().filter(|(k, _)| k.starts_with(prefix)) {
                entry.invalidated = true;
                if !entry.subscribers.is_empty() && entry.fetcher.is_some() {
                    refetch.push(key.clone());
                }
                notifications.push((key.clone(), entry.listeners()));
            }
        }
        debug!(%prefix, count = notifications.len(), "invalidated");

        let count = notifications.len();
        for (key, listeners) in notifications {
            notify(&key, &listeners);
        }
        for key in refetch {
            self.inner.start_fetch(&key, true);
        }
        count
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Direct Access
    // ─────────────────────────────────────────────────────────────────────────

    /// Snapshot of a key; an idle state when the key is unknown
    pub fn state<T: Send + Sync + 'static>(&self, key: &QueryKey) -> QueryState<T> {
        let now = Instant::now();
        self.inner
            .lock()
            .get(key)
            .map_or_else(QueryState::idle, |entry| entry.snapshot(now))
    }

    pub fn get_query_data<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        self.state::<T>(key).data
    }

    /// Store data as if a fetch had just succeeded
    pub fn set_query_data<T: Send + Sync + 'static>(&self, key: &QueryKey, policy: CachePolicy, value: T) {
        let mut store = self.inner.lock();
        let entry = store
            .entry(key.clone())
            .or_insert_with(|| Entry::new(policy));
        entry.policy = policy;
        let previous = entry.data.replace(Arc::new(value));
        entry.error = None;
        entry.status = QueryStatus::Success;
        entry.updated_at = Some(Instant::now());
        entry.failure_count = 0;
        entry.invalidated = false;
        if entry.subscribers.is_empty() {
            self.inner.schedule_gc(key, entry);
        }
        let listeners = entry.listeners();
        drop(store);
        drop(previous);
        notify(key, &listeners);
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.inner.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscriber_count(&self, key: &QueryKey) -> usize {
        self.inner.lock().get(key).map_or(0, |e| e.subscribers.len())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Subscriptions
    // ─────────────────────────────────────────────────────────────────────────

    /// Attach a consumer to a key, keeping its entry alive
    pub fn subscribe(&self, key: &QueryKey) -> Subscription {
        self.inner.attach(key, None)
    }

    /// Attach a consumer that is called whenever the key's state changes
    pub fn on_change<F>(&self, key: &QueryKey, callback: F) -> Subscription
    where
        F: Fn(&QueryKey) + Send + Sync + 'static,
    {
        self.inner.attach(key, Some(Arc::new(callback)))
    }
}

impl fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryClient")
            .field("entries", &self.len())
            .field("options", &self.inner.options)
            .finish()
    }
}

/// Keeps a key subscribed until dropped
#[must_use = "dropping a Subscription detaches it immediately"]
pub struct Subscription {
    inner: Weak<Inner>,
    key: QueryKey,
    id: u64,
}

impl Subscription {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Detach now (same as dropping)
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.detach(&self.key, self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("id", &self.id)
            .finish()
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_token(&self) -> u64 {
        self.tokens.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Create or update the entry for a lookup. Returns whether the data
    /// needs fetching.
    ///
    /// An unobserved entry's gc timer restarts on every lookup.
    fn register(self: &Arc<Self>, key: &QueryKey, policy: CachePolicy, fetcher: Fetcher) -> bool {
        let mut store = self.lock();
        let entry = store
            .entry(key.clone())
            .or_insert_with(|| Entry::new(policy));
        entry.policy = policy;
        let previous = entry.fetcher.replace(fetcher);
        if entry.subscribers.is_empty() {
            self.schedule_gc(key, entry);
        }
        let stale = entry.is_stale(Instant::now());
        drop(store);
        drop(previous);
        stale
    }

    /// Data for the key, if present
    fn data(&self, key: &QueryKey) -> Option<AnyData> {
        self.lock().get(key).and_then(|e| e.data.clone())
    }

    /// Start a fetch, or join the one in flight unless `force` is set
    fn start_fetch(self: &Arc<Self>, key: &QueryKey, force: bool) -> Option<SharedFetch> {
        let (fetch, listeners, superseded) = {
            let mut store = self.lock();
            let entry = store.get_mut(key)?;
            if !force {
                if let Some(ref in_flight) = entry.in_flight {
                    trace!(%key, "joining in-flight fetch");
                    return Some(in_flight.clone());
                }
            }
            let fetcher = entry.fetcher.clone()?;
            let generation = self.next_token();
            entry.generation = generation;
            entry.status = QueryStatus::Pending;

            let fetch = self.run_fetch(key.clone(), generation, fetcher).boxed().shared();
            let superseded = entry.in_flight.replace(fetch.clone());
            match Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(fetch.clone());
                }
                Err(_) => warn!(%key, "no Tokio runtime; fetch runs only when awaited"),
            }
            debug!(%key, generation, force, "fetch started");
            (fetch, entry.listeners(), superseded)
        };
        drop(superseded);
        notify(key, &listeners);
        Some(fetch)
    }

    /// One fetch with retries, settling its outcome on the entry
    fn run_fetch(
        self: &Arc<Self>,
        key: QueryKey,
        generation: u64,
        fetcher: Fetcher,
    ) -> impl Future<Output = FetchOutcome> + Send + 'static {
        let inner = Arc::downgrade(self);
        let retry = self.options.retry;
        async move {
            let mut failures = 0;
            loop {
                let err = match fetcher().await {
                    Ok(data) => {
                        if let Some(inner) = inner.upgrade() {
                            inner.settle(&key, generation, Ok(Arc::clone(&data)));
                        }
                        return Ok(data);
                    }
                    Err(err) => err,
                };

                failures += 1;
                let current = inner
                    .upgrade()
                    .is_some_and(|inner| inner.record_failure(&key, generation, failures));
                if current && retry.should_retry(failures) {
                    let delay = retry.delay(failures);
                    debug!(%key, failures, ?delay, error = %err, "fetch failed, retrying");
                    tokio::time::sleep(delay).await;
                    continue;
                }

                let err = Arc::new(err);
                if let Some(inner) = inner.upgrade() {
                    inner.settle(&key, generation, Err(Arc::clone(&err)));
                }
                return Err(err);
            }
        }
    }

    /// Note a failed attempt. Returns false once the fetch is superseded or
    /// its entry evicted, which stops further retries.
    fn record_failure(&self, key: &QueryKey, generation: u64, failures: u32) -> bool {
        let listeners = {
            let mut store = self.lock();
            let Some(entry) = store.get_mut(key) else {
                return false;
            };
            if entry.generation != generation {
                return false;
            }
            entry.failure_count = failures;
            entry.listeners()
        };
        notify(key, &listeners);
        true
    }

    /// Apply a finished fetch if it is still the latest for a live entry
    fn settle(self: &Arc<Self>, key: &QueryKey, generation: u64, outcome: FetchOutcome) {
        let mut store = self.lock();
        let Some(entry) = store.get_mut(key) else {
            trace!(%key, generation, "dropping response for evicted entry");
            return;
        };
        if entry.generation != generation {
            trace!(%key, generation, latest = entry.generation, "dropping superseded response");
            return;
        }
        let finished = entry.in_flight.take();
        let previous = match outcome {
            Ok(data) => {
                entry.error = None;
                entry.status = QueryStatus::Success;
                entry.updated_at = Some(Instant::now());
                entry.failure_count = 0;
                entry.invalidated = false;
                debug!(%key, generation, "fetch succeeded");
                entry.data.replace(data)
            }
            Err(err) => {
                warn!(%key, failures = entry.failure_count, error = %err, "fetch failed");
                entry.error = Some(err);
                entry.status = QueryStatus::Error;
                None
            }
        };
        if entry.subscribers.is_empty() {
            self.schedule_gc(key, entry);
        }
        let listeners = entry.listeners();
        drop(store);
        drop((finished, previous));
        notify(key, &listeners);
    }

    fn attach(self: &Arc<Self>, key: &QueryKey, listener: Option<Listener>) -> Subscription {
        let id = self.next_token();
        let mut store = self.lock();
        let entry = store
            .entry(key.clone())
            .or_insert_with(|| Entry::new(CachePolicy::default()));
        entry.subscribers.insert(id);
        if let Some(gc) = entry.gc.take() {
            trace!(%key, "gc cancelled");
            gc.cancel();
        }
        if let Some(listener) = listener {
            entry.listeners.push((id, listener));
        }
        Subscription {
            inner: Arc::downgrade(self),
            key: key.clone(),
            id,
        }
    }

    /// Release subscription `id`. Ids the entry never issued, e.g. from
    /// before a `dispose`, are ignored.
    fn detach(self: &Arc<Self>, key: &QueryKey, id: u64) {
        let mut store = self.lock();
        let Some(entry) = store.get_mut(key) else {
            return;
        };
        if !entry.subscribers.remove(&id) {
            return;
        }
        let (released, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut entry.listeners)
            .into_iter()
            .partition(|(listener, _)| *listener == id);
        entry.listeners = kept;
        if entry.subscribers.is_empty() {
            self.schedule_gc(key, entry);
        }
        drop(store);
        drop(released);
    }

    /// Remove the entry `gc_time` from now unless a subscriber attaches first
    fn schedule_gc(self: &Arc<Self>, key: &QueryKey, entry: &mut Entry) {
        if let Some(previous) = entry.gc.take() {
            previous.cancel();
        }
        let token = self.next_token();
        let gc_time = entry.policy.gc_time;
        let inner = Arc::downgrade(self);
        let owned_key = key.clone();
        let handle = Handle::try_current().ok().map(|handle| {
            handle.spawn(async move {
                tokio::time::sleep(gc_time).await;
                if let Some(inner) = inner.upgrade() {
                    inner.collect(&owned_key, token);
                }
            })
        });
        trace!(%key, ?gc_time, "gc scheduled");
        entry.gc = Some(GcTimer { token, handle });
    }

    fn collect(&self, key: &QueryKey, token: u64) {
        let mut store = self.lock();
        let expired = store.get(key).is_some_and(|entry| {
            entry.subscribers.is_empty() && entry.gc.as_ref().is_some_and(|gc| gc.token == token)
        });
        if !expired {
            return;
        }
        let evicted = store.remove(key);
        drop(store);
        debug!(%key, "evicted");
        drop(evicted);
    }
}

fn erase<T, F, Fut>(fetch: F) -> Fetcher
where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    Arc::new(move || {
        let fut = fetch();
        async move { fut.await.map(|value| Arc::new(value) as AnyData) }.boxed()
    })
}

fn downcast<T: Send + Sync + 'static>(
    key: &QueryKey,
    data: AnyData,
) -> std::result::Result<Arc<T>, Arc<Error>> {
    data.downcast::<T>()
        .map_err(|_| Arc::new(Error::TypeMismatch { key: key.to_string() }))
}

fn notify(key: &QueryKey, listeners: &[Listener]) {
    for listener in listeners {
        listener(key);
    }
}
