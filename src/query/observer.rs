//! Binds one consumer to one key at a time

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tracing::trace;

use super::client::{QueryClient, QueryState, Subscription};
use super::key::QueryKey;
use super::policy::CachePolicy;
use crate::error::{Error, Result};

type TypedFetcher<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T>> + Send + Sync>;

/// A key, its cache policy and the function that fetches it
pub struct QueryRequest<T> {
    key: QueryKey,
    policy: CachePolicy,
    fetch: TypedFetcher<T>,
}

impl<T: Send + Sync + 'static> QueryRequest<T> {
    pub fn new<F, Fut>(key: QueryKey, policy: CachePolicy, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self {
            key,
            policy,
            fetch: Arc::new(move || fetch().boxed()),
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Lookup-or-fetch through `client` without waiting
    pub fn query(&self, client: &QueryClient) -> QueryState<T> {
        let fetch = Arc::clone(&self.fetch);
        client.query(&self.key, self.policy, move || fetch())
    }

    /// Lookup-or-fetch through `client`, waiting for data
    pub async fn fetch(&self, client: &QueryClient) -> std::result::Result<Arc<T>, Arc<Error>> {
        let fetch = Arc::clone(&self.fetch);
        client.fetch_query(&self.key, self.policy, move || fetch()).await
    }

    /// Warm the cache without subscribing
    pub async fn prefetch(&self, client: &QueryClient) {
        let fetch = Arc::clone(&self.fetch);
        client
            .prefetch::<T, _, _>(&self.key, self.policy, move || fetch())
            .await;
    }
}

impl<T> Clone for QueryRequest<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            policy: self.policy,
            fetch: Arc::clone(&self.fetch),
        }
    }
}

impl<T> fmt::Debug for QueryRequest<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryRequest")
            .field("key", &self.key)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObserverOptions {
    /// Show the previous key's data while the new key loads
    pub keep_previous_data: bool,
}

struct Active<T> {
    request: QueryRequest<T>,
    _subscription: Subscription,
}

/// A consumer's view of the cache
///
/// Holds a subscription to its current key, so the entry is never collected
/// while the observer lives. A disabled observer (no request) does nothing
/// and reports an idle state.
pub struct QueryObserver<T> {
    client: QueryClient,
    options: ObserverOptions,
    active: Option<Active<T>>,
    placeholder: Option<Arc<T>>,
}

impl<T: Send + Sync + 'static> QueryObserver<T> {
    pub fn new(client: &QueryClient, options: ObserverOptions) -> Self {
        Self {
            client: client.clone(),
            options,
            active: None,
            placeholder: None,
        }
    }

    /// Create an observer and point it at `request` right away
    pub fn with_request(
        client: &QueryClient,
        options: ObserverOptions,
        request: Option<QueryRequest<T>>,
    ) -> Self {
        let mut observer = Self::new(client, options);
        observer.set_query(request);
        observer
    }

    /// Point the observer at a new request, or disable it with `None`
    ///
    /// Setting the same key again only repeats the lookup, which refetches
    /// when the data has gone stale.
    pub fn set_query(&mut self, request: Option<QueryRequest<T>>) {
        let Some(request) = request else {
            if self.active.take().is_some() {
                trace!("observer disabled");
            }
            self.placeholder = None;
            return;
        };

        if let Some(active) = self.active.as_mut() {
            if active.request.key == request.key {
                request.query(&self.client);
                active.request = request;
                return;
            }
        }

        if self.options.keep_previous_data {
            let previous = self.state();
            if previous.data.is_some() {
                self.placeholder = previous.data;
            }
        } else {
            self.placeholder = None;
        }

        trace!(key = %request.key, "observer switching key");
        request.query(&self.client);
        let subscription = self.client.subscribe(&request.key);
        self.active = Some(Active {
            request,
            _subscription: subscription,
        });
    }

    /// Current snapshot, with placeholder data filled in when the key has none
    pub fn state(&self) -> QueryState<T> {
        let Some(active) = &self.active else {
            return QueryState::idle();
        };
        let mut state = self.client.state::<T>(&active.request.key);
        if state.data.is_none() {
            if let Some(placeholder) = &self.placeholder {
                state.data = Some(Arc::clone(placeholder));
                state.is_placeholder = true;
            }
        }
        state
    }

    /// Force a new fetch for the current key
    pub async fn refetch(&self) -> std::result::Result<Arc<T>, Arc<Error>> {
        match &self.active {
            Some(active) => self.client.refetch::<T>(&active.request.key).await,
            None => Err(Arc::new(Error::QueryDisabled)),
        }
    }

    /// Wait for any in-flight fetch of the current key, then return the state
    pub async fn settled(&self) -> QueryState<T> {
        if let Some(active) = &self.active {
            self.client.wait_for(&active.request.key).await;
        }
        self.state()
    }

    /// Listen for state changes of the current key
    ///
    /// Returns `None` when disabled. The listener stays bound to the key it
    /// was registered for.
    pub fn on_change<F>(&self, callback: F) -> Option<Subscription>
    where
        F: Fn(&QueryKey) + Send + Sync + 'static,
    {
        let active = self.active.as_ref()?;
        Some(self.client.on_change(&active.request.key, callback))
    }

    pub fn is_enabled(&self) -> bool {
        self.active.is_some()
    }

    pub fn key(&self) -> Option<&QueryKey> {
        self.active.as_ref().map(|a| &a.request.key)
    }
}

impl<T> fmt::Debug for QueryObserver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryObserver")
            .field("key", &self.active.as_ref().map(|a| &a.request.key))
            .field("options", &self.options)
            .field("has_placeholder", &self.placeholder.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::client::{ClientOptions, QueryStatus};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn policy() -> CachePolicy {
        CachePolicy::new(Duration::from_secs(600), Duration::from_secs(3600))
    }

    fn request(name: &str, calls: &Arc<AtomicUsize>) -> QueryRequest<String> {
        let calls = Arc::clone(calls);
        let value = name.to_string();
        QueryRequest::new(QueryKey::root("search").segment(name), policy(), move || {
            calls.fetch_add(1, Ordering::SeqCst);
            let value = value.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(format!("results for {value}"))
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_observer_never_fetches() {
        let client = QueryClient::new(ClientOptions::default());
        let observer = QueryObserver::<String>::with_request(&client, ObserverOptions::default(), None);

        let state = observer.settled().await;
        assert_eq!(state.status, QueryStatus::Idle);
        assert!(!observer.is_enabled());
        assert!(client.is_empty());

        let err = observer.refetch().await.unwrap_err();
        assert!(matches!(*err, Error::QueryDisabled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_observer_fetches_and_holds_subscription() {
        let client = QueryClient::new(ClientOptions::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let req = request("berlin", &calls);
        let key = req.key().clone();

        let observer = QueryObserver::with_request(&client, ObserverOptions::default(), Some(req));
        assert!(observer.state().is_loading());

        let state = observer.settled().await;
        assert_eq!(state.data.as_deref().map(String::as_str), Some("results for berlin"));
        assert_eq!(client.subscriber_count(&key), 1);

        // Long past gc_time, still alive while observed
        tokio::time::sleep(Duration::from_secs(7200)).await;
        assert!(client.contains(&key));

        drop(observer);
        assert_eq!(client.subscriber_count(&key), 0);
        tokio::time::sleep(Duration::from_secs(3601)).await;
        assert!(!client.contains(&key));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keep_previous_data_shows_placeholder() {
        let client = QueryClient::new(ClientOptions::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let options = ObserverOptions {
            keep_previous_data: true,
        };
        let mut observer = QueryObserver::with_request(&client, options, Some(request("ber", &calls)));
        observer.settled().await;

        observer.set_query(Some(request("berl", &calls)));
        let state = observer.state();
        assert!(state.is_placeholder);
        assert_eq!(state.status, QueryStatus::Pending);
        assert_eq!(state.data.as_deref().map(String::as_str), Some("results for ber"));

        let state = observer.settled().await;
        assert!(!state.is_placeholder);
        assert_eq!(state.data.as_deref().map(String::as_str), Some("results for berl"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_without_keep_previous_data_switch_shows_loading() {
        let client = QueryClient::new(ClientOptions::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let mut observer =
            QueryObserver::with_request(&client, ObserverOptions::default(), Some(request("a", &calls)));
        observer.settled().await;

        observer.set_query(Some(request("b", &calls)));
        let state = observer.state();
        assert!(state.is_loading());
        assert!(!state.is_placeholder);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_key_does_not_refetch_fresh_data() {
        let client = QueryClient::new(ClientOptions::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let mut observer =
            QueryObserver::with_request(&client, ObserverOptions::default(), Some(request("x", &calls)));
        observer.settled().await;

        observer.set_query(Some(request("x", &calls)));
        observer.set_query(Some(request("x", &calls)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(client.subscriber_count(observer.key().unwrap()), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabling_releases_subscription() {
        let client = QueryClient::new(ClientOptions::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let req = request("y", &calls);
        let key = req.key().clone();
        let mut observer = QueryObserver::with_request(&client, ObserverOptions::default(), Some(req));
        observer.settled().await;

        observer.set_query(None);
        assert_eq!(client.subscriber_count(&key), 0);
        assert_eq!(observer.state().status, QueryStatus::Idle);
    }
}
