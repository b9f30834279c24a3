use crate::cache::{LoaderState, Lookup, PendingLoad};
use crate::scheduler::{Flush, Scheduler, YieldScheduler};
use crate::Fetcher;
use std::borrow::Cow;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::Instrument;

/// Batches and caches loads from some datastore. A `BatchLoader` can be used
/// with any type that implements [`Fetcher`]. Cloning a `BatchLoader` is
/// shallow: clones share the same [`Fetcher`], cache and batch window.
///
/// A `BatchLoader` is designed to be ephemeral. In the context of a web
/// service, callers should create a new `BatchLoader` (usually through a
/// [`Loaders`](crate::Loaders) registry) for each request, and **not** share
/// one across requests. Cached values are never evicted or expired, so a
/// long-lived `BatchLoader` serves stale data and grows without bound.
///
/// ## Batching
///
/// The first key that misses the cache opens a batch window and asks the
/// [`Scheduler`] to flush it. The window stays open at least until a task
/// awaiting one of its loads has suspended, so every key that task registered
/// on the way (including keys from futures polled together, e.g. with
/// `tokio::join!`) ends up in one call to [`Fetcher::fetch`]. This holds on
/// multi-threaded runtimes too. Keys are registered when
/// [`load`](BatchLoader::load) is called, not when its future is first polled.
///
/// A flush de-duplicates its keys (keeping first-occurrence order) and calls
/// the [`Fetcher`] once with them. Flushes of one `BatchLoader` never overlap:
/// a window that closes while a previous batch is still fetching waits for it.
///
/// ## Load semantics
///
/// A key that is already cached or already waiting on a batch never triggers
/// another fetch until it's [cleared](BatchLoader::clear).
///
/// If the [`Fetcher`] returns an error, returns the wrong number of values,
/// or exceeds the fetch timeout, then every pending load in that batch fails
/// with the same [`LoadError`]. Failures are not cached, so a later load of the
/// same key **will retry**. Loads of keys in other batches are unaffected.
pub struct BatchLoader<F>
where
    F: Fetcher,
{
    inner: Arc<Inner<F>>,
}

struct Inner<F>
where
    F: Fetcher,
{
    label: Cow<'static, str>,
    fetcher: F,
    scheduler: Arc<dyn Scheduler>,
    max_batch_size: Option<usize>,
    fetch_timeout: Option<tokio::time::Duration>,
    state: Mutex<LoaderState<F::Key, F::Value>>,
    dispatch_lock: tokio::sync::Mutex<()>,
}

impl<F> BatchLoader<F>
where
    F: Fetcher + Send + Sync + 'static,
{
    /// Create a new `BatchLoader` that uses the given [`Fetcher`] to retrieve
    /// data. Returns a [`BatchLoaderBuilder`], which can be used to customize
    /// the `BatchLoader`. Call [`.finish()`](BatchLoaderBuilder::finish) to
    /// create the `BatchLoader`.
    pub fn build(fetcher: F) -> BatchLoaderBuilder<F> {
        BatchLoaderBuilder {
            fetcher,
            label: "unlabeled-batch-loader".into(),
            scheduler: Arc::new(YieldScheduler),
            max_batch_size: None,
            fetch_timeout: None,
            cache: true,
        }
    }

    /// Create a new `BatchLoader` with default options.
    pub fn new(fetcher: F) -> Self {
        Self::build(fetcher).finish()
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Load the value for the given key, either from the cache or by adding
    /// the key to the current batch. The key is registered immediately; the
    /// returned future resolves once the batch has been fetched.
    ///
    /// See the type-level docs for [`BatchLoader`](#load-semantics) for more
    /// detailed loading semantics.
    pub fn load(
        &self,
        key: F::Key,
    ) -> impl Future<Output = Result<F::Value, LoadError>> + Send + 'static {
        let pending = self.enqueue(key);
        let span = tracing::debug_span!("load", batch_loader = %self.inner.label);
        pending.wait().instrument(span)
    }

    /// Load the values for all the given keys. This is the same as calling
    /// [`load`](BatchLoader::load) for each key: all of them join the current
    /// batch. Values are returned in the same order as the input keys.
    /// Returns an error if _any_ load fails.
    pub fn load_many(
        &self,
        keys: &[F::Key],
    ) -> impl Future<Output = Result<Vec<F::Value>, LoadError>> + Send + 'static {
        let pending: Vec<_> = keys.iter().cloned().map(|key| self.enqueue(key)).collect();
        let span = tracing::debug_span!(
            "load_many",
            batch_loader = %self.inner.label,
            num_keys = keys.len(),
        );

        async move {
            let mut values = Vec::with_capacity(pending.len());
            for load in pending {
                values.push(load.wait().await?);
            }
            Ok(values)
        }
        .instrument(span)
    }

    /// Remove the cached value for `key`, so the next load fetches it again.
    /// Loads already waiting on a batch for `key` still receive its result.
    /// Returns `true` if there was an entry to remove.
    pub fn clear(&self, key: &F::Key) -> bool {
        let cleared = self.inner.lock_state().clear(key);
        tracing::debug!(batch_loader = %self.inner.label, cleared, "cleared key");
        cleared
    }

    /// Remove every cached value.
    pub fn clear_all(&self) {
        self.inner.lock_state().clear_all();
        tracing::debug!(batch_loader = %self.inner.label, "cleared all keys");
    }

    /// Seed the cache with a value for `key` without calling the [`Fetcher`].
    /// Does nothing if `key` is already cached or pending. Returns `true` if
    /// the value was stored.
    pub fn prime(&self, key: F::Key, value: F::Value) -> bool {
        self.inner.lock_state().prime(key, value, false)
    }

    /// Like [`prime`](BatchLoader::prime), but replaces any existing entry.
    /// Loads already waiting on a batch for `key` still receive the batch's
    /// result; later loads get `value`.
    pub fn prime_forced(&self, key: F::Key, value: F::Value) -> bool {
        self.inner.lock_state().prime(key, value, true)
    }

    /// Returns `true` if both loaders share the same cache and batch window.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn enqueue(&self, key: F::Key) -> PendingLoad<F::Value> {
        let lookup = self.inner.lock_state().lookup(key);
        match lookup {
            Lookup::Hit(value) => {
                tracing::trace!(batch_loader = %self.inner.label, "cache hit");
                PendingLoad::Ready(Ok(value))
            }
            Lookup::Joined { result_rx, gate } => {
                tracing::trace!(batch_loader = %self.inner.label, "joined pending key");
                PendingLoad::waiting(result_rx, gate)
            }
            Lookup::Queued {
                result_rx,
                gate,
                opens_window,
            } => {
                if opens_window {
                    tracing::trace!(batch_loader = %self.inner.label, "opened batch window");
                    let inner = self.inner.clone();
                    let window_gate = gate.clone();
                    let flush: Flush = Box::pin(async move {
                        window_gate.opened().await;
                        inner.flush().await;
                    });
                    self.inner.scheduler.schedule(flush);
                }
                PendingLoad::waiting(result_rx, gate)
            }
        }
    }
}

impl<F> Inner<F>
where
    F: Fetcher + Send + Sync + 'static,
{
    fn lock_state(&self) -> MutexGuard<'_, LoaderState<F::Key, F::Value>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn flush(&self) {
        let window = self.lock_state().take_window();
        let keys = window.unique_keys();
        if keys.is_empty() {
            tracing::trace!(batch_loader = %self.label, "batch window is empty, nothing to fetch");
            return;
        }

        let _dispatching = self.dispatch_lock.lock().await;

        tracing::debug!(
            batch_loader = %self.label,
            num_keys = keys.len(),
            num_waiters = window.len(),
            "flushing batch window",
        );

        let chunk_size = self.max_batch_size.unwrap_or(keys.len()).max(1);
        for chunk in keys.chunks(chunk_size) {
            let result = self.dispatch(chunk).await;
            self.lock_state().settle(&window, chunk, result);
        }
    }

    async fn dispatch(&self, keys: &[F::Key]) -> Result<Vec<F::Value>, LoadError> {
        tracing::trace!(batch_loader = %self.label, num_keys = keys.len(), "fetching keys");

        let fetch = self.fetcher.fetch(keys);
        let result = match self.fetch_timeout {
            Some(fetch_timeout) => match tokio::time::timeout(fetch_timeout, fetch).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::info!(batch_loader = %self.label, ?fetch_timeout, "fetch timed out");
                    return Err(LoadError::Timeout(fetch_timeout));
                }
            },
            None => fetch.await,
        };

        let values = result.map_err(|fetch_error| {
            tracing::info!(batch_loader = %self.label, "error returned while fetching keys: {fetch_error}");
            LoadError::FetchError(fetch_error.to_string())
        })?;

        if values.len() != keys.len() {
            tracing::info!(
                batch_loader = %self.label,
                expected = keys.len(),
                actual = values.len(),
                "fetcher returned the wrong number of values",
            );
            return Err(LoadError::ShapeMismatch {
                expected: keys.len(),
                actual: values.len(),
            });
        }

        tracing::debug!(batch_loader = %self.label, num_keys = keys.len(), "fetch returned successfully");
        Ok(values)
    }
}

impl<F> Clone for BatchLoader<F>
where
    F: Fetcher,
{
    fn clone(&self) -> Self {
        BatchLoader {
            inner: self.inner.clone(),
        }
    }
}

/// Used to configure a new [`BatchLoader`]. A `BatchLoaderBuilder` is
/// returned from [`BatchLoader::build`].
pub struct BatchLoaderBuilder<F>
where
    F: Fetcher + Send + Sync + 'static,
{
    fetcher: F,
    label: Cow<'static, str>,
    scheduler: Arc<dyn Scheduler>,
    max_batch_size: Option<usize>,
    fetch_timeout: Option<tokio::time::Duration>,
    cache: bool,
}

impl<F> BatchLoaderBuilder<F>
where
    F: Fetcher + Send + Sync + 'static,
{
    /// Set a label for the [`BatchLoader`]. This is only used to improve
    /// diagnostic messages, such as log messages.
    pub fn label(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.label = label.into();
        self
    }

    /// Decide when a batch window closes. Defaults to [`YieldScheduler`].
    pub fn scheduler(mut self, scheduler: impl Scheduler) -> Self {
        self.scheduler = Arc::new(scheduler);
        self
    }

    pub(crate) fn shared_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// The maximum number of keys passed to a single [`Fetcher::fetch`] call.
    /// A window with more keys is fetched in several consecutive calls. A
    /// value of `None` (the default) fetches each window in one call.
    pub fn max_batch_size(mut self, max_batch_size: Option<usize>) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    /// Fail a batch with [`LoadError::Timeout`] if [`Fetcher::fetch`] doesn't
    /// finish within the given time. Defaults to `None` (no timeout).
    pub fn fetch_timeout(mut self, fetch_timeout: Option<tokio::time::Duration>) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Whether to keep loaded values after their batch settles. When
    /// disabled, keys are still coalesced within a window but every new
    /// window fetches again. Enabled by default.
    pub fn cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    /// Create and return a [`BatchLoader`] with the given options.
    pub fn finish(self) -> BatchLoader<F> {
        let inner = Inner {
            label: self.label,
            fetcher: self.fetcher,
            scheduler: self.scheduler,
            max_batch_size: self.max_batch_size,
            fetch_timeout: self.fetch_timeout,
            state: Mutex::new(LoaderState::new(self.cache)),
            dispatch_lock: tokio::sync::Mutex::new(()),
        };

        BatchLoader {
            inner: Arc::new(inner),
        }
    }
}

/// Error indicating that loading one or more values from a [`BatchLoader`]
/// failed. A key that simply has no row is not an error; see [`Fetcher::Value`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// The [`Fetcher`] returned an error while loading the batch. The message
    /// contains the error message specified by [`Fetcher::Error`].
    #[error("error while fetching from batch: {}", _0)]
    FetchError(String),

    /// The [`Fetcher`] returned a different number of values than the number
    /// of keys it was given.
    #[error("fetcher returned {actual} values for {expected} keys")]
    ShapeMismatch { expected: usize, actual: usize },

    /// The [`Fetcher`] didn't finish within the configured fetch timeout.
    #[error("fetch timed out after {:?}", _0)]
    Timeout(tokio::time::Duration),

    /// The batch was dropped before it settled, e.g. because the runtime shut
    /// down or the [`Fetcher`] panicked.
    #[error("batch was cancelled before it settled")]
    Cancelled,
}
