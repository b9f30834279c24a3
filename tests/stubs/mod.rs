#![allow(unused)]

use catalog_loader::Fetcher;
use std::collections::HashMap;
use std::sync::{atomic, Arc, RwLock};

/// Print library logs for a test run, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Default, Clone)]
pub struct Counter {
    count: Arc<atomic::AtomicUsize>,
}

impl Counter {
    pub fn new() -> Self {
        Counter::default()
    }

    pub fn inc(&self) {
        self.count.fetch_add(1, atomic::Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.count.load(atomic::Ordering::SeqCst)
    }
}

/// Wraps a `Fetcher`, recording every batch it is called with.
pub struct ObserveFetcher<F>
where
    F: Fetcher,
{
    fetcher: Arc<F>,
    total_calls: Counter,
    calls_per_key: Arc<RwLock<HashMap<F::Key, Counter>>>,
    batches: Arc<RwLock<Vec<Vec<F::Key>>>>,
}

impl<F> ObserveFetcher<F>
where
    F: Fetcher,
{
    pub fn new(fetcher: F) -> Self {
        ObserveFetcher {
            fetcher: Arc::new(fetcher),
            total_calls: Counter::new(),
            calls_per_key: Default::default(),
            batches: Default::default(),
        }
    }

    pub fn total_calls(&self) -> usize {
        self.total_calls.count()
    }

    pub fn calls_for_key(&self, key: &F::Key) -> usize {
        let calls_per_key = self.calls_per_key.read().unwrap();
        calls_per_key
            .get(key)
            .map(|count| count.count())
            .unwrap_or_default()
    }

    pub fn batches(&self) -> Vec<Vec<F::Key>> {
        self.batches.read().unwrap().clone()
    }
}

impl<F> Clone for ObserveFetcher<F>
where
    F: Fetcher,
{
    fn clone(&self) -> Self {
        ObserveFetcher {
            fetcher: self.fetcher.clone(),
            total_calls: self.total_calls.clone(),
            calls_per_key: self.calls_per_key.clone(),
            batches: self.batches.clone(),
        }
    }
}

impl<F> Fetcher for ObserveFetcher<F>
where
    F: Fetcher + Send + Sync,
{
    type Key = F::Key;
    type Value = F::Value;
    type Error = F::Error;

    async fn fetch(&self, keys: &[Self::Key]) -> Result<Vec<Self::Value>, Self::Error> {
        {
            self.total_calls.inc();
            let mut calls_per_key = self.calls_per_key.write().unwrap();
            for key in keys {
                calls_per_key.entry(key.clone()).or_default().inc();
            }
            self.batches.write().unwrap().push(keys.to_vec());
        }

        self.fetcher.fetch(keys).await
    }
}

/// Returns each key as its own value.
pub struct FetchIdent;

impl Fetcher for FetchIdent {
    type Key = u64;
    type Value = u64;
    type Error = anyhow::Error;

    async fn fetch(&self, keys: &[u64]) -> anyhow::Result<Vec<u64>> {
        Ok(keys.to_vec())
    }
}

/// Wraps a `Fetcher`, dropping the last value of every batch.
pub struct FetcherDropsLast<F>(pub F);

impl<F> Fetcher for FetcherDropsLast<F>
where
    F: Fetcher + Sync,
{
    type Key = F::Key;
    type Value = F::Value;
    type Error = F::Error;

    async fn fetch(&self, keys: &[Self::Key]) -> Result<Vec<Self::Value>, Self::Error> {
        let mut values = self.0.fetch(keys).await?;
        values.pop();
        Ok(values)
    }
}
