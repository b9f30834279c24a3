use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;

/// A trait for loading a batch of values by key from some datastore, such as
/// a bulk `SELECT ... WHERE id IN (...)`. Implementing `Fetcher` allows loads
/// to be batched and cached by a [`BatchLoader`](crate::BatchLoader).
pub trait Fetcher {
    /// The key used to request a value.
    type Key: Clone + Hash + Eq + Send + Sync;

    /// The value loaded for each key. Loaders that may find nothing for a key
    /// use `Option<T>` (one-to-one) or `Vec<T>` (one-to-many) here, so an
    /// absent row is an ordinary value rather than an error.
    type Value: Clone + Send + Sync;

    /// The error indicating that fetching a batch failed.
    type Error: Display + Send + Sync + 'static;

    /// Fetch the values for a batch of keys. Keys are unique and never empty.
    /// On success, the returned `Vec` must hold exactly one value per key, at
    /// the same index as its key. A `Vec` of any other length fails every
    /// pending load in the batch with [`LoadError::ShapeMismatch`](crate::LoadError::ShapeMismatch).
    /// If `Err(_)` is returned, every pending load in the batch receives a
    /// [`LoadError::FetchError`](crate::LoadError::FetchError).
    fn fetch(
        &self,
        keys: &[Self::Key],
    ) -> impl Future<Output = Result<Vec<Self::Value>, Self::Error>> + Send;
}
