//! Request-scoped batching and caching loaders for a product catalog.
//!
//! A [`BatchLoader`] coalesces the single-key loads issued while resolving a
//! request into one [`Fetcher`] call per batch window and caches the results,
//! so walking a nested result graph costs one storage query per relationship
//! and level instead of one per row. A [`Loaders`] registry hands out one
//! loader per relationship for the lifetime of a request.

pub(crate) mod batch_loader;
pub(crate) mod cache;
pub mod catalog;
pub(crate) mod fetcher;
pub mod order;
pub(crate) mod registry;
pub(crate) mod scheduler;

pub use batch_loader::{BatchLoader, BatchLoaderBuilder, LoadError};
pub use fetcher::Fetcher;
pub use registry::{LoaderKind, LoaderName, LoaderOptions, Loaders, RegistryError};
pub use scheduler::{DelayScheduler, Flush, Scheduler, YieldScheduler};
