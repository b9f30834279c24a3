//! The product catalog the loaders serve: its rows, the storage interface
//! they are fetched through, and one [`Fetcher`](crate::Fetcher) per
//! relationship.

pub(crate) mod loaders;
pub(crate) mod memory;
pub(crate) mod model;
pub(crate) mod storage;

pub use loaders::{
    CategoryById, ManufacturerById, ProductById, ProductsByCategory, ProductsByManufacturer,
    StockByProduct,
};
pub use memory::{MemoryStore, SeedConfig};
pub use model::{Category, Id, Manufacturer, Product, StockInfo};
pub use storage::{Storage, StorageError};
