use crate::catalog::model::{Category, Id, Manufacturer, Product, StockInfo};
use async_trait::async_trait;

/// Bulk access to the catalog tables. Each `*_by_*` method returns every row
/// whose key column is in `ids`, in any order. Rows for unknown ids are
/// simply absent, and a row may be returned more than once.
///
/// Implementations should enforce their own timeouts; a timed out query is
/// reported as a [`StorageError`] and fails only the batch that issued it.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn categories(&self) -> Result<Vec<Category>, StorageError>;

    async fn categories_by_ids(&self, ids: &[Id]) -> Result<Vec<Category>, StorageError>;

    async fn manufacturers_by_ids(&self, ids: &[Id]) -> Result<Vec<Manufacturer>, StorageError>;

    async fn products_by_ids(&self, ids: &[Id]) -> Result<Vec<Product>, StorageError>;

    async fn products_by_category_ids(&self, ids: &[Id]) -> Result<Vec<Product>, StorageError>;

    async fn products_by_manufacturer_ids(
        &self,
        ids: &[Id],
    ) -> Result<Vec<Product>, StorageError>;

    async fn stock_by_product_ids(&self, ids: &[Id]) -> Result<Vec<StockInfo>, StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage is unavailable: {0}")]
    Unavailable(String),

    #[error("query on {table} timed out")]
    Timeout { table: &'static str },

    #[error("{table} already has a row with id {id}")]
    DuplicateId { table: &'static str, id: Id },

    #[error("{table} references missing {references} row {id}")]
    MissingReference {
        table: &'static str,
        references: &'static str,
        id: Id,
    },
}
