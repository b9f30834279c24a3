//! One [`Fetcher`] per relationship in the catalog. Each pairs a single bulk
//! [`Storage`] query with the ordering operation matching the relationship's
//! shape: `Option<T>` values for one-to-one, `Vec<T>` values for one-to-many.

use crate::catalog::model::{Category, Id, Manufacturer, Product, StockInfo};
use crate::catalog::storage::{Storage, StorageError};
use crate::order::{one_to_many_by, one_to_one, one_to_one_by};
use crate::Fetcher;
use std::sync::Arc;

macro_rules! storage_fetcher {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name {
            storage: Arc<dyn Storage>,
        }

        impl $name {
            pub fn new(storage: Arc<dyn Storage>) -> Self {
                $name { storage }
            }
        }
    };
}

storage_fetcher! {
    /// Category by its id.
    CategoryById
}

storage_fetcher! {
    /// Manufacturer by its id.
    ManufacturerById
}

storage_fetcher! {
    /// Product by its id.
    ProductById
}

storage_fetcher! {
    /// All products in a category, keyed by category id.
    ProductsByCategory
}

storage_fetcher! {
    /// All products made by a manufacturer, keyed by manufacturer id.
    ProductsByManufacturer
}

storage_fetcher! {
    /// The stock record of a product, keyed by product id.
    StockByProduct
}

impl Fetcher for CategoryById {
    type Key = Id;
    type Value = Option<Category>;
    type Error = StorageError;

    async fn fetch(&self, keys: &[Id]) -> Result<Vec<Option<Category>>, StorageError> {
        let rows = self.storage.categories_by_ids(keys).await?;
        Ok(one_to_one(keys, rows))
    }
}

impl Fetcher for ManufacturerById {
    type Key = Id;
    type Value = Option<Manufacturer>;
    type Error = StorageError;

    async fn fetch(&self, keys: &[Id]) -> Result<Vec<Option<Manufacturer>>, StorageError> {
        let rows = self.storage.manufacturers_by_ids(keys).await?;
        Ok(one_to_one(keys, rows))
    }
}

impl Fetcher for ProductById {
    type Key = Id;
    type Value = Option<Product>;
    type Error = StorageError;

    async fn fetch(&self, keys: &[Id]) -> Result<Vec<Option<Product>>, StorageError> {
        let rows = self.storage.products_by_ids(keys).await?;
        Ok(one_to_one(keys, rows))
    }
}

impl Fetcher for ProductsByCategory {
    type Key = Id;
    type Value = Vec<Product>;
    type Error = StorageError;

    async fn fetch(&self, keys: &[Id]) -> Result<Vec<Vec<Product>>, StorageError> {
        let rows = self.storage.products_by_category_ids(keys).await?;
        Ok(one_to_many_by(keys, rows, |product| product.category_id))
    }
}

impl Fetcher for ProductsByManufacturer {
    type Key = Id;
    type Value = Vec<Product>;
    type Error = StorageError;

    async fn fetch(&self, keys: &[Id]) -> Result<Vec<Vec<Product>>, StorageError> {
        let rows = self.storage.products_by_manufacturer_ids(keys).await?;
        Ok(one_to_many_by(keys, rows, |product| product.manufacturer_id))
    }
}

impl Fetcher for StockByProduct {
    type Key = Id;
    type Value = Option<StockInfo>;
    type Error = StorageError;

    async fn fetch(&self, keys: &[Id]) -> Result<Vec<Option<StockInfo>>, StorageError> {
        let rows = self.storage.stock_by_product_ids(keys).await?;
        Ok(one_to_one_by(keys, rows, |stock| stock.product_id))
    }
}
