#![allow(unused)]

use async_trait::async_trait;
use catalog_loader::catalog::{
    Category, Id, Manufacturer, MemoryStore, Product, StockInfo, Storage, StorageError,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::stubs::Counter;

pub struct Catalog {
    pub store: Arc<MemoryStore>,
    pub categories: Vec<Category>,
    pub manufacturers: Vec<Manufacturer>,
    pub products: Vec<Product>,
    pub stock: Vec<StockInfo>,
}

impl Catalog {
    /// A catalog of 4 categories and 5 manufacturers. Product `n` belongs to
    /// category `n % 3 + 1` and manufacturer `n % 5 + 1`; every product except
    /// multiples of 10 has a stock record. Category 4 has no products.
    pub fn fake() -> Self {
        let store = Arc::new(MemoryStore::new());

        let categories: Vec<_> = (1..=4)
            .map(|id: Id| Category {
                id,
                name: fakeit::words::sentence(1),
            })
            .collect();
        let manufacturers: Vec<_> = (1..=5)
            .map(|id: Id| Manufacturer {
                id,
                name: fakeit::name::full(),
                country: fakeit::words::sentence(1),
                rating: 3.0 + id as f64 / 5.0,
            })
            .collect();
        let products: Vec<_> = (1..=60)
            .map(|id: Id| Product {
                id,
                name: fakeit::words::sentence(3),
                price: 100.0 + id as f64,
                category_id: id % 3 + 1,
                manufacturer_id: id % 5 + 1,
            })
            .collect();
        let stock: Vec<_> = products
            .iter()
            .filter(|product| product.id % 10 != 0)
            .map(|product| StockInfo {
                id: product.id + 1000,
                product_id: product.id,
                quantity: product.id * 3,
                location: fakeit::words::sentence(2),
                last_updated: "2024-05-01T12:00:00Z".into(),
            })
            .collect();

        for category in &categories {
            store.insert_category(category.clone()).unwrap();
        }
        for manufacturer in &manufacturers {
            store.insert_manufacturer(manufacturer.clone()).unwrap();
        }
        for product in &products {
            store.insert_product(product.clone()).unwrap();
        }
        for stock in &stock {
            store.insert_stock(stock.clone()).unwrap();
        }

        Catalog {
            store,
            categories,
            manufacturers,
            products,
            stock,
        }
    }

    pub fn storage(&self) -> Arc<dyn Storage> {
        self.store.clone()
    }
}

/// Wraps a `Storage`, counting the calls made to each method and optionally
/// failing one of them.
#[derive(Clone)]
pub struct ObserveStorage {
    storage: Arc<dyn Storage>,
    calls: Arc<RwLock<HashMap<&'static str, Counter>>>,
    failing: Option<&'static str>,
}

impl ObserveStorage {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        ObserveStorage {
            storage,
            calls: Default::default(),
            failing: None,
        }
    }

    /// Make every call to `method` fail with `StorageError::Unavailable`.
    pub fn failing(mut self, method: &'static str) -> Self {
        self.failing = Some(method);
        self
    }

    pub fn calls(&self, method: &str) -> usize {
        let calls = self.calls.read().unwrap();
        calls.get(method).map(|count| count.count()).unwrap_or_default()
    }

    pub fn total_calls(&self) -> usize {
        let calls = self.calls.read().unwrap();
        calls.values().map(|count| count.count()).sum()
    }

    fn observe(&self, method: &'static str) -> Result<(), StorageError> {
        self.calls.write().unwrap().entry(method).or_default().inc();
        if self.failing == Some(method) {
            return Err(StorageError::Unavailable(format!("{method} is down")));
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for ObserveStorage {
    async fn categories(&self) -> Result<Vec<Category>, StorageError> {
        self.observe("categories")?;
        self.storage.categories().await
    }

    async fn categories_by_ids(&self, ids: &[Id]) -> Result<Vec<Category>, StorageError> {
        self.observe("categories_by_ids")?;
        self.storage.categories_by_ids(ids).await
    }

    async fn manufacturers_by_ids(&self, ids: &[Id]) -> Result<Vec<Manufacturer>, StorageError> {
        self.observe("manufacturers_by_ids")?;
        self.storage.manufacturers_by_ids(ids).await
    }

    async fn products_by_ids(&self, ids: &[Id]) -> Result<Vec<Product>, StorageError> {
        self.observe("products_by_ids")?;
        self.storage.products_by_ids(ids).await
    }

    async fn products_by_category_ids(&self, ids: &[Id]) -> Result<Vec<Product>, StorageError> {
        self.observe("products_by_category_ids")?;
        self.storage.products_by_category_ids(ids).await
    }

    async fn products_by_manufacturer_ids(
        &self,
        ids: &[Id],
    ) -> Result<Vec<Product>, StorageError> {
        self.observe("products_by_manufacturer_ids")?;
        self.storage.products_by_manufacturer_ids(ids).await
    }

    async fn stock_by_product_ids(&self, ids: &[Id]) -> Result<Vec<StockInfo>, StorageError> {
        self.observe("stock_by_product_ids")?;
        self.storage.stock_by_product_ids(ids).await
    }
}
