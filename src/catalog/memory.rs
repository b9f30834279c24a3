use crate::catalog::model::{Category, Id, Manufacturer, Product, StockInfo};
use crate::catalog::storage::{Storage, StorageError};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

const COUNTRIES: &[&str] = &["Germany", "Japan", "United States", "Sweden", "Italy", "Brazil"];

/// Sizes for [`MemoryStore::seed`].
#[derive(Debug, Clone)]
pub struct SeedConfig {
    pub categories_count: usize,
    pub manufacturers_per_category: usize,
    pub products_per_manufacturer: usize,
    /// Written to every seeded stock record's `last_updated`.
    pub last_updated: String,
}

impl Default for SeedConfig {
    fn default() -> Self {
        SeedConfig {
            categories_count: 3,
            manufacturers_per_category: 3,
            products_per_manufacturer: 3,
            last_updated: "2024-01-01T00:00:00Z".into(),
        }
    }
}

#[derive(Default)]
struct Tables {
    categories: Vec<Category>,
    manufacturers: Vec<Manufacturer>,
    products: Vec<Product>,
    stock: Vec<StockInfo>,
}

/// A [`Storage`] that keeps the catalog in memory. Rows are returned in
/// insertion order, which callers must not rely on.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fill an empty store with generated rows: `categories_count`
    /// categories, `manufacturers_per_category` manufacturers for each of
    /// them, and `products_per_manufacturer` products (each with a stock
    /// record) for each manufacturer. Returns `false` without changing
    /// anything if the store already has categories.
    pub fn seed(&self, config: &SeedConfig) -> bool {
        let mut tables = self.write();
        if !tables.categories.is_empty() {
            tracing::info!("catalog already seeded");
            return false;
        }

        let mut manufacturer_id = 1;
        let mut product_id = 1;
        for category_id in 1..=config.categories_count as Id {
            tables.categories.push(Category {
                id: category_id,
                name: format!("Category {category_id}"),
            });

            for _ in 0..config.manufacturers_per_category {
                tables.manufacturers.push(Manufacturer {
                    id: manufacturer_id,
                    name: format!("Manufacturer {manufacturer_id}"),
                    country: COUNTRIES[manufacturer_id as usize % COUNTRIES.len()].into(),
                    rating: 3.0 + (manufacturer_id % 21) as f64 / 10.0,
                });

                for _ in 0..config.products_per_manufacturer {
                    tables.products.push(Product {
                        id: product_id,
                        name: format!("Product {product_id}"),
                        price: 100.0 + ((product_id * 37) % 1900) as f64,
                        category_id,
                        manufacturer_id,
                    });
                    tables.stock.push(StockInfo {
                        id: product_id,
                        product_id,
                        quantity: (product_id * 17) % 1001,
                        location: format!("Warehouse {}", product_id % 7 + 1),
                        last_updated: config.last_updated.clone(),
                    });
                    product_id += 1;
                }

                manufacturer_id += 1;
            }
        }

        tracing::info!(
            categories = tables.categories.len(),
            manufacturers = tables.manufacturers.len(),
            products = tables.products.len(),
            stock = tables.stock.len(),
            "seeded catalog",
        );
        true
    }

    /// Delete every row from every table.
    pub fn wipe(&self) {
        let mut tables = self.write();
        *tables = Tables::default();
        tracing::info!("wiped catalog");
    }

    pub fn insert_category(&self, category: Category) -> Result<(), StorageError> {
        let mut tables = self.write();
        if tables.categories.iter().any(|row| row.id == category.id) {
            return Err(StorageError::DuplicateId {
                table: "categories",
                id: category.id,
            });
        }
        tables.categories.push(category);
        Ok(())
    }

    pub fn insert_manufacturer(&self, manufacturer: Manufacturer) -> Result<(), StorageError> {
        let mut tables = self.write();
        if tables.manufacturers.iter().any(|row| row.id == manufacturer.id) {
            return Err(StorageError::DuplicateId {
                table: "manufacturers",
                id: manufacturer.id,
            });
        }
        tables.manufacturers.push(manufacturer);
        Ok(())
    }

    pub fn insert_product(&self, product: Product) -> Result<(), StorageError> {
        let mut tables = self.write();
        if tables.products.iter().any(|row| row.id == product.id) {
            return Err(StorageError::DuplicateId {
                table: "products",
                id: product.id,
            });
        }
        if !tables.categories.iter().any(|row| row.id == product.category_id) {
            return Err(StorageError::MissingReference {
                table: "products",
                references: "categories",
                id: product.category_id,
            });
        }
        if !tables
            .manufacturers
            .iter()
            .any(|row| row.id == product.manufacturer_id)
        {
            return Err(StorageError::MissingReference {
                table: "products",
                references: "manufacturers",
                id: product.manufacturer_id,
            });
        }
        tables.products.push(product);
        Ok(())
    }

    /// Insert a stock record. Each product has at most one.
    pub fn insert_stock(&self, stock: StockInfo) -> Result<(), StorageError> {
        let mut tables = self.write();
        if tables.stock.iter().any(|row| row.id == stock.id) {
            return Err(StorageError::DuplicateId {
                table: "stock_info",
                id: stock.id,
            });
        }
        if tables.stock.iter().any(|row| row.product_id == stock.product_id) {
            return Err(StorageError::DuplicateId {
                table: "stock_info",
                id: stock.product_id,
            });
        }
        if !tables.products.iter().any(|row| row.id == stock.product_id) {
            return Err(StorageError::MissingReference {
                table: "stock_info",
                references: "products",
                id: stock.product_id,
            });
        }
        tables.stock.push(stock);
        Ok(())
    }

    /// Set the stock quantity of a product. Returns `false` if the product
    /// has no stock record.
    pub fn set_stock_quantity(&self, product_id: Id, quantity: i64, last_updated: &str) -> bool {
        let mut tables = self.write();
        match tables.stock.iter_mut().find(|row| row.product_id == product_id) {
            Some(stock) => {
                stock.quantity = quantity;
                stock.last_updated = last_updated.to_owned();
                true
            }
            None => false,
        }
    }
}

fn select<R: Clone>(rows: &[R], ids: &[Id], column: impl Fn(&R) -> Id) -> Vec<R> {
    let ids: HashSet<Id> = ids.iter().copied().collect();
    rows.iter()
        .filter(|row| ids.contains(&column(row)))
        .cloned()
        .collect()
}

#[async_trait]
impl Storage for MemoryStore {
    async fn categories(&self) -> Result<Vec<Category>, StorageError> {
        Ok(self.read().categories.clone())
    }

    async fn categories_by_ids(&self, ids: &[Id]) -> Result<Vec<Category>, StorageError> {
        Ok(select(&self.read().categories, ids, |row| row.id))
    }

    async fn manufacturers_by_ids(&self, ids: &[Id]) -> Result<Vec<Manufacturer>, StorageError> {
        Ok(select(&self.read().manufacturers, ids, |row| row.id))
    }

    async fn products_by_ids(&self, ids: &[Id]) -> Result<Vec<Product>, StorageError> {
        Ok(select(&self.read().products, ids, |row| row.id))
    }

    async fn products_by_category_ids(&self, ids: &[Id]) -> Result<Vec<Product>, StorageError> {
        Ok(select(&self.read().products, ids, |row| row.category_id))
    }

    async fn products_by_manufacturer_ids(
        &self,
        ids: &[Id],
    ) -> Result<Vec<Product>, StorageError> {
        Ok(select(&self.read().products, ids, |row| row.manufacturer_id))
    }

    async fn stock_by_product_ids(&self, ids: &[Id]) -> Result<Vec<StockInfo>, StorageError> {
        Ok(select(&self.read().stock, ids, |row| row.product_id))
    }
}
