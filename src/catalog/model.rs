use crate::order::Row;

pub type Id = i64;

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: Id,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Manufacturer {
    pub id: Id,
    pub name: String,
    pub country: String,
    pub rating: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: Id,
    pub name: String,
    pub price: f64,
    pub category_id: Id,
    pub manufacturer_id: Id,
}

/// Stock held for one product. There is at most one record per product.
#[derive(Debug, Clone, PartialEq)]
pub struct StockInfo {
    pub id: Id,
    pub product_id: Id,
    pub quantity: i64,
    pub location: String,
    /// RFC 3339 timestamp of the last stock change.
    pub last_updated: String,
}

impl Row for Category {
    type Id = Id;

    fn id(&self) -> Id {
        self.id
    }
}

impl Row for Manufacturer {
    type Id = Id;

    fn id(&self) -> Id {
        self.id
    }
}

impl Row for Product {
    type Id = Id;

    fn id(&self) -> Id {
        self.id
    }
}

impl Row for StockInfo {
    type Id = Id;

    fn id(&self) -> Id {
        self.id
    }
}
