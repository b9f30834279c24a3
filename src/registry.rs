use crate::catalog::{
    CategoryById, ManufacturerById, ProductById, ProductsByCategory, ProductsByManufacturer,
    StockByProduct, Storage,
};
use crate::scheduler::Scheduler;
use crate::{BatchLoader, BatchLoaderBuilder, Fetcher};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

/// The loaders a [`Loaders`] registry can hand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoaderKind {
    CategoryById,
    ManufacturerById,
    ProductById,
    ProductsByCategory,
    ProductsByManufacturer,
    StockByProduct,
}

impl LoaderKind {
    pub const ALL: [LoaderKind; 6] = [
        LoaderKind::CategoryById,
        LoaderKind::ManufacturerById,
        LoaderKind::ProductById,
        LoaderKind::ProductsByCategory,
        LoaderKind::ProductsByManufacturer,
        LoaderKind::StockByProduct,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LoaderKind::CategoryById => "category",
            LoaderKind::ManufacturerById => "manufacturer",
            LoaderKind::ProductById => "product",
            LoaderKind::ProductsByCategory => "category_products",
            LoaderKind::ProductsByManufacturer => "manufacturer_products",
            LoaderKind::StockByProduct => "product_stock",
        }
    }
}

impl fmt::Display for LoaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoaderKind {
    type Err = RegistryError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        LoaderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == name)
            .ok_or_else(|| RegistryError::UnknownLoader(name.to_owned()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("no loader named {0:?}")]
    UnknownLoader(String),
}

/// A [`Fetcher`] that a [`Loaders`] registry knows how to construct.
pub trait LoaderName: Fetcher + Send + Sync + Sized + 'static {
    const KIND: LoaderKind;

    fn from_storage(storage: Arc<dyn Storage>) -> Self;

    fn slot(loaders: &Loaders) -> &OnceLock<BatchLoader<Self>>;
}

macro_rules! loader_name {
    ($fetcher:ident, $field:ident) => {
        impl LoaderName for $fetcher {
            const KIND: LoaderKind = LoaderKind::$fetcher;

            fn from_storage(storage: Arc<dyn Storage>) -> Self {
                $fetcher::new(storage)
            }

            fn slot(loaders: &Loaders) -> &OnceLock<BatchLoader<Self>> {
                &loaders.$field
            }
        }
    };
}

loader_name!(CategoryById, category_by_id);
loader_name!(ManufacturerById, manufacturer_by_id);
loader_name!(ProductById, product_by_id);
loader_name!(ProductsByCategory, products_by_category);
loader_name!(ProductsByManufacturer, products_by_manufacturer);
loader_name!(StockByProduct, stock_by_product);

/// Options applied to a loader when a [`Loaders`] registry constructs it.
#[derive(Clone)]
pub struct LoaderOptions {
    /// Defaults to the loader's [`LoaderKind`] name.
    pub label: Option<Cow<'static, str>>,
    /// Defaults to [`YieldScheduler`](crate::YieldScheduler).
    pub scheduler: Option<Arc<dyn Scheduler>>,
    pub max_batch_size: Option<usize>,
    pub fetch_timeout: Option<tokio::time::Duration>,
    pub cache: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        LoaderOptions {
            label: None,
            scheduler: None,
            max_batch_size: None,
            fetch_timeout: None,
            cache: true,
        }
    }
}

impl LoaderOptions {
    fn apply<F>(&self, kind: LoaderKind, builder: BatchLoaderBuilder<F>) -> BatchLoaderBuilder<F>
    where
        F: Fetcher + Send + Sync + 'static,
    {
        let label = self.label.clone().unwrap_or(Cow::Borrowed(kind.as_str()));
        let builder = builder
            .label(label)
            .max_batch_size(self.max_batch_size)
            .fetch_timeout(self.fetch_timeout)
            .cache(self.cache);

        match &self.scheduler {
            Some(scheduler) => builder.shared_scheduler(scheduler.clone()),
            None => builder,
        }
    }
}

/// The loaders for one logical request. Create one `Loaders` per incoming
/// request and drop it when the request is done: every resolver working on
/// the request shares its loaders' caches and batch windows, and nothing is
/// shared with other requests.
///
/// Loaders are constructed on first use. Later calls for the same loader
/// return the same instance, whatever options they pass.
pub struct Loaders {
    storage: Arc<dyn Storage>,
    defaults: LoaderOptions,
    category_by_id: OnceLock<BatchLoader<CategoryById>>,
    manufacturer_by_id: OnceLock<BatchLoader<ManufacturerById>>,
    product_by_id: OnceLock<BatchLoader<ProductById>>,
    products_by_category: OnceLock<BatchLoader<ProductsByCategory>>,
    products_by_manufacturer: OnceLock<BatchLoader<ProductsByManufacturer>>,
    stock_by_product: OnceLock<BatchLoader<StockByProduct>>,
}

impl Loaders {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self::with_defaults(storage, LoaderOptions::default())
    }

    /// Like [`new`](Loaders::new), with `defaults` used for every loader
    /// constructed through [`get`](Loaders::get).
    pub fn with_defaults(storage: Arc<dyn Storage>, defaults: LoaderOptions) -> Self {
        tracing::trace!("creating request loaders");
        Loaders {
            storage,
            defaults,
            category_by_id: OnceLock::new(),
            manufacturer_by_id: OnceLock::new(),
            product_by_id: OnceLock::new(),
            products_by_category: OnceLock::new(),
            products_by_manufacturer: OnceLock::new(),
            stock_by_product: OnceLock::new(),
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Return the loader for `L`, constructing it with the registry's
    /// default options on first use.
    ///
    /// ```ignore
    /// let products = loaders.get::<ProductsByCategory>().load(category.id).await?;
    /// ```
    pub fn get<L: LoaderName>(&self) -> BatchLoader<L> {
        self.get_with::<L>(&self.defaults)
    }

    /// Return the loader for `L`, constructing it with `options` on first
    /// use. `options` is ignored if the loader already exists.
    pub fn get_with<L: LoaderName>(&self, options: &LoaderOptions) -> BatchLoader<L> {
        L::slot(self)
            .get_or_init(|| {
                tracing::debug!(loader = %L::KIND, "constructing loader");
                let fetcher = L::from_storage(self.storage.clone());
                options.apply(L::KIND, BatchLoader::build(fetcher)).finish()
            })
            .clone()
    }

    /// Construct the loader for `kind` now, if it doesn't exist yet.
    pub fn initialize(&self, kind: LoaderKind) {
        match kind {
            LoaderKind::CategoryById => drop(self.get::<CategoryById>()),
            LoaderKind::ManufacturerById => drop(self.get::<ManufacturerById>()),
            LoaderKind::ProductById => drop(self.get::<ProductById>()),
            LoaderKind::ProductsByCategory => drop(self.get::<ProductsByCategory>()),
            LoaderKind::ProductsByManufacturer => drop(self.get::<ProductsByManufacturer>()),
            LoaderKind::StockByProduct => drop(self.get::<StockByProduct>()),
        }
    }

    pub fn is_initialized(&self, kind: LoaderKind) -> bool {
        match kind {
            LoaderKind::CategoryById => self.category_by_id.get().is_some(),
            LoaderKind::ManufacturerById => self.manufacturer_by_id.get().is_some(),
            LoaderKind::ProductById => self.product_by_id.get().is_some(),
            LoaderKind::ProductsByCategory => self.products_by_category.get().is_some(),
            LoaderKind::ProductsByManufacturer => self.products_by_manufacturer.get().is_some(),
            LoaderKind::StockByProduct => self.stock_by_product.get().is_some(),
        }
    }
}
