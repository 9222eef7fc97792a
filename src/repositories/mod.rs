use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DbErr;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Product, ProductStatus};

pub mod legacy_source;
pub mod memory;
pub mod product_repository;

pub use legacy_source::{InMemoryLegacySource, JsonDirectorySource, LegacySource, LegacySourceError};
pub use memory::InMemoryProductRepository;
pub use product_repository::SeaOrmProductRepository;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("slug '{0}' is already taken")]
    DuplicateSlug(String),

    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// One row of the unified product collection.
///
/// The index columns are always derived from the normalized product, while
/// `document` keeps the record as written, which may still be a legacy flat
/// document.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredProduct {
    pub id: Uuid,
    pub slug: String,
    pub name_key: String,
    pub category_slug: String,
    pub status: ProductStatus,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub document: Value,
}

impl StoredProduct {
    pub fn from_product(product: &Product) -> Self {
        Self::with_document(product, product.to_document())
    }

    /// Index columns from `product`, body kept as the given raw document
    pub fn with_document(product: &Product, document: Value) -> Self {
        Self {
            id: product.id,
            slug: product.slug.clone(),
            name_key: product.name_key(),
            category_slug: product.category.slug.clone(),
            status: product.status,
            featured: product.featured,
            created_at: product.created_at,
            updated_at: product.updated_at,
            document,
        }
    }
}

/// Row filter for listings; every set field must match
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category_slug: Option<String>,
    /// Allowed statuses; `None` admits all
    pub statuses: Option<Vec<ProductStatus>>,
    pub featured: Option<bool>,
    /// Case-insensitive substring of the name
    pub name_contains: Option<String>,
}

impl ProductFilter {
    pub fn matches(&self, row: &StoredProduct) -> bool {
        if let Some(slug) = &self.category_slug {
            if &row.category_slug != slug {
                return false;
            }
        }
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&row.status) {
                return false;
            }
        }
        if let Some(featured) = self.featured {
            if row.featured != featured {
                return false;
            }
        }
        if let Some(needle) = &self.name_contains {
            if !row.name_key.contains(&needle.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductOrder {
    /// Featured first, then newest first
    FeaturedThenNewest,
    NewestFirst,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Page {
    pub offset: u64,
    pub limit: Option<u64>,
}

impl Page {
    pub fn first(limit: u64) -> Self {
        Self {
            offset: 0,
            limit: Some(limit),
        }
    }
}

/// Storage primitives over the unified product collection
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<StoredProduct>, StoreError>;

    /// Rows for the given ids, in no particular order
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<StoredProduct>, StoreError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<StoredProduct>, StoreError>;

    /// Whether a row other than `exclude` already uses `slug`
    async fn slug_exists(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool, StoreError>;

    /// Whether a row other than `exclude` has the given lower-cased name
    async fn name_exists(&self, name_key: &str, exclude: Option<Uuid>)
        -> Result<bool, StoreError>;

    async fn find(
        &self,
        filter: &ProductFilter,
        order: ProductOrder,
        page: Page,
    ) -> Result<Vec<StoredProduct>, StoreError>;

    async fn count(&self, filter: &ProductFilter) -> Result<u64, StoreError>;

    /// Fails with [`StoreError::DuplicateSlug`] when the slug is taken
    async fn insert(&self, row: StoredProduct) -> Result<(), StoreError>;

    /// Replaces the row with the same id; `false` if there is none
    async fn replace(&self, row: StoredProduct) -> Result<bool, StoreError>;

    /// `false` if there was nothing to delete
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
