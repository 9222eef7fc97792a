use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, instrument, warn};
use uuid::Uuid;

use crate::cache::InMemoryCache;
use crate::errors::ServiceError;
use crate::models::category::find_canonical;
use crate::models::{canonical_categories, Category, Product, ProductStatus};
use crate::repositories::{Page, ProductFilter, ProductOrder, ProductRepository, StoredProduct};
use crate::services::normalizer::normalize_row;

/// Number of featured products returned when nothing is configured
pub const DEFAULT_FEATURED_PAGE_SIZE: u64 = 20;

const FEATURED_CACHE_KEY: &str = "catalog:featured";

fn category_cache_key(slug: &str) -> String {
    format!("catalog:category:{slug}")
}

/// Read-only storefront queries over the unified catalog
pub struct CatalogQueryService {
    repository: Arc<dyn ProductRepository>,
    cache: InMemoryCache,
    featured_page_size: u64,
}

impl CatalogQueryService {
    pub fn new(
        repository: Arc<dyn ProductRepository>,
        cache: InMemoryCache,
        featured_page_size: u64,
    ) -> Self {
        Self {
            repository,
            cache,
            featured_page_size,
        }
    }

    /// Get one product by id
    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Product, ServiceError> {
        let row = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))?;
        normalize_single(&row)
    }

    /// Products for the given ids, in request order.
    ///
    /// Ids that are not UUIDs or match nothing are left out, so the result may
    /// be shorter than the input.
    #[instrument(skip(self), fields(requested = ids.len()))]
    pub async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<Product>, ServiceError> {
        let mut wanted: Vec<Uuid> = Vec::with_capacity(ids.len());
        for raw in ids {
            match Uuid::parse_str(raw.trim()) {
                Ok(id) if !wanted.contains(&id) => wanted.push(id),
                Ok(_) => {}
                Err(_) => warn!(id = %raw, "skipping malformed product id in batch"),
            }
        }
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let mut rows: HashMap<Uuid, StoredProduct> = self
            .repository
            .find_by_ids(&wanted)
            .await?
            .into_iter()
            .map(|row| (row.id, row))
            .collect();

        let ordered: Vec<StoredProduct> = wanted
            .iter()
            .filter_map(|id| rows.remove(id))
            .collect();
        Ok(normalize_all(&ordered))
    }

    /// Visible products of one category, featured first then newest first
    #[instrument(skip(self))]
    pub async fn list_by_category(&self, slug: &str) -> Result<Vec<Product>, ServiceError> {
        let slug = slug.trim().to_lowercase();
        // Only the canonical categories are cached, so arbitrary slugs cannot grow the map.
        let key = find_canonical(&slug)
            .filter(|category| category.slug == slug)
            .map(|category| category_cache_key(&category.slug));
        if let Some(cached) = key.as_deref().and_then(|k| self.cache.get_json::<Vec<Product>>(k)) {
            return Ok(cached);
        }

        let generation = self.cache.generation();
        let filter = ProductFilter {
            category_slug: Some(slug),
            statuses: Some(vec![ProductStatus::Active, ProductStatus::Seasonal]),
            ..Default::default()
        };
        let rows = self
            .repository
            .find(&filter, ProductOrder::FeaturedThenNewest, Page::default())
            .await?;

        let products = normalize_all(&rows);
        if let Some(key) = key.as_deref() {
            self.remember(key, &products, generation);
        }
        Ok(products)
    }

    /// Active featured products, newest first, capped at the configured page size
    #[instrument(skip(self))]
    pub async fn list_featured(&self) -> Result<Vec<Product>, ServiceError> {
        if let Some(cached) = self.cache.get_json::<Vec<Product>>(FEATURED_CACHE_KEY) {
            return Ok(cached);
        }

        let generation = self.cache.generation();
        let filter = ProductFilter {
            statuses: Some(vec![ProductStatus::Active]),
            featured: Some(true),
            ..Default::default()
        };
        let rows = self
            .repository
            .find(
                &filter,
                ProductOrder::FeaturedThenNewest,
                Page::first(self.featured_page_size),
            )
            .await?;

        let products = normalize_all(&rows);
        self.remember(FEATURED_CACHE_KEY, &products, generation);
        Ok(products)
    }

    /// Detail lookup; `key` is tried as an id first, then as a slug
    #[instrument(skip(self))]
    pub async fn get_detail(&self, key: &str) -> Result<Product, ServiceError> {
        let key = key.trim();
        if let Ok(id) = Uuid::parse_str(key) {
            if let Some(row) = self.repository.find_by_id(id).await? {
                return normalize_single(&row);
            }
        }

        let row = self
            .repository
            .find_by_slug(&key.to_lowercase())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product '{}' not found", key)))?;
        normalize_single(&row)
    }

    pub fn list_categories(&self) -> Vec<Category> {
        canonical_categories()
    }

    fn remember(&self, key: &str, products: &[Product], generation: u64) {
        if let Err(e) = self.cache.set_json_at(key, &products, generation) {
            warn!(key, error = %e, "failed to cache catalog listing");
        }
    }
}

fn normalize_single(row: &StoredProduct) -> Result<Product, ServiceError> {
    normalize_row(row).map_err(|e| {
        error!(product_id = %row.id, error = %e, "stored product failed to normalize");
        ServiceError::InternalError(format!("Product {} is unreadable", row.id))
    })
}

/// Normalizes a listing, leaving out rows that cannot be read
fn normalize_all(rows: &[StoredProduct]) -> Vec<Product> {
    rows.iter()
        .filter_map(|row| match normalize_row(row) {
            Ok(product) => Some(product),
            Err(e) => {
                warn!(product_id = %row.id, slug = %row.slug, error = %e, "omitting unreadable product");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{InMemoryProductRepository, StoreError};
    use assert_matches::assert_matches;
    use chrono::{Duration, Utc};
    use serde_json::{json, Value};

    struct Fixture {
        repo: Arc<InMemoryProductRepository>,
        service: CatalogQueryService,
    }

    fn fixture(page_size: u64) -> Fixture {
        let repo = Arc::new(InMemoryProductRepository::new());
        let service = CatalogQueryService::new(repo.clone(), InMemoryCache::disabled(), page_size);
        Fixture { repo, service }
    }

    async fn put(
        repo: &InMemoryProductRepository,
        slug: &str,
        category: &str,
        status: ProductStatus,
        featured: bool,
        age_minutes: i64,
    ) -> Uuid {
        put_document(
            repo,
            slug,
            category,
            status,
            featured,
            age_minutes,
            json!({ "name": slug, "valor": 3 }),
        )
        .await
    }

    async fn put_document(
        repo: &InMemoryProductRepository,
        slug: &str,
        category: &str,
        status: ProductStatus,
        featured: bool,
        age_minutes: i64,
        document: Value,
    ) -> Uuid {
        let created = Utc::now() - Duration::minutes(age_minutes);
        let id = Uuid::new_v4();
        repo.insert(StoredProduct {
            id,
            slug: slug.to_string(),
            name_key: slug.to_string(),
            category_slug: category.to_string(),
            status,
            featured,
            created_at: created,
            updated_at: created,
            document,
        })
        .await
        .unwrap();
        id
    }

    #[tokio::test]
    async fn category_listing_hides_inactive_and_orders_featured_first() {
        let f = fixture(20);
        put(&f.repo, "old-featured", "doces", ProductStatus::Active, true, 60).await;
        put(&f.repo, "new-plain", "doces", ProductStatus::Seasonal, false, 1).await;
        put(&f.repo, "hidden", "doces", ProductStatus::Inactive, true, 0).await;
        put(&f.repo, "elsewhere", "bolos", ProductStatus::Active, true, 0).await;

        let slugs: Vec<_> = f
            .service
            .list_by_category("doces")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.slug)
            .collect();
        assert_eq!(slugs, vec!["old-featured", "new-plain"]);
    }

    #[tokio::test]
    async fn featured_listing_is_capped_and_active_only() {
        let f = fixture(2);
        for i in 0..4 {
            put(&f.repo, &format!("f{i}"), "paes", ProductStatus::Active, true, i).await;
        }
        put(&f.repo, "seasonal", "paes", ProductStatus::Seasonal, true, 0).await;
        put(&f.repo, "plain", "paes", ProductStatus::Active, false, 0).await;

        let slugs: Vec<_> = f
            .service
            .list_featured()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.slug)
            .collect();
        assert_eq!(slugs, vec!["f0", "f1"]);
    }

    #[tokio::test]
    async fn batch_preserves_order_and_skips_bad_ids() {
        let f = fixture(20);
        let a = put(&f.repo, "a", "paes", ProductStatus::Active, false, 0).await;
        let b = put(&f.repo, "b", "paes", ProductStatus::Active, false, 0).await;

        let ids = vec![
            b.to_string(),
            "not-a-uuid".to_string(),
            Uuid::new_v4().to_string(),
            a.to_string(),
        ];
        let found: Vec<_> = f
            .service
            .get_by_ids(&ids)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(found, vec![b, a]);
    }

    #[tokio::test]
    async fn detail_resolves_id_then_slug() {
        let f = fixture(20);
        let id = put(&f.repo, "sonho", "doces", ProductStatus::Active, false, 0).await;

        assert_eq!(f.service.get_detail(&id.to_string()).await.unwrap().id, id);
        assert_eq!(f.service.get_detail("sonho").await.unwrap().id, id);
        assert_matches!(
            f.service.get_detail("missing").await,
            Err(ServiceError::NotFound(_))
        );
    }

    #[tokio::test]
    async fn unreadable_rows_are_omitted_from_lists_but_fail_single_reads() {
        let f = fixture(20);
        put(&f.repo, "ok", "salgados", ProductStatus::Active, false, 0).await;
        let broken = put_document(
            &f.repo,
            "broken",
            "salgados",
            ProductStatus::Active,
            false,
            0,
            json!({ "valor": 2 }),
        )
        .await;

        let listed = f.service.list_by_category("salgados").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_matches!(
            f.service.get_by_id(broken).await,
            Err(ServiceError::InternalError(_))
        );
    }

    #[tokio::test]
    async fn featured_listing_is_served_from_cache() {
        let repo = Arc::new(InMemoryProductRepository::new());
        let cache = InMemoryCache::new(None);
        let service = CatalogQueryService::new(repo.clone(), cache.clone(), 20);

        put(&repo, "first", "paes", ProductStatus::Active, true, 0).await;
        assert_eq!(service.list_featured().await.unwrap().len(), 1);

        put(&repo, "second", "paes", ProductStatus::Active, true, 0).await;
        assert_eq!(service.list_featured().await.unwrap().len(), 1);

        cache.clear();
        assert_eq!(service.list_featured().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn unknown_category_slugs_are_not_cached() {
        let repo = Arc::new(InMemoryProductRepository::new());
        let cache = InMemoryCache::new(None);
        let service = CatalogQueryService::new(repo.clone(), cache.clone(), 20);
        put(&repo, "cuca", "doces", ProductStatus::Active, false, 0).await;

        for i in 0..50 {
            assert!(service.list_by_category(&format!("nope-{i}")).await.unwrap().is_empty());
        }
        assert!(cache.is_empty());

        assert_eq!(service.list_by_category("doces").await.unwrap().len(), 1);
        assert_eq!(cache.len(), 1);
    }

    /// Store whose listing query races with an admin write that clears the cache
    struct WriteDuringFind {
        inner: InMemoryProductRepository,
        cache: InMemoryCache,
    }

    #[async_trait::async_trait]
    impl ProductRepository for WriteDuringFind {
        async fn find_by_id(&self, id: Uuid) -> Result<Option<StoredProduct>, StoreError> {
            self.inner.find_by_id(id).await
        }

        async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<StoredProduct>, StoreError> {
            self.inner.find_by_ids(ids).await
        }

        async fn find_by_slug(&self, slug: &str) -> Result<Option<StoredProduct>, StoreError> {
            self.inner.find_by_slug(slug).await
        }

        async fn slug_exists(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool, StoreError> {
            self.inner.slug_exists(slug, exclude).await
        }

        async fn name_exists(
            &self,
            name_key: &str,
            exclude: Option<Uuid>,
        ) -> Result<bool, StoreError> {
            self.inner.name_exists(name_key, exclude).await
        }

        async fn find(
            &self,
            filter: &ProductFilter,
            order: ProductOrder,
            page: Page,
        ) -> Result<Vec<StoredProduct>, StoreError> {
            let rows = self.inner.find(filter, order, page).await?;
            self.cache.clear();
            Ok(rows)
        }

        async fn count(&self, filter: &ProductFilter) -> Result<u64, StoreError> {
            self.inner.count(filter).await
        }

        async fn insert(&self, row: StoredProduct) -> Result<(), StoreError> {
            self.inner.insert(row).await
        }

        async fn replace(&self, row: StoredProduct) -> Result<bool, StoreError> {
            self.inner.replace(row).await
        }

        async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
            self.inner.delete(id).await
        }

        async fn ping(&self) -> Result<(), StoreError> {
            self.inner.ping().await
        }
    }

    #[tokio::test]
    async fn listing_read_before_a_concurrent_write_is_not_cached() {
        let cache = InMemoryCache::new(None);
        let repo = Arc::new(WriteDuringFind {
            inner: InMemoryProductRepository::new(),
            cache: cache.clone(),
        });
        put(&repo.inner, "sonho", "doces", ProductStatus::Active, true, 0).await;
        let service = CatalogQueryService::new(repo, cache.clone(), 20);

        assert_eq!(service.list_featured().await.unwrap().len(), 1);
        assert_eq!(service.list_by_category("doces").await.unwrap().len(), 1);

        assert_eq!(cache.get("catalog:featured"), None);
        assert_eq!(cache.get("catalog:category:doces"), None);
    }
}
