pub mod admin_products;
pub mod common;
pub mod health;
pub mod products;

use std::sync::Arc;

use crate::cache::InMemoryCache;
use crate::config::AppConfig;
use crate::repositories::ProductRepository;
use crate::services::{CatalogQueryService, ProductAdminService, ProductRatingService};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<CatalogQueryService>,
    pub admin: Arc<ProductAdminService>,
    pub ratings: Arc<ProductRatingService>,
    pub repository: Arc<dyn ProductRepository>,
    pub cache: InMemoryCache,
}

impl AppServices {
    /// Wire every service over one repository and one shared cache
    pub fn new(repository: Arc<dyn ProductRepository>, config: &AppConfig) -> Self {
        let cache = InMemoryCache::from_ttl_secs(config.catalog_cache_ttl_secs);

        let catalog = Arc::new(CatalogQueryService::new(
            repository.clone(),
            cache.clone(),
            config.featured_page_size,
        ));
        let admin = Arc::new(ProductAdminService::new(
            repository.clone(),
            cache.clone(),
            config.slug_max_attempts,
        ));
        let ratings = Arc::new(ProductRatingService::new(repository.clone(), cache.clone()));

        Self {
            catalog,
            admin,
            ratings,
            repository,
            cache,
        }
    }
}
