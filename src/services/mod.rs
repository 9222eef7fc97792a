// Pure transforms
pub mod normalizer;
pub mod slug;

// Catalog reads and writes
pub mod catalog_query;
pub mod product_admin;

// One-shot legacy import
pub mod legacy_migration;

pub use catalog_query::CatalogQueryService;
pub use legacy_migration::{CollectionReport, LegacyMigration, MigrationError, MigrationReport};
pub use product_admin::{ProductAdminService, ProductRatingService};
