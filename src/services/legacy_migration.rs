use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{LegacyCollection, Product, StoredShape, LEGACY_COLLECTIONS};
use crate::repositories::{LegacySource, ProductFilter, ProductRepository, StoreError, StoredProduct};
use crate::services::normalizer::{NormalizeError, ProductFields};
use crate::services::slug::{resolve_unique_slug, SlugError};

/// Structural failure that stops the whole run
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("unified store failed: {0}")]
    Store(#[from] StoreError),
}

/// Per-collection outcome
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CollectionReport {
    pub collection: String,
    pub migrated: u64,
    pub skipped_deleted: u64,
    pub failed: u64,
    /// Set when the collection itself could not be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CollectionReport {
    fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MigrationReport {
    pub per_collection: Vec<CollectionReport>,
    pub total_migrated: u64,
    /// True when the unified store was already populated and nothing ran
    pub skipped: bool,
}

impl MigrationReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Default::default()
        }
    }
}

enum RecordOutcome {
    Migrated(Product),
    Deleted,
}

/// Why one record was left behind
#[derive(Debug, Error)]
enum RecordError {
    #[error("record is unusable: {0}")]
    Transform(#[from] NormalizeError),

    #[error("{0}")]
    Slug(String),

    #[error(transparent)]
    Store(StoreError),
}

impl From<SlugError> for RecordError {
    fn from(err: SlugError) -> Self {
        match err {
            SlugError::Store(e) => RecordError::Store(e),
            exhausted => RecordError::Slug(exhausted.to_string()),
        }
    }
}

/// One-shot copy of the seven per-category collections into the unified store.
///
/// Runs only against an empty store; a populated store short-circuits with a
/// `skipped` report and no writes, which makes repeated runs harmless.
pub struct LegacyMigration {
    source: Arc<dyn LegacySource>,
    repository: Arc<dyn ProductRepository>,
    slug_max_attempts: u32,
}

impl LegacyMigration {
    pub fn new(
        source: Arc<dyn LegacySource>,
        repository: Arc<dyn ProductRepository>,
        slug_max_attempts: u32,
    ) -> Self {
        Self {
            source,
            repository,
            slug_max_attempts,
        }
    }

    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<MigrationReport, MigrationError> {
        let existing = self.repository.count(&ProductFilter::default()).await?;
        if existing > 0 {
            info!(existing, "unified catalog already populated, skipping legacy migration");
            return Ok(MigrationReport::skipped());
        }

        let mut report = MigrationReport::default();
        for collection in LEGACY_COLLECTIONS.iter() {
            let collection_report = self.migrate_collection(collection).await?;
            report.total_migrated += collection_report.migrated;
            report.per_collection.push(collection_report);
        }

        info!(total_migrated = report.total_migrated, "legacy migration finished");
        Ok(report)
    }

    #[instrument(skip(self, collection), fields(collection = collection.collection))]
    async fn migrate_collection(
        &self,
        collection: &LegacyCollection,
    ) -> Result<CollectionReport, MigrationError> {
        let mut report = CollectionReport::new(collection.collection);

        let records = match self.source.fetch_collection(collection.collection).await {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "legacy collection unreadable, continuing with the next one");
                report.error = Some(e.to_string());
                return Ok(report);
            }
        };

        for (index, record) in records.iter().enumerate() {
            match self.migrate_record(collection, record).await {
                Ok(RecordOutcome::Migrated(product)) => {
                    report.migrated += 1;
                    info!(product_id = %product.id, slug = %product.slug, "migrated legacy record");
                }
                Ok(RecordOutcome::Deleted) => report.skipped_deleted += 1,
                Err(RecordError::Store(e)) => return Err(e.into()),
                Err(e) => {
                    report.failed += 1;
                    warn!(index, error = %e, "legacy record not migrated");
                }
            }
        }

        info!(
            migrated = report.migrated,
            skipped_deleted = report.skipped_deleted,
            failed = report.failed,
            "legacy collection done"
        );
        Ok(report)
    }

    async fn migrate_record(
        &self,
        collection: &LegacyCollection,
        record: &Value,
    ) -> Result<RecordOutcome, RecordError> {
        let shape = StoredShape::decode(record).map_err(NormalizeError::from)?;
        let flat = shape.flat();
        if flat.deleted == Some(true) {
            return Ok(RecordOutcome::Deleted);
        }

        let mut fields = ProductFields::from_shape(&shape);
        let name = fields.name.clone().ok_or(NormalizeError::MissingName)?;
        fields.category = Some(collection.category());
        // Legacy "pause" becomes the canonical inactive status.
        fields.status = Some(fields.resolved_status().as_str().to_string());

        let now = Utc::now();
        let created_at = flat.created_at.unwrap_or(now);
        let updated_at = flat.updated_at.unwrap_or(created_at);
        let rating = flat.rating.clone().unwrap_or_default();

        let slug =
            resolve_unique_slug(self.repository.as_ref(), &name, None, self.slug_max_attempts)
                .await?;
        let product = fields.into_product(Uuid::new_v4(), slug, rating, created_at, updated_at)?;

        match self
            .repository
            .insert(StoredProduct::from_product(&product))
            .await
        {
            Ok(()) => Ok(RecordOutcome::Migrated(product)),
            Err(StoreError::DuplicateSlug(slug)) => {
                Err(RecordError::Slug(format!("slug '{}' already taken", slug)))
            }
            Err(e) => Err(RecordError::Store(e)),
        }
    }
}
