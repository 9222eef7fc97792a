use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::auth::AuthUser;
use crate::cache::InMemoryCache;
use crate::errors::ServiceError;
use crate::models::product::{name_key, MAX_NAME_LENGTH};
use crate::models::{Product, ProductStatus, Rating};
use crate::repositories::{Page, ProductFilter, ProductOrder, ProductRepository, StoreError, StoredProduct};
use crate::services::normalizer::{normalize_row, NormalizeError, ProductFields};
use crate::services::slug::resolve_unique_slug;

/// Inserts attempted before a slug race is reported as a conflict
const INSERT_ATTEMPTS: u32 = 3;

/// Value checks applied to every admin write once required fields are present
#[derive(Debug, Validate)]
struct WriteChecks {
    #[validate(custom = "name_length")]
    name: String,

    #[validate(custom = "positive_amount")]
    price_amount: Decimal,

    #[validate(length(min = 1, message = "Image is required"))]
    image_href: String,
}

fn name_length(name: &str) -> Result<(), ValidationError> {
    let len = name.chars().count();
    if (1..=MAX_NAME_LENGTH).contains(&len) {
        Ok(())
    } else {
        let mut err = ValidationError::new("length");
        err.message = Some(
            format!("Name must be between 1 and {} characters", MAX_NAME_LENGTH).into(),
        );
        Err(err)
    }
}

fn positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_positive() && !amount.is_zero() {
        Ok(())
    } else {
        let mut err = ValidationError::new("positive");
        err.message = Some("Price must be a positive number".into());
        Err(err)
    }
}

fn required<T: Clone>(value: &Option<T>, field: &str, message: &str) -> Result<T, ServiceError> {
    value
        .clone()
        .ok_or_else(|| ServiceError::validation(field, message))
}

/// `price_amount` is reported as `price.amount`
fn write_error(errors: ValidationErrors) -> ServiceError {
    match ServiceError::from(errors) {
        ServiceError::ValidationError { field, message } => {
            ServiceError::validation(field.replacen('_', ".", 1), message)
        }
        other => other,
    }
}

/// Decodes an admin payload (either shape) and checks the required fields
fn checked_fields(payload: &Value) -> Result<ProductFields, ServiceError> {
    let fields = ProductFields::from_document(payload)
        .map_err(|_| ServiceError::validation("payload", "Request body must be a JSON object"))?;

    WriteChecks {
        name: required(&fields.name, "name", "Name is required")?,
        price_amount: required(&fields.amount, "price.amount", "Price must be a positive number")?,
        image_href: required(&fields.image_href, "image.href", "Image is required")?,
    }
    .validate()
    .map_err(write_error)?;

    if let Some(raw) = fields.status.as_deref() {
        raw.parse::<ProductStatus>()
            .map_err(|_| ServiceError::validation("status", format!("Unknown status '{}'", raw)))?;
    }

    Ok(fields)
}

fn unreadable(id: Uuid, err: NormalizeError) -> ServiceError {
    error!(product_id = %id, error = %err, "stored product failed to normalize");
    ServiceError::InternalError(format!("Product {} is unreadable", id))
}

fn not_found(id: Uuid) -> ServiceError {
    ServiceError::NotFound(format!("Product {} not found", id))
}

/// Catalog writes; every operation requires the admin role
pub struct ProductAdminService {
    repository: Arc<dyn ProductRepository>,
    cache: InMemoryCache,
    slug_max_attempts: u32,
}

impl ProductAdminService {
    pub fn new(
        repository: Arc<dyn ProductRepository>,
        cache: InMemoryCache,
        slug_max_attempts: u32,
    ) -> Self {
        Self {
            repository,
            cache,
            slug_max_attempts,
        }
    }

    /// Create a product from a payload in either stored shape
    #[instrument(skip(self, user, payload), fields(user_id = %user.user_id))]
    pub async fn create(&self, user: &AuthUser, payload: &Value) -> Result<Product, ServiceError> {
        user.require_admin()?;
        let fields = checked_fields(payload)?;
        let name = fields.name.clone().unwrap_or_default();

        let id = Uuid::new_v4();
        let now = Utc::now();

        for attempt in 1..=INSERT_ATTEMPTS {
            let slug =
                resolve_unique_slug(self.repository.as_ref(), &name, None, self.slug_max_attempts)
                    .await?;
            let product = fields
                .clone()
                .into_product(id, slug, Rating::default(), now, now)
                .map_err(|e| ServiceError::validation("name", e.to_string()))?;

            match self
                .repository
                .insert(StoredProduct::from_product(&product))
                .await
            {
                Ok(()) => {
                    self.cache.clear();
                    info!(product_id = %product.id, slug = %product.slug, "Product created successfully");
                    return Ok(product);
                }
                Err(StoreError::DuplicateSlug(slug)) => {
                    warn!(%slug, attempt, "slug claimed concurrently, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ServiceError::Conflict(format!(
            "Could not reserve a unique slug for '{}'",
            name
        )))
    }

    /// Replace every mutable field of a product.
    ///
    /// Omitted fields fall back to defaults, except list fields, which keep
    /// the stored value when absent. Identity, creation time and rating are
    /// preserved.
    #[instrument(skip(self, user, payload), fields(user_id = %user.user_id))]
    pub async fn update(
        &self,
        user: &AuthUser,
        id: Uuid,
        payload: &Value,
    ) -> Result<Product, ServiceError> {
        user.require_admin()?;
        let row = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found(id))?;
        let existing = normalize_row(&row).map_err(|e| unreadable(id, e))?;

        let mut fields = checked_fields(payload)?;
        let name = fields.name.clone().unwrap_or_default();

        if self.repository.name_exists(&name_key(&name), Some(id)).await? {
            return Err(ServiceError::Conflict(format!(
                "Another product is already named '{}'",
                name
            )));
        }

        fields.inherit_lists(&existing);
        let slug =
            resolve_unique_slug(self.repository.as_ref(), &name, Some(id), self.slug_max_attempts)
                .await?;
        let product = fields
            .into_product(id, slug, existing.rating, existing.created_at, Utc::now())
            .map_err(|e| ServiceError::validation("name", e.to_string()))?;

        self.store(&product).await?;
        info!(product_id = %id, slug = %product.slug, "Product updated successfully");
        Ok(product)
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn delete(&self, user: &AuthUser, id: Uuid) -> Result<(), ServiceError> {
        user.require_admin()?;
        if !self.repository.delete(id).await? {
            return Err(not_found(id));
        }
        self.cache.clear();
        info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// Flip the featured flag; a record without one counts as not featured
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn toggle_featured(&self, user: &AuthUser, id: Uuid) -> Result<Product, ServiceError> {
        user.require_admin()?;
        let mut product = self.load(id).await?;

        product.featured = !product.featured;
        product.updated_at = Utc::now();

        self.store(&product).await?;
        info!(product_id = %id, featured = product.featured, "Product featured flag toggled");
        Ok(product)
    }

    /// Set the status from an admin synonym (`ativo`, `pause`, ...)
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn set_status(
        &self,
        user: &AuthUser,
        id: Uuid,
        raw: &str,
    ) -> Result<Product, ServiceError> {
        user.require_admin()?;
        let status = ProductStatus::parse_toggle(raw).ok_or_else(|| {
            ServiceError::validation(
                "status",
                format!("Unknown status '{}'; use active or inactive", raw.trim()),
            )
        })?;

        let mut product = self.load(id).await?;
        product.status = status;
        product.updated_at = Utc::now();

        self.store(&product).await?;
        info!(product_id = %id, status = %status, "Product status changed");
        Ok(product)
    }

    /// Every product, including inactive ones, newest first.
    /// `page` is 1-based; returns the page and the total match count.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn list(
        &self,
        user: &AuthUser,
        page: u64,
        per_page: u64,
        search: Option<String>,
    ) -> Result<(Vec<Product>, u64), ServiceError> {
        user.require_admin()?;
        let filter = ProductFilter {
            name_contains: search
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty()),
            ..Default::default()
        };

        let total = self.repository.count(&filter).await?;
        let rows = self
            .repository
            .find(
                &filter,
                ProductOrder::NewestFirst,
                Page {
                    offset: page.saturating_sub(1) * per_page,
                    limit: Some(per_page),
                },
            )
            .await?;

        let products = rows
            .iter()
            .filter_map(|row| match normalize_row(row) {
                Ok(product) => Some(product),
                Err(e) => {
                    warn!(product_id = %row.id, error = %e, "omitting unreadable product");
                    None
                }
            })
            .collect();
        Ok((products, total))
    }

    async fn load(&self, id: Uuid) -> Result<Product, ServiceError> {
        let row = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found(id))?;
        normalize_row(&row).map_err(|e| unreadable(id, e))
    }

    async fn store(&self, product: &Product) -> Result<(), ServiceError> {
        match self
            .repository
            .replace(StoredProduct::from_product(product))
            .await
        {
            Ok(true) => {
                self.cache.clear();
                Ok(())
            }
            Ok(false) => Err(not_found(product.id)),
            Err(StoreError::DuplicateSlug(slug)) => Err(ServiceError::Conflict(format!(
                "Slug '{}' was claimed by another product",
                slug
            ))),
            Err(e) => Err(e.into()),
        }
    }
}

/// Customer ratings
pub struct ProductRatingService {
    repository: Arc<dyn ProductRepository>,
    cache: InMemoryCache,
}

impl ProductRatingService {
    pub fn new(repository: Arc<dyn ProductRepository>, cache: InMemoryCache) -> Self {
        Self { repository, cache }
    }

    /// Record or replace the caller's 1-5 score and refresh the aggregate
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn rate(&self, user: &AuthUser, id: Uuid, score: i64) -> Result<Product, ServiceError> {
        let score = u8::try_from(score)
            .ok()
            .filter(|s| (1..=5).contains(s))
            .ok_or_else(|| ServiceError::validation("score", "Score must be between 1 and 5"))?;

        let row = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found(id))?;
        let mut product = normalize_row(&row).map_err(|e| unreadable(id, e))?;

        product.rating.upsert(&user.user_id, score, Utc::now());

        if !self
            .repository
            .replace(StoredProduct::from_product(&product))
            .await?
        {
            return Err(not_found(id));
        }
        self.cache.clear();
        info!(product_id = %id, average = product.rating.average, "Product rated");
        Ok(product)
    }
}
