use async_trait::async_trait;
use sea_orm::{
    sea_query::{Condition, LikeExpr},
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, SqlErr,
};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::entities::catalog_product::{
    ActiveModel as ProductActiveModel, Column, Entity as CatalogProduct,
};

use super::{Page, ProductFilter, ProductOrder, ProductRepository, StoreError, StoredProduct};

/// Product repository over the `catalog_products` table
#[derive(Debug, Clone)]
pub struct SeaOrmProductRepository {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmProductRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    fn filtered(filter: &ProductFilter) -> Select<CatalogProduct> {
        let mut condition = Condition::all();
        if let Some(slug) = &filter.category_slug {
            condition = condition.add(Column::CategorySlug.eq(slug.as_str()));
        }
        if let Some(statuses) = &filter.statuses {
            condition = condition.add(Column::Status.is_in(statuses.iter().map(|s| s.as_str())));
        }
        if let Some(featured) = filter.featured {
            condition = condition.add(Column::Featured.eq(featured));
        }
        if let Some(needle) = &filter.name_contains {
            condition = condition.add(Column::NameKey.like(contains_pattern(needle)));
        }
        CatalogProduct::find().filter(condition)
    }
}

/// `LIKE` pattern matching `needle` literally anywhere in the column
fn contains_pattern(needle: &str) -> LikeExpr {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for ch in needle.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    LikeExpr::new(escaped).escape('\\')
}

/// Maps a unique-index violation on write to `DuplicateSlug`
fn map_write_error(err: DbErr, slug: &str) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => StoreError::DuplicateSlug(slug.to_string()),
        _ => {
            error!(error = %err, slug, "catalog write failed");
            StoreError::Database(err)
        }
    }
}

#[async_trait]
impl ProductRepository for SeaOrmProductRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<StoredProduct>, StoreError> {
        let model = CatalogProduct::find_by_id(id).one(self.db()).await?;
        Ok(model.map(Into::into))
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<StoredProduct>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = CatalogProduct::find()
            .filter(Column::Id.is_in(ids.iter().copied()))
            .all(self.db())
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<StoredProduct>, StoreError> {
        let model = CatalogProduct::find()
            .filter(Column::Slug.eq(slug))
            .one(self.db())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn slug_exists(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool, StoreError> {
        let mut query = CatalogProduct::find().filter(Column::Slug.eq(slug));
        if let Some(id) = exclude {
            query = query.filter(Column::Id.ne(id));
        }
        Ok(query.count(self.db()).await? > 0)
    }

    async fn name_exists(
        &self,
        name_key: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, StoreError> {
        let mut query = CatalogProduct::find().filter(Column::NameKey.eq(name_key));
        if let Some(id) = exclude {
            query = query.filter(Column::Id.ne(id));
        }
        Ok(query.count(self.db()).await? > 0)
    }

    async fn find(
        &self,
        filter: &ProductFilter,
        order: ProductOrder,
        page: Page,
    ) -> Result<Vec<StoredProduct>, StoreError> {
        let mut query = Self::filtered(filter);
        if order == ProductOrder::FeaturedThenNewest {
            query = query.order_by_desc(Column::Featured);
        }
        query = query
            .order_by_desc(Column::CreatedAt)
            .order_by_asc(Column::Id);
        // SQLite only accepts OFFSET after a LIMIT clause.
        match page.limit {
            Some(limit) => query = query.limit(limit).offset(page.offset),
            None if page.offset > 0 => query = query.limit(i64::MAX as u64).offset(page.offset),
            None => {}
        }

        let models = query.all(self.db()).await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn count(&self, filter: &ProductFilter) -> Result<u64, StoreError> {
        Ok(Self::filtered(filter).count(self.db()).await?)
    }

    async fn insert(&self, row: StoredProduct) -> Result<(), StoreError> {
        let slug = row.slug.clone();
        let active: ProductActiveModel = row.into();
        active
            .insert(self.db())
            .await
            .map_err(|e| map_write_error(e, &slug))?;
        Ok(())
    }

    async fn replace(&self, row: StoredProduct) -> Result<bool, StoreError> {
        if CatalogProduct::find_by_id(row.id).one(self.db()).await?.is_none() {
            return Ok(false);
        }

        let slug = row.slug.clone();
        let active: ProductActiveModel = row.into();
        active
            .update(self.db())
            .await
            .map_err(|e| map_write_error(e, &slug))?;
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = CatalogProduct::delete_by_id(id).exec(self.db()).await?;
        Ok(result.rows_affected > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.db().ping().await?;
        Ok(())
    }
}
