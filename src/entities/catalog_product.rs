use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::models::ProductStatus;
use crate::repositories::StoredProduct;

/// Unified catalog product row
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "catalog_products")]
pub struct Model {
    /// Primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// URL token, unique across the table
    #[sea_orm(unique)]
    pub slug: String,

    /// Display name as stored
    pub name: String,

    /// Lower-cased trimmed name
    pub name_key: String,

    pub category_slug: String,

    /// active | inactive | seasonal
    pub status: String,

    pub featured: bool,

    /// Full stored record, legacy flat or unified nested
    #[sea_orm(column_type = "Json")]
    pub document: Json,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for StoredProduct {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            slug: model.slug,
            name_key: model.name_key,
            category_slug: model.category_slug,
            // Rows are only ever written with canonical values.
            status: ProductStatus::from_str(&model.status).unwrap_or_default(),
            featured: model.featured,
            created_at: model.created_at,
            updated_at: model.updated_at,
            document: model.document,
        }
    }
}

impl From<StoredProduct> for ActiveModel {
    fn from(row: StoredProduct) -> Self {
        let name = row
            .document
            .get("name")
            .or_else(|| row.document.get("nome"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| row.name_key.clone());

        ActiveModel {
            id: Set(row.id),
            slug: Set(row.slug),
            name: Set(name),
            name_key: Set(row.name_key),
            category_slug: Set(row.category_slug),
            status: Set(row.status.as_str().to_string()),
            featured: Set(row.featured),
            document: Set(row.document),
            created_at: Set(row.created_at),
            updated_at: Set(row.updated_at),
        }
    }
}
