use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Subcategory used when a record does not carry one
pub const DEFAULT_SUBCATEGORY: &str = "Geral";

/// Sale unit used when a record does not carry one
pub const DEFAULT_UNIT: &str = "UN";

/// Decimal places kept for prices and costs
pub const MONEY_SCALE: u32 = 2;

/// Decimal places kept for stock quantities
pub const QUANTITY_SCALE: u32 = 3;

/// Maximum length of a product display name
pub const MAX_NAME_LENGTH: usize = 200;

/// Unified catalog product, the only shape handed to clients
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub category: Category,
    pub subcategory: String,
    pub price: Price,
    pub stock: Stock,
    pub image: Image,
    pub ingredients: Vec<String>,
    pub allergens: Vec<String>,
    pub tags: Vec<String>,
    pub rating: Rating,
    pub featured: bool,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Lower-cased, trimmed name used for case-insensitive name comparisons
    pub fn name_key(&self) -> String {
        name_key(&self.name)
    }

    /// Serializes the product into the document stored in the unified collection
    pub fn to_document(&self) -> serde_json::Value {
        // Product only holds plain data; serialization to a Value cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Category pair; `slug` is derived from `name`
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub name: String,
    pub slug: String,
}

impl Category {
    pub fn from_name(name: impl Into<String>) -> Self {
        let name = name.into().trim().to_string();
        let slug = category_slug(&name);
        Self { name, slug }
    }
}

/// Lowercases a category name and turns whitespace into hyphens
pub fn category_slug(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub amount: Decimal,
    pub unit: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    #[schema(value_type = Option<f64>)]
    pub production_cost: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<Promotion>,
}

/// Promotional price; only ever present while active
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub active: bool,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub promo_amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Stock {
    pub available: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    #[schema(value_type = Option<f64>)]
    pub quantity: Option<Decimal>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    #[schema(value_type = Option<f64>)]
    pub minimum: Option<Decimal>,
    pub unit: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Image {
    pub href: String,
    pub alt: String,
    pub gallery: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Rating {
    pub average: f64,
    pub count: u32,
    pub per_user: Vec<UserRating>,
}

impl Rating {
    /// Inserts or replaces the caller's score and recomputes the aggregate
    pub fn upsert(&mut self, user_id: &str, score: u8, now: DateTime<Utc>) {
        match self.per_user.iter_mut().find(|r| r.user_id == user_id) {
            Some(existing) => {
                existing.score = score;
                existing.updated_at = now;
            }
            None => self.per_user.push(UserRating {
                user_id: user_id.to_string(),
                score,
                created_at: now,
                updated_at: now,
            }),
        }
        self.recompute();
    }

    fn recompute(&mut self) {
        self.count = self.per_user.len() as u32;
        self.average = if self.per_user.is_empty() {
            0.0
        } else {
            let total: u32 = self.per_user.iter().map(|r| u32::from(r.score)).sum();
            let mean = f64::from(total) / f64::from(self.count);
            (mean * 100.0).round() / 100.0
        };
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserRating {
    pub user_id: String,
    pub score: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Catalog visibility status
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    #[default]
    Active,
    Inactive,
    Seasonal,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Inactive => "inactive",
            ProductStatus::Seasonal => "seasonal",
        }
    }

    /// Parses the admin toggle vocabulary, which only admits the two canonical states
    pub fn parse_toggle(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "active" | "ativo" => Some(ProductStatus::Active),
            "inactive" | "inativo" | "pause" | "paused" => Some(ProductStatus::Inactive),
            _ => None,
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductStatus {
    type Err = String;

    /// Accepts every spelling found in stored records, legacy ones included
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "seasonal" | "sazonal" => Ok(ProductStatus::Seasonal),
            other => Self::parse_toggle(other).ok_or_else(|| format!("unknown status '{}'", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[rstest]
    #[case("active", Some(ProductStatus::Active))]
    #[case("ATIVO", Some(ProductStatus::Active))]
    #[case(" pause ", Some(ProductStatus::Inactive))]
    #[case("Paused", Some(ProductStatus::Inactive))]
    #[case("inativo", Some(ProductStatus::Inactive))]
    #[case("seasonal", None)]
    #[case("maybe", None)]
    #[case("true", None)]
    #[case("false", None)]
    #[case(" PAUSED ", Some(ProductStatus::Inactive))]
    fn toggle_vocabulary(#[case] raw: &str, #[case] expected: Option<ProductStatus>) {
        assert_eq!(ProductStatus::parse_toggle(raw), expected);
    }

    #[test]
    fn stored_status_accepts_seasonal() {
        assert_eq!("Sazonal".parse::<ProductStatus>(), Ok(ProductStatus::Seasonal));
        assert!("whatever".parse::<ProductStatus>().is_err());
    }

    #[test]
    fn category_slug_lowercases_and_hyphenates() {
        let category = Category::from_name("  Paes  Especiais ");
        assert_eq!(category.name, "Paes  Especiais");
        assert_eq!(category.slug, "paes-especiais");
    }

    #[test]
    fn rating_upsert_replaces_existing_score() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let mut rating = Rating::default();

        rating.upsert("u1", 5, t0);
        rating.upsert("u2", 4, t0);
        rating.upsert("u1", 2, t1);

        assert_eq!(rating.count, 2);
        assert_eq!(rating.average, 3.0);
        let first = &rating.per_user[0];
        assert_eq!(first.created_at, t0);
        assert_eq!(first.updated_at, t1);
    }

    #[test]
    fn rating_average_is_rounded() {
        let now = Utc::now();
        let mut rating = Rating::default();
        rating.upsert("a", 5, now);
        rating.upsert("b", 4, now);
        rating.upsert("c", 4, now);
        assert_eq!(rating.average, 4.33);
    }
}
