//! Maps decoded stored records onto the canonical [`Product`].
//!
//! Per field, the nested value of a unified record wins, then the flat
//! (legacy) key, then a documented default. The transform is pure and
//! idempotent: feeding a product's own serialization back in yields the
//! same product.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::category::find_canonical;
use crate::models::product::{DEFAULT_SUBCATEGORY, DEFAULT_UNIT, MONEY_SCALE, QUANTITY_SCALE};
use crate::models::stored::{FlatFields, NestedFields, NestedPromotion};
use crate::models::{
    Category, DecodeError, Image, Price, Product, ProductStatus, Promotion, Rating, Stock,
    StoredShape,
};
use crate::repositories::StoredProduct;
use crate::services::slug::slug_base;

/// Image shown when a stored record carries none
pub const PLACEHOLDER_IMAGE: &str = "/images/produto-sem-imagem.png";

/// Category assigned when a record names none
pub const DEFAULT_CATEGORY: &str = "Geral";

#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("record has no name")]
    MissingName,
}

/// Identity and timestamps for a record, used where the document lacks them
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDefaults {
    pub slug: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecordDefaults {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            slug: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl From<&StoredProduct> for RecordDefaults {
    fn from(row: &StoredProduct) -> Self {
        Self {
            slug: Some(row.slug.clone()),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Every mutable product field, merged from both shapes but not yet defaulted.
///
/// List fields stay `None` when absent (or `null`) so that an update can tell
/// "not sent" from "sent empty".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFields {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub subcategory: Option<String>,
    pub amount: Option<Decimal>,
    pub unit: Option<String>,
    pub production_cost: Option<Decimal>,
    pub promotion: Option<Promotion>,
    pub available: Option<bool>,
    pub quantity: Option<Decimal>,
    pub minimum: Option<Decimal>,
    pub stock_unit: Option<String>,
    pub image_href: Option<String>,
    pub image_alt: Option<String>,
    pub gallery: Option<Vec<String>>,
    pub ingredients: Option<Vec<String>>,
    pub allergens: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub featured: Option<bool>,
    pub status: Option<String>,
}

impl ProductFields {
    pub fn from_document(document: &Value) -> Result<Self, DecodeError> {
        Ok(Self::from_shape(&StoredShape::decode(document)?))
    }

    pub fn from_shape(shape: &StoredShape) -> Self {
        match shape {
            StoredShape::Legacy(flat) => Self::merge(None, flat),
            StoredShape::Unified(record) => Self::merge(Some(&record.nested), &record.flat),
        }
    }

    fn merge(nested: Option<&NestedFields>, flat: &FlatFields) -> Self {
        let price = nested.and_then(|n| n.price.as_ref());
        let stock = nested.and_then(|n| n.stock.as_ref());
        let image = nested.and_then(|n| n.image.as_ref());

        let category = nested
            .and_then(|n| {
                n.category_name.as_ref().map(|name| Category {
                    name: name.clone(),
                    slug: n
                        .category_slug
                        .clone()
                        .unwrap_or_else(|| Category::from_name(name.as_str()).slug),
                })
            })
            .or_else(|| {
                flat.category
                    .as_deref()
                    .map(|raw| find_canonical(raw).unwrap_or_else(|| Category::from_name(raw)))
            });

        let nested_promo = price.and_then(|p| p.promotion.as_ref());
        let promotion = resolve_promotion(nested_promo, flat);

        Self {
            name: flat.name.clone(),
            description: flat.description.clone(),
            category,
            subcategory: flat.subcategory.clone(),
            amount: to_scale(price.and_then(|p| p.amount).or(flat.amount), MONEY_SCALE),
            unit: price.and_then(|p| p.unit.clone()).or_else(|| flat.unit.clone()),
            production_cost: to_scale(
                price.and_then(|p| p.production_cost).or(flat.production_cost),
                MONEY_SCALE,
            ),
            promotion,
            available: stock.and_then(|s| s.available).or(flat.available),
            quantity: to_scale(stock.and_then(|s| s.quantity).or(flat.quantity), QUANTITY_SCALE),
            minimum: to_scale(stock.and_then(|s| s.minimum).or(flat.minimum), QUANTITY_SCALE),
            stock_unit: stock
                .and_then(|s| s.unit.clone())
                .or_else(|| flat.stock_unit.clone()),
            image_href: image
                .and_then(|i| i.href.clone())
                .or_else(|| flat.image.clone()),
            image_alt: image
                .and_then(|i| i.alt.clone())
                .or_else(|| flat.image_alt.clone()),
            gallery: image
                .and_then(|i| i.gallery.clone())
                .or_else(|| flat.gallery.clone()),
            ingredients: flat.ingredients.clone(),
            allergens: flat.allergens.clone(),
            tags: flat.tags.clone(),
            featured: flat.featured,
            status: flat.status.clone(),
        }
    }

    /// Fills absent list fields from an existing product
    pub fn inherit_lists(&mut self, existing: &Product) {
        if self.gallery.is_none() {
            self.gallery = Some(existing.image.gallery.clone());
        }
        if self.ingredients.is_none() {
            self.ingredients = Some(existing.ingredients.clone());
        }
        if self.allergens.is_none() {
            self.allergens = Some(existing.allergens.clone());
        }
        if self.tags.is_none() {
            self.tags = Some(existing.tags.clone());
        }
    }

    /// Stored status, read leniently: unknown spellings count as active
    pub fn resolved_status(&self) -> ProductStatus {
        self.status
            .as_deref()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }

    /// Applies defaults and builds the product
    pub fn into_product(
        self,
        id: Uuid,
        slug: String,
        rating: Rating,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Product, NormalizeError> {
        let status = self.resolved_status();
        let name = self.name.ok_or(NormalizeError::MissingName)?;

        let unit = self.unit.unwrap_or_else(|| DEFAULT_UNIT.to_string());
        let ingredients = self.ingredients.unwrap_or_default();
        let description = self
            .description
            .unwrap_or_else(|| ingredients.join(", "));

        Ok(Product {
            id,
            slug,
            description,
            category: self
                .category
                .unwrap_or_else(|| Category::from_name(DEFAULT_CATEGORY)),
            subcategory: self
                .subcategory
                .unwrap_or_else(|| DEFAULT_SUBCATEGORY.to_string()),
            price: Price {
                amount: self.amount.unwrap_or(Decimal::ZERO).normalize(),
                unit: unit.clone(),
                production_cost: self.production_cost.map(|c| c.normalize()),
                promotion: self.promotion,
            },
            stock: Stock {
                available: self.available.unwrap_or(true),
                quantity: self.quantity.map(|q| q.normalize()),
                minimum: self.minimum.map(|m| m.normalize()),
                unit: self.stock_unit.unwrap_or(unit),
            },
            image: Image {
                href: self
                    .image_href
                    .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
                alt: self.image_alt.unwrap_or_else(|| name.clone()),
                gallery: self.gallery.unwrap_or_default(),
            },
            ingredients,
            allergens: self.allergens.unwrap_or_default(),
            tags: self.tags.unwrap_or_default(),
            rating,
            featured: self.featured.unwrap_or(false),
            status,
            created_at,
            updated_at,
            name,
        })
    }
}

/// Rounds half away from zero to `scale` places.
///
/// Stored documents carry amounts as JSON numbers, and a value at this scale
/// reads back unchanged after a trip through `f64`.
fn to_scale(value: Option<Decimal>, scale: u32) -> Option<Decimal> {
    value.map(|v| {
        v.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
            .normalize()
    })
}

/// A promotion survives only when it is active and carries an amount
fn resolve_promotion(nested: Option<&NestedPromotion>, flat: &FlatFields) -> Option<Promotion> {
    let active = nested
        .and_then(|p| p.active)
        .or(flat.promotion_active)
        .unwrap_or(false);
    let amount = to_scale(
        nested.and_then(|p| p.promo_amount).or(flat.promo_amount),
        MONEY_SCALE,
    );

    match (active, amount) {
        (true, Some(promo_amount)) => Some(Promotion {
            active: true,
            promo_amount: promo_amount.normalize(),
            start: nested.and_then(|p| p.start),
            end: nested.and_then(|p| p.end),
        }),
        _ => None,
    }
}

/// Normalizes a raw stored document into the canonical product.
///
/// `id` is the record's storage identity and always wins over any id inside
/// the document. Slug and timestamps come from the document when present,
/// otherwise from `defaults`; a record with neither gets a slug derived from
/// its name.
pub fn normalize_document(
    id: Uuid,
    document: &Value,
    defaults: &RecordDefaults,
) -> Result<Product, NormalizeError> {
    let shape = StoredShape::decode(document)?;
    let flat = shape.flat();

    let slug = flat
        .slug
        .clone()
        .or_else(|| defaults.slug.clone())
        .or_else(|| flat.name.as_deref().map(slug_base))
        .unwrap_or_default();
    let rating = flat.rating.clone().unwrap_or_default();
    let created_at = flat.created_at.unwrap_or(defaults.created_at);
    let updated_at = flat.updated_at.unwrap_or(defaults.updated_at);

    ProductFields::from_shape(&shape).into_product(id, slug, rating, created_at, updated_at)
}

/// Normalizes one stored row
pub fn normalize_row(row: &StoredProduct) -> Result<Product, NormalizeError> {
    normalize_document(row.id, &row.document, &RecordDefaults::from(row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn defaults() -> RecordDefaults {
        RecordDefaults::at(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap())
    }

    fn normalize(doc: Value) -> Product {
        normalize_document(Uuid::nil(), &doc, &defaults()).unwrap()
    }

    #[test]
    fn legacy_valor_and_vtipo_become_price() {
        let product = normalize(json!({ "nome": "Sonho", "valor": 5, "vtipo": "UN" }));

        assert_eq!(product.price.amount, dec!(5));
        assert_eq!(product.price.unit, "UN");
        assert_eq!(product.price.production_cost, None);
        assert_eq!(product.price.promotion, None);
    }

    #[test]
    fn ingredient_string_is_split_and_null_is_empty() {
        let split = normalize(json!({ "name": "Torta", "ingredients": "a, b, c" }));
        assert_eq!(split.ingredients, vec!["a", "b", "c"]);
        assert_eq!(split.description, "a, b, c");

        let null = normalize(json!({ "name": "Torta", "ingredients": null }));
        assert!(null.ingredients.is_empty());
    }

    #[test]
    fn documented_defaults_apply() {
        let product = normalize(json!({ "name": "Broa" }));

        assert_eq!(product.subcategory, DEFAULT_SUBCATEGORY);
        assert_eq!(product.price.unit, DEFAULT_UNIT);
        assert_eq!(product.price.amount, Decimal::ZERO);
        assert_eq!(product.stock.unit, DEFAULT_UNIT);
        assert!(product.stock.available);
        assert_eq!(product.image.alt, "Broa");
        assert_eq!(product.image.href, PLACEHOLDER_IMAGE);
        assert_eq!(product.status, ProductStatus::Active);
        assert!(!product.featured);
        assert_eq!(product.rating, Rating::default());
        assert_eq!(product.slug, "broa");
        assert_eq!(product.created_at, defaults().created_at);
    }

    #[test]
    fn nested_fields_win_over_flat_ones() {
        let product = normalize(json!({
            "name": "Pao de Queijo",
            "price": { "amount": 1.5, "unit": "KG" },
            "valor": 9,
            "vtipo": "UN",
            "stock": { "available": false },
            "disponivel": true,
            "image": { "href": "pq.png", "alt": "Pao", "gallery": ["1.png"] },
            "category": { "name": "Salgados", "slug": "salgados" },
            "subc": "Assados"
        }));

        assert_eq!(product.price.amount, dec!(1.5));
        assert_eq!(product.price.unit, "KG");
        assert!(!product.stock.available);
        assert_eq!(product.stock.unit, "KG");
        assert_eq!(product.image.gallery, vec!["1.png"]);
        assert_eq!(product.category.slug, "salgados");
        assert_eq!(product.subcategory, "Assados");
    }

    #[test]
    fn legacy_category_string_resolves_to_canonical() {
        let product = normalize(json!({ "nome": "Brigadeiro", "categoria": "doces" }));
        assert_eq!(product.category, Category::from_name("Doces"));
    }

    #[test]
    fn legacy_pause_status_reads_as_inactive() {
        let product = normalize(json!({ "nome": "Pudim", "status": "pause" }));
        assert_eq!(product.status, ProductStatus::Inactive);
    }

    #[test]
    fn inactive_promotion_is_dropped() {
        let off = normalize(json!({
            "name": "Bolo",
            "price": { "amount": 30, "promotion": { "active": false, "promoAmount": 25 } }
        }));
        assert_eq!(off.price.promotion, None);

        let on = normalize(json!({ "nome": "Bolo", "valor": 30, "promocao": true, "valorPromo": "25,90" }));
        assert_eq!(on.price.promotion.map(|p| p.promo_amount), Some(dec!(25.9)));
    }

    #[test]
    fn missing_name_is_an_error() {
        assert_matches!(
            normalize_document(Uuid::nil(), &json!({ "valor": 3 }), &defaults()),
            Err(NormalizeError::MissingName)
        );
        assert_matches!(
            normalize_document(Uuid::nil(), &json!("text"), &defaults()),
            Err(NormalizeError::Decode(DecodeError::NotAnObject))
        );
    }

    #[test]
    fn normalizing_own_output_is_stable() {
        let first = normalize(json!({
            "nome": "Pão Francês",
            "valor": "0,80",
            "vtipo": "UN",
            "subc": "Tradicionais",
            "img": "pao.png",
            "ingredientes": "farinha, agua, sal",
            "destaque": "sim",
            "promocao": true,
            "valorPromo": 0.7,
            "quantidade": 120,
            "estoqueMinimo": 20,
            "categoria": "Paes",
            "rating": { "average": 4.5, "count": 2, "perUser": [] }
        }));
        let second = normalize_document(first.id, &first.to_document(), &defaults()).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn update_inherits_absent_lists_only() {
        let existing = normalize(json!({
            "name": "Esfiha",
            "ingredients": ["carne"],
            "tags": ["assado"]
        }));
        let mut fields = ProductFields::from_document(&json!({
            "name": "Esfiha",
            "ingredients": null,
            "tags": []
        }))
        .unwrap();

        fields.inherit_lists(&existing);

        assert_eq!(fields.ingredients, Some(vec!["carne".to_string()]));
        assert_eq!(fields.tags, Some(vec![]));
        assert_eq!(fields.allergens, Some(vec![]));
    }

    #[test]
    fn amounts_are_kept_at_currency_scale() {
        let record = json!({
            "nome": "Sonho",
            "valor": "1.23456789012345678901",
            "custo": 0.005,
            "quantidade": "2,34567"
        });
        let first = normalize(record);
        assert_eq!(first.price.amount, dec!(1.23));
        assert_eq!(first.price.production_cost, Some(dec!(0.01)));
        assert_eq!(first.stock.quantity, Some(dec!(2.346)));

        let again = normalize_document(first.id, &first.to_document(), &defaults()).unwrap();
        assert_eq!(again, first);
    }
}
