//! Decode boundary for stored product documents.
//!
//! The unified collection holds records written in two shapes: the legacy flat
//! layout inherited from the per-category collections (`valor`, `vtipo`,
//! `subc`, `img`, comma-joined ingredient strings, ...) and the nested layout
//! written by the current service. [`StoredShape::decode`] classifies a raw
//! document by presence checks and lifts every loosely typed field into a
//! concrete Rust type, so nothing past this module ever has to ask whether a
//! list arrived as a string or a price arrived as text.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::str::FromStr;
use thiserror::Error;

use super::product::Rating;

#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("stored record is not a JSON object")]
    NotAnObject,
}

/// A raw stored document, classified by shape
#[derive(Debug, Clone, PartialEq)]
pub enum StoredShape {
    /// Pre-unification record: every field is top-level and flat
    Legacy(FlatFields),
    /// Current record: nested objects, with flat keys kept as per-field fallbacks
    Unified(UnifiedRecord),
}

/// Keys whose object-valued presence marks a record as unified
const NESTED_MARKERS: [&str; 4] = ["price", "image", "stock", "category"];

impl StoredShape {
    pub fn decode(document: &Value) -> Result<Self, DecodeError> {
        let map = document.as_object().ok_or(DecodeError::NotAnObject)?;
        let fields = Fields(map);

        let flat = FlatFields::read(&fields);
        let is_unified = NESTED_MARKERS
            .iter()
            .any(|key| map.get(*key).map_or(false, Value::is_object));

        if is_unified {
            Ok(StoredShape::Unified(UnifiedRecord {
                nested: NestedFields::read(&fields),
                flat,
            }))
        } else {
            Ok(StoredShape::Legacy(flat))
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, StoredShape::Legacy(_))
    }

    /// Flat fields, present in both shapes
    pub fn flat(&self) -> &FlatFields {
        match self {
            StoredShape::Legacy(flat) => flat,
            StoredShape::Unified(record) => &record.flat,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnifiedRecord {
    pub nested: NestedFields,
    pub flat: FlatFields,
}

/// Top-level scalar fields, under both their legacy and current key names
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatFields {
    pub id: Option<String>,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub amount: Option<Decimal>,
    pub unit: Option<String>,
    pub production_cost: Option<Decimal>,
    pub promotion_active: Option<bool>,
    pub promo_amount: Option<Decimal>,
    pub image: Option<String>,
    pub image_alt: Option<String>,
    pub gallery: Option<Vec<String>>,
    pub ingredients: Option<Vec<String>>,
    pub allergens: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub available: Option<bool>,
    pub quantity: Option<Decimal>,
    pub minimum: Option<Decimal>,
    pub stock_unit: Option<String>,
    pub featured: Option<bool>,
    pub status: Option<String>,
    pub deleted: Option<bool>,
    pub rating: Option<Rating>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl FlatFields {
    fn read(fields: &Fields<'_>) -> Self {
        Self {
            id: fields.id(),
            name: fields.text(&["name", "nome"]),
            slug: fields.text(&["slug"]),
            description: fields.text(&["description", "descricao"]),
            category: fields.text(&["category", "categoria"]),
            subcategory: fields.text(&["subcategory", "subcategoria", "subc"]),
            amount: fields.decimal(&["price", "preco", "valor"]),
            unit: fields.text(&["unit", "unidade", "vtipo"]),
            production_cost: fields.decimal(&["productionCost", "custo"]),
            promotion_active: fields.flag(&["promocao", "promotion"]),
            promo_amount: fields.decimal(&["promoAmount", "valorPromo"]),
            image: fields.text(&["imageUrl", "image", "img"]),
            image_alt: fields.text(&["imageAlt", "alt"]),
            gallery: fields.list(&["gallery", "galeria"]),
            ingredients: fields.list(&["ingredients", "ingredientes"]),
            allergens: fields.list(&["allergens", "alergenicos"]),
            tags: fields.list(&["tags"]),
            available: fields.flag(&["available", "disponivel"]),
            quantity: fields.decimal(&["quantity", "quantidade"]),
            minimum: fields.decimal(&["minimum", "estoqueMinimo"]),
            stock_unit: fields.text(&["stockUnit"]),
            featured: fields.flag(&["featured", "destaque"]),
            status: fields.text(&["status"]),
            deleted: fields.flag(&["deleted"]),
            rating: fields.rating(),
            created_at: fields.timestamp(&["createdAt", "created_at"]),
            updated_at: fields.timestamp(&["updatedAt", "updated_at"]),
        }
    }
}

/// Nested objects of the unified layout
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NestedFields {
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
    pub price: Option<NestedPrice>,
    pub stock: Option<NestedStock>,
    pub image: Option<NestedImage>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NestedPrice {
    pub amount: Option<Decimal>,
    pub unit: Option<String>,
    pub production_cost: Option<Decimal>,
    pub promotion: Option<NestedPromotion>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NestedPromotion {
    pub active: Option<bool>,
    pub promo_amount: Option<Decimal>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NestedStock {
    pub available: Option<bool>,
    pub quantity: Option<Decimal>,
    pub minimum: Option<Decimal>,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NestedImage {
    pub href: Option<String>,
    pub alt: Option<String>,
    pub gallery: Option<Vec<String>>,
}

impl NestedFields {
    fn read(fields: &Fields<'_>) -> Self {
        let category = fields.object("category");
        Self {
            category_name: category.as_ref().and_then(|c| c.text(&["name", "nome"])),
            category_slug: category.as_ref().and_then(|c| c.text(&["slug"])),
            price: fields.object("price").map(|p| NestedPrice {
                amount: p.decimal(&["amount", "valor"]),
                unit: p.text(&["unit", "vtipo"]),
                production_cost: p.decimal(&["productionCost", "custo"]),
                promotion: p.object("promotion").map(|promo| NestedPromotion {
                    active: promo.flag(&["active"]),
                    promo_amount: promo.decimal(&["promoAmount", "amount"]),
                    start: promo.timestamp(&["start"]),
                    end: promo.timestamp(&["end"]),
                }),
            }),
            stock: fields.object("stock").map(|s| NestedStock {
                available: s.flag(&["available", "disponivel"]),
                quantity: s.decimal(&["quantity", "quantidade"]),
                minimum: s.decimal(&["minimum", "minimo"]),
                unit: s.text(&["unit"]),
            }),
            image: fields.object("image").map(|i| NestedImage {
                href: i.text(&["href", "url"]),
                alt: i.text(&["alt"]),
                gallery: i.list(&["gallery"]),
            }),
        }
    }
}

/// Typed accessors over one JSON object; the first key present wins
struct Fields<'a>(&'a Map<String, Value>);

impl<'a> Fields<'a> {
    fn first(&self, keys: &[&str]) -> Option<&'a Value> {
        keys.iter()
            .filter_map(|key| self.0.get(*key))
            .find(|value| !value.is_null())
    }

    fn object(&self, key: &str) -> Option<Fields<'a>> {
        self.0.get(key).and_then(Value::as_object).map(Fields)
    }

    fn id(&self) -> Option<String> {
        match self.first(&["id", "_id"])? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Object(map) => map.get("$oid").and_then(Value::as_str).map(str::to_string),
            _ => None,
        }
    }

    /// Non-empty trimmed string; numbers are stringified
    fn text(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| match self.0.get(*key)? {
            Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    fn decimal(&self, keys: &[&str]) -> Option<Decimal> {
        keys.iter().find_map(|key| loose_decimal(self.0.get(*key)?))
    }

    fn flag(&self, keys: &[&str]) -> Option<bool> {
        keys.iter().find_map(|key| loose_bool(self.0.get(*key)?))
    }

    fn list(&self, keys: &[&str]) -> Option<Vec<String>> {
        keys.iter().find_map(|key| loose_list(self.0.get(*key)?))
    }

    fn timestamp(&self, keys: &[&str]) -> Option<DateTime<Utc>> {
        keys.iter().find_map(|key| loose_timestamp(self.0.get(*key)?))
    }

    fn rating(&self) -> Option<Rating> {
        let value = self.0.get("rating").filter(|v| v.is_object())?;
        serde_json::from_value(value.clone()).ok()
    }
}

/// Accepts a JSON number or numeric text, including a decimal comma ("4,50")
pub fn loose_decimal(value: &Value) -> Option<Decimal> {
    let decimal = match value {
        Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
                .or_else(|| n.as_f64().and_then(Decimal::from_f64))
        }
        Value::String(s) => {
            let cleaned = s.trim().replace(',', ".");
            Decimal::from_str(&cleaned).ok()
        }
        _ => None,
    }?;
    Some(decimal.normalize())
}

/// Accepts booleans, 0/1 and the usual textual spellings
pub fn loose_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "sim" | "yes" => Some(true),
            "false" | "0" | "nao" | "não" | "no" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Accepts a native list or a comma-separated string; `null` is "absent"
pub fn loose_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .filter(|s| !s.is_empty())
                .collect(),
        ),
        Value::String(s) => Some(split_list(s)),
        _ => None,
    }
}

pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// RFC 3339 text, epoch milliseconds, or an extended-JSON `{"$date": ...}` wrapper
pub fn loose_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        Value::Object(map) => map.get("$date").and_then(loose_timestamp),
        _ => None,
    }
}
