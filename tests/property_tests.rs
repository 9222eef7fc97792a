//! Property-based tests for the slug generator and the product normalizer.
//!
//! Proptest drives slug and normalizer properties across generated names
//! and legacy records.

use bakery_catalog::services::normalizer::{normalize_document, RecordDefaults};
use bakery_catalog::services::slug::{slug_base, slugify};
use chrono::{TimeZone, Utc};
use once_cell::sync::Lazy;
use proptest::prelude::*;
use regex::Regex;
use serde_json::{json, Value};
use uuid::Uuid;

static SLUG_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").unwrap());

// Strategies for generating test data
fn display_name_strategy() -> impl Strategy<Value = String> {
    "[A-Za-zÀ-ÿ0-9 _.!&-]{0,12}[A-Za-z0-9][A-Za-zÀ-ÿ0-9 _.!&-]{0,12}"
}

fn ingredients_strategy() -> impl Strategy<Value = Value> {
    let words = prop::collection::vec("[a-z]{1,8}", 0..5);
    prop_oneof![
        words.clone().prop_map(|w| json!(w.join(", "))),
        words.prop_map(|w| json!(w)),
        Just(Value::Null),
    ]
}

fn price_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        (1u32..100_000).prop_map(|cents| json!(f64::from(cents) / 100.0)),
        "[0-9]{1,5}[.,][0-9]{1,20}".prop_map(|text| json!(text)),
    ]
}

fn legacy_record_strategy() -> impl Strategy<Value = Value> {
    (
        display_name_strategy(),
        price_strategy(),
        prop_oneof![Just("UN"), Just("KG"), Just("CX")],
        ingredients_strategy(),
        prop_oneof![
            Just("active"),
            Just("pause"),
            Just("seasonal"),
            Just("inativo"),
            Just("ativo")
        ],
        any::<bool>(),
        prop_oneof![Just("paes"), Just("Doces"), Just("Confeitaria")],
    )
        .prop_map(|(name, price, unit, ingredients, status, featured, category)| {
            json!({
                "nome": name,
                "valor": price,
                "vtipo": unit,
                "ingredientes": ingredients,
                "status": status,
                "destaque": featured,
                "categoria": category
            })
        })
}

fn defaults() -> RecordDefaults {
    RecordDefaults::at(Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap())
}

// Property: slugs are lowercase ASCII words joined by single hyphens
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn slug_of_a_display_name_has_canonical_shape(name in display_name_strategy()) {
        let slug = slugify(&name);
        prop_assert!(SLUG_SHAPE.is_match(&slug), "bad slug {:?} for {:?}", slug, name);
    }

    #[test]
    fn slug_base_is_never_empty_or_malformed(name in any::<String>()) {
        let slug = slug_base(&name);
        prop_assert!(SLUG_SHAPE.is_match(&slug), "bad slug {:?} for {:?}", slug, name);
    }

    #[test]
    fn slugify_is_idempotent(name in display_name_strategy()) {
        let once = slugify(&name);
        prop_assert_eq!(slugify(&once), once);
    }
}

// Property: normalizing an already normalized record changes nothing
proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn normalizer_is_idempotent(record in legacy_record_strategy()) {
        let id = Uuid::new_v4();
        let first = normalize_document(id, &record, &defaults()).unwrap();
        let second = normalize_document(id, &first.to_document(), &defaults()).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn textual_prices_survive_renormalization(digits in "[0-9]{1,5}\\.[0-9]{1,20}") {
        let record = json!({ "nome": "Sonho", "valor": digits });
        let id = Uuid::new_v4();
        let first = normalize_document(id, &record, &defaults()).unwrap();
        let second = normalize_document(id, &first.to_document(), &defaults()).unwrap();
        prop_assert_eq!(first.price.amount, second.price.amount);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn normalized_lists_are_always_arrays(record in legacy_record_strategy()) {
        let product = normalize_document(Uuid::new_v4(), &record, &defaults()).unwrap();
        let document = product.to_document();
        prop_assert!(document["ingredients"].is_array());
        prop_assert!(document["allergens"].is_array());
        prop_assert!(document["tags"].is_array());
    }
}
