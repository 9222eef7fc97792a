use super::product::Category;

/// A pre-unification per-category collection and the category it maps to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LegacyCollection {
    /// Collection name in the legacy store
    pub collection: &'static str,
    /// Display name of the canonical category
    pub category_name: &'static str,
}

impl LegacyCollection {
    pub fn category(&self) -> Category {
        Category::from_name(self.category_name)
    }
}

/// The seven legacy collections, in migration order
pub const LEGACY_COLLECTIONS: [LegacyCollection; 7] = [
    LegacyCollection {
        collection: "paes",
        category_name: "Paes",
    },
    LegacyCollection {
        collection: "salgados",
        category_name: "Salgados",
    },
    LegacyCollection {
        collection: "doces",
        category_name: "Doces",
    },
    LegacyCollection {
        collection: "bolos",
        category_name: "Bolos",
    },
    LegacyCollection {
        collection: "tortas",
        category_name: "Tortas",
    },
    LegacyCollection {
        collection: "bebidas",
        category_name: "Bebidas",
    },
    LegacyCollection {
        collection: "lanches",
        category_name: "Lanches",
    },
];

/// Canonical storefront categories
pub fn canonical_categories() -> Vec<Category> {
    LEGACY_COLLECTIONS.iter().map(LegacyCollection::category).collect()
}

/// Finds the canonical category whose name or slug matches `raw`, ignoring case
pub fn find_canonical(raw: &str) -> Option<Category> {
    let needle = raw.trim().to_lowercase();
    canonical_categories()
        .into_iter()
        .find(|c| c.slug == needle || c.name.to_lowercase() == needle)
}
