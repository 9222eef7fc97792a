pub mod category;
pub mod product;
pub mod stored;

pub use category::{canonical_categories, LegacyCollection, LEGACY_COLLECTIONS};
pub use product::{
    Category, Image, Price, Product, ProductStatus, Promotion, Rating, Stock, UserRating,
};
pub use stored::{DecodeError, StoredShape};
