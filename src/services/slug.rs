use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::repositories::{ProductRepository, StoreError};

/// Base used when a name yields no usable characters
pub const FALLBACK_SLUG_BASE: &str = "produto";

/// Probe ceiling used when the caller has no configured value
pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;

static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9\s-]").expect("static slug pattern is valid"));
static SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s-]+").expect("static slug pattern is valid"));

/// Builds the URL token for a display name.
///
/// Lowercases, transliterates Latin diacritics, drops anything outside
/// `[a-z0-9\s-]`, joins whitespace and hyphen runs into one `-` and trims
/// hyphens from both ends. May return an empty string.
pub fn slugify(name: &str) -> String {
    let folded: String = name
        .to_lowercase()
        .chars()
        .map(|ch| match fold_latin(ch) {
            Some(ascii) => ascii.to_string(),
            None => ch.to_string(),
        })
        .collect();

    let cleaned = DISALLOWED.replace_all(&folded, "");
    let dashed = SEPARATORS.replace_all(cleaned.trim(), "-");
    dashed.trim_matches('-').to_string()
}

/// Slug base for a name, never empty
pub fn slug_base(name: &str) -> String {
    let slug = slugify(name);
    if slug.is_empty() {
        FALLBACK_SLUG_BASE.to_string()
    } else {
        slug
    }
}

fn fold_latin(ch: char) -> Option<&'static str> {
    let ascii = match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'æ' => "ae",
        'ç' | 'ć' | 'č' | 'ĉ' => "c",
        'ď' | 'đ' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => "e",
        'ğ' | 'ĝ' => "g",
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' | 'ı' => "i",
        'ł' | 'ľ' | 'ĺ' => "l",
        'ñ' | 'ń' | 'ň' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => "o",
        'œ' => "oe",
        'ř' | 'ŕ' => "r",
        'ß' => "ss",
        'ś' | 'š' | 'ş' => "s",
        'ť' | 'ţ' => "t",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' | 'ų' => "u",
        'ý' | 'ÿ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        _ => return None,
    };
    Some(ascii)
}

#[derive(Debug, Error)]
pub enum SlugError {
    #[error("no free slug for '{base}' after {attempts} attempts")]
    Exhausted { base: String, attempts: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<SlugError> for ServiceError {
    fn from(err: SlugError) -> Self {
        match err {
            SlugError::Exhausted { base, attempts } => ServiceError::SlugExhausted { base, attempts },
            SlugError::Store(e) => ServiceError::Store(e),
        }
    }
}

/// Existence check used by slug resolution
#[async_trait]
pub trait SlugLookup: Send + Sync {
    /// Whether a record other than `exclude` already uses `slug`
    async fn slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool, StoreError>;
}

#[async_trait]
impl<R> SlugLookup for R
where
    R: ProductRepository + ?Sized,
{
    async fn slug_taken(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool, StoreError> {
        self.slug_exists(slug, exclude).await
    }
}

/// Finds the first free token among `base`, `base-1`, `base-2`, ...
///
/// `exclude` lets a record keep its own slug on update. Gives up with
/// [`SlugError::Exhausted`] after `max_attempts` probes.
pub async fn resolve_unique_slug<L>(
    lookup: &L,
    name: &str,
    exclude: Option<Uuid>,
    max_attempts: u32,
) -> Result<String, SlugError>
where
    L: SlugLookup + ?Sized,
{
    let base = slug_base(name);

    for attempt in 0..max_attempts {
        let candidate = if attempt == 0 {
            base.clone()
        } else {
            format!("{base}-{attempt}")
        };

        if !lookup.slug_taken(&candidate, exclude).await? {
            debug!(slug = %candidate, attempt, "resolved unique slug");
            return Ok(candidate);
        }
    }

    warn!(base = %base, max_attempts, "slug space exhausted");
    Err(SlugError::Exhausted {
        base,
        attempts: max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;
    use std::collections::HashSet;

    struct Taken(HashSet<String>);

    #[async_trait]
    impl SlugLookup for Taken {
        async fn slug_taken(&self, slug: &str, _exclude: Option<Uuid>) -> Result<bool, StoreError> {
            Ok(self.0.contains(slug))
        }
    }

    fn taken(slugs: &[&str]) -> Taken {
        Taken(slugs.iter().map(|s| s.to_string()).collect())
    }

    #[rstest]
    #[case("Pão Francês", "pao-frances")]
    #[case("  Bolo de Cenoura  ", "bolo-de-cenoura")]
    #[case("Café & Leite!!", "cafe-leite")]
    #[case("Coxinha", "coxinha")]
    #[case("Mini -- Pizza", "mini-pizza")]
    #[case("Crème Brûlée", "creme-brulee")]
    #[case("Pão_de_Queijo", "paodequeijo")]
    #[case("???", "")]
    fn slugify_cases(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(slugify(name), expected);
    }

    #[test]
    fn empty_slug_uses_fallback_base() {
        assert_eq!(slug_base("!!!"), FALLBACK_SLUG_BASE);
    }

    #[tokio::test]
    async fn free_base_is_used_as_is() {
        let slug = resolve_unique_slug(&taken(&[]), "Pão Francês", None, 100)
            .await
            .unwrap();
        assert_eq!(slug, "pao-frances");
    }

    #[tokio::test]
    async fn taken_base_gets_numeric_suffix() {
        let lookup = taken(&["pao-frances", "pao-frances-1"]);
        let slug = resolve_unique_slug(&lookup, "Pão Francês", None, 100)
            .await
            .unwrap();
        assert_eq!(slug, "pao-frances-2");
    }

    #[tokio::test]
    async fn gives_up_after_ceiling() {
        let lookup = taken(&["sonho", "sonho-1", "sonho-2"]);
        let err = resolve_unique_slug(&lookup, "Sonho", None, 3)
            .await
            .unwrap_err();
        assert_matches!(err, SlugError::Exhausted { base, attempts: 3 } if base == "sonho");
    }
}
