use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LegacySourceError {
    #[error("collection '{collection}' could not be read: {source}")]
    Io {
        collection: String,
        #[source]
        source: std::io::Error,
    },

    #[error("collection '{collection}' is not valid JSON: {source}")]
    Parse {
        collection: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("collection '{0}' is not a JSON array")]
    NotAnArray(String),

    #[error("collection '{0}' not found")]
    Missing(String),
}

/// Read access to the pre-unification per-category collections
#[async_trait]
pub trait LegacySource: Send + Sync {
    async fn fetch_collection(&self, collection: &str) -> Result<Vec<Value>, LegacySourceError>;
}

/// Reads collection exports laid out as `<dir>/<collection>.json`, each a JSON array
#[derive(Debug, Clone)]
pub struct JsonDirectorySource {
    dir: PathBuf,
}

impl JsonDirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl LegacySource for JsonDirectorySource {
    async fn fetch_collection(&self, collection: &str) -> Result<Vec<Value>, LegacySourceError> {
        let path = self.dir.join(format!("{collection}.json"));
        debug!(path = %path.display(), "reading legacy collection export");

        let raw = tokio::fs::read(&path).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                LegacySourceError::Missing(collection.to_string())
            } else {
                LegacySourceError::Io {
                    collection: collection.to_string(),
                    source,
                }
            }
        })?;

        let parsed: Value =
            serde_json::from_slice(&raw).map_err(|source| LegacySourceError::Parse {
                collection: collection.to_string(),
                source,
            })?;

        match parsed {
            Value::Array(records) => Ok(records),
            _ => Err(LegacySourceError::NotAnArray(collection.to_string())),
        }
    }
}

/// Fixed collections held in memory; unknown collections are `Missing`
#[derive(Debug, Clone, Default)]
pub struct InMemoryLegacySource {
    collections: HashMap<String, Vec<Value>>,
}

impl InMemoryLegacySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, name: &str, records: Vec<Value>) -> Self {
        self.collections.insert(name.to_string(), records);
        self
    }
}

#[async_trait]
impl LegacySource for InMemoryLegacySource {
    async fn fetch_collection(&self, collection: &str) -> Result<Vec<Value>, LegacySourceError> {
        self.collections
            .get(collection)
            .cloned()
            .ok_or_else(|| LegacySourceError::Missing(collection.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[tokio::test]
    async fn reads_array_exports_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("paes.json"),
            json!([{ "nome": "Pao Frances", "valor": 0.8 }]).to_string(),
        )
        .unwrap();
        std::fs::write(dir.path().join("doces.json"), "{\"nome\": \"x\"}").unwrap();
        std::fs::write(dir.path().join("bolos.json"), "not json").unwrap();

        let source = JsonDirectorySource::new(dir.path());

        let paes = source.fetch_collection("paes").await.unwrap();
        assert_eq!(paes.len(), 1);
        assert_eq!(paes[0]["nome"], "Pao Frances");

        assert_matches!(
            source.fetch_collection("doces").await,
            Err(LegacySourceError::NotAnArray(c)) if c == "doces"
        );
        assert_matches!(
            source.fetch_collection("bolos").await,
            Err(LegacySourceError::Parse { .. })
        );
        assert_matches!(
            source.fetch_collection("tortas").await,
            Err(LegacySourceError::Missing(c)) if c == "tortas"
        );
    }

    #[tokio::test]
    async fn in_memory_source_returns_configured_records() {
        let source = InMemoryLegacySource::new().with_collection("salgados", vec![json!({})]);
        assert_eq!(source.fetch_collection("salgados").await.unwrap().len(), 1);
        assert!(source.fetch_collection("bebidas").await.is_err());
    }
}
