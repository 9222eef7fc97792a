use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::cmp::Ordering;
use uuid::Uuid;

use super::{Page, ProductFilter, ProductOrder, ProductRepository, StoreError, StoredProduct};

/// Process-local product store backed by concurrent maps.
///
/// The slug index is updated through the map's entry API, so two racing
/// inserts of the same slug resolve to one winner and one
/// [`StoreError::DuplicateSlug`], the same contract the SQL unique index gives.
#[derive(Debug, Default)]
pub struct InMemoryProductRepository {
    rows: DashMap<Uuid, StoredProduct>,
    slugs: DashMap<String, Uuid>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn snapshot(&self) -> Vec<StoredProduct> {
        self.rows.iter().map(|entry| entry.value().clone()).collect()
    }
}

pub(crate) fn compare_rows(order: ProductOrder, a: &StoredProduct, b: &StoredProduct) -> Ordering {
    let newest = b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id));
    match order {
        ProductOrder::FeaturedThenNewest => b.featured.cmp(&a.featured).then(newest),
        ProductOrder::NewestFirst => newest,
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<StoredProduct>, StoreError> {
        Ok(self.rows.get(&id).map(|row| row.value().clone()))
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<StoredProduct>, StoreError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.rows.get(id).map(|row| row.value().clone()))
            .collect())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<StoredProduct>, StoreError> {
        let Some(id) = self.slugs.get(slug).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        self.find_by_id(id).await
    }

    async fn slug_exists(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool, StoreError> {
        Ok(self
            .slugs
            .get(slug)
            .map_or(false, |owner| Some(*owner.value()) != exclude))
    }

    async fn name_exists(
        &self,
        name_key: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, StoreError> {
        Ok(self
            .rows
            .iter()
            .any(|row| row.name_key == name_key && Some(row.id) != exclude))
    }

    async fn find(
        &self,
        filter: &ProductFilter,
        order: ProductOrder,
        page: Page,
    ) -> Result<Vec<StoredProduct>, StoreError> {
        let mut rows: Vec<_> = self
            .snapshot()
            .into_iter()
            .filter(|row| filter.matches(row))
            .collect();
        rows.sort_by(|a, b| compare_rows(order, a, b));

        let limit = page.limit.map_or(usize::MAX, |l| l as usize);
        Ok(rows
            .into_iter()
            .skip(page.offset as usize)
            .take(limit)
            .collect())
    }

    async fn count(&self, filter: &ProductFilter) -> Result<u64, StoreError> {
        Ok(self.rows.iter().filter(|row| filter.matches(row)).count() as u64)
    }

    async fn insert(&self, row: StoredProduct) -> Result<(), StoreError> {
        match self.slugs.entry(row.slug.clone()) {
            Entry::Occupied(_) => return Err(StoreError::DuplicateSlug(row.slug)),
            Entry::Vacant(vacant) => {
                vacant.insert(row.id);
            }
        }
        self.rows.insert(row.id, row);
        Ok(())
    }

    async fn replace(&self, row: StoredProduct) -> Result<bool, StoreError> {
        let Some(previous_slug) = self.rows.get(&row.id).map(|r| r.slug.clone()) else {
            return Ok(false);
        };

        if previous_slug != row.slug {
            match self.slugs.entry(row.slug.clone()) {
                Entry::Occupied(owner) if *owner.get() != row.id => {
                    return Err(StoreError::DuplicateSlug(row.slug));
                }
                Entry::Occupied(_) => {}
                Entry::Vacant(vacant) => {
                    vacant.insert(row.id);
                }
            }
            self.slugs.remove_if(&previous_slug, |_, owner| *owner == row.id);
        }

        self.rows.insert(row.id, row);
        Ok(true)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        match self.rows.remove(&id) {
            Some((_, row)) => {
                self.slugs.remove_if(&row.slug, |_, owner| *owner == id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
