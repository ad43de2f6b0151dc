use tracing::debug;
use uuid::Uuid;

use pensive_store::{ConceptStore, Result};

use crate::builder::{build_from_parts, ConceptMap};
use crate::snapshot::MapCache;

/// Builds concept maps from the store, serving unsearched queries from the
/// snapshot cache. Search results are parameterized by free text and
/// considered low-reuse, so they are never cached.
pub struct ConceptMapService {
    concepts: ConceptStore,
    cache: MapCache,
}

impl ConceptMapService {
    pub fn new(concepts: ConceptStore) -> Self {
        Self {
            concepts,
            cache: MapCache::default(),
        }
    }

    pub async fn build_concept_map(
        &self,
        user_id: Uuid,
        abstraction_level: u8,
        search: Option<&str>,
    ) -> Result<ConceptMap> {
        let level = abstraction_level.min(100);
        let search = search.map(str::trim).filter(|s| !s.is_empty());

        if search.is_none() {
            if let Some(map) = self.cache.get(user_id, level) {
                debug!(%user_id, level, "Concept map cache hit");
                return Ok(map);
            }
        }

        let concepts = self.concepts.concepts_for_user(user_id, search).await?;
        let ids: Vec<Uuid> = concepts.iter().map(|c| c.id).collect();
        let relationships = self.concepts.relationships_among(user_id, &ids).await?;

        let map = build_from_parts(&concepts, &relationships, level);

        if search.is_none() {
            self.cache.insert(user_id, level, map.clone());
        }

        Ok(map)
    }

    /// Drop cached maps for a user after their concepts change.
    pub fn invalidate_user(&self, user_id: Uuid) {
        self.cache.invalidate_user(user_id);
    }
}
