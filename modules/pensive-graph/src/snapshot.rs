// Snapshot cache for built concept maps, keyed by (user, abstraction level).
// Reads are lock-free; writes clone-and-swap the whole map, which stays
// small (one entry per recently queried user/level pair).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use uuid::Uuid;

use crate::builder::ConceptMap;

/// Unsearched concept maps are served from cache for 10 minutes.
pub const MAP_CACHE_TTL: Duration = Duration::from_secs(600);

struct CachedMap {
    map: ConceptMap,
    cached_at: Instant,
}

pub struct MapCache {
    inner: ArcSwap<HashMap<(Uuid, u8), Arc<CachedMap>>>,
    ttl: Duration,
}

impl Default for MapCache {
    fn default() -> Self {
        Self::new(MAP_CACHE_TTL)
    }
}

impl MapCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: ArcSwap::new(Arc::new(HashMap::new())),
            ttl,
        }
    }

    pub fn get(&self, user_id: Uuid, level: u8) -> Option<ConceptMap> {
        let snap = self.inner.load_full();
        let entry = snap.get(&(user_id, level))?;
        if entry.cached_at.elapsed() >= self.ttl {
            return None;
        }
        Some(entry.map.clone())
    }

    pub fn insert(&self, user_id: Uuid, level: u8, map: ConceptMap) {
        let entry = Arc::new(CachedMap {
            map,
            cached_at: Instant::now(),
        });
        self.inner.rcu(|current| {
            let mut next: HashMap<(Uuid, u8), Arc<CachedMap>> = HashMap::clone(current);
            let now = Instant::now();
            next.retain(|_, e| now.duration_since(e.cached_at) < self.ttl);
            next.insert((user_id, level), Arc::clone(&entry));
            next
        });
    }

    /// Drop every cached level for a user. Called when new analyses land.
    pub fn invalidate_user(&self, user_id: Uuid) {
        self.inner.rcu(|current| {
            let mut next: HashMap<(Uuid, u8), Arc<CachedMap>> = HashMap::clone(current);
            next.retain(|(uid, _), _| *uid != user_id);
            next
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_with_nodes(n: usize) -> ConceptMap {
        use crate::builder::ConceptNode;
        ConceptMap {
            nodes: (0..n)
                .map(|i| ConceptNode {
                    id: Uuid::new_v4(),
                    label: format!("n{i}"),
                    node_type: "topic".into(),
                    frequency: 1,
                    density: 50.0,
                    description: String::new(),
                })
                .collect(),
            edges: Vec::new(),
        }
    }

    #[test]
    fn insert_then_get() {
        let cache = MapCache::default();
        let user = Uuid::new_v4();
        cache.insert(user, 50, map_with_nodes(3));

        let hit = cache.get(user, 50).unwrap();
        assert_eq!(hit.nodes.len(), 3);
        assert!(cache.get(user, 80).is_none());
        assert!(cache.get(Uuid::new_v4(), 50).is_none());
    }

    #[test]
    fn expired_entries_miss() {
        let cache = MapCache::new(Duration::ZERO);
        let user = Uuid::new_v4();
        cache.insert(user, 50, map_with_nodes(1));
        assert!(cache.get(user, 50).is_none());
    }

    #[test]
    fn invalidate_user_drops_all_levels() {
        let cache = MapCache::default();
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        cache.insert(user, 30, map_with_nodes(1));
        cache.insert(user, 70, map_with_nodes(2));
        cache.insert(other, 50, map_with_nodes(3));

        cache.invalidate_user(user);
        assert!(cache.get(user, 30).is_none());
        assert!(cache.get(user, 70).is_none());
        assert!(cache.get(other, 50).is_some());
    }
}
