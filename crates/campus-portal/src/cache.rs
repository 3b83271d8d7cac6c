//! The client-side query cache.
//!
//! Values are stored type-erased under their [`QueryKey`]. A generation
//! counter, bumped by [`QueryCache::clear`], guards against fetches that
//! started before a logout writing their results into the next session.

use std::{any::Any, collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use tracing::debug;

use crate::query::{QueryFamily, QueryKey};

type Entry = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
struct CacheState {
  generation: u64,
  entries:    HashMap<QueryKey, Entry>,
}

#[derive(Default)]
pub struct QueryCache {
  state: RwLock<CacheState>,
}

impl QueryCache {
  pub fn new() -> Self { Self::default() }

  /// The current generation; pass it back to [`Self::put`].
  pub async fn generation(&self) -> u64 { self.state.read().await.generation }

  pub async fn get<T: Clone + 'static>(&self, key: &QueryKey) -> Option<T> {
    let state = self.state.read().await;
    let hit = state
      .entries
      .get(key)
      .and_then(|v| v.downcast_ref::<T>())
      .cloned();
    if hit.is_some() {
      debug!(?key, "cache hit");
    }
    hit
  }

  /// Store `value` unless the cache was cleared after `generation` was read.
  /// Returns whether the value was stored.
  pub async fn put<T: Send + Sync + 'static>(
    &self,
    key: QueryKey,
    generation: u64,
    value: T,
  ) -> bool {
    let mut state = self.state.write().await;
    if state.generation != generation {
      debug!(?key, "discarding result fetched before the cache was cleared");
      return false;
    }
    state.entries.insert(key, Arc::new(value));
    true
  }

  pub async fn invalidate(&self, families: &[QueryFamily]) {
    let mut state = self.state.write().await;
    let before = state.entries.len();
    state
      .entries
      .retain(|key, _| !families.contains(&key.family()));
    debug!(
      ?families,
      dropped = before - state.entries.len(),
      "cache invalidated"
    );
  }

  /// Drop everything and start a new generation.
  pub async fn clear(&self) {
    let mut state = self.state.write().await;
    state.entries.clear();
    state.generation += 1;
    debug!(generation = state.generation, "cache cleared");
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn put_then_get_same_type() {
    let cache = QueryCache::new();
    let generation = cache.generation().await;
    assert!(cache.put(QueryKey::IsAdmin, generation, true).await);
    assert_eq!(cache.get::<bool>(&QueryKey::IsAdmin).await, Some(true));
    assert_eq!(cache.get::<String>(&QueryKey::IsAdmin).await, None);
  }

  #[tokio::test]
  async fn stale_generation_is_discarded() {
    let cache = QueryCache::new();
    let generation = cache.generation().await;
    cache.clear().await;
    assert!(!cache.put(QueryKey::Role, generation, "admin".to_string()).await);
    assert!(cache.get::<String>(&QueryKey::Role).await.is_none());
  }

  #[tokio::test]
  async fn invalidate_drops_only_named_families() {
    let cache = QueryCache::new();
    let generation = cache.generation().await;
    cache.put(QueryKey::IsAdmin, generation, true).await;
    cache.put(QueryKey::Exams, generation, 3_u32).await;

    cache.invalidate(&[QueryFamily::Role]).await;
    assert!(cache.get::<bool>(&QueryKey::IsAdmin).await.is_none());
    assert_eq!(cache.get::<u32>(&QueryKey::Exams).await, Some(3));
  }
}
