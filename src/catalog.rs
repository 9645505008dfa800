//! Cached episode catalog
//!
//! This module wraps an [`EpisodeSource`] with the persistent
//! [`EpisodeCache`], so repeated lookups of a series within the freshness
//! window never touch the network.

use crate::cache::{CacheLookup, EpisodeCache};
use crate::tvdb::{Episode, EpisodeSource};
use tracing::{debug, warn};

/// A caching front for an episode source
///
/// Lookups never fail: storage problems degrade to a refetch (on read) or
/// to an uncached result (on write), and source problems degrade to an
/// empty or partial list. Every degradation is logged.
pub struct EpisodeCatalog<S>
where
    S: EpisodeSource,
{
    /// The underlying episode source
    source: S,
    /// Persistent cache of fetched episode lists
    cache: EpisodeCache,
}

impl<S> EpisodeCatalog<S>
where
    S: EpisodeSource,
{
    /// Creates a catalog serving `source` through `cache`
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let client = TvdbClient::new(ReqwestTransport::new(timeout)?, api_key, DEFAULT_BASE_URL);
    /// let catalog = EpisodeCatalog::new(client, EpisodeCache::open_default()?);
    /// ```
    pub fn new(source: S, cache: EpisodeCache) -> Self {
        Self { source, cache }
    }

    /// Returns every episode of a series, from cache when possible
    ///
    /// # Arguments
    ///
    /// * `series_id` - The provider's identifier for the series
    /// * `refresh` - Skip the cache and always fetch from the source
    ///
    /// # Returns
    ///
    /// `None` when `series_id` is empty. Otherwise the cached or freshly
    /// fetched episodes; an empty list means the source returned nothing.
    pub fn get_series_episodes(&mut self, series_id: &str, refresh: bool) -> Option<Vec<Episode>> {
        if series_id.trim().is_empty() {
            return None;
        }

        if !refresh {
            match self.cache.read(series_id) {
                CacheLookup::Hit(episodes) => return Some(episodes),
                CacheLookup::Miss => {}
                CacheLookup::StorageError(e) => {
                    warn!(series_id, "Failed to read cached episodes: {}", e);
                }
            }
        }

        let episodes = self.source.fetch_series_episodes(series_id);

        if !episodes.is_empty() {
            if let Err(e) = self.cache.write(series_id, &episodes) {
                warn!(series_id, "Failed to cache episodes: {}", e);
            }
        }

        Some(episodes)
    }

    /// Removes cached episodes for one series, or for all series
    ///
    /// An empty `series_id` clears everything. Returns whether the cache
    /// was cleared.
    pub fn clear_cache(&self, series_id: Option<&str>) -> bool {
        let series_id = series_id.filter(|id| !id.trim().is_empty());

        match self.cache.clear(series_id) {
            Ok(removed) => {
                match series_id {
                    Some(id) => debug!(series_id = id, removed, "Cleared cached episodes"),
                    None => debug!(removed, "Cleared all cached episodes"),
                }
                true
            }
            Err(e) => {
                warn!("Failed to clear episode cache: {}", e);
                false
            }
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cache(&self) -> &EpisodeCache {
        &self.cache
    }
}
