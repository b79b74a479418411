use std::cmp::Reverse;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{AnalysisCache, RepoSummary, SummaryStore};
use crate::analysis::error::StoreError;
use crate::analysis::{AnalysisResponse, RepositoryIdentity};

/// In-process cache holding serialized responses until they expire
///
/// Values are stored as JSON so a hit goes through the same encoding as an
/// external cache would.
#[derive(Debug)]
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
}

#[derive(Debug)]
struct CacheEntry {
    stored_at: Instant,
    json: String,
}

impl MemoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl AnalysisCache for MemoryCache {
    async fn get(
        &self,
        identity: &RepositoryIdentity,
    ) -> Result<Option<AnalysisResponse>, StoreError> {
        let key = identity.key();
        let ttl = self.ttl;
        if self
            .entries
            .remove_if(&key, |_, entry| entry.stored_at.elapsed() >= ttl)
            .is_some()
        {
            return Ok(None);
        }

        let Some(json) = self.entries.get(&key).map(|entry| entry.json.clone()) else {
            return Ok(None);
        };

        Ok(Some(serde_json::from_str(&json)?))
    }

    async fn put(
        &self,
        identity: &RepositoryIdentity,
        response: &AnalysisResponse,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(response)?;

        // Also drops expired entries that are never read again
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);

        self.entries.insert(
            identity.key(),
            CacheEntry {
                stored_at: Instant::now(),
                json,
            },
        );
        Ok(())
    }
}

/// In-process summary table
#[derive(Debug, Default)]
pub struct MemorySummaryStore {
    rows: DashMap<String, RepoSummary>,
}

impl MemorySummaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identity: &RepositoryIdentity) -> Option<RepoSummary> {
        self.rows.get(&identity.key()).map(|row| row.value().clone())
    }
}

#[async_trait]
impl SummaryStore for MemorySummaryStore {
    async fn upsert_summary(&self, mut summary: RepoSummary) -> Result<(), StoreError> {
        match self.rows.entry(summary.key()) {
            Entry::Occupied(mut row) => {
                summary.views = row.get().views;
                row.insert(summary);
            }
            Entry::Vacant(slot) => {
                slot.insert(summary);
            }
        }
        Ok(())
    }

    async fn increment_views(&self, identity: &RepositoryIdentity) -> Result<(), StoreError> {
        match self.rows.get_mut(&identity.key()) {
            Some(mut row) => row.views += 1,
            None => tracing::debug!(repo = %identity, "no summary to count a view for"),
        }
        Ok(())
    }

    async fn top_repos(&self, limit: usize) -> Result<Vec<RepoSummary>, StoreError> {
        let mut rows: Vec<RepoSummary> = self.rows.iter().map(|row| row.value().clone()).collect();
        rows.sort_by_key(|row| (Reverse(row.views), Reverse(row.stars.unwrap_or(0))));
        rows.truncate(limit);
        Ok(rows)
    }
}
