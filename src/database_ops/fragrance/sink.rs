use anyhow::{anyhow, Result};
use std::collections::HashSet;
use std::sync::Mutex;

use super::record::PerfumeRecord;

/// Destination for merged perfume batches.
///
/// Implementations write the whole batch in one call, silently skip rows that
/// collide with an existing slug, and return how many rows were written.
#[async_trait::async_trait]
pub trait PerfumeSink: Send + Sync {
    async fn insert_skip_duplicates(&self, batch: &[PerfumeRecord]) -> Result<u64>;
}

#[derive(Default)]
struct InMemoryState {
    slugs: HashSet<String>,
    rows: Vec<PerfumeRecord>,
    flush_sizes: Vec<usize>,
}

/// Sink that keeps rows in memory with the same unique-slug rule as the table.
/// Backs dry runs and tests.
#[derive(Default)]
pub struct InMemorySink {
    state: Mutex<InMemoryState>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows accepted so far, in insertion order.
    pub fn rows(&self) -> Vec<PerfumeRecord> {
        self.state
            .lock()
            .map(|s| s.rows.clone())
            .unwrap_or_default()
    }

    /// Size of every batch handed to the sink, one entry per call.
    pub fn flush_sizes(&self) -> Vec<usize> {
        self.state
            .lock()
            .map(|s| s.flush_sizes.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl PerfumeSink for InMemorySink {
    async fn insert_skip_duplicates(&self, batch: &[PerfumeRecord]) -> Result<u64> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow!("in-memory sink lock poisoned"))?;
        state.flush_sizes.push(batch.len());
        let mut inserted = 0u64;
        for record in batch {
            if state.slugs.insert(record.slug.clone()) {
                state.rows.push(record.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}
