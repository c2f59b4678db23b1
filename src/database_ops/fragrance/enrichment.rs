use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use super::csv_rows::open_rows;
use super::record::EnrichmentRecord;
use crate::normalization::perfumers::parse_perfumers;

/// Enrichment rows keyed by their trimmed source URL.
pub type EnrichmentIndex = HashMap<String, EnrichmentRecord>;

/// Read the whole enrichment dataset into memory.
///
/// Rows with an empty `url` are skipped and later duplicates replace earlier
/// ones. Missing `Description`/`Perfumers` columns degrade to empty strings.
pub fn build_enrichment_index(path: &Path, delimiter: u8) -> Result<EnrichmentIndex> {
    info!("📂 Loading enrichment dataset from {}", path.display());
    let mut index = EnrichmentIndex::new();
    for row in open_rows(path, delimiter)? {
        let row = row?;
        let url = row.trimmed("url");
        if url.is_empty() {
            continue;
        }
        index.insert(
            url.to_string(),
            EnrichmentRecord {
                description: row.trimmed("Description").to_string(),
                perfumers: parse_perfumers(row.trimmed("Perfumers")),
            },
        );
    }
    info!(entries = index.len(), "✅ enrichment descriptions indexed");
    Ok(index)
}
