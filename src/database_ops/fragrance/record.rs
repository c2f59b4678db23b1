use serde::Serialize;

/// Description and perfumer credits from the enrichment dataset, keyed by URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentRecord {
    pub description: String,
    /// Comma-joined perfumer names; empty when the source list was empty.
    pub perfumers: String,
}

/// One row of the `perfumes` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PerfumeRecord {
    pub name: String,
    pub brand: String,
    pub image_url: String,
    pub top_notes: Vec<String>,
    pub heart_notes: Vec<String>,
    pub base_notes: Vec<String>,
    pub release_year: Option<i32>,
    pub perfumer: Option<String>,
    /// Never empty: enrichment text or a synthesized sentence.
    pub description: String,
    pub gender: String,
    pub accords: Vec<String>,
    pub slug: String,
    pub scraped: bool,
}
