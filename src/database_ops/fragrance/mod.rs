//! Dual-CSV fragrance import.
//!
//! Phase A indexes `fra_perfumes.csv` (descriptions and perfumers keyed by URL).
//! Phase B streams `fra_cleaned.csv`, merges each row against that index and
//! writes the normalized rows to the `perfumes` table in batches.
pub mod csv_rows;
pub mod enrichment;
pub mod loader;
pub mod record;
pub mod sink;

pub use enrichment::{build_enrichment_index, EnrichmentIndex};
pub use loader::{import_primary, ImportSummary, BATCH_SIZE};
pub use record::{EnrichmentRecord, PerfumeRecord};
pub use sink::{InMemorySink, PerfumeSink};
