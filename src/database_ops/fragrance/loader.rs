use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use super::csv_rows::{open_rows, RawRow};
use super::enrichment::EnrichmentIndex;
use super::record::PerfumeRecord;
use super::sink::PerfumeSink;
use crate::normalization::fragrantica::{build_image_url, extract_fragrantica_id, make_slug};
use crate::normalization::gender::map_gender;
use crate::normalization::text::{non_blank, parse_year, split_notes, title_case, value_or};

/// Rows per bulk insert.
pub const BATCH_SIZE: usize = 500;

const ACCORD_COLUMNS: [&str; 5] = [
    "mainaccord1",
    "mainaccord2",
    "mainaccord3",
    "mainaccord4",
    "mainaccord5",
];

/// Counters reported at the end of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub rows_processed: u64,
    pub rows_inserted: u64,
    /// Rows whose description came from the enrichment dataset.
    pub merge_hits: u64,
    /// Rows that fell back to a synthesized description.
    pub merge_misses: u64,
    pub flushes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Hit,
    Miss,
}

/// Merge one primary row with its enrichment entry (if any) into a table row.
pub fn merge_row(row: &RawRow, index: &EnrichmentIndex) -> (PerfumeRecord, MergeOutcome) {
    let url = row.trimmed("url");
    let name_raw = row.trimmed("Perfume");
    let brand_raw = row.trimmed("Brand");

    let name = value_or(&title_case(name_raw), "Unknown");
    let brand = value_or(&title_case(brand_raw), "Unknown");
    let top_notes = split_notes(row.get("Top"));
    let heart_notes = split_notes(row.get("Middle"));
    let base_notes = split_notes(row.get("Base"));
    let row_perfumer = non_blank(row.get("Perfumer1"));

    let enrichment = index.get(url).filter(|e| !e.description.is_empty());
    let (description, perfumer, outcome) = match enrichment {
        Some(e) => (
            e.description.clone(),
            non_blank(&e.perfumers).or(row_perfumer),
            MergeOutcome::Hit,
        ),
        None => (
            fallback_description(&name, &brand, &top_notes, &heart_notes),
            row_perfumer,
            MergeOutcome::Miss,
        ),
    };

    let accords = ACCORD_COLUMNS
        .iter()
        .filter_map(|col| non_blank(row.get(col)))
        .collect();

    let fragrantica_id = extract_fragrantica_id(url);
    let record = PerfumeRecord {
        image_url: build_image_url(url),
        slug: make_slug(name_raw, brand_raw, fragrantica_id.as_deref()),
        name,
        brand,
        top_notes,
        heart_notes,
        base_notes,
        release_year: parse_year(row.get("Year")),
        perfumer,
        description,
        gender: map_gender(row.get("Gender")),
        accords,
        scraped: true,
    };
    (record, outcome)
}

/// Sentence built from the first two top notes and the first heart note.
pub fn fallback_description(
    name: &str,
    brand: &str,
    top_notes: &[String],
    heart_notes: &[String],
) -> String {
    let notes: Vec<&str> = top_notes
        .iter()
        .take(2)
        .chain(heart_notes.iter().take(1))
        .map(String::as_str)
        .collect();
    if notes.is_empty() {
        format!("{name} by {brand} is a distinguished luxury fragrance.")
    } else {
        format!(
            "{name} by {brand} is a luxury fragrance featuring {}.",
            notes.join(", ")
        )
    }
}

/// Accumulates records and writes them to the sink `batch_size` at a time.
struct BatchWriter<'a> {
    sink: &'a dyn PerfumeSink,
    batch: Vec<PerfumeRecord>,
    batch_size: usize,
    inserted: u64,
    flushes: u64,
}

impl<'a> BatchWriter<'a> {
    fn new(sink: &'a dyn PerfumeSink, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            sink,
            batch: Vec::with_capacity(batch_size),
            batch_size,
            inserted: 0,
            flushes: 0,
        }
    }

    async fn push(&mut self, record: PerfumeRecord) -> Result<()> {
        self.batch.push(record);
        if self.batch.len() >= self.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }
        let count = self.sink.insert_skip_duplicates(&self.batch).await?;
        self.batch.clear();
        self.inserted += count;
        self.flushes += 1;
        info!(
            "📦 Flushed batch → {} inserted (running total: {})",
            count, self.inserted
        );
        Ok(())
    }
}

/// Stream the primary dataset, merge each row and load it through `sink`.
///
/// With `limit` set, at most that many rows are read and they are buffered
/// before processing starts; otherwise rows are processed as they are read.
/// Sink errors abort the import; batches flushed earlier stay written.
pub async fn import_primary(
    path: &Path,
    delimiter: u8,
    limit: Option<usize>,
    index: &EnrichmentIndex,
    sink: &dyn PerfumeSink,
    batch_size: usize,
) -> Result<ImportSummary> {
    let limit_label = limit.map_or_else(|| "all".to_string(), |l| l.to_string());
    info!(
        "📂 Reading primary dataset {} (limit: {} rows)",
        path.display(),
        limit_label
    );

    let reader = open_rows(path, delimiter)?;
    let rows: Box<dyn Iterator<Item = Result<RawRow>> + Send> = match limit {
        Some(cap) => {
            let collected = reader.take(cap).collect::<Result<Vec<_>>>()?;
            info!(rows = collected.len(), "📄 rows collected from primary dataset");
            Box::new(collected.into_iter().map(Ok::<RawRow, anyhow::Error>))
        }
        None => Box::new(reader),
    };

    let mut summary = ImportSummary::default();
    let mut writer = BatchWriter::new(sink, batch_size);

    for (i, row) in rows.enumerate() {
        let row = row?;
        let (record, outcome) = merge_row(&row, index);
        match outcome {
            MergeOutcome::Hit => {
                summary.merge_hits += 1;
                if summary.merge_hits <= 3 || i % 100 == 0 {
                    info!(
                        "🔗 [{}] Merged: \"{}\" by {} (desc {} chars)",
                        i + 1,
                        record.name,
                        record.brand,
                        record.description.chars().count()
                    );
                }
            }
            MergeOutcome::Miss => {
                summary.merge_misses += 1;
                if summary.merge_misses <= 3 {
                    let tail = row.trimmed("url").rsplit('/').next().unwrap_or_default();
                    warn!("[{}] No description for …/{} (using fallback)", i + 1, tail);
                }
            }
        }
        summary.rows_processed += 1;
        writer.push(record).await?;
    }
    writer.flush().await?;

    summary.rows_inserted = writer.inserted;
    summary.flushes = writer.flushes;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database_ops::fragrance::record::EnrichmentRecord;
    use crate::database_ops::fragrance::sink::InMemorySink;
    use anyhow::anyhow;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PRIMARY_HEADER: &str = "url;Perfume;Brand;Country;Gender;Rating Value;Rating Count;Year;Top;Middle;Base;Perfumer1;Perfumer2;mainaccord1;mainaccord2;mainaccord3;mainaccord4;mainaccord5";

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write csv");
        file
    }

    fn primary_with_rows(n: usize) -> tempfile::NamedTempFile {
        let mut body = String::from(PRIMARY_HEADER);
        body.push('\n');
        for i in 0..n {
            body.push_str(&format!(
                "https://www.fragrantica.com/perfume/b/p-{id}.html;perfume-{i};brand;France;men;4;10;2001;lemon;;musk;;;citrus;;;;\n",
                id = 1000 + i
            ));
        }
        write_csv(&body)
    }

    fn index_with(url: &str, description: &str, perfumers: &str) -> EnrichmentIndex {
        let mut index = EnrichmentIndex::new();
        index.insert(
            url.to_string(),
            EnrichmentRecord {
                description: description.into(),
                perfumers: perfumers.into(),
            },
        );
        index
    }

    #[tokio::test]
    async fn test_end_to_end_single_merged_row() {
        let enrichment = write_csv("url,Description,Perfumers\nu1,d1,\"['A']\"\n");
        let primary = write_csv(&format!(
            "{PRIMARY_HEADER}\nu1;rose-noir;brand-x;France;women;4.1;100;2020;rose;;;;;floral;;;;\n"
        ));
        let index =
            crate::database_ops::fragrance::build_enrichment_index(enrichment.path(), b',')
                .expect("index");
        let sink = InMemorySink::new();

        let summary = import_primary(primary.path(), b';', None, &index, &sink, BATCH_SIZE)
            .await
            .expect("import");

        assert_eq!(
            summary,
            ImportSummary {
                rows_processed: 1,
                rows_inserted: 1,
                merge_hits: 1,
                merge_misses: 0,
                flushes: 1,
            }
        );
        let rows = sink.rows();
        let rec = &rows[0];
        assert_eq!(rec.name, "Rose Noir");
        assert_eq!(rec.brand, "Brand X");
        assert_eq!(rec.description, "d1");
        assert_eq!(rec.perfumer.as_deref(), Some("A"));
        assert_eq!(rec.gender, "for women");
        assert_eq!(rec.top_notes, vec!["Rose"]);
        assert!(rec.heart_notes.is_empty());
        assert!(rec.base_notes.is_empty());
        assert_eq!(rec.accords, vec!["floral"]);
        assert_eq!(rec.release_year, Some(2020));
        assert!(rec.slug.starts_with("rose-noir-brand-x-"));
        assert_eq!(rec.image_url, "https://picsum.photos/seed/u1/375/500");
        assert!(rec.scraped);
    }

    #[test]
    fn test_merge_hit_falls_back_to_row_perfumer() {
        let index = index_with("u1", "described", "");
        let row: RawRow = [("url", "u1"), ("Perfume", "x"), ("Perfumer1", " Jo ")]
            .into_iter()
            .collect();
        let (rec, outcome) = merge_row(&row, &index);
        assert_eq!(outcome, MergeOutcome::Hit);
        assert_eq!(rec.description, "described");
        assert_eq!(rec.perfumer.as_deref(), Some("Jo"));

        let bare: RawRow = [("url", "u1")].into_iter().collect();
        let (rec, _) = merge_row(&bare, &index);
        assert_eq!(rec.perfumer, None);
    }

    #[test]
    fn test_empty_enrichment_description_counts_as_miss() {
        let index = index_with("u1", "", "A");
        let row: RawRow = [
            ("url", "u1"),
            ("Perfume", "oud-wood"),
            ("Brand", "tom-ford"),
            ("Top", "oud, rosewood, cardamom"),
            ("Middle", "sandalwood, vetiver"),
        ]
        .into_iter()
        .collect();
        let (rec, outcome) = merge_row(&row, &index);
        assert_eq!(outcome, MergeOutcome::Miss);
        assert_eq!(
            rec.description,
            "Oud Wood by Tom Ford is a luxury fragrance featuring Oud, Rosewood, Sandalwood."
        );
        // Enrichment perfumers are ignored on a miss.
        assert_eq!(rec.perfumer, None);
    }

    #[test]
    fn test_miss_without_notes_uses_generic_sentence() {
        let row: RawRow = [
            ("url", "https://x/p-42.html"),
            ("Perfume", "aventus"),
            ("Brand", "creed"),
            ("Top", "Unknown"),
            ("Middle", "n/a"),
            ("Year", "n/a"),
            ("Gender", ""),
        ]
        .into_iter()
        .collect();
        let (rec, outcome) = merge_row(&row, &EnrichmentIndex::new());
        assert_eq!(outcome, MergeOutcome::Miss);
        assert_eq!(
            rec.description,
            "Aventus by Creed is a distinguished luxury fragrance."
        );
        assert_eq!(rec.slug, "aventus-creed-42");
        assert_eq!(rec.image_url, "https://fimgs.net/mdimg/perfume/375x500.42.jpg");
        assert_eq!(rec.release_year, None);
        assert_eq!(rec.gender, "for women and men");
    }

    #[test]
    fn test_miss_description_is_deterministic() {
        let row: RawRow = [("url", "nope"), ("Perfume", "a"), ("Brand", "b"), ("Top", "x")]
            .into_iter()
            .collect();
        let index = EnrichmentIndex::new();
        assert_eq!(merge_row(&row, &index).0.description, merge_row(&row, &index).0.description);
    }

    #[test]
    fn test_accords_keep_order_and_drop_blanks() {
        let row: RawRow = [
            ("mainaccord1", "woody"),
            ("mainaccord2", " "),
            ("mainaccord3", "amber "),
            ("mainaccord5", "warm spicy"),
        ]
        .into_iter()
        .collect();
        let (rec, _) = merge_row(&row, &EnrichmentIndex::new());
        assert_eq!(rec.accords, vec!["woody", "amber", "warm spicy"]);
    }

    #[test]
    fn test_empty_name_and_brand_fall_back_to_unknown() {
        let (rec, _) = merge_row(&RawRow::default(), &EnrichmentIndex::new());
        assert_eq!(rec.name, "Unknown");
        assert_eq!(rec.brand, "Unknown");
        assert!(!rec.description.is_empty());
    }

    #[tokio::test]
    async fn test_flush_count_is_ceil_of_rows_over_batch() {
        let cases = [(0usize, 3usize, 0u64), (1, 3, 1), (3, 3, 1), (7, 3, 3), (9, 3, 3)];
        for (rows, batch, expected) in cases {
            let primary = primary_with_rows(rows);
            let sink = InMemorySink::new();
            let summary =
                import_primary(primary.path(), b';', None, &EnrichmentIndex::new(), &sink, batch)
                    .await
                    .expect("import");
            assert_eq!(summary.flushes, expected, "rows={rows} batch={batch}");
            assert_eq!(sink.flush_sizes().len() as u64, expected);
            assert!(sink.flush_sizes().iter().all(|&s| s > 0 && s <= batch));
            assert_eq!(summary.rows_processed, rows as u64);
            assert_eq!(summary.merge_misses, rows as u64);
            assert_eq!(summary.rows_inserted, rows as u64);
        }
    }

    #[tokio::test]
    async fn test_row_cap_limits_processing() {
        let primary = primary_with_rows(10);
        let sink = InMemorySink::new();
        let summary =
            import_primary(primary.path(), b';', Some(4), &EnrichmentIndex::new(), &sink, 3)
                .await
                .expect("import");
        assert_eq!(summary.rows_processed, 4);
        assert_eq!(sink.flush_sizes(), vec![3, 1]);
        let slugs: Vec<String> = sink.rows().into_iter().map(|r| r.slug).collect();
        assert_eq!(
            slugs,
            vec![
                "perfume-0-brand-1000",
                "perfume-1-brand-1001",
                "perfume-2-brand-1002",
                "perfume-3-brand-1003"
            ]
        );
    }

    #[tokio::test]
    async fn test_duplicate_slugs_are_not_counted_as_inserted() {
        let row = "https://x/dup-7.html;dup;brand;;;;;;;;;;;;;;;";
        let primary = write_csv(&format!("{PRIMARY_HEADER}\n{row}\n{row}\n{row}\n"));
        let sink = InMemorySink::new();
        let summary =
            import_primary(primary.path(), b';', None, &EnrichmentIndex::new(), &sink, 2)
                .await
                .expect("import");
        assert_eq!(summary.rows_processed, 3);
        assert_eq!(summary.rows_inserted, 1);
        assert_eq!(summary.flushes, 2);
    }

    struct FailingSink {
        calls: AtomicUsize,
        fail_on: usize,
    }

    #[async_trait::async_trait]
    impl PerfumeSink for FailingSink {
        async fn insert_skip_duplicates(&self, batch: &[PerfumeRecord]) -> Result<u64> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.fail_on {
                return Err(anyhow!("connection reset"));
            }
            Ok(batch.len() as u64)
        }
    }

    #[tokio::test]
    async fn test_sink_failure_aborts_import() {
        let primary = primary_with_rows(6);
        let sink = FailingSink {
            calls: AtomicUsize::new(0),
            fail_on: 2,
        };
        let err = import_primary(primary.path(), b';', None, &EnrichmentIndex::new(), &sink, 2)
            .await
            .expect_err("second flush fails");
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(sink.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_primary_file_is_fatal() {
        let sink = InMemorySink::new();
        let res = import_primary(
            Path::new("/no/such/fra_cleaned.csv"),
            b';',
            None,
            &EnrichmentIndex::new(),
            &sink,
            BATCH_SIZE,
        )
        .await;
        assert!(res.is_err());
        assert!(sink.flush_sizes().is_empty());
    }
}
