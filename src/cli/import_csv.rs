use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use crate::database_ops::db::Db;
use crate::database_ops::fragrance::{
    build_enrichment_index, import_primary, ImportSummary, InMemorySink, PerfumeSink, BATCH_SIZE,
};
use crate::util::env as env_util;

/// Enrichment dataset: comma-separated `url,Description,Perfumers`.
pub const ENRICHMENT_FILE: &str = "fra_perfumes.csv";
/// Primary dataset: semicolon-separated cleaned Fragrantica dump.
pub const PRIMARY_FILE: &str = "fra_cleaned.csv";

/// Keys included in the startup configuration snapshot.
pub const LOGGED_ENV_KEYS: [&str; 4] = ["CSV_DIR", "IMPORT_LIMIT", "IMPORT_DRY_RUN", "DATABASE_URL"];

#[derive(Debug, Clone)]
pub struct ImportCsvConfig {
    /// Directory holding both CSV files.
    pub csv_dir: PathBuf,
    /// Maximum number of primary rows to process; `None` means all.
    pub limit: Option<usize>,
    /// Load into memory instead of Postgres.
    pub dry_run: bool,
    /// Optional override for the Postgres connection string.
    pub database_url: Option<String>,
}

impl Default for ImportCsvConfig {
    fn default() -> Self {
        Self {
            csv_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data"),
            limit: None,
            dry_run: false,
            database_url: None,
        }
    }
}

impl ImportCsvConfig {
    /// Read `CSV_DIR`, `IMPORT_LIMIT` and `IMPORT_DRY_RUN`; unset keys keep defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            csv_dir: env_util::env_opt("CSV_DIR")
                .map(|d| PathBuf::from(d.trim()))
                .unwrap_or(defaults.csv_dir),
            limit: env_util::env_parse_opt::<usize>("IMPORT_LIMIT"),
            dry_run: env_util::env_flag("IMPORT_DRY_RUN", false),
            database_url: None,
        }
    }

    pub fn enrichment_path(&self) -> PathBuf {
        self.csv_dir.join(ENRICHMENT_FILE)
    }

    pub fn primary_path(&self) -> PathBuf {
        self.csv_dir.join(PRIMARY_FILE)
    }
}

/// Run both phases against `sink`: index the enrichment file, then merge and load.
pub async fn run_pipeline(cfg: &ImportCsvConfig, sink: &dyn PerfumeSink) -> Result<ImportSummary> {
    let index = build_enrichment_index(&cfg.enrichment_path(), b',')?;
    import_primary(&cfg.primary_path(), b';', cfg.limit, &index, sink, BATCH_SIZE).await
}

/// Entry point for the `import_csv` binary.
///
/// The pool is opened once and closed whether or not the pipeline succeeded.
pub async fn run(cfg: ImportCsvConfig) -> Result<ImportSummary> {
    let started = Instant::now();
    let summary = if cfg.dry_run {
        info!("IMPORT_DRY_RUN set; loading into memory only");
        let sink = InMemorySink::new();
        let summary = run_pipeline(&cfg, &sink).await?;
        if let Some(sample) = sink.rows().first() {
            info!(sample = %serde_json::to_string(sample)?, "first merged row");
        }
        summary
    } else {
        let db_url = match cfg.database_url.clone() {
            Some(url) => url,
            None => env_util::db_url().context("Database URL must be set in env")?,
        };
        let db = Db::connect(&db_url, 1).await?;
        let result = run_pipeline(&cfg, &db).await;
        db.close().await;
        result?
    };
    log_summary(&summary, started);
    Ok(summary)
}

fn log_summary(summary: &ImportSummary, started: Instant) {
    info!("{}", "─".repeat(60));
    info!("✅ Import complete in {:.1}s", started.elapsed().as_secs_f64());
    info!("📊 Rows processed : {}", summary.rows_processed);
    info!("💾 Rows inserted  : {}", summary.rows_inserted);
    info!(
        "🔗 Merge hits     : {} (description from {})",
        summary.merge_hits, ENRICHMENT_FILE
    );
    info!(
        "⚠️ Merge misses   : {} (fallback description used)",
        summary.merge_misses
    );
    info!("{}", "─".repeat(60));
}
