use anyhow::{Context, Result};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
    PgPool, QueryBuilder,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};

use crate::database_ops::fragrance::record::PerfumeRecord;
use crate::database_ops::fragrance::sink::PerfumeSink;
use crate::util::env as env_util;

/// Target table. Expected shape (owned by the web app's migrations):
///
/// ```sql
/// CREATE TABLE perfumes (
///     id           BIGSERIAL PRIMARY KEY,
///     name         TEXT NOT NULL,
///     brand        TEXT NOT NULL,
///     image_url    TEXT NOT NULL,
///     top_notes    TEXT[] NOT NULL,
///     heart_notes  TEXT[] NOT NULL,
///     base_notes   TEXT[] NOT NULL,
///     release_year INTEGER,
///     perfumer     TEXT,
///     description  TEXT NOT NULL,
///     gender       TEXT NOT NULL,
///     accords      TEXT[] NOT NULL,
///     slug         TEXT NOT NULL UNIQUE,
///     scraped      BOOLEAN NOT NULL DEFAULT FALSE
/// );
/// ```
pub const PERFUMES_TABLE: &str = "perfumes";

#[derive(Clone)]
pub struct Db {
    pub pool: PgPool,
}

impl Db {
    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let mut connect_options = PgConnectOptions::from_str(database_url)
            .context("invalid database URL")?;

        // Ensure TLS is enabled when DSN contains sslmode=require
        if database_url.contains("sslmode=require") && !database_url.contains("sslmode=disable") {
            connect_options = connect_options.ssl_mode(PgSslMode::Require);
        }

        if !env_util::env_flag("USE_PREPARED", false) {
            // PgBouncer txn mode safe
            connect_options = connect_options.statement_cache_capacity(0);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .connect_with(connect_options)
            .await
            .context("connecting to database")?;
        info!("connected to db");
        Ok(Self { pool })
    }

    /// Close the pool; waits for checked-out connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("db pool closed");
    }

    /// Bulk insert in one statement. Rows whose slug already exists are skipped
    /// by `ON CONFLICT DO NOTHING`; the return value counts rows actually written.
    #[instrument(skip(self, rows), fields(batch = rows.len()))]
    pub async fn insert_perfumes_skip_duplicates(&self, rows: &[PerfumeRecord]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        let mut qb: QueryBuilder<'_, sqlx::Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {PERFUMES_TABLE} (name, brand, image_url, top_notes, heart_notes, base_notes, release_year, perfumer, description, gender, accords, slug, scraped) "
        ));
        qb.push_values(rows, |mut b, r| {
            b.push_bind(&r.name)
                .push_bind(&r.brand)
                .push_bind(&r.image_url)
                .push_bind(&r.top_notes)
                .push_bind(&r.heart_notes)
                .push_bind(&r.base_notes)
                .push_bind(r.release_year)
                .push_bind(r.perfumer.as_deref())
                .push_bind(&r.description)
                .push_bind(&r.gender)
                .push_bind(&r.accords)
                .push_bind(&r.slug)
                .push_bind(r.scraped);
        });
        qb.push(" ON CONFLICT DO NOTHING");
        let result = qb
            .build()
            .persistent(false)
            .execute(&self.pool)
            .await
            .with_context(|| format!("bulk insert of {} perfumes", rows.len()))?;
        Ok(result.rows_affected())
    }
}

#[async_trait::async_trait]
impl PerfumeSink for Db {
    async fn insert_skip_duplicates(&self, batch: &[PerfumeRecord]) -> Result<u64> {
        self.insert_perfumes_skip_duplicates(batch).await
    }
}
