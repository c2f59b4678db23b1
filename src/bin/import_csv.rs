use fragrance_import::cli::import_csv::{self, ImportCsvConfig, LOGGED_ENV_KEYS};
use fragrance_import::util::env as env_util;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Load .env first so RUST_LOG is picked up
    env_util::init_env();
    if let Err(e) = fragrance_import::tracing::init_tracing("info") {
        eprintln!("{e:#}");
    }

    info!("🚀 Fragrance dual-CSV importer starting");
    env_util::preflight_check("import_csv", &LOGGED_ENV_KEYS);

    match import_csv::run(ImportCsvConfig::from_env()).await {
        Ok(_) => std::process::exit(0),
        Err(e) => {
            error!("💥 Fatal error: {e:#}");
            std::process::exit(1);
        }
    }
}
