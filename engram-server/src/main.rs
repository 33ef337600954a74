use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;

use engram_core::config::Config;
use engram_core::search::SimilaritySearch;
use engram_core::store::EmbeddingStore;
use engram_core::store::sqlite::SqliteStore;

mod api;
#[cfg(test)]
mod testutil;

use api::AppState;

const DEFAULT_CONFIG_PATH: &str = "engram.toml";

#[derive(Parser)]
#[command(name = "engram-server")]
struct Cli {
    /// Path to the configuration file
    #[arg(long = "config", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // A missing config file is fine: every setting has a default.
    let config = if cli.config.exists() {
        Config::from_file(&cli.config).unwrap_or_else(|e| {
            eprintln!("Error: {e}");
            std::process::exit(1);
        })
    } else {
        Config::default()
    };

    let db_path = config.storage.database.clone();
    let store = SqliteStore::open(std::path::Path::new(&db_path)).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });
    store.seed_config(&config.seed_values()).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    let store: Arc<dyn EmbeddingStore> = Arc::new(store);
    let searcher = SimilaritySearch::new(
        store.clone(),
        config.search.similarity_threshold,
        config.search.max_results,
    )
    .unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    let auth_enabled = config.auth.token_hash.is_some();
    let state = Arc::new(AppState {
        store,
        searcher,
        token_hash: config.auth.token_hash.clone(),
    });

    let app = api::router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Error: failed to bind to {addr}: {e}");
            std::process::exit(1);
        });

    println!("engram server started");
    println!("  address:    http://{addr}");
    println!("  database:   {db_path}");
    println!(
        "  search:     threshold {}, up to {} results",
        config.search.similarity_threshold, config.search.max_results
    );
    println!(
        "  auth:       {}",
        if auth_enabled { "bearer token" } else { "disabled" }
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    println!("\nShutting down...");
}
