use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use qalab_core::config::StoreBackend;
use qalab_core::{
    InteractionStore, MemoryInteractionStore, PgInteractionStore, QalabConfig, ScenarioCatalog,
    ValidationService,
};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use qalab_server::http::{self, HttpState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "qalab.toml")]
    config: String,

    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience - production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config; a missing default file means "run with defaults"
    let config = if !Path::new(&args.config).exists() && args.config == "qalab.toml" {
        QalabConfig::default()
    } else {
        match QalabConfig::load(&args.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Failed to load config from {}: {}", args.config, e);
                std::process::exit(1);
            }
        }
    };

    // Init logging (RUST_LOG overrides the configured level)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    let catalog = match ScenarioCatalog::from_config(&config.catalog) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            eprintln!("Failed to load scenario catalog: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("Loaded {} scenarios", catalog.len());

    // Connect to DB when the postgres store is selected
    let pool = match (&config.store.backend, &config.database) {
        (StoreBackend::Postgres, Some(db)) => match qalab_core::db::create_pool(db).await {
            Ok(p) => Some(p),
            Err(e) => {
                eprintln!("Failed to connect to database: {}", e);
                std::process::exit(1);
            }
        },
        _ => None,
    };

    if args.health {
        match &pool {
            Some(pool) => match qalab_core::db::health_check(pool).await {
                Ok(v) => println!("✅ PostgreSQL connected: {}", v),
                Err(e) => {
                    println!("❌ PostgreSQL connection failed: {}", e);
                    std::process::exit(1);
                }
            },
            None => println!("✅ In-memory interaction store"),
        }
        println!("✅ {} scenarios loaded", catalog.len());
        println!("✅ qalab health check passed");
        return Ok(());
    }

    let store: Arc<dyn InteractionStore> = match &pool {
        Some(pool) => {
            qalab_core::db::ensure_schema(pool).await?;
            Arc::new(PgInteractionStore::new(pool.clone()))
        }
        None => Arc::new(MemoryInteractionStore::new()),
    };
    tracing::info!("Using {} interaction store", store.backend());

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    let state = HttpState {
        service: ValidationService::new(catalog, store),
        pool,
        config,
    };
    http::start_http_server(state, tx.subscribe()).await?;

    Ok(())
}
