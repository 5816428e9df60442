//! # Legal QA Engine Main Driver
//!
//! ## Purpose
//! Main entry point for the legal QA server. Orchestrates initialization of
//! all system components and starts the web server for answering questions.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration files, command line arguments, environment variables
//! - **Output**: Running web server with question answering API endpoints
//! - **Initialization**: Loads the Q&A corpus, validates it, starts the server
//!
//! ## Architecture Flow
//! 1. Parse command line arguments and load configuration
//! 2. Initialize logging and tracing
//! 3. Open the record store and validate the corpus
//! 4. Build the ranker, analyzer, and optional generative fallback
//! 5. Start web API server
//! 6. Handle shutdown signals gracefully

use clap::{Arg, Command};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use legal_qa_engine::{
    analysis::DocumentAnalyzer,
    api::ApiServer,
    config::Config,
    errors::{QaError, Result},
    fallback,
    matching::SimilarityRanker,
    store::QaStore,
    AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let matches = Command::new("legal-qa-server")
        .version("0.1.0")
        .author("Legal QA Team")
        .about("Legal question answering server with string-similarity ranking")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Server port")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("check-health")
                .long("check-health")
                .help("Run health checks and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    // Load configuration
    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("config.toml");
    let mut config = Config::from_file(config_path)?;

    // Override port if specified
    if let Some(port) = matches.get_one::<u16>("port") {
        config.server.port = *port;
    }

    let config = Arc::new(config);

    // Initialize logging
    init_logging(&config)?;

    info!("Starting Legal QA Engine v0.1.0");
    info!("Configuration loaded from: {}", config_path);

    // Run health checks if requested
    if matches.get_flag("check-health") {
        return run_health_checks(&config).await;
    }

    // Initialize application components
    let app_state = initialize_components(config.clone()).await?;

    // Start the API server. The actix server future is not Send, so it
    // runs on this task rather than a spawned one.
    let server = ApiServer::new(app_state);
    let server_future = server.run();

    info!(
        "Legal QA Engine started successfully on {}:{}",
        config.server.host, config.server.port
    );

    // Wait for shutdown signal
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received SIGINT, shutting down gracefully...");
        }
        result = server_future => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
            warn!("Server stopped unexpectedly");
        }
    }

    info!("Legal QA Engine shut down successfully");
    Ok(())
}

/// Initialize logging and tracing
fn init_logging(config: &Config) -> Result<()> {
    let log_level: tracing::Level = config.logging.level.parse().map_err(|_| QaError::Config {
        message: format!("Invalid log level: {}", config.logging.level),
    })?;
    let filter = tracing_subscriber::filter::LevelFilter::from_level(log_level);

    if config.logging.json_format {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .json()
                    .with_filter(filter),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_filter(filter),
            )
            .init();
    }

    info!("Logging initialized with level: {}", config.logging.level);
    Ok(())
}

/// Initialize all application components
async fn initialize_components(config: Arc<Config>) -> Result<AppState> {
    info!("Initializing application components...");

    info!("Opening record store...");
    let store = Arc::new(QaStore::from_config(&config.store).await?);
    info!("Corpus loaded with {} records", store.len().await);

    info!("Initializing similarity ranker...");
    let ranker = Arc::new(SimilarityRanker::new()?);

    info!("Initializing document analyzer...");
    let analyzer = Arc::new(DocumentAnalyzer::new(config.analysis.clone())?);

    let fallback = fallback::from_config(&config.fallback)?;
    match &fallback {
        Some(f) => info!("Generative fallback enabled ({})", f.name()),
        None => info!("Generative fallback disabled"),
    }

    let app_state = AppState {
        config,
        store,
        ranker,
        analyzer,
        fallback,
    };

    info!("All components initialized successfully");
    Ok(app_state)
}

/// Run startup health checks
async fn run_health_checks(config: &Config) -> Result<()> {
    info!("Running health checks...");

    info!("✓ Configuration is valid");

    if let Some(parent) = config.store.data_path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
            info!("Created directory: {:?}", parent);
        }
    }
    info!("✓ Data path is accessible");

    let store = QaStore::from_config(&config.store).await?;
    info!("✓ Corpus loads and validates ({} records)", store.len().await);

    info!("All health checks passed!");
    Ok(())
}
