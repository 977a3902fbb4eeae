mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use screensage_core::{AnswerGenerator, TextRecognizer};
use screensage_gateway::GatewayState;
use screensage_history::{HistoryStore, SqliteHistoryStore};
use screensage_pipeline::{
    BroadcastHub, PipelineCoordinator, PipelineTimeouts, RunTracker, SubscriberRegistry,
};
use screensage_providers::{BaiduOcrProvider, DeepSeekProvider, MockGenerator, MockRecognizer};

use config::Config;

#[derive(Parser)]
#[command(name = "screensage")]
#[command(about = "ScreenSage — screenshot OCR + AI answer pipeline")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the ScreenSage server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Show current server status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            let config = Config {
                port: port.unwrap_or(config.port),
                ..config
            };
            run_server(config).await?;
        }
        Commands::Status => {
            let client = reqwest::Client::new();
            match client
                .get(format!("http://localhost:{}/api/health", config.port))
                .send()
                .await
            {
                Ok(resp) => {
                    let body: serde_json::Value = resp.json().await?;
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                Err(_) => {
                    println!("ScreenSage is not running on port {}", config.port);
                }
            }
        }
    }

    Ok(())
}

async fn run_server(config: Config) -> Result<()> {
    info!(
        port = config.port,
        bind = %config.bind_address,
        db = %config.db_path,
        "starting ScreenSage"
    );

    if let Some(parent) = Path::new(&config.db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }
    }
    let store: Arc<dyn HistoryStore> = Arc::new(SqliteHistoryStore::open(&config.db_path)?);

    let recognizer: Arc<dyn TextRecognizer> =
        match (&config.baidu_api_key, &config.baidu_secret_key) {
            (Some(api_key), Some(secret_key)) => {
                info!("registered Baidu OCR provider");
                Arc::new(BaiduOcrProvider::new(api_key, secret_key))
            }
            _ => {
                warn!("Baidu credentials not configured, recognition uses the mock provider");
                Arc::new(MockRecognizer::returning(""))
            }
        };

    let generator: Arc<dyn AnswerGenerator> = match &config.deepseek_api_key {
        Some(api_key) => {
            info!("registered DeepSeek answer provider");
            Arc::new(DeepSeekProvider::new(api_key))
        }
        None => {
            warn!("DeepSeek key not configured, generation uses the mock provider");
            Arc::new(MockGenerator::returning(
                "AI answering is not configured on this server.",
            ))
        }
    };

    let registry = Arc::new(SubscriberRegistry::new(
        store.clone(),
        config.history_snapshot_limit,
    ));
    let hub = BroadcastHub::start(registry.clone());
    let tracker = Arc::new(RunTracker::new());
    let pipeline = PipelineCoordinator::new(
        recognizer,
        generator,
        store.clone(),
        hub,
        tracker.clone(),
        PipelineTimeouts::default(),
    );

    let state = GatewayState {
        pipeline,
        store,
        registry,
        history_page_size: config.history_page_size,
    };

    let addr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .context("Invalid bind address")?;
    let static_dir = config.static_path.as_ref().map(PathBuf::from);

    screensage_gateway::serve(addr, state, static_dir, shutdown_signal()).await?;

    info!("draining in-flight runs");
    tracker.wait_all().await;
    info!("ScreenSage stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        warn!("failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
}
