use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use vigil::api::{self, AppState};
use vigil::clock::Clock;
use vigil::config::VigilConfig;
use vigil::health::Scheduler;
use vigil::loadtest::LoadTestEngine;
use vigil::store::{MongoStore, Store};

/// Site-reliability toolkit: scheduled health checks and on-demand load tests.
#[derive(Debug, Parser)]
#[command(name = "vigil", version)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Control plane port (overrides config and environment)
    #[arg(long)]
    port: Option<u16>,

    /// Log level (overrides config and environment)
    #[arg(long)]
    log_level: Option<String>,
}

fn load_config(args: &Args) -> Result<VigilConfig, Box<dyn std::error::Error>> {
    let mut config = VigilConfig::load(args.config.as_deref())?.with_env_overrides();

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(ref log_level) = args.log_level {
        config.logging.level = log_level.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Block until an interrupt or termination signal arrives, then fire the
/// root token so every subsystem winds down together.
async fn shutdown_signal(cancel: CancellationToken) {
    let interrupt = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal = tokio::select! {
        _ = interrupt => "SIGINT",
        _ = terminate => "SIGTERM",
    };

    tracing::info!(%signal, "shutdown signal received, stopping");
    cancel.cancel();
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args)?;

    vigil::logging::init_tracing(&config.logging)?;
    tracing::info!("Starting Vigil");
    tracing::debug!(?config, "Loaded configuration");

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    let client = mongodb::Client::with_uri_str(&config.mongo.uri).await?;
    let db = client.database(&config.mongo.database);
    tracing::info!(database = %config.mongo.database, "connected to MongoDB");

    let store: Arc<dyn Store> = Arc::new(MongoStore::new(db, cancel.clone()));

    let mut clock = Clock::new();
    let ticks = clock
        .subscribe()
        .expect("tick source already subscribed");
    let clock_handle = clock.start(cancel.clone());

    let scheduler = Arc::new(Scheduler::new(
        Arc::clone(&store),
        config.scheduler.clone(),
        &config.http_client,
    ));
    let scheduler_handle = scheduler.start(ticks, cancel.clone());

    let engine = Arc::new(LoadTestEngine::new(Arc::clone(&store), &config.http_client));

    let state = Arc::new(AppState::new(store, engine, cancel.clone()));
    let router = api::create_router(state);

    api::serve(
        router,
        &config.server.host,
        config.server.port,
        Duration::from_secs(config.server.shutdown_grace_seconds),
        cancel.clone(),
    )
    .await?;

    cancel.cancel();
    clock.stop();

    scheduler_handle.await?;
    clock_handle.await?;

    tracing::info!("Vigil stopped");
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(e) = run(Args::parse()).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
