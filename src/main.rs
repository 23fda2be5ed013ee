use anyhow::Result;
use clap::Parser;
use interview_relay::nats::{run_event_pump, run_fault_listener, run_response_listener};
use interview_relay::{
    create_router, AppState, Config, Evaluator, FfmpegTranscoder, HttpEvaluator, IdentityProvider,
    InterviewStore, JsonFileStore, MediaBufferManager, MemoryStore, NatsClient, RelayBridge,
    SessionRegistry, StaticTokenIdentity,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "interview-relay")]
#[command(about = "Relay live interview sessions between participants and the interviewer service")]
struct Args {
    /// Config file path (extension optional)
    #[arg(short, long, default_value = "config/interview-relay")]
    config: String,

    /// Override the disconnect grace period in seconds
    #[arg(long)]
    grace_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut cfg = Config::load(&args.config)?;
    if let Some(grace_secs) = args.grace_secs {
        cfg.session.grace_secs = grace_secs;
    }

    info!("Interview Relay v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    // Interviewer link
    let nats = Arc::new(NatsClient::connect(&cfg.nats.url, cfg.nats.subjects.clone()).await?);
    let (relay, decider_events) = RelayBridge::new();
    tokio::spawn(run_event_pump(Arc::clone(&nats), decider_events));

    // Media capture
    let transcoder = Arc::new(FfmpegTranscoder::new(
        cfg.media.ffmpeg_path.clone(),
        cfg.media.uploads_dir.clone(),
    ));
    let media = MediaBufferManager::new(cfg.media_config(), transcoder);
    let drain = media.spawn_drain();

    // Persistence and scoring
    let store: Arc<dyn InterviewStore> = match &cfg.store.records_dir {
        Some(dir) => {
            info!("Persisting interviews to {}", dir.display());
            Arc::new(JsonFileStore::open(dir.clone())?)
        }
        None => {
            warn!("No records_dir configured, interviews are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };
    let evaluator: Option<Arc<dyn Evaluator>> = if cfg.evaluation.enabled {
        Some(Arc::new(HttpEvaluator::new(&cfg.evaluation)?))
    } else {
        info!("Evaluation disabled");
        None
    };

    let registry = SessionRegistry::new(
        cfg.session_config(),
        relay.clone(),
        media.clone(),
        store,
        evaluator,
    );

    tokio::spawn(run_response_listener(
        nats.subscribe_responses().await?,
        registry.clone(),
    ));
    tokio::spawn(run_fault_listener(
        nats.subscribe_faults().await?,
        registry.clone(),
    ));

    let identity = StaticTokenIdentity::new(cfg.identity.token_table());
    if identity.is_empty() {
        warn!("No participant tokens configured, every socket will be rejected");
    }
    let identity: Arc<dyn IdentityProvider> = Arc::new(identity);

    let state = AppState::new(registry.clone(), relay, media, identity);
    let app = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(
        "Shutting down ({} sessions still live, {} finalizing)",
        registry.active_count(),
        registry.finalizing_count()
    );
    registry.wait_finalizing().await;
    drain.abort();
    nats.close().await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
}
