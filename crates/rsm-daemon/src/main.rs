//! rsm-daemon entry point.
//!
//! Thin: loads configuration and secrets, builds the collaborators, starts
//! the optional status API and runs the scheduler. All pass logic lives in
//! `scheduler.rs`.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use clap::Parser;
use rsm_config::{
    load_layered_yaml, report_unused_keys, secrets::resolve_secrets, UnusedKeyPolicy,
};
use rsm_daemon::{
    routes,
    scheduler::{MonitorState, PassSettings, Scheduler},
    state::AppState,
    wiring,
};
use rsm_publish::{SlotStore, SlotTable};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{error, info, warn, Level};

#[derive(Debug, Parser)]
#[command(name = "rsm-daemon", about = "Roster status monitor")]
struct Args {
    /// YAML config layer; repeat to overlay (later files win).
    #[arg(long = "config", required = true)]
    config: Vec<String>,

    /// Run a single pass and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();
    let args = Args::parse();

    let paths: Vec<&str> = args.config.iter().map(String::as_str).collect();
    let loaded = load_layered_yaml(&paths)?;
    let unused = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    for ptr in &unused.unused_leaf_pointers {
        warn!(key = %ptr, "unused config key");
    }
    let cfg = loaded.monitor()?;
    for w in cfg.validate() {
        warn!("config: {w}");
    }
    let secrets = resolve_secrets(&cfg.secrets)?;
    info!(config_hash = %loaded.config_hash, regions = cfg.regions.len(), "config loaded");

    let (collab, discord) = wiring::build_collaborators(&cfg, &secrets)?;
    let emojis = wiring::resolve_emojis(&discord, &cfg.publish.emojis).await;

    let store = SlotStore::new(&cfg.publish.slots_file);
    let slots = match store.load() {
        Ok(table) => table,
        Err(err) => {
            let detail = format!("{err:#}");
            error!(error = %detail, "slot table unreadable; new slots will be created");
            SlotTable::default()
        }
    };
    info!(slots = slots.len(), path = %store.path().display(), "slot table loaded");

    let app = Arc::new(AppState::new(loaded.config_hash.clone()));
    if let Some(addr) = &cfg.status_api.addr {
        let addr: SocketAddr = addr
            .parse()
            .with_context(|| format!("invalid status_api.addr '{addr}'"))?;
        spawn_status_api(Arc::clone(&app), addr).await?;
    }

    let mut scheduler = Scheduler::new(
        PassSettings::from_config(&cfg, emojis),
        collab,
        MonitorState::new(&cfg, slots),
        store,
    );

    if args.once {
        let summary = scheduler.run_pass(chrono::Utc::now()).await;
        app.record_pass(summary).await;
        scheduler.flush_all().await;
        return Ok(());
    }

    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "ctrl-c handler failed");
            std::future::pending::<()>().await;
        }
    };
    scheduler
        .run_loop(cfg.schedule.tick_interval(), app, shutdown)
        .await;

    info!("rsm-daemon stopped");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

async fn spawn_status_api(app: Arc<AppState>, addr: SocketAddr) -> anyhow::Result<()> {
    let router = routes::build_router(app)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("status api bind failed on {addr}"))?;
    info!("status api listening on http://{}", addr);

    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, router).await {
            error!(error = %err, "status api crashed");
        }
    });
    Ok(())
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET])
        .allow_headers(tower_http::cors::Any)
}
