use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use coachd::analysis::AnalysisEngine;
use coachd::assistant::{AssistantService, CompanionClient, CompanionConfig};
use coachd::config::Config;
use coachd::http::{create_router, AppState};
use coachd::llm::{ChatCompleter, OpenAiChatClient, OpenAiChatConfig};
use coachd::persist::{BatchCoordinator, DatabaseAdapter, SavePolicy};
use coachd::transcript::SessionStore;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "coachd", about = "Real-time coaching transcript ingestion and analysis service")]
struct Args {
    /// Config file name (without extension), e.g. "config/coachd"
    #[arg(long, default_value = "config/coachd")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("coachd v{}", env!("CARGO_PKG_VERSION"));
    info!("loaded config: {}", cfg.service.name);

    // Durable storage
    let adapter = Arc::new(
        DatabaseAdapter::connect(&cfg.database.url)
            .await
            .context("Failed to connect to database")?,
    );
    adapter
        .init_schema()
        .await
        .context("Failed to initialize schema")?;

    // Live session state
    let store = SessionStore::new();

    // Analysis dependencies
    let llm: Arc<dyn ChatCompleter> = Arc::new(
        OpenAiChatClient::new(OpenAiChatConfig {
            base_url: cfg.llm.base_url.clone(),
            api_key: cfg.llm.api_key.clone(),
            model: cfg.llm.model.clone(),
            temperature: cfg.llm.temperature,
            max_tokens: cfg.llm.max_tokens,
            timeout: Duration::from_secs(cfg.llm.timeout_secs),
        })
        .context("Failed to build chat client")?,
    );

    let assistant: Option<Arc<dyn AssistantService>> = if cfg.assistant.enabled {
        Some(Arc::new(
            CompanionClient::new(CompanionConfig {
                base_url: cfg.assistant.base_url.clone(),
                api_key: cfg.assistant.api_key.clone(),
                domain: cfg.assistant.domain.clone(),
                timeout: Duration::from_secs(cfg.assistant.timeout_secs),
            })
            .context("Failed to build assistant client")?,
        ))
    } else {
        info!("companion assistant disabled; analysis runs without history");
        None
    };

    let engine = AnalysisEngine::new(llm, assistant);

    let coordinator = BatchCoordinator::new(
        store.clone(),
        adapter.clone(),
        SavePolicy {
            min_unsaved_entries: cfg.batch.min_unsaved_entries,
            max_save_interval: cfg.batch.max_save_interval(),
        },
    );

    // Periodic save sweep. The coordinator itself never self-schedules.
    {
        let coordinator = coordinator.clone();
        let interval = Duration::from_secs(cfg.batch.sweep_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                coordinator.check_and_save_all_sessions().await;
            }
        });
    }

    // Slower eviction sweep for idle sessions and stale analyses.
    {
        let store = store.clone();
        let engine = engine.clone();
        let interval = Duration::from_secs(cfg.cleanup.interval_secs);
        let max_age_hours = cfg.cleanup.max_age_hours;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let sessions = store.cleanup_old_sessions(max_age_hours).await;
                let analyses = engine.cleanup(max_age_hours).await;
                if sessions > 0 || analyses > 0 {
                    info!(sessions, analyses, "eviction sweep complete");
                }
            }
        });
    }

    let state = AppState::new(store, coordinator, engine, adapter);
    let router = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);

    if let Err(e) = axum::serve(listener, router).await {
        error!("server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
