use std::sync::Arc;

use anyhow::Context;
use listenos_engine::{commands, AppState, EngineConfig, RemoteLlm, SystemDesktop};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    for file in [".env.local", ".env"] {
        if dotenvy::from_filename(file).is_ok() {
            break;
        }
    }

    let _ = env_logger::try_init();
    log::info!("Starting ListenOS engine");

    let config = EngineConfig::load();
    let ai_enabled = config.llm.has_api_key();
    if !ai_enabled {
        log::warn!("No API key configured for {}, model calls will fail", config.llm.provider);
    }

    let llm = RemoteLlm::from_config(&config.llm).context("Failed to build completion client")?;
    log::info!("Using {} model {}", llm.provider(), config.llm.model_name());

    let state = AppState::new(&config, Arc::new(llm), Arc::new(SystemDesktop::new()), ai_enabled)
        .context("Failed to build command router")?;
    let app = commands::routes(Arc::new(state));

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    log::info!("Listening on {}", address);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
