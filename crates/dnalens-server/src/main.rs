mod api;
mod middleware;

use std::sync::Arc;

use dnalens_core::{Environment, ProfileStore};
use dnalens_gemini::GeminiClient;
use dnalens_pipeline::DnaState;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limiter, AppState},
    middleware::ApiKeys,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Arc::new(dnalens_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let service = match config.gemini_api_key.as_deref() {
        Some(api_key) => Some(Arc::new(GeminiClient::from_config(api_key, &config)?)),
        None => {
            tracing::warn!("GEMINI_API_KEY not set; analysis endpoints will return 503");
            None
        }
    };

    tokio::fs::create_dir_all(&config.data_dir).await?;
    let dna = DnaState::load(ProfileStore::new(&config.profile_path));

    let keys = ApiKeys::from_env(matches!(config.env, Environment::Development))?;
    let state = AppState {
        dna: Arc::new(Mutex::new(dna)),
        service,
        config: Arc::clone(&config),
    };
    let app = build_app(state, keys, default_rate_limiter());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "dnalens server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
