pub mod api;
pub mod config;
pub mod models;
pub mod pipeline;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use api::ServerError;
use config::AppConfig;
use pipeline::generation::OllamaClient;
use pipeline::trials::JsonTrialCatalog;
use pipeline::ConsultationPipeline;

pub fn run() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start async runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(serve(AppConfig::from_env())) {
        tracing::error!("{} stopped: {e}", config::APP_NAME);
        std::process::exit(1);
    }
}

/// Wire the Ollama client and JSON trial catalog into the pipeline, serve the
/// API until Ctrl-C, then shut down gracefully.
pub async fn serve(config: AppConfig) -> Result<(), ServerError> {
    let llm = OllamaClient::new(&config.ollama_url, &config.model, config.stage_timeout.as_secs())?;
    let catalog = JsonTrialCatalog::new(config.trials_path.clone());
    tracing::info!(
        ollama = %config.ollama_url,
        model = %config.model,
        trials = %config.trials_path.display(),
        "Pipeline configured"
    );

    let pipeline = ConsultationPipeline::new(Arc::new(llm), Arc::new(catalog), config.pipeline_settings());
    let mut server = api::start_server(config.bind_addr, api::api_router(Arc::new(pipeline))).await?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for shutdown signal: {e}");
    }
    server.shutdown();
    server.stopped().await
}
