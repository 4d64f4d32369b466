//! Chartline API server binary.
//!
//! Resolves the model provider from the environment (optionally overridden
//! on the command line), then serves the chat API until Ctrl-C / SIGTERM.

use chartline_api::config::ApiConfig;
use chartline_core::provider::{self, ProviderConfig, ProviderKind};
use clap::Parser;
use tracing::info;

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "chartline_api_server", about = "Chartline chat-to-chart API server")]
struct Args {
    /// Address to bind the HTTP listener, overriding `BIND_ADDR`.
    #[arg(long)]
    bind_addr: Option<String>,

    /// Model provider: anthropic, openai or google.
    #[arg(long, value_parser = parse_provider)]
    provider: Option<ProviderKind>,

    /// Model name, overriding the provider default and `CHART_MODEL`.
    #[arg(long)]
    model: Option<String>,

    /// Sampling temperature, overriding `CHART_TEMPERATURE`.
    #[arg(long)]
    temperature: Option<f32>,

    /// Maximum output tokens, overriding `CHART_MAX_TOKENS`.
    #[arg(long)]
    max_tokens: Option<u32>,
}

fn parse_provider(s: &str) -> Result<ProviderKind, String> {
    s.parse().map_err(|e: provider::ProviderError| e.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,chartline_api=debug,chartline_core=debug".into()),
        )
        .init();

    let args = Args::parse();

    let provider_config = resolve_provider_config(&args)?;
    info!(
        provider = %provider_config.kind,
        model = %provider_config.model,
        temperature = provider_config.temperature,
        max_tokens = provider_config.max_tokens,
        "starting chartline_api_server"
    );

    let model = provider::build(&provider_config)?;

    let mut api_config = ApiConfig::from_env();
    if let Some(bind_addr) = &args.bind_addr {
        api_config.bind_addr = bind_addr.clone();
    }
    let bind_addr = api_config.bind_addr.clone();

    let state = chartline_api::AppState {
        config: api_config,
        model,
        params: provider_config.params(),
    };

    let app = chartline_api::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

/// Environment first, then command-line overrides.
fn resolve_provider_config(args: &Args) -> Result<ProviderConfig, provider::ProviderError> {
    let mut config = ProviderConfig::from_env()?;

    if let Some(kind) = args.provider
        && kind != config.kind
    {
        // Switching provider means the key and default model change too.
        let base_url = config.base_url.take();
        config = ProviderConfig {
            api_key: std::env::var(kind.api_key_env()).ok().filter(|v| !v.is_empty()),
            base_url,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
            ..ProviderConfig::new(kind)
        };
    }
    if let Some(model) = &args.model {
        config.model = model.clone();
    }
    if let Some(temperature) = args.temperature {
        config.temperature = temperature;
    }
    if let Some(max_tokens) = args.max_tokens {
        config.max_tokens = max_tokens;
    }
    Ok(config)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received, draining connections");
}
