use clap::Parser;
use portal_plugins::api::{create_app, AppState};
use portal_plugins::utils::error::ErrorCategory;
use portal_plugins::utils::{logger, validation::Validate};
use portal_plugins::{AppConfig, PagerDutyClient, ServerArgs, ServiceCache, ServicePoller};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = ServerArgs::parse();

    // 初始化日誌
    logger::init_logger(args.verbose, args.log_json);

    tracing::info!("🚀 Starting portal-plugins");

    let mut config = match &args.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path.display());
            match AppConfig::from_file(path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("❌ Failed to load config file '{}': {}", path.display(), e);
                    eprintln!("💡 Make sure the file exists and is valid TOML format");
                    std::process::exit(1);
                }
            }
        }
        None => AppConfig::default(),
    };
    args.apply_overrides(&mut config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if config.pagerduty.token().is_none() {
        tracing::warn!("⚠️ No PagerDuty API token configured, /services will report an error");
    }

    let client = match PagerDutyClient::new(&config.pagerduty) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("❌ Failed to create PagerDuty client: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            let exit_code = match e.category() {
                ErrorCategory::Configuration => 1,
                _ => 3,
            };
            std::process::exit(exit_code);
        }
    };

    let cache = Arc::new(ServiceCache::new(Arc::new(client)));
    let poller = ServicePoller::new(cache.clone(), config.pagerduty.poll_interval()).start();

    let app = create_app(AppState { cache });
    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!("🌐 Listening on {}", listener.local_addr()?);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    poller.shutdown().await;
    served?;

    tracing::info!("✅ portal-plugins stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}
