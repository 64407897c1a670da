// Main entry point for the Jolokia gateway

use jolokia_gateway::api::{create_router, AppState, PolicyEngine};
use jolokia_gateway::auth::AccessReviewClient;
use jolokia_gateway::config::Config;
use jolokia_gateway::core::models::SslOptions;
use jolokia_gateway::engine::AclPolicyEngine;
use jolokia_gateway::proxy::JolokiaClient;

use anyhow::Context;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load and validate configuration first (before any logging)
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // 2. Initialize tracing subscriber with config values
    init_tracing(&config)?;

    info!("**************************************");
    info!("* App Port:          {}", config.port);
    info!("* Log Level:         {}", config.log_level);
    info!("* Proxy SSL Enabled: {}", config.ssl_proxy_certificate.is_some());
    info!("* Cluster Address:   {}", config.cluster_address);
    match &config.rbac_acl_path {
        Some(path) => info!("* RBAC:              {}", path.display()),
        None => info!("* RBAC:              disabled"),
    }
    info!("* Mask IP Addresses: {}", config.mask_ip_addresses);
    info!("**************************************");

    // 3. Read TLS material for outbound calls
    let ssl = Arc::new(
        SslOptions::load(
            config.ssl_certificate_ca.as_deref(),
            config.ssl_proxy_key.as_deref(),
            config.ssl_proxy_certificate.as_deref(),
        )
        .map_err(|e| {
            error!(error = %e, "Failed to load SSL material");
            e
        })?,
    );

    // 4. Load the ACL when RBAC is enabled
    let policy: Option<Arc<dyn PolicyEngine + Send + Sync>> = match &config.rbac_acl_path {
        Some(path) => {
            let engine = AclPolicyEngine::from_file(path).map_err(|e| {
                error!(error = %e, path = ?path, "Failed to load RBAC ACL");
                e
            })?;
            info!(path = ?path, "RBAC ACL loaded");
            Some(Arc::new(engine))
        }
        None => None,
    };

    // 5. Cluster and agent clients
    let reviewer = Arc::new(AccessReviewClient::new(config.cluster_address.clone(), config.auth_mode));
    let upstream = Arc::new(JolokiaClient::new(config.cluster_address.clone()));

    let app_state = AppState {
        config: Arc::new(config.clone()),
        reviewer,
        upstream,
        policy,
        ssl,
    };

    let router = create_router(app_state);

    // 6. Start HTTP server
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(addr = %addr, "Server listening on {}", addr);

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!(error = %e, "Server error");
            e
        })?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber based on configuration
fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    // RUST_LOG wins over LOG_LEVEL
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_env_filter(filter);

    let result = if config.log_format == "json" {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };

    result.map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            info!("SIGTERM received, starting graceful shutdown");
        },
    }
}
