use std::path::Path;
use crate::api;
use crate::cli::commands::ServeArgs;
use crate::config::{self, CyberHuntConfig};
use crate::errors::CyberHuntError;
use crate::workflow::EventBus;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// Load the config file, if any, and apply command-line overrides.
pub async fn resolve_config(args: &ServeArgs) -> Result<CyberHuntConfig, CyberHuntError> {
    let mut config = match &args.config {
        Some(path) => config::parse_config(Path::new(path)).await?,
        None => CyberHuntConfig::default(),
    };
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(db) = &args.db {
        config.database.path = db.clone();
    }
    config::parser::validate_semantics(&config)?;
    Ok(config)
}

pub async fn handle_serve(config: CyberHuntConfig) -> Result<(), CyberHuntError> {
    info!(host = %config.server.host, port = config.server.port, db = %config.database.path, "Starting API server");

    let state = api::create_app_state(&config)?;
    let relay = tokio::spawn(relay_events(state.workflow.events().clone()));
    let app = api::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| CyberHuntError::Internal(format!("Server error: {}", e)))?;

    relay.abort();
    info!("Server stopped");
    Ok(())
}

/// Log every workflow event for downstream consumers that tail the logs.
async fn relay_events(bus: EventBus) {
    let mut rx = bus.subscribe();
    loop {
        match rx.recv().await {
            Ok(event) => {
                let payload = serde_json::to_string(&event).unwrap_or_default();
                info!(kind = event.kind(), review_id = %event.review_id(), %payload, "Workflow event");
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event relay lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ServeArgs {
        ServeArgs { config: None, host: None, port: None, db: None }
    }

    #[tokio::test]
    async fn test_overrides_apply_over_defaults() {
        let mut a = args();
        a.port = Some(9100);
        a.db = Some("/tmp/override.db".into());
        let config = resolve_config(&a).await.unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.database.path, "/tmp/override.db");
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[tokio::test]
    async fn test_zero_port_override_rejected() {
        let mut a = args();
        a.port = Some(0);
        assert!(matches!(resolve_config(&a).await, Err(CyberHuntError::Config(_))));
    }
}
