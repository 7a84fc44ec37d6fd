pub mod handlers;
pub mod render;
pub mod routes;

use tracing::info;

use crate::error::{CompanionError, Result};

pub use routes::AppState;

/// Serve the front-end on `bind` until Ctrl-C.
pub async fn serve(app: axum::Router, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| CompanionError::Config(format!("failed to bind {bind}: {e}")))?;

    info!(bind = %bind, "code companion listening (HTTP)");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    Ok(())
}
