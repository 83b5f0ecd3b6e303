//! # podium-observability
//!
//! Observability-Crate fuer Podium:
//! - Health-Check-Endpunkt (`/health`)
//! - Status-Endpunkt mit Konferenz-Kennzahlen (`/status`)
//! - Structured JSON Logging via tracing-subscriber

pub mod health;
pub mod logging;

pub use health::{status_router, HealthResponse, HealthStatus, StatusQuelle};
pub use logging::logging_initialisieren;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;

/// Startet den Observability-HTTP-Server (Health + Status)
///
/// Endpunkte:
/// - `GET /health` – Health-Check JSON
/// - `GET /status` – aggregierte Konferenz-Kennzahlen
pub async fn observability_server_starten(
    bind_addr: SocketAddr,
    quelle: Arc<dyn StatusQuelle>,
) -> Result<()> {
    let app = health::status_router(quelle);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = %bind_addr, "Observability-Server gestartet");

    axum::serve(listener, app).await?;
    Ok(())
}
