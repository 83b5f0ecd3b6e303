//! Health- und Status-Endpunkte fuer Podium
//!
//! - `GET /health` – Liveness-Probe, immer leichtgewichtig
//! - `GET /status` – aggregierte Konferenz-Kennzahlen fuer Dashboards

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use podium_protocol::control::AggregateStats;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Quelle der Status-Kennzahlen
///
/// Implementiert vom Server ueber den Konferenz-Kern; der
/// Observability-Crate kennt die Konferenz-Interna nicht.
pub trait StatusQuelle: Send + Sync + 'static {
    /// Aggregierte Konferenz-Kennzahlen
    fn aggregate(&self) -> AggregateStats;
    /// Sekunden seit Serverstart
    fn uptime_secs(&self) -> u64;
}

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Antwort des Status-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub uptime_seconds: u64,
    pub stats: AggregateStats,
}

/// Axum-Router fuer `/health` und `/status`
///
/// Requests werden ueber einen `TraceLayer` als tracing-Spans geloggt.
pub fn status_router(quelle: Arc<dyn StatusQuelle>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(quelle)
}

/// `GET /health` – Liveness-Probe
async fn health_handler(State(quelle): State<Arc<dyn StatusQuelle>>) -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: quelle.uptime_secs(),
    };
    (StatusCode::OK, Json(response))
}

/// `GET /status` – Konferenz-Kennzahlen
async fn status_handler(State(quelle): State<Arc<dyn StatusQuelle>>) -> impl IntoResponse {
    let response = StatusResponse {
        uptime_seconds: quelle.uptime_secs(),
        stats: quelle.aggregate(),
    };
    (StatusCode::OK, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FesteQuelle;

    impl StatusQuelle for FesteQuelle {
        fn aggregate(&self) -> AggregateStats {
            AggregateStats {
                connections: 3,
                admins: 1,
                queue_length: 2,
                active_speaker: Some("Anna".into()),
                speaker_elapsed_secs: Some(12),
                segments_processed: 400,
            }
        }
        fn uptime_secs(&self) -> u64 {
            7
        }
    }

    #[test]
    fn health_response_serialisierung() {
        let response = HealthResponse {
            status: HealthStatus::Healthy,
            version: "0.1.0".into(),
            uptime_seconds: 42,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(json.contains("\"uptime_seconds\":42"));
    }

    #[test]
    fn status_response_enthaelt_kennzahlen() {
        let quelle = FesteQuelle;
        let response = StatusResponse {
            uptime_seconds: quelle.uptime_secs(),
            stats: quelle.aggregate(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"connections\":3"));
        assert!(json.contains("\"active_speaker\":\"Anna\""));
    }
}
