//! Gemeinsamer Server-Zustand fuer den Signaling-Layer
//!
//! Haelt Konferenz-Kern, Audio-Relay und Broadcaster als geteilte
//! Handles, die sicher zwischen tokio-Tasks geteilt werden koennen.

use podium_conference::Konferenz;
use podium_relay::AudioRelay;
use std::sync::Arc;
use std::time::Instant;

use crate::broadcast::EventBroadcaster;

/// Konfiguration fuer den Signaling-Layer
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Anzeigename des Servers
    pub server_name: String,
    /// Maximale gleichzeitige Verbindungen
    pub max_clients: u32,
    /// Keepalive-Intervall in Sekunden
    pub keepalive_sek: u64,
    /// Timeout fuer inaktive Verbindungen in Sekunden
    pub verbindungs_timeout_sek: u64,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            server_name: "Podium Server".to_string(),
            max_clients: 512,
            keepalive_sek: 30,
            verbindungs_timeout_sek: 90,
        }
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
pub struct SignalingState {
    /// Server-Konfiguration
    pub config: Arc<SignalingConfig>,
    /// Konferenz-Kern (Registry, Rednerliste, Sprecher-Slot)
    pub konferenz: Konferenz,
    /// Audio-Relay (Segment-Pipeline)
    pub relay: AudioRelay,
    /// Event-Broadcaster (Send-Queues aller Clients)
    pub broadcaster: EventBroadcaster,
    /// Startzeitpunkt des Servers
    pub start: Instant,
}

impl SignalingState {
    /// Erstellt einen neuen Signaling-Zustand
    pub fn neu(
        config: SignalingConfig,
        konferenz: Konferenz,
        relay: AudioRelay,
        broadcaster: EventBroadcaster,
    ) -> Arc<Self> {
        Arc::new(Self {
            config: Arc::new(config),
            konferenz,
            relay,
            broadcaster,
            start: Instant::now(),
        })
    }
}
