//! podium-server – Bibliotheks-Root
//!
//! Verdrahtet alle Subsysteme: Broadcaster, Konferenz-Kern, Relay,
//! Signaling-Server und Observability. Stellt den oeffentlichen
//! Einstiegspunkt fuer Integrationstests bereit.

pub mod config;

use anyhow::Result;
use config::ServerConfig;
use podium_conference::{Konferenz, KonferenzKonfiguration};
use podium_observability::StatusQuelle;
use podium_protocol::control::AggregateStats;
use podium_relay::{AudioRelay, KeinTranskodierer, QualitaetsHeuristik, RelayKonfiguration};
use podium_signaling::{EventBroadcaster, SignalingConfig, SignalingServer, SignalingState};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Intervall des periodischen Kennzahlen-Logs
const STATUS_LOG_INTERVALL: Duration = Duration::from_secs(30);

/// Status-Quelle fuer den Observability-Server
struct KonferenzStatus {
    konferenz: Konferenz,
    start: Instant,
}

impl StatusQuelle for KonferenzStatus {
    fn aggregate(&self) -> AggregateStats {
        self.konferenz.aggregate()
    }

    fn uptime_secs(&self) -> u64 {
        self.start.elapsed().as_secs()
    }
}

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Broadcaster, Konferenz-Kern und Relay verdrahten
    /// 2. TCP-Listener starten (Control-Protokoll)
    /// 3. Observability-Server starten (optional)
    /// 4. Auf Ctrl-C warten, dann Shutdown-Signal verteilen
    pub async fn starten(self) -> Result<()> {
        let config = self.config;
        let start = Instant::now();

        tracing::info!(
            server_name = %config.server.name,
            tcp = %config.tcp_bind_adresse(),
            max_clients = config.server.max_clients,
            "Server startet"
        );

        // Broadcaster zuerst: er ist die EreignisSenke aller Schichten
        let broadcaster = EventBroadcaster::neu();

        let konferenz = Konferenz::neu(
            KonferenzKonfiguration {
                max_warteschlange: config.konferenz.max_warteschlange,
                redezeit_limit: Duration::from_secs(config.konferenz.redezeit_limit_sek),
                admin_passwort: config.server.admin_passwort.clone(),
                glaettungs_gewicht: config.konferenz.glaettungs_gewicht,
            },
            Arc::new(broadcaster.clone()),
        );

        let relay = AudioRelay::neu(
            konferenz.clone(),
            Arc::new(broadcaster.clone()),
            Arc::new(KeinTranskodierer),
            RelayKonfiguration {
                heuristik: QualitaetsHeuristik {
                    erwartete_segment_bytes: config.relay.erwartete_segment_bytes,
                    latenz_exzellent_ms: config.relay.latenz_exzellent_ms,
                    latenz_gut_ms: config.relay.latenz_gut_ms,
                    groesse_exzellent_min: config.relay.groesse_exzellent_min,
                    groesse_exzellent_max: config.relay.groesse_exzellent_max,
                    groesse_gut_min: config.relay.groesse_gut_min,
                },
                perf_log_intervall: config.relay.perf_log_intervall,
            },
        );

        let state = SignalingState::neu(
            SignalingConfig {
                server_name: config.server.name.clone(),
                max_clients: config.server.max_clients,
                keepalive_sek: config.netzwerk.keepalive_sek,
                verbindungs_timeout_sek: config.netzwerk.verbindungs_timeout_sek,
            },
            konferenz.clone(),
            relay,
            broadcaster,
        );

        // Shutdown-Kanal fuer alle Subsysteme
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        // TCP-Signaling-Server
        let bind_addr = config.tcp_bind_adresse().parse()?;
        let signaling = SignalingServer::neu(Arc::clone(&state), bind_addr);
        let signaling_task = tokio::spawn(signaling.starten(shutdown_rx.clone()));

        // Observability-Server (optional)
        if config.observability.aktiviert {
            let quelle: Arc<dyn StatusQuelle> = Arc::new(KonferenzStatus {
                konferenz: konferenz.clone(),
                start,
            });
            let obs_addr = config.observability_bind_adresse().parse()?;
            tokio::spawn(async move {
                if let Err(e) =
                    podium_observability::observability_server_starten(obs_addr, quelle).await
                {
                    tracing::error!(fehler = %e, "Observability-Server beendet");
                }
            });
        }

        // Periodischer Kennzahlen-Log
        {
            let konferenz = konferenz.clone();
            let mut shutdown_rx = shutdown_rx.clone();
            tokio::spawn(async move {
                let mut tick = tokio::time::interval(STATUS_LOG_INTERVALL);
                tick.tick().await;
                loop {
                    tokio::select! {
                        _ = tick.tick() => {
                            let stats = konferenz.aggregate();
                            tracing::info!(
                                verbindungen = stats.connections,
                                admins = stats.admins,
                                rednerliste = stats.queue_length,
                                sprecher = stats.active_speaker.as_deref().unwrap_or("-"),
                                segmente = stats.segments_processed,
                                "Konferenz-Status"
                            );
                        }
                        Ok(()) = shutdown_rx.changed() => {
                            if *shutdown_rx.borrow() {
                                break;
                            }
                        }
                    }
                }
            });
        }

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown-Signal empfangen, Server wird beendet");

        shutdown_tx.send(true)?;
        match signaling_task.await {
            Ok(ergebnis) => ergebnis?,
            Err(e) => tracing::error!(fehler = %e, "Signaling-Task abgebrochen"),
        }

        Ok(())
    }
}
