//! Client-Connection – Verwaltet eine einzelne TCP-Verbindung
//!
//! Jede TCP-Verbindung bekommt eine `ClientConnection` in einem eigenen
//! tokio-Task. Die Verbindungs-ID wird beim Accept vergeben und lebt
//! bis zum Disconnect; der Konferenz-Kern kennt nur diese ID.
//!
//! ## Lebenszyklus
//! ```text
//! Verbunden -> (Join-Handshake) -> Beigetreten -> Getrennt
//! ```
//!
//! ## Keepalive
//! - Server sendet alle `keepalive_sek` einen Ping
//! - Geht laenger als `verbindungs_timeout_sek` nichts ein, wird die
//!   Verbindung getrennt
//!
//! ## Aufraeumen
//! Der Disconnect-Pfad ist fuer Leave, TCP-Abbruch, Timeout und
//! Shutdown identisch: `Konferenz::verlassen` raeumt Rednerliste,
//! Sprecher-Slot und Admin-Rolle auf, danach wird die Send-Queue aus
//! dem Broadcaster entfernt.

use futures_util::{SinkExt, StreamExt};
use podium_core::types::{unix_zeit_ms, VerbindungsId};
use podium_protocol::{
    control::{ControlMessage, ErrorCode},
    wire::FrameCodec,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;

use crate::dispatcher::{DispatcherContext, MessageDispatcher};
use crate::error::{SignalingError, SignalingResult};
use crate::server_state::SignalingState;

/// Verarbeitet eine einzelne TCP-Verbindung
///
/// Liest Frames via `FrameCodec`, dispatcht an `MessageDispatcher` und
/// pumpt die Broadcaster-Queue zurueck auf den Socket.
pub struct ClientConnection {
    state: Arc<SignalingState>,
    peer_addr: SocketAddr,
    verbindungs_id: VerbindungsId,
}

impl ClientConnection {
    /// Erstellt eine neue ClientConnection mit frischer Verbindungs-ID
    pub fn neu(state: Arc<SignalingState>, peer_addr: SocketAddr) -> Self {
        Self {
            state,
            peer_addr,
            verbindungs_id: VerbindungsId::new(),
        }
    }

    /// Verbindungs-ID dieser Verbindung
    pub fn verbindungs_id(&self) -> VerbindungsId {
        self.verbindungs_id
    }

    /// Verarbeitet die Verbindung bis zum Ende und raeumt danach auf
    ///
    /// Der Aufraeumpfad ist fuer saubere und abnormale Enden identisch;
    /// der Unterschied liegt nur im Log.
    pub async fn verarbeiten(
        self,
        stream: TcpStream,
        shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) {
        let peer_addr = self.peer_addr;
        let id = self.verbindungs_id;

        tracing::info!(peer = %peer_addr, user_id = %id, "Neue Verbindung");

        let mut framed = Framed::new(stream, FrameCodec::new());

        // Send-Queue im Broadcaster registrieren, bevor irgendein
        // Konferenz-Ereignis diese Verbindung erreichen kann
        let mut sende_rx = self.state.broadcaster.client_registrieren(id);

        match self
            .verbindungs_schleife(&mut framed, &mut sende_rx, shutdown_rx)
            .await
        {
            Ok(()) => {
                tracing::info!(peer = %peer_addr, user_id = %id, "Verbindung geschlossen");
            }
            Err(fehler) => {
                tracing::warn!(peer = %peer_addr, user_id = %id, %fehler, "Verbindung abgebrochen");
            }
        }

        // Aufraeumen: Konferenz-Zustand zuerst (sendet Abschieds-Events
        // an die anderen), dann die eigene Send-Queue entfernen
        self.state.konferenz.verlassen(id);
        self.state.broadcaster.client_entfernen(&id);

        tracing::info!(peer = %peer_addr, user_id = %id, "Verbindungs-Task beendet");
    }

    /// Verbindungs-Verarbeitungsschleife
    ///
    /// `Ok(())` bei sauberem Ende (Leave, Client-Close, Shutdown),
    /// `Err` bei IO-Fehler, Protokollfehler oder Keepalive-Timeout.
    async fn verbindungs_schleife(
        &self,
        framed: &mut Framed<TcpStream, FrameCodec>,
        sende_rx: &mut mpsc::Receiver<ControlMessage>,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) -> SignalingResult<()> {
        let peer_addr = self.peer_addr;
        let id = self.verbindungs_id;
        let keepalive_intervall = Duration::from_secs(self.state.config.keepalive_sek);
        let timeout_dauer = Duration::from_secs(self.state.config.verbindungs_timeout_sek);

        let dispatcher = MessageDispatcher::neu(Arc::clone(&self.state));
        let mut ctx = DispatcherContext::neu(peer_addr, id);

        let mut letzter_empfang = Instant::now();
        let mut naechster_ping = Instant::now() + keepalive_intervall;
        let mut ping_request_id: u32 = 0;

        loop {
            let jetzt = Instant::now();

            if jetzt.duration_since(letzter_empfang) > timeout_dauer {
                return Err(SignalingError::Timeout(timeout_dauer.as_secs()));
            }

            let ping_verzoegerung = if jetzt < naechster_ping {
                naechster_ping.duration_since(jetzt)
            } else {
                Duration::from_millis(1)
            };

            tokio::select! {
                // Eingehende Nachricht vom Client
                frame = framed.next() => {
                    match frame {
                        Some(Ok(nachricht)) => {
                            letzter_empfang = Instant::now();
                            tracing::trace!(
                                peer = %peer_addr,
                                request_id = nachricht.request_id,
                                "Nachricht empfangen"
                            );

                            if let Some(antwort) = dispatcher.dispatch(nachricht, &mut ctx) {
                                framed.send(antwort).await?;
                            }

                            if ctx.trennen {
                                tracing::info!(peer = %peer_addr, user_id = %id, "Leave – Verbindung wird geschlossen");
                                return Ok(());
                            }
                        }
                        Some(Err(e)) => {
                            return Err(SignalingError::protokoll(e.to_string()));
                        }
                        None => {
                            tracing::info!(peer = %peer_addr, user_id = %id, "Verbindung vom Client getrennt");
                            return Ok(());
                        }
                    }
                }

                // Ausgehendes Konferenz-Ereignis aus dem Broadcaster
                Some(ausgehend) = sende_rx.recv() => {
                    framed.send(ausgehend).await?;
                }

                // Keepalive-Ping
                _ = tokio::time::sleep(ping_verzoegerung) => {
                    if jetzt >= naechster_ping {
                        ping_request_id = ping_request_id.wrapping_add(1);
                        let ping = ControlMessage::ping(ping_request_id, unix_zeit_ms());
                        framed.send(ping).await?;
                        naechster_ping = Instant::now() + keepalive_intervall;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(peer = %peer_addr, "Shutdown-Signal, Verbindung wird getrennt");
                        let abschied = ControlMessage::error(
                            0,
                            ErrorCode::InternalError,
                            "Server wird heruntergefahren",
                        );
                        let _ = framed.send(abschied).await;
                        return Ok(());
                    }
                }
            }
        }
    }
}
