//! Message-Dispatcher – Routet ControlMessages an die richtigen Handler
//!
//! Der Dispatcher empfaengt ControlMessages von einer ClientConnection,
//! bestimmt den richtigen Handler und gibt die Antwort zurueck.
//!
//! ## Zustandspruefung
//! Vor dem Join-Handshake sind nur `Join`, `Ping` und `Pong` erlaubt;
//! alles andere wird mit `INVALID_REQUEST` beantwortet. Operationen
//! die ihren Effekt vollstaendig als Ereignisse kommunizieren
//! (Approve, Withdraw, Audio) antworten nur im Fehlerfall.

use podium_core::types::{unix_zeit_ms, VerbindungsId};
use podium_protocol::control::{ControlMessage, ControlPayload, ErrorCode};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::handlers::{admin_handler, audio_handler, beitritt_handler, warteschlange_handler};
use crate::server_state::SignalingState;

/// Dispatcher-Kontext – Informationen ueber die aktuelle Verbindung
pub struct DispatcherContext {
    /// Peer-IP-Adresse (nur fuers Logging)
    pub peer_addr: SocketAddr,
    /// Verbindungs-ID (vergeben beim Accept)
    pub verbindungs_id: VerbindungsId,
    /// Hat die Verbindung den Join-Handshake abgeschlossen?
    pub beigetreten: bool,
    /// Verbindung soll nach dieser Nachricht geschlossen werden
    pub trennen: bool,
}

impl DispatcherContext {
    /// Erstellt einen frischen Kontext fuer eine neue Verbindung
    pub fn neu(peer_addr: SocketAddr, verbindungs_id: VerbindungsId) -> Self {
        Self {
            peer_addr,
            verbindungs_id,
            beigetreten: false,
            trennen: false,
        }
    }
}

/// Zentraler Message-Dispatcher
///
/// Routet eingehende ControlMessages an die entsprechenden Handler und
/// gibt die Antwort-ControlMessage zurueck. `None` bedeutet: keine
/// direkte Antwort, der Effekt kommt (wenn ueberhaupt) als Ereignis.
pub struct MessageDispatcher {
    state: Arc<SignalingState>,
}

impl MessageDispatcher {
    /// Erstellt einen neuen Dispatcher
    pub fn neu(state: Arc<SignalingState>) -> Self {
        Self { state }
    }

    /// Verarbeitet eine eingehende ControlMessage
    pub fn dispatch(
        &self,
        message: ControlMessage,
        ctx: &mut DispatcherContext,
    ) -> Option<ControlMessage> {
        let request_id = message.request_id;
        let id = ctx.verbindungs_id;

        // Keepalive ist in jedem Zustand erlaubt
        match &message.payload {
            ControlPayload::Ping(ping) => {
                return Some(ControlMessage::pong(
                    request_id,
                    ping.timestamp_ms,
                    unix_zeit_ms(),
                ));
            }
            ControlPayload::Pong(_) => return None,
            _ => {}
        }

        if !ctx.beigetreten {
            return match message.payload {
                ControlPayload::Join(request) => {
                    let antwort = beitritt_handler::handle_join(request, request_id, id, &self.state);
                    if matches!(antwort.payload, ControlPayload::Joined(_)) {
                        ctx.beigetreten = true;
                    }
                    Some(antwort)
                }
                _ => Some(ControlMessage::error(
                    request_id,
                    ErrorCode::InvalidRequest,
                    "Erst der Join-Handshake, dann alles andere",
                )),
            };
        }

        match message.payload {
            ControlPayload::Join(_) => Some(ControlMessage::error(
                request_id,
                ErrorCode::InvalidRequest,
                "Bereits beigetreten",
            )),

            ControlPayload::Leave => {
                beitritt_handler::handle_leave(id, &self.state);
                ctx.beigetreten = false;
                ctx.trennen = true;
                None
            }

            // ---------------------------------------------------------------
            // Rednerliste
            // ---------------------------------------------------------------
            ControlPayload::RequestToSpeak => Some(warteschlange_handler::handle_request_to_speak(
                request_id, id, &self.state,
            )),
            ControlPayload::WithdrawRequest => {
                warteschlange_handler::handle_withdraw(request_id, id, &self.state)
            }
            ControlPayload::EndSpeaking => {
                warteschlange_handler::handle_end_speaking(id, &self.state);
                None
            }

            // ---------------------------------------------------------------
            // Audio
            // ---------------------------------------------------------------
            ControlPayload::AudioSegment(segment) => {
                audio_handler::handle_audio_segment(segment, request_id, id, &self.state);
                None
            }
            ControlPayload::AudioChunk(chunk) => {
                audio_handler::handle_audio_chunk(chunk, request_id, id, &self.state);
                None
            }
            ControlPayload::StreamingStart(request) => {
                audio_handler::handle_streaming_start(request, request_id, id, &self.state)
            }
            ControlPayload::StreamingEnd(request) => {
                audio_handler::handle_streaming_end(request, request_id, id, &self.state)
            }

            // ---------------------------------------------------------------
            // Admin
            // ---------------------------------------------------------------
            ControlPayload::Authenticate(request) => Some(admin_handler::handle_authenticate(
                request, request_id, id, &self.state,
            )),
            ControlPayload::Approve { user_id } => {
                admin_handler::handle_approve(user_id, request_id, id, &self.state)
            }
            ControlPayload::Reject { user_id } => {
                admin_handler::handle_reject(user_id, request_id, id, &self.state)
            }
            ControlPayload::ForceEnd => admin_handler::handle_force_end(request_id, id, &self.state),
            ControlPayload::StatsRequest => {
                Some(admin_handler::handle_stats(request_id, id, &self.state))
            }

            // Server-Ereignisse von Clients sind Protokollfehler
            _ => Some(ControlMessage::error(
                request_id,
                ErrorCode::InvalidRequest,
                "Nachricht ist kein Client-Request",
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
