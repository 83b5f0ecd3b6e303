//! Beitritts-Handler – Join und Leave
//!
//! Der Join-Handshake registriert die Verbindung im Konferenz-Kern und
//! liefert den vollstaendigen Zustands-Snapshot als Antwort. Leave
//! stoesst denselben Aufraeumpfad an wie ein TCP-Disconnect.

use podium_core::types::VerbindungsId;
use podium_protocol::control::{ControlMessage, ControlPayload, JoinRequest};
use std::sync::Arc;

use crate::server_state::SignalingState;

/// Verarbeitet eine Join-Anfrage
pub fn handle_join(
    request: JoinRequest,
    request_id: u32,
    id: VerbindungsId,
    state: &Arc<SignalingState>,
) -> ControlMessage {
    match state.konferenz.beitreten(id, request) {
        Ok(antwort) => ControlMessage::new(request_id, ControlPayload::Joined(antwort)),
        Err(fehler) => {
            ControlMessage::error(request_id, fehler.error_code(), fehler.to_string())
        }
    }
}

/// Verarbeitet eine Leave-Anfrage
///
/// Identisch zum Disconnect-Aufraeumpfad; die TCP-Verbindung wird vom
/// Aufrufer anschliessend geschlossen.
pub fn handle_leave(id: VerbindungsId, state: &Arc<SignalingState>) {
    state.konferenz.verlassen(id);
}
