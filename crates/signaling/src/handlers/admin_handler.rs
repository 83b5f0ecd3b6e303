//! Admin-Handler – Authenticate, Approve, Reject, ForceEnd, StatsRequest
//!
//! Das eigentliche Autoritaets-Gate liegt im Konferenz-Kern; die Handler
//! uebersetzen nur zwischen Wire-Nachrichten und Kern-Operationen.

use podium_core::types::VerbindungsId;
use podium_protocol::control::{AuthenticateRequest, ControlMessage, ControlPayload, ErrorCode};
use std::sync::Arc;

use crate::server_state::SignalingState;

/// Nachtraegliche Admin-Authentifizierung per Shared Secret
pub fn handle_authenticate(
    request: AuthenticateRequest,
    request_id: u32,
    id: VerbindungsId,
    state: &Arc<SignalingState>,
) -> ControlMessage {
    match state.konferenz.authentifizieren(id, &request.credential) {
        Ok(_) => ControlMessage::new(request_id, ControlPayload::AdminPromoted),
        Err(fehler) => {
            ControlMessage::error(request_id, fehler.error_code(), fehler.to_string())
        }
    }
}

/// Genehmigt eine Wortmeldung
pub fn handle_approve(
    ziel: VerbindungsId,
    request_id: u32,
    id: VerbindungsId,
    state: &Arc<SignalingState>,
) -> Option<ControlMessage> {
    match state.konferenz.genehmigen(id, ziel) {
        Ok(()) => None,
        Err(fehler) => Some(ControlMessage::error(
            request_id,
            fehler.error_code(),
            fehler.to_string(),
        )),
    }
}

/// Lehnt eine Wortmeldung ab
pub fn handle_reject(
    ziel: VerbindungsId,
    request_id: u32,
    id: VerbindungsId,
    state: &Arc<SignalingState>,
) -> Option<ControlMessage> {
    match state.konferenz.ablehnen(id, ziel) {
        Ok(()) => None,
        Err(fehler) => Some(ControlMessage::error(
            request_id,
            fehler.error_code(),
            fehler.to_string(),
        )),
    }
}

/// Beendet die laufende Sprechphase per Admin-Eingriff
pub fn handle_force_end(
    request_id: u32,
    id: VerbindungsId,
    state: &Arc<SignalingState>,
) -> Option<ControlMessage> {
    match state.konferenz.erzwungen_beenden(id) {
        Ok(()) => None,
        Err(fehler) => Some(ControlMessage::error(
            request_id,
            fehler.error_code(),
            fehler.to_string(),
        )),
    }
}

/// Aggregierte Kennzahlen (nur fuer Admins)
pub fn handle_stats(
    request_id: u32,
    id: VerbindungsId,
    state: &Arc<SignalingState>,
) -> ControlMessage {
    if !state.konferenz.ist_admin(&id) {
        return ControlMessage::error(
            request_id,
            ErrorCode::Unauthorized,
            "Statistiken erfordern Admin-Rolle",
        );
    }
    ControlMessage::new(
        request_id,
        ControlPayload::StatsResponse(state.konferenz.aggregate()),
    )
}
