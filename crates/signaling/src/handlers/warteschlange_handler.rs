//! Rednerlisten-Handler – RequestToSpeak, WithdrawRequest, EndSpeaking

use podium_core::types::VerbindungsId;
use podium_protocol::control::{ControlMessage, ControlPayload};
use std::sync::Arc;

use crate::server_state::SignalingState;

/// Verarbeitet eine Wortmeldung
pub fn handle_request_to_speak(
    request_id: u32,
    id: VerbindungsId,
    state: &Arc<SignalingState>,
) -> ControlMessage {
    match state.konferenz.wortmeldung(id) {
        Ok(notice) => ControlMessage::new(request_id, ControlPayload::Queued(notice)),
        Err(fehler) => {
            ControlMessage::error(request_id, fehler.error_code(), fehler.to_string())
        }
    }
}

/// Zieht eine Wortmeldung zurueck
///
/// Antwortet nur im Fehlerfall; die Positions-Updates der verbliebenen
/// Wartenden gehen als Ereignisse raus.
pub fn handle_withdraw(
    request_id: u32,
    id: VerbindungsId,
    state: &Arc<SignalingState>,
) -> Option<ControlMessage> {
    match state.konferenz.wortmeldung_zurueckziehen(id) {
        Ok(()) => None,
        Err(fehler) => Some(ControlMessage::error(
            request_id,
            fehler.error_code(),
            fehler.to_string(),
        )),
    }
}

/// Sprecher beendet seine Sprechphase selbst
///
/// Immer ein No-Op wenn der Aufrufer nicht der aktive Sprecher ist;
/// das Ende selbst kommt als SpeakingEnd-Ereignis.
pub fn handle_end_speaking(id: VerbindungsId, state: &Arc<SignalingState>) {
    state.konferenz.freiwillig_beenden(id);
}
