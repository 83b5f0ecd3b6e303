//! Audio-Handler – AudioSegment, AudioChunk, Streaming-Klammern
//!
//! Segmente gehen direkt in die Relay-Pipeline; das Legacy-Chunk-Format
//! aelterer Clients wird vorher ins Segment-Format normalisiert.

use podium_core::types::VerbindungsId;
use podium_protocol::control::{
    AudioChunkData, AudioSegmentData, ControlMessage, StreamingEndRequest, StreamingStartRequest,
};
use std::sync::Arc;

use crate::server_state::SignalingState;

/// Verarbeitet ein Audio-Segment des aktiven Sprechers
///
/// Ack und Fan-out erledigt die Relay-Pipeline selbst; der Handler
/// liefert daher nie eine eigene Antwort.
pub fn handle_audio_segment(
    segment: AudioSegmentData,
    request_id: u32,
    id: VerbindungsId,
    state: &Arc<SignalingState>,
) {
    state.relay.segment_verarbeiten(request_id, id, segment);
}

/// Normalisiert ein Legacy-Chunk und verarbeitet es als Segment
pub fn handle_audio_chunk(
    chunk: AudioChunkData,
    request_id: u32,
    id: VerbindungsId,
    state: &Arc<SignalingState>,
) {
    state
        .relay
        .segment_verarbeiten(request_id, id, AudioSegmentData::from(chunk));
}

/// Oeffnet eine Streaming-Klammer (nur der aktive Sprecher)
pub fn handle_streaming_start(
    request: StreamingStartRequest,
    request_id: u32,
    id: VerbindungsId,
    state: &Arc<SignalingState>,
) -> Option<ControlMessage> {
    match state.konferenz.streaming_start(id, request) {
        Ok(()) => None,
        Err(fehler) => Some(ControlMessage::error(
            request_id,
            fehler.error_code(),
            fehler.to_string(),
        )),
    }
}

/// Schliesst die Streaming-Klammer regulaer
pub fn handle_streaming_end(
    request: StreamingEndRequest,
    request_id: u32,
    id: VerbindungsId,
    state: &Arc<SignalingState>,
) -> Option<ControlMessage> {
    match state.konferenz.streaming_ende(id, request) {
        Ok(()) => None,
        Err(fehler) => Some(ControlMessage::error(
            request_id,
            fehler.error_code(),
            fehler.to_string(),
        )),
    }
}
