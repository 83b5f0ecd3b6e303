//! Control-Protokoll (TCP)
//!
//! Definiert alle Konferenz-Nachrichten die ueber die persistente
//! TCP-Verbindung zwischen Client und Server ausgetauscht werden.
//!
//! ## Design
//! - Request/Response Pattern: jede Nachricht hat eine `request_id: u32`;
//!   server-initiierte Ereignisse tragen die ID 0
//! - JSON-Serialisierung via serde (TCP, nicht zeitkritisch)
//! - Tagged Enums fuer typsichere Nachrichtentypen
//! - Audio-Payloads werden Base64-kodiert transportiert

use base64::Engine;
use podium_core::types::VerbindungsId;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Fehler-Codes
// ---------------------------------------------------------------------------

/// Standardisierte Fehler-Codes fuer Error-Responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Allgemein
    InternalError,
    InvalidRequest,
    NotFound,
    // Beitritt
    InvalidName,
    // Autorisierung
    Unauthorized,
    // Warteschlange / Sprecher
    AlreadyQueued,
    AlreadySpeaking,
    QueueFull,
    NotQueued,
}

// ---------------------------------------------------------------------------
// Rollen, Phasen, Qualitaet
// ---------------------------------------------------------------------------

/// Rolle einer Verbindung in der Konferenz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rolle {
    Participant,
    Admin,
}

/// Phase einer Verbindung im Sitzungs-Zustandsautomaten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Hoert nur zu, keine Wortmeldung
    Listening,
    /// Wartet in der Rednerliste auf Freigabe
    Queued,
    /// Ist der aktive Sprecher
    Speaking,
}

/// Qualitaetsstufe eines Segments (Timing + Groessen-Konformitaet)
///
/// Geordnet: `Excellent > Good > Fair`. Die Zuordnung erfolgt im Relay
/// aus Latenz- und Groessenheuristiken mit monotonen Schwellwerten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Excellent,
    Good,
    Fair,
}

impl QualityTier {
    /// Numerischer Rang fuer Vergleiche (hoeher = besser)
    pub fn rang(&self) -> u8 {
        match self {
            Self::Excellent => 2,
            Self::Good => 1,
            Self::Fair => 0,
        }
    }
}

/// Grund fuer das Ende einer Sprechphase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerEndReason {
    /// Sprecher hat selbst beendet
    Voluntary,
    /// Redezeit-Limit abgelaufen
    Timeout,
    /// Von einem Admin beendet
    Admin,
    /// Verbindung des Sprechers wurde getrennt
    Disconnected,
}

// ---------------------------------------------------------------------------
// Beitritt
// ---------------------------------------------------------------------------

/// Beitritts-Anfrage vom Client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Anzeigename (mindestens 2 Zeichen nach Trim)
    pub display_name: String,
    /// Geraete-Kennung des Clients
    pub device_id: Option<String>,
    /// Freiform-Capabilities (Codec-Unterstuetzung etc.)
    pub capabilities: Option<serde_json::Value>,
}

/// Eintrag im Roster-Snapshot (Teilnehmer-Sicht)
///
/// Enthaelt bewusst nur die Positionsnummer, keine Wartezeitstempel
/// anderer Teilnehmer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterEintrag {
    pub user_id: VerbindungsId,
    pub display_name: String,
    pub role: Rolle,
    pub phase: Phase,
    /// 1-basierte Position in der Rednerliste (nur wenn `phase == Queued`)
    pub queue_position: Option<u32>,
}

/// Informationen ueber den aktiven Sprecher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprecherInfo {
    pub user_id: VerbindungsId,
    pub display_name: String,
    /// Beginn der Sprechphase (Unix-Millisekunden)
    pub started_at_ms: u64,
}

/// Erfolgreiche Beitritts-Antwort
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinedResponse {
    /// Zugewiesene Verbindungs-ID
    pub user_id: VerbindungsId,
    /// Wurde die Verbindung (per Bootstrap-Regel) zum Admin befoerdert?
    pub is_admin: bool,
    /// Aktueller Roster-Snapshot
    pub roster: Vec<RosterEintrag>,
    /// Laenge der Rednerliste
    pub queue_length: u32,
    /// Aktiver Sprecher, falls vorhanden
    pub active_speaker: Option<SprecherInfo>,
}

// ---------------------------------------------------------------------------
// Rednerliste
// ---------------------------------------------------------------------------

/// Positions-Benachrichtigung an einen wartenden Teilnehmer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedNotice {
    /// 1-basierte Position
    pub position: u32,
    pub total_in_queue: u32,
}

/// Detail-Eintrag der Rednerliste (nur fuer Admins)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueDetail {
    pub user_id: VerbindungsId,
    pub display_name: String,
    pub position: u32,
    /// Wartezeit seit der Wortmeldung in Sekunden
    pub wait_secs: u64,
}

/// Rednerlisten-Update an Admins
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueUpdatedNotice {
    pub entries: Vec<QueueDetail>,
    pub total_in_queue: u32,
}

/// Ablehnung einer Wortmeldung
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedNotice {
    /// Anzeigename des ablehnenden Admins
    pub rejected_by: Option<String>,
    pub timestamp_ms: u64,
}

// ---------------------------------------------------------------------------
// Sprechphase
// ---------------------------------------------------------------------------

/// Kumulierte Statistik einer Sprechphase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Anzahl verarbeiteter Segmente
    pub segments: u64,
    /// Kumulierte Payload-Bytes
    pub total_bytes: u64,
    /// Gleitender Latenz-Mittelwert (exponentiell geglaettet) in ms
    pub average_latency_ms: f64,
    /// Dauer der Sprechphase in Millisekunden
    pub duration_ms: u64,
    /// Zuletzt zugewiesene Qualitaetsstufe
    pub last_quality: QualityTier,
}

/// Beginn der Sprechphase (an den freigegebenen Teilnehmer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakingStartNotice {
    pub started_at_ms: u64,
    /// Maximale Redezeit in Sekunden
    pub max_duration_secs: u64,
}

/// Ende der Sprechphase (an den ehemaligen Sprecher)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakingEndNotice {
    pub reason: SpeakerEndReason,
    pub stats: Option<SessionStats>,
    pub timestamp_ms: u64,
}

/// Broadcast: ein Sprecher hat begonnen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerStartedNotice {
    pub user_id: VerbindungsId,
    pub display_name: String,
    pub timestamp_ms: u64,
}

/// Broadcast: ein Sprecher hat geendet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakerEndedNotice {
    pub user_id: VerbindungsId,
    pub display_name: String,
    pub reason: SpeakerEndReason,
    pub stats: Option<SessionStats>,
    pub timestamp_ms: u64,
}

// ---------------------------------------------------------------------------
// Audio-Segmente
// ---------------------------------------------------------------------------

/// Ein Audio-Segment vom aktiven Sprecher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSegmentData {
    /// Monoton steigende Sequenznummer pro Sprechphase (Luecken toleriert)
    pub sequence_no: u64,
    /// Base64-kodierte Audio-Payload (opak, wird nicht dekodiert)
    pub payload: String,
    /// Deklariertes Encoding (z.B. "aac", "m4a", "3gp")
    pub encoding: String,
    /// Payload-Groesse in Bytes (deklariert vom Client)
    pub size_bytes: u64,
    /// Aufnahmezeitpunkt beim Sender (Unix-Millisekunden)
    pub capture_timestamp_ms: u64,
}

impl AudioSegmentData {
    /// Dekodiert die Base64-Payload in Roh-Bytes
    pub fn payload_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(&self.payload)
    }

    /// Kodiert Roh-Bytes als Base64-Payload
    pub fn payload_aus_bytes(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }
}

/// Legacy-Chunk-Format aelterer Clients
///
/// Wird am Dispatcher in das Segment-Format normalisiert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioChunkData {
    pub chunk_number: u64,
    pub payload: String,
    pub encoding: String,
    pub size_bytes: u64,
    /// Aufnahmezeitpunkt (altes Feld, entspricht `capture_timestamp_ms`)
    pub timestamp_ms: u64,
}

impl From<AudioChunkData> for AudioSegmentData {
    fn from(chunk: AudioChunkData) -> Self {
        Self {
            sequence_no: chunk.chunk_number,
            payload: chunk.payload,
            encoding: chunk.encoding,
            size_bytes: chunk.size_bytes,
            capture_timestamp_ms: chunk.timestamp_ms,
        }
    }
}

/// Bestaetigung eines verarbeiteten Segments an den Sender
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentAck {
    pub sequence_no: u64,
    /// Gemessene Latenz (Serverempfang - Aufnahme), negativ auf 0 geklemmt
    pub latency_ms: u64,
    pub quality: QualityTier,
    pub server_timestamp_ms: u64,
}

/// Weitergeleitetes Segment an alle anderen Verbindungen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentReceived {
    pub sender_id: VerbindungsId,
    pub sender_name: String,
    pub sequence_no: u64,
    pub payload: String,
    pub encoding: String,
    pub size_bytes: u64,
    pub quality: QualityTier,
    pub server_timestamp_ms: u64,
}

// ---------------------------------------------------------------------------
// Streaming-Klammern
// ---------------------------------------------------------------------------

/// Beginn einer Streaming-Session (Metadaten)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingStartRequest {
    pub format: String,
    pub sample_rate: Option<u32>,
    pub bit_rate: Option<u32>,
}

/// Ende einer Streaming-Session (Summen vom Client)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingEndRequest {
    pub total_segments: u64,
    pub duration_ms: u64,
}

/// Broadcast: Streaming hat begonnen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingStartedNotice {
    pub user_id: VerbindungsId,
    pub display_name: String,
    pub format: String,
    pub sample_rate: Option<u32>,
    pub bit_rate: Option<u32>,
    pub timestamp_ms: u64,
}

/// Broadcast: Streaming hat geendet
///
/// Bei Disconnect oder Timeout wird das Ende serverseitig synthetisiert
/// und traegt dann einen `reason`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingEndedNotice {
    pub user_id: VerbindungsId,
    pub display_name: String,
    pub reason: Option<SpeakerEndReason>,
    pub stats: Option<SessionStats>,
    pub timestamp_ms: u64,
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

/// Admin-Authentifizierung per Shared Secret
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticateRequest {
    pub credential: String,
}

// ---------------------------------------------------------------------------
// Status / Aggregat
// ---------------------------------------------------------------------------

/// Aggregierte Konferenz-Kennzahlen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateStats {
    pub connections: u32,
    pub admins: u32,
    pub queue_length: u32,
    pub active_speaker: Option<String>,
    pub speaker_elapsed_secs: Option<u64>,
    pub segments_processed: u64,
}

/// Aktiver Sprecher mit Detailstatistik (nur fuer Admins)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveSpeakerDetail {
    pub user_id: VerbindungsId,
    pub display_name: String,
    pub elapsed_secs: u64,
    pub stats: SessionStats,
}

/// Vollstaendiges Zustands-Update an Admins
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateUpdateNotice {
    pub roster: Vec<RosterEintrag>,
    pub queue: Vec<QueueDetail>,
    pub active_speaker: Option<ActiveSpeakerDetail>,
    pub aggregate: AggregateStats,
}

/// Roster-Update an alle Teilnehmer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterUpdatedNotice {
    pub roster: Vec<RosterEintrag>,
}

// ---------------------------------------------------------------------------
// Keepalive
// ---------------------------------------------------------------------------

/// Ping (Client -> Server oder Server -> Client)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingMessage {
    /// Unix-Timestamp in Millisekunden fuer RTT-Messung
    pub timestamp_ms: u64,
}

/// Pong-Antwort (spiegelt Timestamp zurueck)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PongMessage {
    /// Originaler Timestamp aus dem Ping
    pub echo_timestamp_ms: u64,
    /// Server-eigener Timestamp
    pub server_timestamp_ms: u64,
}

// ---------------------------------------------------------------------------
// Haupt-Enum: ControlPayload
// ---------------------------------------------------------------------------

/// Alle moeglichen Konferenz-Nachrichten (typsicher via Tagged Enum)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlPayload {
    // Client -> Server
    Join(JoinRequest),
    Leave,
    RequestToSpeak,
    WithdrawRequest,
    EndSpeaking,
    AudioSegment(AudioSegmentData),
    AudioChunk(AudioChunkData),
    StreamingStart(StreamingStartRequest),
    StreamingEnd(StreamingEndRequest),
    Authenticate(AuthenticateRequest),
    Approve { user_id: VerbindungsId },
    Reject { user_id: VerbindungsId },
    ForceEnd,
    StatsRequest,

    // Server -> Client
    Joined(JoinedResponse),
    AdminPromoted,
    Queued(QueuedNotice),
    RequestRejected(RejectedNotice),
    SpeakingStart(SpeakingStartNotice),
    SpeakingEnd(SpeakingEndNotice),
    SegmentAck(SegmentAck),
    SegmentReceived(SegmentReceived),
    SpeakerStarted(SpeakerStartedNotice),
    SpeakerEnded(SpeakerEndedNotice),
    StreamingStarted(StreamingStartedNotice),
    StreamingEnded(StreamingEndedNotice),
    RosterUpdated(RosterUpdatedNotice),
    QueueUpdated(QueueUpdatedNotice),
    StateUpdate(StateUpdateNotice),
    StatsResponse(AggregateStats),

    // Keepalive
    Ping(PingMessage),
    Pong(PongMessage),

    // Error
    Error(ErrorResponse),
}

/// Standardisierte Fehler-Antwort
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Control-Frame (Umschlag fuer alle Nachrichten)
// ---------------------------------------------------------------------------

/// Control-Protokoll-Nachricht mit Request/Response-Zuordnung
///
/// Jede Client-Nachricht traegt eine `request_id` die der Client vergibt.
/// Der Server kopiert die ID in die Antwort damit der Client Request und
/// Response zuordnen kann. Server-initiierte Ereignisse tragen die ID 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlMessage {
    /// Eindeutige Nachrichten-ID fuer Request/Response-Zuordnung
    pub request_id: u32,
    /// Inhalt der Nachricht
    pub payload: ControlPayload,
}

impl ControlMessage {
    /// Erstellt eine neue Control-Nachricht
    pub fn new(request_id: u32, payload: ControlPayload) -> Self {
        Self {
            request_id,
            payload,
        }
    }

    /// Erstellt ein server-initiiertes Ereignis (request_id 0)
    pub fn ereignis(payload: ControlPayload) -> Self {
        Self::new(0, payload)
    }

    /// Erstellt eine Ping-Nachricht
    pub fn ping(request_id: u32, timestamp_ms: u64) -> Self {
        Self::new(
            request_id,
            ControlPayload::Ping(PingMessage { timestamp_ms }),
        )
    }

    /// Erstellt eine Pong-Antwort
    pub fn pong(request_id: u32, echo_timestamp_ms: u64, server_timestamp_ms: u64) -> Self {
        Self::new(
            request_id,
            ControlPayload::Pong(PongMessage {
                echo_timestamp_ms,
                server_timestamp_ms,
            }),
        )
    }

    /// Erstellt eine Fehler-Antwort
    pub fn error(request_id: u32, code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(
            request_id,
            ControlPayload::Error(ErrorResponse {
                code,
                message: message.into(),
            }),
        )
    }

    /// Serialisiert die Nachricht als JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Deserialisiert eine Nachricht aus JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualitaet_rangordnung() {
        assert!(QualityTier::Excellent.rang() > QualityTier::Good.rang());
        assert!(QualityTier::Good.rang() > QualityTier::Fair.rang());
    }

    #[test]
    fn qualitaet_serde_werte() {
        assert_eq!(
            serde_json::to_string(&QualityTier::Excellent).unwrap(),
            "\"excellent\""
        );
        assert_eq!(serde_json::to_string(&QualityTier::Fair).unwrap(), "\"fair\"");
    }

    #[test]
    fn ende_grund_disconnected_serde() {
        assert_eq!(
            serde_json::to_string(&SpeakerEndReason::Disconnected).unwrap(),
            "\"disconnected\""
        );
    }

    #[test]
    fn payload_tagged_format() {
        let msg = ControlMessage::new(
            7,
            ControlPayload::Join(JoinRequest {
                display_name: "Anna".into(),
                device_id: Some("pixel-8".into()),
                capabilities: None,
            }),
        );
        let json = msg.to_json().unwrap();
        assert!(json.contains("\"type\":\"join\""));
        assert!(json.contains("\"request_id\":7"));

        let zurueck = ControlMessage::from_json(&json).unwrap();
        assert_eq!(zurueck.request_id, 7);
        assert!(matches!(zurueck.payload, ControlPayload::Join(_)));
    }

    #[test]
    fn segment_payload_base64_round_trip() {
        let bytes = vec![0u8, 1, 2, 250, 255];
        let segment = AudioSegmentData {
            sequence_no: 1,
            payload: AudioSegmentData::payload_aus_bytes(&bytes),
            encoding: "aac".into(),
            size_bytes: bytes.len() as u64,
            capture_timestamp_ms: 1234,
        };
        assert_eq!(segment.payload_bytes().unwrap(), bytes);
    }

    #[test]
    fn chunk_normalisierung() {
        let chunk = AudioChunkData {
            chunk_number: 12,
            payload: "AAAA".into(),
            encoding: "m4a".into(),
            size_bytes: 3,
            timestamp_ms: 999,
        };
        let segment: AudioSegmentData = chunk.into();
        assert_eq!(segment.sequence_no, 12);
        assert_eq!(segment.capture_timestamp_ms, 999);
    }

    #[test]
    fn error_ctor() {
        let msg = ControlMessage::error(3, ErrorCode::Unauthorized, "kein Admin");
        if let ControlPayload::Error(e) = &msg.payload {
            assert_eq!(e.code, ErrorCode::Unauthorized);
        } else {
            panic!("Erwartet Error-Payload");
        }
        let json = msg.to_json().unwrap();
        assert!(json.contains("UNAUTHORIZED"));
    }

    #[test]
    fn ereignis_hat_request_id_null() {
        let msg = ControlMessage::ereignis(ControlPayload::AdminPromoted);
        assert_eq!(msg.request_id, 0);
    }
}
