//! podium-signaling – TCP Control Layer
//!
//! Dieser Crate implementiert die Verbindungs-Schicht von Podium:
//! TCP-Listener, ein Task pro Verbindung, Frame-Codec, Dispatching der
//! Control-Nachrichten an die Handler und das Event-Broadcasting.
//!
//! ## Architektur
//!
//! ```text
//! TCP Listener (SignalingServer)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task)
//!     |  Lebenszyklus: Verbunden -> Beigetreten -> Getrennt
//!     |
//!     v
//! MessageDispatcher
//!     |
//!     +-- beitritt_handler      (Join, Leave)
//!     +-- warteschlange_handler (RequestToSpeak, Withdraw, EndSpeaking)
//!     +-- admin_handler         (Authenticate, Approve, Reject, ForceEnd, Stats)
//!     +-- audio_handler         (AudioSegment, AudioChunk, Streaming)
//!
//! EventBroadcaster – Send-Queues aller Clients, implementiert die
//! EreignisSenke des Konferenz-Kerns
//! ```

pub mod broadcast;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod server_state;
pub mod tcp;

// Bequeme Re-Exporte
pub use broadcast::EventBroadcaster;
pub use connection::ClientConnection;
pub use dispatcher::MessageDispatcher;
pub use error::{SignalingError, SignalingResult};
pub use server_state::{SignalingConfig, SignalingState};
pub use tcp::SignalingServer;
