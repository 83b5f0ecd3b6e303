//! podium-protocol – Nachrichten- und Wire-Format fuer Podium
//!
//! Definiert alle Ereignisse die zwischen Client und Server ueber die
//! persistente TCP-Verbindung ausgetauscht werden, sowie das Frame-Format
//! (Laengenpraefix + JSON).

pub mod control;
pub mod wire;

pub use control::{ControlMessage, ControlPayload, ErrorCode, QualityTier};
pub use wire::FrameCodec;
