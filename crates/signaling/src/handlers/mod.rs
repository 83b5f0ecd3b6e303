//! Handler fuer alle Control-Nachrichten
//!
//! Jeder Handler ist fuer eine Gruppe von Nachrichtentypen zustaendig
//! und hat Zugriff auf den gemeinsamen SignalingState.

pub mod admin_handler;
pub mod audio_handler;
pub mod beitritt_handler;
pub mod warteschlange_handler;
