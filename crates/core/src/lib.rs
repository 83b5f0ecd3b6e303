//! podium-core – Gemeinsame Typen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Podium-Crates gemeinsam genutzt werden. Fehlertypen sind
//! Sache der jeweiligen Schicht (podium-conference, podium-signaling,
//! podium-relay).

pub mod types;

// Re-Export fuer bequemen Zugriff
pub use types::VerbindungsId;
