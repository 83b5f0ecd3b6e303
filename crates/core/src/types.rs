//! Gemeinsame Identifikationstypen fuer Podium
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige Verbindungs-ID
///
/// Wird beim Accept einer TCP-Verbindung vergeben und lebt bis zum
/// Disconnect. Alle Konferenz-Datenstrukturen referenzieren Verbindungen
/// ausschliesslich ueber diese ID, nie ueber Objektreferenzen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerbindungsId(pub Uuid);

impl VerbindungsId {
    /// Erstellt eine neue zufaellige VerbindungsId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for VerbindungsId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for VerbindungsId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn:{}", self.0)
    }
}

/// Gibt die aktuelle Unix-Zeit in Millisekunden zurueck
///
/// Wird fuer Wire-Zeitstempel (Empfangszeit, Latenzberechnung) verwendet.
pub fn unix_zeit_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbindungs_ids_sind_eindeutig() {
        let a = VerbindungsId::new();
        let b = VerbindungsId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn anzeige_format() {
        let id = VerbindungsId::new();
        assert!(id.to_string().starts_with("conn:"));
    }

    #[test]
    fn serde_round_trip() {
        let id = VerbindungsId::new();
        let json = serde_json::to_string(&id).unwrap();
        let zurueck: VerbindungsId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, zurueck);
    }

    #[test]
    fn unix_zeit_liefert_plausiblen_wert() {
        // Nach 2020 (1577836800000 ms)
        assert!(unix_zeit_ms() > 1_577_836_800_000);
    }
}
