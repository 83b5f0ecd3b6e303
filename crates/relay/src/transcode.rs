//! Transkodier-Schnittstelle
//!
//! Das Relay behandelt Audio-Payloads opak, bietet aber eine
//! Schnittstelle fuer Format-Anpassung vor dem Fan-out. Schlaegt die
//! Transkodierung fehl, wird immer die Original-Payload weitergeleitet;
//! ein Transkodier-Fehler verwirft nie ein Segment.

use tracing::warn;

use crate::error::RelayResult;

/// Formate die ohne Transkodierung durchgereicht werden
pub const DURCHREICH_FORMATE: &[&str] = &["aac", "m4a", "mp4", "opus"];

/// Ergebnis einer Transkodierung
#[derive(Debug, Clone)]
pub struct Transkodiert {
    pub payload: Vec<u8>,
    pub encoding: String,
}

/// Schnittstelle fuer Audio-Transkodierung
pub trait Transkodierer: Send + Sync + 'static {
    /// Zielformat des Transkodierers (z.B. "m4a")
    fn zielformat(&self) -> &str;

    /// Muss ein Segment dieses Encodings transkodiert werden?
    fn erforderlich(&self, encoding: &str) -> bool {
        !DURCHREICH_FORMATE
            .iter()
            .any(|f| f.eq_ignore_ascii_case(encoding))
    }

    /// Transkodiert eine Payload ins Zielformat
    ///
    /// `Err` bedeutet: Original-Payload unveraendert weiterleiten.
    fn transkodieren(&self, payload: &[u8], encoding: &str) -> RelayResult<Transkodiert>;
}

/// Identitaets-Transkodierer: reicht jede Payload unveraendert durch
///
/// Platzhalter bis ein echter Codec angebunden ist; dokumentiert die
/// Fallback-Semantik der Schnittstelle.
#[derive(Debug, Default)]
pub struct KeinTranskodierer;

impl Transkodierer for KeinTranskodierer {
    fn zielformat(&self) -> &str {
        "m4a"
    }

    fn erforderlich(&self, _encoding: &str) -> bool {
        false
    }

    fn transkodieren(&self, payload: &[u8], encoding: &str) -> RelayResult<Transkodiert> {
        Ok(Transkodiert {
            payload: payload.to_vec(),
            encoding: encoding.to_string(),
        })
    }
}

/// Wendet den Transkodierer auf eine Payload an, mit Fallback
///
/// Gibt bei Erfolg die transkodierte Payload zurueck, sonst die
/// Original-Payload mit dem Original-Encoding.
pub fn anwenden(
    transkodierer: &dyn Transkodierer,
    payload: Vec<u8>,
    encoding: &str,
) -> (Vec<u8>, String) {
    if !transkodierer.erforderlich(encoding) {
        return (payload, encoding.to_string());
    }
    match transkodierer.transkodieren(&payload, encoding) {
        Ok(t) => (t.payload, t.encoding),
        Err(fehler) => {
            warn!(
                encoding,
                %fehler,
                "Transkodierung fehlgeschlagen, Original-Payload wird weitergeleitet"
            );
            (payload, encoding.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RelayError;

    /// Transkodierer der immer fehlschlaegt
    struct Kaputt;

    impl Transkodierer for Kaputt {
        fn zielformat(&self) -> &str {
            "m4a"
        }
        fn transkodieren(&self, _: &[u8], _: &str) -> RelayResult<Transkodiert> {
            Err(RelayError::Transkodierung("Codec nicht verfuegbar".into()))
        }
    }

    #[test]
    fn durchreich_formate_werden_nicht_transkodiert() {
        let t = Kaputt;
        assert!(!t.erforderlich("aac"));
        assert!(!t.erforderlich("AAC"));
        assert!(!t.erforderlich("opus"));
        assert!(t.erforderlich("3gp"));
    }

    #[test]
    fn fehlschlag_faellt_auf_original_zurueck() {
        let payload = vec![1u8, 2, 3];
        let (ergebnis, encoding) = anwenden(&Kaputt, payload.clone(), "3gp");
        assert_eq!(ergebnis, payload);
        assert_eq!(encoding, "3gp");
    }

    #[test]
    fn identitaets_transkodierer_reicht_durch() {
        let payload = vec![9u8; 16];
        let (ergebnis, encoding) = anwenden(&KeinTranskodierer, payload.clone(), "3gp");
        assert_eq!(ergebnis, payload);
        assert_eq!(encoding, "3gp");
    }
}
