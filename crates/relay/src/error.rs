//! Fehlertypen fuer das Audio-Relay

use thiserror::Error;

/// Fehlertyp der Relay-Schicht
///
/// Relay-Fehler verwerfen nie ein Segment: die Pipeline faellt auf die
/// Original-Payload zurueck und leitet weiter.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Transkodierung fehlgeschlagen (Codec-Fehler, unbekanntes Format)
    #[error("Transkodierung fehlgeschlagen: {0}")]
    Transkodierung(String),

    /// Payload nicht dekodierbar (ungueltiges Base64)
    #[error("Payload nicht dekodierbar: {0}")]
    Payload(String),
}

/// Result-Typ der Relay-Schicht
pub type RelayResult<T> = Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_formatierung() {
        let e = RelayError::Transkodierung("Codec nicht verfuegbar".into());
        assert_eq!(
            e.to_string(),
            "Transkodierung fehlgeschlagen: Codec nicht verfuegbar"
        );
        let e = RelayError::Payload("ungueltiges Zeichen".into());
        assert!(e.to_string().starts_with("Payload nicht dekodierbar"));
    }
}
