//! Fehlertypen fuer den Konferenz-Kern

use podium_core::types::VerbindungsId;
use podium_protocol::control::ErrorCode;
use thiserror::Error;

/// Fehlertyp fuer den Konferenz-Kern
///
/// Alle Varianten sind auf die ausloesende Operation begrenzt und
/// veraendern keinen Zustand.
#[derive(Debug, Error)]
pub enum KonferenzError {
    /// Anzeigename leer oder kuerzer als 2 Zeichen
    #[error("Ungueltiger Anzeigename: {0:?}")]
    UngueltigerName(String),

    /// Privilegierte Operation ohne Admin-Mitgliedschaft
    #[error("Nicht autorisiert: {0}")]
    NichtAutorisiert(String),

    /// Verbindung steht bereits in der Rednerliste
    #[error("Bereits in der Rednerliste")]
    BereitsEingereiht,

    /// Verbindung ist bereits aktiver Sprecher
    #[error("Bereits aktiver Sprecher")]
    SprichtBereits,

    /// Rednerliste hat ihre Kapazitaet erreicht
    #[error("Rednerliste voll (Kapazitaet {0})")]
    ListeVoll(usize),

    /// Verbindung steht nicht in der Rednerliste
    #[error("Nicht in der Rednerliste")]
    NichtEingereiht,

    /// Verbindung ist nicht (mehr) registriert – gutartig bei Races
    /// mit einem Disconnect
    #[error("Verbindung nicht gefunden: {0}")]
    NichtGefunden(VerbindungsId),
}

impl KonferenzError {
    /// Bildet den Fehler auf den Wire-Fehlercode ab
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::UngueltigerName(_) => ErrorCode::InvalidName,
            Self::NichtAutorisiert(_) => ErrorCode::Unauthorized,
            Self::BereitsEingereiht => ErrorCode::AlreadyQueued,
            Self::SprichtBereits => ErrorCode::AlreadySpeaking,
            Self::ListeVoll(_) => ErrorCode::QueueFull,
            Self::NichtEingereiht => ErrorCode::NotQueued,
            Self::NichtGefunden(_) => ErrorCode::NotFound,
        }
    }

    /// Gutartige Fehler werden beim Aufrufer als No-Op behandelt
    pub fn ist_gutartig(&self) -> bool {
        matches!(self, Self::NichtGefunden(_))
    }
}

/// Result-Typ fuer den Konferenz-Kern
pub type KonferenzResult<T> = Result<T, KonferenzError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehlercode_abbildung() {
        assert_eq!(
            KonferenzError::BereitsEingereiht.error_code(),
            ErrorCode::AlreadyQueued
        );
        assert_eq!(
            KonferenzError::ListeVoll(50).error_code(),
            ErrorCode::QueueFull
        );
        assert_eq!(
            KonferenzError::NichtAutorisiert("x".into()).error_code(),
            ErrorCode::Unauthorized
        );
    }

    #[test]
    fn nicht_gefunden_ist_gutartig() {
        let e = KonferenzError::NichtGefunden(VerbindungsId::new());
        assert!(e.ist_gutartig());
        assert!(!KonferenzError::SprichtBereits.ist_gutartig());
    }
}
