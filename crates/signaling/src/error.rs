//! Fehlertypen fuer den Signaling-Layer
//!
//! Auf dem Verbindungspfad heisst `Ok(())` sauber getrennt (Leave,
//! Client-Close, Shutdown); `Err` heisst abnormal beendet.

use thiserror::Error;

/// Fehlertyp fuer den Signaling-Layer
#[derive(Debug, Error)]
pub enum SignalingError {
    /// IO-Fehler (TCP, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Protokollfehler (ungueltiges oder zu grosses Frame)
    #[error("Protokollfehler: {0}")]
    Protokoll(String),

    /// Keepalive-Timeout, laenger nichts vom Client empfangen
    #[error("Verbindungs-Timeout nach {0}s")]
    Timeout(u64),
}

impl SignalingError {
    /// Erstellt einen Protokollfehler
    pub fn protokoll(msg: impl Into<String>) -> Self {
        Self::Protokoll(msg.into())
    }
}

/// Result-Typ fuer den Signaling-Layer
pub type SignalingResult<T> = Result<T, SignalingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_fehler_wird_konvertiert() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let fehler: SignalingError = io.into();
        assert!(matches!(fehler, SignalingError::Io(_)));
        assert!(fehler.to_string().starts_with("IO-Fehler"));
    }

    #[test]
    fn timeout_nennt_die_dauer() {
        let fehler = SignalingError::Timeout(90);
        assert_eq!(fehler.to_string(), "Verbindungs-Timeout nach 90s");
    }
}
