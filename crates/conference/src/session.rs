//! Sprecher-Session – aktiver Sprecher-Slot mit Audio-Statistik
//!
//! Pro Sprechphase existiert genau eine `AktiverSprecher`-Instanz. Die
//! Statistik glaettet die Segment-Latenz exponentiell: neue Messwerte
//! gehen mit einem konfigurierbaren Gewicht ein, der erste Messwert
//! initialisiert den Mittelwert direkt.

use podium_core::types::{unix_zeit_ms, VerbindungsId};
use podium_protocol::control::{QualityTier, SessionStats, SprecherInfo};
use std::time::Instant;
use tokio::task::JoinHandle;

// ---------------------------------------------------------------------------
// AudioStatistik
// ---------------------------------------------------------------------------

/// Kumulierte Audio-Statistik einer Sprechphase
#[derive(Debug, Clone)]
pub struct AudioStatistik {
    /// Anzahl verbuchter Segmente
    pub segmente: u64,
    /// Kumulierte Payload-Bytes
    pub bytes: u64,
    /// Exponentiell geglaetteter Latenz-Mittelwert in ms
    pub mittlere_latenz_ms: f64,
    /// Zuletzt zugewiesene Qualitaetsstufe
    pub letzte_stufe: QualityTier,
    /// Empfangszeitpunkt des letzten Segments
    pub letztes_segment: Option<Instant>,
}

impl AudioStatistik {
    /// Erstellt eine leere Statistik
    pub fn neu() -> Self {
        Self {
            segmente: 0,
            bytes: 0,
            mittlere_latenz_ms: 0.0,
            letzte_stufe: QualityTier::Good,
            letztes_segment: None,
        }
    }

    /// Verbucht ein Segment und aktualisiert den geglaetteten Mittelwert
    ///
    /// `glaettung` ist das Gewicht des neuen Messwerts (0..1). Der erste
    /// Messwert setzt den Mittelwert direkt, ohne Glaettung.
    pub fn segment_verbuchen(&mut self, groesse: u64, latenz_ms: u64, glaettung: f64) {
        self.segmente += 1;
        self.bytes += groesse;
        let messwert = latenz_ms as f64;
        self.mittlere_latenz_ms = if self.mittlere_latenz_ms == 0.0 {
            messwert
        } else {
            self.mittlere_latenz_ms * (1.0 - glaettung) + messwert * glaettung
        };
        self.letztes_segment = Some(Instant::now());
    }

    /// Merkt sich die zuletzt zugewiesene Qualitaetsstufe
    pub fn stufe_vermerken(&mut self, stufe: QualityTier) {
        self.letzte_stufe = stufe;
    }
}

impl Default for AudioStatistik {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// StreamingSession
// ---------------------------------------------------------------------------

/// Offene Streaming-Klammer innerhalb einer Sprechphase
#[derive(Debug, Clone)]
pub struct StreamingSession {
    pub format: String,
    pub sample_rate: Option<u32>,
    pub bit_rate: Option<u32>,
    pub begonnen: Instant,
}

// ---------------------------------------------------------------------------
// AktiverSprecher
// ---------------------------------------------------------------------------

/// Der eine aktive Sprecher-Slot
///
/// `generation` schuetzt gegen verspaetete Timeout-Timer: jeder neue
/// Sprecher erhaelt eine hoehere Generation, der Timer feuert nur wenn
/// seine Generation noch die aktuelle ist.
#[derive(Debug)]
pub struct AktiverSprecher {
    pub id: VerbindungsId,
    pub anzeigename: String,
    /// Beginn der Sprechphase (monoton, fuer Dauer-Berechnung)
    pub begonnen: Instant,
    /// Beginn der Sprechphase (Unix-ms, fuer Wire-Zeitstempel)
    pub begonnen_ms: u64,
    pub statistik: AudioStatistik,
    /// Offene Streaming-Klammer, falls der Client eine eroeffnet hat
    pub streaming: Option<StreamingSession>,
    /// Generation dieses Sprechers (monoton steigend)
    pub generation: u64,
    /// Laufender Redezeit-Timer
    pub timeout_task: Option<JoinHandle<()>>,
}

impl AktiverSprecher {
    /// Erstellt einen frischen Sprecher-Slot
    pub fn neu(id: VerbindungsId, anzeigename: String, generation: u64) -> Self {
        Self {
            id,
            anzeigename,
            begonnen: Instant::now(),
            begonnen_ms: unix_zeit_ms(),
            statistik: AudioStatistik::neu(),
            streaming: None,
            generation,
            timeout_task: None,
        }
    }

    /// Bisherige Dauer der Sprechphase in Millisekunden
    pub fn dauer_ms(&self) -> u64 {
        self.begonnen.elapsed().as_millis() as u64
    }

    /// Wire-Info ueber diesen Sprecher
    pub fn info(&self) -> SprecherInfo {
        SprecherInfo {
            user_id: self.id,
            display_name: self.anzeigename.clone(),
            started_at_ms: self.begonnen_ms,
        }
    }

    /// Abschluss-Statistik der Sprechphase
    pub fn session_stats(&self) -> SessionStats {
        SessionStats {
            segments: self.statistik.segmente,
            total_bytes: self.statistik.bytes,
            average_latency_ms: self.statistik.mittlere_latenz_ms,
            duration_ms: self.dauer_ms(),
            last_quality: self.statistik.letzte_stufe,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const GLAETTUNG: f64 = 0.2;

    #[test]
    fn erster_messwert_setzt_mittelwert_direkt() {
        let mut statistik = AudioStatistik::neu();
        statistik.segment_verbuchen(8000, 50, GLAETTUNG);
        assert_eq!(statistik.mittlere_latenz_ms, 50.0);
        assert_eq!(statistik.segmente, 1);
        assert_eq!(statistik.bytes, 8000);
    }

    #[test]
    fn glaettung_gewichtet_neue_messwerte() {
        let mut statistik = AudioStatistik::neu();
        statistik.segment_verbuchen(8000, 50, GLAETTUNG);
        statistik.segment_verbuchen(8000, 500, GLAETTUNG);
        // 50 * 0.8 + 500 * 0.2 = 140
        assert!((statistik.mittlere_latenz_ms - 140.0).abs() < 1e-9);
        statistik.segment_verbuchen(8000, 90, GLAETTUNG);
        // 140 * 0.8 + 90 * 0.2 = 130
        assert!((statistik.mittlere_latenz_ms - 130.0).abs() < 1e-9);
    }

    #[test]
    fn bytes_werden_kumuliert() {
        let mut statistik = AudioStatistik::neu();
        statistik.segment_verbuchen(4000, 10, GLAETTUNG);
        statistik.segment_verbuchen(6000, 10, GLAETTUNG);
        assert_eq!(statistik.bytes, 10_000);
        assert_eq!(statistik.segmente, 2);
    }

    #[test]
    fn session_stats_spiegeln_statistik() {
        let mut sprecher = AktiverSprecher::neu(VerbindungsId::new(), "Anna".into(), 1);
        sprecher.statistik.segment_verbuchen(8000, 100, GLAETTUNG);
        sprecher.statistik.stufe_vermerken(QualityTier::Excellent);

        let stats = sprecher.session_stats();
        assert_eq!(stats.segments, 1);
        assert_eq!(stats.total_bytes, 8000);
        assert_eq!(stats.average_latency_ms, 100.0);
        assert_eq!(stats.last_quality, QualityTier::Excellent);
    }
}
