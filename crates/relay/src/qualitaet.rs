//! Qualitaets-Heuristik fuer Audio-Segmente
//!
//! Die Stufe ergibt sich aus zwei Signalen: dem Verhaeltnis der
//! Segment-Groesse zur erwarteten Groesse und dem geglaetteten
//! Latenz-Mittelwert. Die Schwellwerte sind monoton: bessere Werte
//! ergeben nie eine schlechtere Stufe.

use podium_protocol::control::QualityTier;
use serde::Deserialize;

/// Schwellwerte der Qualitaets-Heuristik
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QualitaetsHeuristik {
    /// Erwartete Payload-Groesse eines Segments in Bytes
    pub erwartete_segment_bytes: u64,
    /// Latenz-Obergrenze fuer `Excellent` (geglaetteter Mittelwert, ms)
    pub latenz_exzellent_ms: f64,
    /// Latenz-Obergrenze fuer `Good` (geglaetteter Mittelwert, ms)
    pub latenz_gut_ms: f64,
    /// Untere Grenze des Groessen-Verhaeltnisses fuer `Excellent`
    pub groesse_exzellent_min: f64,
    /// Obere Grenze des Groessen-Verhaeltnisses fuer `Excellent`
    pub groesse_exzellent_max: f64,
    /// Untere Grenze des Groessen-Verhaeltnisses fuer `Good`
    pub groesse_gut_min: f64,
}

impl Default for QualitaetsHeuristik {
    fn default() -> Self {
        Self {
            erwartete_segment_bytes: 8000,
            latenz_exzellent_ms: 200.0,
            latenz_gut_ms: 400.0,
            groesse_exzellent_min: 0.8,
            groesse_exzellent_max: 1.2,
            groesse_gut_min: 0.6,
        }
    }
}

impl QualitaetsHeuristik {
    /// Leitet die Qualitaetsstufe aus Segment-Groesse und geglaettetem
    /// Latenz-Mittelwert ab
    pub fn stufe(&self, groesse_bytes: u64, mittlere_latenz_ms: f64) -> QualityTier {
        let verhaeltnis = groesse_bytes as f64 / self.erwartete_segment_bytes as f64;

        if verhaeltnis > self.groesse_exzellent_min
            && verhaeltnis < self.groesse_exzellent_max
            && mittlere_latenz_ms < self.latenz_exzellent_ms
        {
            QualityTier::Excellent
        } else if verhaeltnis > self.groesse_gut_min && mittlere_latenz_ms < self.latenz_gut_ms {
            QualityTier::Good
        } else {
            QualityTier::Fair
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nominale_segmente_sind_exzellent() {
        let h = QualitaetsHeuristik::default();
        assert_eq!(h.stufe(8000, 50.0), QualityTier::Excellent);
        assert_eq!(h.stufe(7000, 199.0), QualityTier::Excellent);
    }

    #[test]
    fn erhoehte_latenz_stuft_ab() {
        let h = QualitaetsHeuristik::default();
        assert_eq!(h.stufe(8000, 250.0), QualityTier::Good);
        assert_eq!(h.stufe(8000, 450.0), QualityTier::Fair);
    }

    #[test]
    fn abweichende_groesse_stuft_ab() {
        let h = QualitaetsHeuristik::default();
        // Verhaeltnis 0.5: unter der Good-Grenze
        assert_eq!(h.stufe(4000, 50.0), QualityTier::Fair);
        // Verhaeltnis 0.7: Good trotz niedriger Latenz
        assert_eq!(h.stufe(5600, 50.0), QualityTier::Good);
        // Verhaeltnis 1.5: zu gross fuer Excellent
        assert_eq!(h.stufe(12_000, 50.0), QualityTier::Good);
    }

    #[test]
    fn stufen_aus_geglaetteter_latenzfolge() {
        // Mittelwerte 50 -> 140 -> 130 bei nominaler Groesse
        let h = QualitaetsHeuristik::default();
        assert_eq!(h.stufe(8000, 50.0), QualityTier::Excellent);
        assert_eq!(h.stufe(8000, 140.0), QualityTier::Excellent);
        assert_eq!(h.stufe(8000, 130.0), QualityTier::Excellent);
    }

    #[test]
    fn monotonie_bessere_werte_nie_schlechtere_stufe() {
        let h = QualitaetsHeuristik::default();
        let latenzfolge = [500.0, 400.0, 300.0, 200.0, 100.0, 50.0];
        let mut letzter_rang = 0u8;
        for latenz in latenzfolge {
            let rang = h.stufe(8000, latenz).rang();
            assert!(rang >= letzter_rang);
            letzter_rang = rang;
        }
    }
}
