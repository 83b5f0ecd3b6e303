//! Segment-Pipeline – heisser Pfad des Relays
//!
//! Reihenfolge pro Segment: Latenz messen, beim Konferenz-Kern
//! verbuchen (atomar mit der Sprecher-Pruefung), Qualitaetsstufe
//! ableiten, Ack an den Sender, Fan-out an alle anderen.

use podium_conference::{EreignisSenke, Konferenz};
use podium_core::types::{unix_zeit_ms, VerbindungsId};
use podium_protocol::control::{
    AudioSegmentData, ControlMessage, ControlPayload, ErrorCode, SegmentAck, SegmentReceived,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::RelayError;
use crate::qualitaet::QualitaetsHeuristik;
use crate::transcode::{self, Transkodierer};

/// Konfiguration des Audio-Relays
#[derive(Debug, Clone)]
pub struct RelayKonfiguration {
    /// Schwellwerte der Qualitaets-Heuristik
    pub heuristik: QualitaetsHeuristik,
    /// Alle wieviel Segmente eine Kennzahlen-Zeile geloggt wird
    pub perf_log_intervall: u64,
}

impl Default for RelayKonfiguration {
    fn default() -> Self {
        Self {
            heuristik: QualitaetsHeuristik::default(),
            perf_log_intervall: 100,
        }
    }
}

/// Audio-Relay: verbucht, bestaetigt und verteilt Segmente
#[derive(Clone)]
pub struct AudioRelay {
    konferenz: Konferenz,
    senke: Arc<dyn EreignisSenke>,
    transkodierer: Arc<dyn Transkodierer>,
    config: RelayKonfiguration,
}

impl AudioRelay {
    pub fn neu(
        konferenz: Konferenz,
        senke: Arc<dyn EreignisSenke>,
        transkodierer: Arc<dyn Transkodierer>,
        config: RelayKonfiguration,
    ) -> Self {
        Self {
            konferenz,
            senke,
            transkodierer,
            config,
        }
    }

    /// Verarbeitet ein Segment des (mutmasslichen) aktiven Sprechers
    ///
    /// Segmente von Nicht-Sprechern werden verworfen und mit einem
    /// Fehler beantwortet; der Konferenz-Zustand bleibt unveraendert.
    /// Gibt `true` zurueck wenn das Segment verteilt wurde.
    pub fn segment_verarbeiten(
        &self,
        request_id: u32,
        sender: VerbindungsId,
        segment: AudioSegmentData,
    ) -> bool {
        let jetzt = unix_zeit_ms();
        // Negative Latenzen (Uhren-Drift des Clients) auf 0 klemmen
        let latenz_ms = jetzt.saturating_sub(segment.capture_timestamp_ms);

        let verbucht = match self
            .konferenz
            .segment_verbuchen(sender, segment.size_bytes, latenz_ms)
        {
            Some(v) => v,
            None => {
                debug!(
                    user_id = %sender,
                    sequence_no = segment.sequence_no,
                    "Segment verworfen: Verbindung ist nicht der aktive Sprecher"
                );
                self.senke.an_verbindung(
                    &sender,
                    ControlMessage::error(
                        request_id,
                        ErrorCode::Unauthorized,
                        "Audio nur als aktiver Sprecher",
                    ),
                );
                return false;
            }
        };

        let stufe = self
            .config
            .heuristik
            .stufe(segment.size_bytes, verbucht.mittlere_latenz_ms);
        self.konferenz.stufe_vermerken(sender, stufe);

        self.senke.an_verbindung(
            &sender,
            ControlMessage::new(
                request_id,
                ControlPayload::SegmentAck(SegmentAck {
                    sequence_no: segment.sequence_no,
                    latency_ms: latenz_ms,
                    quality: stufe,
                    server_timestamp_ms: jetzt,
                }),
            ),
        );

        let (payload, encoding) = self.payload_aufbereiten(&segment);
        let empfaenger = self.senke.an_alle_ausser(
            &sender,
            ControlMessage::ereignis(ControlPayload::SegmentReceived(SegmentReceived {
                sender_id: sender,
                sender_name: verbucht.anzeigename,
                sequence_no: segment.sequence_no,
                payload,
                encoding,
                size_bytes: segment.size_bytes,
                quality: stufe,
                server_timestamp_ms: jetzt,
            })),
        );

        if self.config.perf_log_intervall > 0
            && verbucht.segmente % self.config.perf_log_intervall == 0
        {
            info!(
                user_id = %sender,
                segmente = verbucht.segmente,
                bytes = verbucht.bytes,
                mittlere_latenz_ms = format!("{:.1}", verbucht.mittlere_latenz_ms),
                stufe = ?stufe,
                empfaenger,
                "Audio-Durchsatz"
            );
        }
        true
    }

    /// Wendet die Transkodier-Schnittstelle auf die Payload an
    ///
    /// Base64-Fehler und Transkodier-Fehler fallen beide auf die
    /// Original-Payload zurueck; ein Segment geht dadurch nie verloren.
    fn payload_aufbereiten(&self, segment: &AudioSegmentData) -> (String, String) {
        if !self.transkodierer.erforderlich(&segment.encoding) {
            return (segment.payload.clone(), segment.encoding.clone());
        }
        let bytes = match segment.payload_bytes() {
            Ok(b) => b,
            Err(fehler) => {
                let fehler = RelayError::Payload(fehler.to_string());
                warn!(
                    sequence_no = segment.sequence_no,
                    %fehler,
                    "Original-Payload wird weitergeleitet"
                );
                return (segment.payload.clone(), segment.encoding.clone());
            }
        };
        let (payload, encoding) = transcode::anwenden(&*self.transkodierer, bytes, &segment.encoding);
        (AudioSegmentData::payload_aus_bytes(&payload), encoding)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcode::KeinTranskodierer;
    use podium_conference::KonferenzKonfiguration;
    use podium_protocol::control::{JoinRequest, QualityTier};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TestSenke {
        direkt: Mutex<Vec<(VerbindungsId, ControlMessage)>>,
        verteilt: Mutex<Vec<ControlMessage>>,
    }

    impl EreignisSenke for TestSenke {
        fn an_verbindung(&self, id: &VerbindungsId, nachricht: ControlMessage) -> bool {
            self.direkt.lock().unwrap().push((*id, nachricht));
            true
        }
        fn an_alle(&self, _: ControlMessage) -> usize {
            0
        }
        fn an_alle_ausser(&self, _: &VerbindungsId, nachricht: ControlMessage) -> usize {
            self.verteilt.lock().unwrap().push(nachricht);
            1
        }
        fn an_admins(&self, _: ControlMessage) -> usize {
            0
        }
        fn admin_markieren(&self, _: &VerbindungsId, _: bool) {}
    }

    fn join(name: &str) -> JoinRequest {
        JoinRequest {
            display_name: name.into(),
            device_id: None,
            capabilities: None,
        }
    }

    fn segment(sequence_no: u64, groesse: u64) -> AudioSegmentData {
        AudioSegmentData {
            sequence_no,
            payload: AudioSegmentData::payload_aus_bytes(&[0u8; 16]),
            encoding: "aac".into(),
            size_bytes: groesse,
            capture_timestamp_ms: unix_zeit_ms(),
        }
    }

    fn aufbau() -> (AudioRelay, Arc<TestSenke>, Konferenz, VerbindungsId, VerbindungsId) {
        let senke = Arc::new(TestSenke::default());
        let konferenz = Konferenz::neu(KonferenzKonfiguration::default(), senke.clone());
        let relay = AudioRelay::neu(
            konferenz.clone(),
            senke.clone(),
            Arc::new(KeinTranskodierer),
            RelayKonfiguration::default(),
        );
        let admin = VerbindungsId::new();
        let sprecher = VerbindungsId::new();
        konferenz.beitreten(admin, join("Anna")).unwrap();
        konferenz.beitreten(sprecher, join("Bernd")).unwrap();
        konferenz.wortmeldung(sprecher).unwrap();
        konferenz.genehmigen(admin, sprecher).unwrap();
        (relay, senke, konferenz, admin, sprecher)
    }

    #[tokio::test]
    async fn segment_wird_bestaetigt_und_verteilt() {
        let (relay, senke, _konferenz, _admin, sprecher) = aufbau();
        senke.direkt.lock().unwrap().clear();
        senke.verteilt.lock().unwrap().clear();

        assert!(relay.segment_verarbeiten(7, sprecher, segment(1, 8000)));

        let direkt = senke.direkt.lock().unwrap();
        let ack = direkt
            .iter()
            .find_map(|(id, m)| match (&m.payload, id) {
                (ControlPayload::SegmentAck(a), id) if id == &sprecher => Some((m.request_id, a.clone())),
                _ => None,
            })
            .expect("Sender muss ein Ack erhalten");
        assert_eq!(ack.0, 7);
        assert_eq!(ack.1.sequence_no, 1);
        assert_eq!(ack.1.quality, QualityTier::Excellent);

        let verteilt = senke.verteilt.lock().unwrap();
        let empfangen = verteilt
            .iter()
            .find_map(|m| match &m.payload {
                ControlPayload::SegmentReceived(s) => Some(s.clone()),
                _ => None,
            })
            .expect("Segment muss verteilt werden");
        assert_eq!(empfangen.sender_name, "Bernd");
        assert_eq!(empfangen.sequence_no, 1);
    }

    #[tokio::test]
    async fn nicht_sprecher_wird_abgewiesen() {
        let (relay, senke, _konferenz, admin, _sprecher) = aufbau();
        senke.direkt.lock().unwrap().clear();
        senke.verteilt.lock().unwrap().clear();

        assert!(!relay.segment_verarbeiten(3, admin, segment(1, 8000)));

        assert!(senke.verteilt.lock().unwrap().is_empty());
        let direkt = senke.direkt.lock().unwrap();
        let fehler = direkt.iter().any(|(id, m)| {
            id == &admin
                && matches!(
                    &m.payload,
                    ControlPayload::Error(e) if e.code == ErrorCode::Unauthorized
                )
        });
        assert!(fehler, "Nicht-Sprecher muss einen Fehler erhalten");
    }

    #[tokio::test]
    async fn zukuenftiger_zeitstempel_ergibt_latenz_null() {
        let (relay, senke, _konferenz, _admin, sprecher) = aufbau();
        senke.direkt.lock().unwrap().clear();

        let mut s = segment(1, 8000);
        s.capture_timestamp_ms = unix_zeit_ms() + 60_000;
        relay.segment_verarbeiten(1, sprecher, s);

        let direkt = senke.direkt.lock().unwrap();
        let ack = direkt
            .iter()
            .find_map(|(_, m)| match &m.payload {
                ControlPayload::SegmentAck(a) => Some(a.clone()),
                _ => None,
            })
            .expect("Ack erwartet");
        assert_eq!(ack.latency_ms, 0);
    }

    #[tokio::test]
    async fn qualitaet_folgt_segmentgroesse() {
        let (relay, senke, _konferenz, _admin, sprecher) = aufbau();
        senke.direkt.lock().unwrap().clear();

        relay.segment_verarbeiten(1, sprecher, segment(1, 4000));
        let direkt = senke.direkt.lock().unwrap();
        let ack = direkt
            .iter()
            .find_map(|(_, m)| match &m.payload {
                ControlPayload::SegmentAck(a) => Some(a.clone()),
                _ => None,
            })
            .expect("Ack erwartet");
        // Halbe Groesse: unter der Good-Grenze
        assert_eq!(ack.quality, QualityTier::Fair);
    }
}
