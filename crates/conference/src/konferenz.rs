//! Konferenz – der zentrale Zustandsautomat
//!
//! Alle Zustands-Uebergaenge laufen ueber genau eine Mutex; jede
//! Operation liest, entscheidet und schreibt unter demselben Lock.
//! Damit sind Check-then-act-Races (z.B. Genehmigung waehrend eines
//! Disconnects) strukturell ausgeschlossen.
//!
//! Ausgehende Ereignisse werden ueber die [`EreignisSenke`] zugestellt.
//! Zustellung ist nicht-blockierend, das Lock wird dadurch nie ueber
//! einen Await-Punkt gehalten.

use parking_lot::Mutex;
use podium_core::types::{unix_zeit_ms, VerbindungsId};
use podium_protocol::control::{
    AggregateStats, ControlMessage, ControlPayload, JoinRequest, JoinedResponse, QualityTier,
    QueueUpdatedNotice, QueuedNotice, RejectedNotice, SpeakerEndReason, SpeakerEndedNotice,
    SpeakerStartedNotice, SpeakingEndNotice, SpeakingStartNotice, StateUpdateNotice,
    StreamingEndRequest, StreamingEndedNotice, StreamingStartRequest, StreamingStartedNotice,
    RosterUpdatedNotice,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{KonferenzError, KonferenzResult};
use crate::queue::Warteschlange;
use crate::registry::Registry;
use crate::roster;
use crate::session::{AktiverSprecher, StreamingSession};
use crate::sink::EreignisSenke;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Konfiguration des Konferenz-Kerns
#[derive(Debug, Clone)]
pub struct KonferenzKonfiguration {
    /// Maximale Laenge der Rednerliste
    pub max_warteschlange: usize,
    /// Maximale Redezeit pro Sprechphase
    pub redezeit_limit: Duration,
    /// Shared Secret fuer nachtraegliche Admin-Authentifizierung
    pub admin_passwort: Option<String>,
    /// Gewicht neuer Messwerte im Latenz-Mittelwert (0..1)
    pub glaettungs_gewicht: f64,
}

impl Default for KonferenzKonfiguration {
    fn default() -> Self {
        Self {
            max_warteschlange: 50,
            redezeit_limit: Duration::from_secs(180),
            admin_passwort: None,
            glaettungs_gewicht: 0.2,
        }
    }
}

// ---------------------------------------------------------------------------
// Zustand
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct KonferenzZustand {
    registry: Registry,
    warteschlange: Warteschlange,
    sprecher: Option<AktiverSprecher>,
    /// Monoton steigender Zaehler; schuetzt gegen verspaetete Timer
    sprecher_generation: u64,
    /// Insgesamt verarbeitete Segmente seit Serverstart
    segmente_gesamt: u64,
}

struct KonferenzInner {
    config: KonferenzKonfiguration,
    zustand: Mutex<KonferenzZustand>,
    senke: Arc<dyn EreignisSenke>,
}

/// Ergebnis einer Segment-Verbuchung (Snapshot fuer das Relay)
#[derive(Debug, Clone)]
pub struct SegmentVerbucht {
    /// Anzeigename des aktiven Sprechers
    pub anzeigename: String,
    /// Anzahl Segmente dieser Sprechphase (inklusive diesem)
    pub segmente: u64,
    /// Kumulierte Bytes dieser Sprechphase
    pub bytes: u64,
    /// Geglaetteter Latenz-Mittelwert nach diesem Segment
    pub mittlere_latenz_ms: f64,
}

// ---------------------------------------------------------------------------
// Konferenz
// ---------------------------------------------------------------------------

/// Handle auf den Konferenz-Zustandsautomaten
///
/// Billig klonbar; alle Klone teilen denselben Zustand.
#[derive(Clone)]
pub struct Konferenz {
    inner: Arc<KonferenzInner>,
}

impl Konferenz {
    /// Erstellt eine neue, leere Konferenz
    pub fn neu(config: KonferenzKonfiguration, senke: Arc<dyn EreignisSenke>) -> Self {
        let max = config.max_warteschlange;
        Self {
            inner: Arc::new(KonferenzInner {
                config,
                zustand: Mutex::new(KonferenzZustand {
                    registry: Registry::neu(),
                    warteschlange: Warteschlange::mit_kapazitaet(max),
                    sprecher: None,
                    sprecher_generation: 0,
                    segmente_gesamt: 0,
                }),
                senke,
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Beitritt / Verlassen
    // -----------------------------------------------------------------------

    /// Registriert eine Verbindung in der Konferenz
    ///
    /// Die erste Verbindung wird automatisch Admin (Bootstrap-Regel).
    pub fn beitreten(
        &self,
        id: VerbindungsId,
        anfrage: JoinRequest,
    ) -> KonferenzResult<JoinedResponse> {
        let mut zustand = self.inner.zustand.lock();
        let verbindung = zustand.registry.einfuegen(
            id,
            &anfrage.display_name,
            anfrage.device_id,
            anfrage.capabilities,
        )?;
        let ist_admin = verbindung.ist_admin();
        if ist_admin {
            self.inner.senke.admin_markieren(&id, true);
        }

        info!(
            user_id = %id,
            name = %verbindung.anzeigename,
            admin = ist_admin,
            teilnehmer = zustand.registry.anzahl(),
            "Teilnehmer beigetreten"
        );

        let antwort = JoinedResponse {
            user_id: id,
            is_admin: ist_admin,
            roster: roster::roster_snapshot(
                &zustand.registry,
                &zustand.warteschlange,
                zustand.sprecher.as_ref(),
            ),
            queue_length: zustand.warteschlange.laenge() as u32,
            active_speaker: zustand.sprecher.as_ref().map(AktiverSprecher::info),
        };

        self.roster_broadcast(&zustand, Some(&id));
        self.state_update(&zustand);
        Ok(antwort)
    }

    /// Entfernt eine Verbindung und raeumt alle abhaengigen Zustaende auf
    ///
    /// Gutartig bei unbekannter ID (Race mit doppeltem Disconnect).
    pub fn verlassen(&self, id: VerbindungsId) {
        let mut zustand = self.inner.zustand.lock();

        let war_sprecher = zustand.sprecher.as_ref().map(|s| s.id) == Some(id);
        if war_sprecher {
            self.ende_sequenz(&mut zustand, SpeakerEndReason::Disconnected);
        }

        if zustand.warteschlange.austragen(&id).is_ok() {
            self.positions_broadcast(&zustand);
        }

        let entfernt = match zustand.registry.entfernen(&id) {
            Some(v) => v,
            None => return,
        };
        self.inner.senke.admin_markieren(&id, false);

        info!(
            user_id = %id,
            name = %entfernt.anzeigename,
            verbleibend = zustand.registry.anzahl(),
            "Teilnehmer hat die Konferenz verlassen"
        );

        // Admin-Nachruecker-Regel: verlaesst der letzte Admin die
        // Konferenz, rueckt die aelteste verbliebene Verbindung nach.
        if entfernt.ist_admin()
            && zustand.registry.admin_anzahl() == 0
            && zustand.registry.anzahl() > 0
        {
            let nachruecker = zustand.registry.aelteste().map(|v| v.id);
            if let Some(neuer_admin) = nachruecker {
                if let Ok(true) = zustand.registry.zum_admin_befoerdern(&neuer_admin) {
                    self.inner.senke.admin_markieren(&neuer_admin, true);
                    self.inner.senke.an_verbindung(
                        &neuer_admin,
                        ControlMessage::ereignis(ControlPayload::AdminPromoted),
                    );
                    info!(user_id = %neuer_admin, "Admin-Rolle weitergegeben");
                }
            }
        }

        self.roster_broadcast(&zustand, None);
        self.state_update(&zustand);
    }

    // -----------------------------------------------------------------------
    // Rednerliste
    // -----------------------------------------------------------------------

    /// Reiht eine Wortmeldung in die Rednerliste ein
    pub fn wortmeldung(&self, id: VerbindungsId) -> KonferenzResult<QueuedNotice> {
        let mut zustand = self.inner.zustand.lock();
        if !zustand.registry.enthaelt(&id) {
            return Err(KonferenzError::NichtGefunden(id));
        }
        if zustand.sprecher.as_ref().map(|s| s.id) == Some(id) {
            return Err(KonferenzError::SprichtBereits);
        }

        let position = zustand.warteschlange.einreihen(id)?;
        let total = zustand.warteschlange.laenge() as u32;
        debug!(user_id = %id, position, total, "Wortmeldung eingereiht");

        self.positions_broadcast(&zustand);
        Ok(QueuedNotice {
            position,
            total_in_queue: total,
        })
    }

    /// Zieht eine Wortmeldung zurueck
    pub fn wortmeldung_zurueckziehen(&self, id: VerbindungsId) -> KonferenzResult<()> {
        let mut zustand = self.inner.zustand.lock();
        zustand.warteschlange.austragen(&id)?;
        debug!(user_id = %id, "Wortmeldung zurueckgezogen");
        self.positions_broadcast(&zustand);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Admin
    // -----------------------------------------------------------------------

    /// Authentifiziert eine Verbindung nachtraeglich als Admin
    ///
    /// Gibt `true` zurueck wenn die Rolle tatsaechlich geaendert wurde.
    pub fn authentifizieren(
        &self,
        id: VerbindungsId,
        credential: &str,
    ) -> KonferenzResult<bool> {
        let passt = self
            .inner
            .config
            .admin_passwort
            .as_deref()
            .map(|p| p == credential)
            .unwrap_or(false);
        if !passt {
            warn!(user_id = %id, "Admin-Authentifizierung fehlgeschlagen");
            return Err(KonferenzError::NichtAutorisiert(
                "Ungueltiges Admin-Credential".into(),
            ));
        }

        let mut zustand = self.inner.zustand.lock();
        let geaendert = zustand.registry.zum_admin_befoerdern(&id)?;
        if geaendert {
            self.inner.senke.admin_markieren(&id, true);
            info!(user_id = %id, "Admin-Authentifizierung erfolgreich");
            self.roster_broadcast(&zustand, None);
            self.state_update(&zustand);
        }
        Ok(geaendert)
    }

    /// Genehmigt die vorderste oder eine bestimmte Wortmeldung
    ///
    /// Ein bereits aktiver Sprecher wird vorher zwingend beendet, damit
    /// zu keinem Zeitpunkt zwei Sprecher existieren.
    pub fn genehmigen(
        &self,
        admin_id: VerbindungsId,
        ziel: VerbindungsId,
    ) -> KonferenzResult<()> {
        let mut zustand = self.inner.zustand.lock();
        self.admin_pruefen(&zustand, &admin_id)?;

        let verbindung = zustand
            .registry
            .get(&ziel)
            .ok_or(KonferenzError::NichtGefunden(ziel))?;
        let anzeigename = verbindung.anzeigename.clone();

        zustand.warteschlange.austragen(&ziel)?;

        if zustand.sprecher.is_some() {
            self.ende_sequenz(&mut zustand, SpeakerEndReason::Admin);
        }

        zustand.sprecher_generation += 1;
        let generation = zustand.sprecher_generation;
        let mut sprecher = AktiverSprecher::neu(ziel, anzeigename.clone(), generation);

        // Redezeit-Timer: feuert nur, wenn seine Generation beim Ablauf
        // noch die aktuelle ist.
        let konferenz = self.clone();
        let limit = self.inner.config.redezeit_limit;
        sprecher.timeout_task = Some(tokio::spawn(async move {
            tokio::time::sleep(limit).await;
            konferenz.redezeit_abgelaufen(generation);
        }));

        let begonnen_ms = sprecher.begonnen_ms;
        zustand.sprecher = Some(sprecher);

        info!(
            user_id = %ziel,
            name = %anzeigename,
            durch = %admin_id,
            "Wortmeldung genehmigt, Sprechphase beginnt"
        );

        self.inner.senke.an_verbindung(
            &ziel,
            ControlMessage::ereignis(ControlPayload::SpeakingStart(SpeakingStartNotice {
                started_at_ms: begonnen_ms,
                max_duration_secs: limit.as_secs(),
            })),
        );
        self.inner.senke.an_alle_ausser(
            &ziel,
            ControlMessage::ereignis(ControlPayload::SpeakerStarted(SpeakerStartedNotice {
                user_id: ziel,
                display_name: anzeigename,
                timestamp_ms: begonnen_ms,
            })),
        );

        self.positions_broadcast(&zustand);
        self.roster_broadcast(&zustand, None);
        self.state_update(&zustand);
        Ok(())
    }

    /// Lehnt eine Wortmeldung ab und entfernt sie aus der Rednerliste
    pub fn ablehnen(
        &self,
        admin_id: VerbindungsId,
        ziel: VerbindungsId,
    ) -> KonferenzResult<()> {
        let mut zustand = self.inner.zustand.lock();
        self.admin_pruefen(&zustand, &admin_id)?;

        zustand.warteschlange.austragen(&ziel)?;
        let admin_name = zustand
            .registry
            .get(&admin_id)
            .map(|v| v.anzeigename.clone());

        debug!(user_id = %ziel, durch = %admin_id, "Wortmeldung abgelehnt");

        self.inner.senke.an_verbindung(
            &ziel,
            ControlMessage::ereignis(ControlPayload::RequestRejected(RejectedNotice {
                rejected_by: admin_name,
                timestamp_ms: unix_zeit_ms(),
            })),
        );
        self.positions_broadcast(&zustand);
        Ok(())
    }

    /// Beendet die laufende Sprechphase per Admin-Eingriff
    pub fn erzwungen_beenden(&self, admin_id: VerbindungsId) -> KonferenzResult<()> {
        let mut zustand = self.inner.zustand.lock();
        self.admin_pruefen(&zustand, &admin_id)?;
        self.ende_sequenz(&mut zustand, SpeakerEndReason::Admin);
        self.roster_broadcast(&zustand, None);
        self.state_update(&zustand);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Sprechphase
    // -----------------------------------------------------------------------

    /// Sprecher beendet seine Sprechphase selbst
    ///
    /// No-Op wenn der Aufrufer nicht der aktive Sprecher ist (Race mit
    /// Timeout oder Admin-Eingriff).
    pub fn freiwillig_beenden(&self, id: VerbindungsId) {
        let mut zustand = self.inner.zustand.lock();
        if zustand.sprecher.as_ref().map(|s| s.id) != Some(id) {
            return;
        }
        self.ende_sequenz(&mut zustand, SpeakerEndReason::Voluntary);
        self.roster_broadcast(&zustand, None);
        self.state_update(&zustand);
    }

    /// Redezeit-Timer ist abgelaufen
    ///
    /// Feuert nur wenn die Generation noch aktuell ist; verspaetete
    /// Timer frueherer Sprecher sind No-Ops.
    pub fn redezeit_abgelaufen(&self, generation: u64) {
        let mut zustand = self.inner.zustand.lock();
        let aktuell = zustand
            .sprecher
            .as_ref()
            .map(|s| s.generation == generation)
            .unwrap_or(false);
        if !aktuell {
            return;
        }
        info!(generation, "Redezeit-Limit erreicht, Sprechphase wird beendet");
        self.ende_sequenz(&mut zustand, SpeakerEndReason::Timeout);
        self.roster_broadcast(&zustand, None);
        self.state_update(&zustand);
    }

    /// Oeffnet eine Streaming-Klammer (nur der aktive Sprecher)
    pub fn streaming_start(
        &self,
        id: VerbindungsId,
        anfrage: StreamingStartRequest,
    ) -> KonferenzResult<()> {
        let mut zustand = self.inner.zustand.lock();
        let sprecher = match zustand.sprecher.as_mut() {
            Some(s) if s.id == id => s,
            _ => {
                return Err(KonferenzError::NichtAutorisiert(
                    "Streaming nur als aktiver Sprecher".into(),
                ))
            }
        };

        let anzeigename = sprecher.anzeigename.clone();
        sprecher.streaming = Some(StreamingSession {
            format: anfrage.format.clone(),
            sample_rate: anfrage.sample_rate,
            bit_rate: anfrage.bit_rate,
            begonnen: std::time::Instant::now(),
        });

        debug!(user_id = %id, format = %anfrage.format, "Streaming begonnen");
        self.inner.senke.an_alle_ausser(
            &id,
            ControlMessage::ereignis(ControlPayload::StreamingStarted(StreamingStartedNotice {
                user_id: id,
                display_name: anzeigename,
                format: anfrage.format,
                sample_rate: anfrage.sample_rate,
                bit_rate: anfrage.bit_rate,
                timestamp_ms: unix_zeit_ms(),
            })),
        );
        Ok(())
    }

    /// Schliesst die Streaming-Klammer regulaer (nur der aktive Sprecher)
    pub fn streaming_ende(
        &self,
        id: VerbindungsId,
        _anfrage: StreamingEndRequest,
    ) -> KonferenzResult<()> {
        let mut zustand = self.inner.zustand.lock();
        let sprecher = match zustand.sprecher.as_mut() {
            Some(s) if s.id == id => s,
            _ => {
                return Err(KonferenzError::NichtAutorisiert(
                    "Streaming nur als aktiver Sprecher".into(),
                ))
            }
        };
        if sprecher.streaming.take().is_none() {
            return Ok(());
        }

        let anzeigename = sprecher.anzeigename.clone();
        let stats = sprecher.session_stats();

        debug!(user_id = %id, segmente = stats.segments, "Streaming beendet");
        self.inner.senke.an_alle_ausser(
            &id,
            ControlMessage::ereignis(ControlPayload::StreamingEnded(StreamingEndedNotice {
                user_id: id,
                display_name: anzeigename,
                reason: None,
                stats: Some(stats),
                timestamp_ms: unix_zeit_ms(),
            })),
        );
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Segment-Verbuchung (heisser Pfad)
    // -----------------------------------------------------------------------

    /// Verbucht ein Segment des aktiven Sprechers
    ///
    /// Gibt `None` zurueck wenn die Verbindung nicht der aktive Sprecher
    /// ist; das Relay verwirft das Segment dann. Pruefung und Verbuchung
    /// passieren atomar unter dem Konferenz-Lock.
    pub fn segment_verbuchen(
        &self,
        id: VerbindungsId,
        groesse: u64,
        latenz_ms: u64,
    ) -> Option<SegmentVerbucht> {
        let mut zustand = self.inner.zustand.lock();
        let gewicht = self.inner.config.glaettungs_gewicht;
        let sprecher = match zustand.sprecher.as_mut() {
            Some(s) if s.id == id => s,
            _ => return None,
        };

        sprecher.statistik.segment_verbuchen(groesse, latenz_ms, gewicht);
        let ergebnis = SegmentVerbucht {
            anzeigename: sprecher.anzeigename.clone(),
            segmente: sprecher.statistik.segmente,
            bytes: sprecher.statistik.bytes,
            mittlere_latenz_ms: sprecher.statistik.mittlere_latenz_ms,
        };
        zustand.segmente_gesamt += 1;
        Some(ergebnis)
    }

    /// Vermerkt die zuletzt zugewiesene Qualitaetsstufe
    ///
    /// No-Op wenn der Sprecher inzwischen gewechselt hat.
    pub fn stufe_vermerken(&self, id: VerbindungsId, stufe: QualityTier) {
        let mut zustand = self.inner.zustand.lock();
        if let Some(sprecher) = zustand.sprecher.as_mut() {
            if sprecher.id == id {
                sprecher.statistik.stufe_vermerken(stufe);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Abfragen
    // -----------------------------------------------------------------------

    /// Aggregierte Kennzahlen (fuer Status-Endpoint und Log-Tick)
    pub fn aggregate(&self) -> AggregateStats {
        let zustand = self.inner.zustand.lock();
        roster::aggregate(
            &zustand.registry,
            &zustand.warteschlange,
            zustand.sprecher.as_ref(),
            zustand.segmente_gesamt,
        )
    }

    /// Vollstaendiger Zustands-Snapshot (Admin-Sicht)
    pub fn status_snapshot(&self) -> StateUpdateNotice {
        let zustand = self.inner.zustand.lock();
        self.snapshot(&zustand)
    }

    /// Ist die Verbindung Admin?
    pub fn ist_admin(&self, id: &VerbindungsId) -> bool {
        self.inner.zustand.lock().registry.ist_admin(id)
    }

    /// Ist die Verbindung registriert?
    pub fn ist_registriert(&self, id: &VerbindungsId) -> bool {
        self.inner.zustand.lock().registry.enthaelt(id)
    }

    // -----------------------------------------------------------------------
    // Interne Helfer (setzen gehaltenes Lock voraus)
    // -----------------------------------------------------------------------

    fn admin_pruefen(
        &self,
        zustand: &KonferenzZustand,
        id: &VerbindungsId,
    ) -> KonferenzResult<()> {
        if zustand.registry.ist_admin(id) {
            Ok(())
        } else {
            Err(KonferenzError::NichtAutorisiert(
                "Operation erfordert Admin-Rolle".into(),
            ))
        }
    }

    /// Beendet die laufende Sprechphase vollstaendig und idempotent
    ///
    /// Reihenfolge: Timer abbrechen, offene Streaming-Klammer
    /// synthetisch schliessen, Abschluss an den Sprecher, Broadcast an
    /// alle anderen. Ohne aktiven Sprecher ein No-Op.
    fn ende_sequenz(&self, zustand: &mut KonferenzZustand, grund: SpeakerEndReason) {
        let mut sprecher = match zustand.sprecher.take() {
            Some(s) => s,
            None => return,
        };
        if let Some(task) = sprecher.timeout_task.take() {
            task.abort();
        }

        let stats = sprecher.session_stats();
        let jetzt = unix_zeit_ms();

        info!(
            user_id = %sprecher.id,
            name = %sprecher.anzeigename,
            grund = ?grund,
            segmente = stats.segments,
            dauer_ms = stats.duration_ms,
            "Sprechphase beendet"
        );

        if sprecher.streaming.take().is_some() {
            self.inner.senke.an_alle(ControlMessage::ereignis(
                ControlPayload::StreamingEnded(StreamingEndedNotice {
                    user_id: sprecher.id,
                    display_name: sprecher.anzeigename.clone(),
                    reason: Some(grund),
                    stats: Some(stats.clone()),
                    timestamp_ms: jetzt,
                }),
            ));
        }

        self.inner.senke.an_verbindung(
            &sprecher.id,
            ControlMessage::ereignis(ControlPayload::SpeakingEnd(SpeakingEndNotice {
                reason: grund,
                stats: Some(stats.clone()),
                timestamp_ms: jetzt,
            })),
        );
        self.inner.senke.an_alle_ausser(
            &sprecher.id,
            ControlMessage::ereignis(ControlPayload::SpeakerEnded(SpeakerEndedNotice {
                user_id: sprecher.id,
                display_name: sprecher.anzeigename,
                reason: grund,
                stats: Some(stats),
                timestamp_ms: jetzt,
            })),
        );
    }

    /// Positions-Updates an Wartende, Listen-Detail an Admins
    fn positions_broadcast(&self, zustand: &KonferenzZustand) {
        let total = zustand.warteschlange.laenge() as u32;
        for (index, eintrag) in zustand.warteschlange.iter().enumerate() {
            self.inner.senke.an_verbindung(
                &eintrag.id,
                ControlMessage::ereignis(ControlPayload::Queued(QueuedNotice {
                    position: (index + 1) as u32,
                    total_in_queue: total,
                })),
            );
        }
        self.inner
            .senke
            .an_admins(ControlMessage::ereignis(ControlPayload::QueueUpdated(
                QueueUpdatedNotice {
                    entries: roster::queue_details(&zustand.registry, &zustand.warteschlange),
                    total_in_queue: total,
                },
            )));
    }

    /// Roster-Update an alle (optional ohne den Ausloeser)
    fn roster_broadcast(&self, zustand: &KonferenzZustand, ausser: Option<&VerbindungsId>) {
        let nachricht = ControlMessage::ereignis(ControlPayload::RosterUpdated(
            RosterUpdatedNotice {
                roster: roster::roster_snapshot(
                    &zustand.registry,
                    &zustand.warteschlange,
                    zustand.sprecher.as_ref(),
                ),
            },
        ));
        match ausser {
            Some(id) => self.inner.senke.an_alle_ausser(id, nachricht),
            None => self.inner.senke.an_alle(nachricht),
        };
    }

    fn snapshot(&self, zustand: &KonferenzZustand) -> StateUpdateNotice {
        StateUpdateNotice {
            roster: roster::roster_snapshot(
                &zustand.registry,
                &zustand.warteschlange,
                zustand.sprecher.as_ref(),
            ),
            queue: roster::queue_details(&zustand.registry, &zustand.warteschlange),
            active_speaker: roster::sprecher_detail(zustand.sprecher.as_ref()),
            aggregate: roster::aggregate(
                &zustand.registry,
                &zustand.warteschlange,
                zustand.sprecher.as_ref(),
                zustand.segmente_gesamt,
            ),
        }
    }

    /// Zustands-Update an alle Admins
    fn state_update(&self, zustand: &KonferenzZustand) {
        self.inner
            .senke
            .an_admins(ControlMessage::ereignis(ControlPayload::StateUpdate(
                self.snapshot(zustand),
            )));
    }
}

impl std::fmt::Debug for Konferenz {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let zustand = self.inner.zustand.lock();
        f.debug_struct("Konferenz")
            .field("teilnehmer", &zustand.registry.anzahl())
            .field("warteschlange", &zustand.warteschlange.laenge())
            .field("sprecher", &zustand.sprecher.as_ref().map(|s| s.id))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    /// Senke die nichts zustellt (fuer reine Zustands-Tests)
    struct NullSenke;

    impl EreignisSenke for NullSenke {
        fn an_verbindung(&self, _: &VerbindungsId, _: ControlMessage) -> bool {
            true
        }
        fn an_alle(&self, _: ControlMessage) -> usize {
            0
        }
        fn an_alle_ausser(&self, _: &VerbindungsId, _: ControlMessage) -> usize {
            0
        }
        fn an_admins(&self, _: ControlMessage) -> usize {
            0
        }
        fn admin_markieren(&self, _: &VerbindungsId, _: bool) {}
    }

    /// Senke die alle pro Verbindung zugestellten Nachrichten mitschreibt
    #[derive(Default)]
    struct ProtokollSenke {
        direkt: StdMutex<Vec<(VerbindungsId, ControlMessage)>>,
    }

    impl EreignisSenke for ProtokollSenke {
        fn an_verbindung(&self, id: &VerbindungsId, nachricht: ControlMessage) -> bool {
            self.direkt.lock().unwrap().push((*id, nachricht));
            true
        }
        fn an_alle(&self, _: ControlMessage) -> usize {
            0
        }
        fn an_alle_ausser(&self, _: &VerbindungsId, _: ControlMessage) -> usize {
            0
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

    fn konferenz() -> Konferenz {
        Konferenz::neu(KonferenzKonfiguration::default(), Arc::new(NullSenke))
    }

    #[tokio::test]
    async fn erster_beitritt_ist_admin() {
        let k = konferenz();
        let a = VerbindungsId::new();
        let b = VerbindungsId::new();
        assert!(k.beitreten(a, join("Anna")).unwrap().is_admin);
        assert!(!k.beitreten(b, join("Bernd")).unwrap().is_admin);
    }

    #[tokio::test]
    async fn genehmigung_erfordert_admin() {
        let k = konferenz();
        let admin = VerbindungsId::new();
        let b = VerbindungsId::new();
        k.beitreten(admin, join("Anna")).unwrap();
        k.beitreten(b, join("Bernd")).unwrap();
        k.wortmeldung(b).unwrap();

        assert!(matches!(
            k.genehmigen(b, b),
            Err(KonferenzError::NichtAutorisiert(_))
        ));
        k.genehmigen(admin, b).unwrap();
        assert_eq!(k.aggregate().active_speaker.as_deref(), Some("Bernd"));
    }

    #[tokio::test]
    async fn genehmigung_beendet_laufenden_sprecher() {
        let k = konferenz();
        let admin = VerbindungsId::new();
        let b = VerbindungsId::new();
        let c = VerbindungsId::new();
        k.beitreten(admin, join("Anna")).unwrap();
        k.beitreten(b, join("Bernd")).unwrap();
        k.beitreten(c, join("Clara")).unwrap();
        k.wortmeldung(b).unwrap();
        k.wortmeldung(c).unwrap();

        k.genehmigen(admin, b).unwrap();
        k.genehmigen(admin, c).unwrap();

        // Hoechstens ein Sprecher, und zwar der zuletzt genehmigte
        assert_eq!(k.aggregate().active_speaker.as_deref(), Some("Clara"));
        // Bernd kann sich wieder melden (nicht mehr Sprecher)
        k.wortmeldung(b).unwrap();
    }

    #[tokio::test]
    async fn disconnect_des_sprechers_gibt_slot_frei() {
        let k = konferenz();
        let admin = VerbindungsId::new();
        let b = VerbindungsId::new();
        k.beitreten(admin, join("Anna")).unwrap();
        k.beitreten(b, join("Bernd")).unwrap();
        k.wortmeldung(b).unwrap();
        k.genehmigen(admin, b).unwrap();

        k.verlassen(b);
        assert_eq!(k.aggregate().active_speaker, None);
        assert_eq!(k.aggregate().connections, 1);
    }

    #[tokio::test]
    async fn admin_rolle_rueckt_nach() {
        let k = konferenz();
        let admin = VerbindungsId::new();
        let b = VerbindungsId::new();
        let c = VerbindungsId::new();
        k.beitreten(admin, join("Anna")).unwrap();
        k.beitreten(b, join("Bernd")).unwrap();
        k.beitreten(c, join("Clara")).unwrap();

        k.verlassen(admin);
        // Aelteste verbliebene Verbindung (Bernd) ist jetzt Admin
        assert!(k.ist_admin(&b));
        assert!(!k.ist_admin(&c));
        assert_eq!(k.aggregate().admins, 1);
    }

    #[tokio::test]
    async fn segment_verbuchen_nur_fuer_sprecher() {
        let k = konferenz();
        let admin = VerbindungsId::new();
        let b = VerbindungsId::new();
        k.beitreten(admin, join("Anna")).unwrap();
        k.beitreten(b, join("Bernd")).unwrap();

        assert!(k.segment_verbuchen(b, 8000, 50).is_none());

        k.wortmeldung(b).unwrap();
        k.genehmigen(admin, b).unwrap();
        let verbucht = k.segment_verbuchen(b, 8000, 50).unwrap();
        assert_eq!(verbucht.segmente, 1);
        assert_eq!(verbucht.mittlere_latenz_ms, 50.0);
        assert_eq!(verbucht.anzeigename, "Bernd");
    }

    #[tokio::test]
    async fn authentifizierung_prueft_credential() {
        let config = KonferenzKonfiguration {
            admin_passwort: Some("geheim".into()),
            ..Default::default()
        };
        let k = Konferenz::neu(config, Arc::new(NullSenke));
        let a = VerbindungsId::new();
        let b = VerbindungsId::new();
        k.beitreten(a, join("Anna")).unwrap();
        k.beitreten(b, join("Bernd")).unwrap();

        assert!(matches!(
            k.authentifizieren(b, "falsch"),
            Err(KonferenzError::NichtAutorisiert(_))
        ));
        assert!(k.authentifizieren(b, "geheim").unwrap());
        assert!(k.ist_admin(&b));
        // Idempotent
        assert!(!k.authentifizieren(b, "geheim").unwrap());
    }

    #[tokio::test]
    async fn redezeit_limit_beendet_sprechphase() {
        tokio::time::pause();
        let config = KonferenzKonfiguration {
            redezeit_limit: Duration::from_secs(5),
            ..Default::default()
        };
        let senke = Arc::new(ProtokollSenke::default());
        let k = Konferenz::neu(config, senke.clone());
        let admin = VerbindungsId::new();
        let b = VerbindungsId::new();
        k.beitreten(admin, join("Anna")).unwrap();
        k.beitreten(b, join("Bernd")).unwrap();
        k.wortmeldung(b).unwrap();
        k.genehmigen(admin, b).unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;
        tokio::task::yield_now().await;

        assert_eq!(k.aggregate().active_speaker, None);
        let direkt = senke.direkt.lock().unwrap();
        let timeout_ende = direkt.iter().any(|(id, m)| {
            id == &b
                && matches!(
                    &m.payload,
                    ControlPayload::SpeakingEnd(n) if n.reason == SpeakerEndReason::Timeout
                )
        });
        assert!(timeout_ende, "Sprecher muss das Timeout-Ende erhalten");
    }

    #[tokio::test]
    async fn verspaeteter_timer_trifft_falsche_generation() {
        let k = konferenz();
        let admin = VerbindungsId::new();
        let b = VerbindungsId::new();
        k.beitreten(admin, join("Anna")).unwrap();
        k.beitreten(b, join("Bernd")).unwrap();
        k.wortmeldung(b).unwrap();
        k.genehmigen(admin, b).unwrap();

        // Timer der Generation 0 (vor diesem Sprecher) darf nichts tun
        k.redezeit_abgelaufen(0);
        assert_eq!(k.aggregate().active_speaker.as_deref(), Some("Bernd"));
    }

    #[tokio::test]
    async fn freiwilliges_ende_nur_durch_sprecher() {
        let k = konferenz();
        let admin = VerbindungsId::new();
        let b = VerbindungsId::new();
        k.beitreten(admin, join("Anna")).unwrap();
        k.beitreten(b, join("Bernd")).unwrap();
        k.wortmeldung(b).unwrap();
        k.genehmigen(admin, b).unwrap();

        // Fremdes Ende ist ein No-Op
        k.freiwillig_beenden(admin);
        assert_eq!(k.aggregate().active_speaker.as_deref(), Some("Bernd"));

        k.freiwillig_beenden(b);
        assert_eq!(k.aggregate().active_speaker, None);
    }

    #[tokio::test]
    async fn ablehnung_entfernt_aus_liste() {
        let senke = Arc::new(ProtokollSenke::default());
        let k = Konferenz::neu(KonferenzKonfiguration::default(), senke.clone());
        let admin = VerbindungsId::new();
        let b = VerbindungsId::new();
        k.beitreten(admin, join("Anna")).unwrap();
        k.beitreten(b, join("Bernd")).unwrap();
        k.wortmeldung(b).unwrap();

        k.ablehnen(admin, b).unwrap();
        assert_eq!(k.aggregate().queue_length, 0);

        let direkt = senke.direkt.lock().unwrap();
        let abgelehnt = direkt.iter().any(|(id, m)| {
            id == &b
                && matches!(
                    &m.payload,
                    ControlPayload::RequestRejected(n) if n.rejected_by.as_deref() == Some("Anna")
                )
        });
        assert!(abgelehnt);
    }
}
