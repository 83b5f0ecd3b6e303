//! Roster-Snapshots – serialisierbare Sichten auf den Konferenz-Zustand
//!
//! Teilnehmer sehen den Roster mit Phasen und Positionen, Admins
//! zusaetzlich Wartezeiten, Sprecher-Statistik und Aggregat-Kennzahlen.

use podium_protocol::control::{
    ActiveSpeakerDetail, AggregateStats, Phase, QueueDetail, RosterEintrag,
};

use crate::queue::Warteschlange;
use crate::registry::Registry;
use crate::session::AktiverSprecher;

/// Baut den Roster-Snapshot aus Teilnehmer-Sicht
///
/// Die Phase wird abgeleitet: aktiver Sprecher vor Rednerlisten-Position
/// vor Zuhoeren.
pub fn roster_snapshot(
    registry: &Registry,
    warteschlange: &Warteschlange,
    sprecher: Option<&AktiverSprecher>,
) -> Vec<RosterEintrag> {
    registry
        .iter()
        .map(|v| {
            let queue_position = warteschlange.position(&v.id);
            let phase = if sprecher.map(|s| s.id == v.id).unwrap_or(false) {
                Phase::Speaking
            } else if queue_position.is_some() {
                Phase::Queued
            } else {
                Phase::Listening
            };
            RosterEintrag {
                user_id: v.id,
                display_name: v.anzeigename.clone(),
                role: v.rolle,
                phase,
                queue_position: if phase == Phase::Queued {
                    queue_position
                } else {
                    None
                },
            }
        })
        .collect()
}

/// Baut die Detail-Sicht der Rednerliste (Admin-Publikum)
pub fn queue_details(registry: &Registry, warteschlange: &Warteschlange) -> Vec<QueueDetail> {
    warteschlange
        .iter()
        .enumerate()
        .filter_map(|(index, eintrag)| {
            let verbindung = registry.get(&eintrag.id)?;
            Some(QueueDetail {
                user_id: eintrag.id,
                display_name: verbindung.anzeigename.clone(),
                position: (index + 1) as u32,
                wait_secs: eintrag.seit.elapsed().as_secs(),
            })
        })
        .collect()
}

/// Baut die Sprecher-Detailsicht (Admin-Publikum)
pub fn sprecher_detail(sprecher: Option<&AktiverSprecher>) -> Option<ActiveSpeakerDetail> {
    sprecher.map(|s| ActiveSpeakerDetail {
        user_id: s.id,
        display_name: s.anzeigename.clone(),
        elapsed_secs: s.begonnen.elapsed().as_secs(),
        stats: s.session_stats(),
    })
}

/// Baut die aggregierten Kennzahlen
pub fn aggregate(
    registry: &Registry,
    warteschlange: &Warteschlange,
    sprecher: Option<&AktiverSprecher>,
    segmente_gesamt: u64,
) -> AggregateStats {
    AggregateStats {
        connections: registry.anzahl() as u32,
        admins: registry.admin_anzahl() as u32,
        queue_length: warteschlange.laenge() as u32,
        active_speaker: sprecher.map(|s| s.anzeigename.clone()),
        speaker_elapsed_secs: sprecher.map(|s| s.begonnen.elapsed().as_secs()),
        segments_processed: segmente_gesamt,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use podium_core::types::VerbindungsId;
    use podium_protocol::control::Rolle;

    #[test]
    fn phasen_werden_korrekt_abgeleitet() {
        let mut registry = Registry::neu();
        let mut warteschlange = Warteschlange::neu();

        let admin = VerbindungsId::new();
        let redner = VerbindungsId::new();
        let wartender = VerbindungsId::new();
        registry.einfuegen(admin, "Anna", None, None).unwrap();
        registry.einfuegen(redner, "Bernd", None, None).unwrap();
        registry.einfuegen(wartender, "Clara", None, None).unwrap();
        warteschlange.einreihen(wartender).unwrap();

        let sprecher = AktiverSprecher::neu(redner, "Bernd".into(), 1);
        let roster = roster_snapshot(&registry, &warteschlange, Some(&sprecher));

        assert_eq!(roster.len(), 3);
        assert_eq!(roster[0].phase, Phase::Listening);
        assert_eq!(roster[0].role, Rolle::Admin);
        assert_eq!(roster[1].phase, Phase::Speaking);
        assert_eq!(roster[1].queue_position, None);
        assert_eq!(roster[2].phase, Phase::Queued);
        assert_eq!(roster[2].queue_position, Some(1));
    }

    #[test]
    fn queue_details_in_fifo_reihenfolge() {
        let mut registry = Registry::neu();
        let mut warteschlange = Warteschlange::neu();
        let a = VerbindungsId::new();
        let b = VerbindungsId::new();
        registry.einfuegen(a, "Anna", None, None).unwrap();
        registry.einfuegen(b, "Bernd", None, None).unwrap();
        warteschlange.einreihen(b).unwrap();
        warteschlange.einreihen(a).unwrap();

        let details = queue_details(&registry, &warteschlange);
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].user_id, b);
        assert_eq!(details[0].position, 1);
        assert_eq!(details[1].user_id, a);
        assert_eq!(details[1].position, 2);
    }

    #[test]
    fn aggregate_zaehlt_korrekt() {
        let mut registry = Registry::neu();
        let warteschlange = Warteschlange::neu();
        registry
            .einfuegen(VerbindungsId::new(), "Anna", None, None)
            .unwrap();
        registry
            .einfuegen(VerbindungsId::new(), "Bernd", None, None)
            .unwrap();

        let stats = aggregate(&registry, &warteschlange, None, 42);
        assert_eq!(stats.connections, 2);
        assert_eq!(stats.admins, 1);
        assert_eq!(stats.queue_length, 0);
        assert_eq!(stats.active_speaker, None);
        assert_eq!(stats.segments_processed, 42);
    }
}
