//! Ereignis-Senke – Transport-Abstraktion fuer ausgehende Nachrichten
//!
//! Der Konferenz-Kern kennt keine Transport-Interna. Alle ausgehenden
//! Ereignisse laufen ueber dieses Trait; die konkrete Implementierung
//! (TCP-Send-Queues) liegt im Signaling-Crate.
//!
//! Zustellung ist nicht-blockierend und best-effort: ein toter oder
//! langsamer Empfaenger darf den Fan-out an andere nie aufhalten.

use podium_core::types::VerbindungsId;
use podium_protocol::control::ControlMessage;

/// Abstrakte Senke fuer ausgehende Konferenz-Ereignisse
pub trait EreignisSenke: Send + Sync + 'static {
    /// Sendet an eine einzelne Verbindung
    ///
    /// Gibt `false` zurueck wenn die Verbindung unbekannt ist oder ihre
    /// Queue voll/geschlossen ist. Der Fehler wird nie propagiert.
    fn an_verbindung(&self, id: &VerbindungsId, nachricht: ControlMessage) -> bool;

    /// Sendet an alle registrierten Verbindungen.
    /// Gibt die Anzahl der erfolgreichen Zustellungen zurueck.
    fn an_alle(&self, nachricht: ControlMessage) -> usize;

    /// Sendet an alle Verbindungen ausser einer (typisch: der Ausloeser)
    fn an_alle_ausser(&self, ausser: &VerbindungsId, nachricht: ControlMessage) -> usize;

    /// Sendet nur an Verbindungen die als Admin markiert sind
    fn an_admins(&self, nachricht: ControlMessage) -> usize;

    /// Markiert eine Verbindung als Admin (oder hebt die Markierung auf),
    /// damit `an_admins` das richtige Publikum erreicht
    fn admin_markieren(&self, id: &VerbindungsId, ist_admin: bool);
}
