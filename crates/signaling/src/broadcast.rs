//! Event-Broadcaster – Send-Queues aller verbundenen Clients
//!
//! Der EventBroadcaster verwaltet die Send-Queue jeder Verbindung und
//! implementiert die [`EreignisSenke`] des Konferenz-Kerns. Zustellung
//! ist nicht-blockierend: eine volle oder geschlossene Queue fuehrt zum
//! Verwerfen der Nachricht fuer diesen einen Client, nie zum Blockieren
//! des Senders.
//!
//! Das Admin-Publikum wird als Flag pro Client gefuehrt; der
//! Konferenz-Kern pflegt es ueber `admin_markieren`.

use dashmap::DashMap;
use podium_conference::EreignisSenke;
use podium_core::types::VerbindungsId;
use podium_protocol::control::ControlMessage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Groesse der Send-Queue pro Client
const SEND_QUEUE_GROESSE: usize = 256;

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue eines verbundenen Clients
#[derive(Debug)]
pub struct ClientSender {
    pub id: VerbindungsId,
    tx: mpsc::Sender<ControlMessage>,
    /// Gehoert dieser Client zum Admin-Publikum?
    ist_admin: AtomicBool,
}

impl ClientSender {
    /// Sendet eine Nachricht nicht-blockierend an den Client
    ///
    /// Gibt `false` zurueck wenn die Queue voll oder geschlossen ist.
    pub fn senden(&self, nachricht: ControlMessage) -> bool {
        match self.tx.try_send(nachricht) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(user_id = %self.id, "Send-Queue voll, Nachricht verworfen");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(user_id = %self.id, "Send-Queue geschlossen (Client getrennt)");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// EventBroadcaster
// ---------------------------------------------------------------------------

/// Zentraler Event-Broadcaster fuer alle verbundenen Clients
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone, Default)]
pub struct EventBroadcaster {
    inner: Arc<EventBroadcasterInner>,
}

#[derive(Default)]
struct EventBroadcasterInner {
    clients: DashMap<VerbindungsId, ClientSender>,
}

impl EventBroadcaster {
    /// Erstellt einen neuen EventBroadcaster
    pub fn neu() -> Self {
        Self::default()
    }

    /// Registriert einen neuen Client und gibt seine Empfangs-Queue zurueck
    ///
    /// Die `ClientConnection` liest aus dieser Queue und sendet via TCP.
    pub fn client_registrieren(&self, id: VerbindungsId) -> mpsc::Receiver<ControlMessage> {
        let (tx, rx) = mpsc::channel(SEND_QUEUE_GROESSE);
        self.inner.clients.insert(
            id,
            ClientSender {
                id,
                tx,
                ist_admin: AtomicBool::new(false),
            },
        );
        tracing::debug!(user_id = %id, "Client im Broadcaster registriert");
        rx
    }

    /// Entfernt einen Client aus dem Broadcaster
    pub fn client_entfernen(&self, id: &VerbindungsId) {
        self.inner.clients.remove(id);
        tracing::debug!(user_id = %id, "Client aus Broadcaster entfernt");
    }

    /// Ist der Client registriert?
    pub fn ist_registriert(&self, id: &VerbindungsId) -> bool {
        self.inner.clients.contains_key(id)
    }

    /// Anzahl registrierter Clients
    pub fn anzahl(&self) -> usize {
        self.inner.clients.len()
    }
}

impl EreignisSenke for EventBroadcaster {
    fn an_verbindung(&self, id: &VerbindungsId, nachricht: ControlMessage) -> bool {
        match self.inner.clients.get(id) {
            Some(client) => client.senden(nachricht),
            None => false,
        }
    }

    fn an_alle(&self, nachricht: ControlMessage) -> usize {
        self.inner
            .clients
            .iter()
            .filter(|client| client.senden(nachricht.clone()))
            .count()
    }

    fn an_alle_ausser(&self, ausser: &VerbindungsId, nachricht: ControlMessage) -> usize {
        self.inner
            .clients
            .iter()
            .filter(|client| client.id != *ausser && client.senden(nachricht.clone()))
            .count()
    }

    fn an_admins(&self, nachricht: ControlMessage) -> usize {
        self.inner
            .clients
            .iter()
            .filter(|client| {
                client.ist_admin.load(Ordering::Relaxed) && client.senden(nachricht.clone())
            })
            .count()
    }

    fn admin_markieren(&self, id: &VerbindungsId, ist_admin: bool) {
        if let Some(client) = self.inner.clients.get(id) {
            client.ist_admin.store(ist_admin, Ordering::Relaxed);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use podium_protocol::control::ControlPayload;

    fn ping() -> ControlMessage {
        ControlMessage::ping(1, 0)
    }

    #[tokio::test]
    async fn zustellung_an_registrierte_clients() {
        let broadcaster = EventBroadcaster::neu();
        let a = VerbindungsId::new();
        let b = VerbindungsId::new();
        let mut rx_a = broadcaster.client_registrieren(a);
        let mut rx_b = broadcaster.client_registrieren(b);

        assert_eq!(broadcaster.an_alle(ping()), 2);
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());

        assert_eq!(broadcaster.an_alle_ausser(&a, ping()), 1);
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn admin_publikum_folgt_markierung() {
        let broadcaster = EventBroadcaster::neu();
        let a = VerbindungsId::new();
        let b = VerbindungsId::new();
        let mut rx_a = broadcaster.client_registrieren(a);
        let _rx_b = broadcaster.client_registrieren(b);

        assert_eq!(broadcaster.an_admins(ping()), 0);

        broadcaster.admin_markieren(&a, true);
        assert_eq!(broadcaster.an_admins(ping()), 1);
        assert!(rx_a.try_recv().is_ok());

        broadcaster.admin_markieren(&a, false);
        assert_eq!(broadcaster.an_admins(ping()), 0);
    }

    #[tokio::test]
    async fn entfernter_client_erhaelt_nichts() {
        let broadcaster = EventBroadcaster::neu();
        let a = VerbindungsId::new();
        let _rx = broadcaster.client_registrieren(a);
        broadcaster.client_entfernen(&a);

        assert!(!broadcaster.an_verbindung(&a, ping()));
        assert_eq!(broadcaster.an_alle(ping()), 0);
        assert!(!broadcaster.ist_registriert(&a));
    }

    #[tokio::test]
    async fn volle_queue_blockiert_nicht() {
        let broadcaster = EventBroadcaster::neu();
        let a = VerbindungsId::new();
        let _rx = broadcaster.client_registrieren(a);

        for _ in 0..SEND_QUEUE_GROESSE {
            assert!(broadcaster.an_verbindung(&a, ping()));
        }
        // Queue ist voll: Nachricht wird verworfen statt zu blockieren
        assert!(!broadcaster.an_verbindung(
            &a,
            ControlMessage::ereignis(ControlPayload::AdminPromoted)
        ));
    }
}
