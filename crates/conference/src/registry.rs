//! Verbindungs-Registry – Wer ist verbunden, mit welcher Rolle
//!
//! Die Registry verwaltet alle lebenden Verbindungen unabhaengig von der
//! Konferenz-Semantik. Rednerliste und Sprecher-Slot referenzieren
//! Verbindungen ausschliesslich per ID, nie per Referenz.
//!
//! ## Bootstrap-Regel
//! Die erste Verbindung einer leeren Konferenz wird automatisch Admin.
//! Verlaesst der letzte Admin die Konferenz waehrend andere Verbindungen
//! bestehen, wird die aelteste verbliebene Verbindung befoerdert
//! (deterministisch: Beitrittsreihenfolge).

use podium_core::types::VerbindungsId;
use podium_protocol::control::Rolle;
use std::collections::HashMap;
use std::time::Instant;

use crate::error::{KonferenzError, KonferenzResult};

/// Minimale Laenge eines Anzeigenamens (nach Trim)
pub const MIN_NAME_LAENGE: usize = 2;

// ---------------------------------------------------------------------------
// Verbindung
// ---------------------------------------------------------------------------

/// Eine registrierte Verbindung
#[derive(Debug, Clone)]
pub struct Verbindung {
    /// Verbindungs-ID (vergeben beim TCP-Accept)
    pub id: VerbindungsId,
    /// Anzeigename aus dem Join-Handshake
    pub anzeigename: String,
    /// Rolle (Teilnehmer oder Admin)
    pub rolle: Rolle,
    /// Beitrittszeitpunkt
    pub beitritt: Instant,
    /// Geraete-Kennung des Clients
    pub geraet: Option<String>,
    /// Freiform-Capabilities aus dem Join-Handshake
    pub capabilities: Option<serde_json::Value>,
}

impl Verbindung {
    /// Ist diese Verbindung Admin?
    pub fn ist_admin(&self) -> bool {
        self.rolle == Rolle::Admin
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Registry aller lebenden Verbindungen
///
/// Haelt zusaetzlich zur Map die Beitrittsreihenfolge, damit die
/// Admin-Nachruecker-Regel deterministisch ist.
#[derive(Debug, Default)]
pub struct Registry {
    verbindungen: HashMap<VerbindungsId, Verbindung>,
    /// Beitrittsreihenfolge (IDs, aelteste zuerst)
    reihenfolge: Vec<VerbindungsId>,
}

impl Registry {
    /// Erstellt eine leere Registry
    pub fn neu() -> Self {
        Self::default()
    }

    /// Validiert einen Anzeigenamen und gibt die getrimmte Form zurueck
    pub fn namen_pruefen(roh: &str) -> KonferenzResult<String> {
        let name = roh.trim();
        if name.chars().count() < MIN_NAME_LAENGE {
            return Err(KonferenzError::UngueltigerName(roh.to_string()));
        }
        Ok(name.to_string())
    }

    /// Registriert eine neue Verbindung
    ///
    /// Die erste Verbindung einer leeren Registry erhaelt die Admin-Rolle
    /// (Bootstrap-Regel). Gibt eine Kopie der fertigen Verbindung zurueck.
    pub fn einfuegen(
        &mut self,
        id: VerbindungsId,
        anzeigename: &str,
        geraet: Option<String>,
        capabilities: Option<serde_json::Value>,
    ) -> KonferenzResult<Verbindung> {
        let name = Self::namen_pruefen(anzeigename)?;

        let rolle = if self.verbindungen.is_empty() {
            Rolle::Admin
        } else {
            Rolle::Participant
        };

        let verbindung = Verbindung {
            id,
            anzeigename: name,
            rolle,
            beitritt: Instant::now(),
            geraet,
            capabilities,
        };

        self.verbindungen.insert(id, verbindung.clone());
        self.reihenfolge.push(id);
        Ok(verbindung)
    }

    /// Entfernt eine Verbindung und gibt sie zurueck
    pub fn entfernen(&mut self, id: &VerbindungsId) -> Option<Verbindung> {
        self.reihenfolge.retain(|v| v != id);
        self.verbindungen.remove(id)
    }

    /// Befoerdert eine Verbindung zum Admin (idempotent)
    ///
    /// Gibt `true` zurueck wenn die Rolle tatsaechlich geaendert wurde.
    pub fn zum_admin_befoerdern(&mut self, id: &VerbindungsId) -> KonferenzResult<bool> {
        let verbindung = self
            .verbindungen
            .get_mut(id)
            .ok_or(KonferenzError::NichtGefunden(*id))?;
        if verbindung.rolle == Rolle::Admin {
            return Ok(false);
        }
        verbindung.rolle = Rolle::Admin;
        Ok(true)
    }

    /// Aelteste Verbindung in Beitrittsreihenfolge (fuer Admin-Nachruecken)
    pub fn aelteste(&self) -> Option<&Verbindung> {
        self.reihenfolge
            .first()
            .and_then(|id| self.verbindungen.get(id))
    }

    /// Lookup per ID
    pub fn get(&self, id: &VerbindungsId) -> Option<&Verbindung> {
        self.verbindungen.get(id)
    }

    /// Ist die Verbindung registriert?
    pub fn enthaelt(&self, id: &VerbindungsId) -> bool {
        self.verbindungen.contains_key(id)
    }

    /// Ist die Verbindung Admin?
    pub fn ist_admin(&self, id: &VerbindungsId) -> bool {
        self.verbindungen
            .get(id)
            .map(Verbindung::ist_admin)
            .unwrap_or(false)
    }

    /// Anzahl registrierter Admins
    pub fn admin_anzahl(&self) -> usize {
        self.verbindungen.values().filter(|v| v.ist_admin()).count()
    }

    /// Anzahl registrierter Verbindungen
    pub fn anzahl(&self) -> usize {
        self.verbindungen.len()
    }

    /// Iteriert in Beitrittsreihenfolge
    pub fn iter(&self) -> impl Iterator<Item = &Verbindung> {
        self.reihenfolge
            .iter()
            .filter_map(|id| self.verbindungen.get(id))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
