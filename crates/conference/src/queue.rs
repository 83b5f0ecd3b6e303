//! Rednerliste – FIFO-Warteschlange der Wortmeldungen
//!
//! Strikte Einfuegereihenfolge, keine Prioritaeten. Positionen sind
//! 1-basiert und werden aus dem Index abgeleitet, nie gespeichert.
//!
//! ## Invarianten
//! - Eine Verbindungs-ID steht hoechstens einmal in der Liste.
//! - Positionen sind nach jeder Operation lueckenlos 1..N.

use podium_core::types::VerbindungsId;
use std::time::Instant;

use crate::error::{KonferenzError, KonferenzResult};

/// Standard-Kapazitaet der Rednerliste
pub const DEFAULT_KAPAZITAET: usize = 50;

/// Ein Eintrag in der Rednerliste
#[derive(Debug, Clone)]
pub struct WarteEintrag {
    /// Verbindungs-ID des wartenden Teilnehmers
    pub id: VerbindungsId,
    /// Zeitpunkt der Wortmeldung
    pub seit: Instant,
}

/// FIFO-Rednerliste mit konfigurierbarer Kapazitaet
#[derive(Debug)]
pub struct Warteschlange {
    eintraege: Vec<WarteEintrag>,
    kapazitaet: usize,
}

impl Warteschlange {
    /// Erstellt eine leere Rednerliste mit Standard-Kapazitaet
    pub fn neu() -> Self {
        Self::mit_kapazitaet(DEFAULT_KAPAZITAET)
    }

    /// Erstellt eine leere Rednerliste mit gegebener Kapazitaet
    pub fn mit_kapazitaet(kapazitaet: usize) -> Self {
        Self {
            eintraege: Vec::new(),
            kapazitaet,
        }
    }

    /// Reiht eine Verbindung ein und gibt ihre 1-basierte Position zurueck
    pub fn einreihen(&mut self, id: VerbindungsId) -> KonferenzResult<u32> {
        if self.enthaelt(&id) {
            return Err(KonferenzError::BereitsEingereiht);
        }
        if self.eintraege.len() >= self.kapazitaet {
            return Err(KonferenzError::ListeVoll(self.kapazitaet));
        }
        self.eintraege.push(WarteEintrag {
            id,
            seit: Instant::now(),
        });
        Ok(self.eintraege.len() as u32)
    }

    /// Traegt eine Verbindung aus und gibt den Eintrag zurueck
    pub fn austragen(&mut self, id: &VerbindungsId) -> KonferenzResult<WarteEintrag> {
        match self.eintraege.iter().position(|e| &e.id == id) {
            Some(index) => Ok(self.eintraege.remove(index)),
            None => Err(KonferenzError::NichtEingereiht),
        }
    }

    /// 1-basierte Position einer Verbindung, falls eingereiht
    pub fn position(&self, id: &VerbindungsId) -> Option<u32> {
        self.eintraege
            .iter()
            .position(|e| &e.id == id)
            .map(|i| (i + 1) as u32)
    }

    /// Steht die Verbindung in der Liste?
    pub fn enthaelt(&self, id: &VerbindungsId) -> bool {
        self.eintraege.iter().any(|e| &e.id == id)
    }

    /// Anzahl wartender Teilnehmer
    pub fn laenge(&self) -> usize {
        self.eintraege.len()
    }

    /// Ist die Liste leer?
    pub fn ist_leer(&self) -> bool {
        self.eintraege.is_empty()
    }

    /// Iteriert in FIFO-Reihenfolge
    pub fn iter(&self) -> impl Iterator<Item = &WarteEintrag> {
        self.eintraege.iter()
    }
}

impl Default for Warteschlange {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
