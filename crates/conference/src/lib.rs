//! podium-conference – Konferenz-Kern
//!
//! Dieses Crate besitzt den gesamten Konferenz-Zustand: Verbindungs-Registry,
//! Rednerliste (FIFO-Warteschlange), den Sitzungs-Zustandsautomaten mit dem
//! einen aktiven Sprecher-Slot und das Admin-Autoritaets-Gate.
//!
//! ## Architektur
//!
//! ```text
//! Konferenz (Arc-geteilt, eine Mutex als Serialisierungspunkt)
//!     |
//!     +-- Registry        (Verbindungen, Rollen, Beitrittsreihenfolge)
//!     +-- Warteschlange   (FIFO-Rednerliste)
//!     +-- AktiverSprecher (0 oder 1, Timeout-Timer, Statistik)
//!     |
//!     v
//! EreignisSenke (Trait) – Zustellung an Clients, implementiert im
//! Signaling-Crate. Der Kern kennt keine Transport-Interna.
//! ```
//!
//! ## Invarianten
//! - Systemweit existiert hoechstens ein aktiver Sprecher; die Freigabe
//!   eines neuen Sprechers beendet einen aktiven zwingend zuerst.
//! - Eine Verbindung steht hoechstens einmal in der Rednerliste.
//! - Disconnect raeumt synchron auf: Rednerliste, Sprecher-Slot, Admin-Set.

pub mod error;
pub mod konferenz;
pub mod queue;
pub mod registry;
pub mod roster;
pub mod session;
pub mod sink;

// Bequeme Re-Exporte
pub use error::{KonferenzError, KonferenzResult};
pub use konferenz::{Konferenz, KonferenzKonfiguration, SegmentVerbucht};
pub use queue::Warteschlange;
pub use registry::{Registry, Verbindung};
pub use session::{AktiverSprecher, AudioStatistik};
pub use sink::EreignisSenke;
