//! podium-relay – Audio-Segment-Pipeline
//!
//! Nimmt Segmente des aktiven Sprechers entgegen, misst Latenz, leitet
//! eine Qualitaetsstufe ab, bestaetigt an den Sender und faechert das
//! Segment an alle anderen Verbindungen auf. Die Payload bleibt opak;
//! eine Transkodier-Schnittstelle erlaubt Format-Anpassung, faellt bei
//! Fehlern aber immer auf die Original-Payload zurueck.

pub mod error;
pub mod pipeline;
pub mod qualitaet;
pub mod transcode;

pub use error::{RelayError, RelayResult};
pub use pipeline::{AudioRelay, RelayKonfiguration};
pub use qualitaet::QualitaetsHeuristik;
pub use transcode::{KeinTranskodierer, Transkodierer};
