//! flurfunk-core – Gemeinsame Typen und Konstanten
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Flurfunk-Crates gemeinsam genutzt werden: Spieler-Identitaeten,
//! Team- und Szenen-Typen, relative Positionen sowie die festen
//! Audio-Parameter der Pipeline.

pub mod konstanten;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use types::{PlayerId, Position, SceneId, Spieler, Team};
