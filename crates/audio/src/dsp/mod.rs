//! DSP-Bausteine der Aufnahmeseite
//!
//! Die Capture-Pipeline verarbeitet jeden 20-ms-Frame in fester
//! Reihenfolge: Verstaerkung mit Uebersteuerungsschutz, dann
//! Rauschunterdrueckung, dann Sprachaktivitaetserkennung.

pub mod denoise;
pub mod gain;
pub mod vad;

pub use denoise::{RauschFilter, SuppressionLevel, SUB_FRAME_GROESSE};
pub use gain::{Verstaerker, GAIN_FENSTER};
pub use vad::{OperatingMode, Vad};
