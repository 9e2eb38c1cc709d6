//! Client-Einstellungen fuer Aufnahme und Wiedergabe
//!
//! Alle Felder haben serde-Defaults, damit aeltere Einstellungsdateien
//! ohne Migration weiter geladen werden koennen.

use crate::error::{AudioError, AudioResult};
use serde::{Deserialize, Serialize};

/// Obergrenze fuer die Mikrofon-Verstaerkung
pub const MAX_MIKROFON_VERSTAERKUNG: f32 = 4.0;

/// Obergrenze fuer die Wiedergabe-Lautstaerke
pub const MAX_WIEDERGABE_LAUTSTAERKE: f32 = 6.0;

/// Persistierte Audio-Einstellungen eines Clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Name des Eingabegeraets, `None` = Systemstandard
    pub microphone_device_name: Option<String>,
    /// Name des Ausgabegeraets, `None` = Systemstandard
    pub speaker_device_name: Option<String>,
    /// Verstaerkungsfaktor fuer das eigene Mikrofon, gueltig in (0, 4]
    pub microphone_amplification: f32,
    /// Gesamtlautstaerke empfangener Stimmen, gueltig in [0, 6]
    pub voice_chat_volume: f32,
    /// Tiefen-Glaettung beim Seitenwechsel einer Stimme
    pub smooth_channel_transition: bool,
    /// Eigenes Mikrofon stummgeschaltet
    pub muted: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            microphone_device_name: None,
            speaker_device_name: None,
            microphone_amplification: 1.0,
            voice_chat_volume: 1.0,
            smooth_channel_transition: true,
            muted: false,
        }
    }
}

impl ClientSettings {
    /// Prueft alle Wertebereiche
    pub fn validieren(&self) -> AudioResult<()> {
        pruefe_mikrofon_verstaerkung(self.microphone_amplification)?;
        pruefe_wiedergabe_lautstaerke(self.voice_chat_volume)?;
        Ok(())
    }
}

/// Prueft einen Verstaerkungsfaktor, gueltig in (0, 4]
///
/// Die Negation `!(wert > 0.0)` faengt auch NaN ab.
pub fn pruefe_mikrofon_verstaerkung(wert: f32) -> AudioResult<()> {
    if !(wert > 0.0) || wert > MAX_MIKROFON_VERSTAERKUNG {
        return Err(AudioError::Konfiguration(format!(
            "Mikrofon-Verstaerkung {} ausserhalb (0, {}]",
            wert, MAX_MIKROFON_VERSTAERKUNG
        )));
    }
    Ok(())
}

/// Prueft eine Wiedergabe-Lautstaerke, gueltig in [0, 6]
pub fn pruefe_wiedergabe_lautstaerke(wert: f32) -> AudioResult<()> {
    if !(wert >= 0.0) || wert > MAX_WIEDERGABE_LAUTSTAERKE {
        return Err(AudioError::Konfiguration(format!(
            "Wiedergabe-Lautstaerke {} ausserhalb [0, {}]",
            wert, MAX_WIEDERGABE_LAUTSTAERKE
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
