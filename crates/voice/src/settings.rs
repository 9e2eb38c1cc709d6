//! Persistierte Routing-Einstellungen des Servers
//!
//! Flaches JSON-Dokument mit den drei Routing-Schaltern. Fehlt die Datei
//! oder ist sie unlesbar, gelten die Standardwerte. Jede administrative
//! Aenderung schreibt die Datei neu.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{VoiceError, VoiceResult};

/// Routing-Schalter des Servers
///
/// Die Felder entsprechen eins zu eins der Zustellentscheidung in
/// [`crate::router::entscheide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Nur Teamkollegen hoeren sich gegenseitig
    pub team_voices_only: bool,
    /// Teamkollegen hoeren sich szenen- und distanzunabhaengig
    pub team_voices_globally: bool,
    /// Zustellungen in derselben Szene werden positional abgespielt
    pub proximity_based_volume: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            team_voices_only: false,
            team_voices_globally: false,
            proximity_based_volume: true,
        }
    }
}

impl ServerSettings {
    /// Laedt die Einstellungen, bei fehlender oder kaputter Datei Standardwerte
    pub fn laden(pfad: &Path) -> Self {
        match Self::lese(pfad) {
            Ok(einstellungen) => {
                debug!(pfad = %pfad.display(), "Server-Einstellungen geladen");
                einstellungen
            }
            Err(VoiceError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                debug!(
                    pfad = %pfad.display(),
                    "Keine Einstellungsdatei vorhanden, Standardwerte aktiv"
                );
                Self::default()
            }
            Err(e) => {
                warn!(
                    pfad = %pfad.display(),
                    fehler = %e,
                    "Server-Einstellungen unlesbar, Standardwerte aktiv"
                );
                Self::default()
            }
        }
    }

    fn lese(pfad: &Path) -> VoiceResult<Self> {
        let inhalt = fs::read_to_string(pfad)?;
        Ok(serde_json::from_str(&inhalt)?)
    }

    /// Schreibt die Einstellungen als JSON-Datei
    pub fn speichern(&self, pfad: &Path) -> VoiceResult<()> {
        let inhalt = serde_json::to_string_pretty(self)?;
        fs::write(pfad, inhalt)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
