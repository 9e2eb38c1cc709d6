//! Fehlertypen der Server-Seite

use thiserror::Error;

/// Fehler beim Laden oder Speichern der Server-Einstellungen
#[derive(Debug, Error)]
pub enum VoiceError {
    /// Einstellungsdatei nicht lesbar oder schreibbar
    #[error("Einstellungsdatei: {0}")]
    Io(#[from] std::io::Error),

    /// Einstellungsdatei enthaelt kein gueltiges JSON
    #[error("Einstellungsformat: {0}")]
    Format(#[from] serde_json::Error),
}

/// Result-Alias fuer Voice-Server-Operationen
pub type VoiceResult<T> = Result<T, VoiceError>;
