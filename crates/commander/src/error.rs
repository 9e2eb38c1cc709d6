//! Fehlertypen der Befehlsverarbeitung
//!
//! Jeder Fehler traegt einen Text, der unveraendert als Rueckmeldung an
//! den ausfuehrenden Spieler geht.

use flurfunk_audio::AudioError;
use thiserror::Error;

/// Fehler bei der Ausfuehrung eines Verwaltungsbefehls
#[derive(Debug, Error)]
pub enum CommanderError {
    /// Befehlswort nicht erkannt
    #[error("Unbekannter Befehl: {0}")]
    UnbekannterBefehl(String),

    /// Einstellungsname weder als Name noch als Alias bekannt
    #[error("Unbekannte Einstellung: {0}")]
    UnbekannteEinstellung(String),

    /// Wert fehlt, laesst sich nicht parsen oder liegt ausserhalb des Bereichs
    #[error("Ungueltige Eingabe: {0}")]
    UngueltigeEingabe(String),

    /// Fehler aus der Audio-Schicht (Geraete, Aufnahme-Neustart)
    #[error("Audio: {0}")]
    Audio(#[from] AudioError),
}

/// Result-Alias fuer Befehlsausfuehrung
pub type CommanderResult<T> = Result<T, CommanderError>;
