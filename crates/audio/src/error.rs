//! Fehlertypen fuer die Audio-Pipeline

use thiserror::Error;

/// Fehler innerhalb der Audio-Pipeline
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Kein Standard-Eingabegeraet vorhanden")]
    KeinStandardEingabegeraet,

    #[error("Kein Standard-Ausgabegeraet vorhanden")]
    KeinStandardAusgabegeraet,

    #[error("Stream-Fehler: {0}")]
    StreamFehler(String),

    #[error("Codec-Fehler: {0}")]
    CodecFehler(String),

    #[error("Ungueltige Konfiguration: {0}")]
    Konfiguration(String),

    #[error("Ungueltige Frame-Groesse: {ist} Samples (erwartet {erwartet})")]
    UngueltigeFrameGroesse { ist: usize, erwartet: usize },

    #[error("Ring-Buffer voll, Samples verworfen")]
    RingBufferVoll,

    #[error("I/O-Fehler: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Result-Alias fuer Audio-Operationen
pub type AudioResult<T> = Result<T, AudioError>;
