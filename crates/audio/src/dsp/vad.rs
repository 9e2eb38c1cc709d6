//! Sprachaktivitaetserkennung (VAD)
//!
//! Energie-basierte Erkennung kombiniert mit der Zero-Crossing-Rate:
//! Sprache hat hoerbare Energie bei moderater ZCR, Zischen und
//! Breitbandrauschen fallen durch die ZCR-Schranke. Die Klassifikation
//! ist pro Frame zustandslos, das Nachhalten ueber Frame-Grenzen
//! uebernimmt die Capture-Pipeline.

use tracing::warn;

use crate::error::{AudioError, AudioResult};

/// Aggressivitaet der Erkennung
///
/// Hoehere Stufen verlangen mehr Energie und sauberere ZCR, melden
/// also seltener Sprache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperatingMode {
    /// Stufe 0: meldet am ehesten Sprache
    HighQuality = 0,
    /// Stufe 1
    LowBitrate = 1,
    /// Stufe 2
    Aggressive = 2,
    /// Stufe 3: meldet am seltensten Sprache
    #[default]
    VeryAggressive = 3,
}

impl OperatingMode {
    /// Energie-Schwellenwert (normalisiertes RMS)
    fn energie_schwelle(&self) -> f32 {
        match self {
            Self::HighQuality => 0.0015,
            Self::LowBitrate => 0.003,
            Self::Aggressive => 0.006,
            Self::VeryAggressive => 0.012,
        }
    }

    /// ZCR-Schwellenwert (Nulldurchgaenge pro Sample-Paar)
    fn zcr_schwelle(&self) -> f32 {
        match self {
            Self::HighQuality => 0.35,
            Self::LowBitrate => 0.30,
            Self::Aggressive => 0.25,
            Self::VeryAggressive => 0.20,
        }
    }
}

/// Sprachaktivitaets-Detektor mit fester Frame-Geometrie
pub struct Vad {
    modus: OperatingMode,
    frame_groesse: usize,
}

impl Vad {
    /// Erstellt einen Detektor
    ///
    /// Abtastrate und Frame-Dauer werden einmal beim Erstellen geprueft,
    /// `has_speech` verlaesst sich danach auf die feste Geometrie.
    pub fn neu(abtastrate: u32, frame_ms: u32, modus: OperatingMode) -> AudioResult<Self> {
        if !matches!(abtastrate, 8_000 | 16_000 | 32_000 | 48_000) {
            return Err(AudioError::Konfiguration(format!(
                "VAD unterstuetzt Abtastrate {} Hz nicht",
                abtastrate
            )));
        }
        if !matches!(frame_ms, 10 | 20 | 30) {
            return Err(AudioError::Konfiguration(format!(
                "VAD unterstuetzt Frame-Dauer {} ms nicht",
                frame_ms
            )));
        }

        Ok(Self {
            modus,
            frame_groesse: (abtastrate / 1000 * frame_ms) as usize,
        })
    }

    /// Klassifiziert einen Frame, zustandslos
    ///
    /// Frames mit falscher Laenge werden als Stille gewertet und
    /// geloggt statt die Pipeline zu reissen.
    pub fn has_speech(&self, frame: &[i16]) -> bool {
        if frame.len() != self.frame_groesse {
            warn!(
                ist = frame.len(),
                erwartet = self.frame_groesse,
                "VAD-Frame mit falscher Laenge, als Stille gewertet"
            );
            return false;
        }

        let energie = rms_energie(frame);
        let zcr = zero_crossing_rate(frame);

        energie > self.modus.energie_schwelle() && zcr < self.modus.zcr_schwelle()
    }

    /// Aktuelle Aggressivitaetsstufe
    pub fn modus(&self) -> OperatingMode {
        self.modus
    }

    /// Wechselt die Aggressivitaetsstufe
    pub fn set_modus(&mut self, modus: OperatingMode) {
        self.modus = modus;
    }

    /// Erwartete Frame-Groesse in Samples
    pub fn frame_groesse(&self) -> usize {
        self.frame_groesse
    }
}

/// Normalisiertes RMS eines i16-Frames
pub fn rms_energie(frame: &[i16]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let quadratsumme: f32 = frame
        .iter()
        .map(|&s| {
            let norm = f32::from(s) / 32_768.0;
            norm * norm
        })
        .sum();
    (quadratsumme / frame.len() as f32).sqrt()
}

/// Normalisierte Zero-Crossing-Rate
pub fn zero_crossing_rate(frame: &[i16]) -> f32 {
    if frame.len() < 2 {
        return 0.0;
    }
    let durchgaenge = frame
        .windows(2)
        .filter(|paar| (paar[0] >= 0) != (paar[1] >= 0))
        .count();
    durchgaenge as f32 / (frame.len() - 1) as f32
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
