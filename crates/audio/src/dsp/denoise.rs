//! Rauschunterdrueckung via spektrale Subtraktion
//!
//! Zeitbereich-Naeherung in drei Stufen: Der Rauschpegel wird waehrend
//! Stille per exponentieller Glaettung geschaetzt und vom Signal
//! subtrahiert. Verarbeitet wird in 10-ms-Unterbloecken, damit die
//! Schaetzung innerhalb eines 20-ms-Frames nachfuehren kann.

use crate::signal::{floats_to_shorts, shorts_to_floats};

/// Unterblock-Groesse in Samples (10 ms bei 48 kHz)
pub const SUB_FRAME_GROESSE: usize = 480;

/// Stufe der Rauschunterdrueckung
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuppressionLevel {
    /// Leichte Rauschreduzierung (alpha = 1.5)
    Low,
    /// Mittlere Rauschreduzierung (alpha = 2.5)
    #[default]
    Medium,
    /// Starke Rauschreduzierung (alpha = 4.0)
    High,
}

impl SuppressionLevel {
    /// Subtraktions-Faktor (alpha)
    fn alpha(&self) -> f32 {
        match self {
            Self::Low => 1.5,
            Self::Medium => 2.5,
            Self::High => 4.0,
        }
    }

    /// Minimaler Gain nach Subtraktion (Floor, verhindert musical noise)
    fn spectral_floor(&self) -> f32 {
        match self {
            Self::Low => 0.2,
            Self::Medium => 0.1,
            Self::High => 0.05,
        }
    }
}

/// Rauschunterdruecker fuer i16-PCM-Frames
pub struct RauschFilter {
    stufe: SuppressionLevel,
    /// Geschaetzter Rauschpegel (RMS, normalisiert)
    rausch_schaetzung: f32,
    /// Glaettungsfaktor fuer die Rauschschaetzung
    glaettung: f32,
    /// Frames unterhalb dieses RMS-Pegels gelten als Rauschen
    stille_schwelle: f32,
}

impl RauschFilter {
    pub fn neu(stufe: SuppressionLevel) -> Self {
        Self {
            stufe,
            rausch_schaetzung: 0.0,
            glaettung: 0.95,
            stille_schwelle: 0.02,
        }
    }

    /// Unterdrueckt Rauschen in-place, Unterblock fuer Unterblock
    pub fn process(&mut self, frame: &mut [i16]) {
        for block in frame.chunks_mut(SUB_FRAME_GROESSE) {
            self.verarbeite_block(block);
        }
    }

    /// Setzt die Rauschschaetzung zurueck, etwa nach einem Geraetewechsel
    pub fn zuruecksetzen(&mut self) {
        self.rausch_schaetzung = 0.0;
    }

    /// Aktuelle Rauschschaetzung (normalisiertes RMS)
    pub fn rausch_schaetzung(&self) -> f32 {
        self.rausch_schaetzung
    }

    /// Wechselt die Unterdrueckungsstufe
    pub fn set_stufe(&mut self, stufe: SuppressionLevel) {
        self.stufe = stufe;
    }

    fn verarbeite_block(&mut self, block: &mut [i16]) {
        let mut samples = shorts_to_floats(block);
        let block_rms = rms(&samples);

        // Rauschschaetzung nur waehrend Stille nachfuehren
        if block_rms < self.stille_schwelle {
            self.rausch_schaetzung = self.glaettung * self.rausch_schaetzung
                + (1.0 - self.glaettung) * block_rms;
        }

        if self.rausch_schaetzung < 1e-7 {
            return;
        }

        // Gain = max(floor, 1 - alpha * (rauschen / signal))
        let gain = if block_rms > 1e-7 {
            let verhaeltnis = self.rausch_schaetzung / block_rms;
            (1.0 - self.stufe.alpha() * verhaeltnis).max(self.stufe.spectral_floor())
        } else {
            self.stufe.spectral_floor()
        };

        for sample in samples.iter_mut() {
            *sample *= gain;
        }
        block.copy_from_slice(&floats_to_shorts(&samples));
    }
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let quadratsumme: f32 = samples.iter().map(|s| s * s).sum();
    (quadratsumme / samples.len() as f32).sqrt()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
