//! Mikrofon-Verstaerkung mit Uebersteuerungsschutz
//!
//! Der gewuenschte Verstaerkungsfaktor wird pro Frame gegen ein
//! gleitendes Fenster der zuletzt sicheren Faktoren gedeckelt. Ein
//! einzelner lauter Frame drueckt den wirksamen Faktor damit fuer die
//! naechste Sekunde nach unten statt hoerbar zu verzerren.

use crate::signal::{peak_magnitude, scale_sample, MAX_SICHERER_PEGEL};

/// Fenstergroesse in Frames (50 Frames = 1 Sekunde bei 20 ms)
pub const GAIN_FENSTER: usize = 50;

/// Verstaerker mit gleitendem Clipping-Schutz
pub struct Verstaerker {
    /// Ring der maximal sicheren Faktoren der letzten Frames
    fenster: [f32; GAIN_FENSTER],
    position: usize,
    belegt: usize,
}

impl Verstaerker {
    pub fn neu() -> Self {
        Self {
            fenster: [1.0; GAIN_FENSTER],
            position: 0,
            belegt: 0,
        }
    }

    /// Verstaerkt einen Frame in-place und gibt den wirksamen Faktor zurueck
    ///
    /// Der wirksame Faktor ist das Minimum aus dem gewuenschten Faktor
    /// und dem kleinsten sicheren Faktor im Fenster.
    pub fn amplify(&mut self, frame: &mut [i16], gewuenscht: f32) -> f32 {
        self.merke_sicheren_faktor(frame);

        let wirksam = gewuenscht.min(self.fenster_minimum());
        if wirksam != 1.0 {
            for sample in frame.iter_mut() {
                *sample = scale_sample(*sample, wirksam);
            }
        }
        wirksam
    }

    /// Verwirft die Fenster-Historie, etwa nach einem Geraetewechsel
    pub fn zuruecksetzen(&mut self) {
        self.position = 0;
        self.belegt = 0;
    }

    fn merke_sicheren_faktor(&mut self, frame: &[i16]) {
        let peak = peak_magnitude(frame);
        // Stille liefert keine Information ueber den sicheren Faktor,
        // der Eintrag 1.0 haelt das Fenster konservativ.
        let sicher = if peak == 0 {
            1.0
        } else {
            MAX_SICHERER_PEGEL as f32 / peak as f32
        };

        self.fenster[self.position] = sicher;
        self.position = (self.position + 1) % GAIN_FENSTER;
        self.belegt = (self.belegt + 1).min(GAIN_FENSTER);
    }

    fn fenster_minimum(&self) -> f32 {
        self.fenster[..self.belegt]
            .iter()
            .copied()
            .fold(f32::INFINITY, f32::min)
    }
}

impl Default for Verstaerker {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
