//! Sample-Konvertierung und Pegelmessung
//!
//! Alle Pfade der Pipeline arbeiten intern mit `i16`-PCM. Die Capture-Seite
//! liefert je nach Geraet `f32`, `i16` oder `u8`, die Wiedergabe braucht
//! wieder `f32`. Die Umrechnungen hier sind die einzige Stelle, an der
//! zwischen den Formaten gewechselt wird.

/// Hoechster Pegel, auf den Verstaerkung und Rauschunterdrueckung
/// normalisieren. Ein Sample unter dem i16-Maximum laesst Spielraum,
/// damit Rundung nie in die Saettigung kippt.
pub const MAX_SICHERER_PEGEL: i32 = 32_766;

/// Skaliert ein einzelnes Sample mit Rundung und Saettigung
#[inline]
pub fn scale_sample(sample: i16, faktor: f32) -> i16 {
    let skaliert = (f32::from(sample) * faktor).round();
    skaliert.clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
}

/// Betrag eines Samples als `i32`
///
/// `i16::MIN` wird auf 32767 gesaettigt statt zu ueberschlagen.
#[inline]
pub fn magnitude(sample: i16) -> i32 {
    i32::from(sample.unsigned_abs().min(i16::MAX as u16))
}

/// Groesster Betrag im Frame, 0 fuer leere Frames
pub fn peak_magnitude(samples: &[i16]) -> i32 {
    samples.iter().map(|&s| magnitude(s)).max().unwrap_or(0)
}

/// Konvertiert Float-Samples (-1.0..=1.0) in 16-bit PCM
pub fn floats_to_shorts(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| {
            let skaliert = (s * f32::from(i16::MAX)).round();
            skaliert.clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
        })
        .collect()
}

/// Konvertiert 16-bit PCM in Float-Samples (-1.0..1.0)
pub fn shorts_to_floats(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| f32::from(s) / 32_768.0).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
