//! Opus Encoder/Decoder Wrapper
//!
//! Kapselt audiopus hinter einer i16-PCM API. Die gesamte Pipeline
//! arbeitet mit festen 20-ms-Frames (960 Samples bei 48 kHz mono),
//! der Encoder laeuft im VoIP-Modus mit Inband-FEC.

use audiopus::{
    coder::{Decoder, Encoder},
    Application, Channels, SampleRate,
};
use tracing::debug;

use crate::error::{AudioError, AudioResult};
use flurfunk_core::konstanten::{ABTASTRATE, FRAME_GROESSE, KANAELE};

/// Obergrenze fuer ein kodiertes Opus-Paket in Bytes
pub const MAX_PAKET_GROESSE: usize = 4000;

/// Codec-Parameter fuer Encoder und Decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    /// Abtastrate in Hz, muss eine Opus-Rate sein
    pub abtastrate: u32,
    /// Kanalanzahl, 1 oder 2
    pub kanaele: u16,
    /// Samples pro Frame und Kanal
    pub frame_groesse: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            abtastrate: ABTASTRATE,
            kanaele: KANAELE,
            frame_groesse: FRAME_GROESSE,
        }
    }
}

impl CodecConfig {
    fn opus_rate(&self) -> AudioResult<SampleRate> {
        match self.abtastrate {
            8_000 => Ok(SampleRate::Hz8000),
            12_000 => Ok(SampleRate::Hz12000),
            16_000 => Ok(SampleRate::Hz16000),
            24_000 => Ok(SampleRate::Hz24000),
            48_000 => Ok(SampleRate::Hz48000),
            andere => Err(AudioError::Konfiguration(format!(
                "Abtastrate {} Hz wird von Opus nicht unterstuetzt",
                andere
            ))),
        }
    }

    fn opus_kanaele(&self) -> AudioResult<Channels> {
        match self.kanaele {
            1 => Ok(Channels::Mono),
            2 => Ok(Channels::Stereo),
            andere => Err(AudioError::Konfiguration(format!(
                "Kanalanzahl {} wird nicht unterstuetzt",
                andere
            ))),
        }
    }

    /// Prueft alle Parameter
    pub fn validieren(&self) -> AudioResult<()> {
        self.opus_rate()?;
        self.opus_kanaele()?;
        if self.frame_groesse == 0 {
            return Err(AudioError::Konfiguration(
                "Frame-Groesse 0 ist ungueltig".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Encoder
// ---------------------------------------------------------------------------

/// Opus-Encoder: kodiert i16-PCM-Frames zu Opus-Bytes
pub struct StimmEncoder {
    encoder: Encoder,
    frame_groesse: usize,
}

impl StimmEncoder {
    /// Erstellt einen Encoder im VoIP-Modus mit Inband-FEC
    pub fn neu(konfig: &CodecConfig) -> AudioResult<Self> {
        konfig.validieren()?;

        let mut encoder = Encoder::new(konfig.opus_rate()?, konfig.opus_kanaele()?, Application::Voip)
            .map_err(|e| AudioError::CodecFehler(e.to_string()))?;

        encoder
            .set_inband_fec(true)
            .map_err(|e| AudioError::CodecFehler(e.to_string()))?;

        debug!(
            "StimmEncoder erstellt: {} Hz, {} Kanaele, frame_groesse={}",
            konfig.abtastrate, konfig.kanaele, konfig.frame_groesse
        );

        Ok(Self {
            encoder,
            frame_groesse: konfig.frame_groesse,
        })
    }

    /// Kodiert einen PCM-Frame zu Opus-Bytes
    ///
    /// Die Eingabe muss exakt `frame_groesse()` Samples lang sein.
    pub fn encode(&mut self, pcm: &[i16]) -> AudioResult<Vec<u8>> {
        if pcm.len() != self.frame_groesse {
            return Err(AudioError::UngueltigeFrameGroesse {
                ist: pcm.len(),
                erwartet: self.frame_groesse,
            });
        }

        let mut ausgabe = vec![0u8; MAX_PAKET_GROESSE];
        let geschrieben = self
            .encoder
            .encode(pcm, &mut ausgabe)
            .map_err(|e| AudioError::CodecFehler(e.to_string()))?;

        ausgabe.truncate(geschrieben);
        Ok(ausgabe)
    }

    /// Erwartete Frame-Groesse in Samples
    pub fn frame_groesse(&self) -> usize {
        self.frame_groesse
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Opus-Decoder: dekodiert Opus-Bytes zu i16-PCM
///
/// Unbrauchbare Pakete sind im Netzbetrieb Alltag und kein Fehlerfall,
/// `decode` liefert dafuer `None`.
pub struct StimmDecoder {
    decoder: Decoder,
    frame_groesse: usize,
}

impl StimmDecoder {
    /// Erstellt einen Decoder
    pub fn neu(konfig: &CodecConfig) -> AudioResult<Self> {
        konfig.validieren()?;

        let decoder = Decoder::new(konfig.opus_rate()?, konfig.opus_kanaele()?)
            .map_err(|e| AudioError::CodecFehler(e.to_string()))?;

        debug!(
            "StimmDecoder erstellt: {} Hz, frame_groesse={}",
            konfig.abtastrate, konfig.frame_groesse
        );

        Ok(Self {
            decoder,
            frame_groesse: konfig.frame_groesse,
        })
    }

    /// Dekodiert Opus-Bytes zu einem PCM-Frame
    ///
    /// Gibt `None` zurueck wenn das Paket leer, beschaedigt oder ohne
    /// Samples ist. Solche Frames werden vom Aufrufer verworfen.
    pub fn decode(&mut self, daten: &[u8]) -> Option<Vec<i16>> {
        self.dekodiere(daten, false)
    }

    /// Dekodiert mit Inband-FEC-Daten des Folgepakets
    ///
    /// Rekonstruiert einen verlorenen Frame aus der Redundanz im
    /// naechsten empfangenen Paket.
    pub fn decode_fec(&mut self, daten: &[u8]) -> Option<Vec<i16>> {
        self.dekodiere(daten, true)
    }

    fn dekodiere(&mut self, daten: &[u8], fec: bool) -> Option<Vec<i16>> {
        if daten.is_empty() {
            return None;
        }

        let mut ausgabe = vec![0i16; self.frame_groesse];
        let dekodiert = match self.decoder.decode(Some(daten), &mut ausgabe, fec) {
            Ok(anzahl) => anzahl,
            Err(e) => {
                debug!(fehler = %e, "Opus-Paket nicht dekodierbar, verworfen");
                return None;
            }
        };

        if dekodiert < 1 {
            return None;
        }
        ausgabe.truncate(dekodiert);
        Some(ausgabe)
    }

    /// Erwartete Frame-Groesse in Samples
    pub fn frame_groesse(&self) -> usize {
        self.frame_groesse
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
