//! flurfunk-audio – Client Audio Engine
//!
//! Vollstaendige Audio-Pipeline fuer Flurfunk:
//! - Mikrofon-Capture via cpal
//! - Lautsprecher-Playback via cpal mit Distanz und Stereo-Panorama
//! - Opus Encoding/Decoding mit Inband-FEC
//! - DSP: Verstaerkung mit Sicherheitsfenster, Rauschunterdrueckung, VAD
//! - Sprachaktivierung mit Rueckblick-Frame und Hangover
//! - Speaker-Pool mit einer Stimme pro Mitspieler

pub mod capture;
pub mod codec;
pub mod config;
pub mod device;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod output;
pub mod playback;
pub mod signal;
pub mod spatial;

// Bequeme Re-Exporte der wichtigsten Typen
pub use capture::{CaptureConfig, CaptureSteuerung, MicCapture};
pub use codec::{CodecConfig, StimmDecoder, StimmEncoder};
pub use config::ClientSettings;
pub use device::{
    input_device_with_fallback, list_input_devices, list_output_devices,
    output_device_with_fallback,
};
pub use dsp::{OperatingMode, RauschFilter, SuppressionLevel, Vad, Verstaerker};
pub use engine::AudioEngine;
pub use error::{AudioError, AudioResult};
pub use output::{CpalVoice, OutputVoice, PlaybackState};
pub use playback::{Speaker, SpeakerPool};
