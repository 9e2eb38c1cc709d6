//! Feste Audio-Parameter der Voice-Pipeline
//!
//! Alle Stufen der Pipeline (Capture, DSP, Codec, Playback) arbeiten auf
//! Frames exakt dieser Groesse. Die Werte sind aufeinander abgestimmt:
//! 48 kHz Mono bei 20 ms ergibt 960 Samples pro Frame.

/// Abtastrate der Pipeline in Hz
pub const ABTASTRATE: u32 = 48_000;

/// Kanalanzahl der Aufnahme (Mono)
pub const KANAELE: u16 = 1;

/// Frame-Dauer in Millisekunden
pub const FRAME_DAUER_MS: u32 = 20;

/// Samples pro Frame (Abtastrate / 1000 * Frame-Dauer)
pub const FRAME_GROESSE: usize = (ABTASTRATE / 1000 * FRAME_DAUER_MS) as usize;
