//! Wiedergabequellen fuer einzelne Stimmen
//!
//! `OutputVoice` abstrahiert eine Quelle mit Buffer-Warteschlange,
//! angelehnt an klassische 3D-Audio-Quellen: Frames werden eingereiht,
//! abgespielte Frames werden explizit wieder ausgereiht, und eine
//! leergelaufene Quelle stoppt von selbst.
//!
//! `CpalVoice` bildet das auf einen cpal-Ausgabestream ab. Der Stream
//! ist nicht Send und lebt deshalb in einem eigenen Thread pro Stimme,
//! der Produzent schreibt lock-frei in dessen Ring-Buffer.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use crossbeam_channel::bounded;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tracing::{debug, error};

use crate::device;
use crate::error::{AudioError, AudioResult};
use crate::spatial::stereo_weights;
use flurfunk_core::konstanten::ABTASTRATE;

/// Wartezeit auf die Bereitschaftsmeldung des Stream-Threads
const STREAM_START_FRIST: Duration = Duration::from_secs(2);

/// Weckintervall des Stream-Threads fuer die Ende-Pruefung
const STREAM_PARK_INTERVALL: Duration = Duration::from_millis(50);

/// Zustand einer Wiedergabequelle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Noch nie gespielt
    Initial,
    /// Spielt gerade
    Playing,
    /// Gestoppt oder leergelaufen
    Stopped,
}

const ZUSTAND_INITIAL: u8 = 0;
const ZUSTAND_PLAYING: u8 = 1;
const ZUSTAND_STOPPED: u8 = 2;

fn zustand_aus_u8(wert: u8) -> PlaybackState {
    match wert {
        ZUSTAND_PLAYING => PlaybackState::Playing,
        ZUSTAND_STOPPED => PlaybackState::Stopped,
        _ => PlaybackState::Initial,
    }
}

/// Wiedergabequelle einer einzelnen Stimme
///
/// Alle Mengenangaben sind Frames beziehungsweise Mono-Samples, die
/// Stereo-Aufbereitung ist Sache der Implementierung.
pub trait OutputVoice: Send {
    /// Eingereihte, noch nicht ausgereihte Frames
    fn queued_buffers(&self) -> usize;

    /// Vollstaendig abgespielte Frames, die auf Ausreihung warten
    fn processed_buffers(&self) -> usize;

    /// Reiht abgespielte Frames aus und gibt deren Anzahl zurueck
    fn unqueue_processed(&mut self) -> usize;

    /// Reiht einen Mono-Frame mit Lautstaerke und Panorama ein
    fn queue_buffer(&mut self, frame: &[i16], verstaerkung: f32, pan: f32) -> AudioResult<()>;

    /// Startet oder setzt die Wiedergabe fort
    fn play(&mut self) -> AudioResult<()>;

    /// Haelt die Wiedergabe an
    ///
    /// Bei gestoppter Quelle gelten alle eingereihten Frames als
    /// abgespielt und sind ausreihbar.
    fn stop(&mut self) -> AudioResult<()>;

    /// Aktueller Wiedergabezustand
    fn state(&self) -> PlaybackState;

    /// Ueberspringt die naechsten Mono-Samples in der Warteschlange
    ///
    /// Rueckgriff bei erschoepfter Buffer-Warteschlange: der aelteste
    /// Frame wird uebersprungen statt neue Frames zu verwerfen.
    fn advance_samples(&mut self, mono_samples: usize);
}

// ---------------------------------------------------------------------------
// CpalVoice
// ---------------------------------------------------------------------------

/// Mit dem cpal-Callback geteilter Zustand
struct VoiceShared {
    zustand: AtomicU8,
    /// Vom Callback verbrauchte Stereo-Samples (abgespielt oder uebersprungen)
    verbraucht: AtomicU64,
    /// Angeforderte, noch nicht ausgefuehrte Sprung-Samples (stereo)
    vorspulen: AtomicU64,
}

/// Wiedergabequelle auf einem cpal-Ausgabestream
///
/// Spielt mono eingereihte Frames als Stereo mit Konstant-Leistungs-Pan.
pub struct CpalVoice {
    shared: Arc<VoiceShared>,
    producer: HeapProd<f32>,
    /// Kumulierte Stereo-Endpositionen der eingereihten Frames
    ausstehend: VecDeque<u64>,
    /// Insgesamt geschriebene Stereo-Samples
    geschrieben: u64,
    beenden: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl CpalVoice {
    /// Oeffnet eine Quelle auf dem gegebenen Ausgabegeraet
    ///
    /// `puffer_frames` bestimmt die Ring-Kapazitaet. `None` nutzt das
    /// Standard-Ausgabegeraet.
    pub fn open(
        geraet: Option<&str>,
        frame_groesse: usize,
        puffer_frames: usize,
    ) -> AudioResult<Self> {
        let shared = Arc::new(VoiceShared {
            zustand: AtomicU8::new(ZUSTAND_INITIAL),
            verbraucht: AtomicU64::new(0),
            vorspulen: AtomicU64::new(0),
        });
        let beenden = Arc::new(AtomicBool::new(false));

        let rb = HeapRb::<f32>::new(puffer_frames * frame_groesse * 2);
        let (producer, consumer) = rb.split();

        let (bereit_tx, bereit_rx) = bounded::<AudioResult<()>>(1);
        let shared_thread = Arc::clone(&shared);
        let beenden_thread = Arc::clone(&beenden);
        let geraet_name = geraet.map(String::from);

        let handle = thread::Builder::new()
            .name("flurfunk-voice-out".into())
            .spawn(move || {
                stream_schleife(geraet_name, shared_thread, consumer, beenden_thread, bereit_tx)
            })?;

        match bereit_rx.recv_timeout(STREAM_START_FRIST) {
            Ok(Ok(())) => Ok(Self {
                shared,
                producer,
                ausstehend: VecDeque::new(),
                geschrieben: 0,
                beenden,
                thread: Some(handle),
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                beenden.store(true, Ordering::Relaxed);
                Err(AudioError::StreamFehler(
                    "Ausgabestream meldet keine Bereitschaft".into(),
                ))
            }
        }
    }

    /// Verbrauchsstand fuer die Ausreihung
    ///
    /// Eine gestoppte Quelle gibt alle eingereihten Frames frei.
    fn wirksam_verbraucht(&self) -> u64 {
        if self.state() == PlaybackState::Stopped {
            self.geschrieben
        } else {
            self.shared.verbraucht.load(Ordering::Relaxed)
        }
    }
}

impl OutputVoice for CpalVoice {
    fn queued_buffers(&self) -> usize {
        self.ausstehend.len()
    }

    fn processed_buffers(&self) -> usize {
        let verbraucht = self.wirksam_verbraucht();
        self.ausstehend
            .iter()
            .take_while(|&&ende| ende <= verbraucht)
            .count()
    }

    fn unqueue_processed(&mut self) -> usize {
        let verbraucht = self.wirksam_verbraucht();
        let mut entfernt = 0;
        while let Some(&ende) = self.ausstehend.front() {
            if ende > verbraucht {
                break;
            }
            self.ausstehend.pop_front();
            entfernt += 1;
        }
        entfernt
    }

    fn queue_buffer(&mut self, frame: &[i16], verstaerkung: f32, pan: f32) -> AudioResult<()> {
        let (links, rechts) = stereo_weights(pan);

        let mut stereo = Vec::with_capacity(frame.len() * 2);
        for &sample in frame {
            let pegel = f32::from(sample) / 32_768.0 * verstaerkung;
            stereo.push((pegel * links).clamp(-1.0, 1.0));
            stereo.push((pegel * rechts).clamp(-1.0, 1.0));
        }

        if self.producer.vacant_len() < stereo.len() {
            return Err(AudioError::RingBufferVoll);
        }
        self.producer.push_slice(&stereo);

        self.geschrieben += stereo.len() as u64;
        self.ausstehend.push_back(self.geschrieben);
        Ok(())
    }

    fn play(&mut self) -> AudioResult<()> {
        self.shared.zustand.store(ZUSTAND_PLAYING, Ordering::Relaxed);
        Ok(())
    }

    fn stop(&mut self) -> AudioResult<()> {
        self.shared.zustand.store(ZUSTAND_STOPPED, Ordering::Relaxed);
        Ok(())
    }

    fn state(&self) -> PlaybackState {
        zustand_aus_u8(self.shared.zustand.load(Ordering::Relaxed))
    }

    fn advance_samples(&mut self, mono_samples: usize) {
        self.shared
            .vorspulen
            .fetch_add(mono_samples as u64 * 2, Ordering::Relaxed);
    }
}

impl Drop for CpalVoice {
    fn drop(&mut self) {
        self.beenden.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                error!("Ausgabestream-Thread mit Panik beendet");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Stream-Thread
// ---------------------------------------------------------------------------

fn stream_schleife(
    geraet_name: Option<String>,
    shared: Arc<VoiceShared>,
    consumer: HeapCons<f32>,
    beenden: Arc<AtomicBool>,
    bereit_tx: crossbeam_channel::Sender<AudioResult<()>>,
) {
    let stream = match oeffne_ausgabe(geraet_name.as_deref(), shared, consumer) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = bereit_tx.send(Err(e));
            return;
        }
    };
    let _ = bereit_tx.send(Ok(()));

    while !beenden.load(Ordering::Relaxed) {
        thread::park_timeout(STREAM_PARK_INTERVALL);
    }

    drop(stream);
    debug!("Ausgabestream-Thread beendet");
}

/// Bedient den cpal-Callback: Vorspulen ausfuehren, dann abspielen
///
/// Laufende Wiedergabe ohne verfuegbare Samples stoppt die Quelle,
/// das naechste `play` setzt sie fort.
fn fuelle_ausgabe(consumer: &mut HeapCons<f32>, shared: &VoiceShared, ziel: &mut [f32]) {
    let angefordert = shared.vorspulen.swap(0, Ordering::Relaxed);
    if angefordert > 0 {
        let mut muell = [0.0f32; 256];
        let mut rest = angefordert;
        while rest > 0 {
            let stueck = rest.min(muell.len() as u64) as usize;
            let gelesen = consumer.pop_slice(&mut muell[..stueck]);
            if gelesen == 0 {
                break;
            }
            rest -= gelesen as u64;
        }
        shared
            .verbraucht
            .fetch_add(angefordert - rest, Ordering::Relaxed);
        if rest > 0 {
            // Noch nicht eingetroffene Samples spaeter ueberspringen
            shared.vorspulen.fetch_add(rest, Ordering::Relaxed);
        }
    }

    if shared.zustand.load(Ordering::Relaxed) != ZUSTAND_PLAYING {
        ziel.fill(0.0);
        return;
    }

    let gelesen = consumer.pop_slice(ziel);
    shared.verbraucht.fetch_add(gelesen as u64, Ordering::Relaxed);
    if gelesen < ziel.len() {
        ziel[gelesen..].fill(0.0);
        if gelesen == 0 {
            shared.zustand.store(ZUSTAND_STOPPED, Ordering::Relaxed);
        }
    }
}

fn oeffne_ausgabe(
    geraet_name: Option<&str>,
    shared: Arc<VoiceShared>,
    mut consumer: HeapCons<f32>,
) -> AudioResult<cpal::Stream> {
    let geraet = device::output_device_with_fallback(geraet_name)?;

    let stream_config = StreamConfig {
        channels: 2,
        sample_rate: cpal::SampleRate(ABTASTRATE),
        buffer_size: cpal::BufferSize::Default,
    };

    let err_fn = |err| error!("Wiedergabe-Fehler: {}", err);

    let unterstuetzt = geraet
        .supported_output_configs()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?
        .find(|c| {
            c.min_sample_rate().0 <= ABTASTRATE
                && c.max_sample_rate().0 >= ABTASTRATE
                && c.channels() >= 2
        });

    let sample_format = unterstuetzt
        .map(|c| c.sample_format())
        .unwrap_or(SampleFormat::F32);

    let stream = match sample_format {
        SampleFormat::F32 => geraet
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _| fuelle_ausgabe(&mut consumer, &shared, data),
                err_fn,
                None,
            )
            .map_err(|e| AudioError::StreamFehler(e.to_string()))?,
        SampleFormat::I16 => geraet
            .build_output_stream(
                &stream_config,
                move |data: &mut [i16], _| {
                    let mut float_buf = vec![0.0f32; data.len()];
                    fuelle_ausgabe(&mut consumer, &shared, &mut float_buf);
                    for (ziel, quelle) in data.iter_mut().zip(float_buf.iter()) {
                        *ziel = (*quelle * i16::MAX as f32)
                            .clamp(i16::MIN as f32, i16::MAX as f32)
                            as i16;
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| AudioError::StreamFehler(e.to_string()))?,
        _ => {
            return Err(AudioError::StreamFehler(format!(
                "Nicht unterstuetztes Sample-Format: {:?}",
                sample_format
            )))
        }
    };

    stream
        .play()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?;

    debug!("Ausgabestream geoeffnet: {}Hz stereo", ABTASTRATE);
    Ok(stream)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
