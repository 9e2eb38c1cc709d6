//! Mikrofon-Aufnahme und Frame-Verarbeitung
//!
//! Der cpal-Callback schreibt Roh-Samples in einen lock-free
//! Ring-Buffer. Ein eigener Worker-Thread zieht daraus 20-ms-Frames,
//! laesst sie durch Verstaerkung, Rauschunterdrueckung und VAD laufen
//! und legt Opus-Pakete in eine beschraenkte Queue.
//!
//! ## Rueckblick-Frame
//!
//! Waehrend Stille wird der jeweils letzte Frame unkodiert
//! zurueckgehalten. Springt die VAD auf Sprache, geht dieser Frame vor
//! dem aktuellen raus, damit der Wortanfang nicht abgeschnitten wird.
//!
//! cpal-Streams sind nicht Send, Geraet und Stream leben deshalb
//! vollstaendig im Worker-Thread. `start` wartet auf dessen
//! Bereitschaftsmeldung und liefert Geraete-Fehler synchron zurueck.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::RwLock;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapRb};
use tracing::{debug, error, warn};

use crate::codec::{CodecConfig, StimmEncoder};
use crate::config::ClientSettings;
use crate::device;
use crate::dsp::{OperatingMode, RauschFilter, SuppressionLevel, Vad, Verstaerker};
use crate::error::{AudioError, AudioResult};
use crate::signal::floats_to_shorts;
use flurfunk_core::konstanten::{ABTASTRATE, FRAME_GROESSE, KANAELE};

/// Wartezeit auf die Bereitschaftsmeldung des Workers
const WORKER_START_FRIST: Duration = Duration::from_secs(2);

/// Konfiguration der Aufnahmeseite
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Abtastrate in Hz
    pub abtastrate: u32,
    /// Kanalanzahl
    pub kanaele: u16,
    /// Samples pro Frame
    pub frame_groesse: usize,
    /// Ring-Buffer Kapazitaet in Samples
    pub ring_kapazitaet: usize,
    /// Kapazitaet der Paket-Queue in Frames
    pub queue_kapazitaet: usize,
    /// Wartezeit wenn noch kein voller Frame im Ring liegt
    pub poll_pause: Duration,
    /// Wie lange `stop` auf das Worker-Ende wartet
    pub join_frist: Duration,
    /// Frames die nach dem letzten Sprach-Frame noch gesendet werden
    pub hangover_frames: u32,
    /// Aggressivitaet der Sprachaktivitaetserkennung
    pub vad_modus: OperatingMode,
    /// Stufe der Rauschunterdrueckung
    pub unterdrueckung: SuppressionLevel,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            abtastrate: ABTASTRATE,
            kanaele: KANAELE,
            frame_groesse: FRAME_GROESSE,
            ring_kapazitaet: ABTASTRATE as usize * 2,
            queue_kapazitaet: 64,
            poll_pause: Duration::from_millis(5),
            join_frist: Duration::from_millis(50),
            hangover_frames: 0,
            vad_modus: OperatingMode::VeryAggressive,
            unterdrueckung: SuppressionLevel::Medium,
        }
    }
}

// ---------------------------------------------------------------------------
// Laufzeit-Steuerung
// ---------------------------------------------------------------------------

/// Vom Worker gelesene Laufzeit-Parameter
///
/// Verstaerkung und Stummschaltung greifen ohne Neustart des Streams.
pub struct CaptureSteuerung {
    verstaerkung: RwLock<f32>,
    stumm: AtomicBool,
}

impl CaptureSteuerung {
    pub fn neu(einstellungen: &ClientSettings) -> Self {
        Self {
            verstaerkung: RwLock::new(einstellungen.microphone_amplification),
            stumm: AtomicBool::new(einstellungen.muted),
        }
    }

    pub fn verstaerkung(&self) -> f32 {
        *self.verstaerkung.read()
    }

    pub fn set_verstaerkung(&self, faktor: f32) {
        *self.verstaerkung.write() = faktor;
    }

    pub fn ist_stumm(&self) -> bool {
        self.stumm.load(Ordering::Relaxed)
    }

    pub fn set_stumm(&self, stumm: bool) {
        self.stumm.store(stumm, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// Frame-Verarbeitung
// ---------------------------------------------------------------------------

/// DSP-Kette und Sende-Entscheidung fuer einen Frame
struct FrameVerarbeiter {
    verstaerker: Verstaerker,
    filter: RauschFilter,
    vad: Vad,
    encoder: StimmEncoder,
    /// Letzter stiller Frame, wartet auf den naechsten Sprachbeginn
    rueckblick: Option<Vec<i16>>,
    hangover_frames: u32,
    hangover_rest: u32,
    aktiv: bool,
}

impl FrameVerarbeiter {
    fn neu(konfig: &CaptureConfig) -> AudioResult<Self> {
        let frame_ms = konfig.frame_groesse as u32 * 1000 / konfig.abtastrate;
        let codec_konfig = CodecConfig {
            abtastrate: konfig.abtastrate,
            kanaele: konfig.kanaele,
            frame_groesse: konfig.frame_groesse,
        };

        Ok(Self {
            verstaerker: Verstaerker::neu(),
            filter: RauschFilter::neu(konfig.unterdrueckung),
            vad: Vad::neu(konfig.abtastrate, frame_ms, konfig.vad_modus)?,
            encoder: StimmEncoder::neu(&codec_konfig)?,
            rueckblick: None,
            hangover_frames: konfig.hangover_frames,
            hangover_rest: 0,
            aktiv: false,
        })
    }

    /// Verarbeitet einen Roh-Frame und gibt die zu sendenden Pakete zurueck
    ///
    /// Stille liefert eine leere Liste, Sprachbeginn bis zu zwei Pakete
    /// (Rueckblick plus aktueller Frame).
    fn verarbeite(&mut self, roh: &[f32], verstaerkung: f32) -> AudioResult<Vec<Vec<u8>>> {
        let mut frame = floats_to_shorts(roh);
        self.verstaerker.amplify(&mut frame, verstaerkung);
        self.filter.process(&mut frame);

        if self.vad.has_speech(&frame) {
            let mut pakete = Vec::with_capacity(2);
            if !self.aktiv {
                self.aktiv = true;
                if let Some(vorlauf) = self.rueckblick.take() {
                    pakete.push(self.encoder.encode(&vorlauf)?);
                }
            }
            self.hangover_rest = self.hangover_frames;
            pakete.push(self.encoder.encode(&frame)?);
            return Ok(pakete);
        }

        // Stille: waehrend des Hangovers weiter senden, danach in den
        // Ruhezustand und den Frame als Rueckblick vorhalten
        if self.aktiv && self.hangover_rest > 0 {
            self.hangover_rest -= 1;
            return Ok(vec![self.encoder.encode(&frame)?]);
        }

        self.aktiv = false;
        self.rueckblick = Some(frame);
        Ok(Vec::new())
    }

    /// Verwirft Rueckblick und DSP-Historie, etwa bei Stummschaltung
    fn leeren(&mut self) {
        self.rueckblick = None;
        self.aktiv = false;
        self.hangover_rest = 0;
        self.verstaerker.zuruecksetzen();
        self.filter.zuruecksetzen();
    }
}

// ---------------------------------------------------------------------------
// Capture-Stream und Worker
// ---------------------------------------------------------------------------

/// Haelt den cpal-Stream am Leben, Drop stoppt die Aufnahme
struct CaptureStream {
    _stream: Stream,
}

struct WorkerGriff {
    beenden: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Mikrofon-Aufnahme mit eigenem Worker-Thread
///
/// Fertig kodierte Opus-Pakete kommen ueber den bei `neu`
/// zurueckgegebenen Receiver an.
pub struct MicCapture {
    konfig: CaptureConfig,
    steuerung: Arc<CaptureSteuerung>,
    sender: Sender<Vec<u8>>,
    worker: Option<WorkerGriff>,
}

impl MicCapture {
    /// Erstellt die Aufnahme und validiert die Konfiguration
    ///
    /// Oeffnet noch kein Geraet, das passiert erst bei `start`.
    pub fn neu(
        konfig: CaptureConfig,
        steuerung: Arc<CaptureSteuerung>,
    ) -> AudioResult<(Self, Receiver<Vec<u8>>)> {
        // Probe-Aufbau der DSP-Kette, damit Konfigurationsfehler hier
        // statt erst im Worker-Thread auffallen
        FrameVerarbeiter::neu(&konfig)?;

        let (sender, empfaenger) = bounded(konfig.queue_kapazitaet);
        Ok((
            Self {
                konfig,
                steuerung,
                sender,
                worker: None,
            },
            empfaenger,
        ))
    }

    /// Startet die Aufnahme auf dem gegebenen Geraet
    ///
    /// Eine laufende Aufnahme wird vorher gestoppt. `None` nutzt das
    /// Standard-Eingabegeraet.
    pub fn start(&mut self, geraet: Option<&str>) -> AudioResult<()> {
        self.stop();

        let beenden = Arc::new(AtomicBool::new(false));
        let (bereit_tx, bereit_rx) = bounded::<AudioResult<()>>(1);

        let konfig = self.konfig.clone();
        let steuerung = Arc::clone(&self.steuerung);
        let sender = self.sender.clone();
        let beenden_worker = Arc::clone(&beenden);
        let geraet_name = geraet.map(String::from);

        let handle = thread::Builder::new()
            .name("flurfunk-capture".into())
            .spawn(move || {
                worker_schleife(konfig, geraet_name, steuerung, sender, beenden_worker, bereit_tx)
            })?;

        match bereit_rx.recv_timeout(WORKER_START_FRIST) {
            Ok(Ok(())) => {
                debug!("Capture-Worker bereit");
                self.worker = Some(WorkerGriff { beenden, handle });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                beenden.store(true, Ordering::Relaxed);
                Err(AudioError::StreamFehler(
                    "Capture-Worker meldet keine Bereitschaft".into(),
                ))
            }
        }
    }

    /// Stoppt die Aufnahme
    ///
    /// Wartet beschraenkt auf das Worker-Ende. Ein haengender cpal-Treiber
    /// blockiert den Aufrufer nicht, der Thread wird dann aufgegeben.
    pub fn stop(&mut self) {
        let griff = match self.worker.take() {
            Some(griff) => griff,
            None => return,
        };

        griff.beenden.store(true, Ordering::Relaxed);
        let frist = Instant::now() + self.konfig.join_frist;
        while !griff.handle.is_finished() && Instant::now() < frist {
            thread::sleep(Duration::from_millis(1));
        }

        if griff.handle.is_finished() {
            if griff.handle.join().is_err() {
                error!("Capture-Worker mit Panik beendet");
            }
        } else {
            warn!("Capture-Worker beendet sich nicht innerhalb der Frist, Thread aufgegeben");
        }
    }

    /// Laeuft gerade eine Aufnahme?
    pub fn ist_aktiv(&self) -> bool {
        self.worker
            .as_ref()
            .map(|griff| !griff.handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for MicCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_schleife(
    konfig: CaptureConfig,
    geraet_name: Option<String>,
    steuerung: Arc<CaptureSteuerung>,
    sender: Sender<Vec<u8>>,
    beenden: Arc<AtomicBool>,
    bereit_tx: Sender<AudioResult<()>>,
) {
    let (stream, mut consumer) = match oeffne_aufnahme(&konfig, geraet_name.as_deref()) {
        Ok(paar) => paar,
        Err(e) => {
            let _ = bereit_tx.send(Err(e));
            return;
        }
    };
    let mut verarbeiter = match FrameVerarbeiter::neu(&konfig) {
        Ok(v) => v,
        Err(e) => {
            let _ = bereit_tx.send(Err(e));
            return;
        }
    };
    let _ = bereit_tx.send(Ok(()));

    let mut roh = vec![0.0f32; konfig.frame_groesse];
    'lauf: while !beenden.load(Ordering::Relaxed) {
        if consumer.occupied_len() < konfig.frame_groesse {
            thread::sleep(konfig.poll_pause);
            continue;
        }
        consumer.pop_slice(&mut roh);

        if steuerung.ist_stumm() {
            verarbeiter.leeren();
            continue;
        }

        match verarbeiter.verarbeite(&roh, steuerung.verstaerkung()) {
            Ok(pakete) => {
                for paket in pakete {
                    match sender.try_send(paket) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            warn!("Sende-Queue voll, Voice-Frame verworfen");
                        }
                        Err(TrySendError::Disconnected(_)) => {
                            debug!("Empfaengerseite geschlossen, Capture endet");
                            break 'lauf;
                        }
                    }
                }
            }
            Err(e) => error!(fehler = %e, "Frame-Verarbeitung fehlgeschlagen, Frame verworfen"),
        }
    }

    drop(stream);
    debug!("Capture-Worker beendet");
}

/// Oeffnet Geraet und cpal-Stream, liefert den Ring-Buffer-Consumer
fn oeffne_aufnahme(
    konfig: &CaptureConfig,
    geraet_name: Option<&str>,
) -> AudioResult<(CaptureStream, HeapCons<f32>)> {
    let geraet = device::input_device_with_fallback(geraet_name)?;

    let stream_config = StreamConfig {
        channels: konfig.kanaele,
        sample_rate: cpal::SampleRate(konfig.abtastrate),
        buffer_size: cpal::BufferSize::Default,
    };

    let rb = HeapRb::<f32>::new(konfig.ring_kapazitaet);
    let (mut producer, consumer) = rb.split();

    let err_fn = |err| error!("Capture-Fehler: {}", err);

    let unterstuetzt = geraet
        .supported_input_configs()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?
        .find(|c| {
            c.min_sample_rate().0 <= konfig.abtastrate
                && c.max_sample_rate().0 >= konfig.abtastrate
                && c.channels() >= konfig.kanaele
        });

    let sample_format = unterstuetzt
        .map(|c| c.sample_format())
        .unwrap_or(SampleFormat::F32);

    let stream = match sample_format {
        SampleFormat::F32 => geraet
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _| {
                    let geschrieben = producer.push_slice(data);
                    if geschrieben < data.len() {
                        warn!(
                            "Capture Ring-Buffer voll, {} Samples verworfen",
                            data.len() - geschrieben
                        );
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| AudioError::StreamFehler(e.to_string()))?,
        SampleFormat::I16 => geraet
            .build_input_stream(
                &stream_config,
                move |data: &[i16], _| {
                    let floats: Vec<f32> =
                        data.iter().map(|&s| s as f32 / i16::MAX as f32).collect();
                    if producer.push_slice(&floats) < floats.len() {
                        warn!("Capture Ring-Buffer voll");
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| AudioError::StreamFehler(e.to_string()))?,
        SampleFormat::U8 => geraet
            .build_input_stream(
                &stream_config,
                move |data: &[u8], _| {
                    let floats: Vec<f32> =
                        data.iter().map(|&s| (s as f32 - 128.0) / 128.0).collect();
                    if producer.push_slice(&floats) < floats.len() {
                        warn!("Capture Ring-Buffer voll");
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

    debug!(
        "Capture-Stream geoeffnet: {}Hz {}ch",
        konfig.abtastrate, konfig.kanaele
    );

    Ok((CaptureStream { _stream: stream }, consumer))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sprach_frame() -> Vec<f32> {
        // 200 Hz mit kraeftigem Pegel: sicher ueber jeder VAD-Schwelle
        (0..FRAME_GROESSE)
            .map(|i| {
                let t = i as f32 / ABTASTRATE as f32;
                (t * 200.0 * 2.0 * std::f32::consts::PI).sin() * 0.25
            })
            .collect()
    }

    fn stille() -> Vec<f32> {
        vec![0.0; FRAME_GROESSE]
    }

    #[test]
    fn konfiguration_wird_validiert() {
        let steuerung = Arc::new(CaptureSteuerung::neu(&ClientSettings::default()));
        assert!(MicCapture::neu(CaptureConfig::default(), Arc::clone(&steuerung)).is_ok());

        let kaputt = CaptureConfig {
            abtastrate: 44_100,
            ..CaptureConfig::default()
        };
        assert!(MicCapture::neu(kaputt, steuerung).is_err());
    }

    #[test]
    fn stille_sendet_keine_pakete() {
        let mut verarbeiter = FrameVerarbeiter::neu(&CaptureConfig::default()).unwrap();
        for _ in 0..5 {
            let pakete = verarbeiter.verarbeite(&stille(), 1.0).unwrap();
            assert!(pakete.is_empty(), "Stille darf nichts senden");
        }
        assert!(verarbeiter.rueckblick.is_some(), "Rueckblick muss vorgehalten werden");
    }

    #[test]
    fn sprachbeginn_sendet_rueckblick_mit() {
        let mut verarbeiter = FrameVerarbeiter::neu(&CaptureConfig::default()).unwrap();

        assert!(verarbeiter.verarbeite(&stille(), 1.0).unwrap().is_empty());

        // Erster Sprach-Frame: Rueckblick plus aktueller Frame
        let beginn = verarbeiter.verarbeite(&sprach_frame(), 1.0).unwrap();
        assert_eq!(beginn.len(), 2, "Sprachbeginn muss Rueckblick mitsenden");

        // Danach genau ein Paket pro Frame
        let weiter = verarbeiter.verarbeite(&sprach_frame(), 1.0).unwrap();
        assert_eq!(weiter.len(), 1);
    }

    #[test]
    fn sprachbeginn_ohne_rueckblick_sendet_nur_den_frame() {
        let mut verarbeiter = FrameVerarbeiter::neu(&CaptureConfig::default()).unwrap();
        let beginn = verarbeiter.verarbeite(&sprach_frame(), 1.0).unwrap();
        assert_eq!(beginn.len(), 1, "Ohne Rueckblick gibt es nur den aktuellen Frame");
    }

    #[test]
    fn stille_nach_sprache_beendet_sofort() {
        let mut verarbeiter = FrameVerarbeiter::neu(&CaptureConfig::default()).unwrap();
        verarbeiter.verarbeite(&sprach_frame(), 1.0).unwrap();

        let pakete = verarbeiter.verarbeite(&stille(), 1.0).unwrap();
        assert!(pakete.is_empty(), "Ohne Hangover endet die Uebertragung sofort");
        assert!(verarbeiter.rueckblick.is_some());
    }

    #[test]
    fn sprachsequenz_sendet_rueckblick_und_sprachframes() {
        let mut verarbeiter = FrameVerarbeiter::neu(&CaptureConfig::default()).unwrap();

        let mut gesendet = 0;
        for frame in [stille(), stille(), sprach_frame(), sprach_frame(), stille()] {
            gesendet += verarbeiter.verarbeite(&frame, 1.0).unwrap().len();
        }
        assert_eq!(gesendet, 3, "Rueckblick plus zwei Sprachframes");
    }

    #[test]
    fn hangover_sendet_nach() {
        let konfig = CaptureConfig {
            hangover_frames: 2,
            ..CaptureConfig::default()
        };
        let mut verarbeiter = FrameVerarbeiter::neu(&konfig).unwrap();
        verarbeiter.verarbeite(&sprach_frame(), 1.0).unwrap();

        assert_eq!(verarbeiter.verarbeite(&stille(), 1.0).unwrap().len(), 1);
        assert_eq!(verarbeiter.verarbeite(&stille(), 1.0).unwrap().len(), 1);
        assert!(verarbeiter.verarbeite(&stille(), 1.0).unwrap().is_empty());
    }

    #[test]
    fn leeren_verwirft_rueckblick() {
        let mut verarbeiter = FrameVerarbeiter::neu(&CaptureConfig::default()).unwrap();
        verarbeiter.verarbeite(&stille(), 1.0).unwrap();
        verarbeiter.leeren();

        let beginn = verarbeiter.verarbeite(&sprach_frame(), 1.0).unwrap();
        assert_eq!(beginn.len(), 1, "Nach leeren darf kein alter Rueckblick rausgehen");
    }

    #[test]
    fn verstaerkung_wirkt_vor_der_vad() {
        // Pegel unterhalb der Schwelle von Stufe 0, mit Faktor 4 darueber
        let leise: Vec<f32> = (0..FRAME_GROESSE)
            .map(|i| {
                let t = i as f32 / ABTASTRATE as f32;
                (t * 200.0 * 2.0 * std::f32::consts::PI).sin() * (40.0 / 32_768.0)
            })
            .collect();
        let konfig = CaptureConfig {
            vad_modus: OperatingMode::HighQuality,
            ..CaptureConfig::default()
        };

        let mut ohne = FrameVerarbeiter::neu(&konfig).unwrap();
        assert!(ohne.verarbeite(&leise, 1.0).unwrap().is_empty());

        let mut mit = FrameVerarbeiter::neu(&konfig).unwrap();
        assert!(
            !mit.verarbeite(&leise, 4.0).unwrap().is_empty(),
            "Verstaerkung muss vor der VAD greifen"
        );
    }

    #[test]
    fn steuerung_liest_einstellungen() {
        let mut einstellungen = ClientSettings::default();
        einstellungen.microphone_amplification = 2.5;
        einstellungen.muted = true;

        let steuerung = CaptureSteuerung::neu(&einstellungen);
        assert_eq!(steuerung.verstaerkung(), 2.5);
        assert!(steuerung.ist_stumm());

        steuerung.set_stumm(false);
        steuerung.set_verstaerkung(1.0);
        assert!(!steuerung.ist_stumm());
        assert_eq!(steuerung.verstaerkung(), 1.0);
    }

    #[test]
    #[ignore = "Benoetigt Audio-Hardware"]
    fn aufnahme_startet_und_stoppt() {
        let steuerung = Arc::new(CaptureSteuerung::neu(&ClientSettings::default()));
        let (mut capture, _empfaenger) =
            MicCapture::neu(CaptureConfig::default(), steuerung).unwrap();

        capture.start(None).expect("Standardgeraet sollte sich oeffnen lassen");
        assert!(capture.ist_aktiv());
        capture.stop();
        assert!(!capture.ist_aktiv());
    }
}
