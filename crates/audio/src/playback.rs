//! Wiedergabe empfangener Stimmen
//!
//! Pro sprechendem Spieler existiert ein `Speaker` mit eigenem Decoder
//! und eigener Wiedergabequelle. Der `SpeakerPool` verwaltet die
//! Speaker nach Spieler-ID, legt sie beim ersten Paket an und teilt
//! Lautstaerke, Geraetewahl und Panorama-Glaettung mit allen.
//!
//! ## Buffer-Disziplin
//!
//! Jede Quelle haelt hoechstens `BUFFER_ANZAHL` Frames vor. Laeuft die
//! Warteschlange voll, etwa weil der Empfaenger kurz haengt, wird der
//! aelteste Frame uebersprungen statt den neuen zu verwerfen. Der Ring
//! der Quelle traegt dafuer `RING_RESERVE_FRAMES` Reserve, weil der
//! Sprung erst im Audio-Callback vollzogen wird.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::codec::{CodecConfig, StimmDecoder};
use crate::config::{ClientSettings, MAX_WIEDERGABE_LAUTSTAERKE};
use crate::device;
use crate::error::AudioResult;
use crate::output::{CpalVoice, OutputVoice, PlaybackState};
use crate::spatial;
use flurfunk_core::konstanten::FRAME_GROESSE;
use flurfunk_core::{PlayerId, Position};

/// Maximal vorgehaltene Frames pro Stimme (640 ms Audio)
pub const BUFFER_ANZAHL: usize = 32;

/// Ring-Reserve fuer den asynchron vollzogenen Frame-Sprung
pub const RING_RESERVE_FRAMES: usize = 2;

// ---------------------------------------------------------------------------
// Speaker
// ---------------------------------------------------------------------------

/// Wiedergabe-Einheit eines einzelnen Spielers
pub struct Speaker {
    decoder: StimmDecoder,
    voice: Box<dyn OutputVoice>,
    frame_groesse: usize,
}

impl Speaker {
    /// Oeffnet einen Speaker auf dem gegebenen Ausgabegeraet
    pub fn open(geraet: Option<&str>) -> AudioResult<Self> {
        let voice = CpalVoice::open(geraet, FRAME_GROESSE, BUFFER_ANZAHL + RING_RESERVE_FRAMES)?;
        Self::mit_voice(Box::new(voice))
    }

    fn mit_voice(voice: Box<dyn OutputVoice>) -> AudioResult<Self> {
        Ok(Self {
            decoder: StimmDecoder::neu(&CodecConfig::default())?,
            voice,
            frame_groesse: FRAME_GROESSE,
        })
    }

    /// Dekodiert ein Opus-Paket und reiht es zur Wiedergabe ein
    ///
    /// `position` ist die Quelle relativ zum Hoerer, `None` spielt
    /// global in voller Lautstaerke und mittig. Unbrauchbare Pakete
    /// werden kommentarlos verworfen.
    pub fn play(
        &mut self,
        daten: &[u8],
        position: Option<Position>,
        lautstaerke: f32,
        glaetten: bool,
    ) -> AudioResult<()> {
        let pcm = match self.decoder.decode(daten) {
            Some(pcm) => pcm,
            None => return Ok(()),
        };

        self.voice.unqueue_processed();

        let (verstaerkung, pan) = match position {
            Some(p) => {
                let abstand = p.length();
                let gedaempft = lautstaerke * spatial::daempfung(abstand, spatial::STANDARD_MAX_DISTANZ);
                (
                    gedaempft.min(MAX_WIEDERGABE_LAUTSTAERKE),
                    spatial::pan(p, glaetten),
                )
            }
            None => (lautstaerke.min(MAX_WIEDERGABE_LAUTSTAERKE), 0.0),
        };

        if self.voice.queued_buffers() >= BUFFER_ANZAHL {
            debug!("Buffer-Vorrat erschoepft, aeltester Frame wird uebersprungen");
            self.voice.advance_samples(self.frame_groesse);
            self.voice.unqueue_processed();
        }

        self.voice.queue_buffer(&pcm, verstaerkung, pan)?;

        // Neu anspielen wenn die Quelle nie lief, leergelaufen ist oder
        // gerade erst wieder Daten bekommt
        if self.voice.state() != PlaybackState::Playing || self.voice.queued_buffers() <= 1 {
            self.voice.play()?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SpeakerPool
// ---------------------------------------------------------------------------

/// Threadsicherer Pool aller aktiven Speaker
///
/// Clonen ist billig, alle Clones teilen denselben Zustand.
#[derive(Clone)]
pub struct SpeakerPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    quellen: DashMap<PlayerId, Mutex<Speaker>>,
    /// Aufgeloester Geraetename, `None` = Standardgeraet
    geraet: RwLock<Option<String>>,
    offen: AtomicBool,
    lautstaerke: RwLock<f32>,
    glaetten: AtomicBool,
}

impl SpeakerPool {
    pub fn neu(einstellungen: &ClientSettings) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                quellen: DashMap::new(),
                geraet: RwLock::new(None),
                offen: AtomicBool::new(false),
                lautstaerke: RwLock::new(einstellungen.voice_chat_volume),
                glaetten: AtomicBool::new(einstellungen.smooth_channel_transition),
            }),
        }
    }

    /// Oeffnet die Wiedergabe auf dem gewuenschten Geraet
    ///
    /// Der Name wird einmal aufgeloest, ein unbekanntes Geraet faellt
    /// auf das Standardgeraet zurueck. Speaker entstehen danach
    /// bedarfsgesteuert beim ersten Paket eines Spielers.
    pub fn open(&self, geraet_wunsch: Option<&str>) {
        *self.inner.geraet.write() = device::resolve_output_name(geraet_wunsch);
        self.inner.offen.store(true, Ordering::Relaxed);
        debug!(geraet = ?self.inner.geraet.read(), "Wiedergabe geoeffnet");
    }

    /// Schliesst die Wiedergabe und verwirft alle Speaker
    pub fn close(&self) {
        self.inner.offen.store(false, Ordering::Relaxed);
        self.inner.quellen.clear();
        debug!("Wiedergabe geschlossen");
    }

    pub fn ist_offen(&self) -> bool {
        self.inner.offen.load(Ordering::Relaxed)
    }

    /// Anzahl aktiver Speaker
    pub fn anzahl_quellen(&self) -> usize {
        self.inner.quellen.len()
    }

    /// Legt den Speaker eines Spielers an, ersetzt einen vorhandenen
    ///
    /// Bei geschlossener Wiedergabe passiert nichts.
    pub fn create(&self, spieler: PlayerId) -> AudioResult<()> {
        if !self.ist_offen() {
            return Ok(());
        }
        let speaker = self.oeffne_speaker()?;
        self.inner.quellen.insert(spieler, Mutex::new(speaker));
        Ok(())
    }

    /// Entfernt den Speaker eines Spielers
    pub fn remove(&self, spieler: PlayerId) {
        self.inner.quellen.remove(&spieler);
    }

    /// Spielt ein empfangenes Opus-Paket fuer einen Spieler ab
    ///
    /// Fehlt der Speaker, wird er angelegt. Bei geschlossener
    /// Wiedergabe wird das Paket verworfen.
    pub fn play(
        &self,
        spieler: PlayerId,
        daten: &[u8],
        position: Option<Position>,
    ) -> AudioResult<()> {
        if !self.ist_offen() {
            return Ok(());
        }

        if !self.inner.quellen.contains_key(&spieler) {
            let speaker = self.oeffne_speaker()?;
            // Paralleles Anlegen desselben Spielers ist unkritisch,
            // der Verlierer wird beim Einfuegen ersetzt und geschlossen
            self.inner.quellen.insert(spieler, Mutex::new(speaker));
        }

        let lautstaerke = *self.inner.lautstaerke.read();
        let glaetten = self.inner.glaetten.load(Ordering::Relaxed);

        match self.inner.quellen.get(&spieler) {
            Some(eintrag) => eintrag.lock().play(daten, position, lautstaerke, glaetten),
            // Zwischenzeitlich entfernt, Paket verwerfen
            None => Ok(()),
        }
    }

    /// Setzt die Gesamtlautstaerke, wirkt ab dem naechsten Frame
    pub fn set_volume(&self, wert: f32) {
        *self.inner.lautstaerke.write() = wert;
    }

    /// Schaltet die Panorama-Glaettung um
    pub fn set_smooth_transition(&self, an: bool) {
        self.inner.glaetten.store(an, Ordering::Relaxed);
    }

    fn oeffne_speaker(&self) -> AudioResult<Speaker> {
        let geraet = self.inner.geraet.read().clone();
        Speaker::open(geraet.as_deref()).map_err(|e| {
            warn!(fehler = %e, "Speaker liess sich nicht oeffnen");
            e
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
