//! Audio-Engine: Fassade ueber Aufnahme und Wiedergabe
//!
//! Haelt die Client-Einstellungen, die Mikrofon-Aufnahme und den
//! Speaker-Pool zusammen. Einstellungsaenderungen greifen sofort,
//! Geraetewechsel starten die betroffene Seite neu.

use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::{Mutex, RwLock};
use tracing::info;

use crate::capture::{CaptureConfig, CaptureSteuerung, MicCapture};
use crate::config::{pruefe_mikrofon_verstaerkung, pruefe_wiedergabe_lautstaerke, ClientSettings};
use crate::error::AudioResult;
use crate::playback::SpeakerPool;
use flurfunk_core::{PlayerId, Position};

/// Zentrale Audio-Fassade eines Clients
///
/// Kodierte Mikrofon-Pakete kommen ueber den bei `neu` gelieferten
/// Receiver an und gehen von dort an den Netz-Transport.
pub struct AudioEngine {
    capture: Mutex<MicCapture>,
    pool: SpeakerPool,
    einstellungen: RwLock<ClientSettings>,
    steuerung: Arc<CaptureSteuerung>,
}

impl AudioEngine {
    /// Erstellt die Engine mit validierten Einstellungen
    pub fn neu(einstellungen: ClientSettings) -> AudioResult<(Self, Receiver<Vec<u8>>)> {
        einstellungen.validieren()?;

        let steuerung = Arc::new(CaptureSteuerung::neu(&einstellungen));
        let (capture, pakete) =
            MicCapture::neu(CaptureConfig::default(), Arc::clone(&steuerung))?;
        let pool = SpeakerPool::neu(&einstellungen);

        Ok((
            Self {
                capture: Mutex::new(capture),
                pool,
                einstellungen: RwLock::new(einstellungen),
                steuerung,
            },
            pakete,
        ))
    }

    /// Momentaufnahme der aktuellen Einstellungen
    pub fn einstellungen(&self) -> ClientSettings {
        self.einstellungen.read().clone()
    }

    // -----------------------------------------------------------------
    // Aufnahme
    // -----------------------------------------------------------------

    /// Startet die Mikrofon-Aufnahme auf dem konfigurierten Geraet
    pub fn start_capture(&self) -> AudioResult<()> {
        let geraet = self.einstellungen.read().microphone_device_name.clone();
        self.capture.lock().start(geraet.as_deref())?;
        info!(geraet = ?geraet, "Aufnahme gestartet");
        Ok(())
    }

    /// Stoppt die Mikrofon-Aufnahme
    pub fn stop_capture(&self) {
        self.capture.lock().stop();
        info!("Aufnahme gestoppt");
    }

    /// Laeuft die Aufnahme gerade?
    pub fn capture_laeuft(&self) -> bool {
        self.capture.lock().ist_aktiv()
    }

    // -----------------------------------------------------------------
    // Wiedergabe
    // -----------------------------------------------------------------

    /// Oeffnet die Wiedergabe auf dem konfigurierten Geraet
    pub fn open_playback(&self) {
        let geraet = self.einstellungen.read().speaker_device_name.clone();
        self.pool.open(geraet.as_deref());
    }

    /// Schliesst die Wiedergabe und verwirft alle Speaker
    pub fn close_playback(&self) {
        self.pool.close();
    }

    /// Legt den Speaker eines neu erschienenen Spielers an
    pub fn player_entered(&self, spieler: PlayerId) -> AudioResult<()> {
        self.pool.create(spieler)
    }

    /// Raeumt den Speaker eines gegangenen Spielers ab
    pub fn player_left(&self, spieler: PlayerId) {
        self.pool.remove(spieler);
    }

    /// Spielt ein vom Server empfangenes Voice-Paket ab
    ///
    /// `position` ist die Position des Sprechers relativ zum Hoerer und
    /// wird nur bei gesetztem Proximity-Flag beruecksichtigt.
    pub fn play_received(
        &self,
        absender: PlayerId,
        proximity: bool,
        daten: &[u8],
        position: Position,
    ) -> AudioResult<()> {
        self.pool.play(absender, daten, proximity.then_some(position))
    }

    // -----------------------------------------------------------------
    // Einstellungen
    // -----------------------------------------------------------------

    /// Setzt die Mikrofon-Verstaerkung, wirkt ab dem naechsten Frame
    pub fn set_microphone_amplification(&self, wert: f32) -> AudioResult<()> {
        pruefe_mikrofon_verstaerkung(wert)?;
        self.einstellungen.write().microphone_amplification = wert;
        self.steuerung.set_verstaerkung(wert);
        Ok(())
    }

    /// Setzt die Wiedergabe-Lautstaerke, wirkt ab dem naechsten Frame
    pub fn set_voice_chat_volume(&self, wert: f32) -> AudioResult<()> {
        pruefe_wiedergabe_lautstaerke(wert)?;
        self.einstellungen.write().voice_chat_volume = wert;
        self.pool.set_volume(wert);
        Ok(())
    }

    /// Schaltet die Panorama-Glaettung um
    pub fn set_smooth_transition(&self, an: bool) {
        self.einstellungen.write().smooth_channel_transition = an;
        self.pool.set_smooth_transition(an);
    }

    /// Kehrt die Stummschaltung um und gibt den neuen Zustand zurueck
    pub fn toggle_muted(&self) -> bool {
        let mut einstellungen = self.einstellungen.write();
        einstellungen.muted = !einstellungen.muted;
        let stumm = einstellungen.muted;
        drop(einstellungen);

        self.steuerung.set_stumm(stumm);
        info!(stumm, "Stummschaltung umgeschaltet");
        stumm
    }

    /// Wechselt das Eingabegeraet, eine laufende Aufnahme startet neu
    pub fn set_input_device(&self, name: Option<String>) -> AudioResult<()> {
        self.einstellungen.write().microphone_device_name = name;
        if self.capture_laeuft() {
            self.start_capture()?;
        }
        Ok(())
    }

    /// Wechselt das Ausgabegeraet, offene Wiedergabe oeffnet neu
    ///
    /// Bestehende Speaker werden verworfen und beim naechsten Paket auf
    /// dem neuen Geraet wieder angelegt.
    pub fn set_output_device(&self, name: Option<String>) -> AudioResult<()> {
        self.einstellungen.write().speaker_device_name = name;
        if self.pool.ist_offen() {
            self.pool.close();
            self.open_playback();
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> AudioEngine {
        AudioEngine::neu(ClientSettings::default()).unwrap().0
    }

    #[test]
    fn neu_validiert_einstellungen() {
        let mut kaputt = ClientSettings::default();
        kaputt.microphone_amplification = 0.0;
        assert!(AudioEngine::neu(kaputt).is_err());
        assert!(AudioEngine::neu(ClientSettings::default()).is_ok());
    }

    #[test]
    fn verstaerkung_setter_validiert_und_greift() {
        let engine = engine();
        assert!(engine.set_microphone_amplification(5.0).is_err());
        assert!(engine.set_microphone_amplification(f32::NAN).is_err());

        engine.set_microphone_amplification(2.0).unwrap();
        assert_eq!(engine.einstellungen().microphone_amplification, 2.0);
        assert_eq!(engine.steuerung.verstaerkung(), 2.0);
    }

    #[test]
    fn lautstaerke_setter_validiert() {
        let engine = engine();
        assert!(engine.set_voice_chat_volume(6.5).is_err());
        assert!(engine.set_voice_chat_volume(-1.0).is_err());

        engine.set_voice_chat_volume(0.0).unwrap();
        assert_eq!(engine.einstellungen().voice_chat_volume, 0.0);
    }

    #[test]
    fn stummschaltung_wechselt() {
        let engine = engine();
        assert!(engine.toggle_muted());
        assert!(engine.steuerung.ist_stumm());
        assert!(engine.einstellungen().muted);

        assert!(!engine.toggle_muted());
        assert!(!engine.steuerung.ist_stumm());
    }

    #[test]
    fn glaettung_wird_uebernommen() {
        let engine = engine();
        engine.set_smooth_transition(false);
        assert!(!engine.einstellungen().smooth_channel_transition);
    }

    #[test]
    fn empfang_ohne_wiedergabe_ist_harmlos() {
        let engine = engine();
        engine
            .play_received(PlayerId(3), true, &[1, 2, 3], Position::new(1.0, 0.0, 0.0))
            .expect("Geschlossene Wiedergabe verwirft das Paket");
    }

    #[test]
    fn geraetewechsel_ohne_laufende_seiten_speichert_nur() {
        let engine = engine();
        engine.set_input_device(Some("Mikrofon A".into())).unwrap();
        engine.set_output_device(Some("Lautsprecher B".into())).unwrap();

        let einstellungen = engine.einstellungen();
        assert_eq!(einstellungen.microphone_device_name.as_deref(), Some("Mikrofon A"));
        assert_eq!(einstellungen.speaker_device_name.as_deref(), Some("Lautsprecher B"));
        assert!(!engine.capture_laeuft());
    }

    #[test]
    fn spieler_verwaltung_ohne_wiedergabe() {
        let engine = engine();
        engine.player_entered(PlayerId(5)).unwrap();
        engine.player_left(PlayerId(5));
    }
}
