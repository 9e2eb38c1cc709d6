//! Voice-Server – Router plus persistierte Einstellungen
//!
//! Fassade fuer die Host-Integration: haelt den [`VoiceRouter`] und den
//! Pfad der Einstellungsdatei zusammen. Administrative Aenderungen
//! greifen sofort im Router und schreiben die Datei neu; das Lesen der
//! Richtlinie im Hot Path bleibt lockfrei billig.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::VoiceResult;
use crate::router::VoiceRouter;
use crate::settings::ServerSettings;
use flurfunk_core::{PlayerId, Spieler};

/// Server-Seite des Voice-Chats
pub struct VoiceServer {
    router: VoiceRouter,
    pfad: PathBuf,
    // Serialisiert Lesen-Aendern-Schreiben der Einstellungen
    aenderung: Mutex<()>,
}

impl VoiceServer {
    /// Erstellt den Server und laedt die Einstellungen vom gegebenen Pfad
    pub fn neu(pfad: impl Into<PathBuf>) -> Self {
        let pfad = pfad.into();
        let einstellungen = ServerSettings::laden(&pfad);
        Self {
            router: VoiceRouter::neu(einstellungen),
            pfad,
            aenderung: Mutex::new(()),
        }
    }

    /// Zugriff auf den Router, z.B. fuer den Netz-Transport
    pub fn router(&self) -> &VoiceRouter {
        &self.router
    }

    // -----------------------------------------------------------------
    // Empfaenger-Lebenszyklus
    // -----------------------------------------------------------------

    /// Registriert einen verbundenen Spieler als Empfaenger
    pub fn registriere(&self, spieler: PlayerId) -> mpsc::Receiver<Arc<Vec<u8>>> {
        self.router.registriere(spieler)
    }

    /// Entfernt einen getrennten Spieler
    pub fn entferne(&self, spieler: PlayerId) {
        self.router.entferne(spieler);
    }

    /// Verteilt einen Voice-Frame anhand des Roster-Schnappschusses
    pub fn verteile(&self, absender: PlayerId, daten: &[u8], roster: &[Spieler]) -> usize {
        self.router.verteile(absender, daten, roster)
    }

    // -----------------------------------------------------------------
    // Administrative Schalter
    // -----------------------------------------------------------------

    /// Momentaufnahme der aktiven Einstellungen
    pub fn einstellungen(&self) -> ServerSettings {
        self.router.richtlinie()
    }

    /// Schaltet "nur Teamkollegen hoeren sich"
    pub fn set_team_voices_only(&self, wert: bool) -> VoiceResult<()> {
        self.setze(|e| e.team_voices_only = wert)
    }

    /// Schaltet "Teamkollegen hoeren sich global"
    pub fn set_team_voices_globally(&self, wert: bool) -> VoiceResult<()> {
        self.setze(|e| e.team_voices_globally = wert)
    }

    /// Schaltet die positionale Zustellung
    pub fn set_proximity_based_volume(&self, wert: bool) -> VoiceResult<()> {
        self.setze(|e| e.proximity_based_volume = wert)
    }

    /// Kehrt den Broadcaster-Status eines Spielers um
    pub fn broadcast_umschalten(&self, spieler: PlayerId) -> bool {
        self.router.broadcast_umschalten(spieler)
    }

    /// Sendet der Spieler aktuell an alle?
    pub fn ist_broadcaster(&self, spieler: PlayerId) -> bool {
        self.router.ist_broadcaster(spieler)
    }

    /// Wendet eine Aenderung an und schreibt die Einstellungsdatei neu
    ///
    /// Die Aenderung bleibt auch dann im Router aktiv, wenn das Schreiben
    /// fehlschlaegt; der Fehler geht an den Aufrufer zurueck.
    fn setze(&self, anwenden: impl FnOnce(&mut ServerSettings)) -> VoiceResult<()> {
        let _wache = self.aenderung.lock();
        let mut einstellungen = self.router.richtlinie();
        anwenden(&mut einstellungen);
        self.router.setze_richtlinie(einstellungen);

        match einstellungen.speichern(&self.pfad) {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(
                    pfad = %self.pfad.display(),
                    fehler = %e,
                    "Einstellungen konnten nicht geschrieben werden"
                );
                Err(e)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
