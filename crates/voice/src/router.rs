//! Voice-Router – Zustellentscheidung und Fan-Out pro Frame
//!
//! Der Server entscheidet fuer jeden eingehenden Voice-Frame pro
//! Mitspieler, ob und wie er zugestellt wird. Die Entscheidung selbst
//! ([`entscheide`]) ist eine reine Funktion ohne verborgenen Zustand;
//! der [`VoiceRouter`] wendet sie auf einen Roster-Schnappschuss an und
//! verteilt das kodierte Paket an die Send-Queues der Empfaenger.
//!
//! ## Design-Entscheidungen
//! - DashMap/DashSet fuer lock-free concurrent access auf Queues und
//!   Broadcaster-Menge
//! - Tokio mpsc-Kanaele fuer Send-Queues (kein direktes Socket-Schreiben
//!   im Router)
//! - Pro Frame hoechstens zwei Kodierungen (positional/global), danach
//!   nur noch Arc-Klone

use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use crate::settings::ServerSettings;
use flurfunk_core::{PlayerId, Spieler};
use flurfunk_protocol::{ClientVoicePaket, MAX_DATEN_LAENGE};

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Groesse der Send-Queue pro Empfaenger (Pakete)
pub const SEND_QUEUE_GROESSE: usize = 128;

// ---------------------------------------------------------------------------
// Zustellentscheidung
// ---------------------------------------------------------------------------

/// Ergebnis einer positiven Zustellentscheidung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zustellung {
    /// true = beim Empfaenger positional abspielen, false = volle Lautstaerke
    pub proximity: bool,
}

/// Entscheidet ob `absender` bei `empfaenger` zu hoeren ist
///
/// Die Regeln greifen in fester Reihenfolge, die erste passende gewinnt:
///
/// 1. Empfaenger ist der Absender selbst -> keine Zustellung
/// 2. Absender ist Broadcaster -> global zustellen
/// 3. `team_voices_only` und verschiedene Teams -> keine Zustellung
/// 4. `team_voices_globally` und gleiches Team -> global zustellen
/// 5. Verschiedene Szenen -> keine Zustellung
/// 6. Sonst zustellen, positional je nach `proximity_based_volume`
///
/// "Gleiches Team" setzt eine echte Team-Zuweisung voraus; zwei Spieler
/// ohne Team zaehlen nicht als Teamkollegen.
pub fn entscheide(
    absender: &Spieler,
    empfaenger: &Spieler,
    richtlinie: &ServerSettings,
    ist_broadcaster: bool,
) -> Option<Zustellung> {
    if absender.id == empfaenger.id {
        return None;
    }

    if ist_broadcaster {
        return Some(Zustellung { proximity: false });
    }

    let gleiches_team = absender.team == empfaenger.team && absender.team.is_assigned();

    if richtlinie.team_voices_only && !gleiches_team {
        return None;
    }

    if richtlinie.team_voices_globally && gleiches_team {
        return Some(Zustellung { proximity: false });
    }

    if absender.szene != empfaenger.szene {
        return None;
    }

    Some(Zustellung {
        proximity: richtlinie.proximity_based_volume,
    })
}

// ---------------------------------------------------------------------------
// VoiceRouter
// ---------------------------------------------------------------------------

/// Verteilt Voice-Frames an die Send-Queues aller berechtigten Empfaenger
///
/// Thread-safe und `Clone`-faehig (innerer Arc).
#[derive(Clone)]
pub struct VoiceRouter {
    inner: Arc<RouterInner>,
}

struct RouterInner {
    /// Send-Queues, indexiert nach Empfaenger
    griffe: DashMap<PlayerId, mpsc::Sender<Arc<Vec<u8>>>>,
    /// Spieler, die aktuell an alle senden
    broadcaster: DashSet<PlayerId>,
    /// Aktive Routing-Schalter, pro Frame gelesen
    richtlinie: RwLock<ServerSettings>,
}

impl VoiceRouter {
    /// Erstellt einen Router mit der gegebenen Richtlinie
    pub fn neu(richtlinie: ServerSettings) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                griffe: DashMap::new(),
                broadcaster: DashSet::new(),
                richtlinie: RwLock::new(richtlinie),
            }),
        }
    }

    /// Registriert einen Empfaenger und gibt seine Empfangs-Queue zurueck
    ///
    /// Eine bestehende Queue desselben Spielers wird ersetzt; ihr alter
    /// Receiver schliesst sich damit von selbst.
    pub fn registriere(&self, spieler: PlayerId) -> mpsc::Receiver<Arc<Vec<u8>>> {
        let (tx, rx) = mpsc::channel(SEND_QUEUE_GROESSE);
        self.inner.griffe.insert(spieler, tx);
        info!(spieler = %spieler, "Empfaenger registriert");
        rx
    }

    /// Entfernt einen Empfaenger samt Broadcaster-Status
    pub fn entferne(&self, spieler: PlayerId) {
        if self.inner.griffe.remove(&spieler).is_some() {
            info!(spieler = %spieler, "Empfaenger entfernt");
        }
        self.inner.broadcaster.remove(&spieler);
    }

    /// Anzahl der registrierten Empfaenger
    pub fn anzahl_empfaenger(&self) -> usize {
        self.inner.griffe.len()
    }

    /// Momentaufnahme der aktiven Richtlinie
    pub fn richtlinie(&self) -> ServerSettings {
        *self.inner.richtlinie.read()
    }

    /// Ersetzt die aktive Richtlinie
    pub fn setze_richtlinie(&self, neue: ServerSettings) {
        *self.inner.richtlinie.write() = neue;
    }

    /// Kehrt den Broadcaster-Status um und gibt den neuen Zustand zurueck
    pub fn broadcast_umschalten(&self, spieler: PlayerId) -> bool {
        if self.inner.broadcaster.remove(&spieler).is_some() {
            info!(spieler = %spieler, "Broadcast deaktiviert");
            false
        } else {
            self.inner.broadcaster.insert(spieler);
            info!(spieler = %spieler, "Broadcast aktiviert");
            true
        }
    }

    /// Sendet der Spieler aktuell an alle?
    pub fn ist_broadcaster(&self, spieler: PlayerId) -> bool {
        self.inner.broadcaster.contains(&spieler)
    }

    /// Verteilt einen Voice-Frame an alle berechtigten Empfaenger
    ///
    /// `roster` ist der Schnappschuss aller Spieler der Session aus Sicht
    /// des Host-Spiels. Das client-gerichtete Paket wird pro benoetigter
    /// Proximity-Variante genau einmal kodiert und als `Arc<Vec<u8>>`
    /// ohne Kopie an alle Queues gereicht.
    ///
    /// Gibt die Anzahl der eingereihten Zustellungen zurueck.
    pub fn verteile(&self, absender: PlayerId, daten: &[u8], roster: &[Spieler]) -> usize {
        if daten.len() > MAX_DATEN_LAENGE {
            error!(
                absender = %absender,
                laenge = daten.len(),
                maximum = MAX_DATEN_LAENGE,
                "Frame sprengt das Laengenfeld, verworfen"
            );
            return 0;
        }

        let absender_eintrag = match roster.iter().find(|s| s.id == absender) {
            Some(eintrag) => eintrag,
            None => {
                debug!(absender = %absender, "Frame von Spieler ausserhalb des Rosters verworfen");
                return 0;
            }
        };

        let richtlinie = self.richtlinie();
        let ist_broadcaster = self.inner.broadcaster.contains(&absender);

        let mut positional: Option<Arc<Vec<u8>>> = None;
        let mut global: Option<Arc<Vec<u8>>> = None;
        let mut zugestellt = 0usize;

        for empfaenger in roster {
            let zustellung =
                match entscheide(absender_eintrag, empfaenger, &richtlinie, ist_broadcaster) {
                    Some(z) => z,
                    None => continue,
                };

            let variante = if zustellung.proximity {
                &mut positional
            } else {
                &mut global
            };
            if variante.is_none() {
                *variante = kodiere(absender, zustellung.proximity, daten);
            }
            let paket = match variante {
                Some(bytes) => Arc::clone(bytes),
                // Kodierfehler ist bereits geloggt und betrifft den ganzen Frame
                None => return zugestellt,
            };

            let griff = match self.inner.griffe.get(&empfaenger.id) {
                Some(griff) => griff,
                // Im Roster, aber (noch) ohne Queue: normal waehrend Join/Leave
                None => continue,
            };

            // Nicht-blockierend senden, bei voller Queue verwerfen
            match griff.try_send(paket) {
                Ok(()) => zugestellt += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(
                        empfaenger = %empfaenger.id,
                        "Send-Queue voll, Frame fuer diesen Empfaenger verworfen"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(
                        empfaenger = %empfaenger.id,
                        "Send-Queue geschlossen (Client getrennt)"
                    );
                }
            }
        }

        trace!(absender = %absender, empfaenger = zugestellt, "Frame verteilt");
        zugestellt
    }
}

impl Default for VoiceRouter {
    fn default() -> Self {
        Self::neu(ServerSettings::default())
    }
}

fn kodiere(absender: PlayerId, proximity: bool, daten: &[u8]) -> Option<Arc<Vec<u8>>> {
    match ClientVoicePaket::neu(absender, proximity, daten.to_vec()).encode() {
        Ok(bytes) => Some(Arc::new(bytes)),
        Err(e) => {
            error!(absender = %absender, fehler = %e, "Voice-Paket nicht kodierbar");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
