//! Client-Befehle: Audio-Einstellungen und Geraetewahl
//!
//! Verarbeitet die Chat-Befehle des lokalen Spielers. Der Host reicht
//! die Zeile ohne das Befehls-Prefix (z.B. `/vcc`) weiter; jede Eingabe
//! ergibt genau eine textuelle Rueckmeldung.
//!
//! ## Befehle
//! - `set` – Uebersicht aller Einstellungen
//! - `set <name>` – aktuellen Wert zeigen
//! - `set <name> <wert>` – Wert setzen
//! - `mute` – Mikrofon stummschalten bzw. wieder aktivieren
//! - `device list mics|speakers` – verfuegbare Geraete auflisten
//! - `device set mic|speaker <name>` – Geraet waehlen (`default` fuer
//!   den Systemstandard)

use std::sync::Arc;

use tracing::debug;

use crate::einstellungen::{finde, parse_bool, parse_f32, uebersicht, EinstellungsEintrag};
use crate::error::{CommanderError, CommanderResult};
use flurfunk_audio::{list_input_devices, list_output_devices, AudioEngine};

/// Einstellungs-Tabelle des Clients
pub const CLIENT_EINSTELLUNGEN: &[EinstellungsEintrag<AudioEngine>] = &[
    EinstellungsEintrag {
        name: "micvolume",
        aliase: &["micvol", "micamp"],
        beschreibung: "Mikrofon-Verstaerkung, ueber 0 bis 4",
        lese: |engine| {
            format!(
                "micvolume = {}",
                engine.einstellungen().microphone_amplification
            )
        },
        setze: |engine, wert| {
            let wert = parse_f32(wert)?;
            engine
                .set_microphone_amplification(wert)
                .map_err(|e| CommanderError::UngueltigeEingabe(e.to_string()))?;
            Ok(format!("micvolume = {}", wert))
        },
    },
    EinstellungsEintrag {
        name: "speakervolume",
        aliase: &["speakervol"],
        beschreibung: "Wiedergabe-Lautstaerke, 0 bis 6",
        lese: |engine| {
            format!("speakervolume = {}", engine.einstellungen().voice_chat_volume)
        },
        setze: |engine, wert| {
            let wert = parse_f32(wert)?;
            engine
                .set_voice_chat_volume(wert)
                .map_err(|e| CommanderError::UngueltigeEingabe(e.to_string()))?;
            Ok(format!("speakervolume = {}", wert))
        },
    },
    EinstellungsEintrag {
        name: "smoothaudio",
        aliase: &[],
        beschreibung: "Weiche Panorama-Uebergaenge, true oder false",
        lese: |engine| {
            format!(
                "smoothaudio = {}",
                engine.einstellungen().smooth_channel_transition
            )
        },
        setze: |engine, wert| {
            let wert = parse_bool(wert)?;
            engine.set_smooth_transition(wert);
            Ok(format!("smoothaudio = {}", wert))
        },
    },
];

/// Befehlsausfuehrung auf der Client-Seite
pub struct ClientCommander {
    engine: Arc<AudioEngine>,
}

impl ClientCommander {
    /// Erstellt den Commander ueber der geteilten Audio-Engine
    pub fn neu(engine: Arc<AudioEngine>) -> Self {
        Self { engine }
    }

    /// Fuehrt eine Befehlszeile aus und gibt die Rueckmeldung zurueck
    pub fn ausfuehren(&self, eingabe: &str) -> String {
        debug!(befehl = %eingabe, "Client-Befehl");
        match self.verarbeite(eingabe) {
            Ok(text) => text,
            Err(e) => e.to_string(),
        }
    }

    fn verarbeite(&self, eingabe: &str) -> CommanderResult<String> {
        let teile: Vec<&str> = eingabe.split_whitespace().collect();

        match teile.as_slice() {
            ["set"] => Ok(uebersicht(CLIENT_EINSTELLUNGEN, &self.engine)),
            ["set", name] => Ok((self.eintrag(name)?.lese)(&self.engine)),
            ["set", name, wert] => (self.eintrag(name)?.setze)(&self.engine, wert),
            ["mute"] => Ok(match self.engine.toggle_muted() {
                true => "Mikrofon stummgeschaltet".to_string(),
                false => "Mikrofon wieder aktiv".to_string(),
            }),
            ["device", "list", "mics"] => Ok(geraete_liste("Mikrofone", list_input_devices()?)),
            ["device", "list", "speakers"] => {
                Ok(geraete_liste("Lautsprecher", list_output_devices()?))
            }
            ["device", "list", klasse] => Err(CommanderError::UngueltigeEingabe(format!(
                "Unbekannte Geraeteklasse '{}', erwartet mics oder speakers",
                klasse
            ))),
            ["device", "set", klasse, rest @ ..] => self.setze_geraet(klasse, rest),
            [] => Err(CommanderError::UngueltigeEingabe("Leerer Befehl".into())),
            _ => Err(CommanderError::UnbekannterBefehl(eingabe.trim().to_string())),
        }
    }

    fn eintrag(&self, name: &str) -> CommanderResult<&'static EinstellungsEintrag<AudioEngine>> {
        finde(CLIENT_EINSTELLUNGEN, name)
            .ok_or_else(|| CommanderError::UnbekannteEinstellung(name.to_string()))
    }

    fn setze_geraet(&self, klasse: &str, namens_teile: &[&str]) -> CommanderResult<String> {
        if namens_teile.is_empty() {
            return Err(CommanderError::UngueltigeEingabe(
                "Geraetename fehlt ('default' waehlt den Systemstandard)".into(),
            ));
        }

        let name = namens_teile.join(" ");
        let wunsch = match name.as_str() {
            "default" => None,
            _ => Some(name),
        };
        let anzeige = match &wunsch {
            Some(name) => name.clone(),
            None => "Systemstandard".to_string(),
        };

        match klasse {
            "mic" => {
                self.engine.set_input_device(wunsch)?;
                Ok(format!("Mikrofon-Geraet: {}", anzeige))
            }
            "speaker" => {
                self.engine.set_output_device(wunsch)?;
                Ok(format!("Lautsprecher-Geraet: {}", anzeige))
            }
            _ => Err(CommanderError::UngueltigeEingabe(format!(
                "Unbekannte Geraeteklasse '{}', erwartet mic oder speaker",
                klasse
            ))),
        }
    }
}

fn geraete_liste(titel: &str, namen: Vec<String>) -> String {
    if namen.is_empty() {
        return format!("{}: keine Geraete gefunden", titel);
    }
    let mut zeilen = vec![format!("{}:", titel)];
    for (nummer, name) in namen.iter().enumerate() {
        zeilen.push(format!("  {}. {}", nummer + 1, name));
    }
    zeilen.join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use flurfunk_audio::ClientSettings;

    fn commander() -> ClientCommander {
        let (engine, _pakete) = AudioEngine::neu(ClientSettings::default()).unwrap();
        ClientCommander::neu(Arc::new(engine))
    }

    #[test]
    fn uebersicht_zeigt_alle_einstellungen() {
        let commander = commander();
        let text = commander.ausfuehren("set");
        assert!(text.contains("micvolume = 1"));
        assert!(text.contains("speakervolume = 1"));
        assert!(text.contains("smoothaudio = true"));
    }

    #[test]
    fn wert_setzen_und_zeigen() {
        let commander = commander();
        assert_eq!(commander.ausfuehren("set micvolume 2"), "micvolume = 2");
        assert_eq!(commander.ausfuehren("set micvolume"), "micvolume = 2");
        assert_eq!(
            commander.engine.einstellungen().microphone_amplification,
            2.0
        );
    }

    #[test]
    fn aliase_erreichen_denselben_eintrag() {
        let commander = commander();
        assert_eq!(commander.ausfuehren("set micamp 3"), "micvolume = 3");
        assert_eq!(commander.ausfuehren("set micvol"), "micvolume = 3");
        assert_eq!(commander.ausfuehren("set speakervol 0.5"), "speakervolume = 0.5");
    }

    #[test]
    fn bereichsfehler_wird_gemeldet() {
        let commander = commander();
        let text = commander.ausfuehren("set micvolume 9");
        assert!(text.starts_with("Ungueltige Eingabe"), "Rueckmeldung war: {}", text);
        assert_eq!(
            commander.engine.einstellungen().microphone_amplification,
            1.0,
            "Abgelehnter Wert darf nichts aendern"
        );
    }

    #[test]
    fn zahlenfehler_wird_gemeldet() {
        let commander = commander();
        let text = commander.ausfuehren("set micvolume laut");
        assert!(text.contains("Ungueltige Zahl"));
    }

    #[test]
    fn unbekannte_einstellung() {
        let commander = commander();
        assert_eq!(
            commander.ausfuehren("set gibtsnicht"),
            "Unbekannte Einstellung: gibtsnicht"
        );
    }

    #[test]
    fn mute_schaltet_um() {
        let commander = commander();
        assert_eq!(commander.ausfuehren("mute"), "Mikrofon stummgeschaltet");
        assert!(commander.engine.einstellungen().muted);
        assert_eq!(commander.ausfuehren("mute"), "Mikrofon wieder aktiv");
        assert!(!commander.engine.einstellungen().muted);
    }

    #[test]
    fn smoothaudio_schalter() {
        let commander = commander();
        assert_eq!(commander.ausfuehren("set smoothaudio false"), "smoothaudio = false");
        assert!(!commander.engine.einstellungen().smooth_channel_transition);
    }

    #[test]
    fn geraet_mit_leerzeichen_im_namen() {
        let commander = commander();
        let text = commander.ausfuehren("device set mic Blaues Headset Pro");
        assert_eq!(text, "Mikrofon-Geraet: Blaues Headset Pro");
        assert_eq!(
            commander.engine.einstellungen().microphone_device_name.as_deref(),
            Some("Blaues Headset Pro")
        );
    }

    #[test]
    fn geraet_default_setzt_systemstandard() {
        let commander = commander();
        commander.ausfuehren("device set speaker Irgendwas");
        let text = commander.ausfuehren("device set speaker default");
        assert_eq!(text, "Lautsprecher-Geraet: Systemstandard");
        assert!(commander.engine.einstellungen().speaker_device_name.is_none());
    }

    #[test]
    fn geraet_ohne_namen() {
        let commander = commander();
        let text = commander.ausfuehren("device set mic");
        assert!(text.starts_with("Ungueltige Eingabe"));
    }

    #[test]
    fn unbekannte_geraeteklasse() {
        let commander = commander();
        assert!(commander.ausfuehren("device list monitore").contains("Geraeteklasse"));
        assert!(commander.ausfuehren("device set monitor X").contains("Geraeteklasse"));
    }

    #[test]
    fn unbekannter_befehl_und_leere_eingabe() {
        let commander = commander();
        assert_eq!(commander.ausfuehren("bla"), "Unbekannter Befehl: bla");
        assert_eq!(commander.ausfuehren("   "), "Ungueltige Eingabe: Leerer Befehl");
    }

    #[test]
    #[ignore = "Benoetigt Audio-Hardware"]
    fn geraete_liste_enumeriert() {
        let commander = commander();
        let text = commander.ausfuehren("device list mics");
        assert!(text.starts_with("Mikrofone"));
    }
}
