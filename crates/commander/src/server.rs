//! Server-Befehle: Routing-Schalter und Broadcast
//!
//! Verarbeitet die Verwaltungsbefehle des Server-Betreibers. Der Host
//! reicht die Zeile ohne das Befehls-Prefix (z.B. `/vcs`) weiter.
//!
//! ## Befehle
//! - `set` – Uebersicht aller Schalter
//! - `set <name>` – aktuellen Wert zeigen
//! - `set <name> true|false` – Schalter setzen (wird persistiert)
//! - `broadcast <spieler-id>` – Broadcast fuer einen Spieler umschalten

use std::sync::Arc;

use tracing::debug;

use crate::einstellungen::{finde, parse_bool, uebersicht, EinstellungsEintrag};
use crate::error::{CommanderError, CommanderResult};
use flurfunk_core::PlayerId;
use flurfunk_voice::VoiceServer;

/// Einstellungs-Tabelle des Servers
pub const SERVER_EINSTELLUNGEN: &[EinstellungsEintrag<VoiceServer>] = &[
    EinstellungsEintrag {
        name: "teamvoicesonly",
        aliase: &["teamonly"],
        beschreibung: "Nur Teamkollegen hoeren sich",
        lese: |server| {
            format!("teamvoicesonly = {}", server.einstellungen().team_voices_only)
        },
        setze: |server, wert| {
            let wert = parse_bool(wert)?;
            melde_schalter("teamvoicesonly", wert, server.set_team_voices_only(wert))
        },
    },
    EinstellungsEintrag {
        name: "teamvoicesglobally",
        aliase: &["teamglobal"],
        beschreibung: "Teamkollegen hoeren sich szenenunabhaengig global",
        lese: |server| {
            format!(
                "teamvoicesglobally = {}",
                server.einstellungen().team_voices_globally
            )
        },
        setze: |server, wert| {
            let wert = parse_bool(wert)?;
            melde_schalter(
                "teamvoicesglobally",
                wert,
                server.set_team_voices_globally(wert),
            )
        },
    },
    EinstellungsEintrag {
        name: "proximitybasedvolume",
        aliase: &["proximityvolume", "proximity"],
        beschreibung: "Zustellung in derselben Szene positional abspielen",
        lese: |server| {
            format!(
                "proximitybasedvolume = {}",
                server.einstellungen().proximity_based_volume
            )
        },
        setze: |server, wert| {
            let wert = parse_bool(wert)?;
            melde_schalter(
                "proximitybasedvolume",
                wert,
                server.set_proximity_based_volume(wert),
            )
        },
    },
];

/// Ein gesetzter Schalter ist auch bei fehlgeschlagenem Persistieren aktiv;
/// der Schreibfehler erscheint in der Rueckmeldung.
fn melde_schalter(
    name: &str,
    wert: bool,
    ergebnis: flurfunk_voice::VoiceResult<()>,
) -> CommanderResult<String> {
    match ergebnis {
        Ok(()) => Ok(format!("{} = {}", name, wert)),
        Err(e) => Ok(format!(
            "{} = {} (Speichern fehlgeschlagen: {})",
            name, wert, e
        )),
    }
}

/// Befehlsausfuehrung auf der Server-Seite
pub struct ServerCommander {
    server: Arc<VoiceServer>,
}

impl ServerCommander {
    /// Erstellt den Commander ueber dem geteilten Voice-Server
    pub fn neu(server: Arc<VoiceServer>) -> Self {
        Self { server }
    }

    /// Fuehrt eine Befehlszeile aus und gibt die Rueckmeldung zurueck
    pub fn ausfuehren(&self, eingabe: &str) -> String {
        debug!(befehl = %eingabe, "Server-Befehl");
        match self.verarbeite(eingabe) {
            Ok(text) => text,
            Err(e) => e.to_string(),
        }
    }

    fn verarbeite(&self, eingabe: &str) -> CommanderResult<String> {
        let teile: Vec<&str> = eingabe.split_whitespace().collect();

        match teile.as_slice() {
            ["set"] => Ok(uebersicht(SERVER_EINSTELLUNGEN, &self.server)),
            ["set", name] => Ok((self.eintrag(name)?.lese)(&self.server)),
            ["set", name, wert] => (self.eintrag(name)?.setze)(&self.server, wert),
            ["broadcast", spieler] => self.broadcast(spieler),
            [] => Err(CommanderError::UngueltigeEingabe("Leerer Befehl".into())),
            _ => Err(CommanderError::UnbekannterBefehl(eingabe.trim().to_string())),
        }
    }

    fn eintrag(&self, name: &str) -> CommanderResult<&'static EinstellungsEintrag<VoiceServer>> {
        finde(SERVER_EINSTELLUNGEN, name)
            .ok_or_else(|| CommanderError::UnbekannteEinstellung(name.to_string()))
    }

    fn broadcast(&self, spieler: &str) -> CommanderResult<String> {
        let id = spieler.parse::<u16>().map_err(|_| {
            CommanderError::UngueltigeEingabe(format!("Ungueltige Spieler-ID: '{}'", spieler))
        })?;
        let id = PlayerId(id);

        Ok(match self.server.broadcast_umschalten(id) {
            true => format!("Broadcast aktiviert fuer {}", id),
            false => format!("Broadcast deaktiviert fuer {}", id),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn commander() -> (tempfile::TempDir, ServerCommander) {
        let verzeichnis = tempfile::tempdir().expect("Temp-Verzeichnis");
        let server = VoiceServer::neu(verzeichnis.path().join("voice.json"));
        (verzeichnis, ServerCommander::neu(Arc::new(server)))
    }

    #[test]
    fn uebersicht_zeigt_alle_schalter() {
        let (_verzeichnis, commander) = commander();
        let text = commander.ausfuehren("set");
        assert!(text.contains("teamvoicesonly = false"));
        assert!(text.contains("teamvoicesglobally = false"));
        assert!(text.contains("proximitybasedvolume = true"));
    }

    #[test]
    fn schalter_setzen_und_zeigen() {
        let (_verzeichnis, commander) = commander();
        assert_eq!(
            commander.ausfuehren("set teamvoicesonly true"),
            "teamvoicesonly = true"
        );
        assert_eq!(
            commander.ausfuehren("set teamvoicesonly"),
            "teamvoicesonly = true"
        );
        assert!(commander.server.einstellungen().team_voices_only);
    }

    #[test]
    fn aliase_funktionieren() {
        let (_verzeichnis, commander) = commander();
        assert_eq!(
            commander.ausfuehren("set proximity false"),
            "proximitybasedvolume = false"
        );
        assert_eq!(
            commander.ausfuehren("set teamglobal true"),
            "teamvoicesglobally = true"
        );
    }

    #[test]
    fn schalterwert_muss_true_oder_false_sein() {
        let (_verzeichnis, commander) = commander();
        let text = commander.ausfuehren("set teamvoicesonly ja");
        assert!(text.contains("Erwarte true oder false"));
        assert!(!commander.server.einstellungen().team_voices_only);
    }

    #[test]
    fn broadcast_umschalten() {
        let (_verzeichnis, commander) = commander();
        assert_eq!(
            commander.ausfuehren("broadcast 5"),
            "Broadcast aktiviert fuer spieler:5"
        );
        assert!(commander.server.ist_broadcaster(PlayerId(5)));
        assert_eq!(
            commander.ausfuehren("broadcast 5"),
            "Broadcast deaktiviert fuer spieler:5"
        );
    }

    #[test]
    fn broadcast_mit_kaputter_id() {
        let (_verzeichnis, commander) = commander();
        let text = commander.ausfuehren("broadcast alle");
        assert!(text.contains("Ungueltige Spieler-ID"));
    }

    #[test]
    fn unbekannte_eingaben() {
        let (_verzeichnis, commander) = commander();
        assert_eq!(commander.ausfuehren("kick 5"), "Unbekannter Befehl: kick 5");
        assert_eq!(
            commander.ausfuehren("set gibtsnicht"),
            "Unbekannte Einstellung: gibtsnicht"
        );
    }
}
