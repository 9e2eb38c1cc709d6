//! Einstellungs-Tabellen: Name und Aliase auf Lese-/Schreibfunktionen
//!
//! Jede per Befehl erreichbare Einstellung steht als expliziter Eintrag
//! in einer statischen Tabelle; neue Einstellungen bekommen einen neuen
//! Eintrag. Die Funktionszeiger arbeiten direkt auf dem Zielobjekt
//! (Client-Audio-Engine bzw. Voice-Server).

use crate::error::{CommanderError, CommanderResult};

/// Ein per Name oder Alias ansprechbarer Einstellungs-Eintrag
pub struct EinstellungsEintrag<Z> {
    /// Kanonischer Name (kleingeschrieben)
    pub name: &'static str,
    /// Alternative Schreibweisen (kleingeschrieben)
    pub aliase: &'static [&'static str],
    /// Kurzbeschreibung fuer die Uebersicht
    pub beschreibung: &'static str,
    /// Liest den aktuellen Wert als Rueckmeldungszeile
    pub lese: fn(&Z) -> String,
    /// Setzt den Wert aus der Texteingabe und meldet das Ergebnis
    pub setze: fn(&Z, &str) -> CommanderResult<String>,
}

/// Sucht einen Eintrag ueber Name oder Alias (Gross-/Kleinschreibung egal)
pub fn finde<'t, Z>(
    tabelle: &'t [EinstellungsEintrag<Z>],
    name: &str,
) -> Option<&'t EinstellungsEintrag<Z>> {
    let name = name.to_ascii_lowercase();
    tabelle
        .iter()
        .find(|eintrag| eintrag.name == name || eintrag.aliase.contains(&name.as_str()))
}

/// Liest alle Eintraege einer Tabelle als mehrzeilige Uebersicht
pub fn uebersicht<Z>(tabelle: &[EinstellungsEintrag<Z>], ziel: &Z) -> String {
    tabelle
        .iter()
        .map(|eintrag| format!("{} ({})", (eintrag.lese)(ziel), eintrag.beschreibung))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parst einen Schalterwert, akzeptiert genau "true" und "false"
pub fn parse_bool(wert: &str) -> CommanderResult<bool> {
    match wert {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(CommanderError::UngueltigeEingabe(format!(
            "Erwarte true oder false, nicht '{}'",
            wert
        ))),
    }
}

/// Parst einen Zahlenwert
pub fn parse_f32(wert: &str) -> CommanderResult<f32> {
    wert.parse().map_err(|_| {
        CommanderError::UngueltigeEingabe(format!("Ungueltige Zahl: '{}'", wert))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
