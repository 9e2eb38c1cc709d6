//! Audio-Geraete-Enumeration und -Auswahl
//!
//! Geraete werden ueber ihren vollen Anzeigenamen angesprochen, so wie
//! ihn die Auflistung liefert. Ein konfiguriertes Geraet das nicht mehr
//! existiert faellt still auf das Standardgeraet zurueck, damit eine
//! veraltete Einstellung den Voice-Chat nie blockiert.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::Device;
use tracing::warn;

use crate::error::{AudioError, AudioResult};

/// Listet die Namen aller verfuegbaren Eingabegeraete auf
pub fn list_input_devices() -> AudioResult<Vec<String>> {
    let host = cpal::default_host();
    let geraete = host
        .input_devices()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?;
    Ok(lesbare_namen(geraete))
}

/// Listet die Namen aller verfuegbaren Ausgabegeraete auf
pub fn list_output_devices() -> AudioResult<Vec<String>> {
    let host = cpal::default_host();
    let geraete = host
        .output_devices()
        .map_err(|e| AudioError::StreamFehler(e.to_string()))?;
    Ok(lesbare_namen(geraete))
}

fn lesbare_namen(geraete: impl Iterator<Item = Device>) -> Vec<String> {
    let mut namen = Vec::new();
    for geraet in geraete {
        match geraet.name() {
            Ok(name) => namen.push(name),
            Err(e) => warn!(fehler = %e, "Geraetename nicht lesbar, Geraet uebersprungen"),
        }
    }
    namen
}

/// Oeffnet ein Eingabegeraet, mit Rueckfall auf das Standardgeraet
///
/// `None` oder ein nicht (mehr) vorhandener Name liefern das
/// Standardgeraet. Fehlt auch das, ist Aufnahme nicht moeglich.
pub fn input_device_with_fallback(name: Option<&str>) -> AudioResult<Device> {
    let host = cpal::default_host();

    if let Some(gesucht) = name {
        let geraete = host
            .input_devices()
            .map_err(|e| AudioError::StreamFehler(e.to_string()))?;
        for geraet in geraete {
            if geraet.name().map(|n| n == gesucht).unwrap_or(false) {
                return Ok(geraet);
            }
        }
        warn!(geraet = %gesucht, "Eingabegeraet nicht gefunden, nutze Standardgeraet");
    }

    host.default_input_device()
        .ok_or(AudioError::KeinStandardEingabegeraet)
}

/// Oeffnet ein Ausgabegeraet, mit Rueckfall auf das Standardgeraet
pub fn output_device_with_fallback(name: Option<&str>) -> AudioResult<Device> {
    let host = cpal::default_host();

    if let Some(gesucht) = name {
        let geraete = host
            .output_devices()
            .map_err(|e| AudioError::StreamFehler(e.to_string()))?;
        for geraet in geraete {
            if geraet.name().map(|n| n == gesucht).unwrap_or(false) {
                return Ok(geraet);
            }
        }
        warn!(geraet = %gesucht, "Ausgabegeraet nicht gefunden, nutze Standardgeraet");
    }

    host.default_output_device()
        .ok_or(AudioError::KeinStandardAusgabegeraet)
}

/// Loest einen gewuenschten Ausgabegeraete-Namen einmalig auf
///
/// Gibt `Some(name)` zurueck wenn das Geraet existiert, sonst `None`
/// fuer das Standardgeraet. Die Wiedergabe loest den Namen beim Oeffnen
/// einmal auf statt pro Stimme erneut zu suchen und zu warnen.
pub fn resolve_output_name(wunsch: Option<&str>) -> Option<String> {
    let gesucht = wunsch?;
    match list_output_devices() {
        Ok(namen) if namen.iter().any(|n| n == gesucht) => Some(gesucht.to_string()),
        Ok(_) => {
            warn!(geraet = %gesucht, "Ausgabegeraet nicht gefunden, nutze Standardgeraet");
            None
        }
        Err(e) => {
            warn!(fehler = %e, "Ausgabegeraete nicht auflistbar, nutze Standardgeraet");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "Benoetigt Audio-Hardware"]
    fn eingabegeraete_auflistbar() {
        let namen = list_input_devices().expect("Liste sollte abrufbar sein");
        println!("Eingabegeraete: {:?}", namen);
    }

    #[test]
    #[ignore = "Benoetigt Audio-Hardware"]
    fn ausgabegeraete_auflistbar() {
        let namen = list_output_devices().expect("Liste sollte abrufbar sein");
        println!("Ausgabegeraete: {:?}", namen);
    }

    #[test]
    #[ignore = "Benoetigt Audio-Hardware"]
    fn unbekannter_name_faellt_auf_standard() {
        let geraet = input_device_with_fallback(Some("gibt-es-nicht-xyz"));
        assert!(geraet.is_ok(), "Unbekannter Name muss auf Standard zurueckfallen");
    }

    #[test]
    fn kein_wunsch_bleibt_standard() {
        assert_eq!(resolve_output_name(None), None);
    }
}
