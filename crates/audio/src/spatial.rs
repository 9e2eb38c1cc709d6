//! Positionale Abbildung einer Stimme auf Stereo
//!
//! Reine Geometrie ohne Geraetezugriff: lineare Distanz-Daempfung und
//! ein Konstant-Leistungs-Panorama. Alle Positionen sind relativ zum
//! Hoerer, die X-Achse zeigt nach rechts, Z in die Tiefe, Y nach oben.

use flurfunk_core::Position;

/// Entfernung in Welteinheiten, ab der eine Stimme unhoerbar ist
pub const STANDARD_MAX_DISTANZ: f32 = 60.0;

/// Virtuelle Mindesttiefe fuer das geglaettete Panorama
///
/// Ohne diese Tiefe springt eine Stimme hart von ganz links nach ganz
/// rechts, sobald sie den Hoerer auf der X-Achse passiert.
pub const GLAETTUNGS_TIEFE: f32 = 1.5;

/// Lineare Distanz-Daempfung, geklemmt auf [0, 1]
///
/// Modell: `1 - abstand / max_distanz`. Bei `max_distanz <= 0` wird
/// nicht gedaempft.
pub fn daempfung(abstand: f32, max_distanz: f32) -> f32 {
    if max_distanz <= 0.0 {
        return 1.0;
    }
    (1.0 - abstand / max_distanz).clamp(0.0, 1.0)
}

/// Links/Rechts-Anteil einer Quelle in [-1, 1]
///
/// `glaetten` ersetzt die echte Tiefe durch eine Mindesttiefe, damit
/// der Seitenwechsel beim Vorbeilaufen weich bleibt.
pub fn pan(position: Position, glaetten: bool) -> f32 {
    let tiefe = if glaetten {
        (position.z * position.z + GLAETTUNGS_TIEFE * GLAETTUNGS_TIEFE).sqrt()
    } else {
        position.z.abs()
    };

    let laenge = (position.x * position.x + tiefe * tiefe).sqrt();
    if laenge < f32::EPSILON {
        0.0
    } else {
        position.x / laenge
    }
}

/// Konstant-Leistungs-Gewichte (links, rechts) fuer einen Pan-Wert
pub fn stereo_weights(pan: f32) -> (f32, f32) {
    let winkel = (pan.clamp(-1.0, 1.0) + 1.0) * std::f32::consts::FRAC_PI_4;
    (winkel.cos(), winkel.sin())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daempfung_verlauf() {
        assert_eq!(daempfung(0.0, 60.0), 1.0);
        assert_eq!(daempfung(30.0, 60.0), 0.5);
        assert_eq!(daempfung(60.0, 60.0), 0.0);
        assert_eq!(daempfung(100.0, 60.0), 0.0, "Hinter der Maximaldistanz bleibt es still");
    }

    #[test]
    fn daempfung_ohne_maximaldistanz() {
        assert_eq!(daempfung(1_000.0, 0.0), 1.0);
        assert_eq!(daempfung(1_000.0, -5.0), 1.0);
    }

    #[test]
    fn pan_folgt_der_x_achse() {
        let rechts = pan(Position::new(5.0, 0.0, 5.0), false);
        let links = pan(Position::new(-5.0, 0.0, 5.0), false);
        assert!(rechts > 0.0);
        assert!(links < 0.0);
        assert!((rechts + links).abs() < 1e-6, "Spiegelung muss symmetrisch sein");
    }

    #[test]
    fn pan_mittig_ist_null() {
        assert_eq!(pan(Position::new(0.0, 0.0, 10.0), false), 0.0);
        assert_eq!(pan(Position::new(0.0, 3.0, 0.0), true), 0.0);
    }

    #[test]
    fn pan_am_hoerer_ist_mittig() {
        assert_eq!(pan(Position::new(0.0, 0.0, 0.0), false), 0.0);
    }

    #[test]
    fn glaettung_verhindert_harten_seitenwechsel() {
        // Quelle dicht neben dem Hoerer, Tiefe praktisch null
        let position = Position::new(0.5, 0.0, 0.01);
        let hart = pan(position, false);
        let weich = pan(position, true);
        assert!(hart > 0.99, "Ohne Glaettung liegt die Quelle ganz rechts");
        assert!(weich < 0.5, "Mit Glaettung bleibt der Uebergang weich, war {}", weich);
    }

    #[test]
    fn stereo_gewichte_extrempunkte() {
        let (l, r) = stereo_weights(-1.0);
        assert!((l - 1.0).abs() < 1e-6);
        assert!(r.abs() < 1e-6);

        let (l, r) = stereo_weights(1.0);
        assert!(l.abs() < 1e-6);
        assert!((r - 1.0).abs() < 1e-6);

        let (l, r) = stereo_weights(0.0);
        assert!((l - r).abs() < 1e-6, "Mittig muessen beide Seiten gleich sein");
    }

    #[test]
    fn stereo_gewichte_konstante_leistung() {
        for schritt in 0..=20 {
            let p = schritt as f32 / 10.0 - 1.0;
            let (l, r) = stereo_weights(p);
            let leistung = l * l + r * r;
            assert!(
                (leistung - 1.0).abs() < 1e-5,
                "Leistung bei pan {} war {}",
                p,
                leistung
            );
        }
    }
}
