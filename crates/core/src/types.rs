//! Gemeinsame Typen fuer Roster, Routing und Playback
//!
//! Spieler-IDs verwenden das Newtype-Pattern um Verwechslungen mit anderen
//! numerischen Werten zur Compilezeit auszuschliessen. Die Daten selbst
//! (wer, welches Team, welche Szene, wo) gehoeren dem Host-Spiel; Flurfunk
//! liest sie nur.

use serde::{Deserialize, Serialize};

/// Team-Name, der einen Spieler als "ohne Team" markiert
pub const KEIN_TEAM: &str = "no team";

/// Eindeutige Spieler-ID innerhalb einer Session
///
/// Der Wert stammt vom Host-Spiel und wird unveraendert auf dem Draht
/// uebertragen (u16, big-endian).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u16);

impl PlayerId {
    /// Gibt den inneren Wert zurueck
    pub fn inner(&self) -> u16 {
        self.0
    }
}

impl From<u16> for PlayerId {
    fn from(wert: u16) -> Self {
        Self(wert)
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "spieler:{}", self.0)
    }
}

/// Team-Zugehoerigkeit eines Spielers
///
/// Das Host-Spiel liefert Team-Namen als Strings; `KEIN_TEAM` ist der
/// Sentinel fuer Spieler ohne Team-Zuweisung.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Team(pub String);

impl Team {
    /// Erstellt ein Team aus einem Namen
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Erstellt den "ohne Team"-Sentinel
    pub fn none() -> Self {
        Self(KEIN_TEAM.to_string())
    }

    /// Gibt zurueck ob der Spieler einem echten Team angehoert
    pub fn is_assigned(&self) -> bool {
        self.0 != KEIN_TEAM
    }

    /// Gibt den Team-Namen zurueck
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Szene (Welt/Level), in der sich ein Spieler befindet
///
/// Voice wird nur innerhalb derselben Szene positional zugestellt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SceneId(pub u32);

impl SceneId {
    /// Gibt den inneren Wert zurueck
    pub fn inner(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for SceneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "szene:{}", self.0)
    }
}

/// Dreidimensionale Position bzw. relativer Versatz
///
/// Fuer die Spatialisierung gilt die Hoerer-relative Konvention:
/// x = seitlich (rechts positiv), y = Hoehe, z = Tiefe (vor dem Hoerer
/// positiv). Die Einheit ist die Welt-Einheit des Host-Spiels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    /// Erstellt eine Position aus drei Koordinaten
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euklidische Laenge des Vektors
    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Abstand zu einer anderen Position
    pub fn distance_to(&self, andere: &Position) -> f32 {
        (*self - *andere).length()
    }
}

impl std::ops::Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Position) -> Position {
        Position {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

/// Roster-Eintrag eines Spielers (Schnappschuss)
///
/// Der Server fragt den Roster pro Voice-Frame als Schnappschuss ab;
/// die Felder werden vom Host-Spiel gepflegt und hier nie mutiert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spieler {
    /// Eindeutige Spieler-ID
    pub id: PlayerId,
    /// Team-Zugehoerigkeit (Sentinel `KEIN_TEAM` falls ohne Team)
    pub team: Team,
    /// Aktuelle Szene
    pub szene: SceneId,
    /// Welt-Position (absolut, fuer relative Berechnungen des Hosts)
    pub position: Position,
}
