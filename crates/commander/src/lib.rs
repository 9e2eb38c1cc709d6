//! flurfunk-commander – Textuelle Verwaltungsbefehle
//!
//! Client- und Server-Einstellungen werden ueber Chat-Befehle gelesen
//! und gesetzt. Einstellungen stehen in expliziten Name/Alias-Tabellen
//! mit Lese- und Schreibfunktionen; jede Eingabe liefert genau eine
//! textuelle Rueckmeldung.
//!
//! ## Module
//! - [`client`] – Befehle des lokalen Spielers (Audio, Geraete, Mute)
//! - [`server`] – Befehle des Betreibers (Routing-Schalter, Broadcast)
//! - [`einstellungen`] – Tabellen-Infrastruktur und Wert-Parser
//! - [`error`] – Fehlertypen

pub mod client;
pub mod einstellungen;
pub mod error;
pub mod server;

pub use client::{ClientCommander, CLIENT_EINSTELLUNGEN};
pub use einstellungen::EinstellungsEintrag;
pub use error::{CommanderError, CommanderResult};
pub use server::{ServerCommander, SERVER_EINSTELLUNGEN};
