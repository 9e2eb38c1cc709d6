//! flurfunk-protocol – Draht-Format der Voice-Pakete
//!
//! Definiert die binaere Struktur der beiden Voice-Nutzlasten, die ueber
//! den Netzwerk-Layer des Host-Spiels transportiert werden. Der Transport
//! selbst (Sockets, Sessions, Zustellung) ist Sache des Hosts.

pub mod wire;

pub use wire::{ClientVoicePaket, ServerVoicePaket, MAX_DATEN_LAENGE};
