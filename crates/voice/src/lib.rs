//! flurfunk-voice – Voice-Routing-Engine des Servers
//!
//! Entscheidet pro eingehendem Voice-Frame und Mitspieler ueber die
//! Zustellung und verteilt kodierte Pakete an die Send-Queues.
//!
//! ## Module
//! - [`router`] – Reine Zustellentscheidung und Fan-Out
//! - [`settings`] – Persistierte Routing-Schalter (JSON)
//! - [`engine`] – Fassade aus Router und Einstellungsdatei
//! - [`error`] – Fehlertypen

pub mod engine;
pub mod error;
pub mod router;
pub mod settings;

pub use engine::VoiceServer;
pub use error::{VoiceError, VoiceResult};
pub use router::{entscheide, VoiceRouter, Zustellung, SEND_QUEUE_GROESSE};
pub use settings::ServerSettings;
