//! Binaere Voice-Pakete (Client -> Server und Server -> Client)
//!
//! Direkte Byte-Serialisierung ueber `bytes::{Buf, BufMut}`, kein serde
//! (Hot Path, ein Paket pro 20-ms-Frame und Empfaenger).
//!
//! ## Paketformate (alle Ganzzahlen big-endian)
//!
//! ```text
//! Server-gerichtet (vom sprechenden Client):
//!   Offset  Len  Beschreibung
//!   ------  ---  -----------
//!    0       2   Laenge der Nutzdaten (u16)
//!    2       N   Opus-Nutzdaten
//!
//! Client-gerichtet (vom Server an jeden Empfaenger):
//!    0       2   Absender PlayerId (u16)
//!    2       1   Proximity-Flag (0 = global, 1 = positional)
//!    3       2   Laenge der Nutzdaten (u16)
//!    5       N   Opus-Nutzdaten
//! ```
//!
//! Beide Richtungen sind fuer unzuverlaessige Zustellung gedacht; ein
//! verlorenes Paket wird nie nachgesendet. Aeltere, noch nicht zugestellte
//! Frames duerfen vom Transport nicht zugunsten neuerer verworfen werden,
//! jeder Frame ist eigenstaendig.

use bytes::{Buf, BufMut};
use flurfunk_core::PlayerId;
use std::io;

/// Maximale Nutzdaten-Laenge in Bytes (16-bit Laengenfeld)
pub const MAX_DATEN_LAENGE: usize = 65_535;

fn pruefe_laenge(laenge: usize) -> io::Result<()> {
    if laenge > MAX_DATEN_LAENGE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "Nutzdaten zu gross: {} Bytes (Maximum {})",
                laenge, MAX_DATEN_LAENGE
            ),
        ));
    }
    Ok(())
}

fn lese_nutzdaten(buf: &mut &[u8]) -> io::Result<Vec<u8>> {
    if buf.remaining() < 2 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "Laengenfeld fehlt",
        ));
    }
    let laenge = buf.get_u16() as usize;
    if buf.remaining() < laenge {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Nutzdaten unvollstaendig: {} von {} Bytes",
                buf.remaining(),
                laenge
            ),
        ));
    }
    let mut daten = vec![0u8; laenge];
    buf.copy_to_slice(&mut daten);
    Ok(daten)
}

fn pruefe_restbytes(buf: &[u8]) -> io::Result<()> {
    if buf.has_remaining() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{} unerwartete Restbytes nach den Nutzdaten", buf.remaining()),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// ServerVoicePaket
// ---------------------------------------------------------------------------

/// Voice-Frame vom sprechenden Client an den Server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerVoicePaket {
    /// Opus-kodierte Nutzdaten (max. `MAX_DATEN_LAENGE` Bytes)
    pub daten: Vec<u8>,
}

impl ServerVoicePaket {
    /// Transport-Hinweis: Voice-Frames werden unzuverlaessig zugestellt
    pub const ZUVERLAESSIG: bool = false;
    /// Transport-Hinweis: aeltere Frames nie durch neuere verdraengen
    pub const VERWERFE_BEI_NEUEREM: bool = false;

    /// Erstellt ein neues Paket aus Opus-Nutzdaten
    pub fn neu(daten: Vec<u8>) -> Self {
        Self { daten }
    }

    /// Serialisiert das Paket
    ///
    /// # Fehler
    /// `InvalidInput` wenn die Nutzdaten das 16-bit Laengenfeld sprengen.
    /// Der Aufrufer muss das Paket dann verwerfen statt es zu senden.
    pub fn encode(&self) -> io::Result<Vec<u8>> {
        pruefe_laenge(self.daten.len())?;
        let mut buf = Vec::with_capacity(2 + self.daten.len());
        buf.put_u16(self.daten.len() as u16);
        buf.put_slice(&self.daten);
        Ok(buf)
    }

    /// Deserialisiert ein Paket aus einem Byte-Slice
    ///
    /// # Fehler
    /// - `UnexpectedEof` wenn das Laengenfeld fehlt
    /// - `InvalidData` wenn die Nutzdaten kuerzer als angekuendigt sind
    ///   oder Restbytes folgen
    pub fn decode(mut buf: &[u8]) -> io::Result<Self> {
        let daten = lese_nutzdaten(&mut buf)?;
        pruefe_restbytes(buf)?;
        Ok(Self { daten })
    }
}

// ---------------------------------------------------------------------------
// ClientVoicePaket
// ---------------------------------------------------------------------------

/// Voice-Frame vom Server an einen empfangenden Client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientVoicePaket {
    /// Spieler, von dem der Frame stammt
    pub absender: PlayerId,
    /// true = positional abspielen, false = global in voller Lautstaerke
    pub proximity: bool,
    /// Opus-kodierte Nutzdaten (max. `MAX_DATEN_LAENGE` Bytes)
    pub daten: Vec<u8>,
}

impl ClientVoicePaket {
    /// Transport-Hinweis: Voice-Frames werden unzuverlaessig zugestellt
    pub const ZUVERLAESSIG: bool = false;
    /// Transport-Hinweis: aeltere Frames nie durch neuere verdraengen
    pub const VERWERFE_BEI_NEUEREM: bool = false;

    /// Erstellt ein neues Paket
    pub fn neu(absender: PlayerId, proximity: bool, daten: Vec<u8>) -> Self {
        Self {
            absender,
            proximity,
            daten,
        }
    }

    /// Serialisiert das Paket
    ///
    /// # Fehler
    /// `InvalidInput` wenn die Nutzdaten das 16-bit Laengenfeld sprengen.
    pub fn encode(&self) -> io::Result<Vec<u8>> {
        pruefe_laenge(self.daten.len())?;
        let mut buf = Vec::with_capacity(5 + self.daten.len());
        buf.put_u16(self.absender.inner());
        buf.put_u8(self.proximity as u8);
        buf.put_u16(self.daten.len() as u16);
        buf.put_slice(&self.daten);
        Ok(buf)
    }

    /// Deserialisiert ein Paket aus einem Byte-Slice
    ///
    /// # Fehler
    /// - `UnexpectedEof` wenn Kopf oder Laengenfeld fehlen
    /// - `InvalidData` bei ungueltigem Proximity-Byte, zu kurzen
    ///   Nutzdaten oder Restbytes
    pub fn decode(mut buf: &[u8]) -> io::Result<Self> {
        if buf.remaining() < 3 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("Paketkopf zu kurz: {} Bytes", buf.remaining()),
            ));
        }
        let absender = PlayerId(buf.get_u16());
        let proximity = match buf.get_u8() {
            0 => false,
            1 => true,
            wert => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Ungueltiges Proximity-Byte: {}", wert),
                ))
            }
        };
        let daten = lese_nutzdaten(&mut buf)?;
        pruefe_restbytes(buf)?;
        Ok(Self {
            absender,
            proximity,
            daten,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_paket_roundtrip() {
        let paket = ServerVoicePaket::neu(vec![0xAB, 0xCD, 0xEF]);
        let bytes = paket.encode().expect("Encode muss gelingen");
        assert_eq!(bytes.len(), 2 + 3);

        let zurueck = ServerVoicePaket::decode(&bytes).expect("Decode muss gelingen");
        assert_eq!(zurueck, paket);
    }

    #[test]
    fn server_paket_laengenfeld_big_endian() {
        let paket = ServerVoicePaket::neu(vec![0u8; 0x0102]);
        let bytes = paket.encode().unwrap();
        assert_eq!(bytes[0], 0x01, "Laengenfeld muss big-endian sein");
        assert_eq!(bytes[1], 0x02);
    }

    #[test]
    fn server_paket_leere_nutzdaten() {
        let paket = ServerVoicePaket::neu(Vec::new());
        let bytes = paket.encode().unwrap();
        assert_eq!(bytes, vec![0, 0]);
        assert_eq!(ServerVoicePaket::decode(&bytes).unwrap().daten.len(), 0);
    }

    #[test]
    fn server_paket_uebergroesse_abgelehnt() {
        let paket = ServerVoicePaket::neu(vec![0u8; MAX_DATEN_LAENGE + 1]);
        let ergebnis = paket.encode();
        assert!(ergebnis.is_err(), "Uebergrosse Nutzdaten duerfen nicht kodiert werden");
        assert_eq!(
            ergebnis.unwrap_err().kind(),
            io::ErrorKind::InvalidInput
        );
    }

    #[test]
    fn server_paket_maximalgroesse_erlaubt() {
        let paket = ServerVoicePaket::neu(vec![0x55; MAX_DATEN_LAENGE]);
        let bytes = paket.encode().expect("Exakt 65535 Bytes sind erlaubt");
        let zurueck = ServerVoicePaket::decode(&bytes).unwrap();
        assert_eq!(zurueck.daten.len(), MAX_DATEN_LAENGE);
    }

    #[test]
    fn server_paket_abgeschnitten() {
        let paket = ServerVoicePaket::neu(vec![1, 2, 3, 4]);
        let mut bytes = paket.encode().unwrap();
        bytes.truncate(4);
        let ergebnis = ServerVoicePaket::decode(&bytes);
        assert!(ergebnis.is_err(), "Abgeschnittene Nutzdaten muessen abgelehnt werden");
    }

    #[test]
    fn server_paket_restbytes_abgelehnt() {
        let paket = ServerVoicePaket::neu(vec![1, 2]);
        let mut bytes = paket.encode().unwrap();
        bytes.push(0xFF);
        assert!(ServerVoicePaket::decode(&bytes).is_err());
    }

    #[test]
    fn server_paket_leerer_puffer() {
        assert!(ServerVoicePaket::decode(&[]).is_err());
        assert!(ServerVoicePaket::decode(&[0x01]).is_err());
    }

    #[test]
    fn client_paket_roundtrip() {
        let paket = ClientVoicePaket::neu(PlayerId(513), true, vec![9, 8, 7]);
        let bytes = paket.encode().unwrap();
        let zurueck = ClientVoicePaket::decode(&bytes).unwrap();
        assert_eq!(zurueck, paket);
    }

    #[test]
    fn client_paket_layout() {
        let paket = ClientVoicePaket::neu(PlayerId(0x0102), false, vec![0xAA]);
        let bytes = paket.encode().unwrap();
        assert_eq!(bytes[0], 0x01, "Absender-ID muss big-endian sein");
        assert_eq!(bytes[1], 0x02);
        assert_eq!(bytes[2], 0, "Proximity false muss als 0 kodiert werden");
        assert_eq!(bytes[3], 0x00);
        assert_eq!(bytes[4], 0x01);
        assert_eq!(bytes[5], 0xAA);
    }

    #[test]
    fn client_paket_proximity_flag() {
        for proximity in [false, true] {
            let paket = ClientVoicePaket::neu(PlayerId(1), proximity, vec![1]);
            let zurueck = ClientVoicePaket::decode(&paket.encode().unwrap()).unwrap();
            assert_eq!(zurueck.proximity, proximity);
        }
    }

    #[test]
    fn client_paket_ungueltiges_proximity_byte() {
        let paket = ClientVoicePaket::neu(PlayerId(1), true, vec![1]);
        let mut bytes = paket.encode().unwrap();
        bytes[2] = 7;
        let ergebnis = ClientVoicePaket::decode(&bytes);
        assert!(ergebnis.is_err(), "Proximity-Byte ausserhalb 0/1 muss abgelehnt werden");
    }

    #[test]
    fn client_paket_uebergroesse_abgelehnt() {
        let paket = ClientVoicePaket::neu(PlayerId(1), false, vec![0u8; MAX_DATEN_LAENGE + 1]);
        assert!(paket.encode().is_err());
    }

    #[test]
    fn transport_hinweise() {
        assert!(!ServerVoicePaket::ZUVERLAESSIG);
        assert!(!ServerVoicePaket::VERWERFE_BEI_NEUEREM);
        assert!(!ClientVoicePaket::ZUVERLAESSIG);
        assert!(!ClientVoicePaket::VERWERFE_BEI_NEUEREM);
    }
}
