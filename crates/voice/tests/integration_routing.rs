//! Integration-Tests fuer den Voice-Server (Draht bis Zustellung)
//!
//! Prueft den vollen Serverpfad: ankommende Opus-Nutzdaten werden anhand
//! des Rosters verteilt und kommen als dekodierbare client-gerichtete
//! Pakete mit dem richtigen Proximity-Flag aus den Send-Queues.

use std::sync::Arc;

use flurfunk_core::{PlayerId, Position, SceneId, Spieler, Team};
use flurfunk_protocol::ClientVoicePaket;
use flurfunk_voice::VoiceServer;
use tokio::sync::mpsc;

fn spieler(id: u16, team: &str, szene: u32) -> Spieler {
    Spieler {
        id: PlayerId(id),
        team: Team::new(team),
        szene: SceneId(szene),
        position: Position::new(id as f32, 0.0, 0.0),
    }
}

fn server() -> (tempfile::TempDir, VoiceServer) {
    let verzeichnis = tempfile::tempdir().expect("Temp-Verzeichnis");
    let server = VoiceServer::neu(verzeichnis.path().join("voice.json"));
    (verzeichnis, server)
}

fn empfange(rx: &mut mpsc::Receiver<Arc<Vec<u8>>>) -> ClientVoicePaket {
    let bytes = rx.try_recv().expect("Queue muss ein Paket enthalten");
    ClientVoicePaket::decode(&bytes).expect("Paket muss dekodierbar sein")
}

#[tokio::test]
async fn standardfall_eine_positionale_zustellung() {
    let (_verzeichnis, server) = server();
    let _rx1 = server.registriere(PlayerId(1));
    let mut rx2 = server.registriere(PlayerId(2));

    // Gleiche Szene, verschiedene Teams, kein Broadcast, keine Schalter
    let roster = vec![spieler(1, "rot", 0), spieler(2, "blau", 0)];
    let anzahl = server.verteile(PlayerId(1), &[0x42; 80], &roster);
    assert_eq!(anzahl, 1, "Genau eine Zustellung erwartet");

    let paket = empfange(&mut rx2);
    assert_eq!(paket.absender, PlayerId(1));
    assert!(paket.proximity, "Standardfall wird positional zugestellt");
    assert_eq!(paket.daten, vec![0x42; 80]);
}

#[tokio::test]
async fn team_voices_only_sperrt_fremde_teams() {
    let (_verzeichnis, server) = server();
    let _rx1 = server.registriere(PlayerId(1));
    let mut rx2 = server.registriere(PlayerId(2));

    server
        .set_team_voices_only(true)
        .expect("Schalter muss setzbar sein");

    let roster = vec![spieler(1, "rot", 0), spieler(2, "blau", 0)];
    let anzahl = server.verteile(PlayerId(1), &[1, 2, 3], &roster);

    assert_eq!(anzahl, 0, "Fremde Teams duerfen nichts empfangen");
    assert!(rx2.try_recv().is_err());
}

#[tokio::test]
async fn broadcaster_ueberwindet_team_und_szene() {
    let (_verzeichnis, server) = server();
    let _rx1 = server.registriere(PlayerId(1));
    let mut rx2 = server.registriere(PlayerId(2));

    assert!(server.broadcast_umschalten(PlayerId(1)));

    // Anderes Team und andere Szene
    let roster = vec![spieler(1, "rot", 0), spieler(2, "blau", 9)];
    let anzahl = server.verteile(PlayerId(1), &[0xEE; 12], &roster);
    assert_eq!(anzahl, 1);

    let paket = empfange(&mut rx2);
    assert!(!paket.proximity, "Broadcast wird global abgespielt");
    assert_eq!(paket.absender, PlayerId(1));
}

#[tokio::test]
async fn gemischter_roster_bekommt_beide_varianten() {
    let (_verzeichnis, server) = server();
    server
        .set_team_voices_globally(true)
        .expect("Schalter muss setzbar sein");

    let _rx1 = server.registriere(PlayerId(1));
    let mut rx2 = server.registriere(PlayerId(2));
    let mut rx3 = server.registriere(PlayerId(3));
    let mut rx4 = server.registriere(PlayerId(4));

    // 2: Fremder in derselben Szene -> positional
    // 3: Teamkollege in anderer Szene -> global
    // 4: Fremder in anderer Szene -> nichts
    let roster = vec![
        spieler(1, "rot", 0),
        spieler(2, "blau", 0),
        spieler(3, "rot", 5),
        spieler(4, "blau", 5),
    ];
    let anzahl = server.verteile(PlayerId(1), &[0x10; 24], &roster);
    assert_eq!(anzahl, 2);

    assert!(empfange(&mut rx2).proximity);
    assert!(!empfange(&mut rx3).proximity);
    assert!(rx4.try_recv().is_err(), "Fremde in anderer Szene bleiben stumm");
}

#[tokio::test]
async fn getrennter_spieler_empfaengt_nichts_mehr() {
    let (_verzeichnis, server) = server();
    let _rx1 = server.registriere(PlayerId(1));
    let mut rx2 = server.registriere(PlayerId(2));

    let roster = vec![spieler(1, "rot", 0), spieler(2, "blau", 0)];
    assert_eq!(server.verteile(PlayerId(1), &[1; 8], &roster), 1);
    assert!(rx2.try_recv().is_ok());

    server.entferne(PlayerId(2));
    assert_eq!(
        server.verteile(PlayerId(1), &[2; 8], &roster), 0,
        "Nach dem Entfernen existiert keine Queue mehr"
    );
}
