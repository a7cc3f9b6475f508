use tempfile::TempDir;

use warren_core::ActionKind;
use warren_runtime::{ReplayError, ReplaySession};

fn session_with_varied_records() -> ReplaySession {
    let mut session = ReplaySession::new(0x5EED, 1);
    session.record(0, ActionKind::Init, "player-token", Vec::new());
    session.record(10, ActionKind::Move, "player-token", br#"{"dx":0,"dy":-1}"#.to_vec());
    session.record(20, ActionKind::Talk, "x".repeat(255), vec![0xFF; 1024]);
    session.record(30, ActionKind::Wait, "", Vec::new());
    session.record(40, ActionKind::Attack, "p2", br#"{"targetId":"281474976710659"}"#.to_vec());
    session
}

#[test]
fn file_round_trip_reproduces_every_field() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("session.cdrp");

    let session = session_with_varied_records();
    session.save(&path).unwrap();

    let loaded = ReplaySession::load(&path).unwrap();
    assert_eq!(loaded, session);
}

#[test]
fn save_replaces_atomically_and_leaves_no_temp_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("session.cdrp");

    session_with_varied_records().save(&path).unwrap();
    let first = std::fs::read(&path).unwrap();

    let mut second_session = session_with_varied_records();
    second_session.record(50, ActionKind::Wait, "p2", Vec::new());
    second_session.save(&path).unwrap();

    let second = std::fs::read(&path).unwrap();
    assert_ne!(first, second);

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(leftovers, vec![std::ffi::OsString::from("session.cdrp")]);
}

#[test]
fn corrupted_magic_is_rejected_on_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("session.cdrp");
    session_with_varied_records().save(&path).unwrap();

    let mut bytes = std::fs::read(&path).unwrap();
    bytes[0..4].copy_from_slice(b"NOPE");
    std::fs::write(&path, bytes).unwrap();

    let err = ReplaySession::load(&path).unwrap_err();
    assert!(matches!(err, ReplayError::BadMagic));
}

#[test]
fn oversized_token_aborts_the_save_without_touching_the_target() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("session.cdrp");
    session_with_varied_records().save(&path).unwrap();
    let original = std::fs::read(&path).unwrap();

    let mut bad = ReplaySession::new(1, 0);
    bad.record(0, ActionKind::Talk, "t".repeat(300), Vec::new());
    assert!(matches!(
        bad.save(&path).unwrap_err(),
        ReplayError::TokenTooLong(300)
    ));

    assert_eq!(std::fs::read(&path).unwrap(), original);
}
