//! Binary replay session codec.
//!
//! Little-endian, magic `"CDRP"`, version 1. Fixed header
//! `{magic[4], version u32, seed i64, timestamp i64, level_id i32,
//! action_count i32}` followed by one record per action:
//! `{tick i32, action_type u8, token_len u8, payload_len u16}` + raw token
//! bytes + raw payload bytes.
//!
//! Oversized tokens/payloads are hard write-time errors detected before any
//! byte is written, so a failed save never leaves a half-written session
//! where a complete one was expected. Reads reject bad magic, unsupported
//! versions, and truncated streams with typed errors.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use warren_core::ActionKind;

pub const REPLAY_MAGIC: [u8; 4] = *b"CDRP";
pub const REPLAY_VERSION: u32 = 1;
pub const MAX_TOKEN_LEN: usize = u8::MAX as usize;
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("bad replay magic")]
    BadMagic,

    #[error("unsupported replay version {0}")]
    UnsupportedVersion(u32),

    #[error("token length {0} exceeds {MAX_TOKEN_LEN} bytes")]
    TokenTooLong(usize),

    #[error("payload length {0} exceeds {MAX_PAYLOAD_LEN} bytes")]
    PayloadTooLarge(usize),

    #[error("token is not valid UTF-8")]
    InvalidToken,

    #[error("truncated replay stream")]
    Truncated,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One recorded command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplayAction {
    pub tick: i32,
    pub action: ActionKind,
    pub token: String,
    pub payload: Vec<u8>,
}

/// An ordered command log plus the seed that generated the world.
///
/// Replaying the same seed and the same action sequence reproduces the same
/// world evolution; simulation logic never reads the wall clock or unseeded
/// randomness, which is what makes this file format sufficient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplaySession {
    pub seed: i64,
    pub timestamp: i64,
    pub level_id: i32,
    pub actions: Vec<ReplayAction>,
}

impl ReplaySession {
    pub fn new(seed: i64, level_id: i32) -> Self {
        Self {
            seed,
            timestamp: chrono::Utc::now().timestamp(),
            level_id,
            actions: Vec::new(),
        }
    }

    pub fn record(
        &mut self,
        tick: i32,
        action: ActionKind,
        token: impl Into<String>,
        payload: Vec<u8>,
    ) {
        self.actions.push(ReplayAction {
            tick,
            action,
            token: token.into(),
            payload,
        });
    }

    /// Serializes the session. All records are validated before the first
    /// byte goes out.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), ReplayError> {
        for action in &self.actions {
            if action.token.len() > MAX_TOKEN_LEN {
                return Err(ReplayError::TokenTooLong(action.token.len()));
            }
            if action.payload.len() > MAX_PAYLOAD_LEN {
                return Err(ReplayError::PayloadTooLarge(action.payload.len()));
            }
        }

        writer.write_all(&REPLAY_MAGIC)?;
        writer.write_all(&REPLAY_VERSION.to_le_bytes())?;
        writer.write_all(&self.seed.to_le_bytes())?;
        writer.write_all(&self.timestamp.to_le_bytes())?;
        writer.write_all(&self.level_id.to_le_bytes())?;
        writer.write_all(&(self.actions.len() as i32).to_le_bytes())?;

        for action in &self.actions {
            writer.write_all(&action.tick.to_le_bytes())?;
            writer.write_all(&[action.action.wire_code()])?;
            writer.write_all(&[action.token.len() as u8])?;
            writer.write_all(&(action.payload.len() as u16).to_le_bytes())?;
            writer.write_all(action.token.as_bytes())?;
            writer.write_all(&action.payload)?;
        }
        Ok(())
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, ReplayError> {
        let mut magic = [0u8; 4];
        read_exact(reader, &mut magic)?;
        if magic != REPLAY_MAGIC {
            return Err(ReplayError::BadMagic);
        }

        let version = u32::from_le_bytes(read_array(reader)?);
        if version != REPLAY_VERSION {
            return Err(ReplayError::UnsupportedVersion(version));
        }

        let seed = i64::from_le_bytes(read_array(reader)?);
        let timestamp = i64::from_le_bytes(read_array(reader)?);
        let level_id = i32::from_le_bytes(read_array(reader)?);
        let action_count = i32::from_le_bytes(read_array(reader)?);

        let mut actions = Vec::with_capacity(action_count.max(0) as usize);
        for _ in 0..action_count.max(0) {
            let tick = i32::from_le_bytes(read_array(reader)?);
            let action = ActionKind::from_wire_code(u8::from_le_bytes(read_array(reader)?));
            let token_len = u8::from_le_bytes(read_array(reader)?) as usize;
            let payload_len = u16::from_le_bytes(read_array(reader)?) as usize;

            let mut token = vec![0u8; token_len];
            read_exact(reader, &mut token)?;
            let token = String::from_utf8(token).map_err(|_| ReplayError::InvalidToken)?;

            let mut payload = vec![0u8; payload_len];
            read_exact(reader, &mut payload)?;

            actions.push(ReplayAction {
                tick,
                action,
                token,
                payload,
            });
        }

        Ok(Self {
            seed,
            timestamp,
            level_id,
            actions,
        })
    }

    /// Writes the session to disk via a temporary sibling file and an
    /// atomic rename, so a failed save never clobbers an existing replay.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ReplayError> {
        let path = path.as_ref();
        let tmp_path = path.with_extension("cdrp.tmp");

        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        match self.write_to(&mut writer) {
            Ok(()) => {}
            Err(err) => {
                drop(writer);
                let _ = std::fs::remove_file(&tmp_path);
                return Err(err);
            }
        }
        writer.flush()?;
        writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), ReplayError> {
    reader.read_exact(buf).map_err(|err| {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            ReplayError::Truncated
        } else {
            ReplayError::Io(err)
        }
    })
}

fn read_array<R: Read, const N: usize>(reader: &mut R) -> Result<[u8; N], ReplayError> {
    let mut buf = [0u8; N];
    read_exact(reader, &mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_session() -> ReplaySession {
        let mut session = ReplaySession::new(-42, 3);
        session.record(0, ActionKind::Init, "tok-a", Vec::new());
        session.record(10, ActionKind::Move, "tok-a", br#"{"dx":1,"dy":0}"#.to_vec());
        session.record(
            20,
            ActionKind::Attack,
            "another-token",
            br#"{"targetId":"7"}"#.to_vec(),
        );
        session.record(30, ActionKind::Wait, "", Vec::new());
        session
    }

    #[test]
    fn round_trips_every_field() {
        let session = sample_session();
        let mut buf = Vec::new();
        session.write_to(&mut buf).unwrap();

        let back = ReplaySession::read_from(&mut buf.as_slice()).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let session = sample_session();
        let mut buf = Vec::new();
        session.write_to(&mut buf).unwrap();
        buf[0] = b'X';

        let err = ReplaySession::read_from(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(err, ReplayError::BadMagic));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let session = sample_session();
        let mut buf = Vec::new();
        session.write_to(&mut buf).unwrap();
        buf[4..8].copy_from_slice(&99u32.to_le_bytes());

        let err = ReplaySession::read_from(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(err, ReplayError::UnsupportedVersion(99)));
    }

    #[test]
    fn truncated_streams_are_rejected() {
        let session = sample_session();
        let mut buf = Vec::new();
        session.write_to(&mut buf).unwrap();
        buf.truncate(buf.len() - 5);

        let err = ReplaySession::read_from(&mut buf.as_slice()).unwrap_err();
        assert!(matches!(err, ReplayError::Truncated));
    }

    #[test]
    fn oversized_records_fail_before_writing_anything() {
        let mut session = ReplaySession::new(1, 0);
        session.record(0, ActionKind::Talk, "t".repeat(300), Vec::new());

        let mut buf = Vec::new();
        let err = session.write_to(&mut buf).unwrap_err();
        assert!(matches!(err, ReplayError::TokenTooLong(300)));
        assert!(buf.is_empty());

        let mut session = ReplaySession::new(1, 0);
        session.record(0, ActionKind::Talk, "ok", vec![0u8; 70_000]);
        let mut buf = Vec::new();
        let err = session.write_to(&mut buf).unwrap_err();
        assert!(matches!(err, ReplayError::PayloadTooLarge(70_000)));
        assert!(buf.is_empty());
    }

    #[test]
    fn header_layout_matches_the_contract() {
        let session = ReplaySession {
            seed: 0x0102030405060708,
            timestamp: 0,
            level_id: 2,
            actions: Vec::new(),
        };
        let mut buf = Vec::new();
        session.write_to(&mut buf).unwrap();

        assert_eq!(&buf[0..4], b"CDRP");
        assert_eq!(u32::from_le_bytes(buf[4..8].try_into().unwrap()), 1);
        assert_eq!(
            i64::from_le_bytes(buf[8..16].try_into().unwrap()),
            0x0102030405060708
        );
        assert_eq!(i32::from_le_bytes(buf[24..28].try_into().unwrap()), 2);
        assert_eq!(i32::from_le_bytes(buf[28..32].try_into().unwrap()), 0);
        assert_eq!(buf.len(), 32);
    }
}
