//! The on-disk record stored under each used position key.

use crate::codec::{self, DecodeError, Frame};
use bytes::BufMut;

// Structure & compat versions of the entry record.
const VERSION: u8 = 1;
const COMPAT: u8 = 1;

/// Flag bit: the position was filled, and can never carry data.
pub const FLAG_INVALIDATED: u32 = 1;

/// One log entry. Absence of the position key means the position is unset;
/// a present entry is terminal, either written or invalidated.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub flags: u32,
    pub data: Vec<u8>,
}

impl LogEntry {
    /// An entry holding written data.
    pub fn written(data: Vec<u8>) -> LogEntry {
        LogEntry { flags: 0, data }
    }

    /// The entry stored by fill: invalidated, with no data.
    pub fn filler() -> LogEntry {
        LogEntry {
            flags: FLAG_INVALIDATED,
            data: Vec::new(),
        }
    }

    pub fn invalidated(&self) -> bool {
        self.flags & FLAG_INVALIDATED != 0
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        codec::put_frame(out, VERSION, COMPAT, |out| {
            out.put_u32_le(self.flags);
            codec::put_bytes(out, &self.data);
        });
    }

    pub fn decode(input: &[u8]) -> Result<LogEntry, DecodeError> {
        let mut frame = Frame::open(input, COMPAT)?;
        Ok(LogEntry {
            flags: frame.get_u32()?,
            data: frame.get_bytes()?.to_vec(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_entry_states() {
        assert!(!LogEntry::written(b"x".to_vec()).invalidated());
        assert!(LogEntry::filler().invalidated());
        assert!(LogEntry::filler().data.is_empty());
    }

    #[test]
    fn test_junk_does_not_decode() {
        assert!(LogEntry::decode(b"j").is_err());
        assert!(LogEntry::decode(b"").is_err());
    }

    #[test]
    fn test_decode_tolerates_newer_fields() {
        let mut buf = Vec::new();
        LogEntry::written(b"data".to_vec()).encode(&mut buf);

        // Splice in a trailing field a future writer might add.
        let mut extended = buf.clone();
        extended.extend_from_slice(&1u32.to_le_bytes());
        let declared = u32::from_le_bytes(extended[2..6].try_into().unwrap()) + 4;
        extended[2..6].copy_from_slice(&declared.to_le_bytes());

        let entry = LogEntry::decode(&extended).unwrap();
        assert_eq!(entry, LogEntry::written(b"data".to_vec()));
    }
}
