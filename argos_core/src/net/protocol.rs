//! ARGOS event wire protocol
//!
//! Address-plus-arguments messages over UDP, one message per datagram.
//!
//! Packet structure (integers little-endian unless noted):
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │ Magic (4 bytes): 0x41524753 ("ARGS")             │
//! ├──────────────────────────────────────────────────┤
//! │ Version (1 byte): 0x01                           │
//! ├──────────────────────────────────────────────────┤
//! │ Address Length (2 bytes)                         │
//! ├──────────────────────────────────────────────────┤
//! │ Address (variable, UTF-8), e.g. "personEntered"  │
//! ├──────────────────────────────────────────────────┤
//! │ Argument Count (2 bytes)                         │
//! ├──────────────────────────────────────────────────┤
//! │ Arguments (variable), each:                      │
//! │   Tag (1 byte): 0x01=i32, 0x02=f32, 0x03=string  │
//! │   Value: 4 bytes, or 2-byte length + UTF-8       │
//! └──────────────────────────────────────────────────┘
//! ```

use crate::error::{ArgosError, ArgosResult};

const MAGIC: u32 = 0x41524753; // "ARGS" in ASCII
const VERSION: u8 = 0x01;

const TAG_INT: u8 = 0x01;
const TAG_FLOAT: u8 = 0x02;
const TAG_STR: u8 = 0x03;

/// One typed message argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Int(i32),
    Float(f32),
    Str(String),
}

impl Arg {
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Arg::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Arg::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Arg::Str(v) => Some(v),
            _ => None,
        }
    }
}

/// An event-stream message: an address naming the event plus its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct EventMessage {
    pub address: String,
    pub args: Vec<Arg>,
}

impl EventMessage {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            args: Vec::new(),
        }
    }

    pub fn push_int(&mut self, v: i32) -> &mut Self {
        self.args.push(Arg::Int(v));
        self
    }

    pub fn push_float(&mut self, v: f32) -> &mut Self {
        self.args.push(Arg::Float(v));
        self
    }

    pub fn push_str(&mut self, v: impl Into<String>) -> &mut Self {
        self.args.push(Arg::Str(v.into()));
        self
    }

    /// Encode into `buf`, replacing its contents. Returns the encoded size.
    pub fn encode(&self, buf: &mut Vec<u8>) -> usize {
        buf.clear();
        buf.extend_from_slice(&MAGIC.to_le_bytes());
        buf.push(VERSION);
        buf.extend_from_slice(&(self.address.len() as u16).to_le_bytes());
        buf.extend_from_slice(self.address.as_bytes());
        buf.extend_from_slice(&(self.args.len() as u16).to_le_bytes());
        for arg in &self.args {
            match arg {
                Arg::Int(v) => {
                    buf.push(TAG_INT);
                    buf.extend_from_slice(&v.to_le_bytes());
                }
                Arg::Float(v) => {
                    buf.push(TAG_FLOAT);
                    buf.extend_from_slice(&v.to_le_bytes());
                }
                Arg::Str(v) => {
                    buf.push(TAG_STR);
                    buf.extend_from_slice(&(v.len() as u16).to_le_bytes());
                    buf.extend_from_slice(v.as_bytes());
                }
            }
        }
        buf.len()
    }

    /// Decode a complete datagram. Every length is bounds-checked; a short
    /// or corrupt buffer never panics.
    pub fn decode(buf: &[u8]) -> ArgosResult<Self> {
        let mut cursor = Cursor::new(buf);

        let magic = u32::from_le_bytes(cursor.take4()?);
        if magic != MAGIC {
            return Err(ArgosError::parse(format!("bad magic {magic:#010x}")));
        }
        let version = cursor.take1()?;
        if version != VERSION {
            return Err(ArgosError::parse(format!("unsupported version {version}")));
        }

        let addr_len = u16::from_le_bytes(cursor.take2()?) as usize;
        let address = cursor.take_str(addr_len)?;

        let arg_count = u16::from_le_bytes(cursor.take2()?) as usize;
        let mut args = Vec::with_capacity(arg_count.min(256));
        for _ in 0..arg_count {
            let arg = match cursor.take1()? {
                TAG_INT => Arg::Int(i32::from_le_bytes(cursor.take4()?)),
                TAG_FLOAT => Arg::Float(f32::from_le_bytes(cursor.take4()?)),
                TAG_STR => {
                    let len = u16::from_le_bytes(cursor.take2()?) as usize;
                    Arg::Str(cursor.take_str(len)?)
                }
                tag => return Err(ArgosError::parse(format!("unknown argument tag {tag:#04x}"))),
            };
            args.push(arg);
        }

        Ok(EventMessage { address, args })
    }
}

/// Bounds-checked reader over a received datagram.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> ArgosResult<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&e| e <= self.buf.len());
        match end {
            Some(end) => {
                let slice = &self.buf[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(ArgosError::parse(format!(
                "truncated message: need {n} bytes at offset {}, have {}",
                self.pos,
                self.buf.len()
            ))),
        }
    }

    fn take1(&mut self) -> ArgosResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn take2(&mut self) -> ArgosResult<[u8; 2]> {
        let s = self.take(2)?;
        Ok([s[0], s[1]])
    }

    fn take4(&mut self) -> ArgosResult<[u8; 4]> {
        let s = self.take(4)?;
        Ok([s[0], s[1], s[2], s[3]])
    }

    fn take_str(&mut self, len: usize) -> ArgosResult<String> {
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| ArgosError::parse(format!("invalid UTF-8 in message: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let mut msg = EventMessage::new("personUpdated");
        msg.push_int(3).push_float(0.5).push_str("centroid");

        let mut buf = Vec::new();
        msg.encode(&mut buf);
        let decoded = EventMessage::decode(&buf).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_empty_args() {
        let msg = EventMessage::new("ping");
        let mut buf = Vec::new();
        msg.encode(&mut buf);
        let decoded = EventMessage::decode(&buf).unwrap();
        assert_eq!(decoded.address, "ping");
        assert!(decoded.args.is_empty());
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut buf = Vec::new();
        EventMessage::new("x").encode(&mut buf);
        buf[0] ^= 0xff;
        assert!(matches!(EventMessage::decode(&buf), Err(ArgosError::Parse(_))));
    }

    #[test]
    fn test_truncation_never_panics() {
        let mut msg = EventMessage::new("personUpdated");
        msg.push_int(1).push_str("a longer string argument");
        let mut buf = Vec::new();
        msg.encode(&mut buf);
        for len in 0..buf.len() {
            assert!(
                EventMessage::decode(&buf[..len]).is_err(),
                "prefix of {len} bytes decoded"
            );
        }
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let mut buf = Vec::new();
        let mut msg = EventMessage::new("x");
        msg.push_int(0);
        msg.encode(&mut buf);
        // Corrupt the argument tag.
        let tag_offset = buf.len() - 5;
        buf[tag_offset] = 0x7f;
        assert!(matches!(EventMessage::decode(&buf), Err(ArgosError::Parse(_))));
    }
}
