//! Frame codec: `prefix | header | body`
//!
//! ```text
//! ┌────────────────┬──────────────────────────────────────┬──────────────┐
//! │ Prefix (i32)   │ Header (12 bytes)                    │ Body         │
//! │ len(hdr+body)  │ msg_type i32 | comm_type | reply_type│ per msg_type │
//! └────────────────┴──────────────────────────────────────┴──────────────┘
//! ```
//!
//! All fields are little-endian.

use crate::error::{FrameError, MotoError, Result};
use crate::messages::{decode_body, Body, CommType, MsgType, ReplyType, WireReader, WireWriter};
use crate::transport::Transport;

pub const PREFIX_SIZE: usize = 4;
pub const HEADER_SIZE: usize = 12;

/// Largest header+body the decoder accepts; comfortably above the biggest
/// catalogued message.
pub const MAX_FRAME_LENGTH: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prefix {
    pub length: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub msg_type: MsgType,
    pub comm_type: CommType,
    pub reply_type: ReplyType,
}

impl Header {
    pub fn new(msg_type: MsgType, comm_type: CommType, reply_type: ReplyType) -> Self {
        Self {
            msg_type,
            comm_type,
            reply_type,
        }
    }

    /// Header for a service request carrying `msg_type`.
    pub fn request(msg_type: MsgType) -> Self {
        Self::new(msg_type, CommType::ServiceRequest, ReplyType::Invalid)
    }

    /// Header for a one-way topic message carrying `msg_type`.
    pub fn topic(msg_type: MsgType) -> Self {
        Self::new(msg_type, CommType::Topic, ReplyType::Invalid)
    }

    fn encode(&self, w: &mut WireWriter) {
        w.i32(self.msg_type.code());
        w.i32(self.comm_type.code());
        w.i32(self.reply_type.code());
    }

    fn decode(r: &mut WireReader<'_>) -> std::result::Result<Self, FrameError> {
        Ok(Self {
            msg_type: MsgType::try_from(r.i32()?)?,
            comm_type: CommType::try_from(r.i32()?)?,
            reply_type: ReplyType::try_from(r.i32()?)?,
        })
    }
}

/// A decoded `(prefix, header, body)` triplet
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub prefix: Prefix,
    pub header: Header,
    pub body: Body,
}

/// Serialises header and body and prepends the length prefix.
pub fn encode(header: &Header, body: &Body) -> Vec<u8> {
    let mut payload = WireWriter::with_capacity(HEADER_SIZE + 64);
    header.encode(&mut payload);
    body.encode(&mut payload);

    let mut frame = WireWriter::with_capacity(PREFIX_SIZE + payload.len());
    frame.i32(payload.len() as i32);
    let mut bytes = frame.into_inner();
    bytes.extend_from_slice(&payload.into_inner());
    bytes
}

fn parse_prefix(raw: [u8; PREFIX_SIZE]) -> std::result::Result<usize, FrameError> {
    let length = i32::from_le_bytes(raw);
    usize::try_from(length)
        .ok()
        .filter(|&len| (HEADER_SIZE..=MAX_FRAME_LENGTH).contains(&len))
        .ok_or(FrameError::InvalidPrefix(length))
}

/// Splits a `header | body` region and decodes the body variant.
fn decode_payload(length: usize, payload: &[u8]) -> std::result::Result<Frame, FrameError> {
    let (header_bytes, body_bytes) = payload.split_at(HEADER_SIZE);
    let header = Header::decode(&mut WireReader::new(header_bytes))?;
    let body = decode_body(header.msg_type, body_bytes)?;
    Ok(Frame {
        prefix: Prefix {
            length: length as i32,
        },
        header,
        body,
    })
}

/// Decodes exactly one frame from a complete buffer.
pub fn decode_bytes(bytes: &[u8]) -> std::result::Result<Frame, FrameError> {
    let raw = bytes.get(..PREFIX_SIZE).ok_or(FrameError::Truncated {
        needed: PREFIX_SIZE,
        available: bytes.len(),
    })?;
    let length = parse_prefix([raw[0], raw[1], raw[2], raw[3]])?;
    let payload = &bytes[PREFIX_SIZE..];
    if payload.len() != length {
        return Err(FrameError::Truncated {
            needed: PREFIX_SIZE + length,
            available: bytes.len(),
        });
    }
    decode_payload(length, payload)
}

/// Reads one frame off a byte stream, reassembling partial reads.
pub fn read_frame<T: Transport + ?Sized>(transport: &mut T) -> Result<Frame> {
    let mut raw = [0u8; PREFIX_SIZE];
    transport.recv_exact(&mut raw)?;
    let length = parse_prefix(raw)?;

    let mut payload = vec![0u8; length];
    transport.recv_exact(&mut payload)?;
    decode_payload(length, &payload).map_err(MotoError::from)
}
