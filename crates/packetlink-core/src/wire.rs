//! Packetlink wire format — the on-wire encoding of one packet.
//!
//! These definitions ARE the protocol. Every field, every size, every
//! reserved bit is part of the wire format; changing anything here breaks
//! link compatibility with every deployed node.
//!
//! A frame looks like this:
//!
//! ```text
//! offset  size  field
//! 0       1     version      (PROTOCOL_VERSION)
//! 1       1     flags        (FLAG_* bitmask)
//! 2       2     packet id    (u16, little-endian, never zero on the wire)
//! 4       1+n   source       (u8 length + UTF-8 bytes)
//! ..      1+m   destination  (u8 length + UTF-8 bytes)
//! ..      1+k   payload      (u8 length + raw bytes)
//! last    1     checksum     (XOR of every preceding byte)
//! ```
//!
//! The fixed prefix is #[repr(C, packed)] with zerocopy derives for a
//! deterministic layout. The variable sections are written with BufMut.
//! There is no unsafe code in this module.

use bytes::{BufMut, Bytes, BytesMut};
use static_assertions::assert_eq_size;
use zerocopy::byteorder::{LittleEndian, U16};
use zerocopy::{AsBytes, FromBytes, FromZeroes};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Current wire format version. A receiver seeing an unknown version
/// drops the frame without delivering it.
pub const PROTOCOL_VERSION: u8 = 0x01;

/// Sender wants this frame acknowledged. The receiver replies with an
/// empty FLAG_IS_ACK frame echoing the packet id.
pub const FLAG_ACK_REQUIRED: u8 = 0x01;

/// This frame IS an acknowledgement. Empty payload; the packet id names
/// the frame being acknowledged. Never delivered to the receive handler.
pub const FLAG_IS_ACK: u8 = 0x02;

/// Destination may be empty; every node on the link delivers the frame.
pub const FLAG_BROADCAST: u8 = 0x04;

/// All bits with assigned meaning. The rest are reserved and must be
/// zero on encode.
pub const FLAG_MASK: u8 = FLAG_ACK_REQUIRED | FLAG_IS_ACK | FLAG_BROADCAST;

/// Hard payload cap — the payload length field is one byte.
/// The configured link MTU further restricts this at send time.
pub const MAX_PAYLOAD: usize = 255;

/// Hard address cap — address length fields are one byte.
pub const MAX_ADDR: usize = 255;

/// Smallest possible frame: header + three zero length bytes + checksum.
const MIN_FRAME: usize = FRAME_HEADER_LEN + 3 + 1;

/// Size of the fixed frame prefix.
pub const FRAME_HEADER_LEN: usize = 4;

// ── Frame header ──────────────────────────────────────────────────────────────

/// Fixed 4-byte prefix of every frame.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct FrameHeader {
    /// Wire format version. Currently 0x01.
    pub version: u8,

    /// FLAG_* bitmask. Reserved bits must be zero.
    pub flags: u8,

    /// Packet id. Assigned by the sender, echoed by acknowledgements.
    /// Zero is reserved and never transmitted.
    pub packet_id: U16<LittleEndian>,
}

// Compile-time size guard. If this fails, the wire format has silently changed.
assert_eq_size!(FrameHeader, [u8; 4]);

// ── Decoded frame ─────────────────────────────────────────────────────────────

/// A fully decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub packet_id: u16,
    pub flags: u8,
    pub source: String,
    pub destination: String,
    pub payload: Bytes,
}

impl Frame {
    pub fn is_ack(&self) -> bool {
        self.flags & FLAG_IS_ACK != 0
    }

    pub fn wants_ack(&self) -> bool {
        self.flags & FLAG_ACK_REQUIRED != 0
    }

    pub fn is_broadcast(&self) -> bool {
        self.flags & FLAG_BROADCAST != 0
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors that can arise when encoding or decoding wire-format data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("frame truncated or length fields inconsistent")]
    Truncated,

    #[error("unknown wire version: 0x{0:02x}")]
    UnknownVersion(u8),

    #[error("frame checksum mismatch")]
    ChecksumMismatch,

    #[error("payload length {0} exceeds maximum {MAX_PAYLOAD}")]
    PayloadTooLarge(usize),

    #[error("address length {0} exceeds maximum {MAX_ADDR}")]
    AddressTooLong(usize),

    #[error("empty destination on a non-broadcast frame")]
    EmptyDestination,

    #[error("reserved flag bits are non-zero: 0x{0:02x}")]
    ReservedFlagsSet(u8),
}

// ── Checksum ──────────────────────────────────────────────────────────────────

/// XOR fold over a byte slice. The trailing checksum byte of a frame is
/// the fold of everything before it.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc ^ b)
}

// ── Encode / decode ───────────────────────────────────────────────────────────

/// Encode one frame. Pure; does not touch the medium.
pub fn encode_frame(
    packet_id: u16,
    source: &str,
    destination: &str,
    payload: &[u8],
    flags: u8,
) -> Result<Bytes, WireError> {
    if flags & !FLAG_MASK != 0 {
        return Err(WireError::ReservedFlagsSet(flags & !FLAG_MASK));
    }
    if payload.len() > MAX_PAYLOAD {
        return Err(WireError::PayloadTooLarge(payload.len()));
    }
    if source.len() > MAX_ADDR {
        return Err(WireError::AddressTooLong(source.len()));
    }
    if destination.len() > MAX_ADDR {
        return Err(WireError::AddressTooLong(destination.len()));
    }
    if destination.is_empty() && flags & FLAG_BROADCAST == 0 {
        return Err(WireError::EmptyDestination);
    }

    let header = FrameHeader {
        version: PROTOCOL_VERSION,
        flags,
        packet_id: U16::new(packet_id),
    };

    let total = FRAME_HEADER_LEN
        + 1 + source.len()
        + 1 + destination.len()
        + 1 + payload.len()
        + 1;
    let mut buf = BytesMut::with_capacity(total);
    buf.put_slice(header.as_bytes());
    buf.put_u8(source.len() as u8);
    buf.put_slice(source.as_bytes());
    buf.put_u8(destination.len() as u8);
    buf.put_slice(destination.as_bytes());
    buf.put_u8(payload.len() as u8);
    buf.put_slice(payload);
    buf.put_u8(checksum(&buf));
    Ok(buf.freeze())
}

/// Decode one frame. Checksum verification happens before any field is
/// parsed; a corrupt frame never yields partial data.
pub fn decode_frame(bytes: &[u8]) -> Result<Frame, WireError> {
    if bytes.len() < MIN_FRAME {
        return Err(WireError::Truncated);
    }

    let (body, trailer) = bytes.split_at(bytes.len() - 1);
    if checksum(body) != trailer[0] {
        return Err(WireError::ChecksumMismatch);
    }

    let header = FrameHeader::read_from_prefix(body).ok_or(WireError::Truncated)?;
    if header.version != PROTOCOL_VERSION {
        return Err(WireError::UnknownVersion(header.version));
    }

    let mut offset = FRAME_HEADER_LEN;
    let source = read_string(body, &mut offset)?;
    let destination = read_string(body, &mut offset)?;
    let payload = read_bytes(body, &mut offset)?;
    if offset != body.len() {
        return Err(WireError::Truncated);
    }

    let flags = header.flags;
    if destination.is_empty() && flags & FLAG_BROADCAST == 0 {
        return Err(WireError::EmptyDestination);
    }

    // Copy the packed field to a local before use.
    let packet_id = { header.packet_id }.get();

    Ok(Frame {
        packet_id,
        flags,
        source,
        destination,
        payload: Bytes::copy_from_slice(payload),
    })
}

/// Read one length-prefixed UTF-8 string. Malformed UTF-8 in an address
/// is replaced, not rejected — an unreadable address simply never
/// matches a local id.
fn read_string(buf: &[u8], offset: &mut usize) -> Result<String, WireError> {
    let raw = read_bytes(buf, offset)?;
    Ok(String::from_utf8_lossy(raw).into_owned())
}

/// Read one length-prefixed byte section.
fn read_bytes<'a>(buf: &'a [u8], offset: &mut usize) -> Result<&'a [u8], WireError> {
    let len = *buf.get(*offset).ok_or(WireError::Truncated)? as usize;
    let start = *offset + 1;
    let end = start + len;
    if end > buf.len() {
        return Err(WireError::Truncated);
    }
    *offset = end;
    Ok(&buf[start..end])
}

// ── Tests ─────────────────────────────────────────────────────────────────────
