// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Checksummed CBOR packet framing for recorded feeds.
//!
//! Packet layout:
//!
//! ``MAGIC(4) || VERSION(2) || FLAGS(2) || LENGTH(4) || PAYLOAD || CHECKSUM(32)``
//!
//! * integers are big-endian
//! * PAYLOAD is the CBOR encoding of one [`FeedEvent`]
//! * CHECKSUM = blake3-256 over HEADER (first 12 bytes) || PAYLOAD
//!
//! A feed log is a plain concatenation of packets.

use blake3::Hasher;
use thiserror::Error;

use crate::event::FeedEvent;

/// Packet magic, "RPL1".
pub const MAGIC: [u8; 4] = *b"RPL1";
/// Packet format version.
pub const VERSION: u16 = 0x0001;
/// Reserved flags (zero for v1).
pub const FLAGS: u16 = 0x0000;
/// Header length in bytes.
pub const HEADER_LEN: usize = 12;
/// Checksum length in bytes.
pub const CHECKSUM_LEN: usize = 32;
/// Largest accepted payload.
pub const MAX_PAYLOAD: usize = 8 * 1024 * 1024;

/// Errors produced while framing or unframing packets.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    /// Fewer bytes than the packet declares.
    #[error("incomplete packet: need {needed} bytes, have {available}")]
    Incomplete {
        /// Bytes required to finish the packet.
        needed: usize,
        /// Bytes available.
        available: usize,
    },
    /// The packet does not start with [`MAGIC`].
    #[error("bad magic: {0:02x?}")]
    BadMagic([u8; 4]),
    /// Unknown packet version.
    #[error("unsupported version {0}")]
    UnsupportedVersion(u16),
    /// Declared or actual payload exceeds [`MAX_PAYLOAD`].
    #[error("payload too large: {0} bytes")]
    PayloadTooLarge(usize),
    /// Checksum does not cover header and payload.
    #[error("checksum mismatch")]
    ChecksumMismatch,
    /// CBOR encoding failed.
    #[error("cbor encode: {0}")]
    Encode(String),
    /// CBOR decoding failed.
    #[error("cbor decode: {0}")]
    Decode(String),
}

fn checksum(header: &[u8], payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut hasher = Hasher::new();
    hasher.update(header);
    hasher.update(payload);
    *hasher.finalize().as_bytes()
}

/// Encodes one event as a full packet.
pub fn encode_event(event: &FeedEvent) -> Result<Vec<u8>, WireError> {
    let mut payload = Vec::new();
    ciborium::ser::into_writer(event, &mut payload)
        .map_err(|err| WireError::Encode(err.to_string()))?;
    if payload.len() > MAX_PAYLOAD {
        return Err(WireError::PayloadTooLarge(payload.len()));
    }
    let len = u32::try_from(payload.len()).map_err(|_| WireError::PayloadTooLarge(payload.len()))?;

    let mut header = [0u8; HEADER_LEN];
    header[0..4].copy_from_slice(&MAGIC);
    header[4..6].copy_from_slice(&VERSION.to_be_bytes());
    header[6..8].copy_from_slice(&FLAGS.to_be_bytes());
    header[8..12].copy_from_slice(&len.to_be_bytes());
    let sum = checksum(&header, &payload);

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len() + CHECKSUM_LEN);
    out.extend_from_slice(&header);
    out.extend_from_slice(&payload);
    out.extend_from_slice(&sum);
    Ok(out)
}

/// Decodes the packet at the start of `bytes`.
///
/// Returns the event and the number of bytes consumed.
pub fn decode_event(bytes: &[u8]) -> Result<(FeedEvent, usize), WireError> {
    if bytes.len() < HEADER_LEN {
        return Err(WireError::Incomplete {
            needed: HEADER_LEN,
            available: bytes.len(),
        });
    }
    let magic = [bytes[0], bytes[1], bytes[2], bytes[3]];
    if magic != MAGIC {
        return Err(WireError::BadMagic(magic));
    }
    let version = u16::from_be_bytes([bytes[4], bytes[5]]);
    if version != VERSION {
        return Err(WireError::UnsupportedVersion(version));
    }
    let len = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
    if len > MAX_PAYLOAD {
        return Err(WireError::PayloadTooLarge(len));
    }
    let total = HEADER_LEN + len + CHECKSUM_LEN;
    if bytes.len() < total {
        return Err(WireError::Incomplete {
            needed: total,
            available: bytes.len(),
        });
    }

    let header = &bytes[..HEADER_LEN];
    let payload = &bytes[HEADER_LEN..HEADER_LEN + len];
    if checksum(header, payload)[..] != bytes[HEADER_LEN + len..total] {
        return Err(WireError::ChecksumMismatch);
    }

    let event: FeedEvent =
        ciborium::de::from_reader(payload).map_err(|err| WireError::Decode(err.to_string()))?;
    Ok((event, total))
}

/// Encodes a sequence of events as a feed log.
pub fn encode_all<'a, I>(events: I) -> Result<Vec<u8>, WireError>
where
    I: IntoIterator<Item = &'a FeedEvent>,
{
    let mut out = Vec::new();
    for event in events {
        out.extend_from_slice(&encode_event(event)?);
    }
    Ok(out)
}

/// Decodes a whole feed log. Trailing partial packets are an error.
pub fn decode_all(mut bytes: &[u8]) -> Result<Vec<FeedEvent>, WireError> {
    let mut events = Vec::new();
    while !bytes.is_empty() {
        let (event, used) = decode_event(bytes)?;
        events.push(event);
        bytes = &bytes[used..];
    }
    Ok(events)
}
