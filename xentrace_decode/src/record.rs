// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use core::fmt;
use core::mem;

use crate::XenByteReader;
use crate::XenEventId;

const U32_SIZE: usize = mem::size_of::<u32>();
const U64_SIZE: usize = mem::size_of::<u64>();
const EXTRA_WORDS: usize = 7;

/// The decoded 32-bit word that starts every trace record.
///
/// Bit layout (TRC_HD_*): `event_id` in bits 0..28, `extra_count` in bits
/// 28..31, `has_timestamp` in bit 31.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct XenRecordHeader {
    /// Event identifier (28 bits).
    pub event_id: XenEventId,

    /// Number of 32-bit payload words following the header (0..=7).
    pub extra_count: u8,

    /// true if a 64-bit cycle counter follows the header.
    pub has_timestamp: bool,
}

impl XenRecordHeader {
    /// Size of the header word on the wire.
    pub const SIZE: usize = U32_SIZE;

    const EXTRA_SHIFT: u32 = 28;
    const EXTRA_MASK: u32 = 0x7;
    const CYCLE_FLAG: u32 = 1 << 31;

    /// Decodes a header from its wire word (already in host byte order).
    pub const fn from_word(word: u32) -> Self {
        return Self {
            event_id: XenEventId(word & XenEventId::MASK),
            extra_count: ((word >> Self::EXTRA_SHIFT) & Self::EXTRA_MASK) as u8,
            has_timestamp: (word & Self::CYCLE_FLAG) != 0,
        };
    }

    /// Encodes the header into its wire word (host byte order).
    /// Bits of `event_id` and `extra_count` outside their fields are dropped.
    pub const fn to_word(self) -> u32 {
        let cycle = if self.has_timestamp {
            Self::CYCLE_FLAG
        } else {
            0
        };
        return (self.event_id.0 & XenEventId::MASK)
            | ((self.extra_count as u32 & Self::EXTRA_MASK) << Self::EXTRA_SHIFT)
            | cycle;
    }

    /// Number of bytes that follow the header word: the timestamp (if any)
    /// plus the payload words.
    pub const fn body_size(self) -> usize {
        let timestamp_size = if self.has_timestamp { U64_SIZE } else { 0 };
        return timestamp_size + self.extra_count as usize * U32_SIZE;
    }

    /// Total size of the record on the wire, header included.
    pub const fn size(self) -> usize {
        return Self::SIZE + self.body_size();
    }
}

/// One trace record: identifier, optional cycle counter and payload.
///
/// After the record has passed through the parser, `timestamp` always holds
/// a value: either the record's own cycle counter or the last one seen
/// before it on the same stream.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct XenRecord {
    id: XenEventId,
    extra_count: u8,
    has_timestamp: bool,
    timestamp: u64,
    extra: [u32; EXTRA_WORDS],
}

impl XenRecord {
    /// Maximum number of payload words (XEN_REC_XTRS).
    pub const MAX_EXTRA: usize = EXTRA_WORDS;

    /// Largest possible record size on the wire.
    pub const MAX_SIZE: usize = XenRecordHeader::SIZE + U64_SIZE + EXTRA_WORDS * U32_SIZE;

    /// Creates a record. `timestamp` of `Some` sets `has_timestamp`.
    /// At most [`Self::MAX_EXTRA`] words of `extra` are kept.
    pub fn new(id: XenEventId, timestamp: Option<u64>, extra: &[u32]) -> Self {
        let extra_count = extra.len().min(Self::MAX_EXTRA);
        let mut this = Self {
            id: XenEventId(id.0 & XenEventId::MASK),
            extra_count: extra_count as u8,
            has_timestamp: timestamp.is_some(),
            timestamp: timestamp.unwrap_or(0),
            extra: [0; EXTRA_WORDS],
        };
        this.extra[..extra_count].copy_from_slice(&extra[..extra_count]);
        return this;
    }

    /// Decodes a record from `bytes`, which must start at a record boundary.
    /// Returns `None` if `bytes` is shorter than the record it starts.
    pub fn decode(byte_reader: XenByteReader, bytes: &[u8]) -> Option<Self> {
        let header = XenRecordHeader::from_word(read_u32_at(byte_reader, bytes, 0)?);
        return Self::decode_body(header, byte_reader, &bytes[XenRecordHeader::SIZE..]);
    }

    /// Decodes the part of a record that follows an already-decoded header.
    /// Returns `None` if `body` is shorter than `header.body_size()`.
    pub fn decode_body(header: XenRecordHeader, byte_reader: XenByteReader, body: &[u8]) -> Option<Self> {
        if body.len() < header.body_size() {
            return None;
        }

        let mut this = Self {
            id: header.event_id,
            extra_count: header.extra_count,
            has_timestamp: header.has_timestamp,
            timestamp: 0,
            extra: [0; EXTRA_WORDS],
        };

        let mut pos = 0;
        if header.has_timestamp {
            this.timestamp = byte_reader.read_u64(body[..U64_SIZE].try_into().ok()?);
            pos += U64_SIZE;
        }

        for word in this.extra[..header.extra_count as usize].iter_mut() {
            *word = read_u32_at(byte_reader, body, pos)?;
            pos += U32_SIZE;
        }

        return Some(this);
    }

    /// Encodes the record into `out`, returning the number of bytes written
    /// (`self.header().size()`).
    pub fn encode(&self, byte_reader: XenByteReader, out: &mut [u8; XenRecord::MAX_SIZE]) -> usize {
        let mut pos = 0;
        out[..U32_SIZE].copy_from_slice(&byte_reader.write_u32(self.header().to_word()));
        pos += U32_SIZE;

        if self.has_timestamp {
            out[pos..pos + U64_SIZE].copy_from_slice(&byte_reader.write_u64(self.timestamp));
            pos += U64_SIZE;
        }

        for &word in self.extra() {
            out[pos..pos + U32_SIZE].copy_from_slice(&byte_reader.write_u32(word));
            pos += U32_SIZE;
        }

        return pos;
    }

    /// Returns the header this record would be written with.
    pub const fn header(&self) -> XenRecordHeader {
        return XenRecordHeader {
            event_id: self.id,
            extra_count: self.extra_count,
            has_timestamp: self.has_timestamp,
        };
    }

    /// Event identifier.
    pub const fn id(&self) -> XenEventId {
        return self.id;
    }

    /// true if the record carried its own cycle counter on the wire.
    pub const fn has_timestamp(&self) -> bool {
        return self.has_timestamp;
    }

    /// Cycle counter value. For records without their own counter this is
    /// 0 until the parser resolves it.
    pub const fn timestamp(&self) -> u64 {
        return self.timestamp;
    }

    /// Assigns a cycle counter value without changing `has_timestamp`.
    pub fn set_timestamp(&mut self, timestamp: u64) {
        self.timestamp = timestamp;
    }

    /// Number of payload words.
    pub const fn extra_count(&self) -> u8 {
        return self.extra_count;
    }

    /// Payload words (exactly `extra_count` of them).
    pub fn extra(&self) -> &[u32] {
        return &self.extra[..self.extra_count as usize];
    }

    /// First payload word, or 0 if the record has none.
    pub const fn extra0(&self) -> u32 {
        return self.extra[0];
    }
}

impl fmt::Display for XenRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} tsc={}", self.id, self.timestamp)?;
        if self.has_timestamp {
            f.write_str("*")?;
        }

        f.write_str(" [")?;
        for (i, word) in self.extra().iter().enumerate() {
            if i != 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:#010x}", word)?;
        }
        return f.write_str("]");
    }
}

fn read_u32_at(byte_reader: XenByteReader, bytes: &[u8], pos: usize) -> Option<u32> {
    let word = bytes.get(pos..pos + U32_SIZE)?;
    return Some(byte_reader.read_u32(word.try_into().ok()?));
}
