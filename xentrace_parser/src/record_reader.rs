// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use core::fmt;

use std::io;

use xentrace_decode::*;

/// Why the parser stopped reading records.
///
/// [`crate::XenTraceParser::execute`] returns the same thing (the number of
/// events collected) whatever the reason; this is diagnostic only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum XenTraceStopReason {
    /// The input ended exactly at a record boundary.
    EndOfStream,

    /// The input ended in the middle of the record starting at `offset`.
    /// The partial record was discarded.
    Truncated {
        /// File offset of the first byte of the discarded record.
        offset: u64,
    },

    /// Reading the record starting at `offset` failed with an I/O error.
    /// The partial record was discarded.
    ReadFailed {
        /// File offset of the first byte of the discarded record.
        offset: u64,

        /// Kind of the I/O error.
        kind: io::ErrorKind,
    },

    /// Growing the event list or the per-CPU domain table failed, so the
    /// remaining records were not read.
    OutOfMemory,
}

impl fmt::Display for XenTraceStopReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            XenTraceStopReason::EndOfStream => f.pad("EndOfStream"),
            XenTraceStopReason::Truncated { offset } => {
                write!(f, "Truncated at {}", offset)
            }
            XenTraceStopReason::ReadFailed { offset, kind } => {
                write!(f, "ReadFailed ({}) at {}", kind, offset)
            }
            XenTraceStopReason::OutOfMemory => f.pad("OutOfMemory"),
        }
    }
}

/// Frames and decodes records from a byte stream, one at a time.
#[derive(Debug)]
pub(crate) struct RecordReader<R> {
    inner: R,
    byte_reader: XenByteReader,
    pos: u64,
    stop_reason: Option<XenTraceStopReason>,
}

impl<R: io::Read> RecordReader<R> {
    pub fn new(inner: R, byte_reader: XenByteReader) -> Self {
        return Self {
            inner,
            byte_reader,
            pos: 0,
            stop_reason: None,
        };
    }

    /// Offset of the next record.
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// `None` while records are still available.
    pub fn stop_reason(&self) -> Option<XenTraceStopReason> {
        self.stop_reason
    }

    /// Reads the next record. Returns `None` at end of stream and on any
    /// short or failed read; once `None` has been returned, it is returned
    /// forever.
    pub fn read_next_record(&mut self) -> Option<XenRecord> {
        if self.stop_reason.is_some() {
            return None;
        }

        let record_pos = self.pos;

        let mut header_bytes = [0u8; XenRecordHeader::SIZE];
        match self.fill(&mut header_bytes) {
            Ok(0) => return self.stop(XenTraceStopReason::EndOfStream),
            Ok(XenRecordHeader::SIZE) => (),
            Ok(_) => return self.stop(XenTraceStopReason::Truncated { offset: record_pos }),
            Err(e) => return self.stop_on_error(record_pos, e),
        }

        let header = XenRecordHeader::from_word(self.byte_reader.read_u32(header_bytes));

        let mut body_bytes = [0u8; XenRecord::MAX_SIZE - XenRecordHeader::SIZE];
        let body = &mut body_bytes[..header.body_size()];
        match self.fill(body) {
            Ok(n) if n == body.len() => (),
            Ok(_) => return self.stop(XenTraceStopReason::Truncated { offset: record_pos }),
            Err(e) => return self.stop_on_error(record_pos, e),
        }

        let record = XenRecord::decode_body(header, self.byte_reader, body);
        debug_assert!(record.is_some()); // body is exactly body_size() bytes.
        return record;
    }

    fn stop(&mut self, reason: XenTraceStopReason) -> Option<XenRecord> {
        if let XenTraceStopReason::Truncated { offset } = reason {
            log::debug!(
                "discarding truncated record at offset {} ({} trailing bytes)",
                offset,
                self.pos - offset
            );
        }

        self.stop_reason = Some(reason);
        return None;
    }

    fn stop_on_error(&mut self, offset: u64, e: io::Error) -> Option<XenRecord> {
        log::debug!("read error at offset {}: {}", offset, e);
        return self.stop(XenTraceStopReason::ReadFailed {
            offset,
            kind: e.kind(),
        });
    }

    /// Like `read_exact`, but reports how many bytes were read before end of
    /// stream instead of failing.
    fn fill(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => (),
                Err(e) => return Err(e),
            }
        }

        self.pos += filled as u64;
        return Ok(filled);
    }
}
