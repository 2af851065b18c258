// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use std::io;
use std::path;
use std::slice;

use xentrace_decode::*;

use crate::event_store::EventStore;
use crate::input_file::InputFile;
use crate::record_reader::RecordReader;
use crate::state_tracker::StateTracker;
use crate::state_tracker::Tracked;
use crate::XenTraceError;
use crate::XenTraceStopReason;

/// Reads a XenTrace binary file into memory, attributing each record to the
/// host CPU and (domain, vcpu) it belongs to, and sorts the result by time.
///
/// Usage: create with [`XenTraceParser::new`], call [`XenTraceParser::execute`]
/// once, then query the events by index or with the built-in cursor.
///
/// The whole file is read by `execute`; events are not available before it
/// returns. The parser is released by dropping it.
#[derive(Debug)]
pub struct XenTraceParser {
    path: path::PathBuf,
    options: XenTraceParserOptions,
    tracker: StateTracker,
    events: EventStore,
    stop_reason: Option<XenTraceStopReason>,
}

impl XenTraceParser {
    /// Creates a parser for the trace at `path` with default options.
    /// The file is not opened until [`Self::execute`].
    ///
    /// Fails with [`XenTraceError::InvalidPath`] if `path` is empty, or
    /// [`XenTraceError::OutOfMemory`] if the initial buffers cannot be
    /// allocated.
    pub fn new(path: impl AsRef<path::Path>) -> Result<Self, XenTraceError> {
        return Self::with_options(path, XenTraceParserOptions::default());
    }

    /// Creates a parser for the trace at `path` with the given options.
    pub fn with_options(
        path: impl AsRef<path::Path>,
        options: XenTraceParserOptions,
    ) -> Result<Self, XenTraceError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(XenTraceError::InvalidPath);
        }

        return Ok(Self {
            path: path.to_path_buf(),
            options,
            tracker: StateTracker::new()?,
            events: EventStore::new()?,
            stop_reason: None,
        });
    }

    /// Path of the trace file.
    pub fn path(&self) -> &path::Path {
        &self.path
    }

    /// Options the parser was created with.
    pub fn options(&self) -> &XenTraceParserOptions {
        &self.options
    }

    /// Reads the whole trace and returns the number of events.
    ///
    /// Returns 0 if the file cannot be opened (use [`Self::try_execute`] to
    /// get the error). A truncated or unreadable tail is not an error: the
    /// events read before it are kept.
    ///
    /// Once a call has produced at least one event, further calls return the
    /// same count without touching the file. A trace that yields no events
    /// is read again on every call, since "no events" is indistinguishable
    /// from "not executed yet".
    pub fn execute(&mut self) -> usize {
        match self.try_execute() {
            Ok(count) => return count,
            Err(e) => {
                log::warn!("{}: {}", self.path.display(), e);
                return 0;
            }
        }
    }

    /// Same as [`Self::execute`], but reports a failure to open the file.
    pub fn try_execute(&mut self) -> Result<usize, XenTraceError> {
        if !self.events.is_empty() {
            return Ok(self.events.len());
        }

        let file = InputFile::new(&self.path)?;
        let file_len = file.len();
        log::debug!("{}: reading {} bytes", self.path.display(), file_len);

        return Ok(self.read_events(file));
    }

    /// Runs one pass: read, track, store, then trim and order the store.
    fn read_events<R: io::Read>(&mut self, input: R) -> usize {
        self.stop_reason = None;

        if self.tracker.reset().is_err() || self.events.begin().is_err() {
            self.stop_reason = Some(XenTraceStopReason::OutOfMemory);
            return 0;
        }

        let mut reader = RecordReader::new(input, self.options.byte_reader);
        while let Some(record) = reader.read_next_record() {
            let stored = match self.tracker.track(record) {
                Ok(Tracked::Consumed) => continue,
                Ok(Tracked::Store(event)) => self.events.push(event),
                Err(e) => Err(e),
            };

            if let Err(e) = stored {
                log::debug!("stopping at offset {}: {}", reader.pos(), e);
                self.stop_reason = Some(XenTraceStopReason::OutOfMemory);
                break;
            }
        }

        if self.stop_reason.is_none() {
            self.stop_reason = reader.stop_reason();
        }

        let domain_slots = self.tracker.domains().len();
        self.tracker.release_domains();
        self.events.trim();
        if self.options.event_order == XenTraceEventOrder::Time {
            self.events.sort_by_timestamp();
        }

        log::debug!(
            "{}: {} events ({} slots, grown {} times), {} host cpus ({} domain slots), stopped: {}",
            self.path.display(),
            self.events.len(),
            self.events.capacity(),
            self.events.grow_count(),
            self.cpu_count(),
            domain_slots,
            self.stop_reason.unwrap_or(XenTraceStopReason::EndOfStream)
        );

        return self.events.len();
    }

    /// Why the last [`Self::execute`] pass stopped reading, or `None` if no
    /// pass has run.
    pub fn stop_reason(&self) -> Option<XenTraceStopReason> {
        self.stop_reason
    }

    /// Number of host CPUs: one more than the highest CPU named by a
    /// CPU-change record, or 1 if there were none.
    pub fn cpu_count(&self) -> u32 {
        self.tracker.host_cpu().highest() as u32 + 1
    }

    /// Number of events read by [`Self::execute`].
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Returns the event at `index`, or `None` if `index >= event_count()`.
    /// Does not affect the cursor used by [`Self::next_event`].
    pub fn get_event(&self, index: usize) -> Option<&XenEvent> {
        self.events.get(index)
    }

    /// Returns the event at the cursor and advances the cursor, or `None`
    /// once every event has been returned.
    pub fn next_event(&mut self) -> Option<&XenEvent> {
        self.events.next_event()
    }

    /// Moves the cursor used by [`Self::next_event`] back to the first event.
    pub fn reset_iter(&mut self) {
        self.events.reset_iter();
    }

    /// All events, in the order selected by [`XenTraceParserOptions::event_order`].
    pub fn events(&self) -> &[XenEvent] {
        self.events.as_slice()
    }

    /// Iterates all events without touching the cursor.
    pub fn iter(&self) -> slice::Iter<'_, XenEvent> {
        self.events.iter()
    }
}

impl<'a> IntoIterator for &'a XenTraceParser {
    type Item = &'a XenEvent;
    type IntoIter = slice::Iter<'a, XenEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// The order in which events are returned after [`XenTraceParser::execute`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum XenTraceEventOrder {
    /// Events are returned in the order they appear in the file, i.e. grouped
    /// by the host CPU buffer they were flushed from.
    File,

    /// Events are sorted by timestamp. Events with equal timestamps appear in
    /// an unspecified order (the sort is not stable).
    #[default]
    Time,
}

/// Options for [`XenTraceParser::with_options`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct XenTraceParserOptions {
    /// Byte order of the trace. Defaults to the host byte order.
    pub byte_reader: XenByteReader,

    /// Order of the events after parsing. Defaults to [`XenTraceEventOrder::Time`].
    pub event_order: XenTraceEventOrder,
}
