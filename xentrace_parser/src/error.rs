// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use std::collections;
use std::io;

/// Error returned when creating a parser or opening its trace file.
///
/// Problems found while reading records are not errors: reading stops and
/// the events decoded so far are kept (see [`crate::XenTraceStopReason`]).
#[derive(Debug, thiserror::Error)]
pub enum XenTraceError {
    /// The trace file path is empty.
    #[error("trace file path is empty")]
    InvalidPath,

    /// The initial event list or domain table could not be allocated.
    #[error("out of memory: {0}")]
    OutOfMemory(#[from] collections::TryReserveError),

    /// The trace file could not be opened.
    #[error("cannot open trace file: {0}")]
    Io(#[from] io::Error),
}
