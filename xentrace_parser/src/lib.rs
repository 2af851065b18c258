// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

#![warn(missing_docs)]
#![allow(clippy::needless_return)]

//! XenTrace binary file parsing
//!
//! [`XenTraceParser`] reads a trace produced by `xentrace`, tracks which
//! host CPU each record came from and which (domain, vcpu) was running
//! there, and returns the records as time-ordered [`XenEvent`]s.
//!
//! ```no_run
//! let mut parser = xentrace_parser::XenTraceParser::new("trace.bin")?;
//! parser.execute();
//! for event in &parser {
//!     println!("{}", event);
//! }
//! # Ok::<(), xentrace_parser::XenTraceError>(())
//! ```

pub use error::XenTraceError;
pub use parser::XenTraceEventOrder;
pub use parser::XenTraceParser;
pub use parser::XenTraceParserOptions;
pub use record_reader::XenTraceStopReason;
pub use xentrace_decode::XenByteReader;
pub use xentrace_decode::XenDomain;
pub use xentrace_decode::XenEvent;
pub use xentrace_decode::XenEventId;
pub use xentrace_decode::XenRecord;
pub use xentrace_decode::XenRecordHeader;
pub mod changelog;

mod error;
mod event_store;
mod input_file;
mod parser;
mod record_reader;
mod state_tracker;
