// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

#![no_std]
#![warn(missing_docs)]
#![allow(clippy::needless_return)]

//! XenTrace record decoding
//!
//! Value types for the binary records written by the Xen hypervisor's
//! tracing facility: the packed header word, the record itself, the
//! (domain, vcpu) pair carried by scheduler records, and the attributed
//! event produced by the `xentrace_parser` crate.

pub use byte_reader::XenByteReader;
pub use domain::XenDomain;
pub use event::XenEvent;
pub use event_id::XenEventId;
pub use record::XenRecord;
pub use record::XenRecordHeader;
pub mod changelog;

mod byte_reader;
mod domain;
mod event;
mod event_id;
mod record;
