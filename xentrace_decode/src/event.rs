// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use core::fmt;

use crate::XenDomain;
use crate::XenRecord;

/// A stored trace record, attributed to the host CPU it was emitted on and
/// the (domain, vcpu) that was running there when it was emitted.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct XenEvent {
    host_cpu: u16,
    domain: XenDomain,
    record: XenRecord,
}

impl XenEvent {
    /// Creates a new event. Events are normally created by the parser.
    pub const fn new(host_cpu: u16, domain: XenDomain, record: XenRecord) -> Self {
        return Self {
            host_cpu,
            domain,
            record,
        };
    }

    /// Host (physical) CPU the record was emitted on.
    pub const fn host_cpu(&self) -> u16 {
        self.host_cpu
    }

    /// Domain and vcpu running on [`Self::host_cpu`] when the record was emitted.
    pub const fn domain(&self) -> XenDomain {
        self.domain
    }

    /// The record, with its timestamp resolved.
    pub const fn record(&self) -> &XenRecord {
        &self.record
    }

    /// Shortcut for `record().timestamp()`.
    pub const fn timestamp(&self) -> u64 {
        self.record.timestamp()
    }
}

impl fmt::Display for XenEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        return write!(f, "cpu{} {} {}", self.host_cpu, self.domain, self.record);
    }
}
