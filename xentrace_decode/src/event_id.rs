// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.
// Adapted from xen/include/public/trace.h.

use core::fmt;

/// The 28-bit event identifier of a trace record.
///
/// Layout: `class:12` (bits 16..28), `subclass:4` (bits 12..16),
/// `minor:12` (bits 0..12). Only a few identifiers affect decoding; the
/// rest are passed through untouched.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct XenEventId(pub u32);

impl XenEventId {
    /// Mask of the bits that can be set in an event id (TRC_HD_TO_EVENT).
    pub const MASK: u32 = 0x0FFF_FFFF;

    /// TRC_GEN
    pub const GEN: Self = Self(0x0001_F000);

    /// TRC_SCHED
    pub const SCHED: Self = Self(0x0002_F000);

    /// TRC_DOM0OP
    pub const DOM0OP: Self = Self(0x0004_F000);

    /// TRC_HVM
    pub const HVM: Self = Self(0x0008_F000);

    /// TRC_MEM
    pub const MEM: Self = Self(0x0010_F000);

    /// TRC_PV
    pub const PV: Self = Self(0x0020_F000);

    /// TRC_SHADOW
    pub const SHADOW: Self = Self(0x0040_F000);

    /// TRC_HW
    pub const HW: Self = Self(0x0080_F000);

    /// TRC_GUEST
    pub const GUEST: Self = Self(0x0800_F000);

    /// TRC_LOST_RECORDS: the hypervisor dropped records on this CPU.
    pub const LOST_RECORDS: Self = Self(0x0001_F001);

    /// TRC_TRACE_WRAP_BUFFER
    pub const TRACE_WRAP_BUFFER: Self = Self(0x0001_F002);

    /// TRC_TRACE_CPU_CHANGE: subsequent records come from the host CPU
    /// named in `extra[0]`.
    pub const TRACE_CPU_CHANGE: Self = Self(0x0001_F003);

    /// TRC_SCHED_MIN: scheduler sub-class carrying the minimal
    /// (domain, vcpu) scheduling events.
    pub const SCHED_MIN: Self = Self(0x0002_1000);

    /// TRC_SCHED_CLASS
    pub const SCHED_CLASS: Self = Self(0x0002_2000);

    /// TRC_SCHED_VERBOSE
    pub const SCHED_VERBOSE: Self = Self(0x0002_8000);

    /// TRC_SCHED_RUNSTATE_CHANGE
    pub const SCHED_RUNSTATE_CHANGE: Self = Self(0x0002_1001);

    /// TRC_SCHED_CONTINUE_RUNNING
    pub const SCHED_CONTINUE_RUNNING: Self = Self(0x0002_1002);

    /// Pattern for the scheduler "to running" events: `SCHED_MIN` with the
    /// low nibble of the subclass byte and of the minor byte left open.
    pub const SCHED_TO_RUNNING_PATTERN: u32 = Self::SCHED_MIN.0 | 0xF0F;

    /// Returns the class bits (`id >> 16`, 12 bits), e.g. 0x002 for TRC_SCHED.
    pub const fn class(self) -> u16 {
        return ((self.0 >> 16) & 0xFFF) as u16;
    }

    /// Returns the subclass bits (`id >> 12`, 4 bits).
    pub const fn subclass(self) -> u8 {
        return ((self.0 >> 12) & 0xF) as u8;
    }

    /// Returns the minor event number (low 12 bits).
    pub const fn minor(self) -> u16 {
        return (self.0 & 0xFFF) as u16;
    }

    /// Returns true if this is exactly TRC_TRACE_CPU_CHANGE.
    pub const fn is_cpu_change(self) -> bool {
        return self.0 == Self::TRACE_CPU_CHANGE.0;
    }

    /// Returns true if every bit of this id lies inside
    /// [`Self::SCHED_TO_RUNNING_PATTERN`], i.e. the record reports a
    /// (domain, vcpu) pair being scheduled onto the current host CPU.
    pub const fn is_sched_to_running(self) -> bool {
        return (self.0 & Self::SCHED_TO_RUNNING_PATTERN) == self.0;
    }

    /// Returns a string like "sched" or "hvm" for the event class.
    /// If the class is unknown, returns None.
    pub const fn class_name(self) -> Option<&'static str> {
        return match self.class() {
            0x001 => Some("gen"),
            0x002 => Some("sched"),
            0x004 => Some("dom0op"),
            0x008 => Some("hvm"),
            0x010 => Some("mem"),
            0x020 => Some("pv"),
            0x040 => Some("shadow"),
            0x080 => Some("hw"),
            0x800 => Some("guest"),
            _ => None,
        };
    }
}

impl From<u32> for XenEventId {
    fn from(val: u32) -> Self {
        Self(val & Self::MASK)
    }
}

impl From<XenEventId> for u32 {
    fn from(val: XenEventId) -> Self {
        val.0
    }
}

impl fmt::Display for XenEventId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(s) = self.class_name() {
            return write!(f, "{}:{:#09x}", s, self.0);
        } else {
            return write!(f, "{:#09x}", self.0);
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate alloc;

    use super::*;
    use alloc::string::ToString;

    #[test]
    fn fields() {
        let id = XenEventId(0x0002_1F0A);
        assert_eq!(0x002, id.class());
        assert_eq!(0x1, id.subclass());
        assert_eq!(0xF0A, id.minor());
        assert_eq!(Some("sched"), id.class_name());
        assert_eq!(None, XenEventId(0x0FFF_0001).class_name());
        assert_eq!(XenEventId(0x0FFF_FFFF), XenEventId::from(0xFFFF_FFFF));
    }

    #[test]
    fn cpu_change() {
        assert!(XenEventId::TRACE_CPU_CHANGE.is_cpu_change());
        assert!(!XenEventId::LOST_RECORDS.is_cpu_change());
        assert!(!XenEventId(0x0001_F00F).is_cpu_change());
    }

    #[test]
    fn sched_to_running() {
        assert!(XenEventId::SCHED_RUNSTATE_CHANGE.is_sched_to_running());
        assert!(XenEventId::SCHED_CONTINUE_RUNNING.is_sched_to_running());
        assert!(XenEventId(0x0002_1F0F).is_sched_to_running());
        assert!(!XenEventId(0x0002_2001).is_sched_to_running());
        assert!(!XenEventId(0x0002_1010).is_sched_to_running());
        assert!(!XenEventId::TRACE_CPU_CHANGE.is_sched_to_running());
        assert!(!XenEventId::HVM.is_sched_to_running());
    }

    #[test]
    fn display() {
        assert_eq!("sched:0x0021001", XenEventId::SCHED_RUNSTATE_CHANGE.to_string());
        assert_eq!("0x0ff0001", XenEventId(0x0FF0_001).to_string());
    }
}
