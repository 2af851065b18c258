// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use core::fmt;

/// A (domain, vcpu) pair, as carried in `extra[0]` of scheduler records.
///
/// On the wire the pair is one 32-bit word: domain id in the high 16 bits,
/// virtual CPU in the low 16 bits. Use [`XenDomain::from_packed`] and
/// [`XenDomain::packed`] to convert.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct XenDomain {
    id: u16,
    vcpu: u16,
}

impl XenDomain {
    /// Domain id meaning "no domain observed yet on this host CPU".
    pub const DEFAULT_ID: u16 = 32768;

    /// Domain id reserved for the hypervisor's idle domain.
    pub const IDLE_ID: u16 = 32767;

    /// The value of a host CPU slot before any scheduler record was seen.
    pub const DEFAULT: Self = Self::new(Self::DEFAULT_ID, 0);

    /// Creates a new pair.
    pub const fn new(id: u16, vcpu: u16) -> Self {
        return Self { id, vcpu };
    }

    /// Unpacks a pair from a scheduler record's payload word.
    pub const fn from_packed(packed: u32) -> Self {
        return Self {
            id: (packed >> 16) as u16,
            vcpu: packed as u16,
        };
    }

    /// Packs the pair into its payload word representation.
    pub const fn packed(self) -> u32 {
        return ((self.id as u32) << 16) | self.vcpu as u32;
    }

    /// Domain id.
    pub const fn id(self) -> u16 {
        return self.id;
    }

    /// Virtual CPU within the domain.
    pub const fn vcpu(self) -> u16 {
        return self.vcpu;
    }

    /// Returns true if the domain id is [`Self::IDLE_ID`].
    pub const fn is_idle(self) -> bool {
        return self.id == Self::IDLE_ID;
    }

    /// Returns true if the domain id is [`Self::DEFAULT_ID`].
    pub const fn is_default(self) -> bool {
        return self.id == Self::DEFAULT_ID;
    }
}

impl Default for XenDomain {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<u32> for XenDomain {
    fn from(val: u32) -> Self {
        Self::from_packed(val)
    }
}

impl From<XenDomain> for u32 {
    fn from(val: XenDomain) -> Self {
        val.packed()
    }
}

impl fmt::Display for XenDomain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_idle() {
            return write!(f, "d[IDLE]v{}", self.vcpu);
        } else if self.is_default() {
            return write!(f, "d?v{}", self.vcpu);
        } else {
            return write!(f, "d{}v{}", self.id, self.vcpu);
        }
    }
}
