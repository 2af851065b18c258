// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

/// Helper for reading trace words that may have been captured on a host with
/// a different byte order than the one doing the decoding.
///
/// XenTrace writes records in the byte order of the host that produced them.
/// Most traces are decoded on the same machine, so the default
/// ([`XenByteReader::KEEP_ENDIAN`]) performs no swapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct XenByteReader {
    source_big_endian: bool,
}

impl XenByteReader {
    /// true if running on a big-endian system.
    pub const HOST_IS_BIG_ENDIAN: bool = cfg!(target_endian = "big");

    /// A reader that assumes the trace was produced in host byte order.
    pub const KEEP_ENDIAN: Self = Self::new(Self::HOST_IS_BIG_ENDIAN);

    /// A reader that assumes the trace was produced in the opposite byte order
    /// from the host, i.e. every word must be swapped.
    pub const SWAP_ENDIAN: Self = Self::new(!Self::HOST_IS_BIG_ENDIAN);

    /// Create a new reader that will interpret input bytes as indicated by the
    /// source_big_endian parameter.
    pub const fn new(source_big_endian: bool) -> Self {
        return Self { source_big_endian };
    }

    /// Returns true if the input bytes are being interpreted as big-endian.
    pub const fn source_big_endian(self) -> bool {
        return self.source_big_endian;
    }

    /// Returns true if the input bytes are being byte-swapped.
    pub const fn byte_swap_needed(self) -> bool {
        return self.source_big_endian != Self::HOST_IS_BIG_ENDIAN;
    }

    /// Reads a u32 from a 4-byte array in the source byte order.
    pub const fn read_u32(self, source: [u8; 4]) -> u32 {
        return if self.source_big_endian {
            u32::from_be_bytes(source)
        } else {
            u32::from_le_bytes(source)
        };
    }

    /// Reads a u64 from an 8-byte array in the source byte order.
    pub const fn read_u64(self, source: [u8; 8]) -> u64 {
        return if self.source_big_endian {
            u64::from_be_bytes(source)
        } else {
            u64::from_le_bytes(source)
        };
    }

    /// Writes a u32 as a 4-byte array in the source byte order.
    pub const fn write_u32(self, value: u32) -> [u8; 4] {
        return if self.source_big_endian {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };
    }

    /// Writes a u64 as an 8-byte array in the source byte order.
    pub const fn write_u64(self, value: u64) -> [u8; 8] {
        return if self.source_big_endian {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        };
    }
}

impl Default for XenByteReader {
    fn default() -> Self {
        Self::KEEP_ENDIAN
    }
}
