// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Release history

#[allow(unused_imports)]
use crate::*; // For docs

/// # v0.1.0 (2026-10-16)
/// - Initial release: [`XenTraceParser`] with per-host-CPU domain tracking,
///   timestamp carry-forward and time ordering.
pub mod v0_1_0 {}
