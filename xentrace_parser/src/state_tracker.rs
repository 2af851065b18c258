// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use std::collections;
use std::vec;

use xentrace_decode::*;

/// Number of host CPUs the domain table covers before any growth.
const INITIAL_DOMAIN_SLOTS: usize = 8;

/// Host CPU the stream is currently on, and the highest one seen so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct HostCpuTracker {
    current: u16,
    highest: u16,
}

impl HostCpuTracker {
    pub fn current(&self) -> u16 {
        self.current
    }

    pub fn highest(&self) -> u16 {
        self.highest
    }

    pub fn switch_to(&mut self, cpu: u16) {
        self.current = cpu;
        if cpu > self.highest {
            self.highest = cpu;
        }
    }
}

/// The (domain, vcpu) last scheduled on each host CPU, indexed by CPU.
#[derive(Debug, Default)]
pub(crate) struct DomainStateTable {
    slots: vec::Vec<XenDomain>,
    #[cfg(test)]
    slot_limit: Option<usize>,
}

impl DomainStateTable {
    /// Makes the table cover CPUs `0..=cpu`. New slots hold [`XenDomain::DEFAULT`].
    pub fn ensure_cpu(&mut self, cpu: u16) -> Result<(), collections::TryReserveError> {
        let new_len = cpu as usize + 1;
        if new_len > self.slots.len() {
            self.check_slot_limit(new_len)?;
            self.slots.try_reserve_exact(new_len - self.slots.len())?;
            self.slots.resize(new_len, XenDomain::DEFAULT);
        }
        return Ok(());
    }

    /// Returns the slot for `cpu`, or [`XenDomain::DEFAULT`] if the table
    /// does not cover it (only possible after [`Self::release`]).
    pub fn get(&self, cpu: u16) -> XenDomain {
        return self
            .slots
            .get(cpu as usize)
            .copied()
            .unwrap_or(XenDomain::DEFAULT);
    }

    /// Overwrites the slot for `cpu`, growing the table if needed.
    pub fn set(&mut self, cpu: u16, domain: XenDomain) -> Result<(), collections::TryReserveError> {
        self.ensure_cpu(cpu)?;
        self.slots[cpu as usize] = domain;
        return Ok(());
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Frees the table. It is rebuilt by the next [`StateTracker::reset`].
    pub fn release(&mut self) {
        self.slots = vec::Vec::new();
    }

    #[cfg(not(test))]
    fn check_slot_limit(&self, _new_len: usize) -> Result<(), collections::TryReserveError> {
        return Ok(());
    }

    /// Fails growth beyond `slot_limit`, for exercising the out-of-memory path.
    #[cfg(test)]
    fn check_slot_limit(&self, new_len: usize) -> Result<(), collections::TryReserveError> {
        match self.slot_limit {
            Some(limit) if new_len > limit => {
                return Err(vec::Vec::<u8>::new().try_reserve(usize::MAX).unwrap_err());
            }
            _ => return Ok(()),
        }
    }

    #[cfg(test)]
    pub fn set_slot_limit(&mut self, limit: Option<usize>) {
        self.slot_limit = limit;
    }
}

/// What the tracker decided to do with a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Tracked {
    /// Control record; updated the tracker but is not an event.
    Consumed,

    /// Record attributed to a host CPU and domain, ready to be stored.
    Store(XenEvent),
}

/// Running state of one pass over a trace: current host CPU, per-CPU
/// scheduled domain, and the timestamp carried to records that lack one.
#[derive(Debug, Default)]
pub(crate) struct StateTracker {
    last_timestamp: u64,
    host_cpu: HostCpuTracker,
    domains: DomainStateTable,
}

impl StateTracker {
    /// Returns a tracker whose domain table covers CPUs 0..7.
    pub fn new() -> Result<Self, collections::TryReserveError> {
        let mut this = Self::default();
        this.reset()?;
        return Ok(this);
    }

    /// Returns the tracker to its initial state for a new pass.
    pub fn reset(&mut self) -> Result<(), collections::TryReserveError> {
        self.last_timestamp = 0;
        self.host_cpu = HostCpuTracker::default();
        self.domains.slots.clear();
        return self.domains.ensure_cpu(INITIAL_DOMAIN_SLOTS as u16 - 1);
    }

    pub fn host_cpu(&self) -> HostCpuTracker {
        self.host_cpu
    }

    pub fn domains(&self) -> &DomainStateTable {
        &self.domains
    }

    #[cfg(test)]
    pub fn domains_mut(&mut self) -> &mut DomainStateTable {
        &mut self.domains
    }

    pub fn release_domains(&mut self) {
        self.domains.release();
    }

    /// Applies `record` to the tracker state. CPU-change records are
    /// consumed; every other record comes back as an event carrying the
    /// current host CPU, that CPU's domain, and a resolved timestamp.
    ///
    /// The domain table always covers the highest CPU seen. Fails only if
    /// the table cannot grow to do so.
    pub fn track(&mut self, mut record: XenRecord) -> Result<Tracked, collections::TryReserveError> {
        let id = record.id();

        if id.is_cpu_change() {
            let cpu = record.extra0() as u16;
            self.domains.ensure_cpu(cpu)?;
            self.host_cpu.switch_to(cpu);
            log::trace!("host cpu -> {}", self.host_cpu.current());
            return Ok(Tracked::Consumed);
        }

        let cpu = self.host_cpu.current();

        if id.is_sched_to_running() {
            self.domains.set(cpu, XenDomain::from_packed(record.extra0()))?;
        }

        if record.has_timestamp() {
            self.last_timestamp = record.timestamp();
        } else {
            record.set_timestamp(self.last_timestamp);
        }

        return Ok(Tracked::Store(XenEvent::new(cpu, self.domains.get(cpu), record)));
    }
}
