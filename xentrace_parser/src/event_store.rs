// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

use std::collections;
use std::slice;
use std::vec;

use xentrace_decode::XenEvent;

/// Append-only event list with doubling growth and an iteration cursor.
///
/// While ingesting, there is always at least one free slot after the last
/// event, so `push` itself never reallocates; the reallocation (which may
/// fail) happens right after an append fills the list up to that last slot.
#[derive(Debug, Default)]
pub(crate) struct EventStore {
    events: vec::Vec<XenEvent>,
    iter: usize,
    grow_count: u32,
    #[cfg(test)]
    capacity_limit: Option<usize>,
}

impl EventStore {
    pub const INITIAL_CAPACITY: usize = 4096;

    /// Returns an empty store with [`Self::INITIAL_CAPACITY`] reserved.
    pub fn new() -> Result<Self, collections::TryReserveError> {
        let mut this = Self::default();
        this.begin()?;
        return Ok(this);
    }

    /// Prepares an empty store for ingestion, re-reserving the initial
    /// capacity if a previous [`Self::trim`] released it.
    pub fn begin(&mut self) -> Result<(), collections::TryReserveError> {
        debug_assert!(self.events.is_empty());
        self.iter = 0;
        if self.events.capacity() < Self::INITIAL_CAPACITY {
            self.events.try_reserve_exact(Self::INITIAL_CAPACITY)?;
        }
        return Ok(());
    }

    /// Appends `event`. The event is always kept; an error means the store
    /// could not grow for the next one and ingestion must stop.
    pub fn push(&mut self, event: XenEvent) -> Result<(), collections::TryReserveError> {
        debug_assert!(self.events.len() < self.events.capacity());
        self.events.push(event);

        let capacity = self.events.capacity();
        if self.events.len() + 1 >= capacity {
            let new_capacity = capacity.checked_mul(2).unwrap_or(usize::MAX);
            self.check_capacity_limit(new_capacity)?;
            self.events
                .try_reserve_exact(new_capacity - self.events.len())?;
            self.grow_count += 1;
            log::debug!(
                "event list grown {} -> {} events",
                capacity,
                self.events.capacity()
            );
        }

        return Ok(());
    }

    /// Releases unused capacity so that `capacity() == len()`. Best effort:
    /// if the smaller buffer cannot be allocated, the current one is kept.
    pub fn trim(&mut self) {
        let len = self.events.len();
        if self.events.capacity() == len {
            return;
        }

        let mut trimmed = vec::Vec::new();
        match trimmed.try_reserve_exact(len) {
            Ok(()) => {
                log::debug!(
                    "event list trimmed {} -> {} events",
                    self.events.capacity(),
                    len
                );
                trimmed.extend(self.events.drain(..));
                self.events = trimmed;
            }
            Err(e) => {
                log::debug!(
                    "event list not trimmed, keeping {} slots: {}",
                    self.events.capacity(),
                    e
                );
            }
        }
    }

    /// Orders events by timestamp. Events with equal timestamps end up in
    /// an unspecified relative order.
    pub fn sort_by_timestamp(&mut self) {
        self.events.sort_unstable_by_key(|event| event.timestamp());
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.events.capacity()
    }

    /// Number of times the list doubled since it was created.
    pub fn grow_count(&self) -> u32 {
        self.grow_count
    }

    pub fn as_slice(&self) -> &[XenEvent] {
        &self.events
    }

    pub fn iter(&self) -> slice::Iter<'_, XenEvent> {
        self.events.iter()
    }

    /// Returns the event at `index`. Does not move the cursor.
    pub fn get(&self, index: usize) -> Option<&XenEvent> {
        self.events.get(index)
    }

    /// Returns the event at the cursor and advances the cursor.
    pub fn next_event(&mut self) -> Option<&XenEvent> {
        let event = self.events.get(self.iter)?;
        self.iter += 1;
        return Some(event);
    }

    /// Moves the cursor back to the first event.
    pub fn reset_iter(&mut self) {
        self.iter = 0;
    }

    #[cfg(not(test))]
    fn check_capacity_limit(&self, _new_capacity: usize) -> Result<(), collections::TryReserveError> {
        return Ok(());
    }

    /// Fails growth beyond `capacity_limit`, for exercising the out-of-memory path.
    #[cfg(test)]
    fn check_capacity_limit(&self, new_capacity: usize) -> Result<(), collections::TryReserveError> {
        match self.capacity_limit {
            Some(limit) if new_capacity > limit => {
                return Err(vec::Vec::<u8>::new().try_reserve(usize::MAX).unwrap_err());
            }
            _ => return Ok(()),
        }
    }

    #[cfg(test)]
    pub fn set_capacity_limit(&mut self, limit: Option<usize>) {
        self.capacity_limit = limit;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xentrace_decode::*;

    fn event(tsc: u64, tag: u32) -> XenEvent {
        XenEvent::new(0, XenDomain::DEFAULT, XenRecord::new(XenEventId::HVM, Some(tsc), &[tag]))
    }

    #[test]
    fn initial_capacity() {
        let store = EventStore::new().unwrap();
        assert!(store.is_empty());
        assert!(store.capacity() >= EventStore::INITIAL_CAPACITY);
        assert_eq!(0, store.grow_count());
    }

    #[test]
    fn doubles_and_keeps_contents() {
        let mut store = EventStore::new().unwrap();
        let initial = store.capacity();
        let total = EventStore::INITIAL_CAPACITY * 2 + 10;

        for i in 0..total {
            store.push(event(0, i as u32)).unwrap();
            assert!(store.len() < store.capacity());
        }

        assert_eq!(total, store.len());
        assert_eq!(2, store.grow_count());
        assert!(store.capacity() >= initial * 4);

        for (i, e) in store.iter().enumerate() {
            assert_eq!(i as u32, e.record().extra0());
        }
    }

    #[test]
    fn grows_one_before_full() {
        let mut store = EventStore::new().unwrap();
        let initial = store.capacity();
        for i in 0..initial - 2 {
            store.push(event(0, i as u32)).unwrap();
        }
        assert_eq!(0, store.grow_count());

        store.push(event(0, 0)).unwrap();
        assert_eq!(1, store.grow_count());
        assert!(store.capacity() >= initial * 2);
    }

    #[test]
    fn failed_growth_keeps_event() {
        let mut store = EventStore::new().unwrap();
        let initial = store.capacity();
        store.set_capacity_limit(Some(initial));

        for i in 0..initial - 2 {
            store.push(event(0, i as u32)).unwrap();
        }
        assert!(store.push(event(0, 7)).is_err());
        assert_eq!(initial - 1, store.len());
        assert_eq!(initial, store.capacity());
        assert_eq!(0, store.grow_count());
        assert_eq!(7, store.get(initial - 2).unwrap().record().extra0());
    }

    #[test]
    fn trim_then_begin() {
        let mut store = EventStore::new().unwrap();
        store.push(event(1, 1)).unwrap();
        store.trim();
        assert_eq!(1, store.capacity());
        assert_eq!(1, store.len());

        let mut empty = EventStore::new().unwrap();
        empty.trim();
        assert_eq!(0, empty.capacity());
        empty.begin().unwrap();
        assert!(empty.capacity() >= EventStore::INITIAL_CAPACITY);
    }

    #[test]
    fn sort_cursor_and_index() {
        let mut store = EventStore::new().unwrap();
        for (tsc, tag) in [(30, 0), (10, 1), (20, 2), (10, 3)] {
            store.push(event(tsc, tag)).unwrap();
        }
        store.trim();
        store.sort_by_timestamp();

        let order: Vec<u64> = store.iter().map(|e| e.timestamp()).collect();
        assert_eq!(vec![10, 10, 20, 30], order);

        assert_eq!(10, store.next_event().unwrap().timestamp());
        assert_eq!(10, store.next_event().unwrap().timestamp());
        assert_eq!(30, store.get(3).unwrap().timestamp());
        assert_eq!(20, store.next_event().unwrap().timestamp());
        assert_eq!(30, store.next_event().unwrap().timestamp());
        assert_eq!(None, store.next_event());
        assert_eq!(None, store.next_event());
        assert_eq!(None, store.get(4));

        store.reset_iter();
        let first = *store.get(0).unwrap();
        assert_eq!(Some(&first), store.next_event());
    }
}
