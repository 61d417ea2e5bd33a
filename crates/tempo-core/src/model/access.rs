// SPDX-License-Identifier: Apache-2.0
//! Variable access map.
//!
//! Classifies, for every clock and integer variable, which processes read
//! and write it. The reference-clock decomposition of
//! [`crate::refmap::RefMap`] is admissible only when every clock is accessed
//! by exactly one process.

use fixedbitset::FixedBitSet;

use super::{ClockId, IntVarId, ProcessId};

/// Read/write classification of every variable per process.
#[derive(Debug, Clone)]
pub struct VariableAccessMap {
    clock_read: Vec<FixedBitSet>,
    clock_write: Vec<FixedBitSet>,
    int_read: Vec<FixedBitSet>,
    int_write: Vec<FixedBitSet>,
}

impl VariableAccessMap {
    /// An empty map for `clock_count` clocks (including the zero clock,
    /// which is never accessed), `int_count` integer variables and
    /// `process_count` processes.
    pub(crate) fn new(clock_count: usize, int_count: usize, process_count: usize) -> Self {
        let empty = FixedBitSet::with_capacity(process_count);
        Self {
            clock_read: vec![empty.clone(); clock_count],
            clock_write: vec![empty.clone(); clock_count],
            int_read: vec![empty.clone(); int_count],
            int_write: vec![empty; int_count],
        }
    }

    pub(crate) fn record_clock_read(&mut self, c: ClockId, pid: ProcessId) {
        if c.index() != 0 {
            self.clock_read[c.index()].insert(pid.index());
        }
    }

    pub(crate) fn record_clock_write(&mut self, c: ClockId, pid: ProcessId) {
        if c.index() != 0 {
            self.clock_write[c.index()].insert(pid.index());
        }
    }

    pub(crate) fn record_int_read(&mut self, v: IntVarId, pid: ProcessId) {
        self.int_read[v.index()].insert(pid.index());
    }

    pub(crate) fn record_int_write(&mut self, v: IntVarId, pid: ProcessId) {
        self.int_write[v.index()].insert(pid.index());
    }

    /// Processes reading clock `c`.
    pub fn clock_readers(&self, c: ClockId) -> &FixedBitSet {
        &self.clock_read[c.index()]
    }

    /// Processes writing clock `c`.
    pub fn clock_writers(&self, c: ClockId) -> &FixedBitSet {
        &self.clock_write[c.index()]
    }

    /// Processes reading integer variable `v`.
    pub fn int_readers(&self, v: IntVarId) -> &FixedBitSet {
        &self.int_read[v.index()]
    }

    /// Processes writing integer variable `v`.
    pub fn int_writers(&self, v: IntVarId) -> &FixedBitSet {
        &self.int_write[v.index()]
    }

    /// Processes accessing clock `c` in any way.
    pub fn clock_accessors(&self, c: ClockId) -> FixedBitSet {
        let mut set = self.clock_read[c.index()].clone();
        set.union_with(&self.clock_write[c.index()]);
        set
    }

    /// Whether some clock is accessed by more than one process.
    pub fn has_shared_clock(&self) -> bool {
        (1..self.clock_read.len()).any(|c| self.clock_accessors(ClockId(c as u32)).count_ones(..) > 1)
    }

    /// The unique process accessing clock `c`, when there is exactly one.
    pub fn clock_owner(&self, c: ClockId) -> Option<ProcessId> {
        let accessors = self.clock_accessors(c);
        let mut ones = accessors.ones();
        match (ones.next(), ones.next()) {
            (Some(p), None) => Some(ProcessId(p as u32)),
            _ => None,
        }
    }
}
