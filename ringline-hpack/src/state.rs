//! Table and reference-set bookkeeping shared by both directions.

use std::ops::Range;

use crate::index_set::IndexSet;
use crate::table::{HeaderField, HeaderTable};

/// Header table plus the index sets that must be renumbered with it.
///
/// The decompressor uses `reference` as the reference set and `alternate` as
/// the set of indices confirmed during the current block. The compressor
/// uses `reference` as the active set carried over from the previous block,
/// `alternate` as the set being built for the next one, and `implied` for
/// entries that continue without having been sent.
#[derive(Debug)]
pub(crate) struct CompressionState {
    pub(crate) table: HeaderTable,
    pub(crate) reference: IndexSet,
    pub(crate) alternate: IndexSet,
    pub(crate) implied: IndexSet,
    max_buffer: usize,
}

impl CompressionState {
    pub(crate) fn new(max_buffer: usize) -> Self {
        Self {
            table: HeaderTable::new(),
            reference: IndexSet::new(),
            alternate: IndexSet::new(),
            implied: IndexSet::new(),
            max_buffer,
        }
    }

    pub(crate) fn max_buffer(&self) -> usize {
        self.max_buffer
    }

    /// Table indices `make_room(amount)` would evict, or the whole dynamic
    /// region when an entry of `amount` bytes cannot fit at all.
    pub(crate) fn eviction_range(&self, amount: usize) -> Range<usize> {
        let len = self.table.variable_len();
        if amount > self.max_buffer {
            return 0..len;
        }
        let mut byte_count = self.table.byte_count();
        let mut first = len;
        while first > 0 && byte_count + amount > self.max_buffer {
            first -= 1;
            if let Ok(entry) = self.table.get(first) {
                byte_count -= entry.size();
            }
        }
        first..len
    }

    /// Evict oldest entries until `amount` more bytes fit, then renumber the
    /// index sets once. Returns the number of evicted entries.
    pub(crate) fn make_room(&mut self, amount: usize) -> usize {
        let len = self.table.variable_len();
        let mut evicted = 0;
        while self.table.variable_len() > 0 && self.table.byte_count() + amount > self.max_buffer {
            if let Some(field) = self.table.pop_oldest() {
                tracing::trace!(
                    index = len - evicted - 1,
                    name = %String::from_utf8_lossy(&field.name),
                    "evicted for size"
                );
            }
            evicted += 1;
        }
        self.update_reference_sets(len - evicted, evicted);
        evicted
    }

    /// Drop every dynamic entry and purge the index sets in one pass.
    pub(crate) fn clear_table(&mut self) {
        let len = self.table.variable_len();
        tracing::debug!(entries = len, "clearing header table");
        self.table.clear();
        self.update_reference_sets(0, len);
    }

    /// Insert `field` at index 0. The caller has already made room.
    pub(crate) fn add(&mut self, field: HeaderField) {
        debug_assert!(self.table.byte_count() + field.size() <= self.max_buffer);
        self.table.push_front(field);
        self.increment_indices();
    }

    /// Change the byte budget, evicting as needed.
    pub(crate) fn set_max_buffer(&mut self, max_buffer: usize) {
        tracing::debug!(from = self.max_buffer, to = max_buffer, "table resized");
        self.max_buffer = max_buffer;
        self.make_room(0);
    }

    fn increment_indices(&mut self) {
        self.reference.shift_up(1);
        self.alternate.shift_up(1);
        self.implied.shift_up(1);
    }

    fn update_reference_sets(&mut self, start: usize, removed: usize) {
        self.reference.remove_range(start, removed);
        self.alternate.remove_range(start, removed);
        self.implied.remove_range(start, removed);
    }

    /// Log the table and sets at trace level.
    pub(crate) fn dump(&self, direction: &'static str) {
        if !tracing::enabled!(tracing::Level::TRACE) {
            return;
        }
        let dynamic = self.table.variable_len();
        for (index, entry) in self.table.iter().take(dynamic).enumerate() {
            tracing::trace!(
                direction,
                index,
                name = %String::from_utf8_lossy(entry.name),
                value = %String::from_utf8_lossy(entry.value),
                referenced = self.reference.contains(index),
                "table entry"
            );
        }
        tracing::trace!(
            direction,
            byte_count = self.table.byte_count(),
            max_buffer = self.max_buffer,
            references = self.reference.len(),
            "table state"
        );
    }
}
