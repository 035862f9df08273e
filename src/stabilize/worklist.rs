//! Work items and the LIFO work queue of a stabilization pass.
//!
//! Resolutions are pushed at the front so that the most recently created
//! unstable record is repaired before anything older. This keeps repairs
//! nested: a formed record is finished before the result that contains it.

use crate::core::GcRef;
use crate::insertion::InsertionRow;
use std::collections::VecDeque;

/// One pending insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkItem {
    /// Record to insert into.
    pub target: GcRef,
    /// Record to insert.
    pub insert: GcRef,
    /// Row to insert above.
    pub row: InsertionRow,
    /// Resolution depth; 0 for a caller request.
    pub depth: usize,
    /// Whether the result supersedes `target` within the pass.
    pub replaces_target: bool,
}

impl WorkItem {
    /// Caller-requested insertion. The result is a new record alongside the
    /// target.
    pub fn request(target: GcRef, insert: GcRef, row: InsertionRow) -> Self {
        Self { target, insert, row, depth: 0, replaces_target: false }
    }

    /// Repair of an unstable in-flight record. The result replaces it.
    pub fn repair(target: GcRef, insert: GcRef, row: InsertionRow, depth: usize) -> Self {
        Self { target, insert, row, depth, replaces_target: true }
    }

    /// Replaces `old` by `new` in both references. Returns whether anything
    /// changed.
    pub fn rewrite_reference(&mut self, old: GcRef, new: GcRef) -> bool {
        let mut changed = false;
        for slot in [&mut self.target, &mut self.insert] {
            if *slot == old {
                *slot = new;
                changed = true;
            }
        }
        changed
    }
}

/// LIFO queue of work items.
#[derive(Debug, Clone, Default)]
pub struct WorkQueue {
    items: VecDeque<WorkItem>,
    pushed: usize,
}

impl WorkQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes an item to be processed next.
    pub fn push_front(&mut self, item: WorkItem) {
        self.items.push_front(item);
        self.pushed += 1;
    }

    /// Takes the next item.
    pub fn pop_front(&mut self) -> Option<WorkItem> {
        self.items.pop_front()
    }

    /// Pending items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items pushed over the queue's life.
    pub fn pushed(&self) -> usize {
        self.pushed
    }

    /// Pending items in processing order.
    pub fn iter(&self) -> impl Iterator<Item = &WorkItem> {
        self.items.iter()
    }

    /// Replaces `old` by `new` in every pending item. Returns how many items
    /// changed.
    pub fn rewrite_reference(&mut self, old: GcRef, new: GcRef) -> usize {
        self.items.iter_mut().filter_map(|item| item.rewrite_reference(old, new).then_some(())).count()
    }
}
