//! Linear undo/redo history
//!
//! A list of committed snapshots and a cursor pointing at the snapshot of
//! the last committed state. Committing after an undo discards the redo
//! branch.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct History<T> {
    snapshots: VecDeque<T>,
    cursor: usize,
    limit: Option<usize>,
}

impl<T: Clone> History<T> {
    /// Start a history whose first snapshot is `initial`
    pub fn new(initial: T) -> Self {
        Self::with_limit(initial, None)
    }

    /// Keep at most `limit` snapshots; the oldest are dropped first
    pub fn with_limit(initial: T, limit: Option<usize>) -> Self {
        let mut snapshots = VecDeque::new();
        snapshots.push_back(initial);
        Self {
            snapshots,
            cursor: 0,
            limit: limit.map(|l| l.max(1)),
        }
    }

    /// Forget everything and start over from `initial`
    pub fn reset(&mut self, initial: T) {
        self.snapshots.clear();
        self.snapshots.push_back(initial);
        self.cursor = 0;
    }

    pub fn commit(&mut self, state: T) {
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push_back(state);

        if let Some(limit) = self.limit {
            while self.snapshots.len() > limit {
                self.snapshots.pop_front();
            }
        }
        self.cursor = self.snapshots.len() - 1;
    }

    /// Step back one snapshot. `None` when already at the oldest.
    pub fn undo(&mut self) -> Option<&T> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.snapshots.get(self.cursor)
    }

    /// Step forward one snapshot. `None` when already at the newest.
    pub fn redo(&mut self) -> Option<&T> {
        if self.cursor + 1 >= self.snapshots.len() {
            return None;
        }
        self.cursor += 1;
        self.snapshots.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// Snapshot of the last committed state
    pub fn current(&self) -> &T {
        &self.snapshots[self.cursor]
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}
