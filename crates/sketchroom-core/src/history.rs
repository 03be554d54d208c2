//! Snapshot-based undo history.
//!
//! Every entry is a complete snapshot. A gesture opens a new entry once
//! (commit) and then replaces it in place on every frame (overwrite), so a
//! whole drag undoes in one step.

/// Default maximum number of retained snapshots.
pub const DEFAULT_MAX_ENTRIES: usize = 500;

/// How the next snapshot is derived.
pub enum Change<'a, T> {
    /// Use this snapshot as-is.
    Replace(T),
    /// Derive the next snapshot from the current one.
    Map(Box<dyn FnOnce(&T) -> T + 'a>),
}

impl<'a, T> Change<'a, T> {
    pub fn map(f: impl FnOnce(&T) -> T + 'a) -> Self {
        Change::Map(Box::new(f))
    }
}

/// Linear snapshot log with a cursor.
///
/// Invariants: there is always at least one entry and `cursor < len`.
#[derive(Debug, Clone)]
pub struct History<T> {
    entries: Vec<T>,
    cursor: usize,
    max_entries: usize,
}

impl<T: Default> Default for History<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> History<T> {
    pub fn new(initial: T) -> Self {
        Self::with_capacity(initial, DEFAULT_MAX_ENTRIES)
    }

    /// A log that keeps at most `max_entries` snapshots (at least one).
    pub fn with_capacity(initial: T, max_entries: usize) -> Self {
        Self {
            entries: vec![initial],
            cursor: 0,
            max_entries: max_entries.max(1),
        }
    }

    /// Record a new snapshot.
    ///
    /// With `overwrite` the entry at the cursor is replaced and nothing else
    /// changes. Otherwise entries past the cursor are discarded, the
    /// snapshot is appended and the cursor advances.
    pub fn record(&mut self, change: Change<'_, T>, overwrite: bool) {
        let next = match change {
            Change::Replace(next) => next,
            Change::Map(f) => f(self.current()),
        };

        if overwrite {
            self.entries[self.cursor] = next;
            return;
        }

        self.entries.truncate(self.cursor + 1);
        self.entries.push(next);
        self.cursor += 1;

        if self.entries.len() > self.max_entries {
            let excess = self.entries.len() - self.max_entries;
            self.entries.drain(..excess);
            self.cursor -= excess;
        }
    }

    /// Step back one entry. Returns `false` at the oldest entry.
    pub fn undo(&mut self) -> bool {
        if self.can_undo() {
            self.cursor -= 1;
            true
        } else {
            false
        }
    }

    /// Step forward one entry. Returns `false` at the newest entry.
    pub fn redo(&mut self) -> bool {
        if self.can_redo() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn current(&self) -> &T {
        &self.entries[self.cursor]
    }

    pub fn current_mut(&mut self) -> &mut T {
        &mut self.entries[self.cursor]
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`; a history holds at least its initial snapshot.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}
