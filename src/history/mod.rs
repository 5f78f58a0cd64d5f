//! Linear edit history with a cursor. New entries prune any redo tail.

mod snapshot;

pub use snapshot::{Snapshot, SnapshotError, SnapshotResult};

pub(crate) use snapshot::image_size;
#[cfg(test)]
pub(crate) use snapshot::test_png;

#[derive(Debug, Clone, Default)]
pub struct EditHistory {
    entries: Vec<Snapshot>,
    index: Option<usize>,
}

impl EditHistory {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: None,
        }
    }

    /// Drops everything after the cursor, pushes `snapshot` and moves the cursor onto it.
    pub fn append(&mut self, snapshot: Snapshot) {
        let keep = self.index.map_or(0, |index| index + 1);
        let pruned = self.entries.len().saturating_sub(keep);
        self.entries.truncate(keep);
        self.entries.push(snapshot);
        self.index = Some(self.entries.len() - 1);
        tracing::debug!(
            index = self.entries.len() - 1,
            pruned,
            "history entry appended"
        );
    }

    pub fn undo(&mut self) -> bool {
        match self.index {
            Some(index) if index > 0 => {
                self.index = Some(index - 1);
                true
            }
            _ => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.index {
            Some(index) if index + 1 < self.entries.len() => {
                self.index = Some(index + 1);
                true
            }
            _ => false,
        }
    }

    /// Moves the cursor back to the original entry without discarding anything.
    pub fn reset(&mut self) -> bool {
        match self.index {
            Some(index) => {
                self.index = Some(0);
                index != 0
            }
            None => false,
        }
    }

    /// Starts a fresh history whose original is `snapshot`.
    pub fn replace_all(&mut self, snapshot: Snapshot) {
        self.entries.clear();
        self.entries.push(snapshot);
        self.index = Some(0);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index = None;
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.index.and_then(|index| self.entries.get(index))
    }

    pub fn original(&self) -> Option<&Snapshot> {
        self.entries.first()
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Snapshot] {
        &self.entries
    }

    pub fn can_undo(&self) -> bool {
        self.index.is_some_and(|index| index > 0)
    }

    pub fn can_redo(&self) -> bool {
        self.index
            .is_some_and(|index| index + 1 < self.entries.len())
    }

    /// Any edit applied on top of the original is reachable from the cursor.
    pub fn has_edits(&self) -> bool {
        self.can_undo()
    }
}
