use smallvec::SmallVec;

use crate::model::GridSnapshot;

/// Linear, non-branching undo/redo over whole-grid snapshots. Pushing
/// after an undo discards the redo branch; there is no tree history.
#[derive(Clone, Debug)]
pub struct HistoryStack {
    items: SmallVec<[GridSnapshot; 8]>,
    /// Index of the snapshot the grid currently shows.
    cursor: Option<usize>,
    capacity: usize,
    /// Master switch; `push` is a no-op while disabled.
    pub enabled: bool,
}

impl HistoryStack {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: SmallVec::new(),
            cursor: None,
            capacity: capacity.max(1),
            enabled: true,
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.cursor = None;
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.cursor, Some(c) if c > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.cursor, Some(c) if c + 1 < self.items.len())
    }

    /// Snapshot at the cursor, if any.
    pub fn current(&self) -> Option<&GridSnapshot> {
        self.items.get(self.cursor?)
    }

    /// Record a snapshot. Callers reloading from an undo/redo result
    /// must skip this (history-suppressed reload) or the retrieved
    /// state would be re-recorded as a duplicate entry.
    pub fn push(&mut self, snapshot: GridSnapshot) {
        if !self.enabled {
            return;
        }
        if let Some(cursor) = self.cursor {
            self.items.truncate(cursor + 1);
        }
        if self.items.len() >= self.capacity {
            self.items.remove(0);
        }
        self.items.push(snapshot);
        self.cursor = Some(self.items.len() - 1);
        tracing::debug!(entries = self.items.len(), "history push");
    }

    pub fn undo(&mut self) -> Option<GridSnapshot> {
        let cursor = self.cursor?;
        if cursor == 0 {
            return None;
        }
        self.cursor = Some(cursor - 1);
        self.current().cloned()
    }

    pub fn redo(&mut self) -> Option<GridSnapshot> {
        let cursor = self.cursor?;
        if cursor + 1 >= self.items.len() {
            return None;
        }
        self.cursor = Some(cursor + 1);
        self.current().cloned()
    }
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new(200)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cell, Row};

    fn snapshot(tag: &str) -> GridSnapshot {
        vec![Row::new(vec![Cell::new(tag, 0.0, 1.0)])]
    }

    #[test]
    fn undo_walks_back_redo_walks_forward() {
        let mut history = HistoryStack::default();
        history.push(snapshot("a"));
        history.push(snapshot("b"));
        assert_eq!(history.undo(), Some(snapshot("a")));
        assert_eq!(history.redo(), Some(snapshot("b")));
        assert_eq!(history.redo(), None);
    }

    #[test]
    fn push_after_undo_discards_redo_branch() {
        let mut history = HistoryStack::default();
        history.push(snapshot("a"));
        history.push(snapshot("b"));
        assert_eq!(history.undo(), Some(snapshot("a")));
        history.push(snapshot("c"));
        // "b" is gone; linear history only.
        assert_eq!(history.redo(), None);
        assert_eq!(history.undo(), Some(snapshot("a")));
    }

    #[test]
    fn disabled_history_records_nothing() {
        let mut history = HistoryStack::default();
        history.enabled = false;
        history.push(snapshot("a"));
        assert_eq!(history.current(), None);
        assert_eq!(history.undo(), None);
    }

    #[test]
    fn capacity_evicts_oldest() {
        let mut history = HistoryStack::new(2);
        history.push(snapshot("a"));
        history.push(snapshot("b"));
        history.push(snapshot("c"));
        assert_eq!(history.undo(), Some(snapshot("b")));
        assert_eq!(history.undo(), None);
    }

    #[test]
    fn mutating_the_grid_never_touches_stored_snapshots() {
        let mut history = HistoryStack::default();
        let mut live = snapshot("a");
        history.push(live.clone());
        live[0].cells[0].position = 8.0;
        assert_eq!(history.current(), Some(&snapshot("a")));
    }
}
