use std::collections::BTreeMap;
use std::collections::BTreeSet;

use egui::{Pos2, Rect};

use crate::geometry::{GridMetrics, SUBBEAT_BEATS};

/// Timed event inside a row. `data` is an opaque payload the host gave
/// us, typically the stringified velocity.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    pub data: String,
    /// Start in beats, always >= 0.
    pub position: f64,
    /// Length in beats, never below one subbeat.
    pub duration: f64,
}

impl Cell {
    pub fn new(data: impl Into<String>, position: f64, duration: f64) -> Self {
        Self {
            data: data.into(),
            position: position.max(0.0),
            duration: duration.max(SUBBEAT_BEATS),
        }
    }

    pub fn end(&self) -> f64 {
        self.position + self.duration
    }
}

/// One horizontal lane of the grid. Cell order is stacking order, not
/// time order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    pub header: Option<String>,
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self {
            header: None,
            cells,
        }
    }

    /// End of the last-sounding cell in beats.
    pub fn duration(&self) -> f64 {
        self.cells.iter().map(Cell::end).fold(0.0, f64::max)
    }
}

/// Positional address of a cell. Valid only until the next reload or
/// structural mutation; the row-major `Ord` keeps selections stable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellIndex {
    pub row: usize,
    pub index: usize,
}

impl CellIndex {
    pub fn new(row: usize, index: usize) -> Self {
        Self { row, index }
    }
}

/// Value copy of the whole grid at one point in history.
pub type GridSnapshot = Vec<Row>;

/// Authoritative grid state: rows, cells and the selection set.
#[derive(Clone, Debug, Default)]
pub struct GridModel {
    rows: Vec<Row>,
    selection: BTreeSet<CellIndex>,
}

impl GridModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all rows and cells. Clears the selection; any in-flight
    /// gesture must be considered invalid after this.
    pub fn reload(&mut self, rows: Vec<Row>) {
        self.rows = rows;
        self.selection.clear();
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn cell(&self, index: CellIndex) -> Option<&Cell> {
        self.rows.get(index.row)?.cells.get(index.index)
    }

    /// End of the latest cell across all rows, in beats.
    pub fn content_duration(&self) -> f64 {
        self.rows.iter().map(Row::duration).fold(0.0, f64::max)
    }

    pub fn snapshot(&self) -> GridSnapshot {
        self.rows.clone()
    }

    pub fn restore(&mut self, snapshot: GridSnapshot) {
        self.reload(snapshot);
    }

    // Selection

    pub fn select(&mut self, index: CellIndex) {
        if self.cell(index).is_some() {
            self.selection.insert(index);
        }
    }

    pub fn deselect(&mut self, index: CellIndex) {
        self.selection.remove(&index);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn is_selected(&self, index: CellIndex) -> bool {
        self.selection.contains(&index)
    }

    /// Selected cells in row-major order.
    pub fn selected(&self) -> Vec<CellIndex> {
        self.selection.iter().copied().collect()
    }

    /// Replace the selection with every cell whose frame intersects
    /// `rect`. Cells outside the rectangle are deselected.
    pub fn select_rect(&mut self, metrics: &GridMetrics, rect: Rect) {
        self.selection.clear();
        for (r, row) in self.rows.iter().enumerate() {
            for (i, cell) in row.cells.iter().enumerate() {
                let frame = metrics.cell_frame(r, cell.position, cell.duration);
                if rect.intersects(frame) {
                    self.selection.insert(CellIndex::new(r, i));
                }
            }
        }
    }

    /// Inverse geometry lookup. Returns the topmost cell under the
    /// point, or `None` over the measure bar, past the last row, or in
    /// a gap between cells.
    pub fn cell_at(&self, metrics: &GridMetrics, pos: Pos2) -> Option<CellIndex> {
        let row = metrics.row_for_y(pos.y)?;
        if row >= self.rows.len() {
            return None;
        }
        // Later cells stack on top of earlier ones.
        for (i, cell) in self.rows[row].cells.iter().enumerate().rev() {
            let frame = metrics.cell_frame(row, cell.position, cell.duration);
            if frame.contains(pos) {
                return Some(CellIndex::new(row, i));
            }
        }
        None
    }

    // Editing

    /// Move every selected cell by `delta_beats` horizontally and
    /// `delta_rows` vertically, as one group. A cell that would leave
    /// `[0, max_beats]` or the row range is rejected on its own; the
    /// rest of the group still moves. Returns the old-to-new index
    /// mapping for every selected cell.
    pub fn move_selected(
        &mut self,
        delta_beats: f64,
        delta_rows: i64,
        max_beats: f64,
    ) -> Vec<(CellIndex, CellIndex)> {
        let selected = self.selected();
        if selected.is_empty() || (delta_beats == 0.0 && delta_rows == 0) {
            return selected.into_iter().map(|i| (i, i)).collect();
        }

        if delta_rows == 0 {
            // Pure horizontal move keeps every index stable.
            for index in &selected {
                let cell = &mut self.rows[index.row].cells[index.index];
                let new_pos = cell.position + delta_beats;
                if new_pos >= 0.0 && new_pos + cell.duration <= max_beats {
                    cell.position = new_pos;
                }
            }
            return selected.into_iter().map(|i| (i, i)).collect();
        }

        // Cross-row move: work out per-cell targets, then rebuild the
        // rows so indices stay resolvable for the caller.
        let row_count = self.rows.len() as i64;
        let mut moves: BTreeMap<CellIndex, (usize, f64)> = BTreeMap::new();
        for &index in &selected {
            let cell = &self.rows[index.row].cells[index.index];
            let target_row = index.row as i64 + delta_rows;
            let new_pos = cell.position + delta_beats;
            let fits_vertically = (0..row_count).contains(&target_row);
            let fits_horizontally = new_pos >= 0.0 && new_pos + cell.duration <= max_beats;
            if fits_vertically && fits_horizontally {
                moves.insert(index, (target_row as usize, new_pos));
            }
        }

        let mut new_rows: Vec<Row> = self
            .rows
            .iter()
            .map(|row| Row {
                header: row.header.clone(),
                cells: Vec::new(),
            })
            .collect();
        let mut remap = Vec::with_capacity(selected.len());

        // Unmoved cells keep their relative order within the row.
        for (r, row) in self.rows.iter().enumerate() {
            for (i, cell) in row.cells.iter().enumerate() {
                let old = CellIndex::new(r, i);
                if moves.contains_key(&old) {
                    continue;
                }
                let new_index = CellIndex::new(r, new_rows[r].cells.len());
                new_rows[r].cells.push(cell.clone());
                if self.selection.contains(&old) {
                    remap.push((old, new_index));
                }
            }
        }
        // Moved cells restack on top of their target rows.
        for (&old, &(target_row, new_pos)) in &moves {
            let mut cell = self.rows[old.row].cells[old.index].clone();
            cell.position = new_pos;
            let new_index = CellIndex::new(target_row, new_rows[target_row].cells.len());
            new_rows[target_row].cells.push(cell);
            remap.push((old, new_index));
        }

        self.rows = new_rows;
        self.selection = remap.iter().map(|&(_, new)| new).collect();
        remap.sort_by_key(|&(old, _)| old);
        remap
    }

    /// Change every selected cell's duration by `delta_beats`. Durations
    /// never drop below one subbeat and the right edge never crosses
    /// `max_beats`; out-of-range cells clamp instead of aborting the
    /// batch.
    pub fn resize_selected(&mut self, delta_beats: f64, max_beats: f64) {
        for index in self.selection.iter().copied().collect::<Vec<_>>() {
            let cell = &mut self.rows[index.row].cells[index.index];
            let new_duration = (cell.duration + delta_beats)
                .max(SUBBEAT_BEATS)
                .min(max_beats - cell.position);
            if new_duration >= SUBBEAT_BEATS {
                cell.duration = new_duration;
            }
        }
    }

    /// Remove every selected cell. Returns the removed indices in
    /// row-major order; the selection is cleared.
    pub fn delete_selected(&mut self) -> Vec<CellIndex> {
        let deleted = self.selected();
        for index in deleted.iter().rev() {
            self.rows[index.row].cells.remove(index.index);
        }
        self.selection.clear();
        deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;
    use pretty_assertions::assert_eq;

    fn two_row_grid() -> GridModel {
        let mut model = GridModel::new();
        model.reload(vec![
            Row::new(vec![Cell::new("100", 0.0, 1.0), Cell::new("90", 2.0, 0.5)]),
            Row::new(vec![Cell::new("80", 1.0, 1.0)]),
        ]);
        model
    }

    #[test]
    fn reload_clears_selection() {
        let mut model = two_row_grid();
        model.select(CellIndex::new(0, 0));
        assert_eq!(model.selected().len(), 1);
        model.reload(vec![Row::default()]);
        assert!(model.selected().is_empty());
    }

    #[test]
    fn cell_at_hits_and_misses() {
        let model = two_row_grid();
        let metrics = GridMetrics::default();
        // Inside the first cell of row 0: x = header + 0.5 beats.
        let hit = model.cell_at(&metrics, pos2(120.0 + 25.0, 40.0));
        assert_eq!(hit, Some(CellIndex::new(0, 0)));
        // Above the measure bar.
        assert_eq!(model.cell_at(&metrics, pos2(150.0, 10.0)), None);
        // Below the last row.
        assert_eq!(model.cell_at(&metrics, pos2(150.0, 500.0)), None);
        // In the gap between the two cells of row 0.
        assert_eq!(model.cell_at(&metrics, pos2(120.0 + 75.0, 40.0)), None);
    }

    #[test]
    fn selection_is_row_major() {
        let mut model = two_row_grid();
        model.select(CellIndex::new(1, 0));
        model.select(CellIndex::new(0, 1));
        model.select(CellIndex::new(0, 0));
        assert_eq!(
            model.selected(),
            vec![
                CellIndex::new(0, 0),
                CellIndex::new(0, 1),
                CellIndex::new(1, 0)
            ]
        );
    }

    #[test]
    fn select_ignores_dangling_index() {
        let mut model = two_row_grid();
        model.select(CellIndex::new(5, 0));
        assert!(model.selected().is_empty());
    }

    #[test]
    fn horizontal_move_respects_bounds_per_cell() {
        let mut model = two_row_grid();
        model.select(CellIndex::new(0, 0));
        model.select(CellIndex::new(0, 1));
        // Cell at 2.0 would cross max_beats = 3.0; only the first moves.
        model.move_selected(1.0, 0, 3.0);
        assert_eq!(model.cell(CellIndex::new(0, 0)).unwrap().position, 1.0);
        assert_eq!(model.cell(CellIndex::new(0, 1)).unwrap().position, 2.0);
    }

    #[test]
    fn vertical_move_relocates_and_remaps() {
        let mut model = two_row_grid();
        model.select(CellIndex::new(0, 0));
        let remap = model.move_selected(0.0, 1, 16.0);
        assert_eq!(
            remap,
            vec![(CellIndex::new(0, 0), CellIndex::new(1, 1))]
        );
        assert_eq!(model.rows()[0].cells.len(), 1);
        assert_eq!(model.rows()[1].cells.len(), 2);
        assert_eq!(model.selected(), vec![CellIndex::new(1, 1)]);
    }

    #[test]
    fn vertical_move_rejects_out_of_range_cell_only() {
        let mut model = two_row_grid();
        model.select(CellIndex::new(0, 0));
        model.select(CellIndex::new(1, 0));
        // Moving down by one: row 1's cell would fall off the grid and
        // stays, row 0's cell still moves.
        let remap = model.move_selected(0.0, 1, 16.0);
        assert_eq!(model.rows()[1].cells.len(), 2);
        let stayed = remap
            .iter()
            .find(|(old, _)| *old == CellIndex::new(1, 0))
            .unwrap();
        assert_eq!(stayed.1.row, 1);
    }

    #[test]
    fn resize_clamps_to_subbeat_and_content() {
        let mut model = two_row_grid();
        model.select(CellIndex::new(0, 0));
        model.resize_selected(-5.0, 16.0);
        assert_eq!(model.cell(CellIndex::new(0, 0)).unwrap().duration, 0.25);
        model.resize_selected(100.0, 16.0);
        assert_eq!(model.cell(CellIndex::new(0, 0)).unwrap().duration, 16.0);
    }

    #[test]
    fn delete_selected_removes_and_clears() {
        let mut model = two_row_grid();
        model.select(CellIndex::new(0, 0));
        model.select(CellIndex::new(1, 0));
        let deleted = model.delete_selected();
        assert_eq!(
            deleted,
            vec![CellIndex::new(0, 0), CellIndex::new(1, 0)]
        );
        assert_eq!(model.rows()[0].cells.len(), 1);
        assert!(model.rows()[1].cells.is_empty());
        assert!(model.selected().is_empty());
    }

    #[test]
    fn select_rect_is_exact_intersection() {
        let mut model = two_row_grid();
        let metrics = GridMetrics::default();
        model.select(CellIndex::new(1, 0));
        // Rectangle over the first beat of row 0 only.
        let rect = Rect::from_min_max(pos2(120.0, 30.0), pos2(160.0, 80.0));
        model.select_rect(&metrics, rect);
        assert_eq!(model.selected(), vec![CellIndex::new(0, 0)]);
    }
}
