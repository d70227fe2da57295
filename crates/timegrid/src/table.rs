use egui::{Pos2, Rect, Vec2};

use crate::editing::{EditKind, EditedCell, EditingController};
use crate::geometry::{GridMetrics, TimeSignature, Zoom};
use crate::history::HistoryStack;
use crate::model::{CellIndex, GridModel, GridSnapshot, Row};
use crate::select::{DragSelectController, SelectUpdate, Viewport};
use crate::transport::Marker;

/// Supplies rows and the time signature on each reload.
pub trait GridDataSource {
    fn number_of_rows(&self) -> usize;
    fn time_signature(&self) -> TimeSignature;
    fn row_at(&self, index: usize) -> Row;
}

/// Sizing queried each reload, plus marker drag-end notifications.
pub trait GridDelegate {
    fn row_height(&self) -> f32;
    fn measure_height(&self) -> f32;
    fn header_width(&self) -> f32;
    fn playhead_moved(&mut self, _beats: f64) {}
    fn rangehead_moved(&mut self, _beats: f64) {}
}

/// Editing notifications, observed by hosts of editable grids.
pub trait EditDelegate {
    fn cells_edited(&mut self, _edits: &[EditedCell]) {}
    fn cells_deleted(&mut self, _cells: &[CellIndex]) {}
    fn history_changed(&mut self, _history: &HistoryStack) {}
}

/// Pixel geometry for one layout pass; everything the host renders.
#[derive(Clone, Debug)]
pub struct GridLayout {
    pub header_frames: Vec<Rect>,
    /// Per row, per cell, in model order.
    pub cell_frames: Vec<Vec<Rect>>,
    pub bar_count: usize,
    pub content_size: Vec2,
}

/// The time-table grid: model, zoomable geometry, editing, history and
/// drag-select in one place. "Editable" is a flag, not a subclass; a
/// read-only piano roll is the same type with `editable` off.
pub struct TimeTable {
    pub model: GridModel,
    pub history: HistoryStack,
    pub editing: EditingController,
    pub drag_select: DragSelectController,
    pub playhead: Marker,
    pub rangehead: Marker,
    pub zoom: Zoom,

    pub editable: bool,
    pub holds_history: bool,
    pub shows_measure: bool,
    pub shows_headers: bool,
    pub shows_playhead: bool,
    pub shows_rangehead: bool,

    time_signature: TimeSignature,
    row_height: f32,
    header_width: f32,
    measure_height: f32,
    bar_count: usize,
}

impl TimeTable {
    pub fn new() -> Self {
        Self {
            model: GridModel::new(),
            history: HistoryStack::default(),
            editing: EditingController::new(),
            drag_select: DragSelectController::new(),
            playhead: Marker::new(),
            rangehead: Marker::new(),
            zoom: Zoom::default(),
            editable: true,
            holds_history: true,
            shows_measure: true,
            shows_headers: true,
            shows_playhead: true,
            shows_rangehead: true,
            time_signature: TimeSignature::COMMON,
            row_height: 60.0,
            header_width: 120.0,
            measure_height: 30.0,
            bar_count: 1,
        }
    }

    /// Current conversion metrics. Hidden chrome collapses to zero size
    /// so the content shifts into its place.
    pub fn metrics(&self) -> GridMetrics {
        GridMetrics {
            time_signature: self.time_signature,
            measure_width: self.zoom.scale,
            row_height: self.row_height,
            header_width: if self.shows_headers {
                self.header_width
            } else {
                0.0
            },
            measure_height: if self.shows_measure {
                self.measure_height
            } else {
                0.0
            },
        }
    }

    pub fn time_scale(&self) -> f32 {
        self.zoom.scale
    }

    pub fn bar_count(&self) -> usize {
        self.bar_count
    }

    /// Beats covered by the laid-out grid; the horizontal bound for
    /// moves and resizes.
    pub fn max_beats(&self) -> f64 {
        self.metrics().content_beats(self.bar_count.max(1))
    }

    /// Rebuild rows and cells from the data source. Clears the
    /// selection, drops any in-flight gesture, and records the new
    /// state in history.
    pub fn reload(&mut self, source: &dyn GridDataSource, delegate: &dyn GridDelegate) {
        self.time_signature = source.time_signature();
        self.row_height = delegate.row_height();
        self.measure_height = delegate.measure_height();
        self.header_width = delegate.header_width();

        let rows: Vec<Row> = (0..source.number_of_rows())
            .map(|index| source.row_at(index))
            .collect();
        tracing::debug!(rows = rows.len(), "reload from data source");

        self.editing = EditingController::new();
        self.drag_select.end();
        self.model.reload(rows);
        if self.holds_history {
            self.history.push(self.model.snapshot());
        }
    }

    /// Reload from a history snapshot without re-recording it.
    pub fn reload_snapshot(&mut self, snapshot: GridSnapshot) {
        self.editing = EditingController::new();
        self.drag_select.end();
        self.model.restore(snapshot);
    }

    /// Compute the geometry the host renders for the current viewport.
    pub fn layout(&mut self, viewport_width: f32) -> GridLayout {
        let metrics = self.metrics();
        let rangehead = self.shows_rangehead.then_some(self.rangehead.position);
        self.bar_count =
            metrics.bar_count(viewport_width, self.model.content_duration(), rangehead);

        let header_frames = (0..self.model.row_count())
            .map(|row| metrics.header_frame(row))
            .collect();
        let cell_frames = self
            .model
            .rows()
            .iter()
            .enumerate()
            .map(|(row, data)| {
                data.cells
                    .iter()
                    .map(|cell| metrics.cell_frame(row, cell.position, cell.duration))
                    .collect()
            })
            .collect();

        let content_size = egui::vec2(
            metrics.content_width(self.bar_count),
            metrics.measure_height + self.model.row_count() as f32 * metrics.row_height,
        );
        GridLayout {
            header_frames,
            cell_frames,
            bar_count: self.bar_count,
            content_size,
        }
    }

    /// Pinch-zoom the time scale.
    pub fn pinch(&mut self, delta_scale: f32) {
        self.zoom.pinch(delta_scale);
    }

    /// Tap: a hit cell becomes the only selected cell; empty space
    /// deselects everything.
    pub fn tap(&mut self, pos: Pos2) -> Option<CellIndex> {
        match self.model.cell_at(&self.metrics(), pos) {
            Some(index) => {
                self.model.clear_selection();
                self.model.select(index);
                Some(index)
            }
            None => {
                self.model.clear_selection();
                None
            }
        }
    }

    // Cell editing

    pub fn begin_edit(&mut self, kind: EditKind, pos: Pos2) -> bool {
        if !self.editable {
            return false;
        }
        let Some(anchor) = self.model.cell_at(&self.metrics(), pos) else {
            return false;
        };
        self.editing.begin(&mut self.model, kind, anchor);
        true
    }

    pub fn update_edit(&mut self, delta: Vec2) {
        let metrics = self.metrics();
        let max_beats = self.max_beats();
        self.editing
            .update(&mut self.model, &metrics, delta, max_beats);
    }

    /// Commit the gesture: one batched notification, then a history
    /// entry for the edited grid.
    pub fn end_edit(&mut self, delegate: &mut dyn EditDelegate) {
        let edits = self.editing.finish(&self.model);
        self.commit_edits(edits, delegate);
    }

    /// Cancelled gestures commit exactly like ended ones.
    pub fn cancel_edit(&mut self, delegate: &mut dyn EditDelegate) {
        let edits = self.editing.cancel(&self.model);
        self.commit_edits(edits, delegate);
    }

    fn commit_edits(&mut self, edits: Vec<EditedCell>, delegate: &mut dyn EditDelegate) {
        if edits.is_empty() {
            return;
        }
        delegate.cells_edited(&edits);
        if self.holds_history {
            self.history.push(self.model.snapshot());
            delegate.history_changed(&self.history);
        }
    }

    pub fn delete_selection(&mut self, delegate: &mut dyn EditDelegate) {
        if !self.editable {
            return;
        }
        let deleted = self.model.delete_selected();
        if deleted.is_empty() {
            return;
        }
        delegate.cells_deleted(&deleted);
        if self.holds_history {
            self.history.push(self.model.snapshot());
            delegate.history_changed(&self.history);
        }
    }

    // History

    pub fn undo(&mut self, delegate: &mut dyn EditDelegate) -> bool {
        let Some(snapshot) = self.history.undo() else {
            return false;
        };
        self.reload_snapshot(snapshot);
        delegate.history_changed(&self.history);
        true
    }

    pub fn redo(&mut self, delegate: &mut dyn EditDelegate) -> bool {
        let Some(snapshot) = self.history.redo() else {
            return false;
        };
        self.reload_snapshot(snapshot);
        delegate.history_changed(&self.history);
        true
    }

    // Drag-to-select

    pub fn select_touch_began(&mut self, pos: Pos2) {
        self.drag_select.touch_began(pos);
    }

    pub fn select_tick(&mut self, dt: f32, viewport: &Viewport) -> Option<SelectUpdate> {
        let update = self.drag_select.tick(dt, viewport)?;
        if let Some(rect) = update.rect {
            self.model.select_rect(&self.metrics(), rect);
        }
        Some(update)
    }

    pub fn select_touch_moved(&mut self, pos: Pos2, viewport: &Viewport) -> Option<SelectUpdate> {
        let update = self.drag_select.touch_moved(pos, viewport)?;
        if let Some(rect) = update.rect {
            self.model.select_rect(&self.metrics(), rect);
        }
        Some(update)
    }

    /// Returns true when a rubber-band selection just ended and the
    /// host should re-enable normal scrolling.
    pub fn select_touch_ended(&mut self) -> bool {
        self.drag_select.end()
    }

    // Markers

    pub fn drag_playhead(&mut self, delta_x: f32) {
        let metrics = self.metrics();
        let max = self.max_beats();
        self.playhead.drag(&metrics, delta_x, max);
    }

    pub fn end_playhead_drag(&mut self, delegate: &mut dyn GridDelegate) {
        let position = self.playhead.end_drag();
        delegate.playhead_moved(position);
    }

    pub fn drag_rangehead(&mut self, delta_x: f32) {
        let metrics = self.metrics();
        let max = self.max_beats();
        self.rangehead.drag(&metrics, delta_x, max);
    }

    pub fn end_rangehead_drag(&mut self, delegate: &mut dyn GridDelegate) {
        let position = self.rangehead.end_drag();
        delegate.rangehead_moved(position);
    }
}

impl Default for TimeTable {
    fn default() -> Self {
        Self::new()
    }
}
