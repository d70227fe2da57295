use egui::Vec2;

use crate::geometry::{GridMetrics, SUBBEAT_BEATS};
use crate::model::{CellIndex, GridModel};

/// Which geometry a drag gesture changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditKind {
    Move,
    Resize,
}

/// One entry of the batched edit notification: where the cell was when
/// the gesture began, and where it ended up.
#[derive(Clone, Debug, PartialEq)]
pub struct EditedCell {
    pub index: CellIndex,
    pub new_row: usize,
    pub new_position: f64,
    pub new_duration: f64,
}

#[derive(Clone, Debug)]
struct Active {
    kind: EditKind,
    /// Pairs of (index at gesture begin, index now). Cross-row moves
    /// restack cells, so the live index must be tracked through every
    /// applied step.
    affected: Vec<(CellIndex, CellIndex)>,
    /// Pixel remainder below one quantization step, carried between
    /// updates.
    carry: Vec2,
}

/// Interprets move/resize drags into quantized `GridModel` mutations.
/// Incremental deltas accumulate until a whole subbeat (horizontal) or
/// row (vertical) is crossed; nothing smaller ever reaches the model.
#[derive(Debug, Default)]
pub struct EditingController {
    active: Option<Active>,
}

impl EditingController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn kind(&self) -> Option<EditKind> {
        self.active.as_ref().map(|a| a.kind)
    }

    /// Gesture began over `anchor`. An unselected anchor replaces the
    /// selection with just itself; an already-selected anchor keeps the
    /// existing multi-selection, and the whole set is edited as a unit.
    pub fn begin(&mut self, model: &mut GridModel, kind: EditKind, anchor: CellIndex) {
        if model.cell(anchor).is_none() {
            return;
        }
        if !model.is_selected(anchor) {
            model.clear_selection();
            model.select(anchor);
        }
        let affected = model.selected().into_iter().map(|i| (i, i)).collect();
        self.active = Some(Active {
            kind,
            affected,
            carry: Vec2::ZERO,
        });
    }

    /// Feed one incremental pointer delta in pixels. Consumes whole
    /// quantization steps and keeps the remainder for the next call.
    pub fn update(
        &mut self,
        model: &mut GridModel,
        metrics: &GridMetrics,
        delta: Vec2,
        max_beats: f64,
    ) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        active.carry += delta;

        let subbeat_px = metrics.subbeat_width();
        let steps_x = (active.carry.x / subbeat_px).trunc() as i64;
        active.carry.x -= steps_x as f32 * subbeat_px;

        match active.kind {
            EditKind::Move => {
                let steps_y = (active.carry.y / metrics.row_height).trunc() as i64;
                active.carry.y -= steps_y as f32 * metrics.row_height;
                if steps_x == 0 && steps_y == 0 {
                    return;
                }
                let remap =
                    model.move_selected(steps_x as f64 * SUBBEAT_BEATS, steps_y, max_beats);
                for (_, current) in active.affected.iter_mut() {
                    if let Some(&(_, new)) = remap.iter().find(|(old, _)| old == current) {
                        *current = new;
                    }
                }
            }
            EditKind::Resize => {
                if steps_x == 0 {
                    return;
                }
                model.resize_selected(steps_x as f64 * SUBBEAT_BEATS, max_beats);
            }
        }
    }

    /// Gesture ended: emit the batched edit data for every affected
    /// cell, keyed by its pre-gesture index.
    pub fn finish(&mut self, model: &GridModel) -> Vec<EditedCell> {
        let Some(active) = self.active.take() else {
            return Vec::new();
        };
        active
            .affected
            .iter()
            .filter_map(|&(original, current)| {
                let cell = model.cell(current)?;
                Some(EditedCell {
                    index: original,
                    new_row: current.row,
                    new_position: cell.position,
                    new_duration: cell.duration,
                })
            })
            .collect()
    }

    /// Cancelled gestures commit whatever state was reached; there is
    /// no rollback of an in-progress move. Undo is the recovery path.
    pub fn cancel(&mut self, model: &GridModel) -> Vec<EditedCell> {
        tracing::debug!("edit gesture cancelled, committing current state");
        self.finish(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cell, Row};
    use egui::vec2;
    use pretty_assertions::assert_eq;

    fn grid() -> GridModel {
        let mut model = GridModel::new();
        model.reload(vec![
            Row::new(vec![Cell::new("100", 0.0, 1.0), Cell::new("90", 4.0, 1.0)]),
            Row::new(vec![Cell::new("80", 2.0, 1.0)]),
        ]);
        model
    }

    fn metrics() -> GridMetrics {
        // beat = 50 px, subbeat = 12.5 px, row = 60 px
        GridMetrics::default()
    }

    #[test]
    fn unselected_anchor_replaces_selection() {
        let mut model = grid();
        model.select(CellIndex::new(0, 1));
        let mut editing = EditingController::new();
        editing.begin(&mut model, EditKind::Move, CellIndex::new(1, 0));
        assert_eq!(model.selected(), vec![CellIndex::new(1, 0)]);
    }

    #[test]
    fn selected_anchor_keeps_multi_selection() {
        let mut model = grid();
        model.select(CellIndex::new(0, 0));
        model.select(CellIndex::new(1, 0));
        let mut editing = EditingController::new();
        editing.begin(&mut model, EditKind::Move, CellIndex::new(1, 0));
        assert_eq!(model.selected().len(), 2);
    }

    #[test]
    fn sub_step_deltas_accumulate_before_applying() {
        let mut model = grid();
        let mut editing = EditingController::new();
        editing.begin(&mut model, EditKind::Move, CellIndex::new(0, 0));
        // 5 px at a time; one subbeat is 12.5 px.
        editing.update(&mut model, &metrics(), vec2(5.0, 0.0), 16.0);
        editing.update(&mut model, &metrics(), vec2(5.0, 0.0), 16.0);
        assert_eq!(model.cell(CellIndex::new(0, 0)).unwrap().position, 0.0);
        editing.update(&mut model, &metrics(), vec2(5.0, 0.0), 16.0);
        assert_eq!(model.cell(CellIndex::new(0, 0)).unwrap().position, 0.25);
    }

    #[test]
    fn zero_net_delta_is_idempotent() {
        let mut model = grid();
        let mut editing = EditingController::new();
        editing.begin(&mut model, EditKind::Move, CellIndex::new(1, 0));
        editing.update(&mut model, &metrics(), vec2(6.0, 20.0), 16.0);
        editing.update(&mut model, &metrics(), vec2(-6.0, -20.0), 16.0);
        let edits = editing.finish(&model);
        assert_eq!(
            edits,
            vec![EditedCell {
                index: CellIndex::new(1, 0),
                new_row: 1,
                new_position: 2.0,
                new_duration: 1.0,
            }]
        );
    }

    #[test]
    fn resize_only_on_subbeat_crossings() {
        let mut model = grid();
        let mut editing = EditingController::new();
        editing.begin(&mut model, EditKind::Resize, CellIndex::new(0, 0));
        editing.update(&mut model, &metrics(), vec2(12.0, 0.0), 16.0);
        assert_eq!(model.cell(CellIndex::new(0, 0)).unwrap().duration, 1.0);
        editing.update(&mut model, &metrics(), vec2(1.0, 0.0), 16.0);
        assert_eq!(model.cell(CellIndex::new(0, 0)).unwrap().duration, 1.25);
    }

    #[test]
    fn resize_never_drops_below_one_subbeat() {
        let mut model = grid();
        let mut editing = EditingController::new();
        editing.begin(&mut model, EditKind::Resize, CellIndex::new(0, 0));
        // 20 subbeats leftwards on a 4-subbeat cell.
        editing.update(&mut model, &metrics(), vec2(-250.0, 0.0), 16.0);
        assert_eq!(model.cell(CellIndex::new(0, 0)).unwrap().duration, 0.25);
    }

    #[test]
    fn finish_reports_pre_gesture_index_after_row_change() {
        let mut model = grid();
        let mut editing = EditingController::new();
        editing.begin(&mut model, EditKind::Move, CellIndex::new(0, 0));
        // One row down, one subbeat right.
        editing.update(&mut model, &metrics(), vec2(12.5, 60.0), 16.0);
        let edits = editing.finish(&model);
        assert_eq!(
            edits,
            vec![EditedCell {
                index: CellIndex::new(0, 0),
                new_row: 1,
                new_position: 0.25,
                new_duration: 1.0,
            }]
        );
        assert!(!editing.is_active());
    }

    #[test]
    fn cancel_commits_reached_state() {
        let mut model = grid();
        let mut editing = EditingController::new();
        editing.begin(&mut model, EditKind::Move, CellIndex::new(1, 0));
        editing.update(&mut model, &metrics(), vec2(25.0, 0.0), 16.0);
        let edits = editing.cancel(&model);
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].new_position, 2.5);
        assert_eq!(model.cell(CellIndex::new(1, 0)).unwrap().position, 2.5);
    }
}
