use crate::model::{Cell, Row};

/// Number of pitch lanes notes are bucketed into (the MIDI range).
pub const LANE_COUNT: usize = 128;

/// Raw note event supplied by the sequencer collaborator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoteEvent {
    pub pitch: u8,
    /// Start in beats.
    pub position: f64,
    /// Length in beats.
    pub duration: f64,
    pub velocity: u8,
}

/// Compact a flat note collection into display rows.
///
/// Notes are bucketed into 128 pitch lanes; only the inclusive span
/// from the lowest to the highest used lane is emitted, keeping empty
/// lanes inside the span as empty rows. Every lane on a C (multiple of
/// 12) is labelled "C<octave>" as a register landmark, and the result
/// is reversed so the highest pitch renders as the top row.
pub fn rows_from_notes(notes: &[NoteEvent]) -> Vec<Row> {
    let mut lanes: [Vec<&NoteEvent>; LANE_COUNT] = std::array::from_fn(|_| Vec::new());
    for note in notes {
        if let Some(lane) = lanes.get_mut(note.pitch as usize) {
            lane.push(note);
        }
    }

    let first = lanes.iter().position(|lane| !lane.is_empty());
    let last = lanes.iter().rposition(|lane| !lane.is_empty());
    let (first, last) = match (first, last) {
        (Some(first), Some(last)) => (first, last),
        _ => return Vec::new(),
    };

    let mut rows = Vec::with_capacity(last - first + 1);
    for lane in first..=last {
        let cells = lanes[lane]
            .iter()
            .map(|note| Cell::new(note.velocity.to_string(), note.position, note.duration))
            .collect();
        let mut row = Row::new(cells);
        if lane % 12 == 0 {
            row.header = Some(format!("C{}", lane / 12));
        }
        rows.push(row);
    }
    rows.reverse();
    rows
}
