//! Time-aligned grid editing engine for piano-roll style editors.
//!
//! Rows are tracks or pitch lanes; cells are duration-bearing events on
//! a shared musical time axis. The engine owns the bidirectional
//! time/pixel mapping, selection, quantized drag editing, linear undo
//! history and rubber-band selection with edge auto-scroll. Rendering,
//! playback and file I/O belong to the host.

pub mod editing;
pub mod geometry;
pub mod history;
pub mod model;
pub mod rows;
pub mod select;
pub mod table;
pub mod transport;

pub use editing::{EditKind, EditedCell, EditingController};
pub use geometry::{
    GeometryError, GridMetrics, NoteValue, TimeSignature, Zoom, ZoomRange, SUBBEAT_BEATS,
};
pub use history::HistoryStack;
pub use model::{Cell, CellIndex, GridModel, GridSnapshot, Row};
pub use rows::{rows_from_notes, NoteEvent, LANE_COUNT};
pub use select::{DragSelectController, ScrollDirection, ScrollDirections, SelectUpdate, Viewport};
pub use table::{EditDelegate, GridDataSource, GridDelegate, GridLayout, TimeTable};
pub use transport::{Marker, SeekDriver, Transport};
