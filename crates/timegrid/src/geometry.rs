use egui::{pos2, vec2, Rect};
use thiserror::Error;

/// One quantization step in beats. Drag moves and resizes snap to this.
pub const SUBBEAT_BEATS: f64 = 0.25;

/// Bottom value of a time signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteValue {
    Half,
    Quarter,
    Eighth,
    Sixteenth,
}

/// Time signature of the grid, immutable per snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeSignature {
    pub beats: u32,
    pub note_value: NoteValue,
}

impl TimeSignature {
    pub const COMMON: Self = Self {
        beats: 4,
        note_value: NoteValue::Quarter,
    };

    pub fn new(beats: u32, note_value: NoteValue) -> Self {
        Self {
            beats: beats.max(1),
            note_value,
        }
    }

    pub fn beats_per_bar(&self) -> u32 {
        self.beats.max(1)
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::COMMON
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("zoom range is empty: min {min} is not below max {max}")]
    EmptyZoomRange { min: f32, max: f32 },
    #[error("zoom bound must be positive, got {0}")]
    NonPositiveZoomBound(f32),
}

/// Clamp bounds for the time scale in pixels per bar.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomRange {
    pub min: f32,
    pub max: f32,
}

impl ZoomRange {
    pub fn new(min: f32, max: f32) -> Result<Self, GeometryError> {
        if min <= 0.0 || max <= 0.0 {
            return Err(GeometryError::NonPositiveZoomBound(min.min(max)));
        }
        if min >= max {
            return Err(GeometryError::EmptyZoomRange { min, max });
        }
        Ok(Self { min, max })
    }
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self {
            min: 100.0,
            max: 500.0,
        }
    }
}

/// Zoomable time scale. `scale` is the width of one bar in pixels.
#[derive(Clone, Copy, Debug)]
pub struct Zoom {
    pub scale: f32,
    pub range: ZoomRange,
    pub speed: f32,
}

impl Zoom {
    pub fn new(scale: f32, range: ZoomRange) -> Self {
        Self {
            scale: scale.clamp(range.min, range.max),
            range,
            speed: 0.4,
        }
    }

    /// Apply one pinch increment. The raw gesture scale is dampened by
    /// `speed` before clamping so zooming feels sub-linear.
    pub fn pinch(&mut self, delta_scale: f32) {
        let mut delta = ((delta_scale - 1.0) * self.speed) + 1.0;
        delta = delta.min(self.range.max / self.scale);
        delta = delta.max(self.range.min / self.scale);
        self.scale *= delta;
    }
}

impl Default for Zoom {
    fn default() -> Self {
        Self::new(200.0, ZoomRange::default())
    }
}

/// Fixed layout metrics plus the current time scale. All conversions
/// between musical time and pixels go through here.
#[derive(Clone, Copy, Debug)]
pub struct GridMetrics {
    pub time_signature: TimeSignature,
    /// Width of one bar in pixels (the time scale).
    pub measure_width: f32,
    pub row_height: f32,
    pub header_width: f32,
    pub measure_height: f32,
}

impl GridMetrics {
    pub fn beat_width(&self) -> f32 {
        self.measure_width / self.time_signature.beats_per_bar() as f32
    }

    pub fn subbeat_width(&self) -> f32 {
        self.beat_width() / 4.0
    }

    pub fn x_for_beats(&self, beats: f64) -> f32 {
        self.header_width + beats as f32 * self.beat_width()
    }

    /// Inverse of `x_for_beats`. Points left of the header map to 0.
    pub fn beats_for_x(&self, x: f32) -> f64 {
        (((x - self.header_width) / self.beat_width()).max(0.0)) as f64
    }

    pub fn y_for_row(&self, row: usize) -> f32 {
        self.measure_height + row as f32 * self.row_height
    }

    /// Row under a Y coordinate. Points above the measure bar hit nothing.
    pub fn row_for_y(&self, y: f32) -> Option<usize> {
        if y < self.measure_height {
            return None;
        }
        Some(((y - self.measure_height) / self.row_height).floor() as usize)
    }

    pub fn cell_frame(&self, row: usize, position: f64, duration: f64) -> Rect {
        Rect::from_min_size(
            pos2(self.x_for_beats(position), self.y_for_row(row)),
            vec2(duration as f32 * self.beat_width(), self.row_height),
        )
    }

    pub fn header_frame(&self, row: usize) -> Rect {
        Rect::from_min_size(
            pos2(0.0, self.y_for_row(row)),
            vec2(self.header_width, self.row_height),
        )
    }

    /// Bars needed to lay out the grid: at least one full viewport, always
    /// covering the content, and extending past the rangehead if shown.
    pub fn bar_count(
        &self,
        viewport_width: f32,
        content_beats: f64,
        rangehead_beats: Option<f64>,
    ) -> usize {
        let beats_per_bar = self.time_signature.beats_per_bar() as f64;
        let min_bars = (viewport_width / self.measure_width).ceil() as usize;
        let mut bars = (content_beats / beats_per_bar).ceil() as usize;
        bars = bars.max(min_bars);
        if let Some(range) = rangehead_beats {
            let ranged = (range / beats_per_bar).ceil() as usize + 1;
            bars = bars.max(ranged);
        }
        bars.max(1)
    }

    /// Width in pixels of `bars` bars plus the header column.
    pub fn content_width(&self, bars: usize) -> f32 {
        self.header_width + bars as f32 * self.measure_width
    }

    /// Beats spanned by `bars` bars.
    pub fn content_beats(&self, bars: usize) -> f64 {
        bars as f64 * self.time_signature.beats_per_bar() as f64
    }
}

impl Default for GridMetrics {
    fn default() -> Self {
        Self {
            time_signature: TimeSignature::COMMON,
            measure_width: 200.0,
            row_height: 60.0,
            header_width: 120.0,
            measure_height: 30.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn beat_and_subbeat_widths() {
        let metrics = GridMetrics::default();
        assert_eq!(metrics.beat_width(), 50.0);
        assert_eq!(metrics.subbeat_width(), 12.5);
    }

    #[test]
    fn x_left_of_header_clamps_to_zero() {
        let metrics = GridMetrics::default();
        assert_eq!(metrics.beats_for_x(0.0), 0.0);
        assert_eq!(metrics.beats_for_x(metrics.header_width - 10.0), 0.0);
    }

    #[test]
    fn row_above_measure_bar_is_none() {
        let metrics = GridMetrics::default();
        assert_eq!(metrics.row_for_y(10.0), None);
        assert_eq!(metrics.row_for_y(30.0), Some(0));
        assert_eq!(metrics.row_for_y(90.5), Some(1));
    }

    #[test]
    fn zoom_is_dampened_and_clamped() {
        let mut zoom = Zoom::new(200.0, ZoomRange::default());
        zoom.pinch(1.5);
        // (1.5 - 1) * 0.4 + 1 = 1.2
        assert!((zoom.scale - 240.0).abs() < 1e-3);

        let mut zoom = Zoom::new(480.0, ZoomRange::default());
        zoom.pinch(3.0);
        assert!((zoom.scale - 500.0).abs() < 1e-3);

        let mut zoom = Zoom::new(110.0, ZoomRange::default());
        zoom.pinch(0.1);
        assert!((zoom.scale - 100.0).abs() < 1e-3);
    }

    #[test]
    fn zoom_range_rejects_bad_bounds() {
        assert!(ZoomRange::new(100.0, 500.0).is_ok());
        assert_eq!(
            ZoomRange::new(500.0, 100.0),
            Err(GeometryError::EmptyZoomRange {
                min: 500.0,
                max: 100.0
            })
        );
        assert!(matches!(
            ZoomRange::new(0.0, 100.0),
            Err(GeometryError::NonPositiveZoomBound(_))
        ));
    }

    #[test]
    fn bar_count_covers_viewport_content_and_rangehead() {
        let metrics = GridMetrics::default();
        // Empty grid still fills one viewport worth of bars.
        assert_eq!(metrics.bar_count(900.0, 0.0, None), 5);
        // Long content wins over the viewport floor.
        assert_eq!(metrics.bar_count(400.0, 33.0, None), 9);
        // Rangehead extends past the content by one bar.
        assert_eq!(metrics.bar_count(400.0, 4.0, Some(15.0)), 5);
    }

    proptest! {
        #[test]
        fn time_round_trips_within_a_subbeat(
            beats in 0.0f64..512.0,
            scale in 100.0f32..500.0,
        ) {
            let metrics = GridMetrics {
                measure_width: scale,
                ..GridMetrics::default()
            };
            let round = metrics.beats_for_x(metrics.x_for_beats(beats));
            prop_assert!((round - beats).abs() < SUBBEAT_BEATS);
        }
    }
}
