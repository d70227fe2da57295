use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use atomic_float::AtomicF64;

use crate::geometry::{GridMetrics, SUBBEAT_BEATS};

/// Sequencer collaborator. The grid reads the position for playhead
/// rendering and writes seek targets; playback itself lives with the
/// host.
pub trait Transport {
    /// Current position in beats.
    fn position(&self) -> f64;
    /// Total length in beats.
    fn length(&self) -> f64;
    fn play(&mut self);
    fn stop(&mut self);
    fn set_rate(&mut self, rate: f64);
    fn seek(&mut self, beats: f64);
}

/// Draggable time marker (playhead or rangehead). Drags snap to
/// subbeats with the same pixel accumulation the cell edits use.
#[derive(Clone, Debug)]
pub struct Marker {
    /// Position in beats.
    pub position: f64,
    pub visible: bool,
    pub movable: bool,
    carry: f32,
}

impl Marker {
    pub fn new() -> Self {
        Self {
            position: 0.0,
            visible: true,
            movable: true,
            carry: 0.0,
        }
    }

    /// Follow the transport while playing.
    pub fn sync(&mut self, transport: &dyn Transport) {
        self.position = transport.position().max(0.0);
    }

    /// Feed one horizontal drag delta in pixels.
    pub fn drag(&mut self, metrics: &GridMetrics, delta_x: f32, max_beats: f64) {
        if !self.movable {
            return;
        }
        self.carry += delta_x;
        let steps = (self.carry / metrics.subbeat_width()).trunc() as i64;
        self.carry -= steps as f32 * metrics.subbeat_width();
        if steps != 0 {
            self.position = (self.position + steps as f64 * SUBBEAT_BEATS).clamp(0.0, max_beats);
        }
    }

    /// Drag ended (or was cancelled): drop the remainder and hand back
    /// the final position for the host notification.
    pub fn end_drag(&mut self) -> f64 {
        self.carry = 0.0;
        self.position
    }
}

impl Default for Marker {
    fn default() -> Self {
        Self::new()
    }
}

/// Rate-limited scrub-seek dispatcher. The target is one atomically
/// replaced value: a later request supersedes an earlier in-flight one,
/// and the worker always reads the latest. Staleness is bounded by the
/// minimum dispatch interval; there is no cancellation token.
#[derive(Debug)]
pub struct SeekDriver {
    target: Arc<AtomicF64>,
    last_dispatch: Option<Instant>,
    pub min_interval: Duration,
}

impl SeekDriver {
    pub fn new() -> Self {
        Self {
            target: Arc::new(AtomicF64::new(0.0)),
            last_dispatch: None,
            min_interval: Duration::from_millis(300),
        }
    }

    /// Handle for the background worker that performs the seeks.
    pub fn target_handle(&self) -> Arc<AtomicF64> {
        Arc::clone(&self.target)
    }

    /// Record a new seek target. Returns true when the caller should
    /// dispatch a background seek now; otherwise the value is stored
    /// and picked up by the next dispatch.
    pub fn request(&mut self, beats: f64, now: Instant) -> bool {
        self.target.store(beats, Ordering::Release);
        if let Some(last) = self.last_dispatch {
            if now.duration_since(last) < self.min_interval {
                tracing::debug!(beats, "seek rate-limited, target updated in place");
                return false;
            }
        }
        self.last_dispatch = Some(now);
        true
    }

    /// Latest requested target, read on the worker side.
    pub fn take_target(&self) -> f64 {
        self.target.load(Ordering::Acquire)
    }
}

impl Default for SeekDriver {
    fn default() -> Self {
        Self::new()
    }
}
