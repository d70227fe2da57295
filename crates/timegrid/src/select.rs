use egui::{vec2, Pos2, Rect, Vec2};

/// Direction the viewport is being nudged in while drag-selecting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollDirection {
    Left,
    Right,
    Up,
    Down,
}

/// Small set of active scroll directions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScrollDirections(u8);

impl ScrollDirections {
    fn bit(direction: ScrollDirection) -> u8 {
        match direction {
            ScrollDirection::Left => 1 << 0,
            ScrollDirection::Right => 1 << 1,
            ScrollDirection::Up => 1 << 2,
            ScrollDirection::Down => 1 << 3,
        }
    }

    pub fn insert(&mut self, direction: ScrollDirection) {
        self.0 |= Self::bit(direction);
    }

    pub fn contains(&self, direction: ScrollDirection) -> bool {
        self.0 & Self::bit(direction) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Scroll state of the host view, in content coordinates.
#[derive(Clone, Copy, Debug)]
pub struct Viewport {
    pub offset: Vec2,
    pub size: Vec2,
    pub content: Vec2,
}

impl Viewport {
    pub fn visible_rect(&self) -> Rect {
        Rect::from_min_size(self.offset.to_pos2(), self.size)
    }
}

#[derive(Clone, Debug)]
enum Phase {
    Idle,
    /// Touch is down, hold timer running.
    Pending { origin: Pos2, elapsed: f32 },
    Selecting {
        origin: Pos2,
        rect: Rect,
        touch: Pos2,
        scroll: ScrollDirections,
        since_tick: f32,
    },
}

/// What the host should apply after feeding an event: the current
/// rubber-band rectangle (select the intersecting cells) and any
/// viewport scroll to perform.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SelectUpdate {
    pub rect: Option<Rect>,
    pub scroll_by: Vec2,
}

/// Rubber-band multi-select with edge-triggered auto-scroll. Timers are
/// driven by the host through `tick(dt)`; the engine owns no clocks.
#[derive(Clone, Debug)]
pub struct DragSelectController {
    phase: Phase,
    /// Hold time before the rubber band appears.
    pub hold_delay: f32,
    /// Distance from a viewport edge that triggers auto-scroll.
    pub edge_threshold: f32,
    /// Interval between auto-scroll steps.
    pub scroll_interval: f32,
    /// Side length of the seed rectangle shown when the hold fires.
    pub initial_size: f32,
}

impl DragSelectController {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            hold_delay: 0.5,
            edge_threshold: 100.0,
            scroll_interval: 0.3,
            initial_size: 90.0,
        }
    }

    /// True while the rubber band is up. Normal viewport scrolling must
    /// be disabled by the host for the duration to avoid gesture
    /// conflicts.
    pub fn is_selecting(&self) -> bool {
        matches!(self.phase, Phase::Selecting { .. })
    }

    pub fn touch_began(&mut self, pos: Pos2) {
        self.phase = Phase::Pending {
            origin: pos,
            elapsed: 0.0,
        };
    }

    /// Advance the hold timer and the auto-scroll clock. Returns an
    /// update when the rubber band appears or an auto-scroll step runs.
    pub fn tick(&mut self, dt: f32, viewport: &Viewport) -> Option<SelectUpdate> {
        match &mut self.phase {
            Phase::Idle => None,
            Phase::Pending { origin, elapsed } => {
                *elapsed += dt;
                if *elapsed < self.hold_delay {
                    return None;
                }
                // Hold fired: seed the rectangle around the press point.
                let origin = *origin - vec2(self.initial_size / 2.0, self.initial_size / 2.0);
                let rect =
                    Rect::from_min_size(origin, vec2(self.initial_size, self.initial_size));
                self.phase = Phase::Selecting {
                    origin,
                    rect,
                    touch: rect.max,
                    scroll: ScrollDirections::default(),
                    since_tick: 0.0,
                };
                Some(SelectUpdate {
                    rect: Some(rect),
                    scroll_by: Vec2::ZERO,
                })
            }
            Phase::Selecting {
                origin,
                rect,
                touch,
                scroll,
                since_tick,
            } => {
                if scroll.is_empty() {
                    return None;
                }
                *since_tick += dt;
                if *since_tick < self.scroll_interval {
                    return None;
                }
                *since_tick = 0.0;

                let mut step = Vec2::ZERO;
                if scroll.contains(ScrollDirection::Left) {
                    step.x -= self.edge_threshold;
                }
                if scroll.contains(ScrollDirection::Right) {
                    step.x += self.edge_threshold;
                }
                if scroll.contains(ScrollDirection::Up) {
                    step.y -= self.edge_threshold;
                }
                if scroll.contains(ScrollDirection::Down) {
                    step.y += self.edge_threshold;
                }
                // Clamp to the scrollable range so the step never
                // overshoots the content.
                let max_offset = (viewport.content - viewport.size).max(Vec2::ZERO);
                let target = (viewport.offset + step).clamp(Vec2::ZERO, max_offset);
                let applied = target - viewport.offset;

                // The touch stays put on screen, so in content space it
                // travels with the scroll; re-derive the rectangle.
                *touch += applied;
                *rect = Rect::from_two_pos(*origin, *touch);
                Some(SelectUpdate {
                    rect: Some(*rect),
                    scroll_by: applied,
                })
            }
        }
    }

    /// Feed a touch move. Before the hold fires this cancels the
    /// pending selection so the event falls through to normal handling;
    /// afterwards it grows the rectangle and updates the auto-scroll
    /// direction set.
    pub fn touch_moved(&mut self, pos: Pos2, viewport: &Viewport) -> Option<SelectUpdate> {
        match &mut self.phase {
            Phase::Idle => None,
            Phase::Pending { .. } => {
                self.phase = Phase::Idle;
                None
            }
            Phase::Selecting {
                origin,
                rect,
                touch,
                scroll,
                since_tick,
            } => {
                *touch = pos;
                *rect = Rect::from_two_pos(*origin, pos);

                let visible = viewport.visible_rect();
                let mut directions = ScrollDirections::default();
                if pos.y < visible.min.y + self.edge_threshold && viewport.offset.y > 0.0 {
                    directions.insert(ScrollDirection::Up);
                } else if pos.y > visible.max.y - self.edge_threshold
                    && viewport.offset.y + viewport.size.y < viewport.content.y
                {
                    directions.insert(ScrollDirection::Down);
                }
                if pos.x < visible.min.x + self.edge_threshold && viewport.offset.x > 0.0 {
                    directions.insert(ScrollDirection::Left);
                } else if pos.x > visible.max.x - self.edge_threshold
                    && viewport.offset.x + viewport.size.x < viewport.content.x
                {
                    directions.insert(ScrollDirection::Right);
                }
                if directions != *scroll {
                    // Fresh band entry (or direction change) restarts
                    // the scroll clock.
                    *since_tick = 0.0;
                }
                *scroll = directions;

                Some(SelectUpdate {
                    rect: Some(*rect),
                    scroll_by: Vec2::ZERO,
                })
            }
        }
    }

    /// Gesture ended or was cancelled: drop the rectangle and stop any
    /// auto-scroll. Returns true if a rubber-band selection was active,
    /// so the host knows to re-enable normal scrolling.
    pub fn end(&mut self) -> bool {
        let was_selecting = self.is_selecting();
        self.phase = Phase::Idle;
        was_selecting
    }
}

impl Default for DragSelectController {
    fn default() -> Self {
        Self::new()
    }
}
