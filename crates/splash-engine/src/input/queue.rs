use std::collections::VecDeque;

/// Pointer events the host forwards between frames.
/// Coordinates are surface pixels; `t` is the host timestamp in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// The cursor or touch point moved.
    PointerMove { x: f32, y: f32, t: f64 },
    /// A click/touch began.
    PointerDown { x: f32, y: f32, t: f64 },
    /// A click/touch ended.
    PointerUp { x: f32, y: f32, t: f64 },
    /// The pointer left the surface.
    PointerLeave { t: f64 },
}

impl InputEvent {
    pub fn timestamp(&self) -> f64 {
        match *self {
            InputEvent::PointerMove { t, .. }
            | InputEvent::PointerDown { t, .. }
            | InputEvent::PointerUp { t, .. }
            | InputEvent::PointerLeave { t } => t,
        }
    }

    fn is_move(&self) -> bool {
        matches!(self, InputEvent::PointerMove { .. })
    }
}

/// A bounded queue of pointer events.
/// The host pushes events as they arrive; the engine drains them once per frame.
/// When full, the oldest pending move is dropped; presses and releases are kept.
pub struct InputQueue {
    events: VecDeque<InputEvent>,
    limit: usize,
    dropped: u64,
}

impl InputQueue {
    pub const DEFAULT_LIMIT: usize = 256;

    pub fn new() -> Self {
        Self::with_limit(Self::DEFAULT_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(32),
            limit: limit.max(1),
            dropped: 0,
        }
    }

    pub fn push(&mut self, event: InputEvent) {
        if self.events.len() >= self.limit {
            let victim = self
                .events
                .iter()
                .position(InputEvent::is_move)
                .unwrap_or(0);
            self.events.remove(victim);
            self.dropped += 1;
        }
        self.events.push_back(event);
    }

    /// Drain all pending events in arrival order.
    pub fn drain(&mut self) -> impl Iterator<Item = InputEvent> + '_ {
        self.events.drain(..)
    }

    /// Iterate over pending events without consuming them.
    pub fn iter(&self) -> impl Iterator<Item = &InputEvent> {
        self.events.iter()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Events discarded because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}
