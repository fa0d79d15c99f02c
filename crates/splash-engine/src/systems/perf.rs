//! Frame-interval statistics over a rolling window.

/// Fixed-size rolling window of samples.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    samples: Vec<T>,
    capacity: usize,
    index: usize,
}

impl<T: Copy> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            index: 0,
        }
    }

    pub fn push(&mut self, sample: T) {
        if self.samples.len() < self.capacity {
            self.samples.push(sample);
        } else {
            self.samples[self.index] = sample;
        }
        self.index = (self.index + 1) % self.capacity;
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.index = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.samples.iter()
    }
}

impl RingBuffer<f64> {
    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    pub fn min_max(&self) -> (f64, f64) {
        self.samples
            .iter()
            .fold(None, |acc: Option<(f64, f64)>, &s| match acc {
                None => Some((s, s)),
                Some((lo, hi)) => Some((lo.min(s), hi.max(s))),
            })
            .unwrap_or((0.0, 0.0))
    }
}

/// Summary of recent frame pacing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    pub samples: usize,
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub fps: f32,
    /// Share of intervals longer than 1.5 target frames.
    pub dropped_ratio: f32,
}

/// Records host frame timestamps and derives FPS from the intervals between them.
#[derive(Debug, Clone)]
pub struct PerformanceMonitor {
    intervals: RingBuffer<f64>,
    last_frame_ms: Option<f64>,
    target_ms: f64,
    frames: u64,
}

impl PerformanceMonitor {
    pub const DEFAULT_WINDOW: usize = 60;

    pub fn new(window: usize, target_fps: f32) -> Self {
        Self {
            intervals: RingBuffer::new(window),
            last_frame_ms: None,
            target_ms: Self::target_ms(target_fps),
            frames: 0,
        }
    }

    fn target_ms(target_fps: f32) -> f64 {
        1000.0 / target_fps.clamp(1.0, 1000.0) as f64
    }

    pub fn set_target_fps(&mut self, target_fps: f32) {
        self.target_ms = Self::target_ms(target_fps);
    }

    pub fn record_frame(&mut self, now_ms: f64) {
        if let Some(last) = self.last_frame_ms {
            let interval = now_ms - last;
            if interval > 0.0 && interval.is_finite() {
                self.intervals.push(interval);
            }
        }
        if self.last_frame_ms.map_or(true, |last| now_ms > last) {
            self.last_frame_ms = Some(now_ms);
        }
        self.frames += 1;
    }

    pub fn stats(&self) -> FrameStats {
        if self.intervals.is_empty() {
            return FrameStats::default();
        }
        let avg_ms = self.intervals.average();
        let (min_ms, max_ms) = self.intervals.min_max();
        let slow = self
            .intervals
            .iter()
            .filter(|&&i| i > self.target_ms * 1.5)
            .count();
        FrameStats {
            samples: self.intervals.len(),
            avg_ms,
            min_ms,
            max_ms,
            fps: if avg_ms > 0.0 { (1000.0 / avg_ms) as f32 } else { 0.0 },
            dropped_ratio: slow as f32 / self.intervals.len() as f32,
        }
    }

    pub fn fps(&self) -> f32 {
        self.stats().fps
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Forget all history, e.g. after the page was hidden.
    pub fn reset(&mut self) {
        self.intervals.clear();
        self.last_frame_ms = None;
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WINDOW, 60.0)
    }
}
