//! Adaptive quality tiers.
//!
//! The controller samples frame statistics at a fixed interval and moves one
//! tier at a time: down when the frame rate falls well short of the target,
//! back up (never past the starting tier) after several comfortable checks.
//! Any change starts a cooldown during which no further change happens.

use serde::{Deserialize, Serialize};

use super::perf::FrameStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    Low,
    Medium,
    #[default]
    High,
    Ultra,
}

/// Settings bundled with a tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualitySettings {
    pub max_particles: usize,
    pub threshold: f32,
    /// Box blur radius in pixels; 0 disables blur.
    pub blur: u32,
    /// Field sample spacing in pixels.
    pub stride: u32,
    /// Minimum time between rendered frames.
    pub target_frame_ms: f32,
}

impl QualityLevel {
    pub const ALL: [QualityLevel; 4] = [
        QualityLevel::Low,
        QualityLevel::Medium,
        QualityLevel::High,
        QualityLevel::Ultra,
    ];

    pub fn settings(self) -> QualitySettings {
        match self {
            QualityLevel::Low => QualitySettings {
                max_particles: 120,
                threshold: 1.1,
                blur: 0,
                stride: 4,
                target_frame_ms: 1000.0 / 30.0,
            },
            QualityLevel::Medium => QualitySettings {
                max_particles: 220,
                threshold: 1.0,
                blur: 0,
                stride: 3,
                target_frame_ms: 1000.0 / 60.0,
            },
            QualityLevel::High => QualitySettings {
                max_particles: 350,
                threshold: 0.9,
                blur: 1,
                stride: 2,
                target_frame_ms: 1000.0 / 60.0,
            },
            QualityLevel::Ultra => QualitySettings {
                max_particles: 500,
                threshold: 0.85,
                blur: 2,
                stride: 1,
                target_frame_ms: 1000.0 / 60.0,
            },
        }
    }

    pub fn lower(self) -> Option<QualityLevel> {
        match self {
            QualityLevel::Low => None,
            QualityLevel::Medium => Some(QualityLevel::Low),
            QualityLevel::High => Some(QualityLevel::Medium),
            QualityLevel::Ultra => Some(QualityLevel::High),
        }
    }

    pub fn higher(self) -> Option<QualityLevel> {
        match self {
            QualityLevel::Low => Some(QualityLevel::Medium),
            QualityLevel::Medium => Some(QualityLevel::High),
            QualityLevel::High => Some(QualityLevel::Ultra),
            QualityLevel::Ultra => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            QualityLevel::Low => "low",
            QualityLevel::Medium => "medium",
            QualityLevel::High => "high",
            QualityLevel::Ultra => "ultra",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityConfig {
    pub adaptive: bool,
    /// Starting tier, and the ceiling for upgrades.
    pub initial: QualityLevel,
    pub target_fps: f32,
    pub check_interval_ms: f64,
    pub cooldown_ms: f64,
    /// Downgrade when fps < target_fps * downgrade_ratio.
    pub downgrade_ratio: f32,
    /// A check is comfortable when fps >= target_fps * upgrade_ratio.
    pub upgrade_ratio: f32,
    /// Consecutive comfortable checks needed to upgrade.
    pub upgrade_checks: u32,
    /// Downgrade when more than this share of frames ran long.
    pub max_dropped_ratio: f32,
    /// Frame intervals required before any decision.
    pub min_samples: usize,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            adaptive: true,
            initial: QualityLevel::High,
            target_fps: 60.0,
            check_interval_ms: 1000.0,
            cooldown_ms: 3000.0,
            downgrade_ratio: 0.6,
            upgrade_ratio: 0.95,
            upgrade_checks: 3,
            max_dropped_ratio: 0.5,
            min_samples: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityChange {
    pub from: QualityLevel,
    pub to: QualityLevel,
    pub at_ms: f64,
    pub fps: f32,
}

#[derive(Debug, Clone)]
pub struct QualityController {
    config: QualityConfig,
    level: QualityLevel,
    last_check_ms: Option<f64>,
    last_change_ms: Option<f64>,
    comfortable_checks: u32,
}

impl QualityController {
    pub fn new(config: QualityConfig) -> Self {
        Self {
            level: config.initial,
            config,
            last_check_ms: None,
            last_change_ms: None,
            comfortable_checks: 0,
        }
    }

    pub fn level(&self) -> QualityLevel {
        self.level
    }

    pub fn settings(&self) -> QualitySettings {
        self.level.settings()
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Returns true when the active tier changed.
    pub fn set_config(&mut self, config: QualityConfig) -> bool {
        let before = self.level;
        if config.initial != self.config.initial || !config.adaptive {
            self.level = config.initial;
        } else if self.level > config.initial {
            self.level = config.initial;
        }
        self.config = config;
        self.reset_timers();
        before != self.level
    }

    /// Restart the check schedule, e.g. after the page becomes visible again.
    pub fn reset_timers(&mut self) {
        self.last_check_ms = None;
        self.comfortable_checks = 0;
    }

    /// Back to the starting tier with fresh timers.
    pub fn reset(&mut self) {
        self.level = self.config.initial;
        self.last_change_ms = None;
        self.reset_timers();
    }

    /// Feed the latest statistics; returns a change when the tier moved.
    pub fn observe(&mut self, now_ms: f64, stats: &FrameStats) -> Option<QualityChange> {
        if !self.config.adaptive {
            return None;
        }
        let Some(last) = self.last_check_ms else {
            self.last_check_ms = Some(now_ms);
            return None;
        };
        if now_ms - last < self.config.check_interval_ms {
            return None;
        }
        self.last_check_ms = Some(now_ms);
        if stats.samples < self.config.min_samples {
            return None;
        }

        let target = self.config.target_fps;
        let struggling = stats.fps < target * self.config.downgrade_ratio
            || stats.dropped_ratio > self.config.max_dropped_ratio;
        let comfortable = stats.fps >= target * self.config.upgrade_ratio
            && stats.dropped_ratio <= self.config.max_dropped_ratio * 0.5;
        if comfortable {
            self.comfortable_checks += 1;
        } else {
            self.comfortable_checks = 0;
        }

        let cooling = self
            .last_change_ms
            .is_some_and(|t| now_ms - t < self.config.cooldown_ms);
        if cooling {
            return None;
        }

        if struggling {
            let lower = self.level.lower()?;
            return Some(self.change_to(lower, now_ms, stats.fps));
        }
        if self.comfortable_checks >= self.config.upgrade_checks.max(1) && self.level < self.config.initial {
            let higher = self.level.higher()?;
            return Some(self.change_to(higher, now_ms, stats.fps));
        }
        None
    }

    fn change_to(&mut self, level: QualityLevel, now_ms: f64, fps: f32) -> QualityChange {
        let change = QualityChange {
            from: self.level,
            to: level,
            at_ms: now_ms,
            fps,
        };
        self.level = level;
        self.last_change_ms = Some(now_ms);
        self.comfortable_checks = 0;
        log::info!(
            "quality: {} -> {} at {:.1} fps",
            change.from.name(),
            change.to.name(),
            fps
        );
        change
    }
}

impl Default for QualityController {
    fn default() -> Self {
        Self::new(QualityConfig::default())
    }
}
