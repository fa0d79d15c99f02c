//! Dirty-region tracking.
//!
//! Systems report the screen areas their particles touched this frame; the
//! tracker keeps a small set of clamped rectangles, merges overlapping ones
//! when the union wastes little area, and caps the set size by folding the
//! least important region into its closest neighbor. Before rendering the set
//! is tidied once more and, when it covers most of the surface, replaced by a
//! single full redraw.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::core::math::Rect;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirtyRegionConfig {
    /// Disabled means every frame is a full redraw.
    pub enabled: bool,
    /// Upper bound on tracked regions, at least 1.
    pub max_regions: usize,
    /// Merge two regions when `area(union) <= merge_threshold * (area(a) + area(b))`.
    pub merge_threshold: f32,
    /// Regions are grown to at least this many pixels per side.
    pub min_size: f32,
    /// Regions closer than this (px) are candidates for the final merge pass.
    pub merge_distance: f32,
    /// Fraction of the surface above which a full redraw replaces regions.
    pub full_redraw_ratio: f32,
    /// Interpolated rectangles per moving particle before falling back to the swept box.
    pub max_path_steps: u32,
}

impl Default for DirtyRegionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_regions: 24,
            merge_threshold: 1.3,
            min_size: 16.0,
            merge_distance: 8.0,
            full_redraw_ratio: 0.75,
            max_path_steps: 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirtyRegion {
    pub rect: Rect,
    pub priority: f32,
    /// Host timestamp (ms) of the latest mark folded into this region.
    pub updated_at: f64,
}

impl DirtyRegion {
    fn absorb(&mut self, other: &DirtyRegion) {
        self.rect = self.rect.union(&other.rect);
        self.priority = self.priority.max(other.priority);
        self.updated_at = self.updated_at.max(other.updated_at);
    }
}

/// What the renderer should redraw this frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RedrawPlan {
    /// Nothing changed.
    #[default]
    Idle,
    /// Redraw the whole surface.
    Full,
    /// Redraw only these pixel-aligned rectangles.
    Regions(Vec<Rect>),
}

impl RedrawPlan {
    pub fn is_idle(&self) -> bool {
        matches!(self, RedrawPlan::Idle)
    }

    pub fn is_full(&self) -> bool {
        matches!(self, RedrawPlan::Full)
    }

    /// Rectangles to redraw, with `Full` expanded to `bounds`.
    pub fn rects(&self, bounds: Rect) -> Vec<Rect> {
        match self {
            RedrawPlan::Idle => Vec::new(),
            RedrawPlan::Full => vec![bounds],
            RedrawPlan::Regions(rects) => rects.clone(),
        }
    }
}

fn worth_merging(a: &Rect, b: &Rect, threshold: f32) -> bool {
    a.union(b).area() <= threshold * (a.area() + b.area())
}

#[derive(Debug, Clone)]
pub struct DirtyRegionTracker {
    config: DirtyRegionConfig,
    bounds: Rect,
    regions: Vec<DirtyRegion>,
    full: bool,
    now_ms: f64,
}

impl DirtyRegionTracker {
    pub fn new(config: DirtyRegionConfig, width: u32, height: u32) -> Self {
        Self {
            config,
            bounds: Rect::from_size(width as f32, height as f32),
            regions: Vec::new(),
            // Nothing has been drawn yet.
            full: true,
            now_ms: 0.0,
        }
    }

    pub fn config(&self) -> &DirtyRegionConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: DirtyRegionConfig) {
        self.config = config;
        self.enforce_capacity();
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// New surface size; everything must be redrawn.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.bounds = Rect::from_size(width as f32, height as f32);
        self.regions.clear();
        self.full = true;
    }

    /// Timestamp stamped onto subsequent marks.
    pub fn set_time(&mut self, now_ms: f64) {
        self.now_ms = now_ms;
    }

    pub fn mark_full(&mut self) {
        self.full = true;
        self.regions.clear();
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    pub fn regions(&self) -> &[DirtyRegion] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty() && !self.full
    }

    /// Record that `rect` must be redrawn. Off-surface and non-finite rects are ignored.
    pub fn mark_dirty(&mut self, rect: Rect, priority: f32) {
        if self.full || !rect.is_finite() {
            return;
        }
        let Some(clamped) = rect.intersection(&self.bounds) else {
            return;
        };
        let Some(rect) = clamped
            .with_min_size(self.config.min_size.max(1.0))
            .intersection(&self.bounds)
        else {
            return;
        };
        let region = DirtyRegion {
            rect,
            priority: if priority.is_finite() { priority } else { 0.0 },
            updated_at: self.now_ms,
        };
        self.insert(region);
    }

    /// Mark the old and new footprints of a moving disk, plus the path between
    /// them when it moved further than its own radius.
    pub fn mark_moving_particle_dirty(&mut self, previous: Vec2, current: Vec2, radius: f32, priority: f32) {
        if !(radius > 0.0) || !previous.is_finite() || !current.is_finite() {
            return;
        }
        let old = Rect::around(previous, radius);
        let new = Rect::around(current, radius);
        let distance = previous.distance(current);
        if distance <= radius {
            self.mark_dirty(old.union(&new), priority);
            return;
        }
        let steps = (distance / radius).ceil();
        if steps > self.config.max_path_steps.max(1) as f32 {
            // Too many stamps; the swept box covers the whole path.
            self.mark_dirty(old.union(&new), priority);
            return;
        }
        let steps = steps as u32;
        self.mark_dirty(old, priority);
        for s in 1..steps {
            let t = s as f32 / steps as f32;
            self.mark_dirty(Rect::around(previous.lerp(current, t), radius), priority);
        }
        self.mark_dirty(new, priority);
    }

    fn insert(&mut self, mut region: DirtyRegion) {
        let threshold = self.config.merge_threshold.max(1.0);
        loop {
            let mut merged = false;
            let mut i = 0;
            while i < self.regions.len() {
                let other = self.regions[i];
                if other.rect.intersects(&region.rect)
                    && worth_merging(&other.rect, &region.rect, threshold)
                {
                    self.regions.swap_remove(i);
                    region.absorb(&other);
                    merged = true;
                } else {
                    i += 1;
                }
            }
            // A grown region may now overlap ones it skipped.
            if !merged {
                break;
            }
        }
        self.regions.push(region);
        self.enforce_capacity();
    }

    /// Fold lowest-priority regions (oldest on ties) into their cheapest neighbor until under the cap.
    fn enforce_capacity(&mut self) {
        let cap = self.config.max_regions.max(1);
        while self.regions.len() > cap {
            let Some(victim_at) = self
                .regions
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    a.priority
                        .total_cmp(&b.priority)
                        .then(a.updated_at.total_cmp(&b.updated_at))
                })
                .map(|(i, _)| i)
            else {
                return;
            };
            let victim = self.regions.swap_remove(victim_at);
            let Some(host) = self
                .regions
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    let ga = a.rect.union(&victim.rect).area() - a.rect.area();
                    let gb = b.rect.union(&victim.rect).area() - b.rect.area();
                    ga.total_cmp(&gb)
                })
                .map(|(i, _)| i)
            else {
                self.regions.push(victim);
                return;
            };
            self.regions[host].absorb(&victim);
        }
    }

    fn total_area(&self) -> f32 {
        self.regions.iter().map(|r| r.rect.area()).sum()
    }

    /// Tidy the set and decide what to redraw. Does not clear the tracker.
    pub fn optimized_regions(&mut self) -> RedrawPlan {
        if self.full {
            return RedrawPlan::Full;
        }
        if self.regions.is_empty() {
            return RedrawPlan::Idle;
        }

        let threshold = self.config.merge_threshold.max(1.0);
        let distance = self.config.merge_distance.max(0.0);
        let mut changed = true;
        while changed {
            changed = false;
            'scan: for i in 0..self.regions.len() {
                for j in (i + 1)..self.regions.len() {
                    let (a, b) = (self.regions[i].rect, self.regions[j].rect);
                    if a.gap_to(&b) <= distance && worth_merging(&a, &b, threshold) {
                        let other = self.regions.swap_remove(j);
                        self.regions[i].absorb(&other);
                        changed = true;
                        break 'scan;
                    }
                }
            }
        }

        let surface = self.bounds.area();
        if surface <= 0.0 {
            return RedrawPlan::Idle;
        }
        if self.total_area() > self.config.full_redraw_ratio * surface {
            return RedrawPlan::Full;
        }
        let rects = self
            .regions
            .iter()
            .filter_map(|r| r.rect.snapped().intersection(&self.bounds))
            .collect::<Vec<_>>();
        if rects.is_empty() {
            RedrawPlan::Idle
        } else {
            RedrawPlan::Regions(rects)
        }
    }

    /// Drop all regions after a frame has been rendered.
    pub fn clear(&mut self) {
        self.regions.clear();
        self.full = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(max_regions: usize) -> DirtyRegionTracker {
        let mut t = DirtyRegionTracker::new(
            DirtyRegionConfig {
                max_regions,
                min_size: 4.0,
                ..DirtyRegionConfig::default()
            },
            400,
            300,
        );
        t.clear();
        t
    }

    #[test]
    fn starts_with_full_redraw() {
        let mut t = DirtyRegionTracker::new(DirtyRegionConfig::default(), 100, 100);
        assert_eq!(t.optimized_regions(), RedrawPlan::Full);
        t.clear();
        assert_eq!(t.optimized_regions(), RedrawPlan::Idle);
    }

    #[test]
    fn clamps_to_surface() {
        let mut t = tracker(8);
        t.mark_dirty(Rect::new(-50.0, -50.0, 10.0, 10.0), 1.0);
        let r = t.regions()[0].rect;
        assert!(r.min.x >= 0.0 && r.min.y >= 0.0);
        assert!(r.max.x <= 400.0 && r.max.y <= 300.0);
    }

    #[test]
    fn ignores_offscreen_and_non_finite() {
        let mut t = tracker(8);
        t.mark_dirty(Rect::new(500.0, 500.0, 600.0, 600.0), 1.0);
        t.mark_dirty(Rect::new(f32::NAN, 0.0, 10.0, 10.0), 1.0);
        assert_eq!(t.len(), 0);
    }

    #[test]
    fn enforces_min_size() {
        let mut t = tracker(8);
        t.mark_dirty(Rect::new(100.0, 100.0, 101.0, 101.0), 1.0);
        let r = t.regions()[0].rect;
        assert!(r.width() >= 4.0 && r.height() >= 4.0);
    }

    #[test]
    fn overlapping_regions_merge() {
        let mut t = tracker(8);
        t.mark_dirty(Rect::new(10.0, 10.0, 50.0, 50.0), 1.0);
        t.mark_dirty(Rect::new(20.0, 20.0, 60.0, 60.0), 1.0);
        assert_eq!(t.len(), 1);
        assert_eq!(t.regions()[0].rect, Rect::new(10.0, 10.0, 60.0, 60.0));
    }

    #[test]
    fn contained_region_merges() {
        let mut t = tracker(8);
        t.mark_dirty(Rect::new(10.0, 10.0, 100.0, 100.0), 1.0);
        t.mark_dirty(Rect::new(20.0, 20.0, 30.0, 30.0), 5.0);
        assert_eq!(t.len(), 1);
        assert_eq!(t.regions()[0].priority, 5.0);
    }

    #[test]
    fn wasteful_overlap_stays_split() {
        let mut t = tracker(8);
        // Thin crossing bars: the union box is far bigger than both bars.
        t.mark_dirty(Rect::new(0.0, 100.0, 400.0, 110.0), 1.0);
        t.mark_dirty(Rect::new(100.0, 0.0, 110.0, 300.0), 1.0);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn cap_is_enforced_and_covers_victims() {
        let mut t = tracker(3);
        let rects = [
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Rect::new(100.0, 0.0, 110.0, 10.0),
            Rect::new(200.0, 0.0, 210.0, 10.0),
            Rect::new(300.0, 0.0, 310.0, 10.0),
            Rect::new(0.0, 200.0, 10.0, 210.0),
        ];
        for (i, r) in rects.iter().enumerate() {
            t.mark_dirty(*r, i as f32);
            assert!(t.len() <= 3);
        }
        for r in &rects {
            assert!(
                t.regions().iter().any(|d| d.rect.union(r) == d.rect),
                "{r:?} lost after eviction"
            );
        }
    }

    #[test]
    fn eviction_prefers_low_priority() {
        let mut t = tracker(2);
        t.mark_dirty(Rect::new(0.0, 0.0, 10.0, 10.0), 9.0);
        t.mark_dirty(Rect::new(200.0, 200.0, 210.0, 210.0), 8.0);
        t.mark_dirty(Rect::new(20.0, 0.0, 30.0, 10.0), 0.5);
        // The low-priority rect was folded into its nearest neighbor.
        assert_eq!(t.len(), 2);
        assert!(t
            .regions()
            .iter()
            .any(|d| d.rect == Rect::new(0.0, 0.0, 30.0, 10.0) && d.priority == 9.0));
    }

    #[test]
    fn moving_particle_covers_path() {
        let mut t = tracker(64);
        t.mark_moving_particle_dirty(Vec2::new(20.0, 150.0), Vec2::new(80.0, 150.0), 10.0, 1.0);
        for x in (20..=80).step_by(5) {
            let p = Vec2::new(x as f32, 150.0);
            assert!(
                t.regions().iter().any(|d| d.rect.contains(p)),
                "gap at x = {x}"
            );
        }
    }

    #[test]
    fn long_jump_uses_swept_box() {
        let mut t = tracker(64);
        t.mark_moving_particle_dirty(Vec2::new(10.0, 10.0), Vec2::new(390.0, 290.0), 2.0, 1.0);
        assert_eq!(t.len(), 1);
        assert!(t.regions()[0].rect.contains(Vec2::new(200.0, 150.0)));
    }

    #[test]
    fn mostly_dirty_becomes_full() {
        let mut t = tracker(8);
        t.mark_dirty(Rect::new(0.0, 0.0, 400.0, 250.0), 1.0);
        assert_eq!(t.optimized_regions(), RedrawPlan::Full);
    }

    #[test]
    fn nearby_regions_merge_before_render() {
        let mut t = tracker(8);
        t.mark_dirty(Rect::new(10.0, 10.0, 50.0, 50.0), 1.0);
        t.mark_dirty(Rect::new(52.0, 10.0, 90.0, 50.0), 1.0);
        assert_eq!(t.len(), 2);
        match t.optimized_regions() {
            RedrawPlan::Regions(rects) => assert_eq!(rects, vec![Rect::new(10.0, 10.0, 90.0, 50.0)]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn regions_are_pixel_aligned() {
        let mut t = tracker(8);
        t.mark_dirty(Rect::new(10.4, 10.6, 30.2, 30.9), 1.0);
        if let RedrawPlan::Regions(rects) = t.optimized_regions() {
            let r = rects[0];
            assert_eq!(r, r.snapped());
            assert!(r.min.x <= 10.4 && r.max.y >= 30.9);
        } else {
            panic!("expected regions");
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn region_count_bounded(
                marks in proptest::collection::vec(
                    (-50.0f32..450.0, -50.0f32..350.0, 1.0f32..80.0, 0.0f32..10.0),
                    1..120,
                ),
                cap in 1usize..12,
            ) {
                let mut t = tracker(cap);
                for (x, y, size, priority) in marks {
                    t.mark_dirty(Rect::new(x, y, x + size, y + size), priority);
                    prop_assert!(t.len() <= cap);
                    for d in t.regions() {
                        prop_assert!(d.rect.min.x >= 0.0 && d.rect.min.y >= 0.0);
                        prop_assert!(d.rect.max.x <= 400.0 && d.rect.max.y <= 300.0);
                    }
                }
            }
        }
    }
}
