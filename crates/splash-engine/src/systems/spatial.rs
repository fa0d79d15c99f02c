//! Uniform grid over the surface for neighbor and region queries.
//!
//! Rebuilt from the frame snapshot every frame. Cells are a dense row-major
//! array sized to the surface; positions outside the surface are clamped into
//! the border cells, so every particle is indexed exactly once.

use glam::Vec2;

use crate::components::particle::ParticleSnapshot;
use crate::core::math::Rect;

#[derive(Debug, Clone, Copy, PartialEq)]
struct GridEntry {
    index: u32,
    position: Vec2,
    cutoff: f32,
}

#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f32,
    inv_cell_size: f32,
    width: u32,
    height: u32,
    cols: i32,
    rows: i32,
    cells: Vec<Vec<GridEntry>>,
    /// Cells that received entries since the last rebuild.
    occupied: Vec<usize>,
    /// Largest influence cutoff among indexed particles.
    max_cutoff: f32,
    len: usize,
}

impl SpatialGrid {
    pub const MIN_CELL_SIZE: f32 = 4.0;

    pub fn new(width: u32, height: u32, cell_size: f32) -> Self {
        let mut grid = Self {
            cell_size: 0.0,
            inv_cell_size: 0.0,
            width,
            height,
            cols: 1,
            rows: 1,
            cells: Vec::new(),
            occupied: Vec::new(),
            max_cutoff: 0.0,
            len: 0,
        };
        grid.reshape(width, height, cell_size);
        grid
    }

    fn reshape(&mut self, width: u32, height: u32, cell_size: f32) {
        let cell_size = cell_size.max(Self::MIN_CELL_SIZE);
        self.cell_size = cell_size;
        self.inv_cell_size = 1.0 / cell_size;
        self.width = width;
        self.height = height;
        self.cols = ((width as f32 / cell_size).ceil() as i32).max(1);
        self.rows = ((height as f32 / cell_size).ceil() as i32).max(1);
        self.cells = vec![Vec::new(); (self.cols * self.rows) as usize];
        self.occupied.clear();
        self.max_cutoff = 0.0;
        self.len = 0;
    }

    /// Resize to a new surface. Clears the index.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.reshape(width, height, self.cell_size);
    }

    pub fn set_cell_size(&mut self, cell_size: f32) {
        if (cell_size.max(Self::MIN_CELL_SIZE) - self.cell_size).abs() > f32::EPSILON {
            self.reshape(self.width, self.height, cell_size);
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn dimensions(&self) -> (i32, i32) {
        (self.cols, self.rows)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Cell containing `p`, clamped to the grid.
    pub fn cell_of(&self, p: Vec2) -> (i32, i32) {
        // `as i32` saturates and maps NaN to 0.
        let cx = ((p.x * self.inv_cell_size).floor() as i32).clamp(0, self.cols - 1);
        let cy = ((p.y * self.inv_cell_size).floor() as i32).clamp(0, self.rows - 1);
        (cx, cy)
    }

    /// Cells needed on each side to cover `radius`.
    pub fn reach_for(&self, radius: f32) -> i32 {
        if !(radius > 0.0) {
            return 0;
        }
        (radius * self.inv_cell_size).ceil().min(i32::MAX as f32) as i32
    }

    fn cell_index(&self, cx: i32, cy: i32) -> usize {
        (cy * self.cols + cx) as usize
    }

    /// Replace the index with the given snapshot. Entry `i` refers to `snapshots[i]`.
    pub fn rebuild(&mut self, snapshots: &[ParticleSnapshot]) {
        for &c in &self.occupied {
            self.cells[c].clear();
        }
        self.occupied.clear();
        self.max_cutoff = 0.0;

        for (i, s) in snapshots.iter().enumerate() {
            let position = s.position();
            let (cx, cy) = self.cell_of(position);
            let c = self.cell_index(cx, cy);
            if self.cells[c].is_empty() {
                self.occupied.push(c);
            }
            self.cells[c].push(GridEntry {
                index: i as u32,
                position,
                cutoff: s.cutoff,
            });
            self.max_cutoff = self.max_cutoff.max(s.cutoff);
        }
        self.len = snapshots.len();
    }

    fn cell_range(&self, center: (i32, i32), reach: i32) -> (i32, i32, i32, i32) {
        (
            center.0.saturating_sub(reach).max(0),
            center.1.saturating_sub(reach).max(0),
            center.0.saturating_add(reach).min(self.cols - 1),
            center.1.saturating_add(reach).min(self.rows - 1),
        )
    }

    /// Indices of particles within `radius` of `point`, written into `out`.
    pub fn query_near_into(&self, point: Vec2, radius: f32, out: &mut Vec<u32>) {
        out.clear();
        if !(radius >= 0.0) || !point.is_finite() {
            return;
        }
        let r2 = radius * radius;
        let (x0, y0, x1, y1) = self.cell_range(self.cell_of(point), self.reach_for(radius));
        for cy in y0..=y1 {
            for cx in x0..=x1 {
                for e in &self.cells[self.cell_index(cx, cy)] {
                    if e.position.distance_squared(point) <= r2 {
                        out.push(e.index);
                    }
                }
            }
        }
    }

    pub fn query_near(&self, point: Vec2, radius: f32) -> Vec<u32> {
        let mut out = Vec::new();
        self.query_near_into(point, radius, &mut out);
        out
    }

    /// Indices of particles whose influence disk touches `rect`.
    pub fn query_region_into(&self, rect: &Rect, out: &mut Vec<u32>) {
        out.clear();
        if !rect.is_finite() {
            return;
        }
        let grown = rect.expand(self.max_cutoff);
        let (x0, y0) = self.cell_of(grown.min);
        let (x1, y1) = self.cell_of(grown.max);
        for cy in y0..=y1 {
            for cx in x0..=x1 {
                for e in &self.cells[self.cell_index(cx, cy)] {
                    if rect.distance_sq_to(e.position) <= e.cutoff * e.cutoff {
                        out.push(e.index);
                    }
                }
            }
        }
    }

    pub fn query_region(&self, rect: &Rect) -> Vec<u32> {
        let mut out = Vec::new();
        self.query_region_into(rect, &mut out);
        out
    }

    /// Every indexed particle in cells within `reach` of `cell`, unfiltered.
    pub fn neighborhood_into(&self, cell: (i32, i32), reach: i32, out: &mut Vec<u32>) {
        out.clear();
        let (x0, y0, x1, y1) = self.cell_range(cell, reach.max(0));
        for cy in y0..=y1 {
            for cx in x0..=x1 {
                out.extend(self.cells[self.cell_index(cx, cy)].iter().map(|e| e.index));
            }
        }
    }
}
