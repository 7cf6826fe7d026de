//! Height/velocity ripple simulation on a square grid.
//!
//! Cells are addressed by `(column, row)` and the grid maps to UV space with
//! cell centers at `(i + 0.5) / size`. Edges clamp, so the mean height is
//! conserved and only the ripples themselves decay.

use glam::{Vec2, Vec3};
use std::f32::consts::PI;

/// Gain applied to the discrete Laplacian each step
pub const WAVE_GAIN: f32 = 0.5;
/// Velocity kept per step
pub const VELOCITY_DAMPING: f32 = 0.995;

#[derive(Debug, Clone, PartialEq)]
pub struct RippleField {
    size: usize,
    height: Vec<f32>,
    velocity: Vec<f32>,
    // Written during `step`, then swapped in
    next_height: Vec<f32>,
    next_velocity: Vec<f32>,
}

impl RippleField {
    pub fn new(size: usize) -> Self {
        let size = size.max(2);
        let cells = size * size;
        Self {
            size,
            height: vec![0.0; cells],
            velocity: vec![0.0; cells],
            next_height: vec![0.0; cells],
            next_velocity: vec![0.0; cells],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn heights(&self) -> &[f32] {
        &self.height
    }

    fn index(&self, column: usize, row: usize) -> usize {
        row * self.size + column
    }

    /// Height with clamp-to-edge addressing
    pub fn height_at(&self, column: isize, row: isize) -> f32 {
        let last = self.size as isize - 1;
        let column = column.clamp(0, last) as usize;
        let row = row.clamp(0, last) as usize;
        self.height[self.index(column, row)]
    }

    pub fn velocity_at(&self, column: usize, row: usize) -> f32 {
        self.velocity[self.index(column, row)]
    }

    fn cell_uv(&self, column: usize, row: usize) -> Vec2 {
        (Vec2::new(column as f32, row as f32) + 0.5) / self.size as f32
    }

    /// Add a smooth cosine bump centered at `center` (UV space)
    pub fn drop(&mut self, center: Vec2, radius: f32, strength: f32) {
        if radius <= 0.0 {
            return;
        }
        for row in 0..self.size {
            for column in 0..self.size {
                let distance = self.cell_uv(column, row).distance(center);
                let bump = (1.0 - distance / radius).max(0.0);
                let bump = 0.5 - (bump * PI).cos() * 0.5;
                let index = self.index(column, row);
                self.height[index] += bump * strength;
            }
        }
    }

    /// Advance the wave equation by one step of `delta` seconds
    pub fn step(&mut self, delta: f32) {
        for row in 0..self.size {
            for column in 0..self.size {
                let (c, r) = (column as isize, row as isize);
                let center = self.height_at(c, r);
                let laplacian = self.height_at(c, r + 1)
                    + self.height_at(c, r - 1)
                    + self.height_at(c - 1, r)
                    + self.height_at(c + 1, r)
                    - 4.0 * center;

                let index = self.index(column, row);
                let velocity = (self.velocity[index] + laplacian * WAVE_GAIN) * VELOCITY_DAMPING;
                self.next_velocity[index] = velocity;
                self.next_height[index] = center + velocity * delta;
            }
        }
        std::mem::swap(&mut self.height, &mut self.next_height);
        std::mem::swap(&mut self.velocity, &mut self.next_velocity);
    }

    /// Surface normal (y up) from the neighbouring heights
    pub fn normal_at(&self, column: usize, row: usize) -> Vec3 {
        let (c, r) = (column as isize, row as isize);
        let texel = 1.0 / self.size as f32;
        let left = self.height_at(c - 1, r);
        let right = self.height_at(c + 1, r);
        let top = self.height_at(c, r + 1);
        let bottom = self.height_at(c, r - 1);
        Vec3::new(left - right, 2.0 * texel, bottom - top).normalize()
    }

    /// Bilinear height lookup in UV space
    pub fn sample(&self, uv: Vec2) -> f32 {
        let position = uv * self.size as f32 - 0.5;
        let base = position.floor();
        let t = position - base;
        let (c, r) = (base.x as isize, base.y as isize);
        let top = self.height_at(c, r) * (1.0 - t.x) + self.height_at(c + 1, r) * t.x;
        let bottom = self.height_at(c, r + 1) * (1.0 - t.x) + self.height_at(c + 1, r + 1) * t.x;
        top * (1.0 - t.y) + bottom * t.y
    }

    /// Ripple energy: squared velocities plus squared deviation from the mean height
    pub fn energy(&self) -> f32 {
        let mean = self.height.iter().sum::<f32>() / self.height.len() as f32;
        let potential: f32 = self.height.iter().map(|h| (h - mean).powi(2)).sum();
        let kinetic: f32 = self.velocity.iter().map(|v| v * v).sum();
        potential + kinetic
    }

    pub fn clear(&mut self) {
        self.height.fill(0.0);
        self.velocity.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_peaks_at_center() {
        let mut field = RippleField::new(33);
        field.drop(Vec2::splat(0.5), 0.2, 0.5);
        assert!((field.height_at(16, 16) - 0.5).abs() < 1e-6);
        assert_eq!(field.height_at(0, 0), 0.0);
        assert!(field.heights().iter().all(|h| *h <= 0.5 + 1e-6));
    }

    #[test]
    fn flat_field_has_upward_normals() {
        let field = RippleField::new(8);
        assert_eq!(field.normal_at(3, 4), Vec3::Y);
        assert_eq!(field.energy(), 0.0);
    }

    #[test]
    fn flat_field_stays_flat() {
        let mut field = RippleField::new(8);
        field.step(0.016);
        assert!(field.heights().iter().all(|h| *h == 0.0));
    }

    #[test]
    fn ripple_spreads_to_neighbours() {
        let mut field = RippleField::new(33);
        field.drop(Vec2::splat(0.5), 0.05, 1.0);
        assert_eq!(field.height_at(20, 16), 0.0);

        field.step(0.016);
        assert!(field.velocity_at(16, 16) < 0.0);
        for _ in 0..20 {
            field.step(0.016);
        }
        assert_ne!(field.height_at(20, 16), 0.0);
    }

    #[test]
    fn energy_decays_without_new_drops() {
        let mut field = RippleField::new(32);
        field.drop(Vec2::new(0.3, 0.6), 0.1, 0.8);
        let initial = field.energy();
        for _ in 0..3000 {
            field.step(0.016);
        }
        assert!(field.energy() < initial * 0.01, "energy {} of {initial}", field.energy());
    }

    #[test]
    fn slope_tilts_normal_downhill() {
        let mut field = RippleField::new(16);
        field.drop(Vec2::new(0.0, 0.5), 0.6, 1.0);
        // Heights fall off towards +x, so the normal leans towards +x
        assert!(field.normal_at(6, 8).x > 0.0);
    }

    #[test]
    fn sample_matches_cell_centers() {
        let mut field = RippleField::new(9);
        field.drop(Vec2::splat(0.5), 0.4, 1.0);
        let uv = (Vec2::new(4.0, 4.0) + 0.5) / 9.0;
        assert!((field.sample(uv) - field.height_at(4, 4)).abs() < 1e-5);
    }
}
