// src/demo.rs

//! A small concrete visualization: a marker bouncing over a grid.
//!
//! The grid is the steady layer and is only repainted after `clear()` or a
//! platform loss. The marker is the dynamic layer.

use crate::surface::framebuffer::{Argb, Framebuffer};
use crate::surface::RenderHooks;

const BACKGROUND: Argb = 0xFF10_1418;
const GRID: Argb = 0xFF30_3840;
const MARKER: Argb = 0xFFE0_A020;

#[derive(Debug, Clone)]
pub struct BouncingMarker {
    grid_spacing: u32,
    marker_size: u32,
    bounds: (u32, u32),
    position: (i32, i32),
    velocity: (i32, i32),
    frames: u64,
}

impl BouncingMarker {
    pub fn new(width: u32, height: u32, grid_spacing: u32) -> Self {
        Self {
            grid_spacing: grid_spacing.max(1),
            marker_size: 6,
            bounds: (width, height),
            position: (0, 0),
            velocity: (3, 2),
            frames: 0,
        }
    }

    pub fn position(&self) -> (i32, i32) {
        self.position
    }

    /// Number of dynamic updates so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn step_axis(pos: i32, vel: i32, extent: i32) -> (i32, i32) {
        if extent <= 0 {
            return (0, vel);
        }
        let next = pos + vel;
        if next < 0 {
            (-next, -vel)
        } else if next > extent {
            (2 * extent - next, -vel)
        } else {
            (next, vel)
        }
    }
}

impl RenderHooks for BouncingMarker {
    fn paint_steady_part(&mut self, g: &mut Framebuffer) {
        self.bounds = g.size();
        g.fill(BACKGROUND);
        let (width, height) = g.size();
        for x in (0..width).step_by(self.grid_spacing as usize) {
            g.fill_rect(x as i32, 0, 1, height, GRID);
        }
        for y in (0..height).step_by(self.grid_spacing as usize) {
            g.fill_rect(0, y as i32, width, 1, GRID);
        }
    }

    fn update_dynamic_part(&mut self) {
        let max_x = self.bounds.0 as i32 - self.marker_size as i32;
        let max_y = self.bounds.1 as i32 - self.marker_size as i32;
        let (x, vx) = Self::step_axis(self.position.0, self.velocity.0, max_x);
        let (y, vy) = Self::step_axis(self.position.1, self.velocity.1, max_y);
        self.position = (x, y);
        self.velocity = (vx, vy);
        self.frames += 1;
    }

    fn paint_dynamic_part(&mut self, g: &mut Framebuffer) {
        g.fill_rect(
            self.position.0,
            self.position.1,
            self.marker_size,
            self.marker_size,
            MARKER,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn it_should_bounce_off_edges() {
        let mut marker = BouncingMarker::new(10, 10, 5);
        // extent = 10 - 6 = 4 on both axes
        for _ in 0..2 {
            marker.update_dynamic_part();
        }
        assert_eq!(marker.position(), (2, 4));
        assert_eq!(marker.velocity, (-3, 2));
        marker.update_dynamic_part();
        assert_eq!(marker.position(), (1, 2));
        assert_eq!(marker.frames(), 3);
    }

    #[test]
    fn it_should_draw_grid_lines_in_steady_part() {
        let mut marker = BouncingMarker::new(10, 10, 5);
        let mut fb = Framebuffer::new(10, 10);
        marker.paint_steady_part(&mut fb);
        assert_eq!(fb.pixel(0, 3), Some(GRID));
        assert_eq!(fb.pixel(5, 7), Some(GRID));
        assert_eq!(fb.pixel(2, 2), Some(BACKGROUND));
    }

    #[test]
    fn it_should_paint_marker_at_position() {
        let mut marker = BouncingMarker::new(20, 20, 50);
        marker.update_dynamic_part();
        let mut fb = Framebuffer::new(20, 20);
        marker.paint_dynamic_part(&mut fb);
        assert_eq!(fb.pixel(3, 2), Some(MARKER));
        assert_eq!(fb.pixel(8, 7), Some(MARKER));
        assert_eq!(fb.pixel(9, 8), Some(crate::surface::framebuffer::TRANSPARENT));
    }
}
