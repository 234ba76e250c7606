use crate::color::{shade, Rgba};
use crate::particle::Bounds;
use crate::render::Surface;
use ratatui::style::Color;

/// Braille character rendering for high-resolution terminal graphics.
/// Each Braille character represents a 2x4 grid of dots (8 dots total).
///
/// Dot positions and their bit values:
/// ```text
/// (0,0)=0x01  (1,0)=0x08
/// (0,1)=0x02  (1,1)=0x10
/// (0,2)=0x04  (1,2)=0x20
/// (0,3)=0x40  (1,3)=0x80
/// ```
///
/// Unicode Braille patterns: U+2800 to U+28FF (256 patterns)
const BRAILLE_BASE: u32 = 0x2800;

/// Dot position to bit mapping for Braille characters
const BRAILLE_DOTS: [[u8; 4]; 2] = [
    [0x01, 0x02, 0x04, 0x40], // Left column (x=0): rows 0,1,2,3
    [0x08, 0x10, 0x20, 0x80], // Right column (x=1): rows 0,1,2,3
];

/// A single rendered Braille cell with position and color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrailleCell {
    pub x: u16,
    pub y: u16,
    pub char: char,
    pub color: Color,
}

/// Drawing surface backed by a grid of Braille dots
///
/// Each dot stores an accumulated coverage in `0.0..=1.0`. Colors only
/// contribute their alpha; the terminal shade is derived from coverage.
pub struct BrailleSurface {
    cols: u16,
    rows: u16,
    dots_w: usize,
    dots_h: usize,
    /// Simulation pixels per dot
    pixel_scale: f64,
    coverage: Vec<f32>,
}

impl BrailleSurface {
    pub fn new(cols: u16, rows: u16, pixel_scale: f64) -> Self {
        let dots_w = cols as usize * 2;
        let dots_h = rows as usize * 4;
        Self {
            cols,
            rows,
            dots_w,
            dots_h,
            pixel_scale: pixel_scale.max(f64::EPSILON),
            coverage: vec![0.0; dots_w * dots_h],
        }
    }

    /// Resize to a new canvas, dropping the current picture
    pub fn resize(&mut self, cols: u16, rows: u16) {
        *self = Self::new(cols, rows, self.pixel_scale);
    }

    pub fn set_pixel_scale(&mut self, pixel_scale: f64) {
        self.pixel_scale = pixel_scale.max(f64::EPSILON);
    }

    /// Simulation bounds this surface displays
    pub fn bounds(&self) -> Bounds {
        simulation_bounds(self.cols, self.rows, self.pixel_scale)
    }

    pub fn coverage_at(&self, dx: usize, dy: usize) -> f32 {
        if dx < self.dots_w && dy < self.dots_h {
            self.coverage[dy * self.dots_w + dx]
        } else {
            0.0
        }
    }

    fn composite(&mut self, dx: i64, dy: i64, alpha: f32) {
        if dx < 0 || dy < 0 || dx as usize >= self.dots_w || dy as usize >= self.dots_h {
            return;
        }
        let dot = &mut self.coverage[dy as usize * self.dots_w + dx as usize];
        *dot += alpha * (1.0 - *dot);
    }

    /// Collapse the dot grid into Braille characters
    ///
    /// Only cells with at least one dot at or above `threshold` are emitted.
    pub fn cells(&self, threshold: f32) -> Vec<BrailleCell> {
        let mut cells = Vec::new();

        for cy in 0..self.rows {
            for cx in 0..self.cols {
                let mut pattern: u8 = 0;
                let mut densest: f32 = 0.0;

                let base_x = cx as usize * 2;
                let base_y = cy as usize * 4;

                for dx in 0..2 {
                    for dy in 0..4 {
                        let value = self.coverage_at(base_x + dx, base_y + dy);
                        if value >= threshold {
                            pattern |= BRAILLE_DOTS[dx][dy];
                            densest = densest.max(value);
                        }
                    }
                }

                if pattern != 0 {
                    cells.push(BrailleCell {
                        x: cx,
                        y: cy,
                        char: char::from_u32(BRAILLE_BASE + pattern as u32).unwrap_or(' '),
                        color: shade(densest),
                    });
                }
            }
        }

        cells
    }
}

impl Surface for BrailleSurface {
    fn clear(&mut self, _bounds: Bounds) {
        self.coverage.fill(0.0);
    }

    fn fill_circle(&mut self, x: f64, y: f64, radius: f64, color: Rgba) {
        let s = self.pixel_scale;
        let (cx, cy, r) = (x / s, y / s, radius / s);

        let x0 = (cx - r).floor() as i64;
        let x1 = (cx + r).ceil() as i64;
        let y0 = (cy - r).floor() as i64;
        let y1 = (cy + r).ceil() as i64;

        let mut hit = false;
        for dy in y0..=y1 {
            for dx in x0..=x1 {
                // Sample at the dot center
                let px = dx as f64 + 0.5 - cx;
                let py = dy as f64 + 0.5 - cy;
                if px * px + py * py <= r * r {
                    self.composite(dx, dy, color.a);
                    hit = true;
                }
            }
        }

        // Tiny particles still show up as a single dot
        if !hit {
            self.composite(cx.floor() as i64, cy.floor() as i64, color.a);
        }
    }

    /// Lines are one dot wide regardless of `width`
    fn stroke_line(&mut self, from: (f64, f64), to: (f64, f64), _width: f64, color: Rgba) {
        let s = self.pixel_scale;
        let (x0, y0) = (from.0 / s, from.1 / s);
        let (x1, y1) = (to.0 / s, to.1 / s);

        let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil().max(1.0) as i64;
        let mut last = None;
        for step in 0..=steps {
            let t = step as f64 / steps as f64;
            let dot = (
                (x0 + (x1 - x0) * t).floor() as i64,
                (y0 + (y1 - y0) * t).floor() as i64,
            );
            if last != Some(dot) {
                self.composite(dot.0, dot.1, color.a);
                last = Some(dot);
            }
        }
    }
}

/// Simulation bounds for a canvas of `cols x rows` character cells
pub fn simulation_bounds(cols: u16, rows: u16, pixel_scale: f64) -> Bounds {
    Bounds::new(
        cols as f64 * 2.0 * pixel_scale,
        rows as f64 * 4.0 * pixel_scale,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOLID: Rgba = Rgba::new(68, 68, 68, 1.0);

    #[test]
    fn test_braille_pattern() {
        assert_eq!(BRAILLE_DOTS[0][0], 0x01); // Top-left
        assert_eq!(BRAILLE_DOTS[1][0], 0x08); // Top-right
        assert_eq!(BRAILLE_DOTS[0][3], 0x40); // Bottom-left
        assert_eq!(BRAILLE_DOTS[1][3], 0x80); // Bottom-right

        let all_dots: u8 = BRAILLE_DOTS[0].iter().sum::<u8>() + BRAILLE_DOTS[1].iter().sum::<u8>();
        assert_eq!(all_dots, 0xFF);
    }

    #[test]
    fn test_simulation_bounds() {
        let bounds = simulation_bounds(100, 30, 4.0);
        assert_eq!(bounds, Bounds::new(800.0, 480.0));

        let surface = BrailleSurface::new(100, 30, 4.0);
        assert_eq!(surface.bounds(), bounds);
    }

    #[test]
    fn test_single_dot_glyph() {
        let mut surface = BrailleSurface::new(2, 1, 1.0);
        surface.fill_circle(0.5, 0.5, 0.3, SOLID);

        let cells = surface.cells(0.5);
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].char, '\u{2801}');
        assert_eq!((cells[0].x, cells[0].y), (0, 0));
    }

    #[test]
    fn test_filled_circle_covers_full_cell() {
        let mut surface = BrailleSurface::new(4, 2, 1.0);
        surface.fill_circle(4.0, 4.0, 4.0, SOLID);

        let cells = surface.cells(0.5);
        assert!(cells.iter().any(|c| c.char == '\u{28FF}'));
    }

    #[test]
    fn test_coverage_composites() {
        let mut surface = BrailleSurface::new(1, 1, 1.0);
        let half = SOLID.with_alpha(0.5);
        surface.fill_circle(0.5, 0.5, 0.2, half);
        surface.fill_circle(0.5, 0.5, 0.2, half);

        assert!((surface.coverage_at(0, 0) - 0.75).abs() < 1e-6);
        assert_eq!(surface.cells(0.8).len(), 0);
        assert_eq!(surface.cells(0.7).len(), 1);
    }

    #[test]
    fn test_horizontal_line() {
        let mut surface = BrailleSurface::new(4, 1, 2.0);
        surface.stroke_line((1.0, 1.0), (15.0, 1.0), 0.4, SOLID);

        for dx in 0..8 {
            assert_eq!(surface.coverage_at(dx, 0), 1.0);
            assert_eq!(surface.coverage_at(dx, 1), 0.0);
        }
    }

    #[test]
    fn test_clear_and_out_of_range() {
        let mut surface = BrailleSurface::new(2, 2, 1.0);
        surface.fill_circle(-50.0, -50.0, 3.0, SOLID);
        surface.stroke_line((-10.0, 2.0), (100.0, 2.0), 0.4, SOLID);
        assert!(!surface.cells(0.5).is_empty());

        surface.clear(surface.bounds());
        assert!(surface.cells(0.01).is_empty());
    }
}
