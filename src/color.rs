use ratatui::style::Color;

/// Straight (non-premultiplied) color with a fractional alpha, like a CSS `rgba()`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 1.0);

    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self {
            a: a.clamp(0.0, 1.0),
            ..self
        }
    }

    /// Composite `self` over an opaque `[r, g, b]` destination
    pub fn blend_over(&self, dst: [u8; 3], coverage: f32) -> [u8; 3] {
        let a = (self.a * coverage).clamp(0.0, 1.0);
        let mix = |s: u8, d: u8| (s as f32 * a + d as f32 * (1.0 - a)).round() as u8;
        [mix(self.r, dst[0]), mix(self.g, dst[1]), mix(self.b, dst[2])]
    }
}

/// Terminal shade for a dot coverage in `0.0..=1.0`: faint coverage is dim grey,
/// full coverage is near white
pub fn shade(coverage: f32) -> Color {
    let t = coverage.clamp(0.0, 1.0);
    let v = (90.0 + t * 165.0) as u8;
    Color::Rgb(v, v, v)
}
