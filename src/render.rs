use crate::color::Rgba;
use crate::particle::{Bounds, Particle};
use crate::settings::RenderSettings;

/// Fill used for every particle
pub const PARTICLE_FILL: Rgba = Rgba::new(68, 68, 68, 0.37);

/// Stroke color for connecting lines; alpha is computed per pair
pub const LINE_STROKE: Rgba = Rgba::new(68, 68, 68, 1.0);

pub const LINE_WIDTH: f64 = 0.4;

/// Strongest a connecting line can be
const LINE_ALPHA_MAX: f64 = 0.9;

/// Drawing target for the renderer, in simulation pixel coordinates
pub trait Surface {
    fn clear(&mut self, bounds: Bounds);
    fn fill_circle(&mut self, x: f64, y: f64, radius: f64, color: Rgba);
    fn stroke_line(&mut self, from: (f64, f64), to: (f64, f64), width: f64, color: Rgba);
}

/// Opacity of the line joining two particles `distance` apart
///
/// The diagonal is raised to `falloff` before dividing, so lines fade out well
/// before they span the whole canvas.
pub fn line_alpha(distance: f64, bounds: Bounds, falloff: f64) -> f32 {
    let reach = bounds.diagonal().powf(falloff);
    if reach <= 0.0 {
        return 0.0;
    }
    ((1.0 - distance / reach) * LINE_ALPHA_MAX).clamp(0.0, 1.0) as f32
}

/// Draw one frame of the particle field
pub fn draw_frame<S: Surface + ?Sized>(
    surface: &mut S,
    particles: &[Particle],
    bounds: Bounds,
    settings: &RenderSettings,
) {
    surface.clear(bounds);

    for (i, from) in particles.iter().enumerate() {
        surface.fill_circle(from.left, from.top, from.radius, PARTICLE_FILL);

        for to in &particles[i + 1..] {
            let distance = (to.left - from.left).hypot(to.top - from.top);
            let alpha = line_alpha(distance, bounds, settings.line_falloff);
            if alpha <= 0.0 {
                continue;
            }
            surface.stroke_line(
                (from.left, from.top),
                (to.left, to.top),
                LINE_WIDTH,
                LINE_STROKE.with_alpha(alpha),
            );
        }
    }
}
