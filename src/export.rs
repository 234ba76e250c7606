//! Headless rendering to PNG snapshots and animated GIFs

use crate::color::Rgba;
use crate::particle::Bounds;
use crate::render::Surface;
use anyhow::Context;
use image::{ImageBuffer, Rgba as Pixel, RgbaImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Page background the particles are drawn over
const BACKGROUND: Rgba = Rgba::WHITE;

/// GIF frame delay in hundredths of a second
const GIF_FRAME_DELAY: u16 = 2;

/// Quantization speed passed to the GIF encoder (1 = best, 30 = fastest)
const GIF_QUANTIZE_SPEED: i32 = 10;

/// Drawing surface backed by an RGBA image, one pixel per simulation pixel
pub struct RasterSurface {
    image: RgbaImage,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        let mut surface = Self {
            image: ImageBuffer::new(width, height),
        };
        surface.fill_background();
        surface
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.image.width() as f64, self.image.height() as f64)
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    fn fill_background(&mut self) {
        let bg = Pixel([BACKGROUND.r, BACKGROUND.g, BACKGROUND.b, 255]);
        for pixel in self.image.pixels_mut() {
            *pixel = bg;
        }
    }

    fn blend(&mut self, x: i64, y: i64, color: Rgba, coverage: f32) {
        if x < 0 || y < 0 || x >= self.image.width() as i64 || y >= self.image.height() as i64 {
            return;
        }
        let pixel = self.image.get_pixel_mut(x as u32, y as u32);
        let [r, g, b] = color.blend_over([pixel[0], pixel[1], pixel[2]], coverage);
        *pixel = Pixel([r, g, b, 255]);
    }

    /// Write the current picture as a PNG
    pub fn save_png(&self, path: &Path) -> anyhow::Result<()> {
        self.image
            .save(path)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))
    }
}

impl Surface for RasterSurface {
    fn clear(&mut self, _bounds: Bounds) {
        self.fill_background();
    }

    fn fill_circle(&mut self, x: f64, y: f64, radius: f64, color: Rgba) {
        let x0 = (x - radius).floor() as i64;
        let x1 = (x + radius).ceil() as i64;
        let y0 = (y - radius).floor() as i64;
        let y1 = (y + radius).ceil() as i64;

        for py in y0..=y1 {
            for px in x0..=x1 {
                let dx = px as f64 + 0.5 - x;
                let dy = py as f64 + 0.5 - y;
                if dx * dx + dy * dy <= radius * radius {
                    self.blend(px, py, color, 1.0);
                }
            }
        }
    }

    /// Hairline DDA; widths below one pixel reduce coverage instead of thickness
    fn stroke_line(&mut self, from: (f64, f64), to: (f64, f64), width: f64, color: Rgba) {
        let coverage = width.clamp(0.0, 1.0) as f32;
        let steps = (to.0 - from.0).abs().max((to.1 - from.1).abs()).ceil().max(1.0) as i64;

        for step in 0..=steps {
            let t = step as f64 / steps as f64;
            let x = from.0 + (to.0 - from.0) * t;
            let y = from.1 + (to.1 - from.1) * t;
            self.blend(x.floor() as i64, y.floor() as i64, color, coverage);
        }
    }
}

/// Streams rendered frames into an animated GIF
pub struct GifRecorder {
    encoder: gif::Encoder<BufWriter<File>>,
    width: u16,
    height: u16,
    frames: usize,
}

impl GifRecorder {
    pub fn create(path: &Path, width: u16, height: u16) -> anyhow::Result<Self> {
        let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        let mut encoder = gif::Encoder::new(BufWriter::new(file), width, height, &[])?;
        encoder.set_repeat(gif::Repeat::Infinite)?;
        Ok(Self {
            encoder,
            width,
            height,
            frames: 0,
        })
    }

    /// Append the surface's current picture as the next frame
    pub fn push(&mut self, surface: &RasterSurface) -> anyhow::Result<()> {
        let image = surface.image();
        anyhow::ensure!(
            image.width() == self.width as u32 && image.height() == self.height as u32,
            "frame is {}x{}, recorder expects {}x{}",
            image.width(),
            image.height(),
            self.width,
            self.height
        );

        let mut pixels = image.as_raw().clone();
        let mut frame = gif::Frame::from_rgba_speed(self.width, self.height, &mut pixels, GIF_QUANTIZE_SPEED);
        frame.delay = GIF_FRAME_DELAY;
        self.encoder.write_frame(&frame)?;
        self.frames += 1;
        Ok(())
    }

    pub fn frames(&self) -> usize {
        self.frames
    }
}
