use serde::{Deserialize, Serialize};

const VOLUME_MAX: f32 = 2.0;
const MAX_VOICES_LIMIT: usize = 512;
const LOW_CUTOFF_RANGE: (f64, f64) = (20.0, 200.0);
const PIXEL_SCALE_RANGE: (f64, f64) = (1.0, 8.0);
const LINE_FALLOFF_RANGE: (f64, f64) = (0.5, 1.0);
const DOT_THRESHOLD_RANGE: (f32, f32) = (0.05, 0.9);

/// Tone synthesizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthSettings {
    /// Silence all output; no voices are created while set
    pub muted: bool,
    /// Master volume multiplier applied to every voice peak (0.0-2.0)
    pub volume: f32,
    /// Maximum simultaneously sounding voices, 0 = unlimited (0-512)
    pub max_voices: usize,
    /// Chord tones below this frequency are skipped (20-200 Hz)
    pub low_cutoff_hz: f64,
}

impl Default for SynthSettings {
    fn default() -> Self {
        Self {
            muted: false,
            volume: 1.0,
            max_voices: 96,
            low_cutoff_hz: 65.0,
        }
    }
}

impl SynthSettings {
    /// Adjust volume within bounds
    pub fn adjust_volume(&mut self, delta: f32) {
        self.volume = (self.volume + delta).clamp(0.0, VOLUME_MAX);
    }

    /// Adjust the voice cap within bounds
    pub fn adjust_max_voices(&mut self, delta: i32) {
        self.max_voices = (self.max_voices as i32 + delta).clamp(0, MAX_VOICES_LIMIT as i32) as usize;
    }

    /// Adjust the low-frequency cutoff within bounds
    pub fn adjust_low_cutoff(&mut self, delta: f64) {
        self.low_cutoff_hz = (self.low_cutoff_hz + delta).clamp(LOW_CUTOFF_RANGE.0, LOW_CUTOFF_RANGE.1);
    }

    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
    }

    /// Pull every field back into its adjustable range
    pub fn clamp_to_ranges(&mut self) {
        self.volume = self.volume.clamp(0.0, VOLUME_MAX);
        self.max_voices = self.max_voices.min(MAX_VOICES_LIMIT);
        self.low_cutoff_hz = self.low_cutoff_hz.clamp(LOW_CUTOFF_RANGE.0, LOW_CUTOFF_RANGE.1);
    }
}

/// Renderer and canvas settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Simulation pixels covered by one Braille dot (1.0-8.0)
    pub pixel_scale: f64,
    /// Exponent applied to the canvas diagonal in the line fade (0.5-1.0)
    pub line_falloff: f64,
    /// Minimum dot coverage that lights a Braille dot (0.05-0.9)
    pub dot_threshold: f32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            pixel_scale: 4.0,
            line_falloff: 0.83,
            dot_threshold: 0.2,
        }
    }
}

impl RenderSettings {
    /// Adjust pixel scale within bounds
    pub fn adjust_pixel_scale(&mut self, delta: f64) {
        self.pixel_scale = (self.pixel_scale + delta).clamp(PIXEL_SCALE_RANGE.0, PIXEL_SCALE_RANGE.1);
    }

    /// Adjust line falloff exponent within bounds
    pub fn adjust_line_falloff(&mut self, delta: f64) {
        self.line_falloff = (self.line_falloff + delta).clamp(LINE_FALLOFF_RANGE.0, LINE_FALLOFF_RANGE.1);
    }

    /// Adjust dot threshold within bounds
    pub fn adjust_dot_threshold(&mut self, delta: f32) {
        self.dot_threshold = (self.dot_threshold + delta).clamp(DOT_THRESHOLD_RANGE.0, DOT_THRESHOLD_RANGE.1);
    }

    /// Pull every field back into its adjustable range
    pub fn clamp_to_ranges(&mut self) {
        self.pixel_scale = self.pixel_scale.clamp(PIXEL_SCALE_RANGE.0, PIXEL_SCALE_RANGE.1);
        self.line_falloff = self.line_falloff.clamp(LINE_FALLOFF_RANGE.0, LINE_FALLOFF_RANGE.1);
        self.dot_threshold = self.dot_threshold.clamp(DOT_THRESHOLD_RANGE.0, DOT_THRESHOLD_RANGE.1);
    }
}
