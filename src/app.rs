use crate::braille::BrailleSurface;
use crate::config::{AppConfig, CONFIG_VERSION};
use crate::particle::{self, Bounds, DeviceClass, Particle};
use crate::render;
use crate::scheduler::FrameScheduler;
use crate::settings::RenderSettings;
use crate::synth::{AudioOutput, ToneSynth};
use rand::rngs::StdRng;
use std::time::Instant;

/// Focus state for parameter editing in the sidebar
/// Alphabetically ordered for consistent UI display
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Focus {
    #[default]
    None,
    Cutoff,
    Falloff,
    Scale,
    Threshold,
    Voices,
    Volume,
    // Controls box (not a param)
    Controls,
}

impl Focus {
    /// Tab cycles through parameters in alphabetical order
    pub fn next(&self) -> Focus {
        match self {
            Focus::None | Focus::Controls => Focus::Cutoff,
            Focus::Cutoff => Focus::Falloff,
            Focus::Falloff => Focus::Scale,
            Focus::Scale => Focus::Threshold,
            Focus::Threshold => Focus::Voices,
            Focus::Voices => Focus::Volume,
            Focus::Volume => Focus::Cutoff,
        }
    }

    /// Shift+Tab cycles in reverse
    pub fn prev(&self) -> Focus {
        match self {
            Focus::None | Focus::Controls => Focus::Volume,
            Focus::Cutoff => Focus::Volume,
            Focus::Falloff => Focus::Cutoff,
            Focus::Scale => Focus::Falloff,
            Focus::Threshold => Focus::Scale,
            Focus::Voices => Focus::Threshold,
            Focus::Volume => Focus::Voices,
        }
    }

    /// Line index in the parameters box
    pub fn line_index(&self) -> u16 {
        match self {
            Focus::None | Focus::Controls => 0,
            Focus::Cutoff => 0,
            Focus::Falloff => 1,
            Focus::Scale => 2,
            Focus::Threshold => 3,
            Focus::Voices => 4,
            Focus::Volume => 5,
        }
    }

    /// Check if focus is on a parameter (not Controls or None)
    pub fn is_param(&self) -> bool {
        !matches!(self, Focus::None | Focus::Controls)
    }
}

/// Running totals shown in the status box
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stats {
    pub frames: u64,
    pub collisions: u64,
    pub voices_started: u64,
}

/// Main application state
pub struct App {
    pub particles: Vec<Particle>,
    pub bounds: Bounds,
    pub device: DeviceClass,
    rng: StdRng,
    pub synth: ToneSynth,
    output: Box<dyn AudioOutput>,
    pub surface: BrailleSurface,
    pub render: RenderSettings,
    pub scheduler: FrameScheduler,
    pub stats: Stats,
    pub focus: Focus,
    pub fullscreen_mode: bool,
    pub show_help: bool,
    pub help_scroll: u16,
}

impl App {
    pub fn new(
        canvas_width: u16,
        canvas_height: u16,
        config: &AppConfig,
        rng: StdRng,
        output: Box<dyn AudioOutput>,
    ) -> Self {
        let surface = BrailleSurface::new(canvas_width, canvas_height, config.render.pixel_scale);
        let mut app = Self {
            particles: Vec::new(),
            bounds: surface.bounds(),
            device: config.device,
            rng,
            synth: ToneSynth::new(config.synth.clone()),
            output,
            surface,
            render: config.render.clone(),
            scheduler: FrameScheduler::default(),
            stats: Stats::default(),
            focus: Focus::Controls,
            fullscreen_mode: false,
            show_help: false,
            help_scroll: 0,
        };
        app.reset();
        app
    }

    /// Advance one frame if the scheduler allows it, ring the collisions,
    /// then redraw the canvas
    pub fn tick(&mut self, now: Instant) {
        if self.scheduler.frame_due(now) {
            let events = particle::advance(&mut self.particles, self.bounds);
            self.stats.frames += 1;
            self.stats.collisions += events.len() as u64;
            for event in &events {
                let started = self.synth.play_event(event, self.output.as_mut());
                self.stats.voices_started += started as u64;
            }
        }

        if !self.scheduler.is_settling(now) {
            self.redraw();
        }
    }

    pub fn redraw(&mut self) {
        render::draw_frame(&mut self.surface, &self.particles, self.bounds, &self.render);
    }

    /// Generate a new particle field for the current bounds and device class
    pub fn reset(&mut self) {
        self.particles = particle::reset(self.bounds, &self.device.spawn_profile(), &mut self.rng);
        log::debug!(
            "reset {} particles ({} bass) in {:.0}x{:.0}",
            self.particles.len(),
            self.bass_count(),
            self.bounds.width,
            self.bounds.height
        );
    }

    /// Resize to a new canvas, regenerate the field and hold frames until
    /// resizing settles
    pub fn resize(&mut self, canvas_width: u16, canvas_height: u16, now: Instant) {
        self.surface.resize(canvas_width, canvas_height);
        self.bounds = self.surface.bounds();
        self.reset();
        self.scheduler.defer(now);
    }

    pub fn toggle_pause(&mut self) {
        self.scheduler.toggle_pause();
    }

    pub fn toggle_mute(&mut self) {
        self.synth.settings.toggle_mute();
        log::info!("muted: {}", self.synth.settings.muted);
    }

    /// Switch between normal and compact spawning; triggers a reset
    pub fn toggle_device(&mut self) {
        self.device = self.device.toggle();
        self.reset();
    }

    /// Toggle fullscreen mode
    pub fn toggle_fullscreen(&mut self) {
        self.fullscreen_mode = !self.fullscreen_mode;
    }

    /// Toggle help overlay
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
        if self.show_help {
            self.help_scroll = 0;
        }
    }

    pub fn scroll_help_up(&mut self) {
        self.help_scroll = self.help_scroll.saturating_sub(1);
    }

    pub fn scroll_help_down(&mut self, max_scroll: u16) {
        self.help_scroll = (self.help_scroll + 1).min(max_scroll);
    }

    pub fn next_focus(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn prev_focus(&mut self) {
        self.focus = self.focus.prev();
    }

    pub fn adjust_focused_up(&mut self) {
        self.adjust_focused(1.0);
    }

    pub fn adjust_focused_down(&mut self) {
        self.adjust_focused(-1.0);
    }

    fn adjust_focused(&mut self, sign: f64) {
        match self.focus {
            Focus::None | Focus::Controls => {}
            Focus::Cutoff => self.synth.settings.adjust_low_cutoff(5.0 * sign),
            Focus::Falloff => self.render.adjust_line_falloff(0.01 * sign),
            Focus::Scale => self.adjust_pixel_scale(sign),
            Focus::Threshold => self.render.adjust_dot_threshold(0.05 * sign as f32),
            Focus::Voices => self.synth.settings.adjust_max_voices(8 * sign as i32),
            Focus::Volume => self.synth.settings.adjust_volume(0.1 * sign as f32),
        }
    }

    /// Change how many simulation pixels a dot covers; the bounds change with
    /// it, so the field is regenerated
    pub fn adjust_pixel_scale(&mut self, delta: f64) {
        let before = self.render.pixel_scale;
        self.render.adjust_pixel_scale(delta);
        if self.render.pixel_scale != before {
            self.surface.set_pixel_scale(self.render.pixel_scale);
            self.bounds = self.surface.bounds();
            self.reset();
        }
    }

    pub fn bass_count(&self) -> usize {
        self.particles.iter().filter(|p| p.is_bass).count()
    }

    pub fn active_voices(&self) -> usize {
        self.output.active_voices()
    }

    /// Current settings in persistable form
    pub fn config(&self) -> AppConfig {
        AppConfig {
            version: CONFIG_VERSION,
            synth: self.synth.settings.clone(),
            render: self.render.clone(),
            device: self.device,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::{Note, NullOutput};
    use rand::SeedableRng;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    /// Counts the notes it is handed
    struct CountingOutput {
        notes: Rc<Cell<usize>>,
    }

    impl AudioOutput for CountingOutput {
        fn now(&self) -> f64 {
            0.0
        }

        fn active_voices(&self) -> usize {
            0
        }

        fn play(&mut self, _note: Note) {
            self.notes.set(self.notes.get() + 1);
        }
    }

    fn test_app(config: &AppConfig) -> App {
        App::new(100, 30, config, StdRng::seed_from_u64(11), Box::new(NullOutput))
    }

    #[test]
    fn test_new_app_has_field() {
        let app = test_app(&AppConfig::default());

        assert_eq!(app.bounds, Bounds::new(800.0, 480.0));
        let (lo, hi) = app.device.spawn_profile().count_range();
        assert!((lo..=hi).contains(&app.particles.len()));
    }

    #[test]
    fn test_tick_moves_particles_and_rings() {
        let notes = Rc::new(Cell::new(0));
        let mut app = App::new(
            100,
            30,
            &AppConfig::default(),
            StdRng::seed_from_u64(3),
            Box::new(CountingOutput { notes: notes.clone() }),
        );
        let before = app.particles.clone();
        let now = Instant::now();

        for _ in 0..300 {
            app.tick(now);
        }

        assert_eq!(app.stats.frames, 300);
        assert_ne!(app.particles, before);
        assert!(app.stats.collisions > 0);
        assert!(notes.get() > 0);
        assert!(!app.surface.cells(app.render.dot_threshold).is_empty());
    }

    #[test]
    fn test_muted_tick_starts_no_voices() {
        let notes = Rc::new(Cell::new(0));
        let mut config = AppConfig::default();
        config.synth.muted = true;
        let mut app = App::new(
            100,
            30,
            &config,
            StdRng::seed_from_u64(3),
            Box::new(CountingOutput { notes: notes.clone() }),
        );
        let now = Instant::now();

        for _ in 0..300 {
            app.tick(now);
        }

        assert!(app.stats.collisions > 0);
        assert_eq!(app.stats.voices_started, 0);
        assert_eq!(notes.get(), 0);
    }

    #[test]
    fn test_paused_app_does_not_advance() {
        let mut app = test_app(&AppConfig::default());
        let before = app.particles.clone();

        app.toggle_pause();
        app.tick(Instant::now());

        assert_eq!(app.particles, before);
        assert_eq!(app.stats.frames, 0);
    }

    #[test]
    fn test_resize_resets_and_settles() {
        let mut app = test_app(&AppConfig::default());
        let now = Instant::now();

        app.resize(50, 20, now);
        assert_eq!(app.bounds, Bounds::new(400.0, 320.0));
        assert!(app
            .particles
            .iter()
            .all(|p| p.left >= p.radius && p.left <= 400.0 - p.radius));

        let before = app.particles.clone();
        app.tick(now + Duration::from_millis(100));
        assert_eq!(app.particles, before);

        app.tick(now + Duration::from_millis(600));
        assert_ne!(app.particles, before);
    }

    #[test]
    fn test_toggle_device_resets_with_compact_profile() {
        let mut app = test_app(&AppConfig::default());
        app.toggle_device();

        assert_eq!(app.device, DeviceClass::Compact);
        let (lo, hi) = DeviceClass::Compact.spawn_profile().count_range();
        assert!((lo..=hi).contains(&app.particles.len()));
        assert_eq!(app.config().device, DeviceClass::Compact);
    }

    #[test]
    fn test_zero_canvas_is_empty() {
        let mut app = App::new(0, 0, &AppConfig::default(), StdRng::seed_from_u64(1), Box::new(NullOutput));
        assert!(app.particles.is_empty());
        app.tick(Instant::now());
        assert_eq!(app.stats.collisions, 0);
    }

    #[test]
    fn test_focus_cycle() {
        let mut focus = Focus::Controls;
        for _ in 0..6 {
            focus = focus.next();
            assert!(focus.is_param());
            assert_eq!(focus.next().prev(), focus);
        }
        assert_eq!(focus, Focus::Volume);
        assert_eq!(focus.next(), Focus::Cutoff);
    }

    #[test]
    fn test_adjust_focused_params() {
        let mut app = test_app(&AppConfig::default());

        app.focus = Focus::Volume;
        app.adjust_focused_down();
        assert!((app.synth.settings.volume - 0.9).abs() < 1e-6);

        app.focus = Focus::Voices;
        app.adjust_focused_up();
        assert_eq!(app.synth.settings.max_voices, 104);

        app.focus = Focus::Scale;
        app.adjust_focused_down();
        assert_eq!(app.render.pixel_scale, 3.0);
        assert_eq!(app.bounds, Bounds::new(600.0, 360.0));

        app.focus = Focus::Controls;
        let before = app.config();
        app.adjust_focused_up();
        assert_eq!(app.config(), before);
    }

    #[test]
    fn test_toggle_mute_round_trips_to_config() {
        let mut app = test_app(&AppConfig::default());
        app.toggle_mute();
        assert!(app.config().synth.muted);
        app.toggle_mute();
        assert!(!app.config().synth.muted);
    }
}
