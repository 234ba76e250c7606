mod app;
mod audio;
mod braille;
mod color;
mod config;
mod export;
mod particle;
mod render;
mod scheduler;
mod settings;
mod synth;
mod ui;

use anyhow::Context;
use app::{App, Focus};
use clap::Parser;
use config::AppConfig;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use export::{GifRecorder, RasterSurface};
use particle::DeviceClass;
use rand::rngs::StdRng;
use rand::SeedableRng;
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use synth::{NullOutput, ToneSynth};

#[derive(Parser, Debug)]
#[command(name = "particle-chimes")]
#[command(about = "Colliding particles that ring like chimes, in the terminal")]
struct Args {
    /// Seed for the particle generator (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Spawn fewer, smaller and slower particles
    #[arg(long)]
    compact: bool,

    /// Start muted
    #[arg(long)]
    mute: bool,

    /// Master volume (0.0-2.0)
    #[arg(long)]
    volume: Option<f32>,

    /// Maximum simultaneously sounding voices, 0 = unlimited (0-512)
    #[arg(long = "max-voices")]
    max_voices: Option<usize>,

    /// Simulation pixels per Braille dot (1-8)
    #[arg(long)]
    scale: Option<f64>,

    /// Config file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective settings back to the config file
    #[arg(long = "save-config")]
    save_config: bool,

    /// Render headless and write the last frame as a PNG
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Render headless and write every frame to an animated GIF
    #[arg(long)]
    record: Option<PathBuf>,

    /// Frames to simulate in headless mode
    #[arg(long, default_value = "120")]
    frames: usize,

    /// Headless canvas width in pixels
    #[arg(long, default_value = "800")]
    width: u16,

    /// Headless canvas height in pixels
    #[arg(long, default_value = "600")]
    height: u16,

    /// Log file (defaults to the user cache directory)
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,
}

fn default_log_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("particle-chimes").join("particle-chimes.log"))
}

/// Send log output to a file; the terminal belongs to the UI
fn init_logging(path: Option<PathBuf>) -> anyhow::Result<()> {
    let Some(path) = path.or_else(default_log_path) else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// Load the config file and apply command line overrides
fn load_config(args: &Args) -> anyhow::Result<(AppConfig, Option<PathBuf>)> {
    let path = args.config.clone().or_else(AppConfig::default_path);

    let mut config = match (&args.config, &path) {
        (Some(explicit), _) => AppConfig::load_from_file(explicit).map_err(anyhow::Error::msg)?,
        (None, Some(default)) => AppConfig::load_or_default(default).unwrap_or_else(|err| {
            log::warn!("ignoring config {}: {}", default.display(), err);
            AppConfig::default()
        }),
        (None, None) => AppConfig::default(),
    };

    if args.compact {
        config.device = DeviceClass::Compact;
    }
    if args.mute {
        config.synth.muted = true;
    }
    if let Some(volume) = args.volume {
        config.synth.volume = volume;
    }
    if let Some(max_voices) = args.max_voices {
        config.synth.max_voices = max_voices;
    }
    if let Some(scale) = args.scale {
        config.render.pixel_scale = scale;
    }
    config.clamp_to_ranges();

    Ok((config, path))
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => {
            log::info!("using seed {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.clone())?;

    let (config, config_path) = load_config(&args)?;
    if args.save_config {
        let path = config_path.context("No config directory available, pass --config")?;
        config.save_to_file(&path).map_err(anyhow::Error::msg)?;
        log::info!("saved config to {}", path.display());
    }

    let rng = make_rng(args.seed);

    if args.snapshot.is_some() || args.record.is_some() {
        return run_headless(&args, &config, rng);
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let size = terminal.size()?;
    let (canvas_width, canvas_height) = ui::get_canvas_size(Rect::new(0, 0, size.width, size.height), false);
    let mut app = App::new(canvas_width, canvas_height, &config, rng, audio::open_output());

    let res = run_app(&mut terminal, &mut app);

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        log::error!("terminal loop failed: {}", err);
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

/// Simulate without a terminal or audio device and export the result
fn run_headless(args: &Args, config: &AppConfig, mut rng: StdRng) -> anyhow::Result<()> {
    let mut surface = RasterSurface::new(args.width as u32, args.height as u32);
    let bounds = surface.bounds();
    let mut particles = particle::reset(bounds, &config.device.spawn_profile(), &mut rng);
    let mut synth = ToneSynth::new(config.synth.clone());
    let mut output = NullOutput;

    let mut recorder = match &args.record {
        Some(path) => Some(GifRecorder::create(path, args.width, args.height)?),
        None => None,
    };

    let mut collisions = 0;
    for _ in 0..args.frames {
        let events = particle::advance(&mut particles, bounds);
        collisions += events.len();
        for event in &events {
            synth.play_event(event, &mut output);
        }

        if let Some(recorder) = recorder.as_mut() {
            render::draw_frame(&mut surface, &particles, bounds, &config.render);
            recorder.push(&surface)?;
        }
    }

    render::draw_frame(&mut surface, &particles, bounds, &config.render);
    if let Some(path) = &args.snapshot {
        surface.save_png(path)?;
        println!("wrote {}", path.display());
    }
    if let (Some(recorder), Some(path)) = (recorder, &args.record) {
        println!("wrote {} ({} frames)", path.display(), recorder.frames());
    }

    log::info!(
        "headless run: {} particles, {} frames, {} collisions",
        particles.len(),
        args.frames,
        collisions
    );
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    // Target ~60fps for smooth animation
    const FRAME_DURATION: Duration = Duration::from_millis(16);

    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        let event = if event::poll(FRAME_DURATION)? {
            Some(event::read()?)
        } else {
            None
        };
        let size = terminal.size()?;

        if !step(app, event, Rect::new(0, 0, size.width, size.height), Instant::now()) {
            return Ok(());
        }
    }
}

/// Apply one polled event, then advance the app by a frame.
/// Returns false once the user asked to quit.
fn step(app: &mut App, event: Option<Event>, screen: Rect, now: Instant) -> bool {
    match event {
        Some(Event::Key(key)) => {
            if !handle_key(app, key, screen, now) {
                return false;
            }
        }
        Some(Event::Resize(width, height)) => {
            let (canvas_width, canvas_height) =
                ui::get_canvas_size(Rect::new(0, 0, width, height), app.fullscreen_mode);
            app.resize(canvas_width, canvas_height, now);
        }
        _ => {}
    }

    app.tick(now);
    true
}

/// Returns false when the key quits the app
fn handle_key(app: &mut App, key: KeyEvent, screen: Rect, now: Instant) -> bool {
    // Repeats and releases are ignored
    if key.kind != KeyEventKind::Press {
        return true;
    }

    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return false;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => return false,
        KeyCode::Char(' ') => app.toggle_pause(),
        KeyCode::Char('r') | KeyCode::Char('R') => app.reset(),
        KeyCode::Char('m') | KeyCode::Char('M') => app.toggle_mute(),
        KeyCode::Char('c') | KeyCode::Char('C') => app.toggle_device(),
        KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::Char('?') => app.toggle_help(),
        KeyCode::Char('v') | KeyCode::Char('V') => {
            app.toggle_fullscreen();
            let (w, h) = ui::get_canvas_size(screen, app.fullscreen_mode);
            app.resize(w, h, now);
        }
        KeyCode::Char('+') | KeyCode::Char('=') => {
            app.focus = Focus::Volume;
            app.adjust_focused_up();
        }
        KeyCode::Char('-') | KeyCode::Char('_') => {
            app.focus = Focus::Volume;
            app.adjust_focused_down();
        }

        // Navigation
        KeyCode::Tab => app.next_focus(),
        KeyCode::BackTab => app.prev_focus(),
        KeyCode::Up => {
            if !app.show_help {
                app.adjust_focused_up();
            }
        }
        KeyCode::Down => {
            if !app.show_help {
                app.adjust_focused_down();
            }
        }
        KeyCode::Esc => {
            if app.show_help {
                app.toggle_help();
            } else if app.focus.is_param() {
                app.focus = Focus::Controls;
            }
        }
        KeyCode::Char('j') | KeyCode::Char('J') => {
            if app.show_help {
                app.scroll_help_down(ui::HELP_CONTENT_LINES);
            }
        }
        KeyCode::Char('k') | KeyCode::Char('K') => {
            if app.show_help {
                app.scroll_help_up();
            }
        }
        _ => {}
    }
    true
}
