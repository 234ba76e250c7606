use crate::app::{App, Focus};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use std::time::Instant;

const SIDEBAR_WIDTH: u16 = 24;

/// Max scroll for help content (generous to account for text wrapping on small screens)
pub const HELP_CONTENT_LINES: u16 = 40;

// UI color scheme
const BORDER_COLOR: Color = Color::Cyan;
const HIGHLIGHT_COLOR: Color = Color::Yellow;
const TEXT_COLOR: Color = Color::White;
const DIM_TEXT_COLOR: Color = Color::Gray;

/// Creates a standard styled block with rounded borders
fn styled_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_COLOR))
        .title(title)
}

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    if app.fullscreen_mode {
        render_canvas(frame, area, app);
    } else {
        let layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
            .split(area);

        render_sidebar(frame, layout[0], app);
        render_canvas(frame, layout[1], app);
    }

    if app.show_help {
        render_help_overlay(frame, area, app);
    }
}

/// Calculate the canvas size (excluding borders)
pub fn get_canvas_size(frame_area: Rect, fullscreen: bool) -> (u16, u16) {
    if fullscreen {
        (frame_area.width.saturating_sub(2), frame_area.height.saturating_sub(2))
    } else {
        let canvas_width = frame_area.width.saturating_sub(SIDEBAR_WIDTH + 2);
        let canvas_height = frame_area.height.saturating_sub(2);
        (canvas_width, canvas_height)
    }
}

fn render_sidebar(frame: &mut Frame, area: Rect, app: &App) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Status
            Constraint::Length(8), // Parameters
            Constraint::Min(6),    // Controls
        ])
        .split(area);

    render_status_box(frame, sections[0], app);
    render_params_box(frame, sections[1], app);
    render_controls_box(frame, sections[2], app);
}

fn render_status_box(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block(" Particle Chimes ");

    let (status_text, status_color) = if app.scheduler.is_settling(Instant::now()) {
        ("SETTLING", DIM_TEXT_COLOR)
    } else if app.scheduler.paused {
        ("PAUSED", HIGHLIGHT_COLOR)
    } else {
        ("RUNNING", BORDER_COLOR)
    };

    let sound = if app.synth.settings.muted {
        Span::styled("muted", Style::default().fg(Color::Red))
    } else {
        Span::styled(
            format!("{} voices", app.active_voices()),
            Style::default().fg(Color::Green),
        )
    };

    let text = Style::default().fg(TEXT_COLOR);
    let content = vec![
        Line::from(Span::styled(
            format!("{} particles, {} bass", app.particles.len(), app.bass_count()),
            text,
        )),
        Line::from(Span::styled(format!("{} collisions", app.stats.collisions), text)),
        Line::from(sound),
        Line::from(Span::styled(
            format!("{} ({})", status_text, app.device.name()),
            Style::default().fg(status_color),
        )),
        Line::from(Span::styled(
            format!("dropped: {}", app.synth.dropped_notes),
            Style::default().fg(DIM_TEXT_COLOR),
        )),
    ];

    let paragraph = Paragraph::new(content).block(block);
    frame.render_widget(paragraph, area);
}

fn render_params_box(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block(" Parameters ");

    let make_line = |label: &str, value: String, focused: bool| {
        let prefix = if focused { "> " } else { "  " };
        let style = if focused {
            Style::default().fg(HIGHLIGHT_COLOR)
        } else {
            Style::default().fg(TEXT_COLOR)
        };
        Line::from(Span::styled(format!("{}{}: {}", prefix, label, value), style))
    };

    let synth = &app.synth.settings;
    let render = &app.render;
    let voices = if synth.max_voices == 0 {
        "off".to_string()
    } else {
        synth.max_voices.to_string()
    };

    let content = vec![
        make_line("Cutoff", format!("{:.0} Hz", synth.low_cutoff_hz), app.focus == Focus::Cutoff),
        make_line("Falloff", format!("{:.2}", render.line_falloff), app.focus == Focus::Falloff),
        make_line("Scale", format!("{:.0}", render.pixel_scale), app.focus == Focus::Scale),
        make_line("Thresh", format!("{:.2}", render.dot_threshold), app.focus == Focus::Threshold),
        make_line("Voices", voices, app.focus == Focus::Voices),
        make_line("Volume", format!("{:.1}", synth.volume), app.focus == Focus::Volume),
    ];

    // Keep the focused line visible
    let focus_line = app.focus.line_index();
    let visible_height = area.height.saturating_sub(2);
    let scroll = if visible_height == 0 || focus_line < visible_height {
        0
    } else {
        focus_line.saturating_sub(visible_height - 1)
    };

    let paragraph = Paragraph::new(content).block(block).scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}

fn render_controls_box(frame: &mut Frame, area: Rect, app: &App) {
    let key_style = Style::default().fg(HIGHLIGHT_COLOR);
    let desc_style = Style::default().fg(DIM_TEXT_COLOR);

    let make_control = |key: &str, desc: String| -> Line<'_> {
        Line::from(vec![
            Span::styled(format!("{:>5}", key), key_style),
            Span::styled(format!(" {}", desc), desc_style),
        ])
    };

    let content = vec![
        make_control("Space", "pause/resume".to_string()),
        make_control("R", "new particles".to_string()),
        make_control("M", if app.synth.settings.muted { "unmute" } else { "mute" }.to_string()),
        make_control("C", format!("device: {}", app.device.name())),
        make_control("Tab", "select param".to_string()),
        make_control("↑/↓", "adjust param".to_string()),
        make_control("+/-", "volume".to_string()),
        make_control("V", "fullscreen".to_string()),
        make_control("H", "help".to_string()),
        make_control("Q", "quit".to_string()),
    ];

    let paragraph = Paragraph::new(content).block(styled_block(" Controls "));
    frame.render_widget(paragraph, area);
}

fn render_canvas(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block("");

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let buffer = frame.buffer_mut();
    for cell in app.surface.cells(app.render.dot_threshold) {
        let x = inner.x + cell.x;
        let y = inner.y + cell.y;

        if x < inner.x + inner.width && y < inner.y + inner.height {
            if let Some(target) = buffer.cell_mut((x, y)) {
                target.set_char(cell.char).set_fg(cell.color);
            }
        }
    }
}

fn render_help_overlay(frame: &mut Frame, area: Rect, app: &App) {
    // Center within the canvas, not the sidebar
    let canvas_x = if app.fullscreen_mode { 0 } else { SIDEBAR_WIDTH };
    let canvas_width = if app.fullscreen_mode {
        area.width
    } else {
        area.width.saturating_sub(SIDEBAR_WIDTH)
    };

    let help_width = 56.min(canvas_width.saturating_sub(4));
    let help_height = area.height.saturating_sub(4).min(30);
    let x = canvas_x + (canvas_width.saturating_sub(help_width)) / 2;
    let y = (area.height.saturating_sub(help_height)) / 2;

    let help_area = Rect {
        x: area.x + x,
        y: area.y + y,
        width: help_width,
        height: help_height,
    };

    frame.render_widget(Clear, help_area);

    let heading = Style::default().fg(HIGHLIGHT_COLOR);
    let content = vec![
        Line::from(""),
        Line::from(Span::styled("PARTICLE CHIMES", Style::default().fg(BORDER_COLOR))),
        Line::from(""),
        Line::from("Particles drift, bounce off the walls and off each other. Every collision rings the particle's tone."),
        Line::from(""),
        Line::from(Span::styled("TONES:", heading)),
        Line::from("Large bass particles ring a single low note. The others ring a minor seventh chord. Slower particles ring longer."),
        Line::from(""),
        Line::from(Span::styled("PARAMETERS (Tab, arrows):", heading)),
        Line::from("Cutoff: lowest audible frequency"),
        Line::from("Falloff: how far connecting lines reach"),
        Line::from("Scale: pixels per dot; changes the field"),
        Line::from("Thresh: faintest dot that lights up"),
        Line::from("Voices: cap on sounding voices (0 = off)"),
        Line::from("Volume: master volume"),
        Line::from(""),
        Line::from(Span::styled("CONTROLS:", heading)),
        Line::from("Space=Pause, R=New particles, M=Mute, C=Compact/Normal, V=Fullscreen, +/-=Volume, Q=Quit"),
        Line::from(""),
    ];

    let content_height = content.len() as u16;
    let visible_height = help_height.saturating_sub(2);
    let is_scrollable = content_height > visible_height;

    let title = if is_scrollable {
        " Help (J/K scroll, H to close) "
    } else {
        " Help (H to close) "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(HIGHLIGHT_COLOR))
        .title(title);

    let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.help_scroll, 0));

    frame.render_widget(paragraph, help_area);
}
