// Terminal simulator - Renders the LED matrix with true-color half blocks
use crate::application::canvas::{Canvas, PresentError, check_dimensions};
use crate::domain::frame::{Frame, scale_brightness};
use anyhow::Context;
use chrono::Utc;
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{
    Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
    enable_raw_mode,
};
use crossterm::{execute, queue};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use std::io::{self, Stdout, Write};
use std::path::PathBuf;
use std::time::Duration;

/// Unlit LEDs are drawn dim so the panel grid stays visible.
const OFF_LED: Rgb888 = Rgb888::new(20, 20, 20);
const UPPER_HALF_BLOCK: char = '\u{2580}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    Quit,
    Screenshot,
}

pub struct TerminalCanvas {
    stdout: Stdout,
    dimensions: (u16, u16),
    brightness: u8,
    screenshot_scale: u32,
    screenshot_dir: PathBuf,
    last_frame: Option<Frame>,
    active: bool,
}

impl TerminalCanvas {
    /// Take over the terminal: raw mode, alternate screen, hidden cursor.
    pub fn new(
        width: u16,
        height: u16,
        brightness: u8,
        screenshot_scale: u32,
    ) -> anyhow::Result<Self> {
        enable_raw_mode().context("Failed to enable raw terminal mode")?;
        let mut canvas = Self {
            stdout: io::stdout(),
            dimensions: (width, height),
            brightness,
            screenshot_scale: screenshot_scale.max(1),
            screenshot_dir: PathBuf::from("."),
            last_frame: None,
            active: true,
        };
        // Drop restores the terminal if this fails.
        execute!(canvas.stdout, EnterAlternateScreen, Hide, Clear(ClearType::All))
            .context("Failed to prepare terminal screen")?;
        Ok(canvas)
    }

    fn save_screenshot(&self) {
        let Some(frame) = &self.last_frame else {
            tracing::warn!("No frame on screen yet, screenshot skipped");
            return;
        };
        let filename = format!("screenshot_{}.png", Utc::now().format("%Y%m%d_%H%M%S"));
        let path = self.screenshot_dir.join(filename);
        match render_screenshot(frame, self.brightness, self.screenshot_scale).save(&path) {
            Ok(()) => tracing::info!("Screenshot saved: {}", path.display()),
            Err(e) => tracing::warn!("Failed to save screenshot {}: {}", path.display(), e),
        }
    }
}

impl Canvas for TerminalCanvas {
    fn present(&mut self, frame: &Frame) -> Result<(), PresentError> {
        check_dimensions(self.dimensions, frame)?;
        render_half_blocks(&mut self.stdout, frame, self.brightness)
            .map_err(|e| PresentError::BackendDisconnected(e.to_string()))?;
        self.last_frame = Some(frame.clone());
        Ok(())
    }

    fn poll_shutdown_requested(&mut self) -> bool {
        loop {
            match event::poll(Duration::ZERO) {
                Ok(true) => {}
                Ok(false) => return false,
                Err(e) => {
                    tracing::error!("Terminal input failed: {}", e);
                    return true;
                }
            }
            let key = match event::read() {
                Ok(Event::Key(key)) => key,
                Ok(_) => continue,
                Err(e) => {
                    tracing::error!("Terminal input failed: {}", e);
                    return true;
                }
            };
            match key_action(&key) {
                Some(KeyAction::Quit) => return true,
                Some(KeyAction::Screenshot) => self.save_screenshot(),
                None => {}
            }
        }
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Err(e) = execute!(self.stdout, ResetColor, Show, LeaveAlternateScreen) {
            tracing::warn!("Failed to restore terminal screen: {}", e);
        }
        if let Err(e) = disable_raw_mode() {
            tracing::warn!("Failed to leave raw terminal mode: {}", e);
        }
    }
}

impl Drop for TerminalCanvas {
    fn drop(&mut self) {
        self.release();
    }
}

fn key_action(key: &KeyEvent) -> Option<KeyAction> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => Some(KeyAction::Quit),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(KeyAction::Quit)
        }
        KeyCode::Char('s') | KeyCode::Char('S') => Some(KeyAction::Screenshot),
        _ => None,
    }
}

/// What an LED looks like at `brightness`; missing and unlit pixels show as `OFF_LED`.
fn shown_led(pixel: Option<Rgb888>, brightness: u8) -> Rgb888 {
    match pixel.map(|p| scale_brightness(p, brightness)) {
        Some(lit) if lit != Rgb888::BLACK => lit,
        _ => OFF_LED,
    }
}

fn led_color(pixel: Option<Rgb888>, brightness: u8) -> Color {
    let shown = shown_led(pixel, brightness);
    Color::Rgb {
        r: shown.r(),
        g: shown.g(),
        b: shown.b(),
    }
}

/// Two LED rows per terminal row: foreground is the upper LED, background the lower.
fn render_half_blocks<W: Write>(out: &mut W, frame: &Frame, brightness: u8) -> io::Result<()> {
    for (row, y) in (0..frame.height()).step_by(2).enumerate() {
        queue!(out, MoveTo(0, row as u16))?;
        for x in 0..frame.width() {
            queue!(
                out,
                SetForegroundColor(led_color(frame.get(x, y), brightness)),
                SetBackgroundColor(led_color(frame.get(x, y + 1), brightness)),
                Print(UPPER_HALF_BLOCK)
            )?;
        }
    }
    queue!(out, ResetColor)?;
    out.flush()
}

/// Enlarged PNG-ready image with each LED drawn as a round dot on a dark board.
pub fn render_screenshot(frame: &Frame, brightness: u8, scale: u32) -> image::RgbImage {
    let scale = scale.max(1);
    let radius = scale as f32 / 2.0;
    let width = u32::from(frame.width()) * scale;
    let height = u32::from(frame.height()) * scale;

    image::RgbImage::from_fn(width, height, |px, py| {
        let (x, y) = ((px / scale) as u16, (py / scale) as u16);
        let dx = (px % scale) as f32 + 0.5 - radius;
        let dy = (py % scale) as f32 + 0.5 - radius;
        if scale > 2 && dx * dx + dy * dy > radius * radius {
            return image::Rgb([0, 0, 0]);
        }
        let shown = shown_led(frame.get(x, y), brightness);
        image::Rgb([shown.r(), shown.g(), shown.b()])
    })
}
