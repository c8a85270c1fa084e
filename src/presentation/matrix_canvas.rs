// LED matrix output - Canvas over a panel driver, plus a streaming RGB24 driver
use crate::application::canvas::{Canvas, PresentError, check_dimensions};
use crate::domain::frame::{Frame, scale_brightness};
use anyhow::Context;
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Boundary to the matrix hardware driver. Pixels go to a back buffer; `swap`
/// makes them visible in one step.
pub trait MatrixPanel {
    fn dimensions(&self) -> (u16, u16);
    fn set_pixel(&mut self, x: u16, y: u16, color: Rgb888);
    fn swap(&mut self) -> io::Result<()>;
    fn clear(&mut self);
}

pub struct MatrixCanvas<P: MatrixPanel> {
    panel: P,
    brightness: u8,
    released: bool,
}

impl<P: MatrixPanel> MatrixCanvas<P> {
    pub fn new(panel: P, brightness: u8) -> Self {
        Self {
            panel,
            brightness: brightness.min(100),
            released: false,
        }
    }
}

impl<P: MatrixPanel> Canvas for MatrixCanvas<P> {
    fn present(&mut self, frame: &Frame) -> Result<(), PresentError> {
        check_dimensions(self.panel.dimensions(), frame)?;
        for (y, row) in frame.rows().enumerate() {
            for (x, pixel) in row.iter().enumerate() {
                let color = scale_brightness(*pixel, self.brightness);
                self.panel.set_pixel(x as u16, y as u16, color);
            }
        }
        self.panel
            .swap()
            .map_err(|e| PresentError::BackendDisconnected(e.to_string()))
    }

    /// The panel has no input; shutdown arrives as a process signal.
    fn poll_shutdown_requested(&mut self) -> bool {
        false
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.panel.clear();
        if let Err(e) = self.panel.swap() {
            tracing::warn!("Failed to blank matrix on release: {}", e);
        }
    }
}

/// Panel driver that streams each swapped frame as packed RGB24 bytes to a
/// writer, typically a FIFO or character device read by the matrix driver.
pub struct StreamPanel<W: Write> {
    writer: W,
    width: u16,
    height: u16,
    back: Vec<u8>,
}

impl<W: Write> StreamPanel<W> {
    pub fn new(writer: W, width: u16, height: u16) -> Self {
        Self {
            writer,
            width,
            height,
            back: vec![0; usize::from(width) * usize::from(height) * 3],
        }
    }
}

impl StreamPanel<BufWriter<File>> {
    pub fn open(path: &Path, width: u16, height: u16) -> anyhow::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open matrix device {}", path.display()))?;
        tracing::info!("Streaming {}x{} frames to {}", width, height, path.display());
        Ok(Self::new(BufWriter::new(file), width, height))
    }
}

impl<W: Write> MatrixPanel for StreamPanel<W> {
    fn dimensions(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn set_pixel(&mut self, x: u16, y: u16, color: Rgb888) {
        if x >= self.width || y >= self.height {
            return;
        }
        let offset = (usize::from(y) * usize::from(self.width) + usize::from(x)) * 3;
        self.back[offset..offset + 3].copy_from_slice(&[color.r(), color.g(), color.b()]);
    }

    fn swap(&mut self) -> io::Result<()> {
        self.writer.write_all(&self.back)?;
        self.writer.flush()
    }

    fn clear(&mut self) {
        self.back.fill(0);
    }
}
