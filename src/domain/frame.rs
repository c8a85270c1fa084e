// Frame and display mode domain models
use core::convert::Infallible;
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;

/// Scale every channel by a 0-100 brightness percentage.
pub fn scale_brightness(color: Rgb888, brightness: u8) -> Rgb888 {
    let percent = u16::from(brightness.min(100));
    let scale = |c: u8| ((u16::from(c) * percent) / 100) as u8;
    Rgb888::new(scale(color.r()), scale(color.g()), scale(color.b()))
}

/// Which informational layout is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DisplayMode {
    #[default]
    Main,
    Info,
}

impl DisplayMode {
    pub fn toggled(self) -> Self {
        match self {
            DisplayMode::Main => DisplayMode::Info,
            DisplayMode::Info => DisplayMode::Main,
        }
    }
}

/// A complete width x height RGB image, row-major. Drawing goes through
/// `DrawTarget`, so anything embedded-graphics can render lands here clipped
/// to the frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u16,
    height: u16,
    pixels: Vec<Rgb888>,
}

impl Frame {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgb888::BLACK; usize::from(width) * usize::from(height)],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn dimensions(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    pub fn get(&self, x: u16, y: u16) -> Option<Rgb888> {
        if x < self.width && y < self.height {
            Some(self.pixels[self.index(x, y)])
        } else {
            None
        }
    }

    /// Set a pixel; coordinates outside the frame are clipped silently.
    pub fn set(&mut self, x: i32, y: i32, color: Rgb888) {
        if x < 0 || y < 0 || x >= i32::from(self.width) || y >= i32::from(self.height) {
            return;
        }
        let idx = self.index(x as u16, y as u16);
        self.pixels[idx] = color;
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Rgb888]> {
        self.pixels.chunks(usize::from(self.width.max(1)))
    }

    fn index(&self, x: u16, y: u16) -> usize {
        usize::from(y) * usize::from(self.width) + usize::from(x)
    }
}

impl OriginDimensions for Frame {
    fn size(&self) -> Size {
        Size::new(u32::from(self.width), u32::from(self.height))
    }
}

impl DrawTarget for Frame {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set(point.x, point.y, color);
        }
        Ok(())
    }
}
