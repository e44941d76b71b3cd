//! 1-bit page-organized framebuffer in the SSD1306 memory layout.
//!
//! Each byte covers eight vertically stacked pixels; page `p` holds rows
//! `8p..8p+8`. Text is rendered with `embedded-graphics`, through
//! [`draw_text`] so the simulated panel and the real one use the same font.

use core::convert::Infallible;

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};

/// Draw `text` on any 1-bit target with its top-left corner at (x, y).
pub fn draw_text<D>(target: &mut D, text: &str, x: i32, y: i32) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
    Text::with_baseline(text, Point::new(x, y), style, Baseline::Top).draw(target)?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pages: Vec<u8>,
}

impl FrameBuffer {
    /// `height` is rounded up to whole pages.
    pub fn new(width: u32, height: u32) -> Self {
        let pages = height.div_ceil(8) as usize;
        Self {
            width,
            height,
            pages: vec![0; (width as usize).saturating_mul(pages)],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw page data, row-major by page.
    pub fn pages(&self) -> &[u8] {
        &self.pages
    }

    pub fn clear(&mut self) {
        self.pages.fill(0);
    }

    fn index(&self, x: i32, y: i32) -> Option<(usize, u8)> {
        let x = u32::try_from(x).ok()?;
        let y = u32::try_from(y).ok()?;
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y / 8) as usize * self.width as usize + x as usize;
        Some((i, 1 << (y % 8)))
    }

    pub fn pixel(&self, x: i32, y: i32) -> bool {
        self.index(x, y)
            .is_some_and(|(i, bit)| self.pages[i] & bit != 0)
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, on: bool) {
        if let Some((i, bit)) = self.index(x, y) {
            if on {
                self.pages[i] |= bit;
            } else {
                self.pages[i] &= !bit;
            }
        }
    }

    /// Number of lit pixels.
    pub fn lit(&self) -> u32 {
        self.pages.iter().map(|b| b.count_ones()).sum()
    }

    /// Draw `text` with its top-left corner at (x, y). Off-panel pixels are clipped.
    pub fn draw_text(&mut self, text: &str, x: i32, y: i32) {
        let Ok(()) = draw_text(self, text, x, y);
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for FrameBuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, color) in pixels {
            self.set_pixel(p.x, p.y, color.is_on());
        }
        Ok(())
    }
}
