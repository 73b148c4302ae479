//! RGB raster shared by the compositor and the display layer.
//!
//! Pixels are stored row-major as packed RGB888 bytes, the layout display
//! surfaces expect for direct upload. The buffer doubles as an
//! `embedded-graphics` draw target so markers can be drawn with its primitives.

use crate::{Result, TerminatorError};
use core::convert::Infallible;
use embedded_graphics::{pixelcolor::Rgb888, prelude::*};

/// Owned RGB image, row 0 at the top.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbImage {
    width: u32,
    height: u32,
    buffer: Vec<u8>,
}

impl RgbImage {
    /// Image filled with a single colour.
    pub fn filled(width: u32, height: u32, color: Rgb888) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(TerminatorError::InvalidInput(format!(
                "image dimensions must be positive, got {width}x{height}"
            )));
        }
        let pixels = (width as usize) * (height as usize);
        let mut buffer = Vec::with_capacity(pixels * 3);
        for _ in 0..pixels {
            buffer.extend_from_slice(&[color.r(), color.g(), color.b()]);
        }
        Ok(Self {
            width,
            height,
            buffer,
        })
    }

    /// Wrap packed RGB bytes; `bytes.len()` must be `width * height * 3`.
    pub fn from_raw(width: u32, height: u32, bytes: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(TerminatorError::InvalidInput(format!(
                "image dimensions must be positive, got {width}x{height}"
            )));
        }
        let expected = (width as usize) * (height as usize) * 3;
        if bytes.len() != expected {
            return Err(TerminatorError::InvalidInput(format!(
                "{width}x{height} RGB image needs {expected} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self {
            width,
            height,
            buffer: bytes,
        })
    }

    /// Build an image by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> Rgb888) -> Result<Self> {
        let mut image = Self::filled(width, height, Rgb888::BLACK)?;
        for y in 0..height {
            for x in 0..width {
                image.set_pixel(x, y, f(x, y));
            }
        }
        Ok(image)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Packed RGB bytes, row-major.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(((y as usize) * (self.width as usize) + x as usize) * 3)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb888> {
        let i = self.offset(x, y)?;
        Some(Rgb888::new(
            self.buffer[i],
            self.buffer[i + 1],
            self.buffer[i + 2],
        ))
    }

    /// Set one pixel; coordinates outside the image are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgb888) {
        if let Some(i) = self.offset(x, y) {
            self.buffer[i] = color.r();
            self.buffer[i + 1] = color.g();
            self.buffer[i + 2] = color.b();
        }
    }

    pub fn fill(&mut self, color: Rgb888) {
        for chunk in self.buffer.chunks_exact_mut(3) {
            chunk.copy_from_slice(&[color.r(), color.g(), color.b()]);
        }
    }
}

impl OriginDimensions for RgbImage {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for RgbImage {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> core::result::Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            // Clip anything left of or above the origin; set_pixel clips the rest
            if point.x >= 0 && point.y >= 0 {
                self.set_pixel(point.x as u32, point.y as u32, color);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};

    #[test]
    fn test_filled_and_pixel_access() {
        let image = RgbImage::filled(4, 3, Rgb888::new(10, 20, 30)).unwrap();
        assert_eq!(image.dimensions(), (4, 3));
        assert_eq!(image.as_bytes().len(), 36);
        assert_eq!(image.pixel(3, 2), Some(Rgb888::new(10, 20, 30)));
        assert_eq!(image.pixel(4, 0), None);
    }

    #[test]
    fn test_from_raw_checks_length() {
        assert!(RgbImage::from_raw(2, 2, vec![0; 12]).is_ok());
        assert!(matches!(
            RgbImage::from_raw(2, 2, vec![0; 11]),
            Err(TerminatorError::InvalidInput(_))
        ));
        assert!(RgbImage::from_raw(0, 2, vec![]).is_err());
    }

    #[test]
    fn test_set_pixel_ignores_out_of_bounds() {
        let mut image = RgbImage::filled(2, 2, Rgb888::BLACK).unwrap();
        image.set_pixel(5, 5, Rgb888::WHITE);
        assert!(image.as_bytes().iter().all(|&b| b == 0));
        image.set_pixel(1, 0, Rgb888::RED);
        assert_eq!(&image.as_bytes()[3..6], &[255, 0, 0]);
    }

    #[test]
    fn test_draw_target_clips() {
        let mut image = RgbImage::filled(4, 4, Rgb888::BLACK).unwrap();
        Rectangle::new(Point::new(-2, -2), Size::new(4, 4))
            .into_styled(PrimitiveStyle::with_fill(Rgb888::GREEN))
            .draw(&mut image)
            .ok();
        assert_eq!(image.pixel(0, 0), Some(Rgb888::GREEN));
        assert_eq!(image.pixel(1, 1), Some(Rgb888::GREEN));
        assert_eq!(image.pixel(2, 2), Some(Rgb888::BLACK));
    }

    #[test]
    fn test_from_fn_layout() {
        let image = RgbImage::from_fn(3, 2, |x, y| Rgb888::new(x as u8, y as u8, 0)).unwrap();
        assert_eq!(image.pixel(2, 1), Some(Rgb888::new(2, 1, 0)));
        assert_eq!(&image.as_bytes()[15..18], &[2, 1, 0]);
    }
}
