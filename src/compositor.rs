//! # Day/Night Compositing and Marker Overlay
//!
//! Blends the day and night rasters through an [`IlluminationMask`] into a fresh
//! image and draws cross markers on it. The source rasters are only ever read.
//!
//! Marker placement uses the inverse of the mask's pixel mapping,
//! `x = (lon + 180) / 360 · w` and `y = (90 − lat) / 180 · h`, truncated to whole
//! pixels, so a marker sits on the pixel whose mask value describes it.

use crate::image::RgbImage;
use crate::mask::IlluminationMask;
use crate::{GeoPoint, Result, TerminatorError};
use embedded_graphics::{
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
};
use serde::{Deserialize, Serialize};

/// Landmarks are red.
pub const LANDMARK_COLOR: Rgb888 = Rgb888::new(255, 0, 0);
/// The subsolar point is yellow.
pub const SUBSOLAR_COLOR: Rgb888 = Rgb888::new(255, 255, 0);
/// The sublunar point is cyan.
pub const SUBLUNAR_COLOR: Rgb888 = Rgb888::new(0, 255, 255);

/// Size of a cross marker in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossStyle {
    /// Pixels from the centre to the end of each arm
    pub arm_length: u32,
    /// Thickness of both bars; 0 draws nothing
    pub line_width: u32,
}

impl Default for CrossStyle {
    fn default() -> Self {
        Self {
            arm_length: 6,
            line_width: 2,
        }
    }
}

/// A cross to draw at a location.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Marker {
    pub point: GeoPoint,
    pub color: Rgb888,
}

impl Marker {
    pub fn new(point: GeoPoint, color: Rgb888) -> Self {
        Self { point, color }
    }
}

/// Blend `day` and `night` per pixel: `day·m + night·(1 − m)`.
///
/// All three inputs must share dimensions.
pub fn composite(day: &RgbImage, night: &RgbImage, mask: &IlluminationMask) -> Result<RgbImage> {
    if day.dimensions() != night.dimensions() {
        return Err(TerminatorError::DimensionMismatch {
            expected: day.dimensions(),
            actual: night.dimensions(),
        });
    }
    if day.dimensions() != mask.dimensions() {
        return Err(TerminatorError::DimensionMismatch {
            expected: day.dimensions(),
            actual: mask.dimensions(),
        });
    }

    let bytes: Vec<u8> = day
        .as_bytes()
        .chunks_exact(3)
        .zip(night.as_bytes().chunks_exact(3))
        .zip(mask.values().iter())
        .flat_map(|((d, n), &m)| {
            let blend = |day: u8, night: u8| {
                (f64::from(day) * m + f64::from(night) * (1.0 - m))
                    .round()
                    .clamp(0.0, 255.0) as u8
            };
            [blend(d[0], n[0]), blend(d[1], n[1]), blend(d[2], n[2])]
        })
        .collect();

    RgbImage::from_raw(day.width(), day.height(), bytes)
}

/// Pixel that `point` lands on in a `width`×`height` map (may be out of bounds).
pub fn latlon_to_pixel(point: GeoPoint, width: u32, height: u32) -> (i32, i32) {
    let x = ((point.lon_deg + 180.0) / 360.0 * f64::from(width)).floor();
    let y = ((90.0 - point.lat_deg) / 180.0 * f64::from(height)).floor();
    (x as i32, y as i32)
}

/// Draw a cross centred on `point`, clipped to the image.
///
/// Each bar spans `2·arm_length + 1` pixels. With an even `line_width` the
/// extra row/column falls above/left of the centre.
pub fn draw_cross(image: &mut RgbImage, point: GeoPoint, color: Rgb888, style: CrossStyle) {
    if style.line_width == 0 || image.width() == 0 {
        return;
    }
    let (cx, cy) = latlon_to_pixel(point, image.width(), image.height());
    // Longitude 180° is column 0, as in the mask
    let cx = cx.rem_euclid(image.width() as i32);
    let arm = style.arm_length as i32;
    let span = 2 * style.arm_length + 1;
    let offset = (style.line_width / 2) as i32;
    let fill = PrimitiveStyle::with_fill(color);

    Rectangle::new(
        Point::new(cx - arm, cy - offset),
        Size::new(span, style.line_width),
    )
    .into_styled(fill)
    .draw(image)
    .ok();
    Rectangle::new(
        Point::new(cx - offset, cy - arm),
        Size::new(style.line_width, span),
    )
    .into_styled(fill)
    .draw(image)
    .ok();
}

/// Draw `markers` in order; later markers paint over earlier ones.
pub fn draw_markers(image: &mut RgbImage, markers: &[Marker], style: CrossStyle) {
    for marker in markers {
        draw_cross(image, marker.point, marker.color, style);
    }
}

/// Where to put an image on a screen: centred, scaled to fit, aspect kept.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub offset_x: i32,
    pub offset_y: i32,
    pub width: u32,
    pub height: u32,
    pub scale: f64,
}

/// Fit an `image` of the given size inside `screen`, centred.
pub fn fit_within(image: (u32, u32), screen: (u32, u32)) -> Result<Placement> {
    if image.0 == 0 || image.1 == 0 {
        return Err(TerminatorError::InvalidInput(format!(
            "image dimensions must be positive, got {}x{}",
            image.0, image.1
        )));
    }
    let scale = (f64::from(screen.0) / f64::from(image.0)).min(f64::from(screen.1) / f64::from(image.1));
    let width = (f64::from(image.0) * scale) as u32;
    let height = (f64::from(image.1) * scale) as u32;
    Ok(Placement {
        offset_x: (screen.0 as i32 - width as i32) / 2,
        offset_y: (screen.1 as i32 - height as i32) / 2,
        width,
        height,
        scale,
    })
}
