//! # Terminator Mask Generation
//!
//! Builds an [`IlluminationMask`]: one daylight fraction in [0, 1] per pixel of an
//! equirectangular map. For each pixel the cosine of the solar zenith angle is
//!
//! ```text
//! cos Z = sin(lat)·sin(δ) + cos(lat)·cos(δ)·cos(lon − lon☉)
//! ```
//!
//! and a linear ramp over `[-w, +w]` (the twilight band, `w = 0.02` by default)
//! turns it into a mask value. An optional Gaussian blur softens whatever edge
//! the ramp leaves behind at high latitudes.
//!
//! Two generators produce the raw mask: a per-pixel reference loop and an
//! `ndarray` version that evaluates the same formula over whole latitude and
//! hour-angle grids. They agree to within 1e-6 per pixel; the grid version is the
//! one the pipeline uses.

use crate::compositor::latlon_to_pixel;
use crate::instant::Instant;
use crate::solar::subsolar_point;
use crate::{GeoPoint, Result, TerminatorError};
use log::{debug, warn};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Half-width of the twilight band in units of cos Z.
pub const DEFAULT_TWILIGHT_HALF_WIDTH: f64 = 0.02;

/// Blur radius (Gaussian sigma, in pixels) applied after the ramp.
pub const DEFAULT_BLUR_RADIUS: f64 = 4.0;

/// Tunable mask parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaskParams {
    /// Ramp runs from cos Z = -w (night) to cos Z = +w (day). Zero gives a hard edge.
    pub twilight_half_width: f64,
    /// Gaussian blur sigma in pixels; 0 disables the blur.
    pub blur_radius: f64,
}

impl Default for MaskParams {
    fn default() -> Self {
        Self {
            twilight_half_width: DEFAULT_TWILIGHT_HALF_WIDTH,
            blur_radius: DEFAULT_BLUR_RADIUS,
        }
    }
}

impl MaskParams {
    pub fn validate(&self) -> Result<()> {
        if !self.twilight_half_width.is_finite() || self.twilight_half_width < 0.0 {
            return Err(TerminatorError::InvalidInput(format!(
                "twilight half-width must be a non-negative number, got {}",
                self.twilight_half_width
            )));
        }
        if !self.blur_radius.is_finite() || self.blur_radius < 0.0 {
            return Err(TerminatorError::InvalidInput(format!(
                "blur radius must be a non-negative number, got {}",
                self.blur_radius
            )));
        }
        Ok(())
    }
}

/// Per-pixel daylight fraction. Row 0 is lat +90°, column 0 is lon -180°.
#[derive(Clone, Debug, PartialEq)]
pub struct IlluminationMask {
    values: Array2<f64>,
}

impl IlluminationMask {
    /// A mask with every pixel set to `value` (clamped to [0, 1]).
    pub fn filled(width: u32, height: u32, value: f64) -> Result<Self> {
        check_dimensions(width, height)?;
        Ok(Self {
            values: Array2::from_elem((height as usize, width as usize), value.clamp(0.0, 1.0)),
        })
    }

    /// Wrap a `(height, width)` array. Values are clamped to [0, 1].
    pub fn from_array(values: Array2<f64>) -> Result<Self> {
        let (height, width) = values.dim();
        array_dimensions(width, height)?;
        if values.iter().any(|v| v.is_nan()) {
            return Err(TerminatorError::NumericDomain("mask contains NaN".into()));
        }
        Ok(Self {
            values: values.mapv(|v| v.clamp(0.0, 1.0)),
        })
    }

    pub fn width(&self) -> u32 {
        self.values.ncols() as u32
    }

    pub fn height(&self) -> u32 {
        self.values.nrows() as u32
    }

    /// `(width, height)`
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    pub fn get(&self, x: u32, y: u32) -> Option<f64> {
        self.values.get((y as usize, x as usize)).copied()
    }

    /// Mask value at the pixel that `point` maps to. Longitude 180° wraps to column 0.
    pub fn at(&self, point: GeoPoint) -> Option<f64> {
        let (x, y) = latlon_to_pixel(point, self.width(), self.height());
        if y < 0 {
            return None;
        }
        self.get(x.rem_euclid(self.width() as i32) as u32, y as u32)
    }

    /// Raw `(height, width)` values.
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Gaussian-blurred copy with sigma `radius` pixels. Rows wrap around the
    /// date line; columns clamp at the poles.
    pub fn blurred(&self, radius: f64) -> Self {
        if radius <= 0.0 {
            return self.clone();
        }
        Self {
            values: gaussian_blur(&self.values, radius),
        }
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(TerminatorError::InvalidInput(format!(
            "image dimensions must be positive, got {width}x{height}"
        )));
    }
    Ok(())
}

/// `(width, height)` of an array shape as pixel dimensions.
fn array_dimensions(width: usize, height: usize) -> Result<(u32, u32)> {
    let too_large = |_| {
        TerminatorError::InvalidInput(format!("mask of {width}x{height} exceeds u32 dimensions"))
    };
    let dims = (
        u32::try_from(width).map_err(too_large)?,
        u32::try_from(height).map_err(too_large)?,
    );
    check_dimensions(dims.0, dims.1)?;
    Ok(dims)
}

/// Latitude (deg) of pixel row `y`.
pub fn pixel_latitude(y: f64, height: u32) -> f64 {
    90.0 - (y / f64::from(height)) * 180.0
}

/// Longitude (deg) of pixel column `x`.
pub fn pixel_longitude(x: f64, width: u32) -> f64 {
    (x / f64::from(width)) * 360.0 - 180.0
}

/// Cosine of the solar zenith angle at `(lat_deg, lon_deg)` for a sun over `subsolar`.
pub fn cos_zenith(lat_deg: f64, lon_deg: f64, subsolar: &GeoPoint) -> f64 {
    let lat = lat_deg.to_radians();
    let decl = subsolar.lat_deg.to_radians();
    let hour_angle = lon_deg.to_radians() - subsolar.lon_deg.to_radians();
    lat.sin() * decl.sin() + lat.cos() * decl.cos() * hour_angle.cos()
}

/// Linear twilight ramp: 0 at `cos_z <= -half_width`, 1 at `cos_z >= half_width`.
pub fn ramp(cos_z: f64, half_width: f64) -> f64 {
    if half_width <= 0.0 {
        return if cos_z >= 0.0 { 1.0 } else { 0.0 };
    }
    ((cos_z + half_width) / (2.0 * half_width)).clamp(0.0, 1.0)
}

/// Reject NaN/infinite sun positions and pull declinations back onto the sphere.
fn sanitize_subsolar(subsolar: &GeoPoint) -> Result<GeoPoint> {
    if !subsolar.lat_deg.is_finite() || !subsolar.lon_deg.is_finite() {
        return Err(TerminatorError::NumericDomain(format!(
            "subsolar point ({}, {}) is not finite",
            subsolar.lat_deg, subsolar.lon_deg
        )));
    }
    if subsolar.lat_deg.abs() > 90.0 {
        warn!(
            "Declination {}° outside [-90, 90]; clamping",
            subsolar.lat_deg
        );
    }
    Ok(GeoPoint::new(subsolar.lat_deg.clamp(-90.0, 90.0), subsolar.lon_deg))
}

/// Reference generator: one zenith evaluation per pixel, no blur.
pub fn generate_mask_scalar(
    width: u32,
    height: u32,
    subsolar: &GeoPoint,
    half_width: f64,
) -> Result<IlluminationMask> {
    check_dimensions(width, height)?;
    let subsolar = sanitize_subsolar(subsolar)?;

    let mut values = Array2::zeros((height as usize, width as usize));
    for y in 0..height {
        let lat = pixel_latitude(f64::from(y), height);
        for x in 0..width {
            let lon = pixel_longitude(f64::from(x), width);
            values[[y as usize, x as usize]] = ramp(cos_zenith(lat, lon, &subsolar), half_width);
        }
    }
    Ok(IlluminationMask { values })
}

/// Grid generator: evaluates the zenith formula over broadcast latitude and
/// hour-angle arrays, no blur.
pub fn generate_mask_vectorized(
    width: u32,
    height: u32,
    subsolar: &GeoPoint,
    half_width: f64,
) -> Result<IlluminationMask> {
    check_dimensions(width, height)?;
    let subsolar = sanitize_subsolar(subsolar)?;

    let (sin_decl, cos_decl) = subsolar.lat_deg.to_radians().sin_cos();
    let subsolar_lon = subsolar.lon_deg.to_radians();

    let lat: Array1<f64> =
        Array1::from_shape_fn(height as usize, |y| pixel_latitude(y as f64, height).to_radians());
    let hour_angle: Array1<f64> = Array1::from_shape_fn(width as usize, |x| {
        pixel_longitude(x as f64, width).to_radians() - subsolar_lon
    });

    // (h, 1) columns against a (1, w) row
    let sin_term = lat.mapv(|l| l.sin() * sin_decl).insert_axis(Axis(1));
    let cos_term = lat.mapv(|l| l.cos() * cos_decl).insert_axis(Axis(1));
    let cos_hour = hour_angle.mapv(f64::cos).insert_axis(Axis(0));

    let cos_z: Array2<f64> = &sin_term + &(&cos_term * &cos_hour);
    Ok(IlluminationMask {
        values: cos_z.mapv(|v| ramp(v, half_width)),
    })
}

/// Full mask for a known subsolar point: grid generator plus optional blur.
pub fn mask_for_point(
    width: u32,
    height: u32,
    subsolar: &GeoPoint,
    params: &MaskParams,
) -> Result<IlluminationMask> {
    params.validate()?;
    let raw = generate_mask_vectorized(width, height, subsolar, params.twilight_half_width)?;
    Ok(raw.blurred(params.blur_radius))
}

/// Illumination mask of a `width`×`height` map at `instant`.
pub fn generate_mask(
    width: u32,
    height: u32,
    instant: &Instant,
    params: &MaskParams,
) -> Result<IlluminationMask> {
    let subsolar = subsolar_point(instant);
    debug!(
        "Mask {}x{} at {}: subsolar ({:.3}, {:.3})",
        width, height, instant, subsolar.lat_deg, subsolar.lon_deg
    );
    mask_for_point(width, height, &subsolar, params)
}

/// Normalized 1D Gaussian taps spanning ±ceil(3σ), at most ±`max_radius`.
/// A sigma too small to square gives the identity kernel.
fn gaussian_kernel(sigma: f64, max_radius: usize) -> Vec<f64> {
    let two_sigma_sq = 2.0 * sigma * sigma;
    if !two_sigma_sq.is_normal() {
        return vec![1.0];
    }
    let radius = (3.0 * sigma).ceil().min(max_radius as f64) as isize;
    let mut kernel: Vec<f64> = (-radius..=radius)
        .map(|i| (-((i * i) as f64) / two_sigma_sq).exp())
        .collect();
    let sum: f64 = kernel.iter().sum();
    kernel.iter_mut().for_each(|k| *k /= sum);
    kernel
}

/// Separable Gaussian blur: horizontal pass wraps, vertical pass clamps.
fn gaussian_blur(values: &Array2<f64>, sigma: f64) -> Array2<f64> {
    let (height, width) = values.dim();
    // Taps past the map size only repeat (rows) or clamp (columns)
    let kernel = gaussian_kernel(sigma, width.max(height));
    let radius = (kernel.len() / 2) as isize;
    let (h, w) = (height as isize, width as isize);

    let horizontal = Array2::from_shape_fn((height, width), |(y, x)| {
        kernel
            .iter()
            .enumerate()
            .map(|(k, weight)| {
                let sx = (x as isize + k as isize - radius).rem_euclid(w);
                weight * values[[y, sx as usize]]
            })
            .sum::<f64>()
    });

    Array2::from_shape_fn((height, width), |(y, x)| {
        kernel
            .iter()
            .enumerate()
            .map(|(k, weight)| {
                let sy = (y as isize + k as isize - radius).clamp(0, h - 1);
                weight * horizontal[[sy as usize, x]]
            })
            .sum::<f64>()
            .clamp(0.0, 1.0)
    })
}
