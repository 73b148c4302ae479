//! # Terminator Display Core Library
//!
//! This library computes the day/night terminator for an equirectangular world
//! map and blends a day image with a night image along it. It is the engine behind
//! a small fullscreen display on the Raspberry Pi; the window, event loop and
//! image decoding all live outside of this crate.
//!
//! ## Pipeline
//!
//! 1. **Astronomy**: [`solar`] and [`lunar`] turn an [`instant::Instant`] into the
//!    subsolar and sublunar [`GeoPoint`]s (right ascension minus GMST)
//! 2. **Mask**: [`mask`] evaluates the cosine of the solar zenith angle for every
//!    pixel and maps it through a linear twilight ramp, optionally Gaussian blurred
//! 3. **Composite**: [`compositor`] blends day and night per pixel and draws cross
//!    markers for landmarks, the subsolar point and the sublunar point
//! 4. **Hand-off**: [`pipeline`] threads explicit frame state through repeated
//!    updates and publishes finished frames through a latest-value slot
//!
//! ## Map Orientation
//!
//! Row 0 is the north pole (lat = +90°) and column 0 is the western edge of the
//! date line (lon = -180°). The same mapping is used for mask generation and for
//! marker placement, so markers always land on the pixel the mask computed for
//! their coordinates.
//!
//! ## Core Types
//! - [`GeoPoint`]: latitude/longitude pair in degrees
//! - [`TerminatorError`]: every failure the core can report

use serde::{Deserialize, Serialize};
use thiserror::Error;

// Module declarations
pub mod compositor;
pub mod config;
pub mod image;
pub mod instant;
pub mod lunar;
pub mod mask;
pub mod pipeline;
pub mod renderer;
pub mod solar;

pub use compositor::{composite, draw_cross, latlon_to_pixel, CrossStyle, Marker};
pub use image::RgbImage;
pub use instant::Instant;
pub use mask::{IlluminationMask, MaskParams};

/// A location on the Earth's surface in degrees.
///
/// Latitude runs from -90 (south pole) to +90 (north pole). Longitude is kept
/// in (-180, 180] by everything in this crate that produces a `GeoPoint`.
///
/// # Example
/// ```
/// use terminator_lib::GeoPoint;
///
/// let null_island = GeoPoint::new(0.0, 0.0);
/// let opposite = null_island.antipode();
/// assert_eq!(opposite.lat_deg, 0.0);
/// assert_eq!(opposite.lon_deg, 180.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees, positive north
    pub lat_deg: f64,
    /// Longitude in degrees, positive east
    pub lon_deg: f64,
}

impl GeoPoint {
    pub const fn new(lat_deg: f64, lon_deg: f64) -> Self {
        Self { lat_deg, lon_deg }
    }

    /// The point on the opposite side of the globe.
    pub fn antipode(&self) -> Self {
        Self {
            lat_deg: -self.lat_deg,
            lon_deg: solar::normalize_longitude(self.lon_deg + 180.0),
        }
    }
}

/// Errors reported by the terminator core.
///
/// Every error is returned synchronously to the caller; nothing is retried.
/// The display loop decides whether to keep the previous frame or show a blank one.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TerminatorError {
    /// Malformed caller input (timestamp without a UTC offset, zero-sized image, ...)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Images or masks that must share dimensions do not
    #[error("dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// A numeric argument fell outside the domain of the formula using it
    #[error("numeric domain error: {0}")]
    NumericDomain(String),
}

pub type Result<T> = std::result::Result<T, TerminatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_antipode_wraps_longitude() {
        let tokyo = GeoPoint::new(35.6895, 139.6917);
        let opposite = tokyo.antipode();
        assert!((opposite.lat_deg + 35.6895).abs() < 1e-12);
        assert!((opposite.lon_deg - (139.6917 - 180.0)).abs() < 1e-9);

        let west = GeoPoint::new(10.0, -100.0).antipode();
        assert!((west.lon_deg - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_error_messages() {
        let err = TerminatorError::DimensionMismatch {
            expected: (800, 400),
            actual: (400, 800),
        };
        assert_eq!(
            err.to_string(),
            "dimension mismatch: expected (800, 400), got (400, 800)"
        );
        assert_eq!(
            TerminatorError::InvalidInput("width is zero".into()).to_string(),
            "invalid input: width is zero"
        );
    }
}
