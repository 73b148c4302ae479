//! # Sun Position and Sidereal Time
//!
//! Low-precision analytic sun (Astronomical Almanac, accurate to ~0.01° over
//! 1950–2050) and Greenwich Mean Sidereal Time. Together they place the
//! subsolar point: latitude is the sun's declination, longitude is its right
//! ascension minus GMST.
//!
//! All formulas take degrees at the API and convert to radians right before
//! calling a trigonometric function.

use crate::instant::Instant;
use crate::GeoPoint;
use serde::{Deserialize, Serialize};

/// GMST at J2000.0 in degrees.
const GMST_BASE_DEG: f64 = 280.460_618_37;
/// Sidereal rotation per solar day in degrees.
const GMST_ROTATION_PER_DAY: f64 = 360.985_647_366_29;
const GMST_CORRECTION: f64 = 0.000_387_933;

/// Map any angle into [0, 360).
///
/// ```
/// use terminator_lib::solar::normalize_degrees;
///
/// assert_eq!(normalize_degrees(370.0), 10.0);
/// assert_eq!(normalize_degrees(-190.0), 170.0);
/// ```
pub fn normalize_degrees(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid rounds tiny negatives up to exactly 360
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Map any longitude into (-180, 180].
pub fn normalize_longitude(deg: f64) -> f64 {
    let wrapped = normalize_degrees(deg + 540.0) - 180.0;
    if wrapped <= -180.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}

/// `asin` with its argument clamped to [-1, 1] so rounding noise never yields NaN.
pub(crate) fn asin_deg(value: f64) -> f64 {
    value.clamp(-1.0, 1.0).asin().to_degrees()
}

/// Greenwich Mean Sidereal Time in degrees, linear in days since J2000.0.
pub fn gmst_degrees(instant: &Instant) -> f64 {
    let n = instant.days_since_j2000();
    normalize_degrees(GMST_BASE_DEG + GMST_ROTATION_PER_DAY * n)
}

/// GMST including the quadratic and cubic century terms.
///
/// Differs from [`gmst_degrees`] by well under a millidegree this century.
pub fn gmst_degrees_precise(instant: &Instant) -> f64 {
    let n = instant.days_since_j2000();
    let t = n / 36_525.0;
    normalize_degrees(
        GMST_BASE_DEG + GMST_ROTATION_PER_DAY * n + GMST_CORRECTION * t * t
            - t * t * t / 38_710_000.0,
    )
}

/// Mean obliquity of the ecliptic in degrees for `n` days since J2000.0.
pub(crate) fn mean_obliquity_degrees(n: f64) -> f64 {
    23.439_291 - 0.000_000_4 * n
}

/// Geocentric equatorial coordinates in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EquatorialPosition {
    /// Right ascension in [0, 360)
    pub right_ascension_deg: f64,
    /// Declination in [-90, 90]
    pub declination_deg: f64,
}

impl EquatorialPosition {
    /// Convert ecliptic longitude/latitude (degrees) with obliquity `epsilon_deg`.
    pub fn from_ecliptic(lon_deg: f64, lat_deg: f64, epsilon_deg: f64) -> Self {
        let (lambda, beta, eps) = (
            lon_deg.to_radians(),
            lat_deg.to_radians(),
            epsilon_deg.to_radians(),
        );
        let declination_deg =
            asin_deg(beta.sin() * eps.cos() + beta.cos() * eps.sin() * lambda.sin());
        let right_ascension_deg = normalize_degrees(
            (lambda.sin() * eps.cos() - beta.tan() * eps.sin())
                .atan2(lambda.cos())
                .to_degrees(),
        );
        Self {
            right_ascension_deg,
            declination_deg,
        }
    }
}

/// The sun's ecliptic longitude in degrees for `n` days since J2000.0.
pub(crate) fn sun_ecliptic_longitude(n: f64) -> f64 {
    let mean_longitude = normalize_degrees(280.460_618_37 + 0.985_647_366_29 * n);
    let mean_anomaly = normalize_degrees(357.527_723_33 + 0.985_600_283_1 * n).to_radians();
    normalize_degrees(
        mean_longitude + 1.915 * mean_anomaly.sin() + 0.020 * (2.0 * mean_anomaly).sin(),
    )
}

/// Apparent geocentric right ascension and declination of the sun.
pub fn sun_position(instant: &Instant) -> EquatorialPosition {
    let n = instant.days_since_j2000();
    EquatorialPosition::from_ecliptic(sun_ecliptic_longitude(n), 0.0, mean_obliquity_degrees(n))
}

/// The point directly beneath `position` when Greenwich is at `gmst_deg`.
pub fn ground_point(position: &EquatorialPosition, gmst_deg: f64) -> GeoPoint {
    GeoPoint {
        lat_deg: position.declination_deg,
        lon_deg: normalize_longitude(position.right_ascension_deg - gmst_deg),
    }
}

/// Where the sun is at the zenith at `instant`.
pub fn subsolar_point(instant: &Instant) -> GeoPoint {
    ground_point(&sun_position(instant), gmst_degrees(instant))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn equinox() -> Instant {
        Instant::parse("2024-03-20T12:00:00Z").unwrap()
    }

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(370.0), 10.0);
        assert_eq!(normalize_degrees(-190.0), 170.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(normalize_degrees(0.0), 0.0);
        assert_eq!(normalize_degrees(-1e-20), 0.0);
        assert!((normalize_degrees(-720.5) - 359.5).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_longitude() {
        assert_eq!(normalize_longitude(0.0), 0.0);
        assert_eq!(normalize_longitude(180.0), 180.0);
        assert_eq!(normalize_longitude(-180.0), 180.0);
        assert_eq!(normalize_longitude(190.0), -170.0);
        assert_eq!(normalize_longitude(-190.0), 170.0);
        assert_eq!(normalize_longitude(540.0), 180.0);
    }

    #[test]
    fn test_gmst_at_j2000() {
        let epoch = Instant::from_ymd_hms(2000, 1, 1, 12, 0, 0).unwrap();
        assert!((gmst_degrees(&epoch) - 280.460_618_37).abs() < 1e-9);
    }

    #[test]
    fn test_gmst_variants_agree() {
        let mut instant = Instant::from_ymd_hms(1990, 1, 1, 0, 0, 0).unwrap();
        for _ in 0..60 {
            let basic = gmst_degrees(&instant);
            let precise = gmst_degrees_precise(&instant);
            let diff = (basic - precise).abs();
            let diff = diff.min(360.0 - diff);
            assert!(diff < 1e-3, "GMST variants differ by {diff} at {instant}");
            instant = instant.checked_add(Duration::days(365)).unwrap();
        }
    }

    #[test]
    fn test_equinox_subsolar_point() {
        let point = subsolar_point(&equinox());
        assert!(point.lat_deg.abs() < 1.0, "latitude {}", point.lat_deg);
        assert!(point.lon_deg.abs() < 5.0, "longitude {}", point.lon_deg);
    }

    #[test]
    fn test_solstice_declination() {
        let june = Instant::parse("2024-06-20T20:51:00Z").unwrap();
        let december = Instant::parse("2024-12-21T09:20:00Z").unwrap();
        assert!((sun_position(&june).declination_deg - 23.44).abs() < 0.05);
        assert!((sun_position(&december).declination_deg + 23.44).abs() < 0.05);
    }

    #[test]
    fn test_subsolar_longitude_moves_west() {
        // One hour later the sun is ~15° further west
        let start = equinox();
        let later = start.checked_add(Duration::hours(1)).unwrap();
        let delta = normalize_longitude(
            subsolar_point(&start).lon_deg - subsolar_point(&later).lon_deg,
        );
        assert!((delta - 15.0).abs() < 0.1, "moved {delta}°");
    }

    #[test]
    fn test_from_ecliptic_on_equinox_point() {
        let position = EquatorialPosition::from_ecliptic(0.0, 0.0, 23.44);
        assert!(position.right_ascension_deg.abs() < 1e-12);
        assert!(position.declination_deg.abs() < 1e-12);

        let summer = EquatorialPosition::from_ecliptic(90.0, 0.0, 23.44);
        assert!((summer.right_ascension_deg - 90.0).abs() < 1e-9);
        assert!((summer.declination_deg - 23.44).abs() < 1e-9);
    }

    #[test]
    fn test_asin_clamps() {
        assert_eq!(asin_deg(1.000_000_1), 90.0);
        assert_eq!(asin_deg(-1.5), -90.0);
    }

    proptest! {
        #[test]
        fn subsolar_point_stays_in_range(secs in 0i64..4_102_444_800) {
            let instant = Instant::from_utc(chrono::DateTime::from_timestamp(secs, 0).unwrap());
            let point = subsolar_point(&instant);
            prop_assert!(point.lon_deg > -180.0 && point.lon_deg <= 180.0);
            prop_assert!(point.lat_deg.abs() <= 23.5);
        }

        #[test]
        fn normalize_longitude_range(deg in -1e6f64..1e6) {
            let lon = normalize_longitude(deg);
            prop_assert!(lon > -180.0 && lon <= 180.0);
        }
    }
}
