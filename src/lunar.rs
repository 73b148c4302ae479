//! Moon position from a truncated ELP-2000/82 periodic series (Meeus 1998, ch. 47)
//!
//! Keeps the 25 largest longitude terms, 15 latitude terms and 13 distance
//! terms plus the Venus/Jupiter/flattening additive corrections.
//! Accuracy: ~0.05° in λ, ~0.02° in β, a few hundred km in Δ. That is well
//! below one pixel on any display this crate targets; a mean-motion-only moon
//! would be off by up to 6°.

use crate::instant::Instant;
use crate::solar::{
    gmst_degrees, ground_point, mean_obliquity_degrees, normalize_degrees,
    sun_ecliptic_longitude, EquatorialPosition,
};
use crate::GeoPoint;
use core::f64::consts::PI;
use serde::{Deserialize, Serialize};

/// Everything the lunar series computes for one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LunarEphemeris {
    /// Geocentric ecliptic longitude (deg, of date).
    pub lon_deg: f64,
    /// Geocentric ecliptic latitude (deg).
    pub lat_deg: f64,
    /// Earth–Moon centre distance (km).
    pub distance_km: f64,
    /// Illuminated fraction of the disc (0 = new, 1 = full).
    pub illum_frac: f64,
}

/// One periodic term: multipliers of D, M, M', F and the coefficient.
type Term = (i8, i8, i8, i8, f64);

/// Longitude terms, coefficients in 1e-6 degrees.
const LONGITUDE_TERMS: [Term; 25] = [
    (0, 0, 1, 0, 6_288_774.0),
    (2, 0, -1, 0, 1_274_027.0),
    (2, 0, 0, 0, 658_314.0),
    (0, 0, 2, 0, 213_618.0),
    (0, 1, 0, 0, -185_116.0),
    (0, 0, 0, 2, -114_332.0),
    (2, 0, -2, 0, 58_793.0),
    (2, -1, -1, 0, 57_066.0),
    (2, 0, 1, 0, 53_322.0),
    (2, -1, 0, 0, 45_758.0),
    (0, 1, -1, 0, -40_923.0),
    (1, 0, 0, 0, -34_720.0),
    (0, 1, 1, 0, -30_383.0),
    (2, 0, 0, -2, 15_327.0),
    (0, 0, 1, 2, -12_528.0),
    (0, 0, 1, -2, 10_980.0),
    (4, 0, -1, 0, 10_675.0),
    (0, 0, 3, 0, 10_034.0),
    (4, 0, -2, 0, 8_548.0),
    (2, 1, -1, 0, -7_888.0),
    (2, 1, 0, 0, -6_766.0),
    (1, 0, -1, 0, -5_163.0),
    (1, 1, 0, 0, 4_987.0),
    (2, -1, 1, 0, 4_036.0),
    (2, 0, 2, 0, 3_994.0),
];

/// Latitude terms, coefficients in 1e-6 degrees.
const LATITUDE_TERMS: [Term; 15] = [
    (0, 0, 0, 1, 5_128_122.0),
    (0, 0, 1, 1, 280_602.0),
    (0, 0, 1, -1, 277_693.0),
    (2, 0, 0, -1, 173_237.0),
    (2, 0, -1, 1, 55_413.0),
    (2, 0, -1, -1, 46_271.0),
    (2, 0, 0, 1, 32_573.0),
    (0, 0, 2, 1, 17_198.0),
    (2, 0, 1, -1, 9_266.0),
    (0, 0, 2, -1, 8_822.0),
    (2, -1, 0, -1, 8_216.0),
    (2, 0, -2, -1, 4_324.0),
    (2, 0, 1, 1, 4_200.0),
    (2, 1, 0, -1, -3_359.0),
    (2, -1, -1, 1, 2_463.0),
];

/// Distance terms (cosine series), coefficients in metres.
const DISTANCE_TERMS: [Term; 13] = [
    (0, 0, 1, 0, -20_905_355.0),
    (2, 0, -1, 0, -3_699_111.0),
    (2, 0, 0, 0, -2_955_968.0),
    (0, 0, 2, 0, -569_925.0),
    (0, 1, 0, 0, 48_888.0),
    (0, 0, 0, 2, -3_149.0),
    (2, 0, -2, 0, 246_158.0),
    (2, -1, -1, 0, -152_138.0),
    (2, 0, 1, 0, -170_733.0),
    (2, -1, 0, 0, -204_586.0),
    (0, 1, -1, 0, -129_620.0),
    (1, 0, 0, 0, 108_743.0),
    (0, 1, 1, 0, 104_755.0),
];

/// Fundamental arguments (radians) and the eccentricity factor for century `t`.
struct Arguments {
    mean_longitude: f64,
    elongation: f64,
    sun_anomaly: f64,
    moon_anomaly: f64,
    latitude_argument: f64,
    eccentricity: f64,
}

impl Arguments {
    fn at(t: f64) -> Self {
        let rad = |deg: f64| normalize_degrees(deg) * PI / 180.0;
        Self {
            mean_longitude: rad(218.316_447_7 + 481_267.881_234_21 * t),
            elongation: rad(297.850_192_1 + 445_267.111_403_4 * t),
            sun_anomaly: rad(357.529_109_2 + 35_999.050_290_9 * t),
            moon_anomaly: rad(134.963_396_4 + 477_198.867_505_5 * t),
            latitude_argument: rad(93.272_095_0 + 483_202.017_523_3 * t),
            eccentricity: 1.0 - 0.002_516 * t - 0.000_007_4 * t * t,
        }
    }

    /// Angle of a term plus its eccentricity weight (E per unit of M).
    fn term(&self, &(d, m, mp, f, coeff): &Term) -> (f64, f64) {
        let angle = f64::from(d) * self.elongation
            + f64::from(m) * self.sun_anomaly
            + f64::from(mp) * self.moon_anomaly
            + f64::from(f) * self.latitude_argument;
        let weight = self.eccentricity.powi(i32::from(m.unsigned_abs()));
        (angle, coeff * weight)
    }
}

/// Compute the Moon's geocentric ecliptic position at `instant`.
pub fn moon_ephemeris(instant: &Instant) -> LunarEphemeris {
    let t = instant.julian_centuries();
    let args = Arguments::at(t);

    // Venus, Jupiter and Earth-flattening perturbations
    let a1 = normalize_degrees(119.75 + 131.849 * t).to_radians();
    let a2 = normalize_degrees(53.09 + 479_264.290 * t).to_radians();
    let a3 = normalize_degrees(313.45 + 481_266.484 * t).to_radians();
    let (lp, mp, f) = (args.mean_longitude, args.moon_anomaly, args.latitude_argument);

    let mut sum_l: f64 = LONGITUDE_TERMS
        .iter()
        .map(|term| {
            let (angle, coeff) = args.term(term);
            coeff * angle.sin()
        })
        .sum();
    sum_l += 3958.0 * a1.sin() + 1962.0 * (lp - f).sin() + 318.0 * a2.sin();

    let mut sum_b: f64 = LATITUDE_TERMS
        .iter()
        .map(|term| {
            let (angle, coeff) = args.term(term);
            coeff * angle.sin()
        })
        .sum();
    sum_b += -2235.0 * lp.sin()
        + 382.0 * a3.sin()
        + 175.0 * (a1 - f).sin()
        + 175.0 * (a1 + f).sin()
        + 127.0 * (lp - mp).sin()
        - 115.0 * (lp + mp).sin();

    let sum_r: f64 = DISTANCE_TERMS
        .iter()
        .map(|term| {
            let (angle, coeff) = args.term(term);
            coeff * angle.cos()
        })
        .sum();

    let lon_deg = normalize_degrees(lp.to_degrees() + sum_l / 1e6);
    let lat_deg = sum_b / 1e6;
    let distance_km = 385_000.56 + sum_r / 1000.0;

    // Elongation from the sun drives the phase
    let sun_lon = sun_ecliptic_longitude(instant.days_since_j2000()).to_radians();
    let cos_elongation = lat_deg.to_radians().cos() * (lon_deg.to_radians() - sun_lon).cos();
    let illum_frac = ((1.0 - cos_elongation) / 2.0).clamp(0.0, 1.0);

    LunarEphemeris {
        lon_deg,
        lat_deg,
        distance_km,
        illum_frac,
    }
}

/// Apparent geocentric right ascension and declination of the Moon.
pub fn moon_position(instant: &Instant) -> EquatorialPosition {
    let eph = moon_ephemeris(instant);
    EquatorialPosition::from_ecliptic(
        eph.lon_deg,
        eph.lat_deg,
        mean_obliquity_degrees(instant.days_since_j2000()),
    )
}

/// Where the Moon is at the zenith at `instant`.
pub fn sublunar_point(instant: &Instant) -> GeoPoint {
    ground_point(&moon_position(instant), gmst_degrees(instant))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_meeus_example_47a() {
        // 1992-04-12 00:00 TD: λ = 133.162655°, β = -3.229126°, Δ = 368409.7 km.
        // ΔT (~59 s) shifts the moon by ~0.01°, inside the truncation error.
        let instant = Instant::from_ymd_hms(1992, 4, 12, 0, 0, 0).unwrap();
        let eph = moon_ephemeris(&instant);
        assert!((eph.lon_deg - 133.162_655).abs() < 0.1, "λ = {}", eph.lon_deg);
        assert!((eph.lat_deg + 3.229_126).abs() < 0.05, "β = {}", eph.lat_deg);
        assert!((eph.distance_km - 368_409.7).abs() < 500.0, "Δ = {}", eph.distance_km);
    }

    #[test]
    fn test_meeus_example_47a_equatorial() {
        // Apparent α = 134.688470°, δ = 13.768368° (nutation not applied here)
        let instant = Instant::from_ymd_hms(1992, 4, 12, 0, 0, 0).unwrap();
        let position = moon_position(&instant);
        assert!((position.right_ascension_deg - 134.688_470).abs() < 0.1);
        assert!((position.declination_deg - 13.768_368).abs() < 0.1);
    }

    #[test]
    fn test_full_and_new_moon_illumination() {
        // Full moon 2024-01-25 17:54 UTC, new moon 2024-02-09 22:59 UTC
        let full = Instant::parse("2024-01-25T17:54:00Z").unwrap();
        let new = Instant::parse("2024-02-09T22:59:00Z").unwrap();
        assert!(moon_ephemeris(&full).illum_frac > 0.98);
        assert!(moon_ephemeris(&new).illum_frac < 0.02);
    }

    #[test]
    fn test_declination_bounded_by_lunar_standstill() {
        let mut instant = Instant::from_ymd_hms(2024, 1, 1, 0, 0, 0).unwrap();
        for _ in 0..400 {
            let point = sublunar_point(&instant);
            assert!(point.lat_deg.abs() < 29.5, "lat {} at {instant}", point.lat_deg);
            assert!(point.lon_deg > -180.0 && point.lon_deg <= 180.0);
            instant = instant.checked_add(Duration::hours(22)).unwrap();
        }
    }

    #[test]
    fn test_sublunar_point_drifts_east_day_to_day() {
        // Same clock time a day later: the ground track sits ~12° further east
        let start = Instant::parse("2024-03-20T12:00:00Z").unwrap();
        let next = start.checked_add(Duration::days(1)).unwrap();
        let delta = crate::solar::normalize_longitude(
            sublunar_point(&next).lon_deg - sublunar_point(&start).lon_deg,
        );
        assert!((9.0..16.0).contains(&delta), "drift {delta}°");
    }
}
