//! # Terminal Map Rendering
//!
//! Development mode output: draws a frame's illumination mask as ASCII so the
//! terminator can be checked over SSH without the HyperPixel attached.
//!
//! Cells sample the mask at their centre: `#` day, `.` night, `:` twilight.
//! Markers overwrite cells: `+` landmarks, `S` the subsolar point, `M` the
//! sublunar point.

use crate::compositor::latlon_to_pixel;
use crate::mask::IlluminationMask;
use crate::pipeline::Frame;
use crate::GeoPoint;

/// Mask value above which a cell counts as full day.
const DAY_THRESHOLD: f64 = 0.99;
/// Mask value below which a cell counts as full night.
const NIGHT_THRESHOLD: f64 = 0.01;

/// Render `mask` on a `cols`×`rows` character grid with `markers` on top,
/// drawn in the given order. Returns one line per row, no axes.
pub fn ascii_map(
    mask: &IlluminationMask,
    markers: &[(GeoPoint, char)],
    cols: usize,
    rows: usize,
) -> Vec<String> {
    if cols == 0 || rows == 0 {
        return Vec::new();
    }
    let (width, height) = mask.dimensions();

    let mut grid: Vec<Vec<char>> = (0..rows)
        .map(|row| {
            let y = ((row as f64 + 0.5) / rows as f64 * f64::from(height)) as u32;
            (0..cols)
                .map(|col| {
                    let x = ((col as f64 + 0.5) / cols as f64 * f64::from(width)) as u32;
                    match mask.get(x.min(width - 1), y.min(height - 1)) {
                        Some(v) if v >= DAY_THRESHOLD => '#',
                        Some(v) if v <= NIGHT_THRESHOLD => '.',
                        Some(_) => ':',
                        None => ' ',
                    }
                })
                .collect()
        })
        .collect();

    for (point, symbol) in markers {
        // Same mapping as the pixel markers, on a cols x rows raster
        let (col, row) = latlon_to_pixel(*point, cols as u32, rows as u32);
        let col = col.clamp(0, cols as i32 - 1) as usize;
        let row = row.clamp(0, rows as i32 - 1) as usize;
        grid[row][col] = *symbol;
    }

    grid.into_iter().map(|row| row.into_iter().collect()).collect()
}

/// Render a frame to the terminal.
pub fn draw_ascii(frame: &Frame, landmarks: &[GeoPoint]) {
    const COLS: usize = 72;
    const ROWS: usize = 24;

    let mut markers: Vec<(GeoPoint, char)> = landmarks.iter().map(|p| (*p, '+')).collect();
    markers.push((frame.subsolar, 'S'));
    markers.push((frame.sublunar, 'M'));

    println!("Terminator at {}", frame.instant);
    println!(
        "  subsolar  {:>7.2}°, {:>8.2}°",
        frame.subsolar.lat_deg, frame.subsolar.lon_deg
    );
    println!(
        "  sublunar  {:>7.2}°, {:>8.2}°\n",
        frame.sublunar.lat_deg, frame.sublunar.lon_deg
    );

    let border = format!("+{}+", "-".repeat(COLS));
    println!("{}", border);
    for line in ascii_map(&frame.mask, &markers, COLS, ROWS) {
        println!("|{}|", line);
    }
    println!("{}", border);

    // Longitude labels under the map
    let left = "-180";
    let mid = "0";
    let right = "180";
    let left_width = COLS / 2 + 1 - left.len();
    let right_width = COLS + 2 - left.len() - left_width;
    println!(
        "{}{:>lw$}{:>rw$}",
        left,
        mid,
        right,
        lw = left_width,
        rw = right_width
    );
}
