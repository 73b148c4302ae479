//! # Terminator Display Entry Point
//!
//! Command-line front end for the terminator library. The fullscreen
//! HyperPixel surface and image decoding live in the display layer; this
//! binary covers the development workflows:
//!
//! - `--stdout` (default): ASCII map of the current (or `--at`) instant
//! - `--json`: subsolar/sublunar points and sun/moon coordinates as JSON
//! - `--ppm PATH`: write the composite as a binary PPM snapshot
//! - `--frames N`: run the background generator for N frames
//! - `--config PATH`: read settings from PATH instead of terminator-config.toml

// Test modules
#[cfg(test)]
mod tests;

use anyhow::{anyhow, Context};
use embedded_graphics::pixelcolor::Rgb888;
use log::{error, info};
use serde::Serialize;
use std::env;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use terminator_lib::{
    config::Config,
    lunar::{moon_ephemeris, moon_position},
    pipeline::{frame_slot, run_generator, FrameClock, RenderSettings, TerminatorPipeline},
    renderer::draw_ascii,
    solar::{gmst_degrees, sun_position, EquatorialPosition},
    GeoPoint, Instant, RgbImage,
};
use tokio::sync::watch;

/// Parsed command line.
#[derive(Debug, Default, PartialEq)]
struct Args {
    json: bool,
    at: Option<String>,
    ppm: Option<String>,
    frames: Option<usize>,
    config: Option<String>,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> anyhow::Result<Args> {
    let mut parsed = Args::default();
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .ok_or_else(|| anyhow!("{} needs a value", flag))
        };
        match arg.as_str() {
            "--stdout" => {}
            "--json" => parsed.json = true,
            "--at" => parsed.at = Some(value("--at")?),
            "--ppm" => parsed.ppm = Some(value("--ppm")?),
            "--config" => parsed.config = Some(value("--config")?),
            "--frames" => {
                let n = value("--frames")?;
                parsed.frames = Some(n.parse().with_context(|| format!("bad frame count '{}'", n))?);
            }
            other => return Err(anyhow!("unknown argument '{}'", other)),
        }
    }
    Ok(parsed)
}

/// Stand-in rasters until the display layer hands over decoded images.
fn placeholder_images(width: u32, height: u32) -> anyhow::Result<(RgbImage, RgbImage)> {
    let day = RgbImage::from_fn(width, height, |_, y| {
        // Brighter towards the equator
        let lat = 1.0 - (2.0 * f64::from(y) / f64::from(height) - 1.0).abs();
        Rgb888::new(40, (90.0 + 80.0 * lat) as u8, (160.0 + 80.0 * lat) as u8)
    })?;
    let night = RgbImage::filled(width, height, Rgb888::new(8, 10, 32))?;
    Ok((day, night))
}

#[derive(Serialize)]
struct PositionReport {
    instant: Instant,
    gmst_deg: f64,
    sun: EquatorialPosition,
    moon: EquatorialPosition,
    subsolar: GeoPoint,
    sublunar: GeoPoint,
    moon_illuminated_fraction: f64,
    moon_distance_km: f64,
}

fn write_ppm(path: &Path, image: &RgbImage) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    write!(out, "P6\n{} {}\n255\n", image.width(), image.height())?;
    out.write_all(image.as_bytes())?;
    out.flush()?;
    Ok(())
}

/// Clock settings for `--frames`. An explicit start instant always runs a
/// time-lapse from that instant, using the configured step.
fn frames_clock_config(config: &Config, start: Option<Instant>) -> Config {
    let mut clock_config = config.clone();
    if let Some(start) = start {
        if !clock_config.animation.enabled {
            info!(
                "--at given: animating from {} in {}h steps",
                start, clock_config.animation.step_hours
            );
            clock_config.animation.enabled = true;
        }
        clock_config.animation.start = Some(start.to_string());
    }
    clock_config
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args(env::args().skip(1))?;
    let config = match &args.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };

    let instant = match &args.at {
        Some(text) => Instant::parse(text)?,
        None => Instant::now(),
    };

    let settings = RenderSettings::from_config(&config)?;
    let (day, night) = placeholder_images(config.display.width, config.display.height)?;
    let pipeline = Arc::new(TerminatorPipeline::new(
        Arc::new(day),
        Arc::new(night),
        settings,
    )?);

    if args.json {
        let eph = moon_ephemeris(&instant);
        let frame = pipeline.render(instant)?;
        let report = PositionReport {
            instant,
            gmst_deg: gmst_degrees(&instant),
            sun: sun_position(&instant),
            moon: moon_position(&instant),
            subsolar: frame.subsolar,
            sublunar: frame.sublunar,
            moon_illuminated_fraction: eph.illum_frac,
            moon_distance_km: eph.distance_km,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if let Some(frames) = args.frames {
        // Create Tokio runtime for the generator task
        let rt = tokio::runtime::Runtime::new()?;
        let clock_config = frames_clock_config(&config, args.at.as_ref().map(|_| instant));
        clock_config.validate()?;
        let clock = FrameClock::from_config(&clock_config)?;
        return rt.block_on(async {
            let (publisher, mut subscriber) = frame_slot();
            let (stop_tx, stop_rx) = watch::channel(false);
            let generator = tokio::spawn(run_generator(
                Arc::clone(&pipeline),
                clock,
                publisher,
                stop_rx,
            ));

            for n in 0..frames {
                match subscriber.next_frame().await {
                    Some(frame) => println!(
                        "frame {:>3}  {}  sun {:>7.2} {:>8.2}  moon {:>7.2} {:>8.2}",
                        n + 1,
                        frame.instant,
                        frame.subsolar.lat_deg,
                        frame.subsolar.lon_deg,
                        frame.sublunar.lat_deg,
                        frame.sublunar.lon_deg
                    ),
                    None => break,
                }
            }

            stop_tx.send_replace(true);
            let state = generator.await??;
            if let Some(last) = state.last_frame() {
                info!("Last frame at {}", last.instant);
            }
            Ok::<(), anyhow::Error>(())
        });
    }

    let frame = match pipeline.render(instant) {
        Ok(frame) => frame,
        Err(e) => {
            error!("Frame generation failed: {}", e);
            return Err(e.into());
        }
    };

    if let Some(path) = &args.ppm {
        write_ppm(Path::new(path), &frame.image)?;
        info!("Wrote {}x{} snapshot to {}", frame.image.width(), frame.image.height(), path);
        return Ok(());
    }

    let landmarks: Vec<GeoPoint> = pipeline
        .settings()
        .landmarks
        .iter()
        .map(|m| m.point)
        .collect();
    draw_ascii(&frame, &landmarks);
    Ok(())
}
