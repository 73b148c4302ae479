//! # Frame Generation Pipeline
//!
//! Ties the astronomy, mask and compositor together into frames for the display
//! layer, without any global state:
//!
//! - [`TerminatorPipeline`] owns the read-only day/night rasters and the render
//!   settings; [`TerminatorPipeline::render`] is a pure function of the instant
//! - [`FrameState`] carries the "last instant / last frame" pair from one update
//!   to the next; [`TerminatorPipeline::tick`] consumes it and returns the next one
//! - [`FrameClock`] decides which instant each tick shows (wall clock or a
//!   fixed-step time-lapse)
//! - [`frame_slot`] is the hand-off between a generator task and a render loop:
//!   a single-writer latest-value channel, so the reader only ever sees whole frames
//!
//! [`run_generator`] wires these into a tokio task that regenerates at the
//! configured rate until told to stop.

use crate::compositor::{composite, draw_markers, CrossStyle, Marker};
use crate::config::Config;
use crate::image::RgbImage;
use crate::instant::Instant;
use crate::lunar::sublunar_point;
use crate::mask::{mask_for_point, IlluminationMask, MaskParams};
use crate::solar::subsolar_point;
use crate::{GeoPoint, Result, TerminatorError};
use chrono::Duration;
use embedded_graphics::pixelcolor::Rgb888;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// Highest accepted `update_fps`; the generator ticks at most once per millisecond.
pub const MAX_UPDATE_FPS: f64 = 1000.0;

/// Everything that shapes a frame besides the instant.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderSettings {
    pub mask: MaskParams,
    pub cross: CrossStyle,
    /// Drawn first, in order
    pub landmarks: Vec<Marker>,
    /// Subsolar cross colour, `None` to hide it
    pub subsolar_color: Option<Rgb888>,
    /// Sublunar cross colour, `None` to hide it; drawn last
    pub sublunar_color: Option<Rgb888>,
    /// Target regenerations per second
    pub update_fps: f64,
}

impl RenderSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let rgb = |[r, g, b]: [u8; 3]| Rgb888::new(r, g, b);
        let markers = &config.markers;
        Ok(Self {
            mask: MaskParams {
                twilight_half_width: config.mask.twilight_half_width,
                blur_radius: config.mask.blur_radius,
            },
            cross: CrossStyle {
                arm_length: markers.arm_length,
                line_width: markers.line_width,
            },
            landmarks: config
                .landmarks
                .iter()
                .map(|l| Marker::new(GeoPoint::new(l.lat, l.lon), rgb(markers.landmark_color)))
                .collect(),
            subsolar_color: markers.show_subsolar.then(|| rgb(markers.subsolar_color)),
            sublunar_color: markers.show_sublunar.then(|| rgb(markers.sublunar_color)),
            update_fps: config.display.update_fps,
        })
    }

    /// Shortest time step that triggers a new frame, in seconds.
    pub fn min_interval_secs(&self) -> f64 {
        1.0 / self.update_fps
    }

    /// Shortest time step that triggers a new frame, to the nanosecond.
    pub fn min_interval(&self) -> Result<Duration> {
        let out_of_range = || {
            TerminatorError::InvalidInput(format!(
                "update_fps {} gives no usable frame interval",
                self.update_fps
            ))
        };
        let period = std::time::Duration::try_from_secs_f64(self.min_interval_secs())
            .map_err(|_| out_of_range())?;
        Duration::from_std(period).map_err(|_| out_of_range())
    }

    /// Rejects rates the generator cannot tick at.
    pub fn validate(&self) -> Result<()> {
        self.mask.validate()?;
        let fps = self.update_fps;
        if !(fps.is_finite() && fps > 0.0 && fps <= MAX_UPDATE_FPS) {
            return Err(TerminatorError::InvalidInput(format!(
                "update_fps must be in (0, {}], got {}",
                MAX_UPDATE_FPS, fps
            )));
        }
        Ok(())
    }
}

/// One finished frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub instant: Instant,
    pub subsolar: GeoPoint,
    pub sublunar: GeoPoint,
    pub mask: IlluminationMask,
    /// Composite with markers, ready for upload
    pub image: RgbImage,
}

/// State threaded through successive [`TerminatorPipeline::tick`] calls.
#[derive(Clone, Debug, Default)]
pub struct FrameState {
    last_instant: Option<Instant>,
    last_frame: Option<Arc<Frame>>,
}

impl FrameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_instant(&self) -> Option<Instant> {
        self.last_instant
    }

    pub fn last_frame(&self) -> Option<&Arc<Frame>> {
        self.last_frame.as_ref()
    }

    /// True when there is no frame yet, or `now` is at least `min_interval`
    /// after the last one. A clock that jumps backwards also counts.
    pub fn needs_update(&self, now: &Instant, min_interval: Duration) -> bool {
        match (&self.last_frame, &self.last_instant) {
            (Some(_), Some(last)) => {
                let elapsed = now.elapsed_since(last);
                elapsed < Duration::zero() || elapsed >= min_interval
            }
            _ => true,
        }
    }
}

/// Result of one [`TerminatorPipeline::tick`].
#[derive(Clone, Debug)]
pub enum Tick {
    /// A new frame was generated
    Rendered(Arc<Frame>),
    /// Too soon since the last frame; the state is unchanged
    Throttled,
}

/// Day/night rasters plus settings; renders frames for any instant.
#[derive(Clone, Debug)]
pub struct TerminatorPipeline {
    day: Arc<RgbImage>,
    night: Arc<RgbImage>,
    settings: RenderSettings,
}

impl TerminatorPipeline {
    /// Both rasters must have the same size.
    pub fn new(day: Arc<RgbImage>, night: Arc<RgbImage>, settings: RenderSettings) -> Result<Self> {
        if day.dimensions() != night.dimensions() {
            return Err(TerminatorError::DimensionMismatch {
                expected: day.dimensions(),
                actual: night.dimensions(),
            });
        }
        settings.validate()?;
        info!(
            "Pipeline ready: {}x{} map, {} landmarks, {} fps",
            day.width(),
            day.height(),
            settings.landmarks.len(),
            settings.update_fps
        );
        Ok(Self {
            day,
            night,
            settings,
        })
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// `(width, height)` of every frame.
    pub fn dimensions(&self) -> (u32, u32) {
        self.day.dimensions()
    }

    /// Markers in draw order: landmarks, then the sun, then the moon.
    pub fn markers(&self, subsolar: GeoPoint, sublunar: GeoPoint) -> Vec<Marker> {
        let mut markers = self.settings.landmarks.clone();
        if let Some(color) = self.settings.subsolar_color {
            markers.push(Marker::new(subsolar, color));
        }
        if let Some(color) = self.settings.sublunar_color {
            markers.push(Marker::new(sublunar, color));
        }
        markers
    }

    /// Render the frame for `instant`.
    pub fn render(&self, instant: Instant) -> Result<Frame> {
        let (width, height) = self.dimensions();
        let subsolar = subsolar_point(&instant);
        let sublunar = sublunar_point(&instant);

        let mask = mask_for_point(width, height, &subsolar, &self.settings.mask)?;
        let mut image = composite(&self.day, &self.night, &mask)?;
        draw_markers(&mut image, &self.markers(subsolar, sublunar), self.settings.cross);

        debug!(
            "Rendered {}: sun ({:.2}, {:.2}), moon ({:.2}, {:.2})",
            instant, subsolar.lat_deg, subsolar.lon_deg, sublunar.lat_deg, sublunar.lon_deg
        );
        Ok(Frame {
            instant,
            subsolar,
            sublunar,
            mask,
            image,
        })
    }

    /// Render for `now` unless the last frame is too recent.
    pub fn tick(&self, state: FrameState, now: Instant) -> Result<(FrameState, Tick)> {
        if !state.needs_update(&now, self.settings.min_interval()?) {
            return Ok((state, Tick::Throttled));
        }
        let frame = Arc::new(self.render(now)?);
        let next = FrameState {
            last_instant: Some(now),
            last_frame: Some(Arc::clone(&frame)),
        };
        Ok((next, Tick::Rendered(frame)))
    }
}

/// Source of the instant each tick renders.
#[derive(Clone, Debug)]
pub enum FrameClock {
    /// Wall-clock UTC
    RealTime,
    /// Starts at `next` and advances by `step` per tick
    Animated { next: Instant, step: Duration },
}

impl FrameClock {
    pub fn animated(start: Instant, step: Duration) -> Self {
        FrameClock::Animated { next: start, step }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        if !config.animation.enabled {
            return Ok(FrameClock::RealTime);
        }
        let start = match &config.animation.start {
            Some(text) => Instant::parse(text)?,
            None => Instant::now(),
        };
        let step_ms = (config.animation.step_hours * 3_600_000.0).round() as i64;
        let step = Duration::try_milliseconds(step_ms).ok_or_else(|| {
            TerminatorError::InvalidInput(format!(
                "animation step of {} hours is out of range",
                config.animation.step_hours
            ))
        })?;
        Ok(FrameClock::animated(start, step))
    }

    /// The instant to render now.
    pub fn next_instant(&mut self) -> Result<Instant> {
        match self {
            FrameClock::RealTime => Ok(Instant::now()),
            FrameClock::Animated { next, step } => {
                let current = *next;
                *next = current.checked_add(*step)?;
                Ok(current)
            }
        }
    }
}

/// Writer half of the latest-frame slot.
#[derive(Debug)]
pub struct FramePublisher(watch::Sender<Option<Arc<Frame>>>);

/// Reader half of the latest-frame slot. Cloneable.
#[derive(Clone, Debug)]
pub struct FrameSubscriber(watch::Receiver<Option<Arc<Frame>>>);

/// Create the latest-frame hand-off slot, initially empty.
pub fn frame_slot() -> (FramePublisher, FrameSubscriber) {
    let (tx, rx) = watch::channel(None);
    (FramePublisher(tx), FrameSubscriber(rx))
}

impl FramePublisher {
    /// Replace the current frame. Works with or without live subscribers.
    pub fn publish(&self, frame: Arc<Frame>) {
        self.0.send_replace(Some(frame));
    }
}

impl FrameSubscriber {
    /// Most recent frame, if any has been published.
    pub fn latest(&self) -> Option<Arc<Frame>> {
        self.0.borrow().clone()
    }

    /// Wait for a frame newer than the last one seen. `None` once the
    /// publisher is gone.
    pub async fn next_frame(&mut self) -> Option<Arc<Frame>> {
        self.0.changed().await.ok()?;
        self.0.borrow_and_update().clone()
    }
}

/// Regenerate frames at the configured rate until `shutdown` turns true
/// (or its sender is dropped). Returns the final state.
///
/// A failed frame is logged and skipped; the previous frame stays published.
pub async fn run_generator(
    pipeline: Arc<TerminatorPipeline>,
    mut clock: FrameClock,
    publisher: FramePublisher,
    mut shutdown: watch::Receiver<bool>,
) -> Result<FrameState> {
    let period = pipeline
        .settings()
        .min_interval()?
        .to_std()
        .map_err(|e| TerminatorError::InvalidInput(format!("frame interval: {}", e)))?
        .max(std::time::Duration::from_millis(1));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut state = FrameState::new();

    info!("Frame generator started ({:?} per tick)", period);
    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let now = clock.next_instant()?;
                match pipeline.tick(state.clone(), now) {
                    Ok((next, Tick::Rendered(frame))) => {
                        publisher.publish(frame);
                        state = next;
                    }
                    Ok((next, Tick::Throttled)) => state = next,
                    Err(e) => warn!("Frame at {} failed: {}", now, e),
                }
            }
        }
    }
    info!("Frame generator stopped");
    Ok(state)
}
