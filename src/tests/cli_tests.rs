//! Command-line parsing.

use crate::{frames_clock_config, parse_args, Args};
use terminator_lib::{config::Config, pipeline::FrameClock, Instant};

fn args(list: &[&str]) -> anyhow::Result<Args> {
    parse_args(list.iter().map(|s| s.to_string()))
}

#[test]
fn no_arguments_means_ascii_now() {
    assert_eq!(args(&[]).unwrap(), Args::default());
    assert_eq!(args(&["--stdout"]).unwrap(), Args::default());
}

#[test]
fn all_flags_parse() {
    let parsed = args(&[
        "--json",
        "--at",
        "2024-03-20T12:00:00Z",
        "--ppm",
        "/tmp/map.ppm",
        "--frames",
        "5",
        "--config",
        "alt.toml",
    ])
    .unwrap();
    assert!(parsed.json);
    assert_eq!(parsed.at.as_deref(), Some("2024-03-20T12:00:00Z"));
    assert_eq!(parsed.ppm.as_deref(), Some("/tmp/map.ppm"));
    assert_eq!(parsed.frames, Some(5));
    assert_eq!(parsed.config.as_deref(), Some("alt.toml"));
}

#[test]
fn missing_value_is_an_error() {
    assert!(args(&["--at"]).is_err());
    assert!(args(&["--frames", "many"]).is_err());
    assert!(args(&["--bogus"]).is_err());
}

#[test]
fn ppm_snapshot_has_header_and_pixels() {
    use embedded_graphics::pixelcolor::Rgb888;
    use terminator_lib::RgbImage;

    let image = RgbImage::filled(3, 2, Rgb888::new(1, 2, 3)).unwrap();
    let file = tempfile::NamedTempFile::new().unwrap();
    crate::write_ppm(file.path(), &image).unwrap();

    let bytes = std::fs::read(file.path()).unwrap();
    let header = b"P6\n3 2\n255\n";
    assert!(bytes.starts_with(header));
    assert_eq!(&bytes[header.len()..], &[1u8, 2, 3].repeat(6)[..]);
}

#[test]
fn explicit_start_animates_frames_even_when_disabled() {
    let config = Config::default();
    assert!(!config.animation.enabled);
    let start = Instant::parse("2024-03-20T12:00:00Z").unwrap();

    let clock_config = frames_clock_config(&config, Some(start));
    assert!(clock_config.animation.enabled);
    assert!(clock_config.validate().is_ok());

    let mut clock = FrameClock::from_config(&clock_config).unwrap();
    assert_eq!(clock.next_instant().unwrap(), start);
    let second = clock.next_instant().unwrap();
    assert_eq!(second.seconds_since(&start), 24.0 * 3600.0);
}

#[test]
fn without_start_the_configured_clock_is_kept() {
    let config = Config::default();
    let clock_config = frames_clock_config(&config, None);
    assert_eq!(clock_config, config);
    assert!(matches!(
        FrameClock::from_config(&clock_config).unwrap(),
        FrameClock::RealTime
    ));
}
