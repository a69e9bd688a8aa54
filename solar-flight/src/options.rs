use std::{ffi::OsString, path::PathBuf};

use orrery::FrameClockSettings;
use orrery_routine::BloomSettings;
use pico_args::Arguments;

pub const HELP: &str = "\
solar-flight

USAGE:
  solar-flight [OPTIONS]

OPTIONS:
  -h, --help              Print this message
  --fullscreen            Start in borderless fullscreen
  --vsync                 Wait for vertical blank when presenting
  --seed <u64>            Seed for the system tilt, belt and particles [default: 0]
  --max-dt <seconds>      Longest step one frame may simulate [default: 0.1]
  --exposure <f32>        Tone mapping exposure [default: 1.0]
  --blur-passes <u32>     Ping-pong blur passes for bloom [default: 10]
  --assets <dir>          Directory holding textures [default: bundled assets]
  --absolute-mouse        Treat mouse motion as absolute positions (remote desktops)
";

#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub help: bool,
    pub fullscreen: bool,
    pub vsync: bool,
    pub seed: u64,
    pub max_dt: f32,
    pub exposure: f32,
    pub blur_passes: u32,
    pub assets: PathBuf,
    pub absolute_mouse: bool,
}

impl Options {
    pub fn from_env() -> Result<Self, pico_args::Error> {
        Self::from_args(std::env::args_os().skip(1).collect())
    }

    pub fn from_args(args: Vec<OsString>) -> Result<Self, pico_args::Error> {
        let mut args = Arguments::from_vec(args);
        let bloom = BloomSettings::default();

        let options = Self {
            help: args.contains(["-h", "--help"]),
            fullscreen: args.contains("--fullscreen"),
            vsync: args.contains("--vsync"),
            seed: args.opt_value_from_str("--seed")?.unwrap_or(0),
            max_dt: args
                .opt_value_from_str("--max-dt")?
                .unwrap_or(FrameClockSettings::default().max_dt),
            exposure: args.opt_value_from_str("--exposure")?.unwrap_or(bloom.exposure),
            blur_passes: args.opt_value_from_str("--blur-passes")?.unwrap_or(bloom.passes),
            assets: args
                .opt_value_from_os_str("--assets", |s| Ok::<_, std::convert::Infallible>(PathBuf::from(s)))?
                .unwrap_or_else(|| PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/assets"))),
            absolute_mouse: args.contains("--absolute-mouse"),
        };

        let rest = args.finish();
        if !rest.is_empty() {
            log::warn!("Ignoring unknown arguments {rest:?}");
        }

        Ok(options)
    }

    pub fn bloom(&self) -> BloomSettings {
        BloomSettings {
            passes: self.blur_passes,
            exposure: self.exposure,
            ..BloomSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Options, pico_args::Error> {
        Options::from_args(args.iter().map(OsString::from).collect())
    }

    #[test]
    fn defaults() {
        let options = parse(&[]).unwrap();
        assert!(!options.help);
        assert!(!options.fullscreen);
        assert_eq!(options.seed, 0);
        assert_eq!(options.max_dt, 0.1);
        assert_eq!(options.bloom(), BloomSettings::default());
    }

    #[test]
    fn values_are_parsed() {
        let options = parse(&[
            "--seed",
            "42",
            "--blur-passes",
            "4",
            "--exposure",
            "2.5",
            "--assets",
            "/tmp/orrery",
            "--vsync",
        ])
        .unwrap();
        assert_eq!(options.seed, 42);
        assert!(options.vsync);
        assert_eq!(options.assets, PathBuf::from("/tmp/orrery"));
        assert_eq!(options.bloom().passes, 4);
        assert_eq!(options.bloom().exposure, 2.5);
    }

    #[test]
    fn bad_values_are_errors() {
        assert!(parse(&["--seed", "many"]).is_err());
    }
}
