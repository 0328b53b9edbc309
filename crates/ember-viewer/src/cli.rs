use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use ember_engine::scenes;
use ember_engine::FrameDesc;

/// Ember viewer: draws one of the built-in frames.
#[derive(Parser, Debug)]
#[command(name = "ember-viewer", version, about)]
pub struct Args {
    /// Frame to draw.
    #[arg(long, value_enum, default_value_t = Scene::Triangle)]
    pub scene: Scene,

    /// Rotation of the square, in degrees counter-clockwise.
    #[arg(long, default_value_t = 30.0, allow_negative_numbers = true)]
    pub angle: f32,

    /// Where the frame goes.
    #[arg(long, value_enum, default_value_t = Mode::Window)]
    pub mode: Mode,

    /// PNG written in headless mode.
    #[arg(short, long, default_value = "frame.png")]
    pub output: PathBuf,

    /// Width in pixels (initial window size in window mode).
    #[arg(long, default_value_t = 640)]
    pub width: u32,

    /// Height in pixels (initial window size in window mode).
    #[arg(long, default_value_t = 480)]
    pub height: u32,

    /// Log filter override, `env_logger` syntax (e.g. "debug", "ember_engine=trace").
    #[arg(long)]
    pub log: Option<String>,
}

#[derive(ValueEnum, Debug, Copy, Clone, Eq, PartialEq)]
pub enum Scene {
    /// Orange triangle.
    Triangle,
    /// Blue square rotated by `--angle`.
    Square,
}

#[derive(ValueEnum, Debug, Copy, Clone, Eq, PartialEq)]
pub enum Mode {
    /// Present in a window, redrawn on resize.
    Window,
    /// Render offscreen and save a PNG.
    Headless,
    /// Run against the CPU trace device and print the recorded calls.
    Trace,
}

impl Args {
    pub fn frame(&self) -> FrameDesc {
        match self.scene {
            Scene::Triangle => scenes::orange_triangle(),
            Scene::Square => scenes::rotated_square(self.angle),
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_engine::pipeline::Topology;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["ember-viewer"]).unwrap();
        assert_eq!(args.scene, Scene::Triangle);
        assert_eq!(args.mode, Mode::Window);
        assert_eq!((args.width, args.height), (640, 480));
        assert!(args.log.is_none());
    }

    #[test]
    fn square_with_negative_angle() {
        let args = Args::try_parse_from([
            "ember-viewer",
            "--scene",
            "square",
            "--angle",
            "-45",
            "--mode",
            "headless",
        ])
        .unwrap();
        assert_eq!(args.angle, -45.0);
        assert_eq!(args.mode, Mode::Headless);
        assert_eq!(args.frame().topology, Topology::TriangleStrip);
    }

    #[test]
    fn unknown_scene_is_rejected() {
        assert!(Args::try_parse_from(["ember-viewer", "--scene", "cube"]).is_err());
    }
}
