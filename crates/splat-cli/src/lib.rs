//! Command-line configuration surface (spec.md §6: `W`, `H`, `fov_x`, camera
//! pose, input path; supplemented per SPEC_FULL with world size, background
//! color, and SH degree truncation), grounded on
//! `examples/ArthurBrussee-brush/crates/brush-cli/src/lib.rs` and
//! `crates/brush-process/src/config.rs`'s flattened-`Args` pattern.

use std::str::FromStr;

use clap::{Args, Parser};
use serde::{Deserialize, Serialize};
use splat_linalg::{Vec3, vec3};
use splat_render::CameraOp;

/// One step of a `--camera-op` sequence, parsed from `kind:value` text
/// (e.g. `tilt:-0.785`, `move-to:0,0,-1.5`) -- the CLI's replayable form of
/// the pose script `main_mpi.cpp` hardcodes in `main`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraOpArg(pub CameraOp);

#[derive(thiserror::Error, Debug)]
pub enum CameraOpParseError {
    #[error("expected \"kind:value\", got {0:?}")]
    MissingColon(String),
    #[error("unknown camera op kind {0:?} (expected tilt, pan, roll, or move-to)")]
    UnknownKind(String),
    #[error("invalid numeric argument in camera op {0:?}: {1}")]
    BadNumber(String, String),
}

impl FromStr for CameraOpArg {
    type Err = CameraOpParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s.split_once(':').ok_or_else(|| CameraOpParseError::MissingColon(s.to_string()))?;
        let parse_f32 = |text: &str| {
            text.parse::<f32>().map_err(|e| CameraOpParseError::BadNumber(s.to_string(), e.to_string()))
        };
        let op = match kind {
            "tilt" => CameraOp::Tilt(parse_f32(value)?),
            "pan" => CameraOp::Pan(parse_f32(value)?),
            "roll" => CameraOp::Roll(parse_f32(value)?),
            "move-to" => {
                let mut parts = value.splitn(3, ',');
                let x = parse_f32(parts.next().unwrap_or(""))?;
                let y = parse_f32(parts.next().unwrap_or(""))?;
                let z = parse_f32(parts.next().unwrap_or(""))?;
                CameraOp::MoveTo(vec3(x, y, z))
            }
            other => return Err(CameraOpParseError::UnknownKind(other.to_string())),
        };
        Ok(Self(op))
    }
}

/// The pure-data rendering knobs (image size, intrinsics, SH truncation,
/// background) -- the part of the configuration surface that round-trips
/// through `serde`, mirroring `ProcessConfig`'s shape.
#[derive(Clone, Args, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RenderConfig {
    /// Output image width in pixels.
    #[arg(long, help_heading = "Render options", default_value = "1000")]
    pub width: u32,
    /// Output image height in pixels.
    #[arg(long, help_heading = "Render options", default_value = "1000")]
    pub height: u32,
    /// Horizontal field of view, in radians.
    #[arg(long, help_heading = "Render options", default_value = "1.5707963")]
    pub fov_x: f32,
    /// Truncates spherical-harmonic evaluation to this degree (0-3). Full
    /// degree 3 is the default and is required for bit-comparable output
    /// against the reference (spec.md §9 open question).
    #[arg(long, help_heading = "Render options", default_value = "3")]
    pub sh_degree: u8,
    /// Background color as "r,g,b" in [0, 1], composited behind every
    /// primitive (spec.md §4.I step 7 defaults to white).
    #[arg(long, help_heading = "Render options", default_value = "1,1,1")]
    pub background: BackgroundArg,
}

/// A `serde`-and-`clap`-parseable `r,g,b` triple.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackgroundArg(pub Vec3);

impl FromStr for BackgroundArg {
    type Err = CameraOpParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_f32 =
            |text: &str| text.parse::<f32>().map_err(|e| CameraOpParseError::BadNumber(s.to_string(), e.to_string()));
        let mut parts = s.splitn(3, ',');
        let r = parse_f32(parts.next().unwrap_or(""))?;
        let g = parse_f32(parts.next().unwrap_or(""))?;
        let b = parse_f32(parts.next().unwrap_or(""))?;
        Ok(Self(vec3(r, g, b)))
    }
}

impl std::fmt::Display for BackgroundArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},{}", self.0.x, self.0.y, self.0.z)
    }
}

impl Serialize for BackgroundArg {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for BackgroundArg {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_str(&text).map_err(serde::de::Error::custom)
    }
}

/// Distributed-run options (supplement: spec.md §4.I parameterizes `W`
/// workers but leaves how a run picks `W` to the driver).
#[derive(Clone, Args, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DistributedConfig {
    /// Number of simulated workers to render with, via the in-process
    /// channel transport. `1` renders single-threaded with no partitioning.
    #[arg(long, help_heading = "Distributed options", default_value = "1")]
    pub world_size: usize,
}

/// Top-level CLI surface: positional input path plus the flattened option
/// groups above, mirroring `brush_cli::Cli`'s `source` + `#[clap(flatten)]`
/// shape.
#[derive(Parser)]
#[command(author, version, arg_required_else_help = true, about = "Distributed CPU Gaussian-splat renderer")]
pub struct Cli {
    /// Path to the input Gaussian-splat PLY file.
    #[arg(value_name = "PLY_PATH")]
    pub input: std::path::PathBuf,

    /// Path to write the raw RGB output image to.
    #[arg(value_name = "OUTPUT_PATH")]
    pub output: std::path::PathBuf,

    #[clap(flatten)]
    pub render: RenderConfig,

    #[clap(flatten)]
    pub distributed: DistributedConfig,

    /// Camera pose operations applied in order: `tilt:<rad>`, `pan:<rad>`,
    /// `roll:<rad>`, or `move-to:<x>,<y>,<z>`. Repeatable.
    #[arg(long = "camera-op", help_heading = "Camera options")]
    pub camera_ops: Vec<CameraOpArg>,
}

impl Cli {
    /// The parsed camera pose script, ready for `Camera::apply_script`.
    pub fn camera_script(&self) -> Vec<CameraOp> {
        self.camera_ops.iter().map(|arg| arg.0).collect()
    }
}
