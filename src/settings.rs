use std::fmt;
use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use config::{Config, Environment, File, FileFormat};
use nalgebra::Vector3;
use serde::Deserialize;

use crate::geom::{safe_normalize, Solid};
use crate::trace::{Camera, Light, Scene};


const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");
const LOCAL_CONFIG: &str = "config/local";

/// Runtime configuration, built once at startup and passed to the renderer.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    pub width: usize,
    pub height: usize,
    pub solid: Solid,
    pub model_scale: f64,
    pub max_planes: usize,
    pub camera: [f64; 3],
    pub focal_length: f64,
    pub screen_scale: f64,
    pub light: [f64; 3],
    pub background: u32,
    pub fallback_normal: [f64; 3],
    pub report_interval: f64,
    pub parallel: bool,
    #[serde(default)]
    pub headless: Option<Headless>,
}

/// Fixed-step rendering without a window.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Headless {
    /// Number of frames to render.
    pub frames: u64,
    /// Simulated seconds between frames.
    pub step: f64,
    /// Directory for PPM snapshots. Nothing is written when unset.
    pub snapshot_dir: Option<PathBuf>,
    /// Write every n-th frame.
    pub snapshot_every: u64,
}

impl Default for Headless {
    fn default() -> Self {
        Self {
            frames: 120,
            step: 1.0 / 60.0,
            snapshot_dir: None,
            snapshot_every: 1,
        }
    }
}

impl Settings {
    pub fn scene(&self) -> Scene {
        let camera = Camera::new(
            Vector3::from(self.camera),
            self.focal_length,
            self.screen_scale,
            self.width,
            self.height,
        );
        let mut scene = Scene::new(camera, Light::new(Vector3::from(self.light)));
        scene.background = self.background;
        scene.fallback_normal = safe_normalize(&Vector3::from(self.fallback_normal));
        scene
    }

    /// The selected solid's vertices with the model scale applied.
    pub fn points(&self) -> Vec<Vector3<f64>> {
        self.solid.scaled_vertices(self.model_scale)
    }
}

/// Loads the built-in defaults only.
pub fn load_default_config() -> Result<Settings> {
    let settings: Settings = Config::builder()
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        .build()
        .context("Error loading default configuration")?
        .try_deserialize()
        .context("Error deserializing default configuration")?;

    validate_config(&settings)?;

    Ok(settings)
}

/// Loads the configuration for a run, parsing the process arguments.
pub fn load_config() -> Result<Settings> {
    load_config_with(CliArgs::parse())
}

/// Layers the built-in defaults, a config file, `DODECA_*` environment
/// variables and the given command-line arguments, in that order.
pub fn load_config_with(args: CliArgs) -> Result<Settings> {
    let mut builder =
        Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

    builder = match &args.config {
        Some(path) => {
            println!("Using configuration: {:?}", path);
            builder.add_source(File::from(path.as_path()).required(true))
        }
        None => builder.add_source(File::with_name(LOCAL_CONFIG).required(false)),
    };

    let mut settings: Settings = builder
        .add_source(
            Environment::with_prefix("dodeca")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Error loading configuration")?
        .try_deserialize()
        .context("Error deserializing configuration")?;

    args.apply(&mut settings);

    validate_config(&settings)?;

    Ok(settings)
}

fn validate_config(config: &Settings) -> Result<()> {
    ensure!(
        config.width > 0 && config.height > 0,
        "Screen dimensions must be non-zero, got {}x{}",
        config.width,
        config.height
    );
    ensure!(config.model_scale > 0.0, "Model scale must be greater than 0");
    ensure!(config.focal_length > 0.0, "Focal length must be greater than 0");
    ensure!(config.screen_scale > 0.0, "Screen scale must be greater than 0");
    ensure!(
        config.report_interval > 0.0,
        "Report interval must be greater than 0"
    );
    ensure!(
        config.max_planes >= 4,
        "At least 4 plane slots are needed to bound a solid, got {}",
        config.max_planes
    );
    ensure!(
        config.background <= 0xFFFFFF,
        "Background colour must be a packed 0xRRGGBB value"
    );
    ensure!(
        Vector3::from(config.light).norm() > crate::config::GEOM_TOLERANCE,
        "Light direction must be non-zero"
    );
    ensure!(
        Vector3::from(config.fallback_normal).norm() > crate::config::GEOM_TOLERANCE,
        "Fallback normal must be non-zero"
    );
    if let Some(headless) = &config.headless {
        ensure!(headless.step >= 0.0, "Headless time step must not be negative");
        ensure!(
            headless.snapshot_every > 0,
            "Snapshot interval must be at least 1"
        );
    }
    Ok(())
}

#[derive(Parser, Debug)]
#[command(version, about = "Ray-cast a tumbling convex polyhedron from its face planes")]
pub struct CliArgs {
    /// Configuration file to use instead of config/local.toml.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Window width in pixels.
    #[arg(long)]
    width: Option<usize>,

    /// Window height in pixels.
    #[arg(long)]
    height: Option<usize>,

    /// Solid to display: dodecahedron, cube, octahedron or icosahedron.
    #[arg(short, long)]
    solid: Option<Solid>,

    /// Uniform scale applied to the solid's vertices.
    #[arg(long)]
    scale: Option<f64>,

    /// Maximum number of face planes kept after extraction.
    #[arg(long)]
    max_planes: Option<usize>,

    /// Direction towards the light, as three components.
    #[arg(long, num_args = 3, value_delimiter = ' ', allow_negative_numbers = true)]
    light: Option<Vec<f64>>,

    /// Background colour as 0xRRGGBB, #RRGGBB or a decimal value.
    #[arg(long, value_parser = parse_color)]
    background: Option<u32>,

    /// Seconds between status lines.
    #[arg(long)]
    report_interval: Option<f64>,

    /// Shade scanlines on a single thread.
    #[arg(long)]
    sequential: bool,

    /// Render without a window at a fixed time step.
    #[arg(long)]
    headless: bool,

    /// Number of frames to render in headless mode. Implies --headless.
    #[arg(long)]
    frames: Option<u64>,

    /// Seconds of animation between headless frames. Implies --headless.
    #[arg(long)]
    step: Option<f64>,

    /// Write headless frames as PPM images into this directory. Implies --headless.
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Only write every n-th headless frame.
    #[arg(long, requires = "snapshot_dir")]
    snapshot_every: Option<u64>,
}

impl CliArgs {
    /// Overrides the loaded values with whatever was given on the command line.
    pub fn apply(&self, config: &mut Settings) {
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(solid) = self.solid {
            config.solid = solid;
        }
        if let Some(scale) = self.scale {
            config.model_scale = scale;
        }
        if let Some(max_planes) = self.max_planes {
            config.max_planes = max_planes;
        }
        if let Some(light) = &self.light {
            // clap enforces exactly three values
            config.light = [light[0], light[1], light[2]];
        }
        if let Some(background) = self.background {
            config.background = background;
        }
        if let Some(interval) = self.report_interval {
            config.report_interval = interval;
        }
        if self.sequential {
            config.parallel = false;
        }

        let wants_headless = self.headless
            || self.frames.is_some()
            || self.step.is_some()
            || self.snapshot_dir.is_some();
        if wants_headless {
            let mut headless = config.headless.take().unwrap_or_default();
            if let Some(frames) = self.frames {
                headless.frames = frames;
            }
            if let Some(step) = self.step {
                headless.step = step;
            }
            if let Some(dir) = &self.snapshot_dir {
                headless.snapshot_dir = Some(dir.clone());
            }
            if let Some(every) = self.snapshot_every {
                headless.snapshot_every = every;
            }
            config.headless = Some(headless);
        }
    }
}

/// Parse a packed colour written as `0xRRGGBB`, `#RRGGBB` or a decimal value.
fn parse_color(s: &str) -> Result<u32, String> {
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix('#')) {
        u32::from_str_radix(hex, 16)
    } else {
        s.parse::<u32>()
    };

    match parsed {
        Ok(color) if color <= 0xFFFFFF => Ok(color),
        Ok(color) => Err(format!("Colour out of range: {:#x}", color)),
        Err(_) => Err(format!("Failed to parse colour: {}", s)),
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Settings:
  - Screen: {}x{}
  - Solid: {} (scale {:.3})
  - Plane slots: {}
  - Camera: {:?}, focal length {:.2}, screen scale {:.1}
  - Light: {:?}
  - Background: {:#08x}
  - Parallel: {}
  ",
            self.width,
            self.height,
            self.solid,
            self.model_scale,
            self.max_planes,
            self.camera,
            self.focal_length,
            self.screen_scale,
            self.light,
            self.background,
            self.parallel,
        )
    }
}
