pub mod autofocus;
pub mod calibrate;
pub mod config;
pub mod reconstruct;
pub mod stack;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use holo_core::config::{um_to_m, Mode, ReconstructionConfig};
use holo_core::frame::Roi;
use holo_core::io::load_image;
use holo_core::window::WindowShape;
use holo_core::{Frame, Holo};

#[derive(Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Inline,
    OffAxis,
}

impl From<ModeArg> for Mode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Inline => Mode::Inline,
            ModeArg::OffAxis => Mode::OffAxis,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum WindowArg {
    None,
    Circle,
    Rectangle,
}

impl From<WindowArg> for WindowShape {
    fn from(w: WindowArg) -> Self {
        match w {
            WindowArg::None => WindowShape::None,
            WindowArg::Circle => WindowShape::Circle,
            WindowArg::Rectangle => WindowShape::Rectangle,
        }
    }
}

/// Optical and reference settings shared by every processing subcommand.
/// Lengths on the command line are micrometres; config files are meters.
#[derive(Args)]
pub struct SessionArgs {
    /// Reconstruction config file (TOML); flags override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Holography mode
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Wavelength in µm
    #[arg(long)]
    pub wavelength: Option<f64>,

    /// Camera pixel size in µm
    #[arg(long)]
    pub pixel_size: Option<f64>,

    /// Integer block-average downsampling factor
    #[arg(long)]
    pub downsample: Option<usize>,

    /// Distance from sensor to a diverging point source in µm
    #[arg(long)]
    pub source_distance: Option<f64>,

    /// Apodization window shape
    #[arg(long, value_enum)]
    pub window: Option<WindowArg>,

    /// Window taper width in pixels
    #[arg(long)]
    pub window_thickness: Option<f64>,

    /// Fixed window radius in pixels (disables auto-sizing)
    #[arg(long)]
    pub window_radius: Option<f64>,

    /// Off-axis sideband centre as x,y (spectrum pixels)
    #[arg(long, value_parser = parse_pair)]
    pub crop_centre: Option<(usize, usize)>,

    /// Off-axis crop radius as rx,ry (spectrum pixels)
    #[arg(long, value_parser = parse_pair)]
    pub crop_radius: Option<(usize, usize)>,

    /// Locate the off-axis sideband automatically (uses the background if given)
    #[arg(long)]
    pub auto_calibrate: bool,

    /// Background hologram
    #[arg(long)]
    pub background: Option<PathBuf>,

    /// Normalisation frame
    #[arg(long)]
    pub normalise: Option<PathBuf>,

    /// Use the accelerated (multi-threaded) backend
    #[arg(long)]
    pub accelerated: bool,
}

impl SessionArgs {
    pub fn load_config(&self) -> Result<ReconstructionConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                toml::from_str(&contents).context("Invalid reconstruction config")?
            }
            None => ReconstructionConfig::default(),
        };

        let optical = &mut config.optical;
        if let Some(mode) = self.mode {
            optical.mode = mode.into();
        }
        if let Some(wl) = self.wavelength {
            optical.wavelength = um_to_m(wl);
        }
        if let Some(px) = self.pixel_size {
            optical.pixel_size = um_to_m(px);
        }
        if let Some(ds) = self.downsample {
            optical.downsample = ds;
        }
        if let Some(l) = self.source_distance {
            optical.source_distance = Some(um_to_m(l));
        }
        if let Some(shape) = self.window {
            config.window.shape = shape.into();
        }
        if let Some(t) = self.window_thickness {
            config.window.thickness = t;
        }
        if let Some(r) = self.window_radius {
            config.window.radius = r;
            config.window.auto_sized = false;
        }
        if let Some(c) = self.crop_centre {
            config.off_axis.crop_centre = c;
        }
        if let Some(r) = self.crop_radius {
            config.off_axis.crop_radius = r;
        }
        if self.accelerated {
            config.device = holo_core::compute::DevicePreference::Accelerated;
        }
        Ok(config)
    }

    /// Build a session with references loaded and, if asked, the sideband
    /// calibrated.
    pub fn session(&self, config: ReconstructionConfig, hologram: &Frame) -> Result<Holo> {
        let mut holo = Holo::from_config(config);
        let background = self.background.as_deref().map(load_frame).transpose()?;
        if let Some(path) = &self.normalise {
            holo.set_normalise(Some(load_frame(path)?));
        }
        if self.auto_calibrate {
            if holo.config().optical.mode != Mode::OffAxis {
                bail!("--auto-calibrate only applies to off-axis mode");
            }
            let source = background.as_ref().unwrap_or(hologram);
            holo.calibrate_off_axis(source)
                .context("Off-axis calibration failed")?;
        }
        holo.set_background(background);
        Ok(holo)
    }
}

pub fn load_frame(path: &Path) -> Result<Frame> {
    load_image(path).with_context(|| format!("Failed to load image {}", path.display()))
}

pub fn parse_pair(s: &str) -> std::result::Result<(usize, usize), String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [a, b] => Ok((
            a.parse().map_err(|e| format!("invalid value '{a}': {e}"))?,
            b.parse().map_err(|e| format!("invalid value '{b}': {e}"))?,
        )),
        _ => Err(format!("expected two comma-separated values, got '{s}'")),
    }
}

pub fn parse_roi(s: &str) -> std::result::Result<Roi, String> {
    let values = s
        .split(',')
        .map(|p| p.trim().parse::<usize>().map_err(|e| format!("invalid value '{p}': {e}")))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    match values.as_slice() {
        [x, y, w, h] => Ok(Roi::new(*x, *y, *w, *h)),
        _ => Err(format!("expected x,y,width,height, got '{s}'")),
    }
}
