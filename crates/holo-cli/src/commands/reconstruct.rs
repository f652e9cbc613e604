use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use holo_core::config::{um_to_m, OutputMode};
use holo_core::display::{to_display, DisplayScale};
use holo_core::frame::Roi;
use holo_core::io::save_image;
use holo_core::ProcessStatus;

use super::{load_frame, parse_roi, SessionArgs};
use crate::summary::print_session_summary;

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputArg {
    Amplitude,
    Phase,
    Spectrum,
}

impl From<OutputArg> for OutputMode {
    fn from(o: OutputArg) -> Self {
        match o {
            OutputArg::Amplitude => OutputMode::Amplitude,
            OutputArg::Phase => OutputMode::Phase,
            OutputArg::Spectrum => OutputMode::Spectrum,
        }
    }
}

#[derive(Args)]
pub struct ReconstructArgs {
    /// Input hologram image
    pub file: PathBuf,

    #[command(flatten)]
    pub session: SessionArgs,

    /// Refocus depth in µm (enables refocusing)
    #[arg(long, allow_hyphen_values = true)]
    pub depth: Option<f64>,

    /// What to output
    #[arg(long, value_enum, default_value = "amplitude")]
    pub output_mode: OutputArg,

    /// Invert amplitude contrast
    #[arg(long)]
    pub invert: bool,

    /// Unwrap the phase map
    #[arg(long)]
    pub unwrap: bool,

    /// Phase relative to the background hologram
    #[arg(long)]
    pub relative_phase: bool,

    /// Zero the mean phase inside x,y,width,height
    #[arg(long, value_parser = parse_roi)]
    pub phase_roi: Option<Roi>,

    /// Acquire a tilt map from this hologram and remove it
    #[arg(long)]
    pub tilt_from: Option<PathBuf>,

    /// Render phase as synthetic DIC
    #[arg(long)]
    pub dic: bool,

    /// DIC shear direction in degrees from +x
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub dic_angle: f64,

    /// Output file path (.tiff or .png)
    #[arg(short, long, default_value = "reconstruction.tiff")]
    pub output: PathBuf,
}

pub fn run(args: &ReconstructArgs) -> Result<()> {
    let mut config = args.session.load_config()?;
    if let Some(depth) = args.depth {
        config.optical.depth = um_to_m(depth);
        config.refocus = true;
    }
    config.output = args.output_mode.into();
    config.invert |= args.invert;
    let phase = &mut config.phase;
    phase.unwrap |= args.unwrap;
    phase.relative_phase |= args.relative_phase;
    phase.dic |= args.dic;
    phase.dic_shear_angle = args.dic_angle.to_radians();
    if args.phase_roi.is_some() {
        phase.reference_roi = args.phase_roi;
    }

    let hologram = load_frame(&args.file)?;
    let mut holo = args.session.session(config, &hologram)?;

    if let Some(path) = &args.tilt_from {
        let tilt_frame = load_frame(path)?;
        let tilt = holo
            .obtain_tilt(&tilt_frame)
            .with_context(|| format!("Failed to acquire tilt from {}", path.display()))?;
        println!(
            "Tilt acquired: {:.4} rad/px (x), {:.4} rad/px (y)",
            tilt.gradient_x, tilt.gradient_y
        );
        holo.set_remove_tilt(true);
    }

    print_session_summary(holo.config(), holo.backend_name(), &args.file, Some(&args.output));

    let processed = holo.process(&hologram);
    if let ProcessStatus::Passthrough(e) = processed.status {
        bail!("Reconstruction failed: {e}");
    }

    let image = to_display(&processed.frame, DisplayScale::for_config(holo.config()));
    save_image(&image, &args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    println!(
        "Saved {}x{} {} to {}",
        image.width(),
        image.height(),
        holo.config().output,
        args.output.display()
    );
    Ok(())
}
