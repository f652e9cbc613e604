use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use console::Style;
use holo_core::config::{m_to_um, um_to_m};
use holo_core::focus::{FocusMetric, FocusParams};
use holo_core::frame::Roi;
use indicatif::{ProgressBar, ProgressStyle};

use super::{load_frame, parse_roi, SessionArgs};
use crate::summary::print_session_summary;

#[derive(Args)]
pub struct AutofocusArgs {
    /// Input hologram image
    pub file: PathBuf,

    #[command(flatten)]
    pub session: SessionArgs,

    /// Start of the depth range in µm
    #[arg(long, allow_hyphen_values = true)]
    pub min: f64,

    /// End of the depth range in µm
    #[arg(long, allow_hyphen_values = true)]
    pub max: f64,

    /// Number of coarse subdivisions of the range
    #[arg(long, default_value = "10")]
    pub divisions: usize,

    /// Scored region as x,y,width,height in field pixels
    #[arg(long, value_parser = parse_roi)]
    pub roi: Option<Roi>,

    /// Extra pixels propagated around the ROI
    #[arg(long, default_value = "0")]
    pub margin: usize,

    /// Focus metric (brenner, sobel, sobel-variance, variance, dark-focus, peak)
    #[arg(long, default_value = "brenner")]
    pub metric: FocusMetric,

    /// Fine-search tolerance in µm
    #[arg(long)]
    pub tolerance: Option<f64>,
}

pub fn run(args: &AutofocusArgs) -> Result<()> {
    let mut config = args.session.load_config()?;
    config.refocus = true;

    let hologram = load_frame(&args.file)?;
    let mut holo = args.session.session(config, &hologram)?;
    print_session_summary(holo.config(), holo.backend_name(), &args.file, None);

    let params = FocusParams {
        roi: args.roi,
        margin: args.margin,
        depth_range: (um_to_m(args.min), um_to_m(args.max)),
        coarse_search_interval: args.divisions,
        metric: args.metric,
        tolerance: args.tolerance.map(um_to_m),
        ..FocusParams::default()
    };

    if holo.process(&hologram).is_passthrough() {
        bail!("Hologram could not be processed with these settings");
    }

    let pb = ProgressBar::new(params.evaluation_budget() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    pb.set_message("Focusing");

    let result = holo
        .auto_focus_with_progress(&params, |done| pb.set_position(done as u64))
        .context("Autofocus failed")?;
    pb.finish_and_clear();

    let Some(result) = result else {
        bail!("No frame available for autofocus");
    };
    println!(
        "  {:<14}{}",
        Style::new().dim().apply_to("Best depth"),
        Style::new().bold().green().apply_to(format!("{:.3} µm", m_to_um(result.depth)))
    );
    println!(
        "  {:<14}{}",
        Style::new().dim().apply_to("Score"),
        Style::new().bold().white().apply_to(format!("{:.6e}", result.score))
    );
    Ok(())
}
