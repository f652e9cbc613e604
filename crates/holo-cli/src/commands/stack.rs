use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use holo_core::config::{m_to_um, um_to_m};
use holo_core::display::{to_display, DisplayScale};
use holo_core::io::{write_frame_stack, write_intensity_stack};
use indicatif::{ProgressBar, ProgressStyle};

use super::reconstruct::OutputArg;
use super::{load_frame, SessionArgs};
use crate::summary::print_session_summary;

#[derive(Args)]
pub struct StackArgs {
    /// Input hologram image
    pub file: PathBuf,

    #[command(flatten)]
    pub session: SessionArgs,

    /// First depth in µm
    #[arg(long, allow_hyphen_values = true)]
    pub min: f64,

    /// Last depth in µm
    #[arg(long, allow_hyphen_values = true)]
    pub max: f64,

    /// Number of depths, both ends included
    #[arg(long, default_value = "10")]
    pub count: usize,

    /// Write rendered frames of this kind instead of raw intensity
    #[arg(long, value_enum)]
    pub render: Option<OutputArg>,

    /// Output file path
    #[arg(short, long, default_value = "stack.tiff")]
    pub output: PathBuf,
}

pub fn run(args: &StackArgs) -> Result<()> {
    let mut config = args.session.load_config()?;
    config.refocus = true;
    if let Some(render) = args.render {
        config.output = render.into();
    }

    let hologram = load_frame(&args.file)?;
    let mut holo = args.session.session(config, &hologram)?;
    print_session_summary(holo.config(), holo.backend_name(), &args.file, Some(&args.output));

    let pb = ProgressBar::new(args.count as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    pb.set_message("Propagating");

    let stack = holo
        .depth_stack_with_progress(
            &hologram,
            (um_to_m(args.min), um_to_m(args.max)),
            args.count,
            |done| pb.set_position(done as u64),
        )
        .context("Depth stack failed")?;
    pb.finish_and_clear();

    let written = if args.render.is_some() {
        let scale = DisplayScale::for_config(holo.config());
        let pages: Vec<_> = stack.frames().map(|f| to_display(f, scale)).collect();
        write_frame_stack(&pages, &args.output)
    } else {
        write_intensity_stack(&stack, &args.output)
    };
    written.with_context(|| format!("Failed to write {}", args.output.display()))?;

    let depths: Vec<String> = stack
        .depths()
        .iter()
        .map(|d| format!("{:.2}", m_to_um(*d)))
        .collect();
    println!("Depths (µm): {}", depths.join(", "));
    println!("Saved {} pages to {}", stack.len(), args.output.display());
    Ok(())
}
