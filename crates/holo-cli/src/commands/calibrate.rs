use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use console::Style;
use holo_core::config::Mode;
use holo_core::Holo;

use super::{load_frame, SessionArgs};

#[derive(Args)]
pub struct CalibrateArgs {
    /// Off-axis hologram (or background) image
    pub file: PathBuf,

    #[command(flatten)]
    pub session: SessionArgs,

    /// Save the config with the detected crop as TOML
    #[arg(long)]
    pub save_config: Option<PathBuf>,
}

pub fn run(args: &CalibrateArgs) -> Result<()> {
    let mut config = args.session.load_config()?;
    config.optical.mode = Mode::OffAxis;

    let frame = load_frame(&args.file)?;
    let mut holo = Holo::from_config(config);
    let calib = holo
        .calibrate_off_axis(&frame)
        .context("Off-axis calibration failed")?;

    let label = Style::new().dim();
    let value = Style::new().bold().white();
    println!();
    println!("  {}", Style::new().cyan().bold().apply_to("Off-axis Calibration"));
    println!(
        "  {:<14}{}",
        label.apply_to("Frame"),
        value.apply_to(format!("{}x{}", frame.width(), frame.height()))
    );
    println!(
        "  {:<14}{}",
        label.apply_to("Crop centre"),
        value.apply_to(format!("{},{}", calib.crop_centre.0, calib.crop_centre.1))
    );
    println!(
        "  {:<14}{}",
        label.apply_to("Crop radius"),
        value.apply_to(format!("{},{}", calib.crop_radius.0, calib.crop_radius.1))
    );
    let (oh, ow) = calib.output_dim();
    println!(
        "  {:<14}{}",
        label.apply_to("Field size"),
        value.apply_to(format!("{ow}x{oh}"))
    );
    println!();

    if let Some(path) = &args.save_config {
        let toml_str = toml::to_string_pretty(holo.config())?;
        std::fs::write(path, &toml_str)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Config saved to {}", path.display());
    }
    Ok(())
}
