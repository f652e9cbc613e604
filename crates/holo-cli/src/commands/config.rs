use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use holo_core::config::{um_to_m, Mode, ReconstructionConfig};
use holo_core::window::WindowShape;

#[derive(Args)]
pub struct ConfigArgs {
    /// Write config to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Print or save a default ReconstructionConfig as TOML. Lengths are meters.
pub fn run(args: &ConfigArgs) -> Result<()> {
    let mut config = ReconstructionConfig::new(Mode::Inline, um_to_m(0.633), um_to_m(1.0));
    config.refocus = true;
    config.window.shape = WindowShape::Circle;
    let toml_str = toml::to_string_pretty(&config)?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &toml_str)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Default config saved to {}", path.display());
    } else {
        print!("{}", toml_str);
    }

    Ok(())
}
