use std::path::Path;

use console::Style;
use holo_core::config::{m_to_um, Mode, OutputMode, ReconstructionConfig};
use holo_core::window::WindowShape;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_session_summary(config: &ReconstructionConfig, device_name: &str, input: &Path, output: Option<&Path>) {
    let s = Styles::new();
    let optics = &config.optical;

    println!();
    println!("  {}", s.title.apply_to("Holo Reconstruction"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(19)));
    println!();

    println!("  {:<14}{}", s.label.apply_to("Input"), s.path.apply_to(input.display()));
    if let Some(output) = output {
        println!("  {:<14}{}", s.label.apply_to("Output"), s.path.apply_to(output.display()));
    }
    println!("  {:<14}{}", s.label.apply_to("Device"), s.method.apply_to(device_name));
    println!();

    println!("  {}", s.header.apply_to("Optics"));
    println!("    {:<12}{}", s.label.apply_to("Mode"), s.method.apply_to(optics.mode));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Wavelength"),
        s.value.apply_to(format!("{:.3} µm", m_to_um(optics.wavelength)))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Pixel size"),
        s.value.apply_to(format!("{:.3} µm", m_to_um(optics.pixel_size)))
    );
    if optics.downsample > 1 {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Downsample"),
            s.value.apply_to(format!("{}x", optics.downsample))
        );
    }
    if config.refocus {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Depth"),
            s.value.apply_to(format!("{:.2} µm", m_to_um(optics.depth)))
        );
    } else {
        println!("    {:<12}{}", s.label.apply_to("Refocus"), s.disabled.apply_to("off"));
    }
    if let Some(l) = optics.source_distance {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Source"),
            s.value.apply_to(format!("{:.1} µm", m_to_um(l)))
        );
    }
    if optics.mode == Mode::OffAxis {
        let c = config.off_axis;
        println!(
            "    {:<12}{}",
            s.label.apply_to("Sideband"),
            s.value.apply_to(format!(
                "({}, {}) r=({}, {})",
                c.crop_centre.0, c.crop_centre.1, c.crop_radius.0, c.crop_radius.1
            ))
        );
    }
    println!();

    println!("  {}", s.header.apply_to("Processing"));
    if config.window.shape == WindowShape::None {
        println!("    {:<12}{}", s.label.apply_to("Window"), s.disabled.apply_to("none"));
    } else {
        let extent = if config.window.auto_sized {
            "auto".to_string()
        } else {
            format!("r={:.0} px", config.window.radius)
        };
        println!(
            "    {:<12}{}",
            s.label.apply_to("Window"),
            s.method.apply_to(format!(
                "{} ({extent}, taper {:.0} px)",
                config.window.shape, config.window.thickness
            ))
        );
    }
    println!("    {:<12}{}", s.label.apply_to("Output"), s.method.apply_to(config.output));
    if config.output == OutputMode::Phase {
        let p = &config.phase;
        let flags: Vec<&str> = [
            (p.unwrap, "unwrap"),
            (p.relative_phase, "relative"),
            (p.remove_tilt, "tilt removal"),
            (p.dic, "DIC"),
            (p.reference_roi.is_some(), "ROI zero"),
        ]
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, name)| *name)
        .collect();
        if flags.is_empty() {
            println!("    {:<12}{}", s.label.apply_to("Phase"), s.disabled.apply_to("wrapped"));
        } else {
            println!("    {:<12}{}", s.label.apply_to("Phase"), s.value.apply_to(flags.join(", ")));
        }
    }
    println!();
}
