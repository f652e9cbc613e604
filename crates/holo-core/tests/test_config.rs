use holo_core::compute::DevicePreference;
use holo_core::config::{Mode, OutputMode, ReconstructionConfig};
use holo_core::error::HoloError;
use holo_core::window::WindowShape;

#[test]
fn test_empty_json_gives_defaults() {
    let config: ReconstructionConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, ReconstructionConfig::default());
    assert_eq!(config.optical.downsample, 1);
    assert_eq!(config.optical.mode, Mode::Inline);
    assert_eq!(config.output, OutputMode::Amplitude);
    assert_eq!(config.window.shape, WindowShape::None);
    assert!(!config.refocus);
}

#[test]
fn test_partial_json_keeps_other_defaults() {
    let json = r#"{
        "optical": { "wavelength": 5.32e-7, "depth": 1.5e-4 },
        "refocus": true,
        "phase": { "unwrap": true }
    }"#;
    let config: ReconstructionConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.optical.wavelength, 5.32e-7);
    assert_eq!(config.optical.depth, 1.5e-4);
    assert_eq!(config.optical.pixel_size, 1.0e-6);
    assert!(config.refocus);
    assert!(config.phase.unwrap);
    assert!(!config.phase.dic);
    assert_eq!(config.device, DevicePreference::default());
}

#[test]
fn test_config_round_trips_through_json() {
    let mut config = ReconstructionConfig::new(Mode::OffAxis, 0.6e-6, 3.45e-6);
    config.off_axis.crop_centre = (120, 80);
    config.off_axis.crop_radius = (30, 25);
    config.optical.source_distance = Some(0.02);
    let json = serde_json::to_string(&config).unwrap();
    let back: ReconstructionConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}

#[test]
fn test_validate_rejects_bad_settings() {
    let mut config = ReconstructionConfig::new(Mode::Inline, 0.5e-6, 1e-6);
    assert!(config.validate().is_ok());

    config.optical.downsample = 0;
    assert!(matches!(config.validate(), Err(HoloError::InvalidConfiguration(_))));
    config.optical.downsample = 2;

    config.refocus = true;
    config.optical.wavelength = 0.0;
    assert!(matches!(config.validate(), Err(HoloError::InvalidConfiguration(_))));

    // Inline without refocus never touches the optics.
    config.refocus = false;
    assert!(config.validate().is_ok());

    config.optical.source_distance = Some(-1.0);
    assert!(config.validate().is_err());
}

#[test]
fn test_plane_wave_equivalent_scales_by_magnification() {
    let mut config = ReconstructionConfig::new(Mode::Inline, 0.5e-6, 2e-6);
    let (z, p) = config.optical.plane_wave_equivalent(1e-3, 2e-6).unwrap();
    assert_eq!((z, p), (1e-3, 2e-6));

    config.optical.source_distance = Some(5e-3);
    // M = 5 / (5 - 1) = 1.25
    let (z, p) = config.optical.plane_wave_equivalent(1e-3, 2e-6).unwrap();
    assert!((z - 0.8e-3).abs() < 1e-15);
    assert!((p - 1.6e-6).abs() < 1e-18);

    assert!(config.optical.plane_wave_equivalent(5e-3, 2e-6).is_err());
}
