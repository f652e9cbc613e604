use tracing::info;

use crate::compute::DevicePreference;
use crate::config::{Mode, OutputMode, ReconstructionConfig};
use crate::error::Result;
use crate::focus::{FocusParams, FocusResult};
use crate::frame::{Frame, Roi};
use crate::offaxis::OffAxisCalibration;
use crate::phase::TiltMap;
use crate::reconstruct::{ProcessedFrame, Reconstructor, ReferenceFrames};
use crate::stack::DepthStack;
use crate::window::WindowShape;

/// A reconstruction session: current settings, reference frames and caches.
///
/// Setters only record state; all numeric work happens in `process`,
/// `auto_focus`, `depth_stack` and the two calibration calls. Lengths are in
/// meters.
pub struct Holo {
    config: ReconstructionConfig,
    refs: ReferenceFrames,
    reconstructor: Reconstructor,
    last_frame: Option<Frame>,
}

impl Holo {
    pub fn new(mode: Mode, wavelength: f64, pixel_size: f64) -> Self {
        Self::from_config(ReconstructionConfig::new(mode, wavelength, pixel_size))
    }

    pub fn from_config(config: ReconstructionConfig) -> Self {
        Self {
            reconstructor: Reconstructor::new(config.device),
            config,
            refs: ReferenceFrames::new(),
            last_frame: None,
        }
    }

    pub fn config(&self) -> &ReconstructionConfig {
        &self.config
    }

    pub fn references(&self) -> &ReferenceFrames {
        &self.refs
    }

    /// Most recent raw frame handed to `process`.
    pub fn last_frame(&self) -> Option<&Frame> {
        self.last_frame.as_ref()
    }

    pub fn backend_name(&self) -> &str {
        self.reconstructor.backend_name()
    }

    pub fn set_wavelength(&mut self, wavelength: f64) {
        self.config.optical.wavelength = wavelength;
    }

    pub fn set_pixel_size(&mut self, pixel_size: f64) {
        self.config.optical.pixel_size = pixel_size;
    }

    pub fn set_depth(&mut self, depth: f64) {
        self.config.optical.depth = depth;
    }

    pub fn set_downsample(&mut self, factor: usize) {
        self.config.optical.downsample = factor;
    }

    pub fn set_source_distance(&mut self, distance: Option<f64>) {
        self.config.optical.source_distance = distance;
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.config.optical.mode = mode;
    }

    pub fn set_background(&mut self, background: Option<Frame>) {
        self.refs.set_background(background);
    }

    pub fn set_normalise(&mut self, normalise: Option<Frame>) {
        self.refs.set_normalise(normalise);
    }

    pub fn set_window_shape(&mut self, shape: WindowShape) {
        self.config.window.shape = shape;
    }

    /// Taper width in pixels.
    pub fn set_window_thickness(&mut self, thickness: f64) {
        self.config.window.thickness = thickness;
    }

    pub fn set_auto_window(&mut self, auto_sized: bool) {
        self.config.window.auto_sized = auto_sized;
    }

    /// Radius (or half-extent) in pixels, used when auto-sizing is off.
    pub fn set_window_radius(&mut self, radius: f64) {
        self.config.window.radius = radius;
    }

    pub fn clear_window(&mut self) {
        self.config.window.shape = WindowShape::None;
    }

    /// Sideband centre (x, y) in spectrum pixels.
    pub fn set_crop_centre(&mut self, centre: (usize, usize)) {
        self.config.off_axis.crop_centre = centre;
    }

    /// Crop radius (rx, ry) in spectrum pixels.
    pub fn set_crop_radius(&mut self, radius: (usize, usize)) {
        self.config.off_axis.crop_radius = radius;
    }

    pub fn set_refocus(&mut self, refocus: bool) {
        self.config.refocus = refocus;
    }

    pub fn set_relative_phase(&mut self, relative: bool) {
        self.config.phase.relative_phase = relative;
    }

    /// Select the accelerated backend. Results do not change, only speed.
    pub fn set_use_cuda(&mut self, use_cuda: bool) {
        self.config.device = if use_cuda {
            DevicePreference::Accelerated
        } else {
            DevicePreference::Cpu
        };
    }

    pub fn set_invert(&mut self, invert: bool) {
        self.config.invert = invert;
    }

    pub fn set_output(&mut self, output: OutputMode) {
        self.config.output = output;
    }

    pub fn set_unwrap(&mut self, unwrap: bool) {
        self.config.phase.unwrap = unwrap;
    }

    pub fn set_remove_tilt(&mut self, remove: bool) {
        self.config.phase.remove_tilt = remove;
    }

    pub fn set_dic(&mut self, dic: bool) {
        self.config.phase.dic = dic;
    }

    pub fn set_dic_shear_angle(&mut self, angle: f64) {
        self.config.phase.dic_shear_angle = angle;
    }

    pub fn set_reference_roi(&mut self, roi: Option<Roi>) {
        self.config.phase.reference_roi = roi;
    }

    /// Detect the sideband in `frame` and adopt it as the crop.
    pub fn calibrate_off_axis(&mut self, frame: &Frame) -> Result<OffAxisCalibration> {
        let calib = self.reconstructor.calibrate_off_axis(frame, &self.config)?;
        self.config.off_axis = calib;
        Ok(calib)
    }

    /// Acquire a tilt map from `frame` under the current settings.
    pub fn obtain_tilt(&mut self, frame: &Frame) -> Result<TiltMap> {
        let tilt = self.reconstructor.obtain_tilt(frame, &self.config, &self.refs)?;
        self.refs.set_tilt(Some(tilt.clone()));
        Ok(tilt)
    }

    pub fn clear_tilt(&mut self) {
        self.refs.set_tilt(None);
    }

    /// Process a frame. Never fails: on error the raw frame comes back with a
    /// pass-through status.
    pub fn process(&mut self, frame: &Frame) -> ProcessedFrame {
        self.last_frame = Some(frame.clone());
        self.reconstructor
            .process_or_passthrough(frame, &self.config, &self.refs)
    }

    /// Autofocus the last processed frame. `Ok(None)` when no frame has been
    /// seen yet. The configured depth is left unchanged.
    pub fn auto_focus(&mut self, params: &FocusParams) -> Result<Option<FocusResult>> {
        self.auto_focus_with_progress(params, |_| {})
    }

    pub fn auto_focus_with_progress(
        &mut self,
        params: &FocusParams,
        on_progress: impl Fn(usize),
    ) -> Result<Option<FocusResult>> {
        let Some(frame) = self.last_frame.clone() else {
            info!("Autofocus requested with no frame available");
            return Ok(None);
        };
        self.reconstructor
            .auto_focus_with_progress(&frame, &self.config, &self.refs, params, on_progress)
            .map(Some)
    }

    pub fn depth_stack(&mut self, frame: &Frame, range: (f64, f64), n: usize) -> Result<DepthStack> {
        self.depth_stack_with_progress(frame, range, n, |_| {})
    }

    pub fn depth_stack_with_progress(
        &mut self,
        frame: &Frame,
        range: (f64, f64),
        n: usize,
        on_progress: impl Fn(usize),
    ) -> Result<DepthStack> {
        self.reconstructor
            .depth_stack_with_progress(frame, &self.config, &self.refs, range, n, on_progress)
    }
}
