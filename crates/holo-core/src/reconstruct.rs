//! Per-frame reconstruction: correction, demodulation, windowing, refocus and
//! output rendering.
//!
//! `Reconstructor` holds caches only. Every call takes the configuration and
//! reference frames explicitly, so concurrent sessions never observe each
//! other's settings.

use std::sync::Arc;

use ndarray::Zip;
use tracing::{debug, warn};

use crate::compute::cpu::fftshift;
use crate::compute::{create_backend, DevicePreference};
use crate::config::{Mode, OutputMode, PhaseOptions, ReconstructionConfig};
use crate::consts::EPSILON_F64;
use crate::correct::{correct, downsample};
use crate::error::{HoloError, Result};
use crate::focus::{auto_focus_with_progress, FocusParams, FocusResult};
use crate::frame::{check_same_dim, ComplexFrame, Frame};
use crate::offaxis::{self, OffAxisCalibration};
use crate::phase::{self, obtain_tilt, TiltMap};
use crate::propagate::{PixelPitch, Propagator};
use crate::stack::{depth_stack_with_progress, DepthStack};
use crate::window::{apply_window, WindowCache};

/// Background, normalisation and tilt references owned by the caller.
///
/// Every change bumps `revision`, which keys the reconstructor's derived
/// reference cache.
#[derive(Clone, Debug, Default)]
pub struct ReferenceFrames {
    background: Option<Frame>,
    normalise: Option<Frame>,
    tilt: Option<TiltMap>,
    revision: u64,
}

impl ReferenceFrames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn background(&self) -> Option<&Frame> {
        self.background.as_ref()
    }

    pub fn normalise(&self) -> Option<&Frame> {
        self.normalise.as_ref()
    }

    pub fn tilt(&self) -> Option<&TiltMap> {
        self.tilt.as_ref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn set_background(&mut self, background: Option<Frame>) {
        self.background = background;
        self.revision += 1;
    }

    pub fn set_normalise(&mut self, normalise: Option<Frame>) {
        self.normalise = normalise;
        self.revision += 1;
    }

    pub fn set_tilt(&mut self, tilt: Option<TiltMap>) {
        self.tilt = tilt;
        self.revision += 1;
    }
}

#[derive(Debug)]
pub enum ProcessStatus {
    Processed,
    /// Processing failed; the frame is the unprocessed input.
    Passthrough(HoloError),
}

#[derive(Debug)]
pub struct ProcessedFrame {
    pub frame: Frame,
    pub status: ProcessStatus,
}

impl ProcessedFrame {
    pub fn is_passthrough(&self) -> bool {
        matches!(self.status, ProcessStatus::Passthrough(_))
    }
}

/// A hologram turned into a windowed complex field, ready to propagate.
#[derive(Clone, Debug)]
pub struct PreparedHologram {
    pub field: ComplexFrame,
    /// Sample spacing of `field` before any curvature scaling.
    pub pitch: PixelPitch,
}

#[derive(Clone, PartialEq)]
struct ReferenceKey {
    revision: u64,
    config: ReconstructionConfig,
}

pub struct Reconstructor {
    propagator: Propagator,
    device: DevicePreference,
    window: WindowCache,
    reference: Option<(ReferenceKey, ComplexFrame)>,
}

impl Default for Reconstructor {
    fn default() -> Self {
        Self::new(DevicePreference::default())
    }
}

impl Reconstructor {
    pub fn new(device: DevicePreference) -> Self {
        Self {
            propagator: Propagator::new(create_backend(&device)),
            device,
            window: WindowCache::new(),
            reference: None,
        }
    }

    pub fn device(&self) -> DevicePreference {
        self.device
    }

    pub fn backend_name(&self) -> &str {
        self.propagator.backend().name()
    }

    fn sync_backend(&mut self, device: DevicePreference) {
        if device != self.device {
            let backend = create_backend(&device);
            debug!(backend = backend.name(), "Switching compute backend");
            self.propagator.set_backend(backend);
            self.device = device;
        }
    }

    /// Process one raw frame into the configured output.
    pub fn process(&mut self, frame: &Frame, config: &ReconstructionConfig, refs: &ReferenceFrames) -> Result<Frame> {
        config.validate()?;
        frame.validate()?;
        self.sync_backend(config.device);

        if config.output == OutputMode::Spectrum {
            return self.spectrum_view(frame, config, refs);
        }

        if config.optical.mode == Mode::Inline && !config.refocus {
            let corrected = downsample(
                &correct(frame, refs.background(), refs.normalise())?,
                config.optical.downsample,
            )?;
            return Ok(if config.invert && config.output == OutputMode::Amplitude {
                let max = corrected.max();
                Frame::new(corrected.data.mapv(|v| max - v))
            } else {
                corrected
            });
        }

        let field = self.reconstruct_field(frame, config, refs)?;
        render(&field, config, refs.tilt())
    }

    /// [`Reconstructor::process`] with failures absorbed: the raw input comes
    /// back with a `Passthrough` status and a warning is logged.
    pub fn process_or_passthrough(
        &mut self,
        frame: &Frame,
        config: &ReconstructionConfig,
        refs: &ReferenceFrames,
    ) -> ProcessedFrame {
        match self.process(frame, config, refs) {
            Ok(processed) => ProcessedFrame {
                frame: processed,
                status: ProcessStatus::Processed,
            },
            Err(e) => {
                warn!(error = %e, recoverable = e.is_recoverable(), "Frame passed through unprocessed");
                ProcessedFrame {
                    frame: frame.clone(),
                    status: ProcessStatus::Passthrough(e),
                }
            }
        }
    }

    /// Refocused complex field for `frame`, relative phase applied.
    pub fn reconstruct_field(
        &mut self,
        frame: &Frame,
        config: &ReconstructionConfig,
        refs: &ReferenceFrames,
    ) -> Result<ComplexFrame> {
        let hologram = self.prepare(frame, config, refs)?;
        let field = self.refocus(&hologram, config)?;

        if config.phase.relative_phase {
            if let Some(reference) = self.reference_field(frame.dim(), config, refs)? {
                return phase::relative_phase(&field, &reference);
            }
        }
        Ok(field)
    }

    /// Correct, demodulate and window `frame` without propagating it.
    pub fn prepare(
        &mut self,
        frame: &Frame,
        config: &ReconstructionConfig,
        refs: &ReferenceFrames,
    ) -> Result<PreparedHologram> {
        config.validate()?;
        frame.validate()?;
        self.sync_backend(config.device);
        let hologram = self.hologram_field(frame, config, refs, false)?;
        let field = self.windowed(hologram.field, config)?;
        Ok(PreparedHologram {
            field,
            pitch: hologram.pitch,
        })
    }

    fn hologram_field(
        &self,
        frame: &Frame,
        config: &ReconstructionConfig,
        refs: &ReferenceFrames,
        is_reference: bool,
    ) -> Result<PreparedHologram> {
        let optics = &config.optical;
        let sampled = PixelPitch::square(optics.sampled_pixel_size());
        match optics.mode {
            Mode::Inline => {
                let background = if is_reference { None } else { refs.background() };
                let corrected = correct(frame, background, refs.normalise())?;
                let reduced = downsample(&corrected, optics.downsample)?;
                Ok(PreparedHologram {
                    field: reduced.to_field(),
                    pitch: sampled,
                })
            }
            Mode::OffAxis => {
                let backend = self.propagator.backend().as_ref();
                let reduced = downsample(frame, optics.downsample)?;
                let mut field = offaxis::demodulate(&reduced, &config.off_axis, backend)?;
                if let Some(norm) = refs.normalise() {
                    check_same_dim("normalisation frame", frame.dim(), norm.dim())?;
                    let norm_field = offaxis::demodulate(
                        &downsample(norm, optics.downsample)?,
                        &config.off_axis,
                        backend,
                    )?;
                    field.data = Zip::from(&field.data)
                        .and(&norm_field.data)
                        .map_collect(|&f, &n| f / n.norm().max(EPSILON_F64));
                }
                Ok(PreparedHologram {
                    pitch: config.off_axis.demodulated_pitch(reduced.dim(), sampled),
                    field,
                })
            }
        }
    }

    fn windowed(&mut self, field: ComplexFrame, config: &ReconstructionConfig) -> Result<ComplexFrame> {
        match self.window.get(&config.window, field.dim())? {
            Some(mask) => apply_window(&field, mask),
            None => Ok(field),
        }
    }

    fn refocus(&mut self, hologram: &PreparedHologram, config: &ReconstructionConfig) -> Result<ComplexFrame> {
        if !config.propagates() {
            return Ok(hologram.field.clone());
        }
        let optics = &config.optical;
        let (depth, scale) = optics.plane_wave_equivalent(optics.depth, 1.0)?;
        self.propagator
            .propagate(&hologram.field, depth, optics.wavelength, hologram.pitch.scaled(scale))
    }

    /// The background pushed through the same pipeline as the hologram, for
    /// use as a phase reference. Cached until the references or the
    /// configuration change. The background must match the hologram size
    /// `dim`.
    fn reference_field(
        &mut self,
        dim: (usize, usize),
        config: &ReconstructionConfig,
        refs: &ReferenceFrames,
    ) -> Result<Option<ComplexFrame>> {
        let Some(background) = refs.background() else {
            return Ok(None);
        };
        check_same_dim("background", dim, background.dim())?;
        let key = ReferenceKey {
            revision: refs.revision(),
            config: config.clone(),
        };
        if let Some((cached_key, field)) = &self.reference {
            if *cached_key == key {
                return Ok(Some(field.clone()));
            }
        }
        debug!(revision = key.revision, "Rebuilding background reference field");
        let hologram = self.hologram_field(background, config, refs, true)?;
        let hologram = PreparedHologram {
            field: self.windowed(hologram.field, config)?,
            pitch: hologram.pitch,
        };
        let field = self.refocus(&hologram, config)?;
        self.reference = Some((key, field.clone()));
        Ok(Some(field))
    }

    fn spectrum_view(&self, frame: &Frame, config: &ReconstructionConfig, refs: &ReferenceFrames) -> Result<Frame> {
        let corrected = match config.optical.mode {
            Mode::Inline => correct(frame, refs.background(), refs.normalise())?,
            Mode::OffAxis => frame.clone(),
        };
        let reduced = downsample(&corrected, config.optical.downsample)?;
        let spectrum = self.propagator.backend().fft2d(&reduced.to_field().data);
        Ok(Frame::new(fftshift(&spectrum).mapv(|v| v.norm().ln_1p() as f32)))
    }

    /// Locate the off-axis sideband of `frame` at the configured downsampling.
    pub fn calibrate_off_axis(&mut self, frame: &Frame, config: &ReconstructionConfig) -> Result<OffAxisCalibration> {
        frame.validate()?;
        self.sync_backend(config.device);
        let reduced = downsample(frame, config.optical.downsample.max(1))?;
        offaxis::calibrate(&reduced, self.propagator.backend().as_ref())
    }

    /// Fit a tilt plane to the unwrapped phase of `frame` processed with the
    /// current settings.
    pub fn obtain_tilt(&mut self, frame: &Frame, config: &ReconstructionConfig, refs: &ReferenceFrames) -> Result<TiltMap> {
        let field = self.reconstruct_field(frame, config, refs)?;
        let options = PhaseOptions {
            unwrap: true,
            remove_tilt: false,
            dic: false,
            ..config.phase.clone()
        };
        let unwrapped = phase::extract_phase(&field, &options, None)?;
        obtain_tilt(&unwrapped)
    }

    /// Autofocus `frame` without touching `config`. The returned depth is
    /// absolute, in meters.
    pub fn auto_focus(
        &mut self,
        frame: &Frame,
        config: &ReconstructionConfig,
        refs: &ReferenceFrames,
        params: &FocusParams,
    ) -> Result<FocusResult> {
        self.auto_focus_with_progress(frame, config, refs, params, |_| {})
    }

    pub fn auto_focus_with_progress(
        &mut self,
        frame: &Frame,
        config: &ReconstructionConfig,
        refs: &ReferenceFrames,
        params: &FocusParams,
        on_progress: impl Fn(usize),
    ) -> Result<FocusResult> {
        check_optics(config)?;
        let hologram = self.prepare(frame, config, refs)?;
        auto_focus_with_progress(
            &mut self.propagator,
            &hologram.field,
            &config.optical,
            hologram.pitch,
            params,
            on_progress,
        )
    }

    pub fn depth_stack(
        &mut self,
        frame: &Frame,
        config: &ReconstructionConfig,
        refs: &ReferenceFrames,
        range: (f64, f64),
        n: usize,
    ) -> Result<DepthStack> {
        self.depth_stack_with_progress(frame, config, refs, range, n, |_| {})
    }

    /// Reconstruct `frame` at `n` depths across `range`, rendered with the
    /// current output settings. Relative phase uses the background propagated
    /// to each depth.
    pub fn depth_stack_with_progress(
        &mut self,
        frame: &Frame,
        config: &ReconstructionConfig,
        refs: &ReferenceFrames,
        range: (f64, f64),
        n: usize,
        on_progress: impl Fn(usize),
    ) -> Result<DepthStack> {
        check_optics(config)?;
        let hologram = self.prepare(frame, config, refs)?;

        let reference = match (config.phase.relative_phase, refs.background()) {
            (true, Some(background)) => {
                check_same_dim("background", frame.dim(), background.dim())?;
                let r = self.hologram_field(background, config, refs, true)?;
                let field = self.windowed(r.field, config)?;
                let reference_propagator = Propagator::new(Arc::clone(self.propagator.backend()));
                let prepared = reference_propagator.prepare(&field)?;
                Some((reference_propagator, prepared))
            }
            _ => None,
        };
        let reference = std::cell::RefCell::new(reference);

        let optics = &config.optical;
        let pitch = hologram.pitch;
        let render_depth = |depth: f64, field: &ComplexFrame| -> Result<Frame> {
            let field = match reference.borrow_mut().as_mut() {
                Some((propagator, prepared)) => {
                    let (d, scale) = optics.plane_wave_equivalent(depth, 1.0)?;
                    let r = propagator.propagate_prepared(prepared, d, optics.wavelength, pitch.scaled(scale))?;
                    phase::relative_phase(field, &r)?
                }
                None => field.clone(),
            };
            render(&field, config, refs.tilt())
        };

        depth_stack_with_progress(
            &mut self.propagator,
            &hologram.field,
            optics,
            pitch,
            range,
            n,
            render_depth,
            on_progress,
        )
    }
}

/// Turn a complex field into the configured output frame.
pub fn render(field: &ComplexFrame, config: &ReconstructionConfig, tilt: Option<&TiltMap>) -> Result<Frame> {
    match config.output {
        OutputMode::Phase => phase::extract_phase(field, &config.phase, tilt),
        OutputMode::Amplitude | OutputMode::Spectrum => Ok(phase::amplitude(field, config.invert)),
    }
}

fn check_optics(config: &ReconstructionConfig) -> Result<()> {
    let o = &config.optical;
    if !(o.wavelength > 0.0) || !(o.pixel_size > 0.0) {
        return Err(HoloError::InvalidConfiguration(
            "wavelength and pixel size must be > 0 to refocus".into(),
        ));
    }
    Ok(())
}
