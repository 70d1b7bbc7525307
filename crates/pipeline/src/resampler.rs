//! Stateful resampler pair
//!
//! One upsampler (caller rate -> engine rate) and one downsampler (engine
//! rate -> caller rate) per session. Filter history lives inside each
//! resampler and carries across every call for the life of the session; it
//! is never reset mid-stream.

use audx_core::{audio::quality, Error, Result};
use rubato::{
    Resampler as _, SincFixedIn, SincInterpolationParameters, SincInterpolationType,
    WindowFunction,
};

/// Stateful mono sample-rate converter
///
/// The number of samples produced per call depends on the rate ratio and
/// the filter state, and need not match any target count.
pub trait StreamResampler: Send {
    /// Samples expected per `process_into` call
    fn input_frames(&self) -> usize;

    /// Upper bound on samples produced by one call
    fn output_frames_max(&self) -> usize;

    /// Convert `input`, appending the produced samples to `output`
    ///
    /// Returns the number of samples appended.
    fn process_into(&mut self, input: &[f32], output: &mut Vec<f32>) -> Result<usize>;
}

/// Interpolation between oversampled sinc points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interpolation {
    Nearest,
    Linear,
    Cubic,
}

impl Interpolation {
    fn to_rubato(self) -> SincInterpolationType {
        match self {
            Interpolation::Nearest => SincInterpolationType::Nearest,
            Interpolation::Linear => SincInterpolationType::Linear,
            Interpolation::Cubic => SincInterpolationType::Cubic,
        }
    }
}

/// Window applied to the sinc kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Window {
    Hann2,
    Blackman2,
    BlackmanHarris2,
}

impl Window {
    fn to_rubato(self) -> WindowFunction {
        match self {
            Window::Hann2 => WindowFunction::Hann2,
            Window::Blackman2 => WindowFunction::Blackman2,
            Window::BlackmanHarris2 => WindowFunction::BlackmanHarris2,
        }
    }
}

/// Sinc interpolation settings for one quality level
#[derive(Debug, Clone, Copy)]
struct QualityLevel {
    sinc_len: usize,
    oversampling_factor: usize,
    f_cutoff: f32,
    interpolation: Interpolation,
    window: Window,
}

impl QualityLevel {
    fn parameters(&self) -> SincInterpolationParameters {
        SincInterpolationParameters {
            sinc_len: self.sinc_len,
            f_cutoff: self.f_cutoff,
            interpolation: self.interpolation.to_rubato(),
            oversampling_factor: self.oversampling_factor,
            window: self.window.to_rubato(),
        }
    }
}

const fn level(
    sinc_len: usize,
    oversampling_factor: usize,
    f_cutoff: f32,
    interpolation: Interpolation,
    window: Window,
) -> QualityLevel {
    QualityLevel {
        sinc_len,
        oversampling_factor,
        f_cutoff,
        interpolation,
        window,
    }
}

/// Quality 0 (index 0) through 10
const QUALITY_LEVELS: [QualityLevel; 11] = [
    level(8, 32, 0.80, Interpolation::Nearest, Window::Hann2),
    level(16, 64, 0.82, Interpolation::Linear, Window::Hann2),
    level(32, 64, 0.85, Interpolation::Linear, Window::Hann2),
    level(48, 96, 0.88, Interpolation::Linear, Window::Blackman2),
    level(64, 128, 0.90, Interpolation::Linear, Window::Blackman2),
    level(80, 128, 0.91, Interpolation::Linear, Window::BlackmanHarris2),
    level(96, 128, 0.92, Interpolation::Cubic, Window::BlackmanHarris2),
    level(128, 160, 0.93, Interpolation::Cubic, Window::BlackmanHarris2),
    level(160, 192, 0.94, Interpolation::Cubic, Window::BlackmanHarris2),
    level(192, 224, 0.945, Interpolation::Cubic, Window::BlackmanHarris2),
    level(256, 256, 0.95, Interpolation::Cubic, Window::BlackmanHarris2),
];

fn quality_level(q: i32) -> Result<QualityLevel> {
    if !quality::is_valid(q) {
        return Err(Error::InvalidQuality(q));
    }
    Ok(QUALITY_LEVELS[q as usize])
}

/// Windowed-sinc resampler over rubato's `SincFixedIn`
pub struct SincResampler {
    inner: SincFixedIn<f32>,
    /// Reused output buffer, sized to `output_frames_max()`
    scratch: Vec<Vec<f32>>,
    rate_in: u32,
    rate_out: u32,
}

impl SincResampler {
    /// Resampler consuming exactly `chunk_size` samples per call
    pub fn new(rate_in: u32, rate_out: u32, chunk_size: usize, quality: i32) -> Result<Self> {
        let level = quality_level(quality)?;

        if rate_in == 0 || rate_out == 0 {
            return Err(Error::ResamplerInit(format!(
                "invalid rate pair {} -> {} Hz",
                rate_in, rate_out
            )));
        }
        if chunk_size == 0 {
            return Err(Error::ResamplerInit("chunk size must be non-zero".to_string()));
        }

        let params = level.parameters();

        let ratio = rate_out as f64 / rate_in as f64;
        let inner = SincFixedIn::<f32>::new(ratio, 1.0, params, chunk_size, 1).map_err(|e| {
            Error::ResamplerInit(format!(
                "failed to create resampler {} -> {} Hz: {}",
                rate_in, rate_out, e
            ))
        })?;

        let mut buffer = Vec::new();
        buffer.try_reserve_exact(inner.output_frames_max())?;
        buffer.resize(inner.output_frames_max(), 0.0);

        Ok(Self {
            inner,
            scratch: vec![buffer],
            rate_in,
            rate_out,
        })
    }

    pub fn rate_in(&self) -> u32 {
        self.rate_in
    }

    pub fn rate_out(&self) -> u32 {
        self.rate_out
    }
}

impl StreamResampler for SincResampler {
    fn input_frames(&self) -> usize {
        self.inner.input_frames_next()
    }

    fn output_frames_max(&self) -> usize {
        self.inner.output_frames_max()
    }

    fn process_into(&mut self, input: &[f32], output: &mut Vec<f32>) -> Result<usize> {
        let expected = self.inner.input_frames_next();
        if input.len() != expected {
            return Err(Error::Resample(format!(
                "expected {} input samples, got {}",
                expected,
                input.len()
            )));
        }

        let (_, produced) = self
            .inner
            .process_into_buffer(&[input], self.scratch.as_mut_slice(), None)
            .map_err(|e| Error::Resample(e.to_string()))?;

        output.try_reserve(produced)?;
        output.extend_from_slice(&self.scratch[0][..produced]);
        Ok(produced)
    }
}

impl std::fmt::Debug for SincResampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SincResampler")
            .field("rate_in", &self.rate_in)
            .field("rate_out", &self.rate_out)
            .field("chunk_size", &self.inner.input_frames_next())
            .finish()
    }
}

/// Upsampler and downsampler owned together by one session
pub struct ResamplerPair {
    pub(crate) up: Box<dyn StreamResampler>,
    pub(crate) down: Box<dyn StreamResampler>,
}

impl ResamplerPair {
    pub fn new(up: Box<dyn StreamResampler>, down: Box<dyn StreamResampler>) -> Self {
        Self { up, down }
    }

    /// Sinc pair between `input_rate` and `engine_rate`
    ///
    /// The upsampler consumes `input_frame` samples per call and the
    /// downsampler consumes `engine_frame`. If the downsampler cannot be
    /// built the upsampler is dropped before the error is returned.
    pub fn create(
        input_rate: u32,
        engine_rate: u32,
        input_frame: usize,
        engine_frame: usize,
        quality: i32,
    ) -> Result<Self> {
        let up = SincResampler::new(input_rate, engine_rate, input_frame, quality)?;
        let down = SincResampler::new(engine_rate, input_rate, engine_frame, quality)?;

        tracing::debug!(
            input_rate,
            engine_rate,
            input_frame,
            engine_frame,
            quality,
            "Resampler pair created"
        );

        Ok(Self::new(Box::new(up), Box::new(down)))
    }

    pub fn upsampler(&self) -> &dyn StreamResampler {
        self.up.as_ref()
    }

    pub fn downsampler(&self) -> &dyn StreamResampler {
        self.down.as_ref()
    }
}
