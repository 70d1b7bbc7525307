//! Stream session: the streaming framing protocol
//!
//! Callers hand over PCM16 chunks of any size. The session accumulates them,
//! drains whole input frames (`input_frame_samples` at the caller's rate),
//! converts each to exactly one engine frame, denoises it, restores the
//! caller's rate and queues the result for delivery. Framing depends only on
//! the cumulative input, never on how it was chunked.
//!
//! When the upsampler emits fewer samples than an engine frame, the frame is
//! padded with trailing silence. When it emits more, the excess is carried
//! into the next engine frame; once a full frame is carried it is processed
//! immediately, so the carry stays below one engine frame between calls.

use audx_config::SessionConfig;
use audx_core::audio::{self, engine_to_pcm16, pcm16_to_engine, quality};
use audx_core::{frame_samples_at_rate, Error, Result};
use serde::{Deserialize, Serialize};

use crate::engine::{EngineStats, FrameEngine, VadResult};
use crate::resampler::ResamplerPair;

/// Audio and VAD state returned by `feed` and `flush`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedOutput {
    /// Cleaned PCM16 at the caller's rate; may be empty
    pub audio: Vec<i16>,
    /// Probability from the most recent engine frame (0.0 when VAD output is off)
    pub vad_probability: f32,
    pub is_speech: bool,
    /// Engine frames processed by this call
    pub frames: usize,
}

fn buffer_with_capacity<T>(capacity: usize) -> Result<Vec<T>> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(capacity)?;
    Ok(buffer)
}

fn zeroed(len: usize) -> Result<Vec<f32>> {
    let mut buffer = buffer_with_capacity(len)?;
    buffer.resize(len, 0.0);
    Ok(buffer)
}

/// State for one continuous audio stream
///
/// Not internally synchronized: `feed`, `flush` and the stats calls on one
/// session must be serialized by the owner. Separate sessions share nothing.
pub struct StreamSession {
    engine: FrameEngine,
    /// Present iff the caller's rate differs from the engine rate
    resamplers: Option<ResamplerPair>,
    input_frame_samples: usize,
    report_vad: bool,

    input_buffer: Vec<i16>,
    output_buffer: Vec<i16>,
    /// Upsampled samples not yet handed to the engine
    carry: Vec<f32>,

    // Per-frame scratch, sized once at creation
    frame_in: Vec<f32>,
    engine_in: Vec<f32>,
    engine_out: Vec<f32>,
    restored: Vec<f32>,

    last_vad: VadResult,
}

impl StreamSession {
    /// Session factory: build the engine and resamplers for `config`
    pub fn create(config: &SessionConfig) -> Result<Self> {
        if !quality::is_valid(config.resample_quality) {
            return Err(Error::InvalidQuality(config.resample_quality));
        }
        config.validate()?;

        let engine = FrameEngine::create(&config.denoiser)?;
        let session = Self::with_engine(
            engine,
            config.input_sample_rate,
            audio::ENGINE_SAMPLE_RATE,
            config.resample_quality,
            config.denoiser.enable_vad_output,
        )?;

        tracing::info!(
            input_rate = config.input_sample_rate,
            needs_resampling = session.needs_resampling(),
            input_frame_samples = session.input_frame_samples,
            resample_quality = config.resample_quality,
            "Stream session created"
        );

        Ok(session)
    }

    /// Session around an existing engine, with sinc resamplers if the rates differ
    pub fn with_engine(
        engine: FrameEngine,
        input_rate: u32,
        engine_rate: u32,
        resample_quality: i32,
        report_vad: bool,
    ) -> Result<Self> {
        if input_rate == 0 || engine_rate == 0 {
            return Err(Error::InvalidConfig(format!(
                "sample rates must be non-zero, got {} -> {} Hz",
                input_rate, engine_rate
            )));
        }
        if !quality::is_valid(resample_quality) {
            return Err(Error::InvalidQuality(resample_quality));
        }

        let engine_frame = engine.frame_size();
        let input_frame = frame_samples_at_rate(engine_frame, input_rate, engine_rate);

        let resamplers = if input_rate != engine_rate {
            Some(ResamplerPair::create(
                input_rate,
                engine_rate,
                input_frame,
                engine_frame,
                resample_quality,
            )?)
        } else {
            None
        };

        Self::with_parts(engine, resamplers, input_frame, report_vad)
    }

    /// Session from explicit parts
    ///
    /// Without resamplers the input frame must equal the engine frame. With
    /// resamplers, the upsampler must consume one input frame per call and
    /// the downsampler one engine frame.
    pub fn with_parts(
        engine: FrameEngine,
        resamplers: Option<ResamplerPair>,
        input_frame_samples: usize,
        report_vad: bool,
    ) -> Result<Self> {
        let engine_frame = engine.frame_size();
        if input_frame_samples == 0 || engine_frame == 0 {
            return Err(Error::InvalidConfig(
                "frame sizes must be non-zero".to_string(),
            ));
        }

        let (carry, frame_in, restored) = match &resamplers {
            None => {
                if input_frame_samples != engine_frame {
                    return Err(Error::InvalidConfig(format!(
                        "input frame {} must equal engine frame {} without resampling",
                        input_frame_samples, engine_frame
                    )));
                }
                (Vec::new(), Vec::new(), Vec::new())
            },
            Some(pair) => {
                if pair.up.input_frames() != input_frame_samples
                    || pair.down.input_frames() != engine_frame
                {
                    return Err(Error::InvalidConfig(format!(
                        "resampler chunks {}/{} do not match frames {}/{}",
                        pair.up.input_frames(),
                        pair.down.input_frames(),
                        input_frame_samples,
                        engine_frame
                    )));
                }
                (
                    buffer_with_capacity(2 * engine_frame)?,
                    buffer_with_capacity(input_frame_samples)?,
                    buffer_with_capacity(pair.down.output_frames_max())?,
                )
            },
        };

        Ok(Self {
            engine,
            resamplers,
            input_frame_samples,
            report_vad,
            input_buffer: buffer_with_capacity(2 * input_frame_samples)?,
            output_buffer: buffer_with_capacity(2 * input_frame_samples)?,
            carry,
            frame_in,
            engine_in: zeroed(engine_frame)?,
            engine_out: zeroed(engine_frame)?,
            restored,
            last_vad: VadResult::default(),
        })
    }

    pub fn needs_resampling(&self) -> bool {
        self.resamplers.is_some()
    }

    /// Caller-rate samples consumed per engine frame
    pub fn input_frame_samples(&self) -> usize {
        self.input_frame_samples
    }

    pub fn engine_frame_samples(&self) -> usize {
        self.engine_in.len()
    }

    /// Input samples waiting for a complete frame
    pub fn buffered_samples(&self) -> usize {
        self.input_buffer.len()
    }

    /// Upsampled samples carried into the next engine frame
    pub fn carried_samples(&self) -> usize {
        self.carry.len()
    }

    pub fn last_vad(&self) -> VadResult {
        self.last_vad
    }

    /// Append `samples` and process every complete frame
    ///
    /// An empty chunk is a no-op that reports the last VAD state.
    pub fn feed(&mut self, samples: &[i16]) -> Result<FeedOutput> {
        if samples.is_empty() {
            return Ok(self.deliver(0));
        }

        self.input_buffer.try_reserve(samples.len())?;
        self.input_buffer.extend_from_slice(samples);
        self.drain()
    }

    /// Pad with one frame of silence, drain, then discard the residue
    ///
    /// The carry is discarded too; resampler filter state is kept.
    pub fn flush(&mut self) -> Result<FeedOutput> {
        let padded_len = self.input_buffer.len() + self.input_frame_samples;
        self.input_buffer.try_reserve(self.input_frame_samples)?;
        self.input_buffer.resize(padded_len, 0);

        let result = self.drain();

        tracing::debug!(
            residue = self.input_buffer.len(),
            carry = self.carry.len(),
            "Stream session flushed"
        );
        self.input_buffer.clear();
        self.carry.clear();

        result
    }

    pub fn stats(&self) -> EngineStats {
        self.engine.stats()
    }

    pub fn reset_stats(&mut self) {
        self.engine.reset_stats();
    }

    /// Release the engine and both resamplers
    pub fn destroy(self) {
        drop(self);
    }

    fn drain(&mut self) -> Result<FeedOutput> {
        let frame = self.input_frame_samples;
        let mut consumed = 0;
        let mut frames = 0;
        let mut failure = None;

        while self.input_buffer.len() - consumed >= frame {
            let start = consumed;
            // a failing frame is consumed too
            consumed += frame;
            match self.process_input_frame(start) {
                Ok(n) => frames += n,
                Err(e) => {
                    failure = Some(e);
                    break;
                },
            }
        }

        self.input_buffer.drain(..consumed);

        if let Some(err) = failure {
            tracing::warn!(
                error = %err,
                frames,
                discarded = self.output_buffer.len(),
                "Frame processing failed, dropping output for this call"
            );
            self.output_buffer.clear();
            return Err(err);
        }

        Ok(self.deliver(frames))
    }

    fn deliver(&mut self, frames: usize) -> FeedOutput {
        FeedOutput {
            audio: self.output_buffer.split_off(0),
            vad_probability: self.last_vad.probability,
            is_speech: self.last_vad.is_speech,
            frames,
        }
    }

    /// Run one input frame through the pipeline, returning engine frames used
    fn process_input_frame(&mut self, start: usize) -> Result<usize> {
        let end = start + self.input_frame_samples;
        let Self {
            engine,
            resamplers,
            report_vad,
            input_buffer,
            output_buffer,
            carry,
            frame_in,
            engine_in,
            engine_out,
            restored,
            last_vad,
            ..
        } = self;
        let input = &input_buffer[start..end];

        let Some(pair) = resamplers.as_mut() else {
            for (dst, &sample) in engine_in.iter_mut().zip(input) {
                *dst = pcm16_to_engine(sample);
            }
            let vad = engine.process(engine_in.as_slice(), engine_out.as_mut_slice())?;
            if *report_vad {
                *last_vad = vad;
            }
            output_buffer.try_reserve(engine_out.len())?;
            output_buffer.extend(engine_out.iter().map(|&s| engine_to_pcm16(s)));
            return Ok(1);
        };

        frame_in.clear();
        frame_in.extend(input.iter().map(|&s| pcm16_to_engine(s)));
        let produced = pair.up.process_into(frame_in.as_slice(), carry)?;

        let engine_frame = engine_in.len();
        let mut frames = 0;
        loop {
            let take = carry.len().min(engine_frame);
            engine_in[..take].copy_from_slice(&carry[..take]);
            if take < engine_frame {
                engine_in[take..].fill(0.0);
                tracing::trace!(
                    produced,
                    missing = engine_frame - take,
                    "Upsampler shortfall padded with silence"
                );
            }
            carry.drain(..take);

            let vad = engine.process(engine_in.as_slice(), engine_out.as_mut_slice())?;
            if *report_vad {
                *last_vad = vad;
            }
            frames += 1;

            restored.clear();
            pair.down.process_into(engine_out.as_slice(), restored)?;
            output_buffer.try_reserve(restored.len())?;
            output_buffer.extend(restored.iter().map(|&s| engine_to_pcm16(s)));

            if carry.len() < engine_frame {
                break;
            }
            tracing::trace!(carry = carry.len(), "Carried excess fills another engine frame");
        }

        Ok(frames)
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        tracing::debug!(
            needs_resampling = self.resamplers.is_some(),
            frames_processed = self.engine.stats().frames_processed,
            "Stream session destroyed"
        );
    }
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("needs_resampling", &self.needs_resampling())
            .field("input_frame_samples", &self.input_frame_samples)
            .field("engine_frame_samples", &self.engine_frame_samples())
            .field("buffered", &self.input_buffer.len())
            .field("carry", &self.carry.len())
            .field("last_vad", &self.last_vad)
            .finish()
    }
}
