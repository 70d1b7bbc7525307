//! Drive one session over a whole file

use anyhow::{ensure, Context, Result};
use audx_config::SessionConfig;
use audx_pipeline::{EngineStats, StreamSession};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::wav;

/// Summary of one denoise run
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub sample_rate: u32,
    pub input_samples: usize,
    pub output_samples: usize,
    pub needs_resampling: bool,
    pub input_frame_samples: usize,
    /// Speech on/off changes seen across calls
    pub speech_transitions: usize,
    pub stats: EngineStats,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = &self.stats;
        writeln!(f, "sample rate:        {} Hz", self.sample_rate)?;
        writeln!(
            f,
            "samples in/out:     {} / {}",
            self.input_samples, self.output_samples
        )?;
        writeln!(
            f,
            "resampling:         {} ({} samples per frame)",
            if self.needs_resampling { "yes" } else { "no" },
            self.input_frame_samples
        )?;
        writeln!(f, "frames processed:   {}", stats.frames_processed)?;
        writeln!(
            f,
            "speech frames:      {} ({:.1}%)",
            stats.speech_frames,
            stats.speech_ratio()
        )?;
        writeln!(f, "speech transitions: {}", self.speech_transitions)?;
        if stats.frames_processed > 0 {
            writeln!(
                f,
                "vad mean/min/max:   {:.3} / {:.3} / {:.3}",
                stats.vad_mean(),
                stats.vad_min,
                stats.vad_max
            )?;
        }
        writeln!(
            f,
            "processing time:    {:?} total, {:?} per frame, {:?} last",
            stats.total_processing_time,
            stats.mean_processing_time(),
            stats.last_processing_time
        )
    }
}

/// Denoise `input` into `output` feeding `chunk` samples per call
pub fn denoise_file(
    input: &Path,
    output: &Path,
    config: &SessionConfig,
    chunk: usize,
) -> Result<Report> {
    ensure!(chunk > 0, "chunk size must be at least 1 sample");

    let (samples, sample_rate) = wav::read_mono_pcm16(input)?;
    let config = SessionConfig {
        input_sample_rate: sample_rate,
        ..config.clone()
    };

    let mut session = StreamSession::create(&config)
        .with_context(|| format!("failed to create session at {} Hz", sample_rate))?;

    tracing::info!(
        input = %input.display(),
        sample_rate,
        samples = samples.len(),
        duration = ?Duration::from_secs_f64(samples.len() as f64 / sample_rate as f64),
        "Denoising file"
    );

    let mut cleaned = Vec::with_capacity(samples.len() + session.input_frame_samples());
    let mut speaking = false;
    let mut transitions = 0;

    for (index, piece) in samples.chunks(chunk).enumerate() {
        let out = session
            .feed(piece)
            .with_context(|| format!("processing failed at chunk {}", index))?;
        if out.frames > 0 && out.is_speech != speaking {
            speaking = out.is_speech;
            transitions += 1;
            tracing::debug!(
                chunk = index,
                speaking,
                probability = out.vad_probability,
                "Speech state changed"
            );
        }
        cleaned.extend_from_slice(&out.audio);
    }

    let tail = session.flush().context("flush failed")?;
    cleaned.extend_from_slice(&tail.audio);

    wav::write_mono_pcm16(output, sample_rate, &cleaned)?;

    let report = Report {
        sample_rate,
        input_samples: samples.len(),
        output_samples: cleaned.len(),
        needs_resampling: session.needs_resampling(),
        input_frame_samples: session.input_frame_samples(),
        speech_transitions: transitions,
        stats: session.stats(),
    };

    tracing::info!(
        output = %output.display(),
        frames = report.stats.frames_processed,
        speech_ratio = report.stats.speech_ratio(),
        "Denoising complete"
    );

    Ok(report)
}
