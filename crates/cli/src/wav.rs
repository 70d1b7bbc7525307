//! Mono 16-bit PCM WAV input and output

use anyhow::{bail, Context, Result};
use audx_core::audio::{BIT_DEPTH, CHANNELS};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;

/// Read every sample of a mono 16-bit PCM file, with its sample rate
pub fn read_mono_pcm16(path: &Path) -> Result<(Vec<i16>, u32)> {
    let reader = WavReader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let spec = reader.spec();

    if spec.channels != CHANNELS {
        bail!(
            "{}: expected mono audio, found {} channels",
            path.display(),
            spec.channels
        );
    }
    if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != BIT_DEPTH {
        bail!(
            "{}: expected 16-bit integer PCM, found {}-bit {:?}",
            path.display(),
            spec.bits_per_sample,
            spec.sample_format
        );
    }

    let samples = reader
        .into_samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("failed to decode {}", path.display()))?;

    Ok((samples, spec.sample_rate))
}

/// Write a mono 16-bit PCM file
pub fn write_mono_pcm16(path: &Path, sample_rate: u32, samples: &[i16]) -> Result<()> {
    let spec = WavSpec {
        channels: CHANNELS,
        sample_rate,
        bits_per_sample: BIT_DEPTH,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer
        .finalize()
        .with_context(|| format!("failed to finalize {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_stereo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        writer.write_sample(0i16).unwrap();
        writer.write_sample(0i16).unwrap();
        writer.finalize().unwrap();

        let err = read_mono_pcm16(&path).unwrap_err();
        assert!(err.to_string().contains("mono"));
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        let samples: Vec<i16> = vec![0, 1, -1, i16::MAX, i16::MIN];
        write_mono_pcm16(&path, 22_050, &samples).unwrap();

        let (read, rate) = read_mono_pcm16(&path).unwrap();
        assert_eq!(rate, 22_050);
        assert_eq!(read, samples);
    }
}
