//! Integration tests for the streaming denoise pipeline
//!
//! Sessions from `StreamSession::create` run the RNNoise engine; `echo_session`
//! swaps in a pass-through model so only framing and resampling are measured.

#![cfg(feature = "rnnoise")]

use audx_config::SessionConfig;
use audx_core::audio::{ENGINE_SAMPLE_RATE, FRAME_SIZE};
use audx_core::frame_samples_at_rate;
use audx_pipeline::{
    DenoiseModel, Error, FeedOutput, FrameEngine, Result, SessionRegistry, StreamSession,
};

/// Pass-through model: isolates framing and resampling from denoising
struct EchoModel;

impl DenoiseModel for EchoModel {
    fn process_frame(&mut self, output: &mut [f32], input: &[f32]) -> Result<f32> {
        output.copy_from_slice(input);
        Ok(0.0)
    }
}

fn echo_session(rate: u32, quality: i32) -> StreamSession {
    let engine = FrameEngine::new(Box::new(EchoModel), 0.5);
    StreamSession::with_engine(engine, rate, ENGINE_SAMPLE_RATE, quality, true).unwrap()
}

/// Deterministic tone plus pseudo-random noise
fn noisy_tone(rate: u32, samples: usize) -> Vec<i16> {
    let mut seed: u32 = 0x1234_5678;
    (0..samples)
        .map(|i| {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let noise = ((seed >> 16) as i32 - 32_768) as f32 / 32_768.0;
            let t = i as f32 / rate as f32;
            let tone = (2.0 * std::f32::consts::PI * 440.0 * t).sin();
            ((tone * 0.4 + noise * 0.1) * 32_767.0) as i16
        })
        .collect()
}

fn feed_chunked(session: &mut StreamSession, input: &[i16], sizes: &[usize]) -> (Vec<i16>, usize) {
    let mut audio = Vec::new();
    let mut frames = 0;
    let mut offset = 0;
    let mut i = 0;
    while offset < input.len() {
        let end = (offset + sizes[i % sizes.len()]).min(input.len());
        let out = session.feed(&input[offset..end]).unwrap();
        audio.extend_from_slice(&out.audio);
        frames += out.frames;
        offset = end;
        i += 1;
    }
    (audio, frames)
}

/// 16 kHz -> 160-sample input frames; one frame in one call or ten calls is the same
#[test]
fn test_16k_single_frame_scenario() {
    let mut whole = StreamSession::create(&SessionConfig::with_rate(16_000)).unwrap();
    assert!(whole.needs_resampling());
    assert_eq!(whole.input_frame_samples(), 160);

    let out = whole.feed(&[0i16; 160]).unwrap();
    assert_eq!(out.frames, 1);
    assert_eq!(whole.stats().frames_processed, 1);

    let mut split = StreamSession::create(&SessionConfig::with_rate(16_000)).unwrap();
    let mut frames = 0;
    let mut len = 0;
    for _ in 0..10 {
        let out = split.feed(&[0i16; 16]).unwrap();
        frames += out.frames;
        len += out.audio.len();
    }
    assert_eq!(frames, 1);
    assert_eq!(len, out.audio.len());
    assert_eq!(split.stats().frames_processed, whole.stats().frames_processed);
}

/// Framing is a function of cumulative input only, not of chunk boundaries
#[test]
fn test_chunking_is_invisible() {
    let input = noisy_tone(44_100, 44_100 * 2);
    let config = SessionConfig::with_rate(44_100);

    let mut reference = StreamSession::create(&config).unwrap();
    let expected = reference.feed(&input).unwrap();

    for sizes in [&[1usize, 7, 16][..], &[441][..], &[333, 2, 1000, 89][..]] {
        let mut session = StreamSession::create(&config).unwrap();
        let (audio, frames) = feed_chunked(&mut session, &input, sizes);
        assert_eq!(frames, expected.frames, "chunk sizes {:?}", sizes);
        assert_eq!(audio, expected.audio, "chunk sizes {:?}", sizes);
        assert_eq!(session.buffered_samples(), reference.buffered_samples());
    }
}

/// Equal rates: k engine frames in, k engine frames out
#[test]
fn test_native_rate_exact_accounting() {
    let mut session = StreamSession::create(&SessionConfig::default()).unwrap();
    assert!(!session.needs_resampling());

    let input = noisy_tone(48_000, 25 * FRAME_SIZE);
    let (audio, frames) = feed_chunked(&mut session, &input, &[1000, 37]);
    assert_eq!(frames, 25);
    assert_eq!(audio.len(), 25 * FRAME_SIZE);
    assert_eq!(session.stats().frames_processed, 25);
}

/// Denoising reduces the energy of pure noise
#[test]
fn test_noise_is_attenuated() {
    let mut seed: u32 = 42;
    let noise: Vec<i16> = (0..48_000 * 2)
        .map(|_| {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            ((seed >> 16) as i32 - 32_768) as i16 / 8
        })
        .collect();

    let mut session = StreamSession::create(&SessionConfig::default()).unwrap();
    let out = session.feed(&noise).unwrap();

    let energy = |s: &[i16]| s.iter().map(|&x| (x as f64).powi(2)).sum::<f64>();
    // skip the first half second while the model settles
    let skip = 24_000;
    assert!(energy(&out.audio[skip..]) < energy(&noise[skip..out.audio.len()]));
}

/// Output length tracks input length at resampled rates
#[test]
fn test_output_tracks_input_length() {
    for rate in [8_000u32, 16_000, 32_000, 44_100] {
        let mut session = echo_session(rate, 4);
        let frame = session.input_frame_samples();
        let input = noisy_tone(rate, rate as usize * 5);
        let (audio, _) = feed_chunked(&mut session, &input, &[512]);
        let consumed = input.len() - session.buffered_samples();
        let diff = (audio.len() as i64 - consumed as i64).abs() as usize;
        assert!(diff <= 2 * frame, "rate {}: in {} out {}", rate, consumed, audio.len());
    }
}

/// Rounding keeps per-frame error within half a sample and never drifts more than flooring
#[test]
fn test_frame_rounding_drift_bounded() {
    const FRAMES_10_MIN: u64 = 60_000;
    for rate in [8_000u32, 11_025, 16_000, 22_050, 24_000, 32_000, 44_100, 88_200, 96_000] {
        let n = frame_samples_at_rate(FRAME_SIZE, rate, ENGINE_SAMPLE_RATE) as f64;
        let exact = FRAME_SIZE as f64 * rate as f64 / ENGINE_SAMPLE_RATE as f64;
        assert!((n - exact).abs() <= 0.5, "rate {}", rate);

        let drift_round = FRAMES_10_MIN as f64 * (n - exact).abs() / rate as f64;
        let drift_floor = FRAMES_10_MIN as f64 * (exact - exact.floor()) / rate as f64;
        assert!(drift_round <= drift_floor + 1e-12, "rate {}", rate);
        // at most half a sample per 10 ms frame, in seconds over ten minutes
        assert!(drift_round <= 600.0 * 0.5 / exact + 1e-9, "rate {}", rate);
    }
}

/// Ten minutes at 22.05 kHz: the carried excess keeps output aligned with input
#[test]
fn test_ten_minute_stream_does_not_drift() {
    let rate = 22_050;
    let mut session = echo_session(rate, 0);
    let frame = session.input_frame_samples();
    assert_eq!(frame, 221);

    let chunk = vec![0i16; rate as usize];
    let mut produced = 0usize;
    let mut frames = 0usize;
    for _ in 0..600 {
        let out = session.feed(&chunk).unwrap();
        produced += out.audio.len();
        frames += out.frames;
        assert!(session.carried_samples() < FRAME_SIZE);
    }

    let consumed = 600 * rate as usize - session.buffered_samples();
    let diff = (produced as i64 - consumed as i64).abs() as usize;
    assert!(diff <= 2 * frame, "in {} out {}", consumed, produced);
    // more engine frames than input frames: excess was carried, not dropped
    assert!(frames > consumed / frame);
}

/// Ten minutes at 11.025 kHz: the frame rounds down, so each engine frame is
/// padded and output runs ahead of input by the rounding error per frame
#[test]
fn test_ten_minute_stream_shortfall_drift_is_linear_and_bounded() {
    let rate = 11_025;
    let mut session = echo_session(rate, 0);
    let frame = session.input_frame_samples();
    assert_eq!(frame, 110);
    let exact = FRAME_SIZE as f64 * rate as f64 / ENGINE_SAMPLE_RATE as f64;
    let per_frame = exact - frame as f64;
    assert!((per_frame - 0.25).abs() < 1e-9);

    let chunk = vec![0i16; rate as usize];
    let mut produced = 0usize;
    for _ in 0..600 {
        produced += session.feed(&chunk).unwrap().audio.len();
        assert_eq!(session.carried_samples(), 0);
    }

    let consumed = 600 * rate as usize - session.buffered_samples();
    let input_frames = (consumed / frame) as f64;
    let diff = produced as f64 - consumed as f64;
    let expected = input_frames * per_frame;
    assert!(
        (diff - expected).abs() <= 2.0 * frame as f64,
        "in {} out {} expected excess {:.0}",
        consumed,
        produced,
        expected
    );
    // never more than half an input sample per frame
    assert!(diff / consumed as f64 <= 0.5 / frame as f64);
}

/// Flush empties the input buffer; a second flush only sees silence
#[test]
fn test_flush_drains_and_clears() {
    let mut session = StreamSession::create(&SessionConfig::with_rate(16_000)).unwrap();
    session.feed(&noisy_tone(16_000, 1_000)).unwrap();
    assert_eq!(session.buffered_samples(), 1_000 % 160);

    let first: FeedOutput = session.flush().unwrap();
    assert_eq!(first.frames, 1);
    assert_eq!(session.buffered_samples(), 0);
    assert_eq!(session.carried_samples(), 0);

    let second = session.flush().unwrap();
    assert_eq!(second.frames, 1);
    assert_eq!(session.buffered_samples(), 0);
}

/// Two sessions with different settings never see each other's state
#[test]
fn test_sessions_are_independent() {
    let a_input = noisy_tone(16_000, 16_000);
    let b_input = noisy_tone(48_000, 48_000);

    let mut a_alone = StreamSession::create(&SessionConfig::with_rate(16_000)).unwrap();
    let a_expected = a_alone.feed(&a_input).unwrap();

    let mut a = StreamSession::create(&SessionConfig::with_rate(16_000)).unwrap();
    let mut b = StreamSession::create(&SessionConfig::default()).unwrap();

    let mut a_audio = Vec::new();
    for (a_chunk, b_chunk) in a_input.chunks(160).zip(b_input.chunks(480)) {
        a_audio.extend(a.feed(a_chunk).unwrap().audio);
        b.feed(b_chunk).unwrap();
    }
    b.reset_stats();

    assert_eq!(a_audio, a_expected.audio);
    assert_eq!(a.stats().frames_processed, a_alone.stats().frames_processed);
    assert_eq!(b.stats().frames_processed, 0);
}

/// Sessions on separate threads through one registry
#[test]
fn test_registry_concurrent_sessions() {
    let registry = SessionRegistry::new();
    let rates = [8_000u32, 16_000, 44_100, 48_000];
    let handles: Vec<_> = rates
        .iter()
        .map(|&rate| registry.create(&SessionConfig::with_rate(rate)).unwrap())
        .collect();

    std::thread::scope(|scope| {
        for (&handle, &rate) in handles.iter().zip(&rates) {
            let registry = &registry;
            scope.spawn(move || {
                let input = noisy_tone(rate, rate as usize);
                for chunk in input.chunks(256) {
                    registry.feed(handle, chunk).unwrap();
                }
                registry.flush(handle).unwrap();
            });
        }
    });

    for &handle in &handles {
        // one second of audio is 100 engine frames, plus the flush frame
        let frames = registry.stats(handle).unwrap().frames_processed;
        assert!((100..=102).contains(&frames), "frames {}", frames);
        registry.destroy(handle).unwrap();
    }
    assert!(registry.is_empty());
    assert!(matches!(registry.stats(handles[0]), Err(Error::InvalidHandle(_))));
}
