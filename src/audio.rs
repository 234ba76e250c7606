//! Audio playback through the default output device

use crate::synth::{AudioOutput, Note, Voice};
use rodio::{OutputStream, OutputStreamHandle, Source};
use std::f64::consts::TAU;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const SAMPLE_RATE: u32 = 44_100;

/// Feed-forward dynamics compressor with a soft knee
///
/// Defaults follow the browser `DynamicsCompressorNode`: -24 dB threshold,
/// 30 dB knee, 12:1 ratio, 3 ms attack, 250 ms release.
#[derive(Debug, Clone)]
pub struct Compressor {
    threshold_db: f32,
    knee_db: f32,
    ratio: f32,
    attack_coeff: f32,
    release_coeff: f32,
    /// Smoothed gain reduction in dB (<= 0)
    reduction_db: f32,
}

impl Compressor {
    pub fn new(sample_rate: u32) -> Self {
        let coeff = |secs: f32| (-1.0 / (secs * sample_rate as f32)).exp();
        Self {
            threshold_db: -24.0,
            knee_db: 30.0,
            ratio: 12.0,
            attack_coeff: coeff(0.003),
            release_coeff: coeff(0.25),
            reduction_db: 0.0,
        }
    }

    /// Static curve: gain reduction in dB for an input level in dB
    fn target_reduction(&self, level_db: f32) -> f32 {
        let over = level_db - self.threshold_db;
        let half_knee = self.knee_db / 2.0;
        let slope = 1.0 / self.ratio - 1.0;

        if over <= -half_knee {
            0.0
        } else if over < half_knee {
            slope * (over + half_knee).powi(2) / (2.0 * self.knee_db)
        } else {
            slope * over
        }
    }

    pub fn process(&mut self, sample: f32) -> f32 {
        let level_db = 20.0 * (sample.abs().max(1e-9)).log10();
        let target = self.target_reduction(level_db);

        // More reduction engages at attack speed, recovery at release speed
        let coeff = if target < self.reduction_db {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.reduction_db = target + coeff * (self.reduction_db - target);

        sample * 10f32.powf(self.reduction_db / 20.0)
    }
}

/// Phase and position of one voice inside a note
#[derive(Debug, Clone)]
struct VoiceState {
    voice: Voice,
    phase: f64,
    phase_inc: f64,
    /// Samples until the envelope is over
    remaining: u64,
    elapsed: u64,
}

impl VoiceState {
    fn new(voice: Voice, sample_rate: u32) -> Self {
        Self {
            phase: 0.0,
            phase_inc: TAU * voice.frequency / sample_rate as f64,
            remaining: (voice.envelope.length() * sample_rate as f64).ceil() as u64,
            elapsed: 0,
            voice,
        }
    }

    fn next_sample(&mut self, sample_rate: u32) -> f64 {
        let t = self.elapsed as f64 / sample_rate as f64;
        let value = self.phase.sin() * self.voice.envelope.gain_at(t);

        self.phase = (self.phase + self.phase_inc) % TAU;
        self.elapsed += 1;
        self.remaining = self.remaining.saturating_sub(1);
        value
    }
}

/// Mono sample source for one note
///
/// Voices are mixed and passed through a compressor. A voice is released as
/// soon as its envelope ends; the source ends with its last voice.
pub struct NoteSource {
    sample_rate: u32,
    /// Silent samples before the voices start
    delay: u64,
    voices: Vec<VoiceState>,
    compressor: Compressor,
    live_voices: Option<Arc<AtomicUsize>>,
}

impl NoteSource {
    pub fn new(note: Note, delay: Duration, sample_rate: u32) -> Self {
        Self {
            sample_rate,
            delay: (delay.as_secs_f64() * sample_rate as f64) as u64,
            voices: note
                .voices
                .into_iter()
                .map(|voice| VoiceState::new(voice, sample_rate))
                .collect(),
            compressor: Compressor::new(sample_rate),
            live_voices: None,
        }
    }

    /// Decrement `counter` as voices finish
    pub fn with_voice_counter(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.live_voices = Some(counter);
        self
    }

    fn release(&self, count: usize) {
        if count == 0 {
            return;
        }
        if let Some(counter) = &self.live_voices {
            counter.fetch_sub(count, Ordering::AcqRel);
        }
    }
}

impl Iterator for NoteSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.voices.is_empty() {
            return None;
        }
        if self.delay > 0 {
            self.delay -= 1;
            return Some(0.0);
        }

        let sample_rate = self.sample_rate;
        let mixed: f64 = self.voices.iter_mut().map(|v| v.next_sample(sample_rate)).sum();

        let before = self.voices.len();
        self.voices.retain(|v| v.remaining > 0);
        self.release(before - self.voices.len());

        Some(self.compressor.process(mixed as f32).clamp(-1.0, 1.0))
    }
}

impl Source for NoteSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

impl Drop for NoteSource {
    fn drop(&mut self) {
        // Voices still pending when the mixer discards the source
        self.release(self.voices.len());
    }
}

/// Audio output backed by the system's default device
pub struct RodioOutput {
    // Stream must outlive the handle
    _stream: OutputStream,
    handle: OutputStreamHandle,
    started: Instant,
    live_voices: Arc<AtomicUsize>,
}

impl RodioOutput {
    pub fn try_default() -> anyhow::Result<Self> {
        let (stream, handle) = OutputStream::try_default()?;
        Ok(Self {
            _stream: stream,
            handle,
            started: Instant::now(),
            live_voices: Arc::new(AtomicUsize::new(0)),
        })
    }
}

impl AudioOutput for RodioOutput {
    fn now(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    fn active_voices(&self) -> usize {
        self.live_voices.load(Ordering::Acquire)
    }

    fn play(&mut self, note: Note) {
        let count = note.voices.len();
        let delay = Duration::from_secs_f64((note.start_at - self.now()).max(0.0));

        self.live_voices.fetch_add(count, Ordering::AcqRel);
        let source = NoteSource::new(note, delay, SAMPLE_RATE).with_voice_counter(self.live_voices.clone());

        // A rejected source is dropped here, which releases its voices
        if let Err(err) = self.handle.play_raw(source) {
            log::debug!("failed to start note: {}", err);
        }
    }
}

/// Open the default audio device, falling back to silence when there is none
pub fn open_output() -> Box<dyn AudioOutput> {
    match RodioOutput::try_default() {
        Ok(output) => {
            log::info!("audio output opened at {} Hz", SAMPLE_RATE);
            Box::new(output)
        }
        Err(err) => {
            log::warn!("no audio output available, running silent: {}", err);
            Box::new(crate::synth::NullOutput)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::{Envelope, ATTACK_SECS};

    const RATE: u32 = 8_000;

    fn note(frequencies: &[f64], decay: f64) -> Note {
        Note {
            start_at: 0.0,
            voices: frequencies
                .iter()
                .map(|&frequency| Voice {
                    frequency,
                    envelope: Envelope {
                        peak: frequency / 2500.0,
                        attack: ATTACK_SECS,
                        decay,
                    },
                })
                .collect(),
        }
    }

    #[test]
    fn test_note_source_ends_after_envelope() {
        let source = NoteSource::new(note(&[220.0], 0.5), Duration::ZERO, RATE);
        let samples: Vec<f32> = source.collect();

        let expected = ((ATTACK_SECS + 0.5) * RATE as f64).ceil() as usize;
        assert_eq!(samples.len(), expected);
        assert_eq!(samples[0], 0.0);
        assert!(samples.iter().all(|s| s.abs() <= 1.0));
        assert!(samples.iter().any(|s| s.abs() > 0.01));
    }

    #[test]
    fn test_delay_prepends_silence() {
        let source = NoteSource::new(note(&[440.0], 0.1), Duration::from_millis(100), RATE);
        let samples: Vec<f32> = source.collect();

        let silent = (0.1 * RATE as f64) as usize;
        assert!(samples[..silent].iter().all(|s| *s == 0.0));
        assert_eq!(samples.len(), silent + ((ATTACK_SECS + 0.1) * RATE as f64).ceil() as usize);
    }

    #[test]
    fn test_voices_release_counter_as_they_finish() {
        let counter = Arc::new(AtomicUsize::new(2));
        let mut source = NoteSource::new(
            Note {
                start_at: 0.0,
                voices: vec![note(&[300.0], 0.1).voices[0], note(&[400.0], 0.4).voices[0]],
            },
            Duration::ZERO,
            RATE,
        )
        .with_voice_counter(counter.clone());

        let short = ((ATTACK_SECS + 0.1) * RATE as f64).ceil() as usize;
        for _ in 0..short {
            source.next();
        }
        assert_eq!(counter.load(Ordering::Acquire), 1);

        drop(source);
        assert_eq!(counter.load(Ordering::Acquire), 0);
    }

    #[test]
    fn test_silent_voice_mixes_to_zero() {
        let mut silent = note(&[440.0], 0.2);
        silent.voices[0].envelope.peak = 0.0;
        let samples: Vec<f32> = NoteSource::new(silent, Duration::ZERO, RATE).collect();

        assert!(!samples.is_empty());
        assert!(samples.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_empty_note_is_empty_source() {
        let mut source = NoteSource::new(note(&[], 1.0), Duration::ZERO, RATE);
        assert_eq!(source.next(), None);
    }

    #[test]
    fn test_compressor_passes_quiet_signal() {
        let mut comp = Compressor::new(RATE);
        for _ in 0..RATE {
            let out = comp.process(0.01);
            assert!((out - 0.01).abs() < 1e-6);
        }
    }

    #[test]
    fn test_compressor_attenuates_loud_signal() {
        let mut comp = Compressor::new(RATE);
        let mut out = 0.0;
        for _ in 0..RATE {
            out = comp.process(0.9);
        }
        assert!(out < 0.3, "expected heavy reduction, got {}", out);
        assert!(out > 0.0);
    }
}
