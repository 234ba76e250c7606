use crate::particle::CollisionEvent;
use crate::settings::SynthSettings;

/// Time from silence to peak gain, in seconds
pub const ATTACK_SECS: f64 = 0.05;

/// Gain the exponential decay aims for; exponential ramps cannot reach zero
pub const SILENCE_GAIN: f64 = 0.00001;

/// Shortest decay a voice gets, for particles at or above the speed ceiling
const MIN_DECAY_SECS: f64 = 0.05;

/// Speed at which the decay time reaches zero
const SPEED_CEILING: f64 = 10.0;

const BASS_DECAY_FACTOR: f64 = 0.5;
const CHORD_DECAY_FACTOR: f64 = 0.25;

/// Intervals stacked on a normal particle's tone
const CHORD_INTERVALS: [u8; 4] = [0, 3, 7, 10];

/// Frequency divisor for a voice's peak gain; higher tones ring louder
const PEAK_GAIN_DIVISOR: f64 = 2500.0;

/// Equal-temperament frequency of a MIDI note number
pub fn midi_to_frequency(tone_id: u8) -> f64 {
    440.0 * 2f64.powf((tone_id as f64 - 69.0) / 12.0)
}

/// Gain envelope of one voice: linear attack to `peak`, then an exponential
/// decay towards silence that ends `attack + decay` seconds after the start
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub peak: f64,
    pub attack: f64,
    pub decay: f64,
}

impl Envelope {
    /// Total length of the voice in seconds
    pub fn length(&self) -> f64 {
        self.attack + self.decay
    }

    /// Gain `t` seconds after the voice started
    pub fn gain_at(&self, t: f64) -> f64 {
        if self.peak <= 0.0 || t <= 0.0 || t >= self.length() {
            0.0
        } else if t < self.attack {
            self.peak * t / self.attack
        } else {
            let progress = (t - self.attack) / self.decay;
            self.peak * (SILENCE_GAIN / self.peak).powf(progress)
        }
    }
}

/// A single sine oscillator shaped by an envelope
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voice {
    pub frequency: f64,
    pub envelope: Envelope,
}

/// All voices produced by one collision, scheduled to start at `start_at`
/// on the output clock
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub start_at: f64,
    pub voices: Vec<Voice>,
}

impl Note {
    /// Output time at which the last voice has finished
    pub fn stop_at(&self) -> f64 {
        self.start_at
            + self
                .voices
                .iter()
                .map(|v| v.envelope.length())
                .fold(0.0, f64::max)
    }
}

/// Destination for synthesized notes
pub trait AudioOutput {
    /// Current time on the output clock, in seconds
    fn now(&self) -> f64;

    /// Voices that are still sounding
    fn active_voices(&self) -> usize;

    /// Start a note. Playback is fire-and-forget: each voice releases itself
    /// when its envelope ends.
    fn play(&mut self, note: Note);
}

/// Output that discards everything, for hosts without an audio device
#[derive(Debug, Default)]
pub struct NullOutput;

impl AudioOutput for NullOutput {
    fn now(&self) -> f64 {
        0.0
    }

    fn active_voices(&self) -> usize {
        0
    }

    fn play(&mut self, _note: Note) {}
}

/// Turns collision events into notes
#[derive(Debug, Clone, Default)]
pub struct ToneSynth {
    pub settings: SynthSettings,
    /// Notes dropped because of the voice cap since the last reset of this counter
    pub dropped_notes: usize,
}

impl ToneSynth {
    pub fn new(settings: SynthSettings) -> Self {
        Self {
            settings,
            dropped_notes: 0,
        }
    }

    /// Play the tone for a collision event
    pub fn play_event(&mut self, event: &CollisionEvent, output: &mut dyn AudioOutput) -> usize {
        self.play(event.tone_id, event.speed, event.is_bass, output)
    }

    /// Synthesize the tone for a particle and hand it to the output.
    /// Returns the number of voices started.
    pub fn play(&mut self, tone_id: u8, speed: f64, is_bass: bool, output: &mut dyn AudioOutput) -> usize {
        if self.settings.muted || self.settings.volume <= 0.0 {
            return 0;
        }

        let voices = self.voices_for(tone_id, speed, is_bass);
        if voices.is_empty() {
            return 0;
        }

        let cap = self.settings.max_voices;
        if cap > 0 && output.active_voices() + voices.len() > cap {
            self.dropped_notes += 1;
            log::trace!("voice cap {} reached, dropping tone {}", cap, tone_id);
            return 0;
        }

        let count = voices.len();
        output.play(Note {
            start_at: output.now(),
            voices,
        });
        count
    }

    /// Voices for a tone, without the mute and cap checks
    pub fn voices_for(&self, tone_id: u8, speed: f64, is_bass: bool) -> Vec<Voice> {
        let decay_factor = if is_bass { BASS_DECAY_FACTOR } else { CHORD_DECAY_FACTOR };
        let decay = (decay_factor * (SPEED_CEILING - speed)).max(MIN_DECAY_SECS);

        let intervals: &[u8] = if is_bass { &CHORD_INTERVALS[..1] } else { &CHORD_INTERVALS };

        intervals
            .iter()
            .map(|interval| midi_to_frequency(tone_id.saturating_add(*interval)))
            .filter(|frequency| *frequency >= self.settings.low_cutoff_hz)
            .map(|frequency| Voice {
                frequency,
                envelope: Envelope {
                    peak: frequency / PEAK_GAIN_DIVISOR * self.settings.volume as f64,
                    attack: ATTACK_SECS,
                    decay,
                },
            })
            .collect()
    }
}
