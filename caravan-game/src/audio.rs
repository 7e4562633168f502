//! Procedural audio cues and the background music loop.
//!
//! The engine never opens an output device. A front-end attaches an
//! [`AudioBackend`] through [`AudioSubsystem::init`]; until then every cue
//! is a no-op. Cue recipes are plain data ([`Tone`] lists) so a backend may
//! hand them to a native synthesizer or render them with [`Synth`].
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::f32::consts::TAU;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::constants::{
    AMBIENT_BASE_GAIN, AMBIENT_FADE_IN_SECS, AMBIENT_GAIN_SCALE, AUDIO_FADE_OUT_SECS,
    BGM_BASE_GAIN, BGM_FADE_IN_SECS, BGM_GAIN_SCALE, BGM_KICK_EVERY, BGM_STEP_MS,
};
use crate::numbers::{floor_f32_to_usize, u32_to_f32, usize_to_f32};
use crate::settings::PlayerSettings;

/// Exponential envelopes decay toward this level instead of zero.
const ENVELOPE_FLOOR: f32 = 0.001;
const SETTINGS_RAMP_SECS: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundCue {
    Spin,
    Win,
    Coin,
    Money,
    Shoot,
    Impact,
    Select,
    Confirm,
    Trade,
    Collision,
    Hurt,
    GameOver,
    Victory,
    Onboard,
}

impl SoundCue {
    pub const ALL: [Self; 14] = [
        Self::Spin,
        Self::Win,
        Self::Coin,
        Self::Money,
        Self::Shoot,
        Self::Impact,
        Self::Select,
        Self::Confirm,
        Self::Trade,
        Self::Collision,
        Self::Hurt,
        Self::GameOver,
        Self::Victory,
        Self::Onboard,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spin => "spin",
            Self::Win => "win",
            Self::Coin => "coin",
            Self::Money => "money",
            Self::Shoot => "shoot",
            Self::Impact => "impact",
            Self::Select => "select",
            Self::Confirm => "confirm",
            Self::Trade => "trade",
            Self::Collision => "collision",
            Self::Hurt => "hurt",
            Self::GameOver => "gameover",
            Self::Victory => "victory",
            Self::Onboard => "onboard",
        }
    }

    /// Tone recipe for this cue. `spin` and `money` pull pitch jitter from
    /// `rng`; every other cue is fixed.
    pub fn tones<R: Rng + ?Sized>(self, rng: &mut R) -> Vec<Tone> {
        match self {
            Self::Spin => vec![Tone::new(
                Waveform::Sawtooth,
                220.0 + rng.r#gen::<f32>() * 220.0,
                0.05,
                0.05,
            )],
            Self::Win => arpeggio(Waveform::Sine, &[523.0, 659.0, 783.0, 1046.0], 0.1, 0.4, 0.1),
            Self::Coin => vec![
                Tone::new(Waveform::Sine, 987.77, 0.1, 0.15),
                Tone::new(Waveform::Sine, 1318.51, 0.15, 0.15).at(0.05),
            ],
            Self::Money => (0..4_u32)
                .map(|i| {
                    Tone::new(
                        Waveform::Triangle,
                        1500.0 + rng.r#gen::<f32>() * 2000.0,
                        0.1,
                        0.1,
                    )
                    .at(u32_to_f32(i) * 0.04)
                })
                .collect(),
            Self::Shoot => vec![
                Tone::new(Waveform::Sawtooth, 440.0, 0.15, 0.1)
                    .sweep_to(80.0)
                    .release(Release::Linear),
            ],
            Self::Impact => vec![
                Tone::new(Waveform::Square, 120.0, 0.1, 0.1)
                    .sweep_to(40.0)
                    .release(Release::Linear),
            ],
            Self::Select => vec![Tone::new(Waveform::Square, 440.0, 0.1, 0.1)],
            Self::Confirm => vec![Tone::new(Waveform::Triangle, 523.25, 0.2, 0.2)],
            Self::Trade => arpeggio(Waveform::Sawtooth, &[440.0, 554.0, 659.0], 0.05, 0.2, 0.05),
            Self::Collision => vec![Tone::new(Waveform::Square, 100.0, 0.3, 0.1)],
            Self::Hurt => vec![Tone::new(Waveform::Sawtooth, 80.0, 0.5, 0.2)],
            Self::GameOver => vec![Tone::new(Waveform::Sawtooth, 120.0, 1.5, 0.3)],
            Self::Victory => arpeggio(
                Waveform::Triangle,
                &[523.0, 659.0, 783.0, 1046.0, 1318.0],
                0.1,
                0.6,
                0.1,
            ),
            Self::Onboard => vec![Tone::new(Waveform::Triangle, 440.0, 0.3, 0.2)],
        }
    }
}

impl fmt::Display for SoundCue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SoundCue {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|cue| cue.as_str() == s).ok_or(())
    }
}

fn arpeggio(waveform: Waveform, notes: &[f32], spacing: f32, duration: f32, gain: f32) -> Vec<Tone> {
    notes
        .iter()
        .enumerate()
        .map(|(i, freq)| Tone::new(waveform, *freq, duration, gain).at(usize_to_f32(i) * spacing))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    /// One sample at `phase` in cycles.
    #[must_use]
    pub fn sample(self, phase: f32) -> f32 {
        let p = phase.rem_euclid(1.0);
        match self {
            Self::Sine => (p * TAU).sin(),
            Self::Square => {
                if p < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Self::Sawtooth => 2.0 * p - 1.0,
            Self::Triangle => 1.0 - 4.0 * (p - 0.5).abs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Release {
    /// Decays toward 0.001 of the peak.
    Exponential,
    /// Falls to silence in a straight line.
    Linear,
}

/// A single oscillator note.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tone {
    pub waveform: Waveform,
    pub frequency: f32,
    /// Exponential pitch sweep target reached at the end of the note.
    pub sweep_to: Option<f32>,
    /// Start relative to the trigger time, seconds.
    pub offset: f32,
    pub duration: f32,
    pub gain: f32,
    pub release: Release,
}

impl Tone {
    #[must_use]
    pub const fn new(waveform: Waveform, frequency: f32, duration: f32, gain: f32) -> Self {
        Self {
            waveform,
            frequency,
            sweep_to: None,
            offset: 0.0,
            duration,
            gain,
            release: Release::Exponential,
        }
    }

    #[must_use]
    pub const fn at(mut self, offset: f32) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub const fn sweep_to(mut self, frequency: f32) -> Self {
        self.sweep_to = Some(frequency);
        self
    }

    #[must_use]
    pub const fn release(mut self, release: Release) -> Self {
        self.release = release;
        self
    }

    #[must_use]
    pub fn end(&self) -> f32 {
        self.offset + self.duration
    }

    /// Instantaneous frequency `t` seconds into the note.
    #[must_use]
    pub fn frequency_at(&self, t: f32) -> f32 {
        match self.sweep_to {
            Some(target) if self.duration > 0.0 => {
                let ratio = (target / self.frequency).max(f32::MIN_POSITIVE);
                self.frequency * ratio.powf((t / self.duration).clamp(0.0, 1.0))
            }
            _ => self.frequency,
        }
    }

    /// Envelope level `t` seconds into the note.
    #[must_use]
    pub fn envelope_at(&self, t: f32) -> f32 {
        if self.duration <= 0.0 || t < 0.0 || t > self.duration {
            return 0.0;
        }
        let x = t / self.duration;
        match self.release {
            Release::Linear => self.gain * (1.0 - x),
            Release::Exponential => {
                let floor = (ENVELOPE_FLOOR / self.gain.max(ENVELOPE_FLOOR)).min(1.0);
                self.gain * floor.powf(x)
            }
        }
    }
}

/// Output buses; music and ambient carry their own fader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bus {
    Effects,
    Music,
    Ambient,
}

/// Sink for scheduled audio. Implemented by front-ends.
pub trait AudioBackend {
    /// Play `tone` on `bus` starting at absolute time `at` (seconds).
    fn schedule(&mut self, bus: Bus, tone: &Tone, at: f64);
    /// Ramp a bus fader linearly to `gain` over `ramp_secs`.
    fn set_bus_gain(&mut self, bus: Bus, gain: f32, ramp_secs: f32);
}

/// Kick drum on every fourth step of a fixed-tempo loop.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MusicSequencer {
    step: u32,
    until_next_ms: f32,
}

impl MusicSequencer {
    #[must_use]
    pub fn kick() -> Tone {
        Tone::new(Waveform::Sine, 150.0, 0.1, 0.2)
            .sweep_to(0.01)
            .release(Release::Linear)
    }

    /// Step offsets (ms into this advance) that carry a kick.
    pub fn advance(&mut self, dt_ms: f32) -> Vec<f32> {
        let mut kicks = Vec::new();
        let mut cursor = self.until_next_ms;
        while cursor <= dt_ms {
            if self.step % BGM_KICK_EVERY == 0 {
                kicks.push(cursor.max(0.0));
            }
            self.step = self.step.wrapping_add(1);
            cursor += BGM_STEP_MS;
        }
        self.until_next_ms = cursor - dt_ms;
        kicks
    }

    #[must_use]
    pub const fn step(&self) -> u32 {
        self.step
    }
}

/// Process-wide audio lifecycle: explicit init/teardown around a run and
/// a single fire-and-forget trigger.
#[derive(Default)]
pub struct AudioSubsystem {
    backend: Option<Box<dyn AudioBackend>>,
    clock: f64,
    music: MusicSequencer,
}

impl fmt::Debug for AudioSubsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioSubsystem")
            .field("attached", &self.backend.is_some())
            .field("clock", &self.clock)
            .field("music", &self.music)
            .finish()
    }
}

impl AudioSubsystem {
    #[must_use]
    pub fn detached() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.backend.is_some()
    }

    #[must_use]
    pub const fn clock(&self) -> f64 {
        self.clock
    }

    /// Attach a backend and fade in the music and ambient buses.
    pub fn init(&mut self, mut backend: Box<dyn AudioBackend>, settings: &PlayerSettings) {
        backend.set_bus_gain(Bus::Music, 0.0, 0.0);
        backend.set_bus_gain(Bus::Music, music_gain(settings), BGM_FADE_IN_SECS);
        backend.set_bus_gain(Bus::Ambient, 0.0, 0.0);
        backend.set_bus_gain(Bus::Ambient, ambient_gain(settings), AMBIENT_FADE_IN_SECS);
        self.backend = Some(backend);
        self.music = MusicSequencer::default();
        debug!("audio attached");
        self.advance(0.0);
    }

    /// Fade both loops out and detach, handing the backend back so a later
    /// run can re-attach it. Safe to call while detached.
    pub fn teardown(&mut self) -> Option<Box<dyn AudioBackend>> {
        let mut backend = self.backend.take()?;
        backend.set_bus_gain(Bus::Music, 0.0, AUDIO_FADE_OUT_SECS);
        backend.set_bus_gain(Bus::Ambient, 0.0, AUDIO_FADE_OUT_SECS);
        debug!("audio detached");
        Some(backend)
    }

    /// Play a cue now. No-op while detached.
    pub fn trigger<R: Rng + ?Sized>(&mut self, cue: SoundCue, rng: &mut R) {
        let Some(backend) = self.backend.as_mut() else {
            return;
        };
        for tone in cue.tones(rng) {
            backend.schedule(Bus::Effects, &tone, self.clock + f64::from(tone.offset));
        }
    }

    /// Move the audio clock and emit any due music steps.
    pub fn advance(&mut self, dt_ms: f32) {
        let Some(backend) = self.backend.as_mut() else {
            return;
        };
        let start = self.clock;
        for offset_ms in self.music.advance(dt_ms) {
            backend.schedule(
                Bus::Music,
                &MusicSequencer::kick(),
                start + f64::from(offset_ms) / 1000.0,
            );
        }
        self.clock = start + f64::from(dt_ms) / 1000.0;
    }

    /// Re-level the buses after a settings change.
    pub fn apply_settings(&mut self, settings: &PlayerSettings) {
        if let Some(backend) = self.backend.as_mut() {
            backend.set_bus_gain(Bus::Music, music_gain(settings), SETTINGS_RAMP_SECS);
            backend.set_bus_gain(Bus::Ambient, ambient_gain(settings), SETTINGS_RAMP_SECS);
        }
    }
}

#[must_use]
pub fn music_gain(settings: &PlayerSettings) -> f32 {
    BGM_BASE_GAIN * settings.music_volume * BGM_GAIN_SCALE
}

#[must_use]
pub fn ambient_gain(settings: &PlayerSettings) -> f32 {
    AMBIENT_BASE_GAIN * settings.ambient_volume * AMBIENT_GAIN_SCALE
}

/// Software oscillator bank for backends without native synthesis.
#[derive(Debug, Clone, Copy)]
pub struct Synth {
    pub sample_rate: u32,
}

impl Synth {
    #[must_use]
    pub const fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    /// Mix `tones` into mono PCM. Output is clamped to `[-1, 1]`.
    #[must_use]
    pub fn render(&self, tones: &[Tone]) -> Vec<f32> {
        let rate = u32_to_f32(self.sample_rate.max(1));
        let length = tones.iter().map(Tone::end).fold(0.0_f32, f32::max);
        let mut out = vec![0.0_f32; floor_f32_to_usize((length * rate).ceil())];
        for tone in tones {
            let start = floor_f32_to_usize(tone.offset * rate);
            let mut phase = 0.0_f32;
            for (n, sample) in out.iter_mut().enumerate().skip(start) {
                let t = usize_to_f32(n - start) / rate;
                if t > tone.duration {
                    break;
                }
                *sample += tone.waveform.sample(phase) * tone.envelope_at(t);
                phase += tone.frequency_at(t) / rate;
            }
        }
        for sample in &mut out {
            *sample = sample.clamp(-1.0, 1.0);
        }
        out
    }
}

/// What a [`RecordingBackend`] saw.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioCommand {
    Schedule { bus: Bus, tone: Tone, at: f64 },
    BusGain { bus: Bus, gain: f32, ramp_secs: f32 },
}

pub type AudioLog = Rc<RefCell<Vec<AudioCommand>>>;

/// Backend that records commands for headless runs and tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    log: AudioLog,
}

impl RecordingBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the command log; stays readable after the backend
    /// is moved into the subsystem.
    #[must_use]
    pub fn log(&self) -> AudioLog {
        Rc::clone(&self.log)
    }
}

impl AudioBackend for RecordingBackend {
    fn schedule(&mut self, bus: Bus, tone: &Tone, at: f64) {
        self.log
            .borrow_mut()
            .push(AudioCommand::Schedule { bus, tone: *tone, at });
    }

    fn set_bus_gain(&mut self, bus: Bus, gain: f32, ramp_secs: f32) {
        self.log.borrow_mut().push(AudioCommand::BusGain {
            bus,
            gain,
            ramp_secs,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    fn scheduled(log: &AudioLog, bus: Bus) -> Vec<(Tone, f64)> {
        log.borrow()
            .iter()
            .filter_map(|cmd| match cmd {
                AudioCommand::Schedule { bus: b, tone, at } if *b == bus => Some((*tone, *at)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn detached_trigger_is_noop() {
        let mut audio = AudioSubsystem::detached();
        audio.trigger(SoundCue::Coin, &mut StepRng::new(0, 1));
        audio.advance(500.0);
        assert!(!audio.is_attached());
        assert!(audio.clock().abs() < f64::EPSILON);
    }

    #[test]
    fn init_fades_buses_and_starts_kick() {
        let backend = RecordingBackend::new();
        let log = backend.log();
        let mut audio = AudioSubsystem::detached();
        audio.init(Box::new(backend), &PlayerSettings::default());
        let commands = log.borrow().clone();
        assert!(commands.contains(&AudioCommand::BusGain {
            bus: Bus::Music,
            gain: 0.6 * 0.5 * 0.15,
            ramp_secs: 3.0
        }));
        assert!(commands.contains(&AudioCommand::BusGain {
            bus: Bus::Ambient,
            gain: 0.6 * 0.5 * 0.2,
            ramp_secs: 2.0
        }));
        assert_eq!(scheduled(&log, Bus::Music).len(), 1);
    }

    #[test]
    fn kick_every_fourth_step() {
        let mut seq = MusicSequencer::default();
        let mut kicks = seq.advance(0.0).len();
        for _ in 0..55 {
            kicks += seq.advance(16.0).len();
        }
        // 880 ms covers steps 0..=4 (0, 220, 440, 660, 880).
        assert_eq!(seq.step(), 5);
        assert_eq!(kicks, 2);
    }

    #[test]
    fn coin_cue_has_two_staggered_notes() {
        let backend = RecordingBackend::new();
        let log = backend.log();
        let mut audio = AudioSubsystem::detached();
        audio.init(Box::new(backend), &PlayerSettings::default());
        audio.trigger(SoundCue::Coin, &mut StepRng::new(0, 1));
        let effects = scheduled(&log, Bus::Effects);
        assert_eq!(effects.len(), 2);
        assert!((effects[1].1 - 0.05).abs() < 1e-6);
        assert!((effects[1].0.frequency - 1318.51).abs() < 1e-3);
    }

    #[test]
    fn teardown_fades_out_and_detaches() {
        let backend = RecordingBackend::new();
        let log = backend.log();
        let mut audio = AudioSubsystem::detached();
        audio.init(Box::new(backend), &PlayerSettings::default());
        assert!(audio.teardown().is_some());
        assert!(!audio.is_attached());
        assert!(audio.teardown().is_none());
        let commands = log.borrow();
        let tail: Vec<_> = commands.iter().rev().take(2).collect();
        assert!(tail.iter().all(|cmd| matches!(
            cmd,
            AudioCommand::BusGain { gain, ramp_secs, .. } if *gain == 0.0 && (*ramp_secs - 1.0).abs() < f32::EPSILON
        )));
        drop(commands);
        audio.trigger(SoundCue::Hurt, &mut StepRng::new(0, 1));
        assert!(scheduled(&log, Bus::Effects).is_empty());
    }

    #[test]
    fn every_cue_has_tones() {
        let mut rng = StepRng::new(0, 1);
        for cue in SoundCue::ALL {
            assert!(!cue.tones(&mut rng).is_empty(), "{cue}");
            assert_eq!(cue.as_str().parse::<SoundCue>(), Ok(cue));
        }
        assert_eq!(SoundCue::Money.tones(&mut rng).len(), 4);
        assert_eq!(SoundCue::Victory.tones(&mut rng).len(), 5);
    }

    #[test]
    fn envelopes_and_sweeps() {
        let shoot = SoundCue::Shoot.tones(&mut StepRng::new(0, 1))[0];
        assert!((shoot.frequency_at(0.0) - 440.0).abs() < 1e-3);
        assert!((shoot.frequency_at(0.15) - 80.0).abs() < 1e-2);
        assert!(shoot.envelope_at(0.15).abs() < 1e-6);
        let hurt = Tone::new(Waveform::Sawtooth, 80.0, 0.5, 0.2);
        assert!((hurt.envelope_at(0.5) - 0.001).abs() < 1e-5);
    }

    #[test]
    fn rendered_audio_is_bounded() {
        let mut rng = StepRng::new(0, 1);
        let mut tones = SoundCue::Victory.tones(&mut rng);
        tones.extend(SoundCue::GameOver.tones(&mut rng));
        let pcm = Synth::new(8_000).render(&tones);
        assert_eq!(pcm.len(), 12_000);
        assert!(pcm.iter().all(|s| (-1.0..=1.0).contains(s)));
        assert!(pcm.iter().any(|s| s.abs() > 0.01));
    }
}
