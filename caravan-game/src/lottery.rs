//! Mystery box prize wheel.
use rand::Rng;
use serde::Serialize;

use crate::config::LotteryConfig;
use crate::numbers::{floor_f32_to_usize, u32_to_f32, usize_to_f32};

const FULL_TURN: u32 = 360;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum WheelPhase {
    Ready,
    Spinning { elapsed_ms: f32, next_tick_ms: f32 },
    Landed { index: usize },
}

/// What advancing a spin produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpinProgress {
    /// Spin clicks due during this advance.
    pub ticks: u32,
    /// Set on the advance that finishes the spin.
    pub landed: Option<usize>,
}

/// Equal-wedge wheel. Rotation is tracked in whole degrees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LotteryWheel {
    wedges: usize,
    rotation: u32,
    phase: WheelPhase,
}

impl LotteryWheel {
    #[must_use]
    pub fn new(wedges: usize) -> Self {
        Self {
            wedges: wedges.max(1),
            rotation: 0,
            phase: WheelPhase::Ready,
        }
    }

    #[must_use]
    pub const fn rotation(&self) -> u32 {
        self.rotation
    }

    #[must_use]
    pub const fn phase(&self) -> WheelPhase {
        self.phase
    }

    #[must_use]
    pub const fn is_spinning(&self) -> bool {
        matches!(self.phase, WheelPhase::Spinning { .. })
    }

    #[must_use]
    pub const fn landed(&self) -> Option<usize> {
        match self.phase {
            WheelPhase::Landed { index } => Some(index),
            _ => None,
        }
    }

    /// Start a spin. Ignored unless the wheel is ready.
    pub fn spin<R: Rng + ?Sized>(&mut self, cfg: &LotteryConfig, rng: &mut R) -> bool {
        if !matches!(self.phase, WheelPhase::Ready) {
            return false;
        }
        let offset = floor_f32_to_usize(rng.r#gen::<f32>() * u32_to_f32(FULL_TURN));
        let offset = u32::try_from(offset).unwrap_or(0).min(FULL_TURN - 1);
        self.rotation = self
            .rotation
            .saturating_add(FULL_TURN * cfg.min_turns)
            .saturating_add(offset);
        self.phase = WheelPhase::Spinning {
            elapsed_ms: 0.0,
            next_tick_ms: cfg.tick_sound_ms,
        };
        true
    }

    /// Advance the spin animation clock.
    pub fn advance(&mut self, dt_ms: f32, cfg: &LotteryConfig) -> SpinProgress {
        let WheelPhase::Spinning {
            elapsed_ms,
            mut next_tick_ms,
        } = self.phase
        else {
            return SpinProgress::default();
        };
        let elapsed = elapsed_ms + dt_ms;
        let mut progress = SpinProgress::default();
        let horizon = elapsed.min(cfg.spin_ms);
        while cfg.tick_sound_ms > 0.0 && next_tick_ms <= horizon {
            progress.ticks += 1;
            next_tick_ms += cfg.tick_sound_ms;
        }
        if elapsed >= cfg.spin_ms {
            let index = wedge_for_rotation(self.rotation, self.wedges);
            self.phase = WheelPhase::Landed { index };
            progress.landed = Some(index);
        } else {
            self.phase = WheelPhase::Spinning {
                elapsed_ms: elapsed,
                next_tick_ms,
            };
        }
        progress
    }

    /// The close control is disabled mid-spin.
    #[must_use]
    pub const fn can_close(&self) -> bool {
        !self.is_spinning()
    }
}

/// Map a final rotation to the wedge under the top pointer.
#[must_use]
pub fn wedge_for_rotation(rotation: u32, wedges: usize) -> usize {
    let wedges = wedges.max(1);
    let wedge = u32_to_f32(FULL_TURN) / usize_to_f32(wedges);
    let normalized = u32_to_f32(rotation % FULL_TURN);
    let turned = (u32_to_f32(FULL_TURN) - normalized + wedge / 2.0) % u32_to_f32(FULL_TURN);
    floor_f32_to_usize(turned / wedge).min(wedges - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn every_offset_maps_to_equal_share() {
        let mut counts = [0_u32; 6];
        for offset in 0..360 {
            counts[wedge_for_rotation(1800 + offset, 6)] += 1;
        }
        assert_eq!(counts, [60; 6]);
    }

    #[test]
    fn zero_rotation_lands_on_first_wedge() {
        assert_eq!(wedge_for_rotation(0, 6), 0);
        assert_eq!(wedge_for_rotation(1800 + 29, 6), 0);
        assert_eq!(wedge_for_rotation(1800 + 31, 6), 5);
    }

    #[test]
    fn sampled_spins_approach_uniform() {
        let cfg = LotteryConfig::default();
        let mut rng = ChaCha20Rng::seed_from_u64(2024);
        let mut counts = [0_u32; 6];
        let samples = 60_000;
        for _ in 0..samples {
            let mut wheel = LotteryWheel::new(6);
            wheel.spin(&cfg, &mut rng);
            let landed = wheel.advance(cfg.spin_ms, &cfg).landed.unwrap();
            counts[landed] += 1;
        }
        for count in counts {
            let share = f64::from(count) / f64::from(samples);
            assert!((share - 1.0 / 6.0).abs() < 0.01, "share {share}");
        }
    }

    #[test]
    fn spin_runs_for_configured_duration_with_clicks() {
        let cfg = LotteryConfig::default();
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let mut wheel = LotteryWheel::new(6);
        assert!(wheel.can_close());
        assert!(wheel.spin(&cfg, &mut rng));
        assert!(!wheel.can_close());
        assert!(!wheel.spin(&cfg, &mut rng));
        assert!(wheel.rotation() >= 1800 && wheel.rotation() < 2160);

        let mut clicks = 0;
        let mut landed = None;
        for _ in 0..250 {
            let step = wheel.advance(16.0, &cfg);
            clicks += step.ticks;
            if step.landed.is_some() {
                landed = step.landed;
                break;
            }
        }
        assert!(landed.is_some());
        assert_eq!(clicks, 26);
        assert!(wheel.can_close());
        assert_eq!(wheel.landed(), landed);
    }
}
