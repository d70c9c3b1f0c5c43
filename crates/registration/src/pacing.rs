use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::ops::RangeInclusive;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use formpilot_core::config::PacingConfig;

/// Millisecond ranges for every human-paced step of the signup flow.
pub mod timing {
    use std::ops::RangeInclusive;

    pub const AFTER_LOAD: RangeInclusive<u64> = 2_000..=4_000;
    pub const FIELD_CLICK_HOLD: RangeInclusive<u64> = 100..=300;
    pub const BEFORE_TYPING: RangeInclusive<u64> = 200..=500;
    pub const KEY_DELAY: RangeInclusive<u64> = 50..=150;
    pub const BETWEEN_FIELDS: RangeInclusive<u64> = 300..=800;
    pub const AFTER_FIELDS: RangeInclusive<u64> = 1_000..=2_000;
    pub const DROPDOWN_CLICK_HOLD: RangeInclusive<u64> = 200..=400;
    pub const DROPDOWN_OPEN: RangeInclusive<u64> = 500..=1_500;
    pub const OPTION_CLICK_HOLD: RangeInclusive<u64> = 100..=300;
    pub const BETWEEN_DROPDOWNS: RangeInclusive<u64> = 1_000..=2_000;
    pub const AFTER_DROPDOWNS: RangeInclusive<u64> = 1_000..=3_000;
    pub const TERMS_CLICK_HOLD: RangeInclusive<u64> = 100..=300;
    pub const SUBMIT_CLICK_HOLD: RangeInclusive<u64> = 200..=500;
}

/// Source of every random decision the engine makes.
///
/// Tests build it from a fixed seed with delays switched off, which makes
/// value choices reproducible and the flow instantaneous.
pub struct Pacing {
    rng: Mutex<StdRng>,
    enabled: bool,
}

impl Pacing {
    pub fn new(config: &PacingConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
            enabled: config.enabled,
        }
    }

    pub fn seeded(seed: u64, enabled: bool) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            enabled,
        }
    }

    /// Deterministic and without any delay.
    pub fn instant() -> Self {
        Self::seeded(0, false)
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Random duration within `range_ms`, or zero when pacing is off.
    pub fn delay(&self, range_ms: RangeInclusive<u64>) -> Duration {
        // Draw even when disabled so choices stay in step with a paced run.
        let ms = self.rng().gen_range(range_ms);
        if self.enabled {
            Duration::from_millis(ms)
        } else {
            Duration::ZERO
        }
    }

    pub async fn pause(&self, range_ms: RangeInclusive<u64>) {
        let delay = self.delay(range_ms);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// Uniform pick from a fixed, non-empty list.
    pub fn choose<'a>(&self, items: &[&'a str]) -> &'a str {
        items.choose(&mut *self.rng()).copied().unwrap_or_default()
    }
}
