// Path: crates/services/src/session/humanize.rs
//! Statistical perturbation of synthetic input so that automated taps and
//! swipes are not perfectly regular. Pure aside from its random source;
//! every distribution's bounds are hard invariants.

use autotap_api::ports::Gesture;
use autotap_types::app::ElementSize;
use autotap_types::config::{DelayBand, HumanizerConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::time::Duration;

pub struct Humanizer {
    cfg: HumanizerConfig,
    rng: Mutex<StdRng>,
}

impl Humanizer {
    pub fn new(cfg: HumanizerConfig) -> Self {
        Self {
            cfg,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic random source, for tests.
    pub fn seeded(cfg: HumanizerConfig, seed: u64) -> Self {
        Self {
            cfg,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Humanizes a tap at (x, y). Jitter scales with the element extent
    /// (smaller elements get tighter jitter) and the final point never
    /// leaves the element's half-extent box around the target.
    pub fn tap(&self, x: i32, y: i32, size: Option<ElementSize>) -> Gesture {
        let (w, h) = match size {
            Some(s) => (s.width.max(1), s.height.max(1)),
            None => (
                self.cfg.default_element_size_px,
                self.cfg.default_element_size_px,
            ),
        };
        let sigma_x = w as f64 / self.cfg.jitter_divisor;
        let sigma_y = h as f64 / self.cfg.jitter_divisor;

        let mut rng = self.rng.lock().unwrap();
        let jitter_x = standard_normal(&mut rng) * sigma_x;
        let jitter_y = standard_normal(&mut rng) * sigma_y;
        let bias_x = self.cfg.bias_mean_px + standard_normal(&mut rng) * self.cfg.bias_sigma_px;
        let bias_y = self.cfg.bias_mean_px + standard_normal(&mut rng) * self.cfg.bias_sigma_px;

        let half_w = w / 2;
        let half_h = h / 2;
        let hx = ((x as f64 + jitter_x + bias_x).round() as i32).clamp(x - half_w, x + half_w);
        let hy = ((y as f64 + jitter_y + bias_y).round() as i32).clamp(y - half_h, y + half_h);

        Gesture::Tap {
            x: hx,
            y: hy,
            duration_ms: sample_band(&mut rng, &self.cfg.tap_duration),
        }
    }

    /// Humanizes a swipe. The end point varies more than the start,
    /// matching natural gesture imprecision; duration is scaled by a
    /// uniform factor.
    pub fn swipe(
        &self,
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        base_duration_ms: u64,
    ) -> Gesture {
        let mut rng = self.rng.lock().unwrap();
        let sx = start_x + (standard_normal(&mut rng) * self.cfg.swipe_start_sigma_px).round() as i32;
        let sy = start_y + (standard_normal(&mut rng) * self.cfg.swipe_start_sigma_px).round() as i32;
        let ex = end_x + (standard_normal(&mut rng) * self.cfg.swipe_end_sigma_px).round() as i32;
        let ey = end_y + (standard_normal(&mut rng) * self.cfg.swipe_end_sigma_px).round() as i32;
        let scale = rng.gen_range(self.cfg.swipe_duration_scale_min..=self.cfg.swipe_duration_scale_max);
        Gesture::Swipe {
            start_x: sx,
            start_y: sy,
            end_x: ex,
            end_y: ey,
            duration_ms: (base_duration_ms as f64 * scale).round() as u64,
        }
    }

    pub fn pre_action_delay(&self) -> Duration {
        let mut rng = self.rng.lock().unwrap();
        Duration::from_millis(sample_band(&mut rng, &self.cfg.pre_action_delay))
    }

    pub fn post_action_delay(&self) -> Duration {
        let mut rng = self.rng.lock().unwrap();
        Duration::from_millis(sample_band(&mut rng, &self.cfg.post_action_delay))
    }
}

/// One standard-normal sample via the Box-Muller transform.
fn standard_normal(rng: &mut StdRng) -> f64 {
    // 1 - gen() keeps u1 in (0, 1]; ln(0) is not a number we want.
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// Log-normal sample parameterized by mode: mode = exp(mu - sigma^2), so
/// mu = ln(mode) + sigma^2. Clamped to the band's hard bounds.
fn sample_band(rng: &mut StdRng, band: &DelayBand) -> u64 {
    let mu = (band.mode_ms as f64).ln() + band.sigma * band.sigma;
    let sample = (mu + band.sigma * standard_normal(rng)).exp();
    (sample.round() as u64).clamp(band.min_ms, band.max_ms)
}
