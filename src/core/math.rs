//! Log-odds arithmetic and the lateral Gaussian profile.
//!
//! Occupancy evidence accumulates additively in log-odds space:
//!
//! ```text
//! L(p) = ln(p / (1 - p))
//! P(L) = 1 / (1 + exp(-L))
//!
//! Update: L_new = L_old + L_observation
//! ```

/// Number of samples in the lateral Gaussian half-profile.
pub const GAUSSIAN_SAMPLES: usize = 10;

/// Convert a probability to log-odds.
///
/// # Example
/// ```
/// use drishti_map::core::math::log_odds;
///
/// assert!((log_odds(0.5)).abs() < 1e-6);
/// assert!(log_odds(0.8) > 0.0);
/// assert!(log_odds(0.2) < 0.0);
/// ```
#[inline]
pub fn log_odds(p: f32) -> f32 {
    (p / (1.0 - p)).ln()
}

/// Convert log-odds back to a probability.
///
/// # Example
/// ```
/// use drishti_map::core::math::{log_odds, probability};
///
/// assert!((probability(0.0) - 0.5).abs() < 1e-6);
/// assert!((probability(log_odds(0.8)) - 0.8).abs() < 1e-6);
/// ```
#[inline]
pub fn probability(l: f32) -> f32 {
    1.0 / (1.0 + (-l).exp())
}

/// Half-profile of a Gaussian, sampled at `t = i / n` for `i = 0..n`.
///
/// Used to attenuate ray evidence laterally across the diamond
/// cross-section. The table is non-increasing, starting at 1.0.
pub fn gaussian_half_profile() -> [f32; GAUSSIAN_SAMPLES] {
    let mut table = [0.0f32; GAUSSIAN_SAMPLES];
    for (i, sample) in table.iter_mut().enumerate() {
        let t = i as f32 / GAUSSIAN_SAMPLES as f32;
        *sample = (-t * t).exp();
    }
    table
}
