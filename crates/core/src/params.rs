//! Generation parameter sets, the documented fallback set, and debug
//! scaling.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::EntityId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const DEFAULT_STEPS: u32 = 20;
pub const DEFAULT_SAMPLER: &str = "Euler a";
pub const DEFAULT_CFG_SCALE: f64 = 7.0;
/// `-1` asks the backend for a random seed.
pub const DEFAULT_SEED: i64 = -1;
pub const DEFAULT_WIDTH: u32 = 512;
pub const DEFAULT_HEIGHT: u32 = 512;
pub const DEFAULT_DENOISING_STRENGTH: f64 = 0.6;

/// Debug scaling factor expressed as a ratio (7/10) so flooring is exact.
const DEBUG_SCALE_NUMERATOR: u32 = 7;
const DEBUG_SCALE_DENOMINATOR: u32 = 10;

/// Lower bound on steps after debug scaling.
pub const DEBUG_MIN_STEPS: u32 = 1;
/// Lower bound on width/height after debug scaling.
pub const DEBUG_MIN_DIMENSION: u32 = 64;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParameters {
    pub steps: u32,
    pub sampler_name: String,
    pub cfg_scale: f64,
    pub seed: i64,
    pub width: u32,
    pub height: u32,
    pub denoising_strength: f64,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEPS,
            sampler_name: DEFAULT_SAMPLER.to_string(),
            cfg_scale: DEFAULT_CFG_SCALE,
            seed: DEFAULT_SEED,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            denoising_strength: DEFAULT_DENOISING_STRENGTH,
        }
    }
}

impl GenerationParameters {
    /// Reject sets the backend cannot run (zero steps or zero-sized images).
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.steps == 0 {
            return Err(CoreError::Validation("steps must be at least 1".to_string()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(CoreError::Validation(format!(
                "image size must be non-zero (got {}x{})",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// A named, stored parameter set referenced by `Scene::sd_param_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub params: GenerationParameters,
}

// ---------------------------------------------------------------------------
// Debug scaling
// ---------------------------------------------------------------------------

/// Scale `value` by 0.7, floor, then clamp to `min`.
///
/// ```
/// use tableau_core::params::debug_scale;
///
/// assert_eq!(debug_scale(10, 1), 7);
/// assert_eq!(debug_scale(90, 64), 64);
/// ```
pub fn debug_scale(value: u32, min: u32) -> u32 {
    let scaled = u64::from(value) * u64::from(DEBUG_SCALE_NUMERATOR)
        / u64::from(DEBUG_SCALE_DENOMINATOR);
    // `scaled <= value`, so it always fits back into u32.
    (scaled as u32).max(min)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
