//! Blend weight newtype.

use serde::{Deserialize, Serialize};

/// Authority split between tracker pose (1.0) and animation (0.0).
///
/// Always holds a finite value in `[0.0, 1.0]`.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlendWeight(f32);

impl BlendWeight {
    /// Tracker pose fully authoritative.
    pub const TRACKED: BlendWeight = BlendWeight(1.0);
    /// Animation fully authoritative.
    pub const OVERRIDDEN: BlendWeight = BlendWeight(0.0);

    /// Clamp `value` into range. `NaN` maps to [`BlendWeight::TRACKED`].
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self::TRACKED;
        }
        BlendWeight(value.clamp(0.0, 1.0))
    }

    #[inline]
    pub fn get(self) -> f32 {
        self.0
    }
}

impl Default for BlendWeight {
    fn default() -> Self {
        Self::TRACKED
    }
}
