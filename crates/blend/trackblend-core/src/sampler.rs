//! Signal sampler: turns live input into the per-tick override request.
//!
//! The sampler is a pure function of the current readings. It answers one
//! question each tick: is the user pushing a directional drive input while
//! full-body tracking is valid?

use serde::{Deserialize, Serialize};

use crate::config::BlendConfig;

/// Directional drive channels that can request locomotion animation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriveKey {
    TranslateX,
    TranslateY,
    TranslateZ,
    StepTranslateX,
    StepTranslateY,
    StepTranslateZ,
}

impl DriveKey {
    pub const ALL: [DriveKey; 6] = [
        DriveKey::TranslateX,
        DriveKey::TranslateY,
        DriveKey::TranslateZ,
        DriveKey::StepTranslateX,
        DriveKey::StepTranslateY,
        DriveKey::StepTranslateZ,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Polled input readings. Implemented by hosts and by [`DriveSnapshot`].
pub trait InputSource {
    /// Whether the tracker pose (hips) is currently valid.
    fn tracking_valid(&self) -> bool;
    /// Raw magnitude of a drive channel. May be malformed; callers sanitize.
    fn drive_magnitude(&self, key: DriveKey) -> f32;
}

/// Plain-value input reading for one tick.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DriveSnapshot {
    pub tracking_valid: bool,
    #[serde(default)]
    pub magnitudes: [f32; 6],
}

impl DriveSnapshot {
    pub fn tracked() -> Self {
        Self {
            tracking_valid: true,
            magnitudes: [0.0; 6],
        }
    }

    pub fn set(&mut self, key: DriveKey, magnitude: f32) -> &mut Self {
        self.magnitudes[key.index()] = magnitude;
        self
    }

    pub fn with(mut self, key: DriveKey, magnitude: f32) -> Self {
        self.set(key, magnitude);
        self
    }

    /// Zero every channel, keeping the tracking flag.
    pub fn release_all(&mut self) {
        self.magnitudes = [0.0; 6];
    }
}

impl InputSource for DriveSnapshot {
    fn tracking_valid(&self) -> bool {
        self.tracking_valid
    }

    fn drive_magnitude(&self, key: DriveKey) -> f32 {
        self.magnitudes[key.index()]
    }
}

/// Map malformed readings (non-finite, out of range) to zero.
#[inline]
pub fn sanitize_magnitude(magnitude: f32, cfg: &BlendConfig) -> f32 {
    if !magnitude.is_finite() || magnitude.abs() > cfg.max_magnitude {
        0.0
    } else {
        magnitude
    }
}

/// True iff tracking is valid and at least one monitored channel is active.
pub fn sample_override<I: InputSource + ?Sized>(input: &I, cfg: &BlendConfig) -> bool {
    if !input.tracking_valid() {
        return false;
    }
    cfg.monitored_keys.iter().any(|&key| {
        let raw = input.drive_magnitude(key);
        let m = sanitize_magnitude(raw, cfg);
        if m == 0.0 && raw != 0.0 {
            tracing::debug!(?key, raw, "ignoring malformed drive reading");
        }
        m.abs() > cfg.deadzone
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_input_does_not_request_override() {
        let cfg = BlendConfig::default();
        assert!(!sample_override(&DriveSnapshot::tracked(), &cfg));
    }

    #[test]
    fn any_monitored_key_requests_override() {
        let cfg = BlendConfig::default();
        for key in DriveKey::ALL {
            let snap = DriveSnapshot::tracked().with(key, -0.3);
            assert!(sample_override(&snap, &cfg), "{key:?} should request override");
        }
    }

    #[test]
    fn invalid_tracking_never_requests_override() {
        let cfg = BlendConfig::default();
        let mut snap = DriveSnapshot::default().with(DriveKey::TranslateZ, 1.0);
        snap.tracking_valid = false;
        assert!(!sample_override(&snap, &cfg));
    }

    #[test]
    fn unmonitored_keys_are_ignored() {
        let cfg = BlendConfig {
            monitored_keys: vec![DriveKey::TranslateZ],
            ..BlendConfig::default()
        };
        let snap = DriveSnapshot::tracked().with(DriveKey::TranslateX, 1.0);
        assert!(!sample_override(&snap, &cfg));
        let snap = snap.with(DriveKey::TranslateZ, 0.5);
        assert!(sample_override(&snap, &cfg));
    }

    #[test]
    fn malformed_readings_count_as_zero() {
        let cfg = BlendConfig::default();
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY, 7.5, -1.01] {
            let snap = DriveSnapshot::tracked().with(DriveKey::TranslateY, bad);
            assert!(!sample_override(&snap, &cfg), "{bad} must not trigger override");
            assert_eq!(sanitize_magnitude(bad, &cfg), 0.0);
        }
        assert_eq!(sanitize_magnitude(-1.0, &cfg), -1.0);
    }

    #[test]
    fn deadzone_filters_small_readings() {
        let cfg = BlendConfig {
            deadzone: 0.2,
            ..BlendConfig::default()
        };
        let small = DriveSnapshot::tracked().with(DriveKey::StepTranslateZ, 0.2);
        assert!(!sample_override(&small, &cfg));
        let large = DriveSnapshot::tracked().with(DriveKey::StepTranslateZ, 0.21);
        assert!(sample_override(&large, &cfg));
    }
}
