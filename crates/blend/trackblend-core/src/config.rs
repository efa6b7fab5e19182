//! Controller configuration.

use serde::{Deserialize, Serialize};

use crate::error::BlendError;
use crate::sampler::DriveKey;

/// Distance from a ramp boundary at which the weight snaps onto it.
///
/// Absorbs f32 drift from repeated `±step_delta` so that a ramp of
/// `1.0 / step_delta` steps always lands exactly on the boundary.
pub const SNAP_EPSILON: f32 = 1e-4;

/// Tunables for the blend controller. `Default` matches the stock
/// full-body-tracking behaviour.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendConfig {
    /// Animation parameter the weight is published under.
    pub parameter_name: String,
    /// Weight change applied per timer step.
    pub step_delta: f32,
    /// Ramp-down runs this many times faster than ramp-up.
    pub ramp_down_speedup: f32,
    /// Drive channels that count as locomotion input.
    pub monitored_keys: Vec<DriveKey>,
    /// A channel is active when its magnitude exceeds this.
    pub deadzone: f32,
    /// Readings beyond this magnitude are treated as malformed (zero).
    pub max_magnitude: f32,
    /// Lower bound for any armed timer interval.
    pub min_interval_ms: u32,
    /// Undrained events kept before the oldest are dropped. 0 disables events.
    pub max_pending_events: usize,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            parameter_name: "ikOverlayAlpha".to_string(),
            step_delta: 0.01,
            ramp_down_speedup: 2.0,
            monitored_keys: DriveKey::ALL.to_vec(),
            deadzone: 0.0,
            max_magnitude: 1.0,
            min_interval_ms: 1,
            max_pending_events: 256,
        }
    }
}

impl BlendConfig {
    /// Parse a JSON document (missing fields take defaults) and validate it.
    pub fn from_json(src: &str) -> Result<Self, BlendError> {
        let cfg: BlendConfig =
            serde_json::from_str(src).map_err(|e| BlendError::ConfigParse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_json(&self) -> Result<String, BlendError> {
        serde_json::to_string_pretty(self).map_err(|e| BlendError::ConfigParse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), BlendError> {
        if self.parameter_name.trim().is_empty() {
            return Err(BlendError::invalid("parameter_name", "must not be empty"));
        }
        if !self.step_delta.is_finite() || self.step_delta <= SNAP_EPSILON || self.step_delta > 1.0
        {
            return Err(BlendError::invalid(
                "step_delta",
                format!("{} is outside ({SNAP_EPSILON}, 1.0]", self.step_delta),
            ));
        }
        if !self.ramp_down_speedup.is_finite() || self.ramp_down_speedup < 1.0 {
            return Err(BlendError::invalid(
                "ramp_down_speedup",
                format!("{} must be a finite value >= 1.0", self.ramp_down_speedup),
            ));
        }
        if self.monitored_keys.is_empty() {
            return Err(BlendError::invalid(
                "monitored_keys",
                "at least one drive key must be monitored",
            ));
        }
        if !self.max_magnitude.is_finite() || self.max_magnitude <= 0.0 {
            return Err(BlendError::invalid(
                "max_magnitude",
                format!("{} must be a finite positive value", self.max_magnitude),
            ));
        }
        if !self.deadzone.is_finite() || self.deadzone < 0.0 || self.deadzone >= self.max_magnitude
        {
            return Err(BlendError::invalid(
                "deadzone",
                format!("{} is outside [0.0, max_magnitude)", self.deadzone),
            ));
        }
        if self.min_interval_ms == 0 {
            return Err(BlendError::invalid("min_interval_ms", "must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = BlendConfig::default();
        cfg.validate().expect("default config validates");
        assert_eq!(cfg.parameter_name, "ikOverlayAlpha");
        assert_eq!(cfg.monitored_keys.len(), 6);
    }

    #[test]
    fn partial_json_takes_defaults() {
        let cfg = BlendConfig::from_json(r#"{ "step_delta": 0.05 }"#).expect("parse");
        assert_eq!(cfg.step_delta, 0.05);
        assert_eq!(cfg.ramp_down_speedup, 2.0);
        assert_eq!(cfg.parameter_name, "ikOverlayAlpha");
    }

    #[test]
    fn monitored_keys_use_screaming_snake_names() {
        let raw = r#"{ "monitored_keys": ["TRANSLATE_Z", "STEP_TRANSLATE_X"] }"#;
        let cfg = BlendConfig::from_json(raw).expect("parse");
        assert_eq!(
            cfg.monitored_keys,
            vec![DriveKey::TranslateZ, DriveKey::StepTranslateX]
        );
    }

    #[test]
    fn rejects_out_of_range_fields() {
        let bad_step = BlendConfig {
            step_delta: 0.0,
            ..BlendConfig::default()
        };
        assert!(matches!(
            bad_step.validate(),
            Err(BlendError::InvalidConfig { field: "step_delta", .. })
        ));

        let bad_speedup = BlendConfig {
            ramp_down_speedup: 0.5,
            ..BlendConfig::default()
        };
        assert!(matches!(
            bad_speedup.validate(),
            Err(BlendError::InvalidConfig { field: "ramp_down_speedup", .. })
        ));

        let no_keys = BlendConfig {
            monitored_keys: Vec::new(),
            ..BlendConfig::default()
        };
        assert!(matches!(
            no_keys.validate(),
            Err(BlendError::InvalidConfig { field: "monitored_keys", .. })
        ));

        let wide_deadzone = BlendConfig {
            deadzone: 1.0,
            ..BlendConfig::default()
        };
        assert!(matches!(
            wide_deadzone.validate(),
            Err(BlendError::InvalidConfig { field: "deadzone", .. })
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            BlendConfig::from_json("{ not json"),
            Err(BlendError::ConfigParse(_))
        ));
        assert!(matches!(
            BlendConfig::from_json(r#"{ "monitored_keys": ["WARP"] }"#),
            Err(BlendError::ConfigParse(_))
        ));
    }

    #[test]
    fn json_roundtrip_preserves_fields() {
        let cfg = BlendConfig {
            parameter_name: "handAlpha".into(),
            deadzone: 0.1,
            ..BlendConfig::default()
        };
        let back = BlendConfig::from_json(&cfg.to_json().expect("serialize")).expect("parse");
        assert_eq!(back, cfg);
    }
}
