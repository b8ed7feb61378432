//! Engine configuration.

use serde::{Deserialize, Serialize};

use zonal_common::CoordinateRegistration;

use crate::membership::{InvalidityPolicy, MembershipMapper};
use crate::rasterize::TouchRule;
use crate::reducer::Statistic;

/// Knobs that decide how zones are mapped and layers reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cell selection rule for rasterization.
    pub touch_rule: TouchRule,

    /// Statistic computed per zone.
    pub statistic: Statistic,

    /// Whether the sample layer's invalid cells are baked into the mapping.
    pub invalidity: InvalidityPolicy,

    /// How coordinate arrays are turned into a grid origin.
    pub registration: CoordinateRegistration,

    /// Worker threads for mapping and reduction (`None` = rayon default).
    pub threads: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            touch_rule: TouchRule::AllTouched,
            statistic: Statistic::Mean,
            invalidity: InvalidityPolicy::SampleLayer,
            registration: CoordinateRegistration::CellCenter,
            threads: None,
        }
    }
}

impl EngineConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.threads == Some(0) {
            return Err("threads must be > 0 when set".to_string());
        }

        Ok(())
    }

    /// Mapper matching this configuration.
    pub fn mapper(&self) -> MembershipMapper {
        MembershipMapper::new(self.touch_rule, self.invalidity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.touch_rule, TouchRule::AllTouched);
        assert_eq!(config.statistic, Statistic::Mean);
        assert_eq!(config.invalidity, InvalidityPolicy::SampleLayer);
        assert_eq!(config.registration, CoordinateRegistration::CellCenter);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_deserialize_fills_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"touch_rule": "cell_center", "statistic": "max"}"#).unwrap();
        assert_eq!(config.touch_rule, TouchRule::CellCenter);
        assert_eq!(config.statistic, Statistic::Max);
        assert_eq!(config.invalidity, InvalidityPolicy::SampleLayer);
    }

    #[test]
    fn test_unknown_names_rejected() {
        assert!(serde_json::from_str::<EngineConfig>(r#"{"touch_rule": "bogus"}"#).is_err());
        assert!(serde_json::from_str::<EngineConfig>(r#"{"statistic": "median"}"#).is_err());
    }

    #[test]
    fn test_zero_threads_rejected() {
        let config = EngineConfig {
            threads: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
