// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tolerances and sampling parameters for loop extraction.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Configuration shared by curve sampling, node snapping and loop search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Distance below which two points are the same junction (model units)
    pub length_tolerance: f64,
    /// Turn angles closer than this are treated as ties (radians)
    pub angle_tolerance: f64,
    /// Maximum angle covered by one segment when sampling arcs (radians)
    pub arc_segment_angle: f64,
    /// Minimum number of segments for any arc or circle
    pub min_arc_segments: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            length_tolerance: 1e-6,
            angle_tolerance: 1e-9,
            arc_segment_angle: PI / 18.0, // 10 degrees
            min_arc_segments: 4,
        }
    }
}

impl LoopConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LoopConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<()> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(Error::InvalidConfig(format!("{name} must be positive, got {value}")))
            }
        };

        positive("length_tolerance", self.length_tolerance)?;
        positive("angle_tolerance", self.angle_tolerance)?;
        positive("arc_segment_angle", self.arc_segment_angle)?;

        if self.min_arc_segments == 0 {
            return Err(Error::InvalidConfig(
                "min_arc_segments must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(LoopConfig::default().validate().is_ok());
    }

    #[test]
    fn from_json_fills_missing_fields() {
        let config = LoopConfig::from_json(r#"{ "length_tolerance": 0.001 }"#).unwrap();
        assert_eq!(config.length_tolerance, 0.001);
        assert_eq!(config.min_arc_segments, LoopConfig::default().min_arc_segments);
    }

    #[test]
    fn from_json_rejects_bad_values() {
        assert!(matches!(
            LoopConfig::from_json(r#"{ "length_tolerance": -1.0 }"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            LoopConfig::from_json(r#"{ "min_arc_segments": 0 }"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(LoopConfig::from_json("not json"), Err(Error::Config(_))));
    }
}
