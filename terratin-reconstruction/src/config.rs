//! Tile building configuration
//!
//! Every zoom-dependent knob accepts either a single value or one value per
//! zoom level:
//!
//! ```toml
//! border_simplification_max_distance = [8.0, 4.0, 2.0]
//! border_simplification_max_length_percent = 10.0
//! min_feature_polyline_size = 3
//! fallback = "unsimplified"
//!
//! [strategy]
//! method = "point-set-hierarchy"
//! max_cluster_size = [100, 50, 25]
//! max_surface_variance = 0.1
//! ```

use serde::{Deserialize, Serialize};
use terratin_core::{Error, Result, ThresholdSeries};
use terratin_simplification::{MethodSchedule, ZoomParameterSchedule};

/// What to do with a zoom level whose simplification or triangulation fails
/// with a recoverable error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackPolicy {
    /// Return the error
    #[default]
    Fail,
    /// Triangulate the original points without simplification
    Unsimplified,
    /// Leave the zoom level out
    Skip,
}

/// Interior reduction method and its per-zoom knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "kebab-case")]
pub enum StrategyConfig {
    PointSetHierarchy {
        max_cluster_size: ThresholdSeries<usize>,
        max_surface_variance: ThresholdSeries<f64>,
    },
    Wlop {
        retain_percent: ThresholdSeries<f64>,
        #[serde(default = "auto_radius")]
        neighbor_radius: ThresholdSeries<f64>,
    },
}

fn auto_radius() -> ThresholdSeries<f64> {
    ThresholdSeries::constant(-1.0)
}

fn no_length_limit() -> ThresholdSeries<f64> {
    ThresholdSeries::constant(0.0)
}

fn default_min_feature_polyline_size() -> ThresholdSeries<usize> {
    ThresholdSeries::constant(3)
}

/// Complete tile building configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TinConfig {
    pub border_simplification_max_distance: ThresholdSeries<f64>,
    #[serde(default = "no_length_limit")]
    pub border_simplification_max_length_percent: ThresholdSeries<f64>,
    #[serde(default = "default_min_feature_polyline_size")]
    pub min_feature_polyline_size: ThresholdSeries<usize>,
    #[serde(default)]
    pub fallback: FallbackPolicy,
    pub strategy: StrategyConfig,
}

impl TinConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: TinConfig = toml::from_str(source)
            .map_err(|e| Error::Configuration(format!("Invalid tile configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self)
            .map_err(|e| Error::Configuration(format!("Cannot serialize tile configuration: {}", e)))
    }

    /// Check that every knob has at least one value.
    ///
    /// Values themselves are checked per zoom when the schedule is resolved.
    pub fn validate(&self) -> Result<()> {
        let series = [
            ("border_simplification_max_distance", self.border_simplification_max_distance.len()),
            (
                "border_simplification_max_length_percent",
                self.border_simplification_max_length_percent.len(),
            ),
            ("min_feature_polyline_size", self.min_feature_polyline_size.len()),
        ];
        let strategy = match &self.strategy {
            StrategyConfig::PointSetHierarchy {
                max_cluster_size,
                max_surface_variance,
            } => [
                ("max_cluster_size", max_cluster_size.len()),
                ("max_surface_variance", max_surface_variance.len()),
            ],
            StrategyConfig::Wlop {
                retain_percent,
                neighbor_radius,
            } => [
                ("retain_percent", retain_percent.len()),
                ("neighbor_radius", neighbor_radius.len()),
            ],
        };

        for (name, len) in series.iter().chain(strategy.iter()) {
            if *len == 0 {
                return Err(Error::Configuration(format!("{} must have at least one value", name)));
            }
        }
        Ok(())
    }

    /// Per-zoom parameter schedule for the tile simplifier
    pub fn schedule(&self) -> ZoomParameterSchedule {
        let method = match &self.strategy {
            StrategyConfig::PointSetHierarchy {
                max_cluster_size,
                max_surface_variance,
            } => MethodSchedule::PointSetHierarchy {
                max_cluster_size: max_cluster_size.clone(),
                max_surface_variance: max_surface_variance.clone(),
            },
            StrategyConfig::Wlop {
                retain_percent,
                neighbor_radius,
            } => MethodSchedule::WeightedLop {
                retain_percent: retain_percent.clone(),
                neighbor_radius: neighbor_radius.clone(),
            },
        };

        ZoomParameterSchedule {
            border_max_distance: self.border_simplification_max_distance.clone(),
            border_max_length_percent: self.border_simplification_max_length_percent.clone(),
            min_feature_polyline_size: self.min_feature_polyline_size.clone(),
            method,
        }
    }
}
