//! Zoom-dependent strategy parameters
//!
//! A [`ZoomParameterSchedule`] holds every knob as a [`ThresholdSeries`].
//! Resolving it for one zoom level yields an immutable [`StrategyParameters`]
//! snapshot; changing zoom means resolving a new snapshot, never editing the
//! fields of an existing one.

use crate::hierarchy::PointSetHierarchySimplifier;
use crate::wlop::WlopSimplifier;
use crate::PointSetSimplifier;
use terratin_core::{Error, Result, ThresholdSeries, ZoomLevel};

// ============================================================
// Resolved snapshot
// ============================================================

/// Budget for simplifying border and sharp-feature polylines
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorderParameters {
    /// Maximum distance between a dropped polyline vertex and the
    /// simplified polyline
    pub max_distance: f64,
    /// Maximum length of a simplified edge, as a percentage of the tile's
    /// XY bounding-box diagonal. Non-positive disables the guard.
    pub max_length_percent: f64,
    /// Tagged feature polylines with fewer edges than this are ignored
    pub min_feature_polyline_size: usize,
}

impl BorderParameters {
    pub fn validate(&self) -> Result<()> {
        if !self.max_distance.is_finite() || self.max_distance < 0.0 {
            return Err(Error::Configuration(format!(
                "Border simplification max distance must be finite and non-negative, got {}",
                self.max_distance
            )));
        }
        if !self.max_length_percent.is_finite() {
            return Err(Error::Configuration(
                "Border simplification max length percent must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parameters of the interior reduction method
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MethodParameters {
    /// Hierarchical clustering simplification
    PointSetHierarchy {
        max_cluster_size: usize,
        max_surface_variance: f64,
    },
    /// Weighted locally optimal projection
    WeightedLop {
        /// Percentage of the input points to retain, in (0, 100]
        retain_percent: f64,
        /// Neighbourhood radius; non-positive requests automatic estimation
        neighbor_radius: f64,
    },
}

impl MethodParameters {
    pub fn name(&self) -> &'static str {
        match self {
            MethodParameters::PointSetHierarchy { .. } => "point-set-hierarchy",
            MethodParameters::WeightedLop { .. } => "wlop",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            MethodParameters::PointSetHierarchy {
                max_cluster_size,
                max_surface_variance,
            } => {
                if max_cluster_size == 0 {
                    return Err(Error::Configuration(
                        "Maximum cluster size must be at least 1".to_string(),
                    ));
                }
                if !max_surface_variance.is_finite() || max_surface_variance < 0.0 {
                    return Err(Error::Configuration(format!(
                        "Maximum surface variance must be finite and non-negative, got {}",
                        max_surface_variance
                    )));
                }
            }
            MethodParameters::WeightedLop {
                retain_percent,
                neighbor_radius,
            } => {
                if !(retain_percent > 0.0 && retain_percent <= 100.0) {
                    return Err(Error::Configuration(format!(
                        "Retain percentage must lie in (0, 100], got {}",
                        retain_percent
                    )));
                }
                if !neighbor_radius.is_finite() {
                    return Err(Error::Configuration(
                        "Neighbour radius must be finite".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Build the interior reducer for these parameters
    pub fn simplifier(&self) -> Box<dyn PointSetSimplifier + Send + Sync> {
        match *self {
            MethodParameters::PointSetHierarchy {
                max_cluster_size,
                max_surface_variance,
            } => Box::new(PointSetHierarchySimplifier::new(
                max_cluster_size,
                max_surface_variance,
            )),
            MethodParameters::WeightedLop {
                retain_percent,
                neighbor_radius,
            } => Box::new(WlopSimplifier::new(retain_percent, neighbor_radius)),
        }
    }
}

/// Every zoom-dependent parameter, resolved for a single zoom level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyParameters {
    pub zoom: ZoomLevel,
    pub border: BorderParameters,
    pub method: MethodParameters,
}

impl StrategyParameters {
    pub fn validate(&self) -> Result<()> {
        self.border.validate()?;
        self.method.validate()
    }
}

// ============================================================
// Per-zoom schedule
// ============================================================

/// Per-zoom series for the interior reduction method
#[derive(Debug, Clone, PartialEq)]
pub enum MethodSchedule {
    PointSetHierarchy {
        max_cluster_size: ThresholdSeries<usize>,
        max_surface_variance: ThresholdSeries<f64>,
    },
    WeightedLop {
        retain_percent: ThresholdSeries<f64>,
        neighbor_radius: ThresholdSeries<f64>,
    },
}

impl MethodSchedule {
    fn resolve(&self, zoom: ZoomLevel) -> Result<MethodParameters> {
        Ok(match self {
            MethodSchedule::PointSetHierarchy {
                max_cluster_size,
                max_surface_variance,
            } => MethodParameters::PointSetHierarchy {
                max_cluster_size: max_cluster_size.resolve(zoom)?,
                max_surface_variance: max_surface_variance.resolve(zoom)?,
            },
            MethodSchedule::WeightedLop {
                retain_percent,
                neighbor_radius,
            } => MethodParameters::WeightedLop {
                retain_percent: retain_percent.resolve(zoom)?,
                neighbor_radius: neighbor_radius.resolve(zoom)?,
            },
        })
    }
}

/// All knobs of the tile simplifier, each a single value or a per-zoom series
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomParameterSchedule {
    pub border_max_distance: ThresholdSeries<f64>,
    pub border_max_length_percent: ThresholdSeries<f64>,
    pub min_feature_polyline_size: ThresholdSeries<usize>,
    pub method: MethodSchedule,
}

impl ZoomParameterSchedule {
    /// Hierarchical clustering with per-zoom thresholds
    pub fn point_set_hierarchy(
        border_max_distance: ThresholdSeries<f64>,
        border_max_length_percent: ThresholdSeries<f64>,
        min_feature_polyline_size: usize,
        max_cluster_size: ThresholdSeries<usize>,
        max_surface_variance: ThresholdSeries<f64>,
    ) -> Self {
        Self {
            border_max_distance,
            border_max_length_percent,
            min_feature_polyline_size: ThresholdSeries::constant(min_feature_polyline_size),
            method: MethodSchedule::PointSetHierarchy {
                max_cluster_size,
                max_surface_variance,
            },
        }
    }

    /// WLOP with per-zoom thresholds
    pub fn wlop(
        border_max_distance: ThresholdSeries<f64>,
        border_max_length_percent: ThresholdSeries<f64>,
        min_feature_polyline_size: usize,
        retain_percent: ThresholdSeries<f64>,
        neighbor_radius: ThresholdSeries<f64>,
    ) -> Self {
        Self {
            border_max_distance,
            border_max_length_percent,
            min_feature_polyline_size: ThresholdSeries::constant(min_feature_polyline_size),
            method: MethodSchedule::WeightedLop {
                retain_percent,
                neighbor_radius,
            },
        }
    }

    /// Resolve every knob for `zoom` into one validated snapshot
    pub fn resolve(&self, zoom: ZoomLevel) -> Result<StrategyParameters> {
        let params = StrategyParameters {
            zoom,
            border: BorderParameters {
                max_distance: self.border_max_distance.resolve(zoom)?,
                max_length_percent: self.border_max_length_percent.resolve(zoom)?,
                min_feature_polyline_size: self.min_feature_polyline_size.resolve(zoom)?,
            },
            method: self.method.resolve(zoom)?,
        };
        params.validate()?;
        Ok(params)
    }
}
