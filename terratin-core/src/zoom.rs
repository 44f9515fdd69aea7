//! Per-zoom threshold series
//!
//! Every zoom-dependent knob of the tile builder is either a single value
//! that applies to all zoom levels or one value per zoom level. Both are
//! represented by [`ThresholdSeries`], which resolves a zoom beyond its last
//! entry to that last entry.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize, Serializer};

/// Zoom level index of a tile pyramid
pub type ZoomLevel = u32;

/// Resolve `zoom` against a per-zoom series, clamping to the last entry.
pub fn resolve<T: Clone>(series: &[T], zoom: ZoomLevel) -> Result<T> {
    let last = series
        .last()
        .ok_or_else(|| Error::Configuration("Threshold series is empty".to_string()))?;
    Ok(series.get(zoom as usize).unwrap_or(last).clone())
}

/// Non-empty sequence of thresholds, one per zoom level from 0 upward
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(
    try_from = "SeriesRepr<T>",
    bound(deserialize = "T: Deserialize<'de>")
)]
pub struct ThresholdSeries<T> {
    values: Vec<T>,
}

impl<T> ThresholdSeries<T> {
    /// Build a series from per-zoom values
    pub fn new(values: Vec<T>) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::Configuration(
                "Threshold series needs at least one value".to_string(),
            ));
        }
        Ok(Self { values })
    }

    /// A single value applied to every zoom level
    pub fn constant(value: T) -> Self {
        Self { values: vec![value] }
    }

    /// Alias of [`ThresholdSeries::new`] that reads better at call sites
    pub fn per_zoom(values: Vec<T>) -> Result<Self> {
        Self::new(values)
    }

    /// Number of explicitly defined zoom levels
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.values
    }
}

impl<T: Clone> ThresholdSeries<T> {
    /// Value in effect for `zoom`
    pub fn resolve(&self, zoom: ZoomLevel) -> Result<T> {
        resolve(&self.values, zoom)
    }
}

impl<T> From<T> for ThresholdSeries<T> {
    fn from(value: T) -> Self {
        Self::constant(value)
    }
}

/// A single value is written back as a scalar
impl<T: Serialize> Serialize for ThresholdSeries<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.values.as_slice() {
            [value] => value.serialize(serializer),
            values => values.serialize(serializer),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SeriesRepr<T> {
    Scalar(T),
    PerZoom(Vec<T>),
}

impl<T> TryFrom<SeriesRepr<T>> for ThresholdSeries<T> {
    type Error = Error;

    fn try_from(repr: SeriesRepr<T>) -> Result<Self> {
        match repr {
            SeriesRepr::Scalar(value) => Ok(Self::constant(value)),
            SeriesRepr::PerZoom(values) => Self::new(values),
        }
    }
}
