use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

pub const DEFAULT_OUT_MIN: f64 = -5.0;
pub const DEFAULT_OUT_MAX: f64 = 5.0;

/// Geographic extent of a document. Construction guarantees finite values and a
/// strictly positive, finite extent on both axes, so projecting through it never divides
/// by zero or by infinity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

impl GeoBounds {
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Result<Self> {
        for (field, value) in [
            ("minlat", min_lat),
            ("maxlat", max_lat),
            ("minlon", min_lon),
            ("maxlon", max_lon),
        ] {
            if !value.is_finite() {
                return Err(Error::MalformedBounds {
                    field: field.to_string(),
                    reason: format!("{} is not a finite number", value),
                });
            }
        }
        Self::check_axis("latitude", "maxlat", min_lat, max_lat)?;
        Self::check_axis("longitude", "maxlon", min_lon, max_lon)?;

        Ok(GeoBounds {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        })
    }

    fn check_axis(axis: &'static str, max_field: &str, min: f64, max: f64) -> Result<()> {
        if min == max {
            Err(Error::DegenerateBounds { axis })
        } else if min > max {
            Err(Error::MalformedBounds {
                field: max_field.to_string(),
                reason: format!("{} is below the minimum {}", max, min),
            })
        } else if !(max - min).is_finite() {
            Err(Error::MalformedBounds {
                field: max_field.to_string(),
                reason: format!("extent {}..{} is too large to represent", min, max),
            })
        } else {
            Ok(())
        }
    }

    pub fn min_lat(&self) -> f64 {
        self.min_lat
    }

    pub fn max_lat(&self) -> f64 {
        self.max_lat
    }

    pub fn min_lon(&self) -> f64 {
        self.min_lon
    }

    pub fn max_lon(&self) -> f64 {
        self.max_lon
    }
}

/// Planar range both projected axes are mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputRange {
    pub min: f64,
    pub max: f64,
}

impl OutputRange {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        let range = OutputRange { min, max };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "output range {}..{} is not finite", self.min, self.max
            )));
        }
        if self.min >= self.max {
            return Err(Error::InvalidConfig(format!(
                "output range minimum {} must be below maximum {}", self.min, self.max
            )));
        }
        Ok(())
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

impl Default for OutputRange {
    fn default() -> Self {
        OutputRange {
            min: DEFAULT_OUT_MIN,
            max: DEFAULT_OUT_MAX,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPoint {
    pub x: f64,
    pub y: f64,
}

impl ProjectedPoint {
    pub fn new(x: f64, y: f64) -> Self {
        ProjectedPoint { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}
