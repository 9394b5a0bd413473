//! Bounding box types and area-of-interest checks.

use serde::{Deserialize, Serialize};

use crate::error::{EoError, EoResult};

/// Kilometers per degree of latitude.
const KM_PER_DEGREE: f64 = 111.32;

/// A geographic bounding box in WGS84 degrees.
///
/// `min_x`/`max_x` are west/east longitudes, `min_y`/`max_y` are
/// south/north latitudes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from west, south, east, north.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Parse a "west,south,east,north" string.
    pub fn parse(s: &str) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let mut values = [0.0f64; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| BboxParseError::InvalidNumber(part.to_string()))?;
        }

        Ok(Self::new(values[0], values[1], values[2], values[3]))
    }

    /// Check ordering and geographic bounds.
    pub fn validate(&self) -> EoResult<()> {
        if !(self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite())
        {
            return Err(EoError::InvalidBbox("coordinates must be finite".into()));
        }
        if self.min_x >= self.max_x {
            return Err(EoError::InvalidBbox("west must be less than east".into()));
        }
        if self.min_y >= self.max_y {
            return Err(EoError::InvalidBbox("south must be less than north".into()));
        }
        if !(-180.0..=180.0).contains(&self.min_x) || !(-180.0..=180.0).contains(&self.max_x) {
            return Err(EoError::InvalidBbox(
                "longitude must be between -180 and 180".into(),
            ));
        }
        if !(-90.0..=90.0).contains(&self.min_y) || !(-90.0..=90.0).contains(&self.max_y) {
            return Err(EoError::InvalidBbox(
                "latitude must be between -90 and 90".into(),
            ));
        }
        Ok(())
    }

    /// Width of the bounding box in degrees.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in degrees.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Center point as (lon, lat).
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// The four corners as (lon, lat): NW, NE, SE, SW.
    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.min_x, self.max_y),
            (self.max_x, self.max_y),
            (self.max_x, self.min_y),
            (self.min_x, self.min_y),
        ]
    }

    /// Approximate area in square kilometers, scaling longitude by the
    /// cosine of the center latitude.
    pub fn area_km2(&self) -> f64 {
        let (_, lat) = self.center();
        let width_km = self.width().abs() * KM_PER_DEGREE * lat.to_radians().cos();
        let height_km = self.height().abs() * KM_PER_DEGREE;
        width_km * height_km
    }

    /// Check if this bbox intersects another.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }

    /// Check if a point is contained within this bbox.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Comma-separated form used in dataset attributes.
    pub fn to_attribute_string(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid bbox format: {0}. Expected 'west,south,east,north'")]
    InvalidFormat(String),

    #[error("Invalid number in bbox: {0}")]
    InvalidNumber(String),
}

/// Area limits applied before any pixels are read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AoiPolicy {
    /// Areas above this produce a warning.
    pub warn_km2: f64,
    /// Areas above this are rejected.
    pub reject_km2: f64,
    /// (upper area bound, resolution multiplier), ascending.
    pub scale_thresholds: &'static [(f64, u32)],
    /// Multiplier for areas beyond the last threshold.
    pub max_scale: u32,
}

const DEFAULT_SCALE_THRESHOLDS: &[(f64, u32)] =
    &[(10.0, 1), (50.0, 2), (100.0, 4), (500.0, 8), (1000.0, 16)];

impl Default for AoiPolicy {
    fn default() -> Self {
        Self {
            warn_km2: 100.0,
            reject_km2: 1000.0,
            scale_thresholds: DEFAULT_SCALE_THRESHOLDS,
            max_scale: 16,
        }
    }
}

/// Outcome of checking a bbox against an [`AoiPolicy`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AoiAssessment {
    pub area_km2: f64,
    pub resolution_scale: u32,
    pub warnings: Vec<String>,
}

impl AoiPolicy {
    /// Validate the bbox, reject oversized areas and pick a resolution multiplier.
    pub fn assess(&self, bbox: &BoundingBox) -> EoResult<AoiAssessment> {
        bbox.validate()?;
        let area_km2 = bbox.area_km2();

        if area_km2 > self.reject_km2 {
            return Err(EoError::AoiTooLarge {
                area_km2,
                limit_km2: self.reject_km2,
            });
        }

        let mut warnings = Vec::new();
        if area_km2 > self.warn_km2 {
            warnings.push(format!(
                "Large AOI ({:.0} km²). Processing may take several minutes.",
                area_km2
            ));
        }

        let resolution_scale = self
            .scale_thresholds
            .iter()
            .find(|(limit, _)| area_km2 <= *limit)
            .map(|(_, scale)| *scale)
            .unwrap_or(self.max_scale);

        Ok(AoiAssessment {
            area_km2,
            resolution_scale,
            warnings,
        })
    }
}
