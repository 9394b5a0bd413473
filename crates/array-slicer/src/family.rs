//! Per-family axis and time handling.
//!
//! Most stores follow one generic path. A few dataset families need
//! special handling, selected once by collection id:
//! - ERA5 stores time as Unix seconds
//! - TerraClimate counts days since 1958-01-01
//! - Daymet sits on a Lambert Conformal Conic grid in meters, and its
//!   cadence is recognized from the time axis length when the axis
//!   cannot be decoded

use chrono::{DateTime, Months, TimeZone, Utc};
use eo_common::time::epoch_seconds;
use eo_common::BoundingBox;
use projection::{project_envelope, LambertConformal};
use serde::Serialize;

use crate::axes::AxisKind;
use crate::error::{Result, SliceError};
use crate::time::{Calendar, TimeEncoding, TimeUnit};

/// Reference date for day counts without units in generic stores.
const GENERIC_DAYS_REFERENCE: (i32, u32, u32) = (1900, 1, 1);

/// TerraClimate's day-count reference.
const TERRACLIMATE_DAYS_REFERENCE: (i32, u32, u32) = (1958, 1, 1);

/// First year of the Daymet record.
const DAYMET_FIRST_YEAR: i32 = 1980;

/// Center of the north-west cell of the Daymet North America grid.
const DAYMET_ORIGIN_X: f64 = -4_560_250.0;
const DAYMET_ORIGIN_Y: f64 = 4_984_500.0;

/// Daymet cell size in meters.
const DAYMET_RESOLUTION: f64 = 1000.0;

/// Points sampled per bbox edge when projecting to the Daymet grid.
const ENVELOPE_STEPS: usize = 16;

/// Dataset family of an array store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetFamily {
    Generic,
    Era5,
    TerraClimate,
    Daymet,
}

/// Temporal cadence of a Daymet product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DaymetCadence {
    Annual,
    Monthly,
    Daily,
}

impl DaymetCadence {
    /// Guess the cadence from the number of time steps.
    pub fn from_len(len: usize) -> Self {
        if len <= 60 {
            Self::Annual
        } else if len <= 720 {
            Self::Monthly
        } else {
            Self::Daily
        }
    }
}

fn utc_date((y, m, d): (i32, u32, u32)) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

impl DatasetFamily {
    /// Select the family for a collection id.
    pub fn for_collection(collection_id: &str) -> Self {
        let id = collection_id.to_lowercase();
        if id.starts_with("daymet") {
            Self::Daymet
        } else if id.starts_with("era5") {
            Self::Era5
        } else if id.starts_with("terraclimate") {
            Self::TerraClimate
        } else {
            Self::Generic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Era5 => "era5",
            Self::TerraClimate => "terraclimate",
            Self::Daymet => "daymet",
        }
    }

    /// True when the spatial axes are projected meters, not degrees.
    pub fn is_projected(&self) -> bool {
        matches!(self, Self::Daymet)
    }

    /// Encoding for a candidate time coordinate.
    ///
    /// CF `units` win for every family. Otherwise ERA5 is Unix seconds,
    /// TerraClimate days since 1958, generic stores are inferred from value
    /// magnitude, and Daymet is left undecoded.
    pub fn time_encoding(
        &self,
        units: Option<&str>,
        calendar: Option<&str>,
        values: &[f64],
    ) -> Option<TimeEncoding> {
        let calendar = calendar.map(Calendar::parse).unwrap_or(Calendar::Standard);
        if let Some(encoding) = units.and_then(TimeEncoding::parse_cf) {
            return Some(encoding.with_calendar(calendar));
        }

        match self {
            Self::Era5 => Some(TimeEncoding::unix(TimeUnit::Seconds)),
            Self::TerraClimate => Some(TimeEncoding::new(
                TimeUnit::Days,
                utc_date(TERRACLIMATE_DAYS_REFERENCE),
            )),
            Self::Generic => TimeEncoding::infer(values, utc_date(GENERIC_DAYS_REFERENCE)),
            Self::Daymet => None,
        }
    }

    /// Time axis in Unix seconds when no coordinate can be decoded.
    ///
    /// Only Daymet has one: steps count years, months or 365-day-calendar
    /// days from 1980-01-01 depending on the axis length.
    pub fn fallback_time_axis(&self, len: usize) -> Option<Vec<f64>> {
        if *self != Self::Daymet {
            return None;
        }
        let start = utc_date((DAYMET_FIRST_YEAR, 1, 1));
        let axis = match DaymetCadence::from_len(len) {
            DaymetCadence::Annual => (0..len)
                .map(|i| utc_date((DAYMET_FIRST_YEAR + i as i32, 1, 1)))
                .map(|dt| epoch_seconds(&dt))
                .collect(),
            DaymetCadence::Monthly => (0..len)
                .map(|i| {
                    start
                        .checked_add_months(Months::new(i as u32))
                        .map_or(f64::NAN, |dt| epoch_seconds(&dt))
                })
                .collect(),
            DaymetCadence::Daily => {
                let encoding = TimeEncoding::new(TimeUnit::Days, start).with_calendar(Calendar::NoLeap);
                let days: Vec<f64> = (0..len).map(|i| i as f64).collect();
                encoding.decode_axis(&days)
            }
        };
        Some(axis)
    }

    /// Cell-center coordinates of a spatial axis when the store carries no
    /// coordinate array. Only the Daymet grid has a fixed layout.
    pub fn fallback_spatial_axis(&self, kind: AxisKind, len: usize) -> Option<Vec<f64>> {
        match (self, kind) {
            (Self::Daymet, AxisKind::Longitude) => Some(
                (0..len)
                    .map(|i| DAYMET_ORIGIN_X + i as f64 * DAYMET_RESOLUTION)
                    .collect(),
            ),
            (Self::Daymet, AxisKind::Latitude) => Some(
                (0..len)
                    .map(|i| DAYMET_ORIGIN_Y - i as f64 * DAYMET_RESOLUTION)
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Request bounds in the store's native units as
    /// `(min_x, min_y, max_x, max_y)`.
    pub fn native_bounds(&self, bbox: &BoundingBox) -> Result<(f64, f64, f64, f64)> {
        match self {
            Self::Daymet => {
                let lcc = LambertConformal::daymet()
                    .map_err(|e| SliceError::invalid_metadata(format!("Daymet projection: {}", e)))?;
                Ok(project_envelope(
                    &lcc,
                    bbox.min_x,
                    bbox.min_y,
                    bbox.max_x,
                    bbox.max_y,
                    ENVELOPE_STEPS,
                ))
            }
            _ => Ok((bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y)),
        }
    }
}

impl std::fmt::Display for DatasetFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
