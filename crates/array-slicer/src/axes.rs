//! Matching dimension names to time, latitude and longitude axes.
//!
//! Datasets disagree on naming, so each axis is tried against a list of
//! names seen in the wild. A collection's preferred names win over the
//! generic aliases.

use serde::Serialize;

/// Names tried for the time axis, in order.
pub const TIME_ALIASES: &[&str] = &["time", "date", "day", "valid_time", "t"];

/// Names tried for the latitude (or projected northing) axis.
pub const LATITUDE_ALIASES: &[&str] = &["lat", "latitude", "y"];

/// Names tried for the longitude (or projected easting) axis.
pub const LONGITUDE_ALIASES: &[&str] = &["lon", "longitude", "x"];

/// Role of a dimension in a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisKind {
    Time,
    Latitude,
    Longitude,
}

impl AxisKind {
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Time => TIME_ALIASES,
            Self::Latitude => LATITUDE_ALIASES,
            Self::Longitude => LONGITUDE_ALIASES,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
        }
    }

    /// Classify a dimension name by the alias lists.
    pub fn classify(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        [Self::Time, Self::Latitude, Self::Longitude]
            .into_iter()
            .find(|kind| kind.aliases().contains(&name.as_str()))
    }
}

impl std::fmt::Display for AxisKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Positions of the recognized axes within a variable's dimension list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolvedAxes {
    pub time: Option<usize>,
    pub latitude: Option<usize>,
    pub longitude: Option<usize>,
}

impl ResolvedAxes {
    pub fn get(&self, kind: AxisKind) -> Option<usize> {
        match kind {
            AxisKind::Time => self.time,
            AxisKind::Latitude => self.latitude,
            AxisKind::Longitude => self.longitude,
        }
    }

    /// Axis kind of the dimension at `index`, if any.
    pub fn kind_of(&self, index: usize) -> Option<AxisKind> {
        [AxisKind::Time, AxisKind::Latitude, AxisKind::Longitude]
            .into_iter()
            .find(|kind| self.get(*kind) == Some(index))
    }
}

/// Match `dimensions` against the axis aliases.
///
/// `preferred` holds the collection's (time, latitude, longitude) names;
/// an exact match on one of those is taken before any alias. A dimension
/// is assigned to at most one axis.
pub fn resolve_axes(dimensions: &[String], preferred: (&str, &str, &str)) -> ResolvedAxes {
    let mut taken = vec![false; dimensions.len()];
    let mut claim = |kind: AxisKind, preferred: &str| {
        let index = dimensions
            .iter()
            .position(|d| d == preferred)
            .filter(|&i| !taken[i])
            .or_else(|| {
                kind.aliases().iter().find_map(|alias| {
                    (0..dimensions.len())
                        .find(|&i| !taken[i] && dimensions[i].eq_ignore_ascii_case(alias))
                })
            });
        if let Some(i) = index {
            taken[i] = true;
        }
        index
    };

    let time = claim(AxisKind::Time, preferred.0);
    let latitude = claim(AxisKind::Latitude, preferred.1);
    let longitude = claim(AxisKind::Longitude, preferred.2);
    ResolvedAxes {
        time,
        latitude,
        longitude,
    }
}

/// Coordinate array names to try when decoding the time axis, in order:
/// the dimension itself, the collection's preferred name, then the aliases.
pub fn time_candidates(dimension: Option<&str>, preferred: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in dimension
        .into_iter()
        .chain(std::iter::once(preferred))
        .chain(TIME_ALIASES.iter().copied())
    {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_conventional_names() {
        let axes = resolve_axes(&dims(&["time", "lat", "lon"]), ("time", "lat", "lon"));
        assert_eq!(axes.time, Some(0));
        assert_eq!(axes.latitude, Some(1));
        assert_eq!(axes.longitude, Some(2));
        assert_eq!(axes.kind_of(2), Some(AxisKind::Longitude));
    }

    #[test]
    fn test_aliases_are_case_insensitive() {
        let axes = resolve_axes(
            &dims(&["valid_time", "Latitude", "LONGITUDE"]),
            ("time", "lat", "lon"),
        );
        assert_eq!(axes.time, Some(0));
        assert_eq!(axes.latitude, Some(1));
        assert_eq!(axes.longitude, Some(2));
    }

    #[test]
    fn test_projected_axes() {
        let axes = resolve_axes(&dims(&["time", "y", "x"]), ("time", "y", "x"));
        assert_eq!((axes.latitude, axes.longitude), (Some(1), Some(2)));
    }

    #[test]
    fn test_missing_axis() {
        let axes = resolve_axes(&dims(&["band", "row", "col"]), ("time", "lat", "lon"));
        assert_eq!(axes, ResolvedAxes::default());
        assert_eq!(AxisKind::classify("row"), None);
        assert_eq!(AxisKind::classify("Date"), Some(AxisKind::Time));
    }

    #[test]
    fn test_time_candidates_dedup() {
        assert_eq!(
            time_candidates(Some("day"), "time"),
            vec!["day", "time", "date", "valid_time", "t"]
        );
    }
}
