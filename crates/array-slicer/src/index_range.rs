//! Index ranges over 1-D coordinate arrays.
//!
//! Coordinate arrays are assumed monotonic (ascending or descending) but
//! are not searched by bisection: after a chunk load they are small enough
//! that a linear scan from both ends is adequate.

use serde::Serialize;

/// Half-open span `[start, end)` of indices along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexRange {
    pub start: usize,
    pub end: usize,
}

impl IndexRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Every index of an axis of length `len`.
    pub fn full(len: usize) -> Self {
        Self { start: 0, end: len }
    }

    pub fn empty() -> Self {
        Self { start: 0, end: 0 }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// True when no index qualified. Callers treat this as "no data in the
    /// requested window", not as a resolver failure.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

impl std::fmt::Display for IndexRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Smallest contiguous span of `coords` whose values lie within
/// `[min, max]` (bounds may be given in either order).
///
/// Scans forward from the first index and backward from the last until
/// each side reaches a qualifying value. NaN coordinates never qualify.
/// Returns an empty range when nothing qualifies.
pub fn find_index_range(coords: &[f64], min: f64, max: f64) -> IndexRange {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    let inside = |v: f64| v >= lo && v <= hi;

    let mut start = 0;
    while start < coords.len() && !inside(coords[start]) {
        start += 1;
    }
    if start == coords.len() {
        return IndexRange::empty();
    }

    let mut end = coords.len();
    while end > start && !inside(coords[end - 1]) {
        end -= 1;
    }

    IndexRange { start, end }
}

/// Longitude convention of a store's coordinate array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LongitudeConvention {
    /// Values in [-180, 180].
    Signed,
    /// Values in [0, 360).
    Positive,
}

impl LongitudeConvention {
    /// Detect the convention from the coordinate array's own range.
    pub fn detect(coords: &[f64]) -> Self {
        let max = coords
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(f64::NEG_INFINITY, f64::max);
        if max > 180.0 {
            Self::Positive
        } else {
            Self::Signed
        }
    }

    fn bounds(&self) -> (f64, f64) {
        match self {
            Self::Signed => (-180.0, 180.0),
            Self::Positive => (0.0, 360.0),
        }
    }

    /// Express a longitude in this convention.
    pub fn convert(&self, lon: f64) -> f64 {
        match self {
            Self::Positive if lon < 0.0 => lon + 360.0,
            Self::Signed if lon > 180.0 => lon - 360.0,
            _ => lon,
        }
    }
}

/// Longitude intervals to look up for a request spanning `west..east`.
///
/// The request is converted to the store's convention first. When it then
/// crosses the store's seam (e.g. -10..10 against a 0-360 axis becomes
/// 350..370) it is split into the part up to the seam and the part after
/// it, in west-to-east order.
pub fn longitude_intervals(
    convention: LongitudeConvention,
    west: f64,
    east: f64,
) -> Vec<(f64, f64)> {
    let (lower, upper) = convention.bounds();
    if east - west >= 360.0 {
        return vec![(lower, upper)];
    }

    let w = convention.convert(west);
    let e = convention.convert(east);
    if w <= e {
        vec![(w, e)]
    } else {
        vec![(w, upper), (lower, e)]
    }
}

/// Index ranges for a longitude request, one per interval of
/// [`longitude_intervals`]. Empty pieces are dropped.
pub fn find_longitude_ranges(coords: &[f64], west: f64, east: f64) -> Vec<IndexRange> {
    let convention = LongitudeConvention::detect(coords);
    longitude_intervals(convention, west, east)
        .into_iter()
        .map(|(lo, hi)| find_index_range(coords, lo, hi))
        .filter(|r| !r.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(start: f64, step: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| start + step * i as f64).collect()
    }

    #[test]
    fn test_ascending_range() {
        let coords = axis(0.0, 1.0, 10);
        assert_eq!(find_index_range(&coords, 2.5, 6.0), IndexRange::new(3, 7));
        assert_eq!(find_index_range(&coords, -5.0, 100.0), IndexRange::full(10));
    }

    #[test]
    fn test_descending_range() {
        let coords = axis(50.0, -0.5, 21);
        let range = find_index_range(&coords, 45.2, 47.0);
        assert_eq!(range, IndexRange::new(6, 10));
        assert_eq!(coords[6], 47.0);
        assert_eq!(coords[9], 45.5);
    }

    #[test]
    fn test_bounds_in_either_order() {
        let coords = axis(0.0, 1.0, 10);
        assert_eq!(
            find_index_range(&coords, 6.0, 2.5),
            find_index_range(&coords, 2.5, 6.0)
        );
    }

    #[test]
    fn test_no_overlap_is_empty() {
        let coords = axis(0.0, 1.0, 10);
        let range = find_index_range(&coords, 20.0, 30.0);
        assert!(range.is_empty());
        assert_eq!(range.len(), 0);

        // Bounds between two samples
        assert!(find_index_range(&coords, 3.2, 3.8).is_empty());
        assert!(find_index_range(&[], 0.0, 1.0).is_empty());
    }

    #[test]
    fn test_nan_coordinates_do_not_qualify() {
        let coords = [f64::NAN, 1.0, 2.0, f64::NAN];
        assert_eq!(find_index_range(&coords, 0.0, 5.0), IndexRange::new(1, 3));
    }

    #[test]
    fn test_range_is_tight() {
        let ascending = axis(-3.0, 0.25, 40);
        let descending: Vec<f64> = ascending.iter().rev().copied().collect();

        for coords in [&ascending, &descending] {
            for a in 0..30 {
                for b in a..30 {
                    let (min, max) = (-3.3 + a as f64 * 0.37, -3.3 + b as f64 * 0.37);
                    let range = find_index_range(coords, min, max);
                    let inside = |i: usize| coords[i] >= min && coords[i] <= max;

                    for i in range.start..range.end {
                        assert!(inside(i), "index {} outside [{}, {}]", i, min, max);
                    }
                    if !range.is_empty() {
                        assert!(range.start == 0 || !inside(range.start - 1));
                        assert!(range.end == coords.len() || !inside(range.end));
                    } else {
                        assert!((0..coords.len()).all(|i| !inside(i)));
                    }
                }
            }
        }
    }

    #[test]
    fn test_convention_detection() {
        assert_eq!(
            LongitudeConvention::detect(&axis(0.0, 1.0, 360)),
            LongitudeConvention::Positive
        );
        assert_eq!(
            LongitudeConvention::detect(&axis(-179.5, 1.0, 360)),
            LongitudeConvention::Signed
        );
    }

    #[test]
    fn test_signed_request_against_positive_axis() {
        assert_eq!(
            longitude_intervals(LongitudeConvention::Positive, -10.0, 10.0),
            vec![(350.0, 360.0), (0.0, 10.0)]
        );
        assert_eq!(
            longitude_intervals(LongitudeConvention::Positive, -20.0, -10.0),
            vec![(340.0, 350.0)]
        );

        let coords = axis(0.0, 1.0, 360);
        let ranges = find_longitude_ranges(&coords, -10.0, 10.0);
        assert_eq!(ranges, vec![IndexRange::new(350, 360), IndexRange::new(0, 11)]);
    }

    #[test]
    fn test_antimeridian_request_against_signed_axis() {
        let coords = axis(-179.5, 1.0, 360);
        let ranges = find_longitude_ranges(&coords, 170.0, -170.0);
        assert_eq!(ranges, vec![IndexRange::new(350, 360), IndexRange::new(0, 10)]);
    }

    #[test]
    fn test_whole_globe_request() {
        assert_eq!(
            longitude_intervals(LongitudeConvention::Positive, -180.0, 180.0),
            vec![(0.0, 360.0)]
        );
        let coords = axis(0.0, 0.25, 1440);
        assert_eq!(
            find_longitude_ranges(&coords, -180.0, 180.0),
            vec![IndexRange::full(1440)]
        );
    }
}
