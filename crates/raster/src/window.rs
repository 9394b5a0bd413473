//! Bounding box to pixel window resolution.

use eo_common::{BoundingBox, PixelWindow};
use projection::{project_envelope, MapProjection};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ReaderConfig;
use crate::types::{GeoTransform, RasterMetadata};

/// A pixel window and the size it is read at.
///
/// The window always covers the whole resolved area. A size cap lowers
/// the output resolution instead of cutting the window down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedWindow {
    pub window: PixelWindow,
    pub output_width: u32,
    pub output_height: u32,
}

impl ResolvedWindow {
    /// Read at native resolution.
    pub fn native(window: PixelWindow) -> Self {
        Self {
            window,
            output_width: window.width(),
            output_height: window.height(),
        }
    }

    /// Read so that neither output side exceeds `max_size`.
    pub fn capped(window: PixelWindow, max_size: Option<u32>) -> Self {
        let (output_width, output_height) = output_size(&window, max_size);
        Self {
            window,
            output_width,
            output_height,
        }
    }

    pub fn is_downscaled(&self) -> bool {
        self.output_width != self.window.width() || self.output_height != self.window.height()
    }
}

/// Resolve a lon/lat bbox to a pixel window of `meta`'s raster.
///
/// Never fails. A box that misses the raster yields a recovery window of
/// `config.recovery_window_size` pixels centered on where the box would
/// have been, clamped to the raster. `max_size` caps the output size;
/// the window keeps its full extent and is read at a coarser resolution.
pub fn resolve_window(
    meta: &RasterMetadata,
    bbox: &BoundingBox,
    max_size: Option<u32>,
    config: &ReaderConfig,
) -> ResolvedWindow {
    let projector = meta.projection().and_then(|def| match def.projector() {
        Ok(p) => Some(p),
        Err(e) => {
            warn!(error = %e, "Cannot build projection, treating raster as geographic");
            None
        }
    });

    let window = window_for_bbox(
        meta.width,
        meta.height,
        &meta.transform,
        projector.as_deref(),
        bbox,
        config.recovery_window_size,
    );
    let resolved = ResolvedWindow::capped(window, max_size);
    if resolved.is_downscaled() {
        debug!(
            window = %window,
            width = resolved.output_width,
            height = resolved.output_height,
            "Reading window at reduced resolution"
        );
    }
    resolved
}

/// Lower-level form of [`resolve_window`] over raw georeferencing.
pub fn window_for_bbox(
    width: u32,
    height: u32,
    transform: &GeoTransform,
    projection: Option<&dyn MapProjection>,
    bbox: &BoundingBox,
    recovery_size: u32,
) -> PixelWindow {
    // All four corners: rotated grids make two-corner transforms unsafe
    let (min_x, min_y, max_x, max_y) = match projection {
        Some(p) => project_envelope(p, bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y, 1),
        None => (bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y),
    };

    let mut cols = [f64::MAX, f64::MIN];
    let mut rows = [f64::MAX, f64::MIN];
    for (x, y) in [(min_x, min_y), (min_x, max_y), (max_x, min_y), (max_x, max_y)] {
        let (col, row) = transform.world_to_pixel(x, y);
        cols = [cols[0].min(col), cols[1].max(col)];
        rows = [rows[0].min(row), rows[1].max(row)];
    }

    let raw_left = cols[0].floor();
    let raw_right = cols[1].ceil();
    let raw_top = rows[0].floor();
    let raw_bottom = rows[1].ceil();

    let clamp = |v: f64, limit: u32| {
        if v.is_nan() {
            0
        } else {
            v.clamp(0.0, limit as f64) as u32
        }
    };
    let window = PixelWindow::new(
        clamp(raw_left, width),
        clamp(raw_top, height),
        clamp(raw_right, width),
        clamp(raw_bottom, height),
    );

    if window.is_degenerate() {
        let center_col = (raw_left + raw_right) / 2.0;
        let center_row = (raw_top + raw_bottom) / 2.0;
        let recovered = centered_window(width, height, center_col, center_row, recovery_size, recovery_size);
        warn!(
            bbox = %bbox.to_attribute_string(),
            window = %recovered,
            "Bounding box misses raster, using recovery window"
        );
        recovered
    } else {
        window
    }
}

/// A `w` by `h` window centered on a pixel position, clamped to the raster.
fn centered_window(width: u32, height: u32, center_col: f64, center_row: f64, w: u32, h: u32) -> PixelWindow {
    let w = w.clamp(1, width.max(1));
    let h = h.clamp(1, height.max(1));
    let left = place(center_col, w, width);
    let top = place(center_row, h, height);
    PixelWindow::new(left, top, left + w, top + h)
}

fn place(center: f64, size: u32, limit: u32) -> u32 {
    let max_start = limit.saturating_sub(size);
    if !center.is_finite() {
        return max_start / 2;
    }
    (center - size as f64 / 2.0).floor().clamp(0.0, max_start as f64) as u32
}

/// Output size of `window` with its larger side capped at `max_size`,
/// keeping the aspect ratio. Windows already within the cap are unchanged.
pub fn output_size(window: &PixelWindow, max_size: Option<u32>) -> (u32, u32) {
    let (w, h) = (window.width(), window.height());
    match max_size {
        Some(max) if max > 0 && (w > max || h > max) => {
            let scale = max as f64 / w.max(h) as f64;
            (
                ((w as f64 * scale).round() as u32).clamp(1, max),
                ((h as f64 * scale).round() as u32).clamp(1, max),
            )
        }
        _ => (w, h),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use projection::{GeoKeys, ProjectionDefinition};

    fn global_grid() -> GeoTransform {
        GeoTransform::new(-180.0, 90.0, 1.0, -1.0)
    }

    #[test]
    fn test_geographic_window_floors_and_ceils() {
        let bbox = BoundingBox::new(-10.5, 20.2, 10.5, 30.7);
        let w = window_for_bbox(360, 180, &global_grid(), None, &bbox, 512);
        assert_eq!(w, PixelWindow::new(169, 59, 191, 70));
    }

    #[test]
    fn test_partial_overlap_is_clamped() {
        let bbox = BoundingBox::new(170.0, 80.0, 200.0, 100.0);
        let w = window_for_bbox(360, 180, &global_grid(), None, &bbox, 512);
        assert_eq!(w, PixelWindow::new(350, 0, 360, 10));
    }

    #[test]
    fn test_outside_bbox_recovers_inside_raster() {
        let transform = GeoTransform::new(0.0, 10.0, 0.01, -0.01);
        let bbox = BoundingBox::new(20.0, 20.0, 21.0, 21.0);
        let w = window_for_bbox(1000, 1000, &transform, None, &bbox, 512);
        assert!(!w.is_degenerate());
        assert!(w.fits_within(1000, 1000));
        // East of and above the raster
        assert_eq!(w, PixelWindow::new(488, 0, 1000, 512));
    }

    #[test]
    fn test_recovery_on_small_raster_uses_whole_raster() {
        let transform = GeoTransform::new(0.0, 1.0, 0.01, -0.01);
        let bbox = BoundingBox::new(-50.0, -50.0, -40.0, -40.0);
        let w = window_for_bbox(100, 80, &transform, None, &bbox, 512);
        assert_eq!(w, PixelWindow::full(100, 80));
    }

    #[test]
    fn test_max_size_keeps_full_coverage() {
        // 100x100 one-degree grid, whole extent requested, capped at 10
        let meta = RasterMetadata {
            width: 100,
            height: 100,
            band_count: 1,
            sample_type: crate::types::SampleType::U8,
            transform: GeoTransform::new(0.0, 100.0, 1.0, -1.0),
            geokeys: GeoKeys::geographic_wgs84(),
            nodata: None,
        };
        let bbox = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let resolved = resolve_window(&meta, &bbox, Some(10), &ReaderConfig::default());
        assert_eq!(resolved.window, PixelWindow::full(100, 100));
        assert_eq!((resolved.output_width, resolved.output_height), (10, 10));
        assert!(resolved.is_downscaled());
    }

    #[test]
    fn test_output_size_keeps_aspect() {
        let window = PixelWindow::new(169, 59, 191, 70);
        assert_eq!(output_size(&window, Some(11)), (11, 6));
        assert_eq!(output_size(&window, Some(100)), (22, 11));
        assert_eq!(output_size(&window, None), (22, 11));
        assert!(!ResolvedWindow::capped(window, Some(22)).is_downscaled());
    }

    #[test]
    fn test_utm_raster_window_contains_projected_center() {
        // Sentinel-2 style tile in zone 33N
        let meta = RasterMetadata {
            width: 10980,
            height: 10980,
            band_count: 1,
            sample_type: crate::types::SampleType::U16,
            transform: GeoTransform::new(399_960.0, 5_000_040.0, 10.0, -10.0),
            geokeys: GeoKeys::projected(32633),
            nodata: None,
        };
        let bbox = BoundingBox::new(14.9, 44.9, 15.1, 45.0);
        let w = resolve_window(&meta, &bbox, None, &ReaderConfig::default()).window;
        assert!(!w.is_degenerate());
        assert!(w.fits_within(10980, 10980));

        let projector = ProjectionDefinition::Utm { zone: 33, south: false }
            .projector()
            .unwrap();
        let (x, y) = projector.forward(15.0, 44.95);
        let (col, row) = meta.transform.world_to_pixel(x, y);
        assert!((w.left as f64) < col && col < w.right as f64);
        assert!((w.top as f64) < row && row < w.bottom as f64);
        // Roughly 16 km by 11 km at 10 m
        assert!((1500..1700).contains(&w.width()));
        assert!((1050..1200).contains(&w.height()));
    }

    #[test]
    fn test_nan_bbox_recovers() {
        let bbox = BoundingBox::new(f64::NAN, 0.0, f64::NAN, 1.0);
        let w = window_for_bbox(360, 180, &global_grid(), None, &bbox, 64);
        assert!(!w.is_degenerate());
        assert!(w.fits_within(360, 180));
    }
}
