//! Heatmap previews of sliced array data.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::error::{RenderError, Result};
use crate::png::{write_png, RgbaImage};
use crate::ramp::{render_grid, ColorRamp};

/// Offset between Kelvin and degrees Celsius.
const KELVIN_OFFSET: f64 = 273.15;

/// One 2-D plane of an array, row 0 at the north edge.
#[derive(Debug, Clone)]
pub struct ArrayPlane {
    pub variable: String,
    pub units: Option<String>,
    pub width: u32,
    pub height: u32,
    pub values: Vec<f64>,
}

/// What a preview render produced.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewSummary {
    pub output: PathBuf,
    pub ramp: &'static str,
    pub width: u32,
    pub height: u32,
    /// Displayed range, after any unit conversion.
    pub min: f64,
    pub max: f64,
    pub units: Option<String>,
}

fn is_kelvin(units: Option<&str>) -> bool {
    matches!(units.map(str::trim), Some("K") | Some("k") | Some("kelvin") | Some("Kelvin"))
}

/// Render `plane` as a heatmap PNG at `output`.
///
/// Kelvin temperatures are shown in degrees Celsius. The ramp is chosen
/// from the variable name and spans the plane's finite min/max.
pub fn render_array_preview(
    plane: &ArrayPlane,
    output: &Path,
    max_size: Option<u32>,
) -> Result<PreviewSummary> {
    let expected = plane.width as usize * plane.height as usize;
    if expected == 0 || plane.values.len() != expected {
        return Err(RenderError::invalid_input(format!(
            "{} plane is {}x{} with {} values",
            plane.variable,
            plane.width,
            plane.height,
            plane.values.len()
        )));
    }

    let (values, units) = if is_kelvin(plane.units.as_deref()) {
        let celsius = plane.values.iter().map(|v| v - KELVIN_OFFSET).collect();
        (celsius, Some("°C".to_string()))
    } else {
        (plane.values.clone(), plane.units.clone())
    };

    let (min, max) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if !min.is_finite() {
        return Err(RenderError::invalid_input(format!(
            "{} plane has no finite values",
            plane.variable
        )));
    }

    let ramp = ColorRamp::for_variable(&plane.variable);
    let colors = render_grid(&values, min, max, &ramp);
    let mut image = RgbaImage::from_colors(plane.width, plane.height, &colors);
    if let Some(max_size) = max_size {
        image = image.fit_within(max_size);
    }
    let (width, height) = (image.width, image.height);
    write_png(&image, output)?;

    info!(
        variable = %plane.variable,
        ramp = ramp.name,
        min,
        max,
        path = %output.display(),
        "Wrote array preview"
    );

    Ok(PreviewSummary {
        output: output.to_path_buf(),
        ramp: ramp.name,
        width,
        height,
        min,
        max,
        units,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kelvin_plane_is_shown_in_celsius() {
        let dir = tempfile::tempdir().unwrap();
        let plane = ArrayPlane {
            variable: "tmax".to_string(),
            units: Some("K".to_string()),
            width: 2,
            height: 2,
            values: vec![273.15, 283.15, f64::NAN, 293.15],
        };
        let summary = render_array_preview(&plane, &dir.path().join("tmax.png"), None).unwrap();
        assert_eq!(summary.ramp, "temperature");
        assert!((summary.min - 0.0).abs() < 1e-9);
        assert!((summary.max - 20.0).abs() < 1e-9);
        assert_eq!(summary.units.as_deref(), Some("°C"));
        assert!(dir.path().join("tmax.png").exists());
    }

    #[test]
    fn test_precipitation_ramp_and_downscale() {
        let dir = tempfile::tempdir().unwrap();
        let values: Vec<f64> = test_utils::create_precipitation_grid(40, 20, 9)
            .into_iter()
            .map(f64::from)
            .collect();
        let plane = ArrayPlane {
            variable: "prcp".to_string(),
            units: Some("mm/day".to_string()),
            width: 40,
            height: 20,
            values,
        };
        let summary = render_array_preview(&plane, &dir.path().join("prcp.png"), Some(10)).unwrap();
        assert_eq!(summary.ramp, "precipitation");
        assert_eq!((summary.width, summary.height), (10, 5));
        assert_eq!(summary.min, 0.0);
    }

    #[test]
    fn test_all_nan_plane_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let plane = ArrayPlane {
            variable: "tmax".to_string(),
            units: None,
            width: 1,
            height: 2,
            values: vec![f64::NAN; 2],
        };
        assert!(render_array_preview(&plane, &dir.path().join("x.png"), None).is_err());
    }
}
