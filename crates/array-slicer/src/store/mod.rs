//! Chunked array store access.
//!
//! [`ArrayStore`] is the seam between the slicer and wherever the arrays
//! live: a local Zarr hierarchy ([`ZarrStore`]) or memory
//! ([`MemoryArrayStore`]).

mod memory;
mod zarr;

pub use memory::{MemoryArray, MemoryArrayStore};
pub use zarr::ZarrStore;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Result, SliceError};

/// Shape, dimension names and attributes of one array.
#[derive(Debug, Clone, Serialize)]
pub struct ArrayInfo {
    pub name: String,
    pub shape: Vec<u64>,
    pub dimensions: Vec<String>,
    pub attributes: Map<String, Value>,
}

impl ArrayInfo {
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    fn string_attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    fn number_attr(&self, key: &str) -> Option<f64> {
        self.attributes.get(key).and_then(Value::as_f64)
    }

    /// CF `units` attribute.
    pub fn units(&self) -> Option<&str> {
        self.string_attr("units")
    }

    /// CF `calendar` attribute.
    pub fn calendar(&self) -> Option<&str> {
        self.string_attr("calendar")
    }

    /// Declared missing-data marker, if any.
    pub fn fill_value(&self) -> Option<f64> {
        self.number_attr("_FillValue")
            .or_else(|| self.number_attr("missing_value"))
    }

    /// Turn raw stored values into physical ones: missing markers become
    /// NaN, then CF `scale_factor` and `add_offset` apply.
    pub fn decode(&self, values: &mut [f64]) {
        let fill = self.fill_value();
        let scale = self.number_attr("scale_factor").unwrap_or(1.0);
        let offset = self.number_attr("add_offset").unwrap_or(0.0);
        if fill.is_none() && scale == 1.0 && offset == 0.0 {
            return;
        }
        for v in values.iter_mut() {
            if fill.is_some_and(|f| *v == f) {
                *v = f64::NAN;
            } else {
                *v = *v * scale + offset;
            }
        }
    }
}

/// Read access to a hierarchy of named n-dimensional arrays.
#[async_trait]
pub trait ArrayStore: Send + Sync {
    /// Root location, used in logs and cache keys.
    fn location(&self) -> &str;

    /// Names of every array in the store.
    async fn list_arrays(&self) -> Result<Vec<String>>;

    /// Shape, dimensions and attributes of a named array.
    async fn array_info(&self, name: &str) -> Result<ArrayInfo>;

    /// Read the hyper-rectangle `[start, start + shape)` in row-major
    /// order, converted to f64 but otherwise undecoded.
    async fn read_subset(&self, name: &str, start: &[u64], shape: &[u64]) -> Result<Vec<f64>>;

    /// Read a whole 1-D array.
    async fn read_coordinates(&self, name: &str) -> Result<Vec<f64>> {
        let info = self.array_info(name).await?;
        if info.ndim() != 1 {
            return Err(SliceError::invalid_metadata(format!(
                "{} is {}-dimensional, expected a 1-D coordinate",
                name,
                info.ndim()
            )));
        }
        let mut values = self.read_subset(name, &[0], &info.shape).await?;
        info.decode(&mut values);
        Ok(values)
    }
}

/// Open a store by URL or path.
///
/// Local paths and `file://` URLs open a [`ZarrStore`]. Any other
/// protocol (`s3://`, `abfs://`, `https://`, ...) fails with
/// [`SliceError::UnsupportedProtocol`].
pub fn open_store(url: &str) -> Result<Box<dyn ArrayStore>> {
    if let Some((scheme, rest)) = url.split_once("://") {
        let scheme = scheme.to_lowercase();
        if scheme == "file" {
            return Ok(Box::new(ZarrStore::open(rest)?));
        }
        return Err(SliceError::UnsupportedProtocol {
            url: url.to_string(),
            scheme,
        });
    }
    Ok(Box::new(ZarrStore::open(url)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(attrs: Value) -> ArrayInfo {
        ArrayInfo {
            name: "prcp".to_string(),
            shape: vec![4],
            dimensions: vec!["time".to_string()],
            attributes: attrs.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_decode_fill_and_scale() {
        let info = info(serde_json::json!({
            "_FillValue": -9999,
            "scale_factor": 0.1,
            "add_offset": 273.15,
            "units": "K"
        }));
        let mut values = vec![0.0, 10.0, -9999.0];
        info.decode(&mut values);
        assert!((values[0] - 273.15).abs() < 1e-9);
        assert!((values[1] - 274.15).abs() < 1e-9);
        assert!(values[2].is_nan());
        assert_eq!(info.units(), Some("K"));
    }

    #[test]
    fn test_decode_without_attributes_is_identity() {
        let info = info(serde_json::json!({}));
        let mut values = vec![1.0, 2.0];
        info.decode(&mut values);
        assert_eq!(values, vec![1.0, 2.0]);
    }

    #[test]
    fn test_remote_protocols_are_unsupported() {
        for url in ["s3://bucket/daymet.zarr", "abfs://container/era5.zarr", "https://host/x.zarr"] {
            match open_store(url) {
                Err(SliceError::UnsupportedProtocol { scheme, .. }) => {
                    assert!(url.starts_with(&scheme));
                }
                Err(other) => panic!("unexpected error for {}: {}", url, other),
                Ok(_) => panic!("{} should not open", url),
            }
        }
    }
}
