//! Zarr hierarchies on the local filesystem.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use zarrs::array::{Array, DataType};
use zarrs::array_subset::ArraySubset;
use zarrs_filesystem::FilesystemStore;

use super::{ArrayInfo, ArrayStore};
use crate::error::{Result, SliceError};

/// A Zarr (v2 or v3) hierarchy rooted at a local directory.
///
/// Arrays are the root's immediate children. zarrs reads are blocking,
/// so every read runs on the blocking pool.
pub struct ZarrStore {
    location: String,
    root: PathBuf,
    store: Arc<FilesystemStore>,
}

impl ZarrStore {
    /// Open the hierarchy at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        let location = root.display().to_string();
        if !root.is_dir() {
            return Err(SliceError::open_failed(&location, "not a directory"));
        }
        let store = FilesystemStore::new(&root)
            .map_err(|e| SliceError::open_failed(&location, e.to_string()))?;

        Ok(Self {
            location,
            root,
            store: Arc::new(store),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_array_dir(dir: &Path) -> bool {
        if dir.join(".zarray").is_file() {
            return true;
        }
        std::fs::read(dir.join("zarr.json"))
            .ok()
            .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok())
            .and_then(|meta| meta.get("node_type").and_then(Value::as_str).map(|t| t == "array"))
            .unwrap_or(false)
    }

    fn array_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() && Self::is_array_dir(&path) {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn open_array(store: &Arc<FilesystemStore>, name: &str) -> Result<Array<FilesystemStore>> {
        Array::open(store.clone(), &format!("/{}", name))
            .map_err(|e| SliceError::open_failed(name, e.to_string()))
    }

    fn ensure_array(&self, name: &str) -> Result<()> {
        let names = self.array_names()?;
        if names.iter().any(|n| n == name) {
            Ok(())
        } else {
            Err(SliceError::MissingVariable {
                requested: name.to_string(),
                available: names,
            })
        }
    }
}

/// Dimension names from the array metadata, falling back to the
/// `_ARRAY_DIMENSIONS` attribute and then to positional names.
fn dimension_names(array: &Array<FilesystemStore>) -> Vec<String> {
    let ndim = array.shape().len();
    if let Some(names) = array.dimension_names() {
        let names: Vec<String> = names
            .iter()
            .map(|n| n.as_str().unwrap_or_default().to_string())
            .collect();
        if names.len() == ndim && names.iter().all(|n| !n.is_empty()) {
            return names;
        }
    }

    if let Some(Value::Array(names)) = array.attributes().get("_ARRAY_DIMENSIONS") {
        let names: Vec<String> = names
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
        if names.len() == ndim {
            return names;
        }
    }

    (0..ndim).map(|i| format!("dim_{}", i)).collect()
}

/// Read a subset as f64 whatever the stored numeric type.
fn retrieve_f64(array: &Array<FilesystemStore>, subset: &ArraySubset) -> Result<Vec<f64>> {
    macro_rules! elements {
        ($t:ty) => {
            array
                .retrieve_array_subset_elements::<$t>(subset)
                .map(|v| v.into_iter().map(|x| x as f64).collect::<Vec<f64>>())
        };
    }

    let values = match array.data_type() {
        DataType::Float64 => array.retrieve_array_subset_elements::<f64>(subset),
        DataType::Float32 => elements!(f32),
        DataType::Int8 => elements!(i8),
        DataType::Int16 => elements!(i16),
        DataType::Int32 => elements!(i32),
        DataType::Int64 => elements!(i64),
        DataType::UInt8 => elements!(u8),
        DataType::UInt16 => elements!(u16),
        DataType::UInt32 => elements!(u32),
        DataType::UInt64 => elements!(u64),
        other => {
            return Err(SliceError::invalid_metadata(format!(
                "unsupported data type {:?}",
                other
            )))
        }
    };
    values.map_err(|e| SliceError::read_failed(e.to_string()))
}

#[async_trait]
impl ArrayStore for ZarrStore {
    fn location(&self) -> &str {
        &self.location
    }

    async fn list_arrays(&self) -> Result<Vec<String>> {
        self.array_names()
    }

    async fn array_info(&self, name: &str) -> Result<ArrayInfo> {
        self.ensure_array(name)?;
        let store = self.store.clone();
        let name = name.to_string();
        tokio::task::spawn_blocking(move || {
            let array = Self::open_array(&store, &name)?;
            Ok(ArrayInfo {
                shape: array.shape().to_vec(),
                dimensions: dimension_names(&array),
                attributes: array.attributes().clone(),
                name,
            })
        })
        .await
        .map_err(|e| SliceError::read_failed(format!("metadata task failed: {}", e)))?
    }

    async fn read_subset(&self, name: &str, start: &[u64], shape: &[u64]) -> Result<Vec<f64>> {
        let store = self.store.clone();
        let name = name.to_string();
        let start = start.to_vec();
        let shape = shape.to_vec();
        debug!(location = %self.location, array = %name, ?start, ?shape, "Reading subset");

        tokio::task::spawn_blocking(move || {
            let array = Self::open_array(&store, &name)?;
            let subset = ArraySubset::new_with_start_shape(start, shape)
                .map_err(|e| SliceError::read_failed(e.to_string()))?;
            retrieve_f64(&array, &subset)
        })
        .await
        .map_err(|e| SliceError::read_failed(format!("read task failed: {}", e)))?
    }
}
