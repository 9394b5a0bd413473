//! In-memory array store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{ArrayInfo, ArrayStore};
use crate::error::{Result, SliceError};

/// An n-dimensional array held in memory, row-major.
#[derive(Debug, Clone)]
pub struct MemoryArray {
    dimensions: Vec<String>,
    shape: Vec<u64>,
    attributes: Map<String, Value>,
    values: Vec<f64>,
}

impl MemoryArray {
    /// Build an array; `values.len()` must equal the product of `shape`.
    pub fn new(dimensions: &[&str], shape: &[u64], values: Vec<f64>) -> Result<Self> {
        if dimensions.len() != shape.len() {
            return Err(SliceError::invalid_metadata(format!(
                "{} dimension names for {} axes",
                dimensions.len(),
                shape.len()
            )));
        }
        let expected: u64 = shape.iter().product();
        if values.len() as u64 != expected {
            return Err(SliceError::invalid_metadata(format!(
                "{} values for shape {:?}",
                values.len(),
                shape
            )));
        }
        Ok(Self {
            dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
            shape: shape.to_vec(),
            attributes: Map::new(),
            values,
        })
    }

    /// A 1-D coordinate array indexed by a dimension of the same name.
    pub fn coordinate(name: &str, values: Vec<f64>) -> Self {
        Self {
            dimensions: vec![name.to_string()],
            shape: vec![values.len() as u64],
            attributes: Map::new(),
            values,
        }
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    fn extract(&self, start: &[u64], shape: &[u64]) -> Result<Vec<f64>> {
        if start.len() != self.shape.len() || shape.len() != self.shape.len() {
            return Err(SliceError::read_failed(format!(
                "subset rank {} does not match array rank {}",
                shape.len(),
                self.shape.len()
            )));
        }
        for axis in 0..shape.len() {
            if start[axis] + shape[axis] > self.shape[axis] {
                return Err(SliceError::read_failed(format!(
                    "subset {:?}+{:?} exceeds shape {:?}",
                    start, shape, self.shape
                )));
            }
        }

        let total: u64 = shape.iter().product();
        if total == 0 {
            return Ok(Vec::new());
        }

        // Row-major strides of the source
        let mut strides = vec![1u64; self.shape.len()];
        for axis in (0..self.shape.len().saturating_sub(1)).rev() {
            strides[axis] = strides[axis + 1] * self.shape[axis + 1];
        }

        let mut out = Vec::with_capacity(total as usize);
        let mut index = vec![0u64; shape.len()];
        for _ in 0..total {
            let offset: u64 = index
                .iter()
                .zip(start)
                .zip(&strides)
                .map(|((i, s), stride)| (i + s) * stride)
                .sum();
            out.push(self.values[offset as usize]);

            for axis in (0..shape.len()).rev() {
                index[axis] += 1;
                if index[axis] < shape[axis] {
                    break;
                }
                index[axis] = 0;
            }
        }
        Ok(out)
    }
}

/// Serves [`MemoryArray`]s by name and counts subset reads.
#[derive(Debug, Default)]
pub struct MemoryArrayStore {
    location: String,
    arrays: BTreeMap<String, MemoryArray>,
    reads: Arc<AtomicUsize>,
}

impl MemoryArrayStore {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            ..Default::default()
        }
    }

    pub fn with_array(mut self, name: &str, array: MemoryArray) -> Self {
        self.arrays.insert(name.to_string(), array);
        self
    }

    /// Add a 1-D coordinate array named after its dimension.
    pub fn with_coordinate(self, name: &str, values: Vec<f64>) -> Self {
        self.with_array(name, MemoryArray::coordinate(name, values))
    }

    /// Number of `read_subset` calls served so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn get(&self, name: &str) -> Result<&MemoryArray> {
        self.arrays.get(name).ok_or_else(|| SliceError::MissingVariable {
            requested: name.to_string(),
            available: self.arrays.keys().cloned().collect(),
        })
    }
}

#[async_trait]
impl ArrayStore for MemoryArrayStore {
    fn location(&self) -> &str {
        &self.location
    }

    async fn list_arrays(&self) -> Result<Vec<String>> {
        Ok(self.arrays.keys().cloned().collect())
    }

    async fn array_info(&self, name: &str) -> Result<ArrayInfo> {
        let array = self.get(name)?;
        Ok(ArrayInfo {
            name: name.to_string(),
            shape: array.shape.clone(),
            dimensions: array.dimensions.clone(),
            attributes: array.attributes.clone(),
        })
    }

    async fn read_subset(&self, name: &str, start: &[u64], shape: &[u64]) -> Result<Vec<f64>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.get(name)?.extract(start, shape)
    }
}
