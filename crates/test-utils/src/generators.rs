//! Test data generators for synthetic earth-observation data.
//!
//! These generators create predictable, verifiable patterns that can be
//! used across the test suite: raster bands, terrain, land-cover classes,
//! radar backscatter and climate cubes with their coordinate axes.

/// Creates a reflectance-like band with values in `offset..offset + 4000`.
///
/// A diagonal gradient, so every window has distinct values and percentile
/// stretches are well defined. Values fit in `u16` like Sentinel-2 L2A
/// surface reflectance.
pub fn create_reflectance_band(width: usize, height: usize, offset: u16) -> Vec<u16> {
    let span = (width + height).max(1) as f32;
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let v = (col + row) as f32 / span * 4000.0;
            data.push(offset.saturating_add(v as u16));
        }
    }
    data
}

/// Creates terrain in meters: a single peak rising from `base` to `peak`
/// at the grid center.
pub fn create_elevation_grid(width: usize, height: usize, base: f32, peak: f32) -> Vec<f32> {
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;
    let max_dist = (cx * cx + cy * cy).sqrt().max(1.0);

    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let dx = col as f32 + 0.5 - cx;
            let dy = row as f32 + 0.5 - cy;
            let t = 1.0 - ((dx * dx + dy * dy).sqrt() / max_dist).min(1.0);
            data.push(base + (peak - base) * t);
        }
    }
    data
}

/// Creates a land-cover grid cycling through `classes` in vertical stripes
/// `stripe` pixels wide.
pub fn create_classification_grid(
    width: usize,
    height: usize,
    classes: &[u8],
    stripe: usize,
) -> Vec<u8> {
    let stripe = stripe.max(1);
    let mut data = Vec::with_capacity(width * height);
    for _row in 0..height {
        for col in 0..width {
            data.push(classes.get((col / stripe) % classes.len().max(1)).copied().unwrap_or(0));
        }
    }
    data
}

/// Creates a co-/cross-polarized backscatter pair in linear power.
///
/// Co-pol varies around -8 dB and cross-pol around -15 dB with a
/// deterministic speckle-like texture.
pub fn create_backscatter_pair(width: usize, height: usize, seed: u32) -> (Vec<f32>, Vec<f32>) {
    let mut co = Vec::with_capacity(width * height);
    let mut cross = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let jitter = (simple_hash(col as u32, row as u32, seed) % 600) as f32 / 100.0 - 3.0;
            co.push(db_to_linear(-8.0 + jitter));
            cross.push(db_to_linear(-15.0 + jitter * 0.5));
        }
    }
    (co, cross)
}

fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 10.0)
}

/// Creates a time-major climate cube `[time][lat][lon]` in Kelvin.
///
/// Value = `250 + t + lat_index * 0.1 + lon_index * 0.01`, so any sub-range
/// has easily computed min/max.
pub fn create_temperature_cube(times: usize, lats: usize, lons: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(times * lats * lons);
    for t in 0..times {
        for y in 0..lats {
            for x in 0..lons {
                data.push(250.0 + t as f64 + y as f64 * 0.1 + x as f64 * 0.01);
            }
        }
    }
    data
}

/// Creates an evenly spaced coordinate axis of `n` cell centers.
///
/// Negative `step` gives a descending axis, as used by north-up latitude
/// coordinates.
///
/// ```
/// use test_utils::create_coordinate_axis;
///
/// assert_eq!(create_coordinate_axis(90.0, -1.0, 3), vec![90.0, 89.0, 88.0]);
/// ```
pub fn create_coordinate_axis(start: f64, step: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| start + step * i as f64).collect()
}

/// Creates a grid with random-ish but deterministic precipitation values
/// in mm. Most cells are dry.
pub fn create_precipitation_grid(width: usize, height: usize, seed: u32) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let hash = simple_hash(col as u32, row as u32, seed);
            let precip = if hash % 4 == 0 {
                (hash % 5000) as f32 / 100.0
            } else {
                0.0
            };
            data.push(precip);
        }
    }
    data
}

/// Simple deterministic hash for reproducible test data.
fn simple_hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_mul(31).wrapping_add(x);
    h = h.wrapping_mul(31).wrapping_add(y);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}
