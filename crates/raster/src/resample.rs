//! Nearest-neighbour resampling onto a common grid.

use crate::types::BandArray;

/// Source index of each destination cell along one axis.
fn axis_map(src: u32, dst: u32) -> Vec<usize> {
    let scale = src as f64 / dst.max(1) as f64;
    (0..dst)
        .map(|i| {
            let s = ((i as f64 + 0.5) * scale).floor() as usize;
            s.min(src.saturating_sub(1) as usize)
        })
        .collect()
}

/// Resample `band` to `width` x `height` by nearest neighbour.
///
/// The sample type is preserved.
pub fn resample_nearest(band: &BandArray, width: u32, height: u32) -> BandArray {
    if band.width == width && band.height == height {
        return band.clone();
    }

    let cols = axis_map(band.width, width);
    let rows = axis_map(band.height, height);
    let src_width = band.width as usize;

    let mut indices = Vec::with_capacity(width as usize * height as usize);
    for &r in &rows {
        let base = r * src_width;
        indices.extend(cols.iter().map(|&c| base + c));
    }

    BandArray::new(width, height, band.data.gather(&indices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SampleBuffer;

    #[test]
    fn test_upsample_doubles_pixels() {
        let band = BandArray::new(2, 1, SampleBuffer::U16(vec![7, 9]));
        let out = resample_nearest(&band, 4, 2);
        assert_eq!(out.data, SampleBuffer::U16(vec![7, 7, 9, 9, 7, 7, 9, 9]));
    }

    #[test]
    fn test_downsample_picks_centers() {
        // 20 m band from 10 m: 4x4 to 2x2
        let band = BandArray::new(4, 4, SampleBuffer::F32((0..16).map(|v| v as f32).collect()));
        let out = resample_nearest(&band, 2, 2);
        assert_eq!(out.data, SampleBuffer::F32(vec![5.0, 7.0, 13.0, 15.0]));
    }

    #[test]
    fn test_same_size_is_identity() {
        let band = BandArray::new(2, 2, SampleBuffer::U8(vec![1, 2, 3, 4]));
        assert_eq!(resample_nearest(&band, 2, 2), band);
    }
}
