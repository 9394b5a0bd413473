//! Pixel windows into a raster.

use serde::{Deserialize, Serialize};

/// Half-open pixel window: columns `left..right`, rows `top..bottom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelWindow {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl PixelWindow {
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Window covering an entire raster.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    /// Number of pixels covered.
    pub fn pixel_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// True when the window covers no pixels.
    pub fn is_degenerate(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// True when the window lies inside a `width` x `height` raster.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.left <= self.right
            && self.top <= self.bottom
            && self.right <= width
            && self.bottom <= height
    }
}

impl std::fmt::Display for PixelWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cols {}..{}, rows {}..{}",
            self.left, self.right, self.top, self.bottom
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions() {
        let w = PixelWindow::new(10, 20, 110, 70);
        assert_eq!(w.width(), 100);
        assert_eq!(w.height(), 50);
        assert_eq!(w.pixel_count(), 5000);
        assert!(!w.is_degenerate());
        assert!(w.fits_within(110, 70));
        assert!(!w.fits_within(100, 70));
    }

    #[test]
    fn test_degenerate() {
        assert!(PixelWindow::new(5, 5, 5, 10).is_degenerate());
        assert!(PixelWindow::new(5, 10, 8, 10).is_degenerate());
    }
}
