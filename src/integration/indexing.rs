//! Dense row-major indexing of the valid pixels of a mask.
//!
//! The index grid doubles as the neighbor oracle for operator and facet
//! construction: looking up `(x ± 1, y ± 1)` returns `None` both outside the
//! image and on invalid pixels, so no padding or shifted copies are needed.
use crate::error::{IntegrationError, Result};
use crate::image::Mask;

/// Sentinel stored for invalid cells.
const INVALID: usize = usize::MAX;

/// Bijection between valid pixels and `0..len()`.
#[derive(Clone, Debug)]
pub struct PixelIndex {
    w: usize,
    h: usize,
    grid: Vec<usize>,
    /// `(x, y)` of each valid pixel, in index order.
    pixels: Vec<(usize, usize)>,
}

impl PixelIndex {
    /// Assign indices to valid pixels in row-major scan order.
    ///
    /// Fails with `InvalidInput` when the mask has no valid pixel.
    pub fn build(mask: &Mask) -> Result<Self> {
        let mut grid = vec![INVALID; mask.w * mask.h];
        let mut pixels = Vec::new();
        for y in 0..mask.h {
            for x in 0..mask.w {
                if mask.get(x, y) {
                    grid[y * mask.w + x] = pixels.len();
                    pixels.push((x, y));
                }
            }
        }
        if pixels.is_empty() {
            return Err(IntegrationError::invalid("mask contains no valid pixel"));
        }
        Ok(Self {
            w: mask.w,
            h: mask.h,
            grid,
            pixels,
        })
    }

    /// Number of valid pixels `N`.
    #[inline]
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.w
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.h
    }

    /// Index of the pixel at `(x, y)`, `None` if invalid.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<usize> {
        match self.grid[y * self.w + x] {
            INVALID => None,
            idx => Some(idx),
        }
    }

    /// Index of the pixel offset by `(dx, dy)` from `(x, y)`, `None` when the
    /// neighbor is outside the image or invalid.
    #[inline]
    pub fn neighbor(&self, x: usize, y: usize, dx: isize, dy: isize) -> Option<usize> {
        let nx = x.checked_add_signed(dx)?;
        let ny = y.checked_add_signed(dy)?;
        if nx >= self.w || ny >= self.h {
            return None;
        }
        self.get(nx, ny)
    }

    /// Pixel coordinates `(x, y)` of index `i`.
    #[inline]
    pub fn pixel(&self, i: usize) -> (usize, usize) {
        self.pixels[i]
    }

    pub fn pixels(&self) -> &[(usize, usize)] {
        &self.pixels
    }

    /// Scatter per-pixel values into a dense buffer, filling invalid cells.
    pub fn scatter(&self, values: &[f64], fill: f64) -> Vec<f64> {
        debug_assert_eq!(values.len(), self.len());
        let mut out = vec![fill; self.w * self.h];
        for (&(x, y), &v) in self.pixels.iter().zip(values) {
            out[y * self.w + x] = v;
        }
        out
    }

    /// Gather per-pixel values from a dense row-major buffer.
    pub fn gather<T: Copy>(&self, dense: &[T]) -> Vec<T> {
        self.pixels
            .iter()
            .map(|&(x, y)| dense[y * self.w + x])
            .collect()
    }
}
