//! Boolean validity mask defining the integration domain.
use super::traits::ImageView;
use crate::error::{IntegrationError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    pub w: usize,
    pub h: usize,
    pub data: Vec<bool>,
}

impl Mask {
    /// Wrap row-major validity flags; `data.len()` must equal `w * h`.
    pub fn new(w: usize, h: usize, data: Vec<bool>) -> Result<Self> {
        if data.len() != w * h {
            return Err(IntegrationError::invalid(format!(
                "mask buffer holds {} values, expected {}x{}={}",
                data.len(),
                w,
                h,
                w * h
            )));
        }
        Ok(Self { w, h, data })
    }

    /// Mask where every pixel is valid.
    pub fn full(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            data: vec![true; w * h],
        }
    }

    pub fn from_fn(w: usize, h: usize, mut f: impl FnMut(usize, usize) -> bool) -> Self {
        let mut data = Vec::with_capacity(w * h);
        for y in 0..h {
            for x in 0..w {
                data.push(f(x, y));
            }
        }
        Self { w, h, data }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.data[y * self.w + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, valid: bool) {
        self.data[y * self.w + x] = valid;
    }

    /// Number of valid pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }
}

impl ImageView for Mask {
    type Pixel = bool;

    #[inline]
    fn width(&self) -> usize {
        self.w
    }
    #[inline]
    fn height(&self) -> usize {
        self.h
    }
    #[inline]
    fn row(&self, y: usize) -> &[bool] {
        let start = y * self.w;
        &self.data[start..start + self.w]
    }
}
