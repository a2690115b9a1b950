//! Sparse depth prior used to pin the global offset (orthographic) or scale
//! (perspective, via log-depth) that normals alone cannot observe.
use super::camera::Projection;
use super::indexing::PixelIndex;
use crate::error::{IntegrationError, Result};
use crate::image::{ImageF64, ImageView, Mask};

/// Prior depth values plus the subset of pixels where they apply.
#[derive(Clone, Debug)]
pub struct DepthPrior {
    pub depth: ImageF64,
    pub mask: Mask,
}

impl DepthPrior {
    pub fn new(depth: ImageF64, mask: Mask) -> Result<Self> {
        if !depth.same_shape(&mask) {
            return Err(IntegrationError::invalid(format!(
                "prior depth is {}x{} but prior mask is {}x{}",
                depth.w, depth.h, mask.w, mask.h
            )));
        }
        Ok(Self { depth, mask })
    }

    /// Prior defined at every pixel of `depth`.
    pub fn dense(depth: ImageF64) -> Self {
        let mask = Mask::full(depth.w, depth.h);
        Self { depth, mask }
    }
}

/// Prior restricted to the valid pixels, in solver units.
#[derive(Clone, Debug)]
pub(crate) struct PriorField {
    pub mask: Vec<bool>,
    /// Depth, or log-depth under perspective projection.
    pub target: Vec<f64>,
}

impl PriorField {
    pub fn build(prior: &DepthPrior, index: &PixelIndex, projection: &Projection) -> Result<Self> {
        let mask = index.gather(&prior.mask.data);
        let raw = index.gather(&prior.depth.data);
        let mut target = Vec::with_capacity(raw.len());
        for (i, (&active, &d)) in mask.iter().zip(&raw).enumerate() {
            if !active {
                target.push(0.0);
                continue;
            }
            let (x, y) = index.pixel(i);
            let value = match projection {
                Projection::Orthographic if d.is_finite() => d,
                Projection::Perspective(_) if d.is_finite() && d > 0.0 => d.ln(),
                _ => {
                    return Err(IntegrationError::invalid(format!(
                        "prior depth {d} at pixel ({x}, {y}) is not usable for {} projection",
                        projection.name()
                    )))
                }
            };
            target.push(value);
        }
        Ok(Self { mask, target })
    }

    /// Mean of `target - z` over prior pixels with a finite, non-zero residual.
    ///
    /// `None` when no prior pixel contributes.
    pub fn offset(&self, z: &[f64]) -> Option<f64> {
        let (sum, count) = self
            .mask
            .iter()
            .zip(&self.target)
            .zip(z)
            .filter(|((active, _), _)| **active)
            .map(|((_, t), zi)| t - zi)
            .filter(|r| r.is_finite() && *r != 0.0)
            .fold((0.0, 0usize), |(s, n), r| (s + r, n + 1));
        (count > 0).then(|| sum / count as f64)
    }

    pub fn active_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::camera::Intrinsics;
    use approx::assert_relative_eq;

    #[test]
    fn offset_averages_non_zero_residuals_only() {
        let field = PriorField {
            mask: vec![true, true, false, true],
            target: vec![2.0, 1.0, 100.0, 5.0],
        };
        // residuals: 1.0, 0.0 (dropped), masked, 3.0
        let offset = field.offset(&[1.0, 1.0, 0.0, 2.0]).unwrap();
        assert_relative_eq!(offset, 2.0);
        assert_eq!(field.offset(&[2.0, 1.0, 0.0, 5.0]), None);
    }

    #[test]
    fn perspective_prior_is_logarithmic_and_positive() {
        let mask = Mask::full(2, 1);
        let index = PixelIndex::build(&mask).unwrap();
        let cam = Projection::Perspective(Intrinsics::from_focal(10.0, 10.0, 0.0, 0.0).unwrap());

        let prior = DepthPrior::dense(ImageF64::from_fn(2, 1, |x, _| (x + 1) as f64));
        let field = PriorField::build(&prior, &index, &cam).unwrap();
        assert_relative_eq!(field.target[0], 0.0);
        assert_relative_eq!(field.target[1], 2f64.ln());

        let bad = DepthPrior::dense(ImageF64::from_fn(2, 1, |x, _| x as f64));
        assert!(PriorField::build(&bad, &index, &cam).is_err());
        assert!(PriorField::build(&bad, &index, &Projection::Orthographic).is_ok());
    }

    #[test]
    fn inactive_prior_pixels_may_hold_anything() {
        let index = PixelIndex::build(&Mask::full(2, 1)).unwrap();
        let prior = DepthPrior::new(
            ImageF64::from_fn(2, 1, |x, _| if x == 0 { f64::NAN } else { 3.0 }),
            Mask::from_fn(2, 1, |x, _| x == 1),
        )
        .unwrap();
        let field = PriorField::build(&prior, &index, &Projection::Orthographic).unwrap();
        assert_eq!(field.active_count(), 1);
        assert_eq!(field.target, vec![0.0, 3.0]);
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        assert!(DepthPrior::new(ImageF64::new(2, 2), Mask::full(2, 3)).is_err());
    }
}
