//! Row access shared by the raster containers.

pub trait ImageView {
    type Pixel: Copy;

    fn width(&self) -> usize;
    fn height(&self) -> usize;

    /// Row `y`, exactly `width()` pixels.
    fn row(&self, y: usize) -> &[Self::Pixel];

    fn rows(&self) -> Rows<'_, Self>
    where
        Self: Sized,
    {
        Rows { image: self, y: 0 }
    }

    /// `(width, height)` pair.
    fn dims(&self) -> (usize, usize) {
        (self.width(), self.height())
    }

    /// Whether `other` covers the same pixel grid.
    fn same_shape<O: ImageView + ?Sized>(&self, other: &O) -> bool {
        self.dims() == other.dims()
    }
}

pub struct Rows<'a, I: ?Sized + ImageView> {
    image: &'a I,
    y: usize,
}

impl<'a, I: ImageView> Iterator for Rows<'a, I> {
    type Item = &'a [I::Pixel];

    fn next(&mut self) -> Option<Self::Item> {
        if self.y >= self.image.height() {
            return None;
        }
        let y = self.y;
        self.y += 1;
        Some(self.image.row(y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{ImageF64, Mask};

    #[test]
    fn rows_walk_top_to_bottom() {
        let map = ImageF64::from_fn(3, 2, |x, y| (y * 10 + x) as f64);
        let rows: Vec<&[f64]> = map.rows().collect();
        assert_eq!(rows, vec![&[0.0, 1.0, 2.0][..], &[10.0, 11.0, 12.0][..]]);
        assert!(map.same_shape(&Mask::full(3, 2)));
        assert!(!map.same_shape(&Mask::full(2, 3)));
    }
}
