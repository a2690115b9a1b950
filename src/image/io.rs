//! I/O helpers for normal maps, masks, intrinsics, weight maps and JSON.
//!
//! - `load_normal_map`: read an 8/16-bit RGB(A) image and rescale to [-1, 1].
//! - `load_mask`: read any image; non-zero luma marks a valid pixel.
//! - `load_intrinsics`: parse a 3×3 camera matrix from whitespace-separated text.
//! - `save_weight_map`: write an `ImageF64` in [0, 1] to a grayscale PNG.
//! - `write_json_file`: pretty-print a serializable value to disk.
use super::{ImageF64, ImageView, Mask, NormalMap};
use crate::error::{IntegrationError, Result};
use image::{ColorType, GrayImage, Luma};
use nalgebra::Matrix3;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Load a normal map, mapping each channel from `[0, max]` to `[-1, 1]`.
///
/// Channels keep their stored order (R → n0, G → n1, B → n2). Alpha is dropped.
pub fn load_normal_map(path: &Path) -> Result<NormalMap> {
    let img = image::open(path).map_err(|source| IntegrationError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    let w = img.width() as usize;
    let h = img.height() as usize;
    let data: Vec<[f64; 3]> = match img.color() {
        ColorType::L16 | ColorType::La16 | ColorType::Rgb16 | ColorType::Rgba16 => img
            .to_rgb16()
            .pixels()
            .map(|p| rescale_channels(p.0.map(f64::from), 65535.0))
            .collect(),
        ColorType::Rgb32F | ColorType::Rgba32F => img
            .to_rgb32f()
            .pixels()
            .map(|p| rescale_channels(p.0.map(f64::from), 1.0))
            .collect(),
        _ => img
            .to_rgb8()
            .pixels()
            .map(|p| rescale_channels(p.0.map(f64::from), 255.0))
            .collect(),
    };
    NormalMap::new(w, h, data)
}

#[inline]
fn rescale_channels(v: [f64; 3], max: f64) -> [f64; 3] {
    v.map(|c| c / max * 2.0 - 1.0)
}

/// Load a validity mask; any non-zero gray value is valid.
pub fn load_mask(path: &Path) -> Result<Mask> {
    let img = image::open(path)
        .map_err(|source| IntegrationError::Image {
            path: path.to_path_buf(),
            source,
        })?
        .into_luma8();
    let w = img.width() as usize;
    let h = img.height() as usize;
    let data = img.into_raw().into_iter().map(|v| v != 0).collect();
    Mask::new(w, h, data)
}

/// Parse a 3×3 intrinsic matrix stored row-major as nine numbers.
pub fn load_intrinsics(path: &Path) -> Result<Matrix3<f64>> {
    let text = fs::read_to_string(path).map_err(|source| IntegrationError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_intrinsics(&text).map_err(|message| IntegrationError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

fn parse_intrinsics(text: &str) -> std::result::Result<Matrix3<f64>, String> {
    let values = text
        .split_whitespace()
        .map(|tok| {
            tok.parse::<f64>()
                .map_err(|e| format!("bad number {tok:?}: {e}"))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if values.len() != 9 {
        return Err(format!("expected 9 values, found {}", values.len()));
    }
    Ok(Matrix3::from_row_slice(&values))
}

/// Save a weight map to an 8-bit grayscale PNG.
///
/// Values are clamped to [0, 1]; undefined pixels are written white.
pub fn save_weight_map(map: &ImageF64, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let mut out = GrayImage::new(map.w as u32, map.h as u32);
    for (y, row) in map.rows().enumerate() {
        for (x, &px) in row.iter().enumerate() {
            let v = if px.is_nan() {
                255.0
            } else {
                (px * 255.0).clamp(0.0, 255.0)
            };
            out.put_pixel(x as u32, y as u32, Luma([v as u8]));
        }
    }
    out.save(path).map_err(|source| IntegrationError::Image {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value).map_err(|source| IntegrationError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(|source| IntegrationError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| IntegrationError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    #[test]
    fn intrinsics_text_parses_row_major() {
        let k = parse_intrinsics("500 0 32\n0 510 24\n0 0 1\n").unwrap();
        assert_eq!(k[(0, 0)], 500.0);
        assert_eq!(k[(0, 2)], 32.0);
        assert_eq!(k[(1, 1)], 510.0);
        assert_eq!(k[(2, 2)], 1.0);
    }

    #[test]
    fn intrinsics_text_rejects_wrong_count() {
        assert!(parse_intrinsics("1 0 0 0 1 0 0 0").is_err());
        assert!(parse_intrinsics("1 0 0 0 one 0 0 0 1").is_err());
    }

    #[test]
    fn normal_map_png_rescales_to_unit_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("normals.png");
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_fn(2, 1, |x, _| if x == 0 { Rgb([0, 255, 255]) } else { Rgb([255, 0, 0]) });
        img.save(&path).unwrap();

        let normals = load_normal_map(&path).unwrap();
        assert_eq!((normals.w, normals.h), (2, 1));
        assert_eq!(normals.get(0, 0), [-1.0, 1.0, 1.0]);
        assert_eq!(normals.get(1, 0), [1.0, -1.0, -1.0]);
    }

    #[test]
    fn weight_map_writes_white_outside_mask() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("w.png");
        let mut map = ImageF64::filled(2, 1, f64::NAN);
        map.set(0, 0, 0.0);
        save_weight_map(&map, &path).unwrap();

        let back = image::open(&path).unwrap().into_luma8();
        assert_eq!(back.get_pixel(0, 0)[0], 0);
        assert_eq!(back.get_pixel(1, 0)[0], 255);
    }
}
