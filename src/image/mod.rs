//! Raster containers used by the integrator.
//!
//! - [`Mask`]: boolean validity grid defining the pixel domain.
//! - [`NormalMap`]: per-pixel normal vectors in normal coordinates.
//! - [`ImageF64`]: scalar maps (depth, discontinuity weights) with NaN outside
//!   the mask.
//!
//! All buffers are row-major with `stride == width` and are addressed as
//! `(x, y)` = `(col, row)`.
pub mod f64;
pub mod io;
pub mod mask;
pub mod normal;
pub mod traits;

pub use self::f64::ImageF64;
pub use self::mask::Mask;
pub use self::normal::{camera_to_normal_coords, normal_to_camera, NormalMap};
pub use self::traits::{ImageView, Rows};
