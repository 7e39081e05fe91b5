//! Image decoding: pure Rust, statically linked.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Standard decode** | `image::ImageReader` |
//! | **RAW decode** | embedded JPEG preview, `rawloader` fallback |
//! | **Orientation** | `kamadak-exif` + `DynamicImage` flips/rotations |
//! | **Downscale** | `thumbnail_exact` to a width bound |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Decoded**: [`DecodedImage`], the normalized RGBA bitmap
//! - **Orientation**: EXIF orientation codes and transforms
//! - **Raw**: RAW container handling
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
mod calculations;
pub mod decoded;
pub mod orientation;
mod raw;
pub mod rust_backend;

pub use backend::{DecodeError, ImageBackend};
pub use calculations::calculate_scaled_dimensions;
pub use decoded::{DecodedImage, ImageSource};
pub use orientation::Orientation;
pub use rust_backend::RustBackend;
