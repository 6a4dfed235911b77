#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for the image module.
pub mod error;

/// Dense image container.
pub mod image;

/// First order spatial derivatives.
pub mod gradient;

/// Sub-pixel sampling of images and their derivatives.
pub mod interpolation;

pub use crate::error::ImageError;
pub use crate::gradient::spatial_gradient_float;
pub use crate::image::{Image, ImageSize};
pub use crate::interpolation::{bilinear_interpolation, GradientImage, Sample};
