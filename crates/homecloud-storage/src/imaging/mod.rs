//! Image processing.

pub mod avatar;

pub use avatar::{AvatarRenditions, CropBox};
