//! Account management: registration, email validation, password reset,
//! and avatars.

pub mod avatar;
pub mod service;

pub use avatar::{AvatarService, AvatarSize, AvatarUrls};
pub use service::{AccountService, RegisterInput};
