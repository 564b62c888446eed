//! User domain entities.

pub mod model;
pub mod role;
pub mod token;

pub use model::{CreateUser, UpdateProfile, User};
pub use role::UserRole;
pub use token::{EmailHistory, EmailToken, PasswordResetToken};
