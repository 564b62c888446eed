//! # homecloud-auth
//!
//! Authentication primitives for HomeCloud.
//!
//! ## Modules
//!
//! - `password`: Argon2id password hashing and strength policy
//! - `jwt`: bearer access token creation and validation
//! - `token`: random one-shot tokens for email validation and password reset

pub mod jwt;
pub mod password;
pub mod token;

pub use jwt::{Claims, JwtDecoder, JwtEncoder};
pub use password::{PasswordHasher, PasswordValidator};
pub use token::TokenGenerator;
