//! PostgreSQL implementations of the store traits.

pub mod cloud;
pub mod token;
pub mod user;

pub use cloud::CloudRepository;
pub use token::TokenRepository;
pub use user::UserRepository;

/// Name of the unique constraint or index a failed statement violated.
pub(crate) fn violated_constraint(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => db_err.constraint(),
        _ => None,
    }
}
