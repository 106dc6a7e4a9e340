//! Domain models with validation at construction
//!
//! User input is validated when a `NewUser` is built.
//! Invalid input returns ValidationError, not panic.

pub mod user;
pub mod validation;

pub use user::{CreateUserRequest, NewUser, User};
pub use validation::ValidationError;
