// API-facing error types
pub mod auth;

pub use auth::AuthError;

#[cfg(test)]
mod auth_test;
