// Request/response models exposed over the HTTP API
pub mod admin;
pub mod auth;
pub mod common;
