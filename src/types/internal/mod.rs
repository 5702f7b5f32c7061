// Internal types - never exposed over the API directly
pub mod audit;
pub mod auth;
pub mod context;
pub mod permission;
pub mod user;
