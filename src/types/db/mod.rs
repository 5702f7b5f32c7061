// Database entities - SeaORM models
pub mod audit_event;
pub mod refresh_token;
pub mod user;
pub mod user_session;
