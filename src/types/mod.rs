// Types layer - All data structures
pub mod db;
pub mod dto;
pub mod internal;

pub use internal::audit::{AuditEvent, EventType};
pub use internal::auth::{Claims, IssuedToken, TokenRejection, TokenType};
pub use internal::context::ClientMeta;
pub use internal::permission::{Permission, PermissionSet};
pub use internal::user::{NewUser, RefreshSession, User};
