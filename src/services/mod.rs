pub mod crypto;
pub mod permission_guard;
pub mod token_service;

pub use crypto::PasswordService;
pub use permission_guard::PermissionGuard;
pub use token_service::TokenService;
