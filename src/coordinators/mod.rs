// Coordinators layer - Workflow orchestration
//
// Coordinators compose store, token and audit operations for specific API
// endpoints. Business rules live in the stores and services they call.

pub mod admin_coordinator;
pub mod auth_gateway;
pub mod user_coordinator;

pub use admin_coordinator::{AdminCoordinator, UserPage};
pub use auth_gateway::{AuthGateway, DefaultAdmin, LoginOutcome};
pub use user_coordinator::UserCoordinator;
