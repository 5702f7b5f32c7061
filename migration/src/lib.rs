pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_auth_schema;
mod m20250301_000002_create_audit_schema;

/// Provisions every table the relational credential store needs.
///
/// Audit events live in the same database as users so that a hard delete
/// can remove a user's audit trail inside one transaction.
pub struct AuthMigrator;

#[async_trait::async_trait]
impl MigratorTrait for AuthMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_auth_schema::Migration),
            Box::new(m20250301_000002_create_audit_schema::Migration),
        ]
    }
}
