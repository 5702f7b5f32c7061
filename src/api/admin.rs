use std::sync::Arc;

use poem::Request;
use poem_openapi::param::{Path, Query};
use poem_openapi::{payload::Json, OpenApi, Tags};

use crate::api::helpers;
use crate::coordinators::AdminCoordinator;
use crate::errors::{AuthError, InternalError};
use crate::services::TokenService;
use crate::types::dto::admin::{
    CreateUserRequest, DeleteUserResponse, PermissionsRequest, UserListResponse,
};
use crate::types::dto::auth::UserDto;
use crate::types::internal::permission::PermissionSet;
use crate::types::internal::user::NewUser;

const DEFAULT_PAGE_SIZE: u64 = 20;

/// User administration endpoints; every route requires the `admin` permission
pub struct AdminApi {
    admin: Arc<AdminCoordinator>,
    tokens: Arc<TokenService>,
    expose_detail: bool,
}

impl AdminApi {
    pub fn new(admin: Arc<AdminCoordinator>, tokens: Arc<TokenService>, expose_detail: bool) -> Self {
        Self {
            admin,
            tokens,
            expose_detail,
        }
    }

    fn error(&self, err: InternalError) -> AuthError {
        AuthError::from_internal_error(err, self.expose_detail)
    }
}

/// API tags for admin endpoints
#[derive(Tags)]
enum AdminTags {
    /// User administration
    Admin,
}

#[OpenApi(prefix_path = "/auth")]
impl AdminApi {
    /// Paginated list of users
    #[oai(path = "/users", method = "get", tag = "AdminTags::Admin")]
    async fn list_users(
        &self,
        req: &Request,
        limit: Query<Option<u64>>,
        offset: Query<Option<u64>>,
    ) -> Result<Json<UserListResponse>, AuthError> {
        let claims = helpers::authenticate(req, &self.tokens)?;

        let page = self
            .admin
            .list_users(&claims, limit.0.unwrap_or(DEFAULT_PAGE_SIZE), offset.0.unwrap_or(0))
            .await
            .map_err(|e| self.error(e))?;

        Ok(Json(UserListResponse {
            users: page.users.into_iter().map(UserDto::from).collect(),
            total: page.total,
            limit: page.limit,
            offset: page.offset,
        }))
    }

    /// Create a user
    #[oai(path = "/users", method = "post", tag = "AdminTags::Admin")]
    async fn create_user(
        &self,
        req: &Request,
        body: Json<CreateUserRequest>,
    ) -> Result<Json<UserDto>, AuthError> {
        let claims = helpers::authenticate(req, &self.tokens)?;
        let body = body.0;

        let mut new_user = NewUser::new(body.username, body.password);
        if let Some(email) = body.email {
            new_user = new_user.with_email(email);
        }
        if let Some(permissions) = body.permissions {
            new_user = new_user.with_permissions(PermissionSet::new(permissions));
        }
        if let Some(profile) = body.profile {
            new_user = new_user.with_profile(profile);
        }

        let user = self
            .admin
            .create_user(&claims, new_user, &helpers::client_meta(req))
            .await
            .map_err(|e| self.error(e))?;

        Ok(Json(user.into()))
    }

    /// Permanently delete a user together with their tokens, sessions and audit rows
    #[oai(path = "/users/:id", method = "delete", tag = "AdminTags::Admin")]
    async fn delete_user(
        &self,
        req: &Request,
        id: Path<String>,
    ) -> Result<Json<DeleteUserResponse>, AuthError> {
        let claims = helpers::authenticate(req, &self.tokens)?;

        self.admin
            .delete_user(&claims, &id.0, &helpers::client_meta(req))
            .await
            .map_err(|e| self.error(e))?;

        Ok(Json(DeleteUserResponse {
            message: "User deleted".to_string(),
            user_id: id.0,
        }))
    }

    /// Deactivate a user and revoke their sessions, keeping the record
    #[oai(path = "/users/:id/deactivate", method = "post", tag = "AdminTags::Admin")]
    async fn deactivate_user(
        &self,
        req: &Request,
        id: Path<String>,
    ) -> Result<Json<UserDto>, AuthError> {
        let claims = helpers::authenticate(req, &self.tokens)?;

        let user = self
            .admin
            .deactivate_user(&claims, &id.0, &helpers::client_meta(req))
            .await
            .map_err(|e| self.error(e))?;

        Ok(Json(user.into()))
    }

    /// Replace a user's permissions. Takes effect on their next refresh.
    #[oai(path = "/users/:id/permissions", method = "put", tag = "AdminTags::Admin")]
    async fn update_permissions(
        &self,
        req: &Request,
        id: Path<String>,
        body: Json<PermissionsRequest>,
    ) -> Result<Json<UserDto>, AuthError> {
        let claims = helpers::authenticate(req, &self.tokens)?;

        let user = self
            .admin
            .update_permissions(
                &claims,
                &id.0,
                PermissionSet::new(body.0.permissions),
                &helpers::client_meta(req),
            )
            .await
            .map_err(|e| self.error(e))?;

        Ok(Json(user.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::CredentialStore;
    use crate::test::utils::{setup_relational_store, test_token_service};
    use crate::types::internal::permission::Permission;
    use crate::types::internal::user::User;

    struct Fixture {
        api: AdminApi,
        store: Arc<dyn CredentialStore>,
        admin: User,
        tokens: Arc<TokenService>,
    }

    async fn setup() -> Fixture {
        let store: Arc<dyn CredentialStore> = Arc::new(setup_relational_store().await);
        let admin = store
            .create_user(NewUser::new("admin", "adminpass").with_permissions(PermissionSet::all()))
            .await
            .unwrap();
        let tokens = test_token_service();
        let api = AdminApi::new(
            Arc::new(AdminCoordinator::new(store.clone())),
            tokens.clone(),
            false,
        );
        Fixture {
            api,
            store,
            admin,
            tokens,
        }
    }

    fn bearer_for(tokens: &TokenService, user: &User) -> Request {
        let access = tokens.issue_access(user).unwrap();
        Request::builder()
            .header("Authorization", format!("Bearer {}", access.token))
            .finish()
    }

    #[tokio::test]
    async fn test_list_users_requires_admin() {
        let f = setup().await;
        let reader = f.store.create_user(NewUser::new("reader", "pw")).await.unwrap();

        let err = f
            .api
            .list_users(&bearer_for(&f.tokens, &reader), Query(None), Query(None))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::InsufficientPermission(_)));
        assert_eq!(err.status_code(), 403);
    }

    #[tokio::test]
    async fn test_list_users_as_admin() {
        let f = setup().await;
        f.store.create_user(NewUser::new("bob", "pw")).await.unwrap();

        let page = f
            .api
            .list_users(&bearer_for(&f.tokens, &f.admin), Query(Some(10)), Query(None))
            .await
            .unwrap();

        assert_eq!(page.total, 2);
        assert_eq!(page.users.len(), 2);
        assert_eq!(page.limit, 10);
    }

    #[tokio::test]
    async fn test_create_duplicate_user_is_conflict() {
        let f = setup().await;
        let request = || {
            Json(CreateUserRequest {
                username: "carol".to_string(),
                password: "pw".to_string(),
                email: None,
                permissions: Some(vec![Permission::Read, Permission::Write]),
                profile: None,
            })
        };

        let created = f
            .api
            .create_user(&bearer_for(&f.tokens, &f.admin), request())
            .await
            .unwrap();
        assert_eq!(created.permissions, vec![Permission::Read, Permission::Write]);

        let err = f
            .api
            .create_user(&bearer_for(&f.tokens, &f.admin), request())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateUser(_)));
    }

    #[tokio::test]
    async fn test_delete_user_and_self_deletion() {
        let f = setup().await;
        let bob = f.store.create_user(NewUser::new("bob", "pw")).await.unwrap();

        let deleted = f
            .api
            .delete_user(&bearer_for(&f.tokens, &f.admin), Path(bob.id.clone()))
            .await
            .unwrap();
        assert_eq!(deleted.user_id, bob.id);

        let again = f
            .api
            .delete_user(&bearer_for(&f.tokens, &f.admin), Path(bob.id.clone()))
            .await
            .unwrap_err();
        assert!(matches!(again, AuthError::UserNotFound(_)));

        let own = f
            .api
            .delete_user(&bearer_for(&f.tokens, &f.admin), Path(f.admin.id.clone()))
            .await
            .unwrap_err();
        assert_eq!(own.status_code(), 400);
        assert_eq!(own.code(), "self_deletion");
    }
}
