use std::sync::Arc;

use poem::Request;
use poem_openapi::{payload::Json, OpenApi, Tags};

use crate::api::helpers;
use crate::coordinators::{AuthGateway, UserCoordinator};
use crate::errors::AuthError;
use crate::types::dto::auth::{
    ChangePasswordRequest, LoginRequest, LoginResponse, MeResponse, MessageResponse,
    ProfileUpdateRequest, RefreshRequest, RefreshResponse,
};
use crate::types::internal::auth::IssuedToken;

/// Authentication API endpoints
pub struct AuthApi {
    gateway: Arc<AuthGateway>,
    users: Arc<UserCoordinator>,
    expose_detail: bool,
}

impl AuthApi {
    pub fn new(gateway: Arc<AuthGateway>, users: Arc<UserCoordinator>, expose_detail: bool) -> Self {
        Self {
            gateway,
            users,
            expose_detail,
        }
    }

    fn error(&self, err: crate::errors::InternalError) -> AuthError {
        AuthError::from_internal_error(err, self.expose_detail)
    }
}

fn expires_in(token: &IssuedToken) -> i64 {
    token.expires_at - token.issued_at
}

/// API tags for authentication endpoints
#[derive(Tags)]
enum AuthTags {
    /// Authentication endpoints
    Authentication,
}

#[OpenApi(prefix_path = "/auth")]
impl AuthApi {
    /// Login with username and password to receive authentication tokens
    #[oai(path = "/login", method = "post", tag = "AuthTags::Authentication")]
    async fn login(
        &self,
        req: &Request,
        body: Json<LoginRequest>,
    ) -> Result<Json<LoginResponse>, AuthError> {
        let outcome = self
            .gateway
            .login(&body.username, &body.password, &helpers::client_meta(req))
            .await
            .map_err(|e| self.error(e))?;

        Ok(Json(LoginResponse {
            expires_in: expires_in(&outcome.access),
            access_token: outcome.access.token,
            refresh_token: outcome.refresh.token,
            token_type: "Bearer".to_string(),
            user: outcome.user.into(),
        }))
    }

    /// Exchange a refresh token for a new access token
    #[oai(path = "/refresh", method = "post", tag = "AuthTags::Authentication")]
    async fn refresh(
        &self,
        req: &Request,
        body: Json<RefreshRequest>,
    ) -> Result<Json<RefreshResponse>, AuthError> {
        let access = self
            .gateway
            .refresh(&body.refresh_token, &helpers::client_meta(req))
            .await
            .map_err(|e| self.error(e))?;

        Ok(Json(RefreshResponse {
            expires_in: expires_in(&access),
            access_token: access.token,
            token_type: "Bearer".to_string(),
        }))
    }

    /// Revoke a refresh token. Repeating the call is harmless.
    #[oai(path = "/logout", method = "post", tag = "AuthTags::Authentication")]
    async fn logout(
        &self,
        req: &Request,
        body: Json<RefreshRequest>,
    ) -> Result<Json<MessageResponse>, AuthError> {
        self.gateway
            .logout(&body.refresh_token, &helpers::client_meta(req))
            .await
            .map_err(|e| self.error(e))?;

        Ok(Json(MessageResponse::new("Logged out successfully")))
    }

    /// Change the caller's password; every refresh token they hold is revoked
    #[oai(path = "/change-password", method = "post", tag = "AuthTags::Authentication")]
    async fn change_password(
        &self,
        req: &Request,
        body: Json<ChangePasswordRequest>,
    ) -> Result<Json<MessageResponse>, AuthError> {
        let claims = helpers::authenticate(req, self.gateway.tokens())?;

        self.gateway
            .change_password(
                &claims.sub,
                &body.current_password,
                &body.new_password,
                &helpers::client_meta(req),
            )
            .await
            .map_err(|e| self.error(e))?;

        Ok(Json(MessageResponse::new(
            "Password changed; all sessions have been signed out",
        )))
    }

    /// Current user's username, permissions and profile
    #[oai(path = "/me", method = "get", tag = "AuthTags::Authentication")]
    async fn me(&self, req: &Request) -> Result<Json<MeResponse>, AuthError> {
        let claims = helpers::authenticate(req, self.gateway.tokens())?;
        let user = self.users.me(&claims).await.map_err(|e| self.error(e))?;
        Ok(Json(user.into()))
    }

    /// Replace the current user's profile
    #[oai(path = "/me/profile", method = "put", tag = "AuthTags::Authentication")]
    async fn update_profile(
        &self,
        req: &Request,
        body: Json<ProfileUpdateRequest>,
    ) -> Result<Json<MeResponse>, AuthError> {
        let claims = helpers::authenticate(req, self.gateway.tokens())?;
        let user = self
            .users
            .update_profile(&claims, body.0.profile, &helpers::client_meta(req))
            .await
            .map_err(|e| self.error(e))?;
        Ok(Json(user.into()))
    }
}
