use std::net::IpAddr;

use poem::Request;
use serde::Deserialize;

use crate::coordinators::UserCoordinator;
use crate::errors::AuthError;
use crate::services::TokenService;
use crate::types::internal::auth::{Claims, TokenType};
use crate::types::internal::context::ClientMeta;

/// Session kind recorded for connections authorized at upgrade time
pub const UPGRADE_SESSION_KIND: &str = "websocket";

/// Extract IP address from request headers
///
/// Checks X-Forwarded-For, X-Real-IP, and falls back to remote address.
pub fn extract_ip_address(req: &Request) -> Option<String> {
    // Check X-Forwarded-For header (proxy/load balancer)
    if let Some(forwarded) = req.header("X-Forwarded-For") {
        if let Some(ip) = forwarded.split(',').next() {
            return ip.trim().parse::<IpAddr>().ok().map(|ip| ip.to_string());
        }
    }

    // Check X-Real-IP header (nginx)
    if let Some(real_ip) = req.header("X-Real-IP") {
        return real_ip.trim().parse::<IpAddr>().ok().map(|ip| ip.to_string());
    }

    req.remote_addr()
        .as_socket_addr()
        .map(|addr| addr.ip().to_string())
}

/// Client metadata carried into refresh-token rows, sessions and audit events
pub fn client_meta(req: &Request) -> ClientMeta {
    ClientMeta::new(
        extract_ip_address(req),
        req.header("User-Agent").map(str::to_string),
    )
}

/// Verify the bearer access token of a protected request.
///
/// Only signature, expiry and token type are checked; the store is never
/// consulted.
pub fn authenticate(req: &Request, tokens: &TokenService) -> Result<Claims, AuthError> {
    let header = req.header("Authorization").ok_or_else(AuthError::missing_token)?;
    let token = TokenService::extract_bearer(Some(header)).ok_or_else(AuthError::invalid_token)?;

    tokens
        .verify(token, TokenType::Access)
        .map_err(|rejection| AuthError::from_token_rejection(&rejection))
}

#[derive(Deserialize)]
struct UpgradeQuery {
    token: Option<String>,
}

/// Token offered on a connection upgrade: `?token=` first, then the bearer header
pub fn upgrade_token(req: &Request) -> Option<String> {
    if let Ok(UpgradeQuery { token: Some(token) }) = req.params::<UpgradeQuery>() {
        if !token.is_empty() {
            return Some(token);
        }
    }

    TokenService::extract_bearer(req.header("Authorization")).map(str::to_string)
}

/// Authorize a long-lived connection once, at upgrade time, and record the session.
///
/// Later frames on the connection are not re-checked.
pub async fn authorize_upgrade(
    req: &Request,
    tokens: &TokenService,
    users: &UserCoordinator,
    expose_detail: bool,
) -> Result<Claims, AuthError> {
    let token = upgrade_token(req).ok_or_else(AuthError::missing_token)?;
    let claims = tokens
        .verify(&token, TokenType::Access)
        .map_err(|rejection| AuthError::from_token_rejection(&rejection))?;

    users
        .start_session(&claims, UPGRADE_SESSION_KIND, &client_meta(req))
        .await
        .map_err(|e| AuthError::from_internal_error(e, expose_detail))?;

    Ok(claims)
}
