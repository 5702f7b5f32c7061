use std::sync::Arc;

use chrono::Utc;
use poem_openapi::{payload::Json, OpenApi, Tags};

use crate::stores::CredentialStore;
use crate::types::dto::common::HealthResponse;

/// Health check API
pub struct HealthApi {
    store: Arc<dyn CredentialStore>,
}

impl HealthApi {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }
}

/// API tags for health endpoints
#[derive(Tags)]
enum ApiTags {
    /// Health check endpoints
    Health,
}

#[OpenApi]
impl HealthApi {
    /// Health check endpoint
    ///
    /// Reports the active credential backend and whether it answers. A store
    /// that fails its check reports "degraded" rather than an error status.
    #[oai(path = "/health", method = "get", tag = "ApiTags::Health")]
    async fn health(&self) -> Json<HealthResponse> {
        let status = match self.store.health_check().await {
            Ok(()) => "healthy",
            Err(e) => {
                tracing::warn!(error = %e, "Credential store health check failed");
                "degraded"
            }
        };

        Json(HealthResponse {
            status: status.to_string(),
            backend: self.store.backend().to_string(),
            revocation_supported: self.store.capabilities().revocation_supported,
            timestamp: Utc::now().to_rfc3339(),
        })
    }
}
