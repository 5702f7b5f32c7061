use poem_openapi::Object;

/// Response model for health check endpoint
#[derive(Object, Debug)]
pub struct HealthResponse {
    /// "healthy" or "degraded"
    pub status: String,

    /// Active credential backend ("relational" or "file")
    pub backend: String,

    /// Whether refresh-token revocation is enforced by the active backend
    pub revocation_supported: bool,

    /// Timestamp of the health check (ISO 8601 format)
    pub timestamp: String,
}

/// Standardized error response model
#[derive(Object, Debug, Clone)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code
    pub status_code: u16,

    /// Raw backend detail, only present when debug detail is enabled
    #[oai(skip_serializing_if_is_none)]
    pub detail: Option<String>,
}
