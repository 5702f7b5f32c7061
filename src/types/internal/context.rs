/// Client metadata captured at the HTTP edge and carried into stores
/// for refresh-token rows, session records and audit events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientMeta {
    pub fn new(ip_address: Option<String>, user_agent: Option<String>) -> Self {
        Self { ip_address, user_agent }
    }

    /// Metadata for calls that do not originate from a client (CLI, startup)
    pub fn internal() -> Self {
        Self {
            ip_address: None,
            user_agent: Some("internal".to_string()),
        }
    }
}
