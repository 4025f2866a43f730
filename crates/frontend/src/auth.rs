/// Bearer token + tenant identifier for all dashboard API requests.
///
/// Token issuance and session management live elsewhere; this client only
/// reads the credentials the login flow left in browser storage and turns
/// them into request headers.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthContext {
    pub token: String,
    pub tenant_id: String,
}

const TOKEN_KEY: &str = "retailscope.token";
const TENANT_KEY: &str = "retailscope.tenant";

impl AuthContext {
    pub fn new(token: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            tenant_id: tenant_id.into(),
        }
    }

    /// Read credentials from local storage, if the login flow stored any.
    pub fn from_storage() -> Option<Self> {
        let storage = web_sys::window()?.local_storage().ok()??;
        let token = storage.get_item(TOKEN_KEY).ok()??;
        let tenant_id = storage.get_item(TENANT_KEY).ok()??;
        Some(Self { token, tenant_id })
    }

    /// Storage credentials, or the demo tenant when none are present.
    pub fn load() -> Self {
        Self::from_storage().unwrap_or_else(|| Self::new("demo-token", "demo"))
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_header_value() {
        let auth = AuthContext::new("abc123", "tenant-1");
        assert_eq!(auth.bearer(), "Bearer abc123");
    }
}
