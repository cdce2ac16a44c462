// src/auth/mod.rs
use async_trait::async_trait;
use std::sync::RwLock;
use thiserror::Error;

pub mod device_code;

pub use device_code::DeviceCodeAuth;

/// Scope requested for the analysis API token.
pub const ANALYSIS_SCOPE: &str = "api://document-analyzer/DocumentAnalysis.Read";

/// Scopes requested at interactive sign-in.
pub const LOGIN_SCOPES: [&str; 2] = ["User.Read", ANALYSIS_SCOPE];

pub const MOCK_TOKEN: &str = "mock_token";

/// A signed-in identity. The rest of the application only reads
/// `name`/`username`; the remaining fields belong to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub home_account_id: String,
    pub environment: String,
    pub tenant_id: String,
    pub username: String,
    pub local_account_id: String,
    pub name: String,
}

impl Account {
    /// Preferred display name for the header.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.username
        } else {
            &self.name
        }
    }
}

/// An acquired token. `mock` tokens are never sent as an Authorization
/// header.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: String,
    pub mock: bool,
}

impl AccessToken {
    pub fn mock() -> Self {
        Self {
            value: MOCK_TOKEN.to_string(),
            mock: true,
        }
    }

    pub fn bearer(value: String) -> Self {
        Self { value, mock: false }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No active account found. Please ensure you are properly logged in.")]
    NoActiveAccount,
    /// Error text supplied by the identity provider itself.
    #[error("{0}")]
    Provider(String),
    #[error("identity request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("malformed identity response: {0}")]
    Malformed(String),
    #[error("sign-in was not completed before the device code expired")]
    LoginExpired,
    #[error("sign-in required before a token can be acquired silently")]
    InteractionRequired,
}

/// The one seam between the application and the identity provider. Selected
/// once at startup; no other component consults the mock flag.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    fn is_authenticated(&self) -> bool;

    fn current_identity(&self) -> Option<Account>;

    /// Silent token acquisition for [`ANALYSIS_SCOPE`].
    async fn acquire_token(&self) -> Result<AccessToken, AuthError>;

    /// Interactive sign-in. Implementations that need user interaction
    /// surface it through their own side channel (see [`DeviceCodeAuth`]).
    async fn login(&self) -> Result<Account, AuthError>;

    /// Drops local session state. Never contacts the network.
    fn logout(&self);
}

fn mock_account() -> Account {
    Account {
        home_account_id: "mock-home-id".to_string(),
        environment: "mock-env".to_string(),
        tenant_id: "mock-tenant-id".to_string(),
        username: "mockuser@example.com".to_string(),
        local_account_id: "mock-local-id".to_string(),
        name: "Mock User".to_string(),
    }
}

/// Development-mode provider: a fixed fabricated identity, no network
/// activity anywhere. Starts signed in, mirroring the mock account being
/// activated at startup.
pub struct MockAuth {
    signed_in: RwLock<bool>,
}

impl MockAuth {
    pub fn new() -> Self {
        Self {
            signed_in: RwLock::new(true),
        }
    }
}

impl Default for MockAuth {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthProvider for MockAuth {
    fn is_authenticated(&self) -> bool {
        *self.signed_in.read().unwrap_or_else(|e| e.into_inner())
    }

    fn current_identity(&self) -> Option<Account> {
        self.is_authenticated().then(mock_account)
    }

    async fn acquire_token(&self) -> Result<AccessToken, AuthError> {
        Ok(AccessToken::mock())
    }

    async fn login(&self) -> Result<Account, AuthError> {
        *self.signed_in.write().unwrap_or_else(|e| e.into_inner()) = true;
        Ok(mock_account())
    }

    fn logout(&self) {
        *self.signed_in.write().unwrap_or_else(|e| e.into_inner()) = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_provider_fabricates_fixed_identity() {
        let auth = MockAuth::new();
        assert!(auth.is_authenticated());

        let identity = auth.current_identity().expect("signed in");
        assert_eq!(identity.username, "mockuser@example.com");
        assert_eq!(identity.name, "Mock User");
        assert_eq!(identity.tenant_id, "mock-tenant-id");

        let token = auth.acquire_token().await.expect("mock token");
        assert!(token.mock);
        assert_eq!(token.value, MOCK_TOKEN);
    }

    #[tokio::test]
    async fn mock_logout_clears_local_state_only() {
        let auth = MockAuth::new();
        auth.logout();
        assert!(!auth.is_authenticated());
        assert!(auth.current_identity().is_none());

        auth.login().await.expect("mock login");
        assert!(auth.is_authenticated());
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let mut account = mock_account();
        assert_eq!(account.display_name(), "Mock User");
        account.name.clear();
        assert_eq!(account.display_name(), "mockuser@example.com");
    }
}
