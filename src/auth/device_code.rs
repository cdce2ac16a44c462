// src/auth/device_code.rs
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use crossbeam_channel::Sender;
use serde::Deserialize;
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{AccessToken, Account, AuthError, AuthProvider, ANALYSIS_SCOPE, LOGIN_SCOPES};

/// Seconds of validity a cached token must still have to be reused.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// What the user has to do to finish a device-code sign-in. Handed to the
/// shell over a channel so the login view can display it while the provider
/// keeps polling in the background.
#[derive(Debug, Clone)]
pub struct DeviceCodePrompt {
    pub verification_uri: String,
    pub user_code: String,
    pub message: String,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn fresh(&self) -> bool {
        self.expires_at - Utc::now() > ChronoDuration::seconds(EXPIRY_MARGIN_SECS)
    }
}

#[derive(Default)]
struct SessionState {
    accounts: Vec<Account>,
    active: Option<usize>,
    access: Option<CachedToken>,
    refresh_token: Option<String>,
}

impl SessionState {
    /// Previously-set active account, else the first available one.
    fn resolve_account(&self) -> Option<&Account> {
        self.active
            .and_then(|idx| self.accounts.get(idx))
            .or_else(|| self.accounts.first())
    }
}

/// Identity provider client for real (non-mock) mode. Sign-in uses the
/// OAuth 2.0 device-authorization grant; silent acquisition redeems the
/// stored refresh token. Account and token state lives behind a lock so the
/// provider can be shared with worker threads.
pub struct DeviceCodeAuth {
    http: reqwest::Client,
    client_id: String,
    authority: String,
    prompt: Sender<DeviceCodePrompt>,
    state: RwLock<SessionState>,
}

#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    verification_uri: String,
    expires_in: u64,
    interval: Option<u64>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
    refresh_token: Option<String>,
    id_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderError {
    error: Option<String>,
    error_description: Option<String>,
}

impl ProviderError {
    fn message(&self, fallback: &str) -> String {
        self.error_description
            .clone()
            .or_else(|| self.error.clone())
            .unwrap_or_else(|| fallback.to_string())
    }
}

impl DeviceCodeAuth {
    pub fn new(client_id: String, authority: String, prompt: Sender<DeviceCodePrompt>) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id,
            authority,
            prompt,
            state: RwLock::new(SessionState::default()),
        }
    }

    fn device_code_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/devicecode", self.authority)
    }

    fn token_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.authority)
    }

    /// Scope string for sign-in: the documented login scopes plus the OpenID
    /// scopes needed for an id token and a refresh token.
    fn login_scope(&self) -> String {
        let mut scopes: Vec<&str> = LOGIN_SCOPES.to_vec();
        scopes.extend(["openid", "profile", "offline_access"]);
        scopes.join(" ")
    }

    async fn request_device_code(&self) -> Result<DeviceCodeResponse, AuthError> {
        let response = self
            .http
            .post(self.device_code_endpoint())
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("scope", &self.login_scope()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body: ProviderError = response.json().await.unwrap_or_default();
            return Err(AuthError::Provider(body.message(&format!(
                "device code request failed with status {status}"
            ))));
        }

        Ok(response
            .json::<DeviceCodeResponse>()
            .await
            .map_err(|e| AuthError::Malformed(e.to_string()))?)
    }

    async fn poll_for_token(&self, device: &DeviceCodeResponse) -> Result<TokenResponse, AuthError> {
        let deadline = Utc::now() + ChronoDuration::seconds(device.expires_in as i64);
        let mut interval = device.interval.unwrap_or(5);

        loop {
            if Utc::now() >= deadline {
                return Err(AuthError::LoginExpired);
            }

            let response = self
                .http
                .post(self.token_endpoint())
                .form(&[
                    ("client_id", self.client_id.as_str()),
                    ("grant_type", "urn:ietf:params:oauth:grant-type:device_code"),
                    ("device_code", device.device_code.as_str()),
                ])
                .send()
                .await?;

            if response.status().is_success() {
                return response
                    .json::<TokenResponse>()
                    .await
                    .map_err(|e| AuthError::Malformed(e.to_string()));
            }

            let status = response.status();
            let body: ProviderError = response.json().await.unwrap_or_default();
            match body.error.as_deref() {
                Some("authorization_pending") => {
                    debug!("sign-in pending, polling again in {interval}s");
                }
                Some("slow_down") => {
                    interval += 5;
                    debug!("provider asked to slow down, next poll in {interval}s");
                }
                Some("expired_token") => return Err(AuthError::LoginExpired),
                _ => {
                    return Err(AuthError::Provider(body.message(&format!(
                        "token request failed with status {status}"
                    ))))
                }
            }

            tokio::time::sleep(Duration::from_secs(interval)).await;
        }
    }

    async fn redeem_refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        let scope = format!("{ANALYSIS_SCOPE} offline_access");
        let response = self
            .http
            .post(self.token_endpoint())
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("scope", scope.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body: ProviderError = response.json().await.unwrap_or_default();
            return Err(AuthError::Provider(body.message(&format!(
                "token refresh failed with status {status}"
            ))));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| AuthError::Malformed(e.to_string()))
    }

    fn store_tokens(&self, token: &TokenResponse) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.access = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Utc::now() + ChronoDuration::seconds(token.expires_in as i64),
        });
        if token.refresh_token.is_some() {
            state.refresh_token = token.refresh_token.clone();
        }
    }

    #[cfg(test)]
    fn seed_session(&self, account: Account, refresh_token: Option<String>) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.accounts = vec![account];
        state.active = Some(0);
        state.refresh_token = refresh_token;
        state.access = None;
    }
}

#[async_trait::async_trait]
impl AuthProvider for DeviceCodeAuth {
    fn is_authenticated(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .resolve_account()
            .is_some()
    }

    fn current_identity(&self) -> Option<Account> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .resolve_account()
            .cloned()
    }

    async fn acquire_token(&self) -> Result<AccessToken, AuthError> {
        let refresh_token = {
            let state = self.state.read().unwrap_or_else(|e| e.into_inner());
            if state.resolve_account().is_none() {
                return Err(AuthError::NoActiveAccount);
            }
            if let Some(cached) = state.access.as_ref().filter(|t| t.fresh()) {
                debug!("reusing cached access token");
                return Ok(AccessToken::bearer(cached.value.clone()));
            }
            state
                .refresh_token
                .clone()
                .ok_or(AuthError::InteractionRequired)?
        };

        let token = self.redeem_refresh_token(&refresh_token).await?;
        self.store_tokens(&token);
        Ok(AccessToken::bearer(token.access_token))
    }

    async fn login(&self) -> Result<Account, AuthError> {
        let device = self.request_device_code().await?;

        let prompt = DeviceCodePrompt {
            verification_uri: device.verification_uri.clone(),
            user_code: device.user_code.clone(),
            message: device.message.clone().unwrap_or_else(|| {
                format!(
                    "To sign in, visit {} and enter the code {}.",
                    device.verification_uri, device.user_code
                )
            }),
        };
        info!("device sign-in started, code {}", prompt.user_code);
        // The shell may have gone away; the poll loop below still resolves.
        let _ = self.prompt.send(prompt);

        let token = self.poll_for_token(&device).await?;
        let account = account_from_id_token(token.id_token.as_deref(), &self.authority);

        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            state.accounts = vec![account.clone()];
            state.active = Some(0);
        }
        self.store_tokens(&token);
        info!("signed in as {}", account.display_name());
        Ok(account)
    }

    fn logout(&self) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        *state = SessionState::default();
        info!("signed out, local session cleared");
    }
}

#[derive(Debug, Default, Deserialize)]
struct IdTokenClaims {
    #[serde(default)]
    oid: String,
    #[serde(default)]
    tid: String,
    #[serde(default)]
    preferred_username: String,
    #[serde(default)]
    name: String,
}

/// Builds the signed-in account from the id token's claims. The token is
/// only decoded for display fields, never validated; the analysis API does
/// its own validation of the access token.
fn account_from_id_token(id_token: Option<&str>, authority: &str) -> Account {
    let claims = id_token
        .and_then(decode_claims)
        .unwrap_or_else(|| {
            warn!("sign-in response carried no usable id token");
            IdTokenClaims::default()
        });

    let environment = reqwest::Url::parse(authority)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_default();

    Account {
        home_account_id: format!("{}.{}", claims.oid, claims.tid),
        environment,
        tenant_id: claims.tid,
        username: claims.preferred_username,
        local_account_id: claims.oid,
        name: claims.name,
    }
}

fn decode_claims(id_token: &str) -> Option<IdTokenClaims> {
    let payload = id_token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    serde_json::from_slice(&bytes).ok()
}
