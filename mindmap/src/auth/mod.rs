//! Auth session manager.
//!
//! Owns the login flows (password and OAuth code exchange), logout, and the
//! answer to "is this client signed in?". State transitions:
//!
//! - `Anonymous --submit--> Authenticating`
//! - `Authenticating --token--> Authenticated` (credentials persisted)
//! - `Authenticating --rejected / no token--> AuthFailed` (store untouched)
//! - `Authenticated --logout + grace period--> Anonymous` (store cleared)
//!
//! A stored token on startup means `Authenticated` straight away; it is not
//! re-verified locally.

pub mod callback;
pub mod oauth;

use std::sync::LazyLock;
use std::time::Duration;

use chrono::Utc;
use regex::Regex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::config::OAuthConfig;
use crate::error::{ClientError, Result};
use crate::models::{local_part, Session, UserProfile};
use crate::store::CredentialStore;

/// Delay between the logout notification and the actual sign-out.
pub const LOGOUT_GRACE: Duration = Duration::from_secs(1);

const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").expect("email pattern is valid"));

/// Where the session manager is in the login lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticating,
    Authenticated,
    /// Last attempt failed; carries the user-facing reason.
    AuthFailed(String),
}

impl AuthState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Authenticating => "authenticating",
            Self::Authenticated => "authenticated",
            Self::AuthFailed(_) => "auth_failed",
        }
    }
}

/// Session manager over the credential store.
#[derive(Debug)]
pub struct AuthSession {
    store: CredentialStore,
    api: ApiClient,
    oauth: OAuthConfig,
    http: reqwest::Client,
    state: AuthState,
    profile: Option<UserProfile>,
}

impl AuthSession {
    /// Rehydrate from the credential store.
    pub fn restore(api: ApiClient, oauth: OAuthConfig) -> Result<Self> {
        let store = api.store().clone();
        let (state, profile) = if store.get()?.is_some() {
            (AuthState::Authenticated, store.get_profile()?)
        } else {
            (AuthState::Anonymous, None)
        };
        info!(state = state.as_str(), "session restored");

        Ok(Self {
            store,
            api,
            oauth,
            http: reqwest::Client::new(),
            state,
            profile,
        })
    }

    pub const fn state(&self) -> &AuthState {
        &self.state
    }

    pub const fn is_authenticated(&self) -> bool {
        matches!(self.state, AuthState::Authenticated)
    }

    pub const fn oauth_config(&self) -> &OAuthConfig {
        &self.oauth
    }

    /// The active session, read fresh from the store.
    pub fn session(&self) -> Result<Option<Session>> {
        if !self.is_authenticated() {
            return Ok(None);
        }
        Ok(self
            .store
            .get()?
            .map(|token| Session::new(token, self.profile.clone())))
    }

    /// Password login.
    ///
    /// Input is validated before anything is sent; a failure at any step
    /// leaves the store untouched and the state at `AuthFailed`.
    pub async fn login_password(&mut self, email: &str, password: &str) -> Result<&UserProfile> {
        let email = email.trim();
        self.state = AuthState::Authenticating;

        let outcome = match validate_credentials(email, password) {
            Ok(()) => self.api.login(email, password).await,
            Err(e) => Err(e),
        };
        let profile = UserProfile::from_email(email, Utc::now());
        self.finish_login(outcome, profile)
    }

    /// Browser URL starting the OAuth flow.
    pub fn authorize_url(&self, state: &str) -> Result<String> {
        self.require_oauth()?;
        Ok(oauth::build_authorize_url(&self.oauth, state))
    }

    /// Complete the OAuth flow with the code from the redirect.
    pub async fn login_oauth_code(&mut self, code: &str) -> Result<&UserProfile> {
        self.state = AuthState::Authenticating;

        let outcome = match self.require_oauth() {
            Ok(()) if code.trim().is_empty() => Err(ClientError::Precondition(
                "No authorization code to exchange".to_string(),
            )),
            Ok(()) => oauth::exchange_code(&self.http, &self.oauth, code.trim()).await,
            Err(e) => Err(e),
        };

        let (token, email) = match outcome {
            Ok(tokens) => (Ok(tokens.id_token), tokens.email),
            Err(e) => (Err(e), None),
        };
        let profile = UserProfile {
            name: email.as_deref().map(local_part).unwrap_or_default().to_string(),
            email: email.unwrap_or_else(|| "User".to_string()),
            login_time: Utc::now(),
        };
        self.finish_login(token, profile)
    }

    fn finish_login(&mut self, token: Result<String>, profile: UserProfile) -> Result<&UserProfile> {
        let token = match token {
            Ok(token) => token,
            Err(e) => {
                if e.is_precondition() {
                    debug!("login refused locally: {e}");
                } else {
                    warn!(kind = e.label(), "login failed: {e}");
                }
                self.state = AuthState::AuthFailed(e.to_string());
                return Err(e);
            }
        };

        if let Err(e) = self.store.put(&token, Some(&profile)) {
            self.state = AuthState::AuthFailed(e.to_string());
            return Err(e);
        }

        info!(email = %profile.email, token = %mask_token(&token), "signed in");
        self.state = AuthState::Authenticated;
        Ok(self.profile.insert(profile))
    }

    fn require_oauth(&self) -> Result<()> {
        if self.oauth.is_configured() {
            Ok(())
        } else {
            Err(ClientError::Precondition(
                "OAuth login is not configured".to_string(),
            ))
        }
    }

    /// Sign out.
    ///
    /// The server-side revocation is best effort and may only run until the
    /// grace period ends; the store is cleared and the state flips to
    /// `Anonymous` exactly at that deadline, whatever the backend did. The
    /// state flips even if clearing the store fails; the error is returned so
    /// the caller can report it.
    pub async fn logout(&mut self) -> Result<()> {
        let deadline = Instant::now() + LOGOUT_GRACE;
        match self.store.get() {
            Ok(Some(token)) => {
                match tokio::time::timeout_at(deadline, self.api.logout(&token)).await {
                    Ok(Ok(())) => debug!("token revoked"),
                    Ok(Err(e)) => warn!("server-side logout failed, continuing: {e}"),
                    Err(_) => warn!("server-side logout still pending at deadline, abandoned"),
                }
            }
            Ok(None) => {}
            Err(e) => warn!("could not read token for logout: {e}"),
        }

        tokio::time::sleep_until(deadline).await;
        let cleared = self.store.clear();
        self.state = AuthState::Anonymous;
        self.profile = None;
        info!("signed out");
        cleared
    }
}

/// Local checks run before a password login is sent.
pub fn validate_credentials(email: &str, password: &str) -> Result<()> {
    if email.is_empty() {
        return Err(ClientError::Precondition("Email is required".to_string()));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(ClientError::Precondition("Email is invalid".to_string()));
    }
    if password.is_empty() {
        return Err(ClientError::Precondition("Password is required".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ClientError::Precondition(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Masked rendering of a token for logs and status output.
pub fn mask_token(token: &str) -> String {
    if token.chars().count() <= 12 {
        return "***".to_string();
    }
    let prefix: String = token.chars().take(8).collect();
    format!("{prefix}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session_for(server: &MockServer, dir: &std::path::Path) -> AuthSession {
        let api = ApiClient::new(&server.uri(), CredentialStore::new(dir));
        AuthSession::restore(api, OAuthConfig::default()).unwrap()
    }

    #[test]
    fn test_validate_credentials() {
        assert!(validate_credentials("", "secret1").is_err());
        assert!(validate_credentials("not-an-email", "secret1").is_err());
        assert!(validate_credentials("a@b.co", "").is_err());
        assert!(validate_credentials("a@b.co", "12345").is_err());
        validate_credentials("a@b.co", "123456").unwrap();
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("eyJraWQiOiJhYmMifQ.payload"), "eyJraWQi...");
        assert_eq!(mask_token("short"), "***");
    }

    #[tokio::test]
    async fn test_restore_with_token_is_authenticated() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        CredentialStore::new(dir.path()).put("tok", None).unwrap();

        let session = session_for(&server, dir.path());
        assert!(session.is_authenticated());
        // Token present, profile absent: degraded but active.
        assert!(session.profile.is_none());
        assert_eq!(session.session().unwrap().unwrap().token, "tok");
    }

    #[tokio::test]
    async fn test_restore_without_token_is_anonymous() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let session = session_for(&server, dir.path());
        assert_eq!(session.state(), &AuthState::Anonymous);
        assert!(session.session().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_password_login_persists_credentials() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "AuthenticationResult": {"IdToken": "id-token-value"}
            })))
            .mount(&server)
            .await;

        let mut session = session_for(&server, dir.path());
        let profile = session
            .login_password(" ana@example.com ", "secret1")
            .await
            .unwrap()
            .clone();
        assert_eq!(profile.name, "ana");
        assert!(session.is_authenticated());

        let store = CredentialStore::new(dir.path());
        assert_eq!(store.get().unwrap().as_deref(), Some("id-token-value"));
        assert_eq!(store.get_profile().unwrap(), Some(profile));
    }

    #[tokio::test]
    async fn test_rejected_login_leaves_store_untouched() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": "Invalid credentials: Incorrect username or password."
            })))
            .mount(&server)
            .await;

        let mut session = session_for(&server, dir.path());
        let err = session
            .login_password("ana@example.com", "wrong-pass")
            .await
            .unwrap_err();
        assert_eq!(
            session.state(),
            &AuthState::AuthFailed(err.to_string())
        );
        assert!(err.to_string().starts_with("Invalid credentials"));
        assert!(CredentialStore::new(dir.path()).get().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_garbled_rejection_uses_generic_message() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let mut session = session_for(&server, dir.path());
        let err = session
            .login_password("ana@example.com", "secret1")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            crate::api::Operation::Login.rejected_fallback()
        );
    }

    #[tokio::test]
    async fn test_invalid_input_sends_nothing() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut session = session_for(&server, dir.path());
        let err = session.login_password("ana", "secret1").await.unwrap_err();
        assert!(err.is_precondition());
        assert!(matches!(session.state(), AuthState::AuthFailed(_)));
    }

    #[tokio::test]
    async fn test_oauth_not_configured() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let mut session = session_for(&server, dir.path());
        assert!(session.authorize_url("st").is_err());
        let err = session.login_oauth_code("abc").await.unwrap_err();
        assert!(err.is_precondition());
    }

    #[tokio::test]
    async fn test_oauth_login_uses_exchange_email() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id_token": "oauth-id-token"
            })))
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri(), CredentialStore::new(dir.path()));
        let oauth = OAuthConfig {
            authorize_url: format!("{}/oauth2/authorize", server.uri()),
            token_url: format!("{}/oauth2/token", server.uri()),
            client_id: "client".to_string(),
            ..OAuthConfig::default()
        };
        let mut session = AuthSession::restore(api, oauth).unwrap();

        let profile = session.login_oauth_code("abc").await.unwrap().clone();
        assert_eq!(profile.email, "User");
        assert_eq!(profile.name, "");
        assert_eq!(
            CredentialStore::new(dir.path()).get().unwrap().as_deref(),
            Some("oauth-id-token")
        );
    }

    #[tokio::test]
    async fn test_logout_revokes_and_clears() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        CredentialStore::new(dir.path()).put("tok", None).unwrap();
        Mock::given(method("POST"))
            .and(path("/api/auth/logout"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "logged_out": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut session = session_for(&server, dir.path());
        let started = Instant::now();
        session.logout().await.unwrap();

        assert!(started.elapsed() >= LOGOUT_GRACE);
        assert_eq!(session.state(), &AuthState::Anonymous);
        assert!(CredentialStore::new(dir.path()).get().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_logout_proceeds_when_revocation_fails() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        CredentialStore::new(dir.path()).put("tok", None).unwrap();
        Mock::given(method("POST"))
            .and(path("/api/auth/logout"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut session = session_for(&server, dir.path());
        session.logout().await.unwrap();
        assert_eq!(session.state(), &AuthState::Anonymous);
        assert!(CredentialStore::new(dir.path()).get().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_logout_does_not_wait_for_slow_revocation() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        CredentialStore::new(dir.path()).put("tok", None).unwrap();
        Mock::given(method("POST"))
            .and(path("/api/auth/logout"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(4)))
            .mount(&server)
            .await;

        let mut session = session_for(&server, dir.path());
        let started = Instant::now();
        tokio::time::timeout(Duration::from_millis(1500), session.logout())
            .await
            .expect("logout finishes at the grace deadline")
            .unwrap();

        assert!(started.elapsed() >= LOGOUT_GRACE);
        assert_eq!(session.state(), &AuthState::Anonymous);
        assert!(CredentialStore::new(dir.path()).get().unwrap().is_none());
    }
}
