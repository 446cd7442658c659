//! OAuth authorization-code helpers for the hosted identity provider.

use serde::Deserialize;
use tracing::debug;

use crate::api::transport;
use crate::api::Operation;
use crate::config::OAuthConfig;
use crate::error::{ClientError, Result};

/// Token-exchange response (success and error shapes share one struct).
#[derive(Debug, Default, Deserialize)]
struct TokenResponse {
    id_token: Option<String>,
    email: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Result of a successful code exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangedTokens {
    pub id_token: String,
    pub email: Option<String>,
}

/// Build the browser authorization URL.
///
/// `state` is echoed back by the provider and checked by the callback
/// listener.
pub fn build_authorize_url(config: &OAuthConfig, state: &str) -> String {
    let params = [
        ("response_type", "code"),
        ("client_id", config.client_id.as_str()),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("scope", config.scope.as_str()),
        ("identity_provider", config.identity_provider.as_str()),
        ("state", state),
    ];

    let query = params
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{query}", config.authorize_url)
}

/// Exchange an authorization code for tokens (form-encoded POST).
pub async fn exchange_code(
    http: &reqwest::Client,
    config: &OAuthConfig,
    code: &str,
) -> Result<ExchangedTokens> {
    let form = [
        ("grant_type", "authorization_code"),
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("code", code),
        ("redirect_uri", config.redirect_uri.as_str()),
    ];

    let resp = http
        .post(&config.token_url)
        .form(&form)
        .send()
        .await
        .map_err(|e| transport(Operation::Login, &e))?;

    let status = resp.status();
    debug!(%status, "token exchange responded");
    let body = resp
        .text()
        .await
        .map_err(|e| transport(Operation::Login, &e))?;
    let data: TokenResponse = serde_json::from_str(&body).unwrap_or_default();

    if !status.is_success() {
        return Err(ClientError::Rejected {
            status: status.as_u16(),
            message: format!(
                "Server error: {} - {}",
                data.error.as_deref().unwrap_or("unknown"),
                data.error_description.as_deref().unwrap_or("no description"),
            ),
        });
    }

    match data.id_token.filter(|t| !t.is_empty()) {
        Some(id_token) => Ok(ExchangedTokens {
            id_token,
            email: data.email.filter(|e| !e.is_empty()),
        }),
        None => Err(ClientError::Protocol(
            "No id_token found in the token response".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(token_url: &str) -> OAuthConfig {
        OAuthConfig {
            authorize_url: "https://auth.example.com/oauth2/authorize".to_string(),
            token_url: token_url.to_string(),
            client_id: "client-1".to_string(),
            client_secret: String::new(),
            redirect_uri: "http://127.0.0.1:58232/".to_string(),
            ..OAuthConfig::default()
        }
    }

    #[test]
    fn test_authorize_url_format() {
        let url = build_authorize_url(&config("https://unused"), "st-1");
        assert!(url.starts_with("https://auth.example.com/oauth2/authorize?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=client-1"));
        assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A58232%2F"));
        assert!(url.contains("scope=openid%20email%20profile"));
        assert!(url.contains("identity_provider=Google"));
        assert!(url.contains("state=st-1"));
    }

    #[tokio::test]
    async fn test_exchange_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=abc"))
            .and(body_string_contains("client_secret="))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id_token": "idt", "email": "ana@example.com"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cfg = config(&format!("{}/oauth2/token", server.uri()));
        let tokens = exchange_code(&reqwest::Client::new(), &cfg, "abc")
            .await
            .unwrap();
        assert_eq!(tokens.id_token, "idt");
        assert_eq!(tokens.email.as_deref(), Some("ana@example.com"));
    }

    #[tokio::test]
    async fn test_exchange_error_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant"
            })))
            .mount(&server)
            .await;

        let cfg = config(&format!("{}/oauth2/token", server.uri()));
        let err = exchange_code(&reqwest::Client::new(), &cfg, "used")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Server error: invalid_grant - no description");
    }

    #[tokio::test]
    async fn test_exchange_without_id_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "only-access"
            })))
            .mount(&server)
            .await;

        let cfg = config(&format!("{}/oauth2/token", server.uri()));
        let err = exchange_code(&reqwest::Client::new(), &cfg, "abc")
            .await
            .unwrap_err();
        assert_eq!(err.label(), "protocol");
    }
}
