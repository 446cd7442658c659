//! HTTP client for the mindmap backend.
//!
//! Thin wrapper over `reqwest`: builds requests, attaches the bearer token read
//! fresh from the credential store, and maps every failure onto
//! [`ClientError`]. It never touches client state; the session and sync layers
//! decide what a response means.

use chrono::{DateTime, Utc};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::models::DocumentId;
use crate::store::CredentialStore;

/// Shown when an operation needs a token and none is stored.
pub const MISSING_TOKEN: &str = "No token found. Please log in again!";

/// Backend operations, each with its own fallback wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Login,
    Logout,
    List,
    Create,
    Rename,
    Delete,
}

impl Operation {
    /// Used when a non-success response carries no `error` field.
    pub const fn rejected_fallback(self) -> &'static str {
        match self {
            Self::Login => "Login failed. Please check your email and password.",
            Self::Logout => "Failed to log out",
            Self::List => "Failed to fetch mindmaps",
            Self::Create => "Failed to create mindmap",
            Self::Rename => "Failed to rename mindmap",
            Self::Delete => "Failed to delete mindmap",
        }
    }

    /// Used when the transport error has no message of its own.
    pub const fn transport_fallback(self) -> &'static str {
        match self {
            Self::Login => "Could not reach the login service",
            Self::Logout => "Error while logging out!",
            Self::List => "Error loading mindmaps!",
            Self::Create => "Error creating mindmap!",
            Self::Rename => "Error renaming mindmap!",
            Self::Delete => "Error deleting mindmap!",
        }
    }
}

// === Wire types ===

/// `POST /api/auth/login` success body.
#[derive(Debug, Default, Deserialize)]
struct LoginResponse {
    #[serde(rename = "AuthenticationResult", default)]
    authentication_result: Option<AuthenticationResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    id_token: Option<String>,
    access_token: Option<String>,
}

impl AuthenticationResult {
    /// The ID token if present, else the access token.
    fn bearer(self) -> Option<String> {
        [self.id_token, self.access_token]
            .into_iter()
            .flatten()
            .find(|t| !t.is_empty())
    }
}

/// Error body shape shared by the backend and the identity provider.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// One entry of `GET /api/mindmaps`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteDocument {
    pub id: DocumentId,
    pub name: String,
    #[serde(rename = "updatedAt", default, deserialize_with = "timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub color: Option<String>,
}

/// `POST /api/mindmaps` success body.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedDocument {
    pub id: DocumentId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "rootNodeId", default)]
    pub root_node_id: Option<DocumentId>,
}

/// `PUT /api/mindmaps/{id}` success body.
#[derive(Debug, Clone, Deserialize)]
pub struct RenamedDocument {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "updatedAt", default, deserialize_with = "timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Accept RFC 3339 strings or epoch seconds (the backend's `Instant` can be
/// serialized either way). Anything else reads as absent.
fn timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(parse_timestamp))
}

pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Value::Number(n) => {
            let secs = n.as_f64()?;
            #[allow(clippy::cast_possible_truncation)]
            let (whole, nanos) = (secs.trunc() as i64, (secs.fract() * 1e9) as u32);
            DateTime::from_timestamp(whole, nanos)
        }
        _ => None,
    }
}

// === Client ===

/// Backend REST client.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: CredentialStore,
}

impl ApiClient {
    pub fn new(base_url: &str, store: CredentialStore) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            store,
        }
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Read the token for this request. Absence aborts before anything is sent.
    fn bearer(&self) -> Result<String> {
        self.store
            .get()?
            .ok_or_else(|| ClientError::Precondition(MISSING_TOKEN.to_string()))
    }

    /// Exchange email and password for a bearer token.
    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let req = self
            .http
            .post(self.url("/api/auth/login"))
            .json(&serde_json::json!({ "email": email, "password": password }));
        let resp = send(Operation::Login, req).await?;
        let body: LoginResponse = decode(Operation::Login, resp).await?;

        body.authentication_result
            .unwrap_or_default()
            .bearer()
            .ok_or_else(|| ClientError::Protocol("No token found in the login response".to_string()))
    }

    /// Ask the backend to revoke `token`.
    pub async fn logout(&self, token: &str) -> Result<()> {
        let req = self
            .http
            .post(self.url("/api/auth/logout"))
            .bearer_auth(token);
        send(Operation::Logout, req).await?;
        Ok(())
    }

    pub async fn list_documents(&self) -> Result<Vec<RemoteDocument>> {
        let token = self.bearer()?;
        let req = self.http.get(self.url("/api/mindmaps")).bearer_auth(token);
        let resp = send(Operation::List, req).await?;
        decode(Operation::List, resp).await
    }

    pub async fn create_document(&self, name: &str) -> Result<CreatedDocument> {
        let token = self.bearer()?;
        let req = self
            .http
            .post(self.url("/api/mindmaps"))
            .bearer_auth(token)
            .json(&serde_json::json!({ "name": name }));
        let resp = send(Operation::Create, req).await?;
        decode(Operation::Create, resp).await
    }

    pub async fn rename_document(&self, id: &DocumentId, name: &str) -> Result<RenamedDocument> {
        let token = self.bearer()?;
        let req = self
            .http
            .put(self.url(&format!("/api/mindmaps/{}", urlencoding::encode(id.as_str()))))
            .bearer_auth(token)
            .json(&serde_json::json!({ "name": name }));
        let resp = send(Operation::Rename, req).await?;
        decode(Operation::Rename, resp).await
    }

    /// Delete a document. The confirmation body is read but not interpreted.
    pub async fn delete_document(&self, id: &DocumentId) -> Result<()> {
        let token = self.bearer()?;
        let req = self
            .http
            .delete(self.url(&format!("/api/mindmaps/{}", urlencoding::encode(id.as_str()))))
            .bearer_auth(token);
        let resp = send(Operation::Delete, req).await?;
        resp.bytes()
            .await
            .map_err(|e| transport(Operation::Delete, &e))?;
        Ok(())
    }
}

/// Send a request and turn non-success statuses into [`ClientError::Rejected`].
pub async fn send(op: Operation, req: RequestBuilder) -> Result<Response> {
    let resp = req.send().await.map_err(|e| transport(op, &e))?;
    let status = resp.status();
    debug!(?op, %status, "backend responded");
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    Err(ClientError::Rejected {
        status: status.as_u16(),
        message: error_message(&body).unwrap_or_else(|| op.rejected_fallback().to_string()),
    })
}

/// Decode a success body, treating a shape mismatch as a protocol violation.
pub async fn decode<T: DeserializeOwned>(op: Operation, resp: Response) -> Result<T> {
    let body = resp.text().await.map_err(|e| transport(op, &e))?;
    serde_json::from_str(&body)
        .map_err(|e| ClientError::Protocol(format!("Unexpected response from server: {e}")))
}

/// The non-empty `error` field of a JSON body, if there is one.
pub fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|e| !e.is_empty())
}

pub fn transport(op: Operation, err: &reqwest::Error) -> ClientError {
    let message = err.to_string();
    if message.is_empty() {
        ClientError::Transport(op.transport_fallback().to_string())
    } else {
        ClientError::Transport(message)
    }
}
