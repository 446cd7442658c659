//! Loopback listener for the OAuth redirect.
//!
//! Serves the redirect URI's host, port and path. The first request carrying
//! `code` or `error` completes the flow; the browser is then redirected to the
//! same path without the query string so a reload cannot replay the code.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex, Notify};
use tracing::{debug, info, warn};

/// How long to keep serving after the code arrived, so the browser can load
/// the clean page.
const LINGER: Duration = Duration::from_secs(2);

const DONE_PAGE: &str = "<!doctype html><html><body>\
    <p>Login complete. You can close this window and return to the terminal.</p>\
    </body></html>";

/// Query parameters the identity provider appends to the redirect URI.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

struct CallbackState {
    path: String,
    outcome_tx: Mutex<Option<oneshot::Sender<CallbackParams>>>,
    page_served: Notify,
}

/// A bound, not yet serving, callback listener.
pub struct CallbackListener {
    listener: TcpListener,
    path: String,
}

impl CallbackListener {
    /// Bind to the host and port of `redirect_uri`.
    pub async fn bind(redirect_uri: &str) -> Result<Self> {
        let url = url::Url::parse(redirect_uri)
            .with_context(|| format!("Invalid redirect URI: {redirect_uri}"))?;
        let host = url.host_str().context("Redirect URI has no host")?;
        let port = url.port_or_known_default().context("Redirect URI has no port")?;

        let listener = TcpListener::bind((host, port))
            .await
            .with_context(|| format!("Failed to listen on {host}:{port}"))?;

        Ok(Self {
            listener,
            path: url.path().to_string(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until the provider redirects back, and return the authorization
    /// code. Fails on a provider error or a `state` mismatch.
    pub async fn wait_for_code(self, expected_state: &str) -> Result<String> {
        let (tx, rx) = oneshot::channel();
        let state = Arc::new(CallbackState {
            path: self.path.clone(),
            outcome_tx: Mutex::new(Some(tx)),
            page_served: Notify::new(),
        });

        let app = Router::new()
            .route(&self.path, get(callback_handler))
            .with_state(Arc::clone(&state));

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(self.listener, app)
                .with_graceful_shutdown(async {
                    let _ = stop_rx.await;
                })
                .await
        });

        let params = rx.await.context("Callback listener stopped unexpectedly")?;
        debug!("received OAuth redirect");

        let _ = tokio::time::timeout(LINGER, state.page_served.notified()).await;
        let _ = stop_tx.send(());
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("callback listener failed: {e}"),
            Err(e) => warn!("callback listener task panicked or was cancelled: {e}"),
        }

        if let Some(error) = params.error {
            bail!(
                "Server error: {} - {}",
                error,
                params.error_description.as_deref().unwrap_or("no description")
            );
        }
        if params.state.as_deref() != Some(expected_state) {
            bail!("OAuth state mismatch; refusing the authorization code");
        }
        info!("authorization code received");
        params.code.context("Redirect carried no authorization code")
    }
}

async fn callback_handler(
    State(state): State<Arc<CallbackState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    if params.code.is_none() && params.error.is_none() {
        state.page_served.notify_one();
        return Html(DONE_PAGE).into_response();
    }

    if let Some(tx) = state.outcome_tx.lock().await.take() {
        let _ = tx.send(params);
    }
    Redirect::to(&state.path).into_response()
}
