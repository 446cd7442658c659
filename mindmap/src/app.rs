//! Client state object.
//!
//! Owns the auth session, the synced registry and the notification slot, and
//! exposes read accessors plus one command per user action. Every command
//! reports its outcome through the notifier: success messages on the happy
//! path, the error's own message otherwise. Commands take `&mut self`, so two
//! mutations on one `App` can never overlap.

use tracing::debug;

use crate::api::ApiClient;
use crate::auth::{AuthSession, AuthState};
use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::models::{DocumentId, Notification};
use crate::notify::Notifier;
use crate::registry::DocumentRegistry;
use crate::store::CredentialStore;
use crate::sync::{DocumentSync, NO_SELECTION};

/// Which top-level view the shell should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    Dashboard,
}

pub struct App {
    session: AuthSession,
    docs: DocumentSync,
    notifier: Notifier,
    share_base_url: String,
    /// Draft name while the create dialog is open.
    create_dialog: Option<String>,
}

impl App {
    /// Build the client state, rehydrating any stored session.
    pub fn new(config: &Config, store: CredentialStore) -> Result<Self> {
        let api = ApiClient::new(&config.api_base_url, store);
        let session = AuthSession::restore(api.clone(), config.oauth.clone())?;
        Ok(Self {
            session,
            docs: DocumentSync::new(api),
            notifier: Notifier::new(),
            share_base_url: config.share_base_url.trim_end_matches('/').to_string(),
            create_dialog: None,
        })
    }

    // === Read accessors ===

    pub const fn view(&self) -> View {
        if self.session.is_authenticated() {
            View::Dashboard
        } else {
            View::Login
        }
    }

    pub const fn auth_state(&self) -> &AuthState {
        self.session.state()
    }

    pub const fn session(&self) -> &AuthSession {
        &self.session
    }

    pub const fn registry(&self) -> &DocumentRegistry {
        self.docs.registry()
    }

    /// The visible notification, if it has not expired.
    pub fn notification(&self) -> Option<&Notification> {
        self.notifier.current()
    }

    // === Auth commands ===

    pub async fn login_password(&mut self, email: &str, password: &str) -> Result<()> {
        let outcome = self
            .session
            .login_password(email, password)
            .await
            .map(|p| format!("Signed in as {}", p.email));
        self.report(outcome)
    }

    pub fn oauth_authorize_url(&mut self, state: &str) -> Result<String> {
        let outcome = self.session.authorize_url(state);
        if let Err(e) = &outcome {
            self.notifier.error(e.to_string());
        }
        outcome
    }

    pub async fn login_oauth_code(&mut self, code: &str) -> Result<()> {
        let outcome = self
            .session
            .login_oauth_code(code)
            .await
            .map(|p| format!("Signed in as {}", p.email));
        self.report(outcome)
    }

    /// Show the logout notification now; sign out after the grace period.
    pub async fn logout(&mut self) -> Result<()> {
        self.notifier.success("Logged out successfully!");
        let cleared = self.session.logout().await;
        self.docs.registry_mut().clear();
        self.create_dialog = None;
        if let Err(e) = &cleared {
            self.notifier.error(e.to_string());
        }
        cleared
    }

    // === Document commands ===

    /// Hydrate the registry (run when the dashboard is shown).
    pub async fn refresh(&mut self) -> Result<usize> {
        let outcome = self.docs.list().await;
        if let Err(e) = &outcome {
            self.notifier.error(e.to_string());
        }
        outcome
    }

    pub fn select(&mut self, id: &DocumentId) -> Result<()> {
        if self.docs.registry_mut().select(id) {
            debug!(%id, "selected document");
            Ok(())
        } else {
            let err = ClientError::Precondition(format!("Mindmap {id} not found"));
            self.notifier.error(err.to_string());
            Err(err)
        }
    }

    pub fn open_create_dialog(&mut self) {
        self.create_dialog = Some(String::new());
    }

    pub fn set_create_draft(&mut self, name: &str) {
        self.create_dialog = Some(name.to_string());
    }

    /// Create from the dialog draft.
    pub async fn submit_create_dialog(&mut self) -> Result<DocumentId> {
        let draft = self.create_dialog.clone().unwrap_or_default();
        self.create(&draft).await
    }

    pub async fn create(&mut self, name: &str) -> Result<DocumentId> {
        let outcome = self.docs.create(name).await;
        if outcome.is_ok() {
            self.create_dialog = None;
        }
        self.report_with(outcome, "Mindmap created successfully!")
    }

    pub async fn rename(&mut self, id: &DocumentId, new_name: &str) -> Result<()> {
        let outcome = self.docs.rename(id, new_name).await;
        self.report_with(outcome, "Renamed successfully!")
    }

    pub async fn delete(&mut self, id: &DocumentId) -> Result<()> {
        let outcome = self.docs.delete(id).await;
        self.report_with(outcome, "Mindmap deleted!")
    }

    /// Content is not persisted; this only confirms to the user.
    pub fn save(&mut self) -> Result<()> {
        let outcome = self.docs.save().map(|_| ());
        self.report_with(outcome, "Saved successfully!")
    }

    /// Share link for the selected document.
    pub fn share(&mut self) -> Result<String> {
        let Some(doc) = self.docs.registry().selected() else {
            let err = ClientError::Precondition(NO_SELECTION.to_string());
            self.notifier.error(err.to_string());
            return Err(err);
        };
        let link = format!(
            "{}/?mindmap={}",
            self.share_base_url,
            urlencoding::encode(doc.id.as_str())
        );
        self.notifier.info(format!("Share link ready: {link}"));
        Ok(link)
    }

    fn report(&mut self, outcome: Result<String>) -> Result<()> {
        match outcome {
            Ok(message) => {
                self.notifier.success(message);
                Ok(())
            }
            Err(e) => {
                self.notifier.error(e.to_string());
                Err(e)
            }
        }
    }

    fn report_with<T>(&mut self, outcome: Result<T>, success: &str) -> Result<T> {
        match &outcome {
            Ok(_) => self.notifier.success(success),
            Err(e) => self.notifier.error(e.to_string()),
        };
        outcome
    }
}
