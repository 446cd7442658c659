//! CLI command execution.
//!
//! Each invocation builds a fresh [`App`] from the stored credentials, runs
//! one command against it and prints the resulting notification.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::app::{App, View};
use crate::auth::callback::CallbackListener;
use crate::auth::mask_token;
use crate::config::{paths, Config};
use crate::models::{DocumentId, DocumentSummary, NotificationKind};
use crate::store::CredentialStore;

use super::args::{Cli, Commands, LoginArgs};

/// How long `login --oauth` waits for the browser to come back.
const OAUTH_TIMEOUT: Duration = Duration::from_secs(300);

const LOGIN_HINT: &str = "Not signed in. Run `mindmap login --email <EMAIL> --password <PASSWORD>` \
                          or `mindmap login --oauth` first.";

// === Command Execution ===

pub async fn execute(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let store = CredentialStore::new(paths::credentials_dir()?);
    debug!(dir = %store.dir().display(), api = %config.api_base_url, "starting");
    let mut app = App::new(&config, store)?;

    match cli.command {
        Commands::Login(args) => login(&mut app, args).await,
        Commands::Logout => {
            let outcome = app.logout().await;
            finish(&app, outcome)
        }
        Commands::Status => status(&app),
        Commands::List { filter } => {
            open_dashboard(&mut app).await?;
            print_documents(&app, filter.as_deref());
            Ok(())
        }
        Commands::Create { name } => {
            open_dashboard(&mut app).await?;
            app.open_create_dialog();
            app.set_create_draft(&name.join(" "));
            let outcome = app.submit_create_dialog().await;
            let id = finish(&app, outcome)?;
            println!("{id}");
            Ok(())
        }
        Commands::Rename { id, name } => {
            let id = DocumentId::new(id);
            open_dashboard(&mut app).await?;
            select(&mut app, &id)?;
            let outcome = app.rename(&id, &name.join(" ")).await;
            finish(&app, outcome)
        }
        Commands::Delete { id } => {
            let id = DocumentId::new(id);
            open_dashboard(&mut app).await?;
            let outcome = app.delete(&id).await;
            finish(&app, outcome)
        }
        Commands::Save { id } => {
            let id = DocumentId::new(id);
            open_dashboard(&mut app).await?;
            select(&mut app, &id)?;
            let outcome = app.save();
            finish(&app, outcome)
        }
        Commands::Share { id } => {
            let id = DocumentId::new(id);
            open_dashboard(&mut app).await?;
            select(&mut app, &id)?;
            let outcome = app.share();
            let link = finish(&app, outcome)?;
            println!("{link}");
            Ok(())
        }
    }
}

/// Print the visible non-error notification, and turn a failed outcome into
/// the process error.
fn finish<T>(app: &App, outcome: crate::error::Result<T>) -> Result<T> {
    match outcome {
        Ok(value) => {
            if let Some(note) = app.notification() {
                if note.kind != NotificationKind::Error {
                    println!("[{}] {}", note.kind, note.message);
                }
            }
            Ok(value)
        }
        Err(e) => Err(e.into()),
    }
}

/// Route to the dashboard: requires a session, then hydrates the registry.
async fn open_dashboard(app: &mut App) -> Result<()> {
    if app.view() == View::Login {
        bail!(LOGIN_HINT);
    }
    let count = app.refresh().await?;
    debug!(count, "registry hydrated");
    Ok(())
}

fn select(app: &mut App, id: &DocumentId) -> Result<()> {
    app.select(id)?;
    Ok(())
}

// === Auth ===

async fn login(app: &mut App, args: LoginArgs) -> Result<()> {
    if args.oauth {
        return login_oauth(app).await;
    }
    if let Some(code) = args.code {
        let outcome = app.login_oauth_code(&code).await;
        return finish(app, outcome);
    }
    match (args.email, args.password) {
        (Some(email), Some(password)) => {
            let outcome = app.login_password(&email, &password).await;
            finish(app, outcome)
        }
        _ => bail!("Use --email with --password, --oauth, or --code"),
    }
}

async fn login_oauth(app: &mut App) -> Result<()> {
    let state = Uuid::now_v7().to_string();
    let url = app.oauth_authorize_url(&state)?;
    let redirect_uri = app.session().oauth_config().redirect_uri.clone();
    let listener = CallbackListener::bind(&redirect_uri).await?;
    debug!(addr = %listener.local_addr()?, "waiting for the OAuth redirect");

    println!("Opening browser to sign in...");
    if let Err(e) = open::that(&url) {
        warn!("could not open browser: {e}");
    }
    println!("If the browser did not open, visit:\n  {url}");

    let code = tokio::time::timeout(OAUTH_TIMEOUT, listener.wait_for_code(&state))
        .await
        .context("Timed out waiting for the sign-in redirect")??;

    let outcome = app.login_oauth_code(&code).await;
    finish(app, outcome)
}

fn status(app: &App) -> Result<()> {
    println!("State: {}", app.auth_state().as_str());
    let Some(session) = app.session().session()? else {
        println!("Not signed in.");
        return Ok(());
    };
    match &session.user {
        Some(user) => {
            println!("User:  {} <{}>", user.name, user.email);
            println!("Since: {}", user.login_time.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        None => println!("User:  (no profile stored)"),
    }
    println!("Token: {}", mask_token(&session.token));
    Ok(())
}

// === Output ===

fn print_documents(app: &App, filter: Option<&str>) {
    let registry = app.registry();
    let documents: Vec<&DocumentSummary> = match filter {
        Some(term) => registry.filter(term),
        None => registry.documents().iter().collect(),
    };

    if registry.is_empty() {
        println!("No mind maps yet. Create one with `mindmap create <NAME>`.");
        return;
    }
    if documents.is_empty() {
        println!("No mind maps match.");
        return;
    }

    println!("{:<10} {:<32} {:<12} {}", "ID", "NAME", "UPDATED", "COLOR");
    println!("{}", "-".repeat(80));

    for doc in documents {
        println!(
            "{:<10} {:<32} {:<12} {}",
            doc.id.as_str(),
            truncate(&doc.name, 30),
            doc.updated.format("%Y-%m-%d"),
            doc.color,
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max - 1).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Trip", 30), "Trip");
        assert_eq!(truncate("abcdef", 4), "abc…");
        assert_eq!(truncate("ééééé", 5), "ééééé");
    }
}
