//! Credential store.
//!
//! Persists the bearer token and the user profile as two files in the client
//! home directory so a session survives restarts. Both files are written with
//! restricted permissions (0600) and removed together on logout. No expiry is
//! tracked: a token is trusted until the backend rejects it.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::Result;
use crate::models::UserProfile;

/// File holding the raw bearer token.
const TOKEN_FILE: &str = "token";
/// File holding the JSON-serialized profile.
const PROFILE_FILE: &str = "user.json";

/// File-backed credential store.
///
/// Cheap to clone; every read goes to disk, so a token written by one holder
/// is visible to every other holder on its next request.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    /// Open a store rooted at `dir`. Nothing is created until the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist a token and, when known, the profile that goes with it.
    pub fn put(&self, token: &str, profile: Option<&UserProfile>) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        write_private(&self.dir.join(TOKEN_FILE), token)?;

        let profile_path = self.dir.join(PROFILE_FILE);
        match profile {
            Some(profile) => {
                let json = serde_json::to_string_pretty(profile).map_err(io::Error::other)?;
                write_private(&profile_path, &json)?;
            }
            None => remove_if_exists(&profile_path)?,
        }

        debug!(dir = %self.dir.display(), "stored credentials");
        Ok(())
    }

    /// The stored token, if any. Blank files count as absent.
    pub fn get(&self) -> Result<Option<String>> {
        let Some(raw) = read_if_exists(&self.dir.join(TOKEN_FILE))? else {
            return Ok(None);
        };
        let token = raw.trim();
        Ok((!token.is_empty()).then(|| token.to_string()))
    }

    /// The stored profile, if any.
    ///
    /// A profile that cannot be parsed is reported as absent rather than as an
    /// error; the token alone still makes a usable session.
    pub fn get_profile(&self) -> Result<Option<UserProfile>> {
        let Some(raw) = read_if_exists(&self.dir.join(PROFILE_FILE))? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(profile) => Ok(Some(profile)),
            Err(e) => {
                warn!("ignoring unreadable profile: {e}");
                Ok(None)
            }
        }
    }

    /// Remove both entries.
    pub fn clear(&self) -> Result<()> {
        remove_if_exists(&self.dir.join(TOKEN_FILE))?;
        remove_if_exists(&self.dir.join(PROFILE_FILE))?;
        debug!(dir = %self.dir.display(), "cleared credentials");
        Ok(())
    }
}

fn read_if_exists(path: &Path) -> io::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn write_private(path: &Path, contents: &str) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(contents.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    #[test]
    fn test_empty_store() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("home"));
        assert!(store.get().unwrap().is_none());
        assert!(store.get_profile().unwrap().is_none());
        // Clearing an empty store is fine.
        store.clear().unwrap();
    }

    #[test]
    fn test_put_get_clear() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        let profile = UserProfile::from_email("ana@example.com", Utc::now());

        store.put("tok-123", Some(&profile)).unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("tok-123"));
        assert_eq!(store.get_profile().unwrap(), Some(profile));

        store.clear().unwrap();
        assert!(store.get().unwrap().is_none());
        assert!(store.get_profile().unwrap().is_none());
    }

    #[test]
    fn test_token_visible_to_clones() {
        let dir = tempdir().unwrap();
        let writer = CredentialStore::new(dir.path());
        let reader = writer.clone();

        writer.put("first", None).unwrap();
        assert_eq!(reader.get().unwrap().as_deref(), Some("first"));
        writer.put("second", None).unwrap();
        assert_eq!(reader.get().unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn test_corrupt_profile_is_degraded_not_fatal() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        store.put("tok", None).unwrap();
        fs::write(dir.path().join(PROFILE_FILE), "{not json").unwrap();

        assert_eq!(store.get().unwrap().as_deref(), Some("tok"));
        assert!(store.get_profile().unwrap().is_none());
    }

    #[test]
    fn test_put_without_profile_drops_stale_profile() {
        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        let profile = UserProfile::from_email("a@b.co", Utc::now());
        store.put("old", Some(&profile)).unwrap();
        store.put("new", None).unwrap();
        assert!(store.get_profile().unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_token_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        store.put("secret", None).unwrap();
        let mode = fs::metadata(dir.path().join(TOKEN_FILE))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
