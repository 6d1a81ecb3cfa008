//! On-disk storage for session tokens
//!
//! A JSON file mapping account names to a stored token plus its absolute
//! expiry. All writes use temp-file + rename so a crash never leaves a
//! half-written file, and a tokio Mutex serializes concurrent writers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::token::Token;

/// A persisted session token.
///
/// `expires_at` is a unix timestamp in milliseconds, or `None` when the
/// session never learned when its token was issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCredential {
    pub token: Token,
    #[serde(default)]
    pub expires_at: Option<u64>,
}

/// Credential file manager.
pub struct CredentialStore {
    path: PathBuf,
    state: Mutex<HashMap<String, StoredCredential>>,
}

impl CredentialStore {
    /// Load credentials from the given file path.
    ///
    /// A missing file is created as `{}`.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading credential file: {e}")))?;
            let credentials: HashMap<String, StoredCredential> = serde_json::from_str(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing credential file: {e}")))?;
            info!(path = %path.display(), accounts = credentials.len(), "loaded credentials");
            credentials
        } else {
            info!(path = %path.display(), "credential file not found, starting with empty store");
            let store = HashMap::new();
            write_atomic(&path, &store).await?;
            store
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn get(&self, account: &str) -> Option<StoredCredential> {
        let state = self.state.lock().await;
        state.get(account).cloned()
    }

    pub async fn account_names(&self) -> Vec<String> {
        let state = self.state.lock().await;
        state.keys().cloned().collect()
    }

    /// Add or replace a credential and persist to disk.
    pub async fn add(&self, account: &str, credential: StoredCredential) -> Result<()> {
        let mut state = self.state.lock().await;
        state.insert(account.to_owned(), credential);
        debug!(account, "stored credential");
        write_atomic(&self.path, &state).await
    }

    /// Remove a credential and persist to disk.
    ///
    /// Returns the removed credential if it existed.
    pub async fn remove(&self, account: &str) -> Result<Option<StoredCredential>> {
        let mut state = self.state.lock().await;
        let removed = state.remove(account);
        if removed.is_some() {
            debug!(account, "removed credential");
            write_atomic(&self.path, &state).await?;
        }
        Ok(removed)
    }

    pub async fn len(&self) -> usize {
        let state = self.state.lock().await;
        state.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Distinguishes temp files of stores that share a directory and process.
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Write credentials to a file atomically, owner read/write only.
async fn write_atomic(path: &Path, data: &HashMap<String, StoredCredential>) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::CredentialParse(format!("serializing credentials: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("credential path has no parent directory".into()))?;

    let file_name = path
        .file_name()
        .ok_or_else(|| Error::Io("credential path has no file name".into()))?
        .to_string_lossy();
    let tmp_path = dir.join(format!(
        ".{file_name}.tmp.{}.{}",
        std::process::id(),
        TMP_SEQ.fetch_add(1, Ordering::Relaxed)
    ));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp credential file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting credential file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp credential file: {e}")))?;

    debug!(path = %path.display(), "persisted credentials");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(suffix: &str) -> StoredCredential {
        StoredCredential {
            token: Token::new(
                "Bearer",
                format!("at_{suffix}"),
                format!("rt_{suffix}"),
                Some(2678400),
            )
            .unwrap(),
            expires_at: Some(1_735_500_000_000),
        }
    }

    #[tokio::test]
    async fn roundtrip_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let store = CredentialStore::load(path.clone()).await.unwrap();
        store.add("main", stored("1")).await.unwrap();

        let reloaded = CredentialStore::load(path).await.unwrap();
        let cred = reloaded.get("main").await.unwrap();
        assert_eq!(cred, stored("1"));
        assert_eq!(cred.token.access_token(), "at_1");
    }

    #[tokio::test]
    async fn cold_start_creates_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        assert!(!path.exists());
        let store = CredentialStore::load(path.clone()).await.unwrap();
        assert!(store.is_empty().await);
        assert!(path.exists());

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: HashMap<String, StoredCredential> = serde_json::from_str(&contents).unwrap();
        assert!(parsed.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        tokio::fs::write(&path, r#"{"main":{"token":{"access_token":"x"}}}"#)
            .await
            .unwrap();

        let result = CredentialStore::load(path).await;
        assert!(matches!(result, Err(Error::CredentialParse(_))));
    }

    #[tokio::test]
    async fn add_replace_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::load(dir.path().join("credentials.json"))
            .await
            .unwrap();

        store.add("a", stored("1")).await.unwrap();
        store.add("b", stored("2")).await.unwrap();
        store.add("a", stored("3")).await.unwrap();
        assert_eq!(store.len().await, 2);
        assert_eq!(store.get("a").await.unwrap().token.access_token(), "at_3");

        let mut names = store.account_names().await;
        names.sort();
        assert_eq!(names, vec!["a", "b"]);

        assert!(store.remove("a").await.unwrap().is_some());
        assert!(store.remove("a").await.unwrap().is_none());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn stores_sharing_a_directory_keep_their_own_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let a = CredentialStore::load(dir.path().join("a.json")).await.unwrap();
        let b = CredentialStore::load(dir.path().join("b.json")).await.unwrap();

        for round in 0..50 {
            let (ra, rb) = tokio::join!(
                a.add("main", stored(&format!("a{round}"))),
                b.add("main", stored(&format!("b{round}")))
            );
            ra.unwrap();
            rb.unwrap();

            let on_disk_a = tokio::fs::read_to_string(dir.path().join("a.json"))
                .await
                .unwrap();
            let on_disk_b = tokio::fs::read_to_string(dir.path().join("b.json"))
                .await
                .unwrap();
            assert!(!on_disk_a.contains("at_b"), "a.json holds b's token: {on_disk_a}");
            assert!(!on_disk_b.contains("at_a"), "b.json holds a's token: {on_disk_b}");
        }

        let reloaded = CredentialStore::load(dir.path().join("a.json")).await.unwrap();
        assert_eq!(reloaded.get("main").await.unwrap(), stored("a49"));

        // No temp files left behind
        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[tokio::test]
    async fn store_reports_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        let store = CredentialStore::load(path.clone()).await.unwrap();
        assert_eq!(store.path(), path.as_path());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_permissions_are_0600() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");

        let store = CredentialStore::load(path.clone()).await.unwrap();
        store.add("main", stored("1")).await.unwrap();

        let metadata = tokio::fs::metadata(&path).await.unwrap();
        let mode = metadata.permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "credential file must be 0600, got {mode:o}");
    }
}
