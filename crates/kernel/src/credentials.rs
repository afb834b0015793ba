use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Credential file inside the config directory.
pub const CREDENTIAL_FILE: &str = "config.json";

/// Where operators can create a key.
pub const API_KEY_URL: &str = "https://console.anthropic.com/";

#[derive(Debug, Serialize, Deserialize)]
struct CredentialRecord {
    #[serde(default)]
    api_key: Option<String>,
}

/// Outcome of [`CredentialStore::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Removed,
    NothingStored,
}

/// Persists a single API key as `{"api_key": "..."}` in `<dir>/config.json`.
///
/// The file's absence means no key is configured. Saving always replaces
/// whatever was stored before.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(CREDENTIAL_FILE)
    }

    /// Write `secret`, creating the config directory if needed.
    pub fn save(&self, secret: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        let record = CredentialRecord {
            api_key: Some(secret.to_string()),
        };
        let body = serde_json::to_vec(&record)?;

        let mut file = open_private(&self.path())?;
        file.write_all(&body)?;
        file.flush()?;

        debug!(path = %self.path().display(), "saved API key");
        Ok(())
    }

    /// The stored key, or `None` if the file is missing, unreadable or corrupt.
    pub fn load(&self) -> Option<String> {
        let path = self.path();
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "could not read credential file");
                return None;
            }
        };

        match serde_json::from_str::<CredentialRecord>(&contents) {
            Ok(record) => record.api_key.filter(|k| !k.is_empty()),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "ignoring corrupt credential file");
                None
            }
        }
    }

    /// Delete the credential file if one exists.
    pub fn remove(&self) -> Result<Removal> {
        match std::fs::remove_file(self.path()) {
            Ok(()) => Ok(Removal::Removed),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Removal::NothingStored),
            Err(e) => Err(e.into()),
        }
    }

    /// Return the stored key, or ask the operator for one and persist it.
    ///
    /// Returns `None` when nothing is stored and the operator enters nothing.
    pub fn get_or_prompt(
        &self,
        input: &mut impl BufRead,
        output: &mut impl Write,
    ) -> Result<Option<String>> {
        if let Some(key) = self.load() {
            return Ok(Some(key));
        }

        writeln!(output)?;
        writeln!(output, "No API key found. Please enter your Anthropic API key.")?;
        writeln!(output, "(You can get one from {API_KEY_URL})")?;

        self.prompt_and_save(input, output)
    }

    /// Prompt for a key on `output`, read it from `input`, and save it when
    /// non-empty.
    pub fn prompt_and_save(
        &self,
        input: &mut impl BufRead,
        output: &mut impl Write,
    ) -> Result<Option<String>> {
        write!(output, "API Key: ")?;
        output.flush()?;

        let mut line = String::new();
        input.read_line(&mut line)?;
        let key = line.trim();
        if key.is_empty() {
            return Ok(None);
        }

        self.save(key)?;
        writeln!(output, "API key saved to {}", self.path().display())?;
        Ok(Some(key.to_string()))
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<std::fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies when the file is created.
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}
