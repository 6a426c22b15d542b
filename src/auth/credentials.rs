//! Credential storage and management
//!
//! Keeps the Spotify user tokens in memory and in a line-oriented `KEY=VALUE`
//! file (`.env.local` by default). Only the two token keys are managed; every
//! other line of the file is left alone.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use crate::config::{ENV_ACCESS_TOKEN, ENV_REFRESH_TOKEN};
use crate::Result;

/// Tokens returned by a code exchange or a refresh grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Lifetime of the access token in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

impl TokenSet {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>, expires_in: Option<u64>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_in,
        }
    }
}

/// The persisted view: either token may be absent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl StoredTokens {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// In-memory token view backed by a durable credential file
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    tokens: RwLock<StoredTokens>,
}

impl CredentialStore {
    /// Open the store at `path`.
    ///
    /// Values in `seed` (usually taken from the environment) win over the file;
    /// the file fills in whatever the seed lacks.
    pub fn open(path: impl Into<PathBuf>, seed: StoredTokens) -> Result<Self> {
        let path = path.into();
        let on_disk = if path.exists() {
            parse_record(&std::fs::read_to_string(&path)?)
        } else {
            StoredTokens::default()
        };

        let tokens = StoredTokens {
            access_token: seed.access_token.or(on_disk.access_token),
            refresh_token: seed.refresh_token.or(on_disk.refresh_token),
        };

        tracing::debug!(
            path = %path.display(),
            access = tokens.access_token.is_some(),
            refresh = tokens.refresh_token.is_some(),
            "Opened credential store"
        );

        Ok(Self {
            path,
            tokens: RwLock::new(tokens),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the current tokens
    pub fn read(&self) -> StoredTokens {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether an access token or a refresh token is available
    pub fn has_tokens(&self) -> bool {
        !self.read().is_empty()
    }

    /// Merge `tokens` into the store and rewrite the credential file.
    ///
    /// The access token is always replaced. The refresh token is replaced only
    /// when `tokens` carries one, so a refresh grant that omits it keeps the old one.
    pub fn write(&self, tokens: &TokenSet) -> Result<()> {
        let mut current = self.tokens.write().unwrap_or_else(PoisonError::into_inner);

        let mut next = current.clone();
        next.access_token = Some(tokens.access_token.clone());
        if let Some(refresh) = &tokens.refresh_token {
            next.refresh_token = Some(refresh.clone());
        }

        self.persist(&next)?;
        *current = next;
        Ok(())
    }

    /// Forget both tokens, in memory and on disk
    pub fn clear(&self) -> Result<()> {
        let mut current = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        let empty = StoredTokens::default();
        if self.path.exists() {
            self.persist(&empty)?;
        }
        *current = empty;
        Ok(())
    }

    fn persist(&self, tokens: &StoredTokens) -> Result<()> {
        let existing = if self.path.exists() {
            std::fs::read_to_string(&self.path)?
        } else {
            String::new()
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(&self.path, render_record(&existing, tokens))?;

        // Set restrictive permissions on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, perms)?;
        }

        tracing::debug!(path = %self.path.display(), "Credentials saved");
        Ok(())
    }
}

fn is_managed(line: &str) -> bool {
    line.starts_with(&format!("{}=", ENV_ACCESS_TOKEN))
        || line.starts_with(&format!("{}=", ENV_REFRESH_TOKEN))
}

/// Extract the managed keys from file content. Later lines win.
fn parse_record(content: &str) -> StoredTokens {
    let mut tokens = StoredTokens::default();
    for line in content.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"');
        if value.is_empty() {
            continue;
        }
        match key.trim() {
            ENV_ACCESS_TOKEN => tokens.access_token = Some(value.to_string()),
            ENV_REFRESH_TOKEN => tokens.refresh_token = Some(value.to_string()),
            _ => {}
        }
    }
    tokens
}

/// Drop old managed and blank lines, keep the rest in order, append current values.
fn render_record(existing: &str, tokens: &StoredTokens) -> String {
    let mut lines: Vec<String> = existing
        .lines()
        .filter(|line| !line.trim().is_empty() && !is_managed(line))
        .map(str::to_string)
        .collect();

    if let Some(access) = &tokens.access_token {
        lines.push(format!("{}={}", ENV_ACCESS_TOKEN, access));
    }
    if let Some(refresh) = &tokens.refresh_token {
        lines.push(format!("{}={}", ENV_REFRESH_TOKEN, refresh));
    }

    let mut output = lines.join("\n");
    output.push('\n');
    output
}
