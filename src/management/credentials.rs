use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tracing::debug;

use crate::{error::AuthError, token::Token, types::CredentialRecord};

/// Persistence for the single token record of this client.
///
/// `load` on an empty store is `Ok(None)`. `save` must be atomic for
/// concurrent readers: a `load` never observes a partially written record.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> Result<Option<Token>, AuthError>;
    async fn save(&self, token: &Token) -> Result<(), AuthError>;
    async fn clear(&self) -> Result<(), AuthError>;
}

/// Stores the record as pretty JSON in a single file.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> PathBuf {
        let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("sptcli/credentials.json");
        path
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "credentials.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<Token>, AuthError> {
        let content = match async_fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AuthError::Io(e)),
        };

        let record: CredentialRecord = serde_json::from_str(&content)
            .map_err(|e| AuthError::CorruptCredentials(e.to_string()))?;
        Token::from_record(record).map(Some)
    }

    async fn save(&self, token: &Token) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                async_fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(&token.to_record())?;
        let temp = self.temp_path();
        async_fs::write(&temp, json).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            async_fs::set_permissions(&temp, std::fs::Permissions::from_mode(0o600)).await?;
        }

        // rename is atomic on the same filesystem
        async_fs::rename(&temp, &self.path).await?;
        debug!(path = %self.path.display(), "credentials stored");
        Ok(())
    }

    async fn clear(&self) -> Result<(), AuthError> {
        match async_fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthError::Io(e)),
        }
    }
}
