use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use super::Session;

/// Durable backing for the session. Only `SessionManager` talks to this.
pub trait SessionStorage: Send + Sync {
    fn load(&self) -> anyhow::Result<Session>;
    fn save(&self, session: &Session) -> anyhow::Result<()>;
}

/// Session persisted as pretty JSON in the user's config directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> anyhow::Result<Session> {
        if !self.path.exists() {
            return Ok(Session::default());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Session::default());
        }

        let session: Session = serde_json::from_str(&content)?;
        Ok(session)
    }

    fn save(&self, session: &Session) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(session)?;
        let mut file = open_private(&self.path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

// The file holds bearer and refresh tokens: owner read/write only
#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies on creation; tighten files left by older versions
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new().write(true).create(true).truncate(true).open(path)
}

/// Process-local storage, for tests and one-shot clients.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    session: Mutex<Session>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(session),
        }
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> anyhow::Result<Session> {
        Ok(self.session.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, session: &Session) -> anyhow::Result<()> {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = session.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_file(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("portf-storage-{}-{}", std::process::id(), name))
            .join("session.json")
    }

    #[test]
    fn missing_file_loads_empty_session() {
        let storage = FileStorage::new(scratch_file("missing"));
        let session = storage.load().unwrap();
        assert!(!session.is_authenticated());
    }

    #[test]
    fn file_storage_survives_reload() {
        let path = scratch_file("reload");
        let storage = FileStorage::new(&path);

        let session = Session {
            access_token: Some("access-1".into()),
            refresh_token: Some("refresh-1".into()),
            username: Some("ada".into()),
            is_admin: Some(true),
            updated_at: None,
        };
        storage.save(&session).unwrap();

        let reloaded = FileStorage::new(&path).load().unwrap();
        assert_eq!(reloaded, session);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn session_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let path = scratch_file("mode");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        FileStorage::new(&path)
            .save(&Session::new("a".into(), "r".into(), "ada".into(), false))
            .unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let path = scratch_file("corrupt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();

        assert!(FileStorage::new(&path).load().is_err());

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
