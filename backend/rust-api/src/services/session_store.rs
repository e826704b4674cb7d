use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use crate::models::auth::AuthSession;
use crate::models::role::Role;

/// Signed-in sessions keyed by backend token, mirrored to a JSON file.
///
/// The file is read once by [`SessionStore::load`] and rewritten after every
/// change. Nothing else touches it.
pub struct SessionStore {
    path: PathBuf,
    sessions: Mutex<HashMap<String, AuthSession>>,
}

impl SessionStore {
    /// Rehydrates from `path`. A missing file is an empty store; an
    /// unreadable one is discarded.
    pub async fn load(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let sessions = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<HashMap<String, AuthSession>>(&bytes) {
                Ok(sessions) => sessions,
                Err(e) => {
                    tracing::warn!("Discarding unreadable session file {:?}: {}", path, e);
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::info!("Session store loaded with {} session(s)", sessions.len());

        Ok(Self {
            path,
            sessions: Mutex::new(sessions),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn insert(&self, session: AuthSession) -> anyhow::Result<()> {
        let mut sessions = self.sessions.lock().await;
        sessions.insert(session.token.clone(), session);
        self.persist(&sessions).await
    }

    pub async fn get(&self, token: &str) -> Option<AuthSession> {
        self.sessions.lock().await.get(token).cloned()
    }

    pub async fn remove(&self, token: &str) -> anyhow::Result<Option<AuthSession>> {
        let mut sessions = self.sessions.lock().await;
        let removed = sessions.remove(token);
        if removed.is_some() {
            self.persist(&sessions).await?;
        }
        Ok(removed)
    }

    pub async fn count_by_role(&self, role: Role) -> usize {
        self.sessions
            .lock()
            .await
            .values()
            .filter(|session| session.role == role)
            .count()
    }

    async fn persist(&self, sessions: &HashMap<String, AuthSession>) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(sessions)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
