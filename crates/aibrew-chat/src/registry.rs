//! In-memory registry of live chat sessions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use aibrew_core::config::{CredentialMode, CredentialsConfig};

use crate::error::ChatError;
use crate::services::{ApiKeys, ServiceProvider, SessionServices};
use crate::session::{ChatSession, SharedSession};

/// Owns every session for the lifetime of the process.
///
/// Sessions are never persisted. Each one is keyed by a random id handed to
/// the browser and dropped on explicit delete or after going idle.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, SharedSession>>,
    provider: Arc<dyn ServiceProvider>,
    mode: CredentialMode,
    server_services: Option<SessionServices>,
}

impl SessionRegistry {
    /// Build a registry.
    ///
    /// In server mode with both keys configured, one set of clients is built
    /// up front and shared by every session. In server mode without keys,
    /// sessions are created but every turn fails with `CredentialsMissing`.
    pub fn new(
        provider: Arc<dyn ServiceProvider>,
        credentials: &CredentialsConfig,
    ) -> Result<Self, ChatError> {
        let server_services = match credentials.mode {
            CredentialMode::Server => match ApiKeys::from_config(credentials) {
                Some(keys) => Some(provider.build(&keys)?),
                None => {
                    tracing::warn!("Server credential mode without both API keys; turns will fail");
                    None
                }
            },
            CredentialMode::Interactive => None,
        };

        Ok(Self {
            sessions: RwLock::new(HashMap::new()),
            provider,
            mode: credentials.mode,
            server_services,
        })
    }

    pub fn mode(&self) -> CredentialMode {
        self.mode
    }

    /// Create a fresh session and return its id.
    pub fn create(&self) -> Result<Uuid, ChatError> {
        let id = Uuid::new_v4();
        let session = ChatSession::new(id, self.server_services.clone());
        self.write_sessions()?
            .insert(id, Arc::new(Mutex::new(session)));
        tracing::info!(session_id = %id, "Session created");
        Ok(id)
    }

    pub fn get(&self, id: Uuid) -> Result<SharedSession, ChatError> {
        self.read_sessions()?
            .get(&id)
            .cloned()
            .ok_or(ChatError::SessionNotFound(id))
    }

    /// Drop a session. A turn already in flight finishes against its own
    /// handle and its result is discarded.
    pub fn remove(&self, id: Uuid) -> Result<(), ChatError> {
        match self.write_sessions()?.remove(&id) {
            Some(_) => {
                tracing::info!(session_id = %id, "Session removed");
                Ok(())
            }
            None => Err(ChatError::SessionNotFound(id)),
        }
    }

    /// Bind user-supplied keys to a session. Only valid in interactive mode.
    pub fn set_credentials(&self, id: Uuid, keys: &ApiKeys) -> Result<(), ChatError> {
        if self.mode != CredentialMode::Interactive {
            return Err(ChatError::CredentialsManaged);
        }
        let session = self.get(id)?;
        let services = self.provider.build(keys)?;
        lock(&session)?.set_services(services);
        tracing::info!(session_id = %id, "Session credentials set");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.read_sessions().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove sessions idle for longer than `timeout`. Returns how many were
    /// removed.
    pub fn evict_idle(&self, timeout: Duration) -> Result<usize, ChatError> {
        self.evict_idle_at(Utc::now(), timeout)
    }

    pub fn evict_idle_at(&self, now: DateTime<Utc>, timeout: Duration) -> Result<usize, ChatError> {
        let mut sessions = self.write_sessions()?;
        let before = sessions.len();
        sessions.retain(|id, session| match session.lock() {
            Ok(s) => {
                let expired = s.is_expired_at(now, timeout);
                if expired {
                    tracing::debug!(session_id = %id, "Evicting idle session");
                }
                !expired
            }
            Err(_) => {
                tracing::warn!(session_id = %id, "Evicting session with poisoned lock");
                false
            }
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(evicted, remaining = sessions.len(), "Idle sessions evicted");
        }
        Ok(evicted)
    }

    fn read_sessions(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<Uuid, SharedSession>>, ChatError> {
        self.sessions
            .read()
            .map_err(|_| ChatError::Internal("session registry lock poisoned".into()))
    }

    fn write_sessions(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<Uuid, SharedSession>>, ChatError> {
        self.sessions
            .write()
            .map_err(|_| ChatError::Internal("session registry lock poisoned".into()))
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("mode", &self.mode)
            .field("sessions", &self.len())
            .finish_non_exhaustive()
    }
}

/// Lock a session, mapping poisoning to an internal error.
pub fn lock(session: &SharedSession) -> Result<std::sync::MutexGuard<'_, ChatSession>, ChatError> {
    session
        .lock()
        .map_err(|_| ChatError::Internal("session lock poisoned".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MockServiceProvider;

    fn server_creds() -> CredentialsConfig {
        CredentialsConfig {
            mode: CredentialMode::Server,
            gemini_api_key: Some("gem".into()),
            sarvam_api_key: Some("sar".into()),
        }
    }

    fn interactive_creds() -> CredentialsConfig {
        CredentialsConfig {
            mode: CredentialMode::Interactive,
            gemini_api_key: None,
            sarvam_api_key: None,
        }
    }

    fn registry(creds: &CredentialsConfig) -> SessionRegistry {
        SessionRegistry::new(Arc::new(MockServiceProvider::default()), creds).unwrap()
    }

    #[test]
    fn test_create_and_get() {
        let reg = registry(&server_creds());
        let id = reg.create().unwrap();
        let session = reg.get(id).unwrap();
        let guard = lock(&session).unwrap();
        assert_eq!(guard.id(), id);
        assert!(guard.has_services());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_sessions_are_independent() {
        let reg = registry(&server_creds());
        let a = reg.create().unwrap();
        let b = reg.create().unwrap();
        assert_ne!(a, b);
        assert!(!Arc::ptr_eq(&reg.get(a).unwrap(), &reg.get(b).unwrap()));
    }

    #[test]
    fn test_get_unknown_session() {
        let reg = registry(&server_creds());
        let id = Uuid::new_v4();
        assert!(matches!(reg.get(id), Err(ChatError::SessionNotFound(x)) if x == id));
    }

    #[test]
    fn test_remove() {
        let reg = registry(&server_creds());
        let id = reg.create().unwrap();
        reg.remove(id).unwrap();
        assert!(reg.is_empty());
        assert!(matches!(reg.remove(id), Err(ChatError::SessionNotFound(_))));
    }

    #[test]
    fn test_server_mode_without_keys_creates_sessions_without_services() {
        let creds = CredentialsConfig {
            mode: CredentialMode::Server,
            gemini_api_key: Some("gem".into()),
            sarvam_api_key: None,
        };
        let reg = registry(&creds);
        let id = reg.create().unwrap();
        let session = reg.get(id).unwrap();
        assert!(!lock(&session).unwrap().has_services());
    }

    #[test]
    fn test_interactive_credentials() {
        let reg = registry(&interactive_creds());
        let id = reg.create().unwrap();
        let session = reg.get(id).unwrap();
        assert!(!lock(&session).unwrap().has_services());

        let keys = ApiKeys::new("gem", "sar").unwrap();
        reg.set_credentials(id, &keys).unwrap();
        assert!(lock(&session).unwrap().has_services());
    }

    #[test]
    fn test_credentials_rejected_in_server_mode() {
        let reg = registry(&server_creds());
        let id = reg.create().unwrap();
        let keys = ApiKeys::new("gem", "sar").unwrap();
        assert!(matches!(
            reg.set_credentials(id, &keys),
            Err(ChatError::CredentialsManaged)
        ));
    }

    #[test]
    fn test_evict_idle() {
        let reg = registry(&server_creds());
        let stale = reg.create().unwrap();
        let fresh = reg.create().unwrap();

        let now = Utc::now();
        lock(&reg.get(stale).unwrap())
            .unwrap()
            .set_last_active(now - chrono::Duration::minutes(90));

        let evicted = reg
            .evict_idle_at(now, Duration::from_secs(60 * 60))
            .unwrap();
        assert_eq!(evicted, 1);
        assert!(reg.get(stale).is_err());
        assert!(reg.get(fresh).is_ok());
    }
}
