use crate::backend::Backend;
use crate::config::CrmConfig;
use crate::errors::{AppError, AppResult};
use crate::service::CrmService;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub user_id: String,
    pub org_id: Option<String>,
}

/// Which top-level view a visitor gets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "kebab-case")]
pub enum ViewGate {
    Landing,
    OrganizationSetup,
    Workspace { org_id: String },
}

impl ViewGate {
    pub fn resolve(principal: Option<&Principal>) -> Self {
        let Some(principal) = principal else {
            return Self::Landing;
        };
        match principal.org_id.as_deref().map(str::trim) {
            Some(org_id) if !org_id.is_empty() => Self::Workspace {
                org_id: org_id.to_string(),
            },
            _ => Self::OrganizationSetup,
        }
    }
}

/// Open workspaces keyed by session id. Each session owns its own service
/// and snapshot; nothing is shared between sessions except the backend.
#[derive(Clone)]
pub struct SessionManager {
    backend: Arc<dyn Backend>,
    config: CrmConfig,
    sessions: Arc<Mutex<HashMap<String, Arc<CrmService>>>>,
}

impl SessionManager {
    pub fn new(backend: Arc<dyn Backend>, config: CrmConfig) -> Self {
        Self {
            backend,
            config,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Opens a workspace for a principal that belongs to an organization and
    /// loads its data. No session is registered when the initial load fails.
    pub async fn open_session(&self, principal: &Principal) -> AppResult<(String, Arc<CrmService>)> {
        let org_id = match ViewGate::resolve(Some(principal)) {
            ViewGate::Workspace { org_id } => org_id,
            _ => {
                return Err(AppError::Validation(format!(
                    "user {} has no active organization",
                    principal.user_id
                )))
            }
        };

        let service = Arc::new(CrmService::new(
            self.backend.clone(),
            &org_id,
            &principal.user_id,
            self.config.clone(),
        ));
        if let Err(error) = service.refresh().await {
            tracing::warn!(org_id = %org_id, user_id = %principal.user_id, error = %error, "initial workspace load failed");
            return Err(error);
        }

        let session_id = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.lock().await;
        sessions.insert(session_id.clone(), service.clone());
        tracing::info!(session_id = %session_id, org_id = %org_id, "session opened");
        Ok((session_id, service))
    }

    pub async fn session(&self, session_id: &str) -> AppResult<Arc<CrmService>> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("No active session {}", session_id)))
    }

    pub async fn close_session(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.lock().await;
        sessions.remove(session_id).is_some()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
