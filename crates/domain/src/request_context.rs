//! Request Context - Propagación de contexto para trazabilidad
//!
//! Contexto inmutable que acompaña cada operación: quién la inicia y con qué
//! correlation_id se agrupan sus entradas de auditoría y sus logs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Caller identity as resolved by the authentication layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub username: String,
    /// Platform administrators bypass group storage checks and always get write access
    pub is_admin: bool,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            is_admin: false,
        }
    }

    pub fn admin(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            is_admin: true,
            ..Self::new(user_id, username)
        }
    }
}

/// Contexto de request para propagación de trazabilidad
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    correlation_id: String,
    /// Actor que inició la operación (usuario o "system")
    actor: Option<String>,
    started_at: chrono::DateTime<chrono::Utc>,
}

impl RequestContext {
    /// Crea un nuevo contexto con correlation_id generado automáticamente
    pub fn new() -> Self {
        Self {
            correlation_id: Uuid::new_v4().to_string(),
            actor: None,
            started_at: chrono::Utc::now(),
        }
    }

    /// Context for a request issued by an authenticated caller
    pub fn for_identity(identity: &Identity) -> Self {
        Self::new().actor(identity.user_id.clone())
    }

    /// Context for work the platform does on its own behalf
    pub fn system() -> Self {
        Self::new().actor("system")
    }

    pub fn with_correlation_id(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            actor: None,
            started_at: chrono::Utc::now(),
        }
    }

    /// Builder: establece el actor
    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn get_actor(&self) -> Option<&str> {
        self.actor.as_deref()
    }

    pub fn started_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.started_at
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RequestContext(correlation_id={}, actor={:?})",
            self.correlation_id, self.actor
        )
    }
}
