//! Application session: the authenticated user and the task registry

use crate::sync::TaskRegistry;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An authenticated field worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_name: String,
    pub organisation: Option<String>,
    pub device_name: String,
    pub logged_in_at: DateTime<Utc>,
}

impl User {
    pub fn new(user_name: &str) -> Self {
        Self {
            user_name: user_name.to_string(),
            organisation: None,
            device_name: get_device_name(),
            logged_in_at: Utc::now(),
        }
    }

    pub fn with_organisation(mut self, organisation: &str) -> Self {
        self.organisation = Some(organisation.to_string());
        self
    }
}

/// Device label based on hostname
fn get_device_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "Field Device".to_string())
}

/// State that lives as long as the application process.
///
/// Shells come and go on rotation or restart; the session, and with it the
/// running sync, survives them.
#[derive(Default)]
pub struct Session {
    current_user: RwLock<Option<User>>,
    registry: Arc<TaskRegistry>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn current_user(&self) -> Option<User> {
        self.current_user.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user.read().is_some()
    }

    pub fn set_current_user(&self, user: Option<User>) {
        match &user {
            Some(u) => tracing::info!("User {} logged in on {}", u.user_name, u.device_name),
            None => tracing::debug!("Current user cleared"),
        }
        *self.current_user.write() = user;
    }

    /// Clear the user, returning who was logged in
    pub fn take_current_user(&self) -> Option<User> {
        self.current_user.write().take()
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }
}
