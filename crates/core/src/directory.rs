//! In-memory user directory, filled once at startup from the workspace.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use crate::errors::IntegrationError;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub status_text: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
}

impl UserProfile {
    pub fn preferred_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or_else(|| self.real_name.as_deref().filter(|name| !name.is_empty()))
            .unwrap_or(self.name.as_str())
    }
}

#[async_trait]
pub trait UserDirectorySource: Send + Sync {
    async fn channel_members(&self, channel_id: &str)
        -> Result<Vec<UserProfile>, IntegrationError>;
}

/// Process-wide cache keyed by user id. Refreshes replace the whole map.
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: RwLock<HashMap<String, UserProfile>>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn refresh<S>(&self, source: &S, channel_id: &str) -> Result<usize, IntegrationError>
    where
        S: UserDirectorySource + ?Sized,
    {
        let members = source.channel_members(channel_id).await?;
        let users: HashMap<String, UserProfile> =
            members.into_iter().map(|user| (user.id.clone(), user)).collect();
        let count = users.len();
        *self.users.write().await = users;

        info!(
            event_name = "directory.refresh.completed",
            channel_id = %channel_id,
            user_count = count,
            "user directory refreshed"
        );
        Ok(count)
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}
