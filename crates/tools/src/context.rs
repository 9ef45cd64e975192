//! Shared state handed to every tool of one assistant run.

use linksort_core::domain::{FolderController, LinkController, User};
use std::sync::Arc;
use tokio::sync::RwLock;

/// The acting user plus the controllers tools call into.
///
/// Tools that change the user (folder edits) store the returned user here
/// so later tool calls in the same run see the new folder tree.
#[derive(Clone)]
pub struct ToolContext {
    user: Arc<RwLock<User>>,
    pub links: Arc<dyn LinkController>,
    pub folders: Arc<dyn FolderController>,
}

impl ToolContext {
    pub fn new(
        user: User,
        links: Arc<dyn LinkController>,
        folders: Arc<dyn FolderController>,
    ) -> Self {
        Self {
            user: Arc::new(RwLock::new(user)),
            links,
            folders,
        }
    }

    /// Snapshot of the acting user.
    pub async fn user(&self) -> User {
        self.user.read().await.clone()
    }

    pub async fn set_user(&self, user: User) {
        *self.user.write().await = user;
    }
}
