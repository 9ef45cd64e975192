//! In-memory store: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use chrono::Utc;
use linksort_core::domain::{
    Folder, FolderController, FolderUpdate, Link, LinkController, LinkFilter, LinkUpdate,
    NewFolder, ROOT_FOLDER_ID, User,
};
use linksort_core::error::DomainError;
use linksort_core::message::{ConversationId, Message};
use linksort_core::store::ConversationStore;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// A link to seed the store with.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLink {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub site_name: String,
    #[serde(default)]
    pub is_favorite: bool,
}

#[derive(Default)]
struct State {
    users: HashMap<String, User>,
    links: Vec<Link>,
    conversations: HashMap<String, Vec<Message>>,
}

impl State {
    fn user(&self, id: &str) -> Result<&User, DomainError> {
        self.users
            .get(id)
            .ok_or_else(|| DomainError::NotFound("user not found".into()))
    }

    fn user_mut(&mut self, id: &str) -> Result<&mut User, DomainError> {
        self.users
            .get_mut(id)
            .ok_or_else(|| DomainError::NotFound("user not found".into()))
    }
}

/// An in-memory link library and conversation store.
///
/// Cloning is cheap and clones share state, so one store can back several
/// concurrent conversations.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user.
    pub async fn put_user(&self, user: User) {
        self.state.write().await.users.insert(user.id.clone(), user);
    }

    /// Current stored version of a user.
    pub async fn user(&self, id: &str) -> Option<User> {
        self.state.read().await.users.get(id).cloned()
    }

    /// Save a link into the user's root folder.
    pub async fn save_link(&self, user: &User, link: NewLink) -> Link {
        let now = Utc::now();
        let link = Link {
            id: Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            url: link.url,
            title: link.title,
            description: link.description,
            site_name: link.site_name,
            folder_id: ROOT_FOLDER_ID.into(),
            is_favorite: link.is_favorite,
            created_at: now,
            updated_at: now,
        };
        self.state.write().await.links.push(link.clone());
        link
    }
}

/// Remove the folder with `id` from anywhere below `parent`.
fn detach(parent: &mut Folder, id: &str) -> Option<Folder> {
    if let Some(pos) = parent.children.iter().position(|c| c.id == id) {
        return Some(parent.children.remove(pos));
    }
    parent.children.iter_mut().find_map(|c| detach(c, id))
}

fn matches_filter(link: &Link, filter: &LinkFilter) -> bool {
    if let Some(folder_id) = &filter.folder_id {
        if &link.folder_id != folder_id {
            return false;
        }
    }
    if filter.favorites_only && !link.is_favorite {
        return false;
    }
    if let Some(search) = &filter.search {
        let needle = search.to_lowercase();
        let hit = [&link.title, &link.url, &link.description]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle));
        if !hit {
            return false;
        }
    }
    true
}

#[async_trait]
impl LinkController for InMemoryStore {
    async fn get_links(&self, user: &User, filter: &LinkFilter) -> Result<Vec<Link>, DomainError> {
        let state = self.state.read().await;
        state.user(&user.id)?;

        let mut links: Vec<Link> = state
            .links
            .iter()
            .filter(|l| l.user_id == user.id && matches_filter(l, filter))
            .cloned()
            .collect();
        links.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let size = filter.page_size.max(1) as usize;
        Ok(links
            .into_iter()
            .skip(filter.page as usize * size)
            .take(size)
            .collect())
    }

    async fn get_link(&self, user: &User, id: &str) -> Result<Link, DomainError> {
        let state = self.state.read().await;
        state
            .links
            .iter()
            .find(|l| l.id == id && l.user_id == user.id)
            .cloned()
            .ok_or_else(|| DomainError::NotFound("link not found".into()))
    }

    async fn update_link(&self, user: &User, update: &LinkUpdate) -> Result<(Link, User), DomainError> {
        let mut state = self.state.write().await;
        let stored_user = state.user(&user.id)?.clone();

        if let Some(folder_id) = &update.folder_id {
            if stored_user.folder_tree.find(folder_id).is_none() {
                return Err(DomainError::NotFound("folder not found".into()));
            }
        }

        let link = state
            .links
            .iter_mut()
            .find(|l| l.id == update.id && l.user_id == user.id)
            .ok_or_else(|| DomainError::NotFound("link not found".into()))?;

        if let Some(folder_id) = &update.folder_id {
            link.folder_id = folder_id.clone();
        }
        if let Some(title) = &update.title {
            link.title = title.clone();
        }
        if let Some(description) = &update.description {
            link.description = description.clone();
        }
        if let Some(is_favorite) = update.is_favorite {
            link.is_favorite = is_favorite;
        }
        link.updated_at = Utc::now();

        debug!(link_id = %link.id, folder_id = %link.folder_id, "Link updated");
        Ok((link.clone(), stored_user))
    }
}

#[async_trait]
impl FolderController for InMemoryStore {
    async fn create_folder(&self, user: &User, spec: &NewFolder) -> Result<User, DomainError> {
        let name = spec.name.trim();
        if name.is_empty() {
            return Err(DomainError::Invalid("folder name cannot be empty".into()));
        }

        let mut state = self.state.write().await;
        let stored = state.user_mut(&user.id)?;
        let parent_id = spec.parent_id.as_deref().unwrap_or(ROOT_FOLDER_ID);
        let parent = stored
            .folder_tree
            .find_mut(parent_id)
            .ok_or_else(|| DomainError::NotFound("parent folder not found".into()))?;

        parent.children.push(Folder {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            children: Vec::new(),
        });
        Ok(stored.clone())
    }

    async fn update_folder(&self, user: &User, spec: &FolderUpdate) -> Result<User, DomainError> {
        if spec.id == ROOT_FOLDER_ID {
            return Err(DomainError::Invalid("the root folder cannot be changed".into()));
        }

        let mut state = self.state.write().await;
        let stored = state.user_mut(&user.id)?;
        let folder = stored
            .folder_tree
            .find(&spec.id)
            .ok_or_else(|| DomainError::NotFound("folder not found".into()))?;

        if let Some(parent_id) = &spec.parent_id {
            if folder.find(parent_id).is_some() {
                return Err(DomainError::Invalid(
                    "a folder cannot be moved into itself".into(),
                ));
            }
            if stored.folder_tree.find(parent_id).is_none() {
                return Err(DomainError::NotFound("parent folder not found".into()));
            }
        }
        if let Some(name) = &spec.name {
            if name.trim().is_empty() {
                return Err(DomainError::Invalid("folder name cannot be empty".into()));
            }
        }

        if let Some(parent_id) = &spec.parent_id {
            if let Some(moved) = detach(&mut stored.folder_tree, &spec.id) {
                if let Some(parent) = stored.folder_tree.find_mut(parent_id) {
                    parent.children.push(moved);
                }
            }
        }
        if let Some(name) = &spec.name {
            if let Some(folder) = stored.folder_tree.find_mut(&spec.id) {
                folder.name = name.trim().to_string();
            }
        }
        Ok(stored.clone())
    }

    async fn delete_folder(&self, user: &User, id: &str) -> Result<User, DomainError> {
        if id == ROOT_FOLDER_ID {
            return Err(DomainError::Invalid("the root folder cannot be deleted".into()));
        }

        let mut state = self.state.write().await;
        let stored = state.user_mut(&user.id)?;
        let removed = detach(&mut stored.folder_tree, id)
            .ok_or_else(|| DomainError::NotFound("folder not found".into()))?;
        let updated = stored.clone();

        // Links in the removed subtree fall back to the root folder.
        let orphaned = removed.subtree_ids();
        for link in state
            .links
            .iter_mut()
            .filter(|l| l.user_id == user.id && orphaned.contains(&l.folder_id))
        {
            link.folder_id = ROOT_FOLDER_ID.into();
        }
        Ok(updated)
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn load(&self, id: &ConversationId) -> Result<Vec<Message>, DomainError> {
        let state = self.state.read().await;
        Ok(state.conversations.get(&id.0).cloned().unwrap_or_default())
    }

    async fn append(&self, id: &ConversationId, messages: &[Message]) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        state
            .conversations
            .entry(id.0.clone())
            .or_default()
            .extend_from_slice(messages);
        Ok(())
    }
}
