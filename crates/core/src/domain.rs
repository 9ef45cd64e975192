//! Link library domain types and the controller traits tools call into.
//!
//! Controllers are implemented elsewhere (a document store in production,
//! [`linksort-store`] in tests and the CLI). They must be safe to share
//! across concurrently running conversations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Id of the implicit top-level folder. Links filed here are "unfiled".
pub const ROOT_FOLDER_ID: &str = "root";

/// A saved bookmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: String,
    pub user_id: String,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub site_name: String,
    pub folder_id: String,
    #[serde(default)]
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A node in a user's folder tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub children: Vec<Folder>,
}

impl Folder {
    /// The empty root every folder tree starts from.
    pub fn root() -> Self {
        Self {
            id: ROOT_FOLDER_ID.into(),
            name: "root".into(),
            children: Vec::new(),
        }
    }

    /// Depth-first search for a folder by id, including `self`.
    pub fn find(&self, id: &str) -> Option<&Folder> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Folder> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    /// Ids of this folder and every descendant.
    pub fn subtree_ids(&self) -> Vec<String> {
        let mut ids = vec![self.id.clone()];
        for child in &self.children {
            ids.extend(child.subtree_ids());
        }
        ids
    }
}

/// An account and its folder tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub folder_tree: Folder,
}

impl User {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            first_name: String::new(),
            last_name: String::new(),
            folder_tree: Folder::root(),
        }
    }
}

/// Which links `get_links` should return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub favorites_only: bool,
    /// Case-insensitive substring match on title, url and description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Zero-based page index
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

pub const DEFAULT_PAGE_SIZE: u32 = 20;

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for LinkFilter {
    fn default() -> Self {
        Self {
            folder_id: None,
            favorites_only: false,
            search: None,
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Partial update of a link. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkUpdate {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFolder {
    pub name: String,
    /// Defaults to the root folder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

/// Rename and/or move a folder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderUpdate {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

/// Link operations the assistant's tools may perform.
#[async_trait]
pub trait LinkController: Send + Sync {
    async fn get_links(&self, user: &User, filter: &LinkFilter) -> Result<Vec<Link>, DomainError>;

    async fn get_link(&self, user: &User, id: &str) -> Result<Link, DomainError>;

    /// Returns the updated link and the (possibly changed) user.
    async fn update_link(&self, user: &User, update: &LinkUpdate) -> Result<(Link, User), DomainError>;
}

/// Folder operations. Each returns the user with its updated folder tree.
#[async_trait]
pub trait FolderController: Send + Sync {
    async fn create_folder(&self, user: &User, spec: &NewFolder) -> Result<User, DomainError>;

    async fn update_folder(&self, user: &User, spec: &FolderUpdate) -> Result<User, DomainError>;

    async fn delete_folder(&self, user: &User, id: &str) -> Result<User, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Folder {
        Folder {
            id: ROOT_FOLDER_ID.into(),
            name: "root".into(),
            children: vec![Folder {
                id: "f1".into(),
                name: "Reading".into(),
                children: vec![Folder {
                    id: "f2".into(),
                    name: "Rust".into(),
                    children: vec![],
                }],
            }],
        }
    }

    #[test]
    fn find_nested_folder() {
        let root = tree();
        assert_eq!(root.find("f2").map(|f| f.name.as_str()), Some("Rust"));
        assert!(root.find("missing").is_none());
    }

    #[test]
    fn subtree_ids_are_depth_first() {
        let root = tree();
        assert_eq!(root.find("f1").unwrap().subtree_ids(), vec!["f1", "f2"]);
    }

    #[test]
    fn link_filter_defaults() {
        let filter: LinkFilter = serde_json::from_str("{}").unwrap();
        assert_eq!(filter, LinkFilter::default());
        assert_eq!(filter.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn user_serializes_camel_case() {
        let user = User::new("u1", "a@example.com");
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["folderTree"]["id"], ROOT_FOLDER_ID);
    }
}
