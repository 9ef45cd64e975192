//! Shared fixtures for tool tests.

use async_trait::async_trait;
use linksort_core::domain::{
    FolderController, FolderUpdate, Link, LinkController, LinkFilter, LinkUpdate, NewFolder, User,
};
use linksort_core::error::DomainError;
use linksort_store::{InMemoryStore, NewLink};
use std::sync::Arc;

use crate::context::ToolContext;

/// A store with one user and the given link titles saved in the root folder.
pub async fn seeded(titles: &[&str]) -> (InMemoryStore, ToolContext, Vec<Link>) {
    let store = InMemoryStore::new();
    let user = User::new("u1", "reader@example.com");
    store.put_user(user.clone()).await;

    let mut links = Vec::new();
    for title in titles {
        let link = store
            .save_link(
                &user,
                NewLink {
                    url: format!("https://example.com/{}", title.to_lowercase()),
                    title: title.to_string(),
                    description: String::new(),
                    site_name: "Example".into(),
                    is_favorite: false,
                },
            )
            .await;
        links.push(link);
    }

    let ctx = ToolContext::new(user, Arc::new(store.clone()), Arc::new(store.clone()));
    (store, ctx, links)
}

/// Creates a folder through the store and refreshes the context user.
pub async fn with_folder(store: &InMemoryStore, ctx: &ToolContext, name: &str) -> String {
    let user = store
        .create_folder(
            &ctx.user().await,
            &NewFolder {
                name: name.into(),
                parent_id: None,
            },
        )
        .await
        .unwrap();
    let id = user
        .folder_tree
        .children
        .iter()
        .find(|f| f.name == name)
        .map(|f| f.id.clone())
        .unwrap();
    ctx.set_user(user).await;
    id
}

/// Controller whose every call fails as if the database were down.
pub struct FailingController;

fn unavailable() -> DomainError {
    DomainError::Unavailable("db unavailable".into())
}

#[async_trait]
impl LinkController for FailingController {
    async fn get_links(&self, _user: &User, _filter: &LinkFilter) -> Result<Vec<Link>, DomainError> {
        Err(unavailable())
    }

    async fn get_link(&self, _user: &User, _id: &str) -> Result<Link, DomainError> {
        Err(unavailable())
    }

    async fn update_link(&self, _user: &User, _update: &LinkUpdate) -> Result<(Link, User), DomainError> {
        Err(unavailable())
    }
}

#[async_trait]
impl FolderController for FailingController {
    async fn create_folder(&self, _user: &User, _spec: &NewFolder) -> Result<User, DomainError> {
        Err(unavailable())
    }

    async fn update_folder(&self, _user: &User, _spec: &FolderUpdate) -> Result<User, DomainError> {
        Err(unavailable())
    }

    async fn delete_folder(&self, _user: &User, _id: &str) -> Result<User, DomainError> {
        Err(unavailable())
    }
}

pub fn failing() -> ToolContext {
    ToolContext::new(
        User::new("u1", "reader@example.com"),
        Arc::new(FailingController),
        Arc::new(FailingController),
    )
}
