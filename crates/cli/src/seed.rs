//! Loading a local link library from a JSON seed file.
//!
//! ```json
//! {
//!   "user": { "id": "u1", "email": "me@example.com", "folderTree": { "id": "root", "name": "root" } },
//!   "links": [{ "url": "https://example.com", "title": "Example", "folderId": "f1" }]
//! }
//! ```

use linksort_core::domain::{LinkController, LinkUpdate, User};
use linksort_store::{InMemoryStore, NewLink};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct SeedFile {
    user: User,
    #[serde(default)]
    links: Vec<SeedLink>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedLink {
    #[serde(flatten)]
    link: NewLink,
    /// Folder to file the link in; unfiled when absent
    #[serde(default)]
    folder_id: Option<String>,
}

/// The user every session gets when no seed file is given.
pub fn default_user() -> User {
    User::new("local", "me@localhost")
}

/// Load `path` into `store` and return the seeded user.
pub async fn load(store: &InMemoryStore, path: &Path) -> Result<User, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read seed file {}: {e}", path.display()))?;
    let seed: SeedFile = serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse seed file {}: {e}", path.display()))?;
    apply(store, seed).await
}

async fn apply(store: &InMemoryStore, seed: SeedFile) -> Result<User, Box<dyn std::error::Error>> {
    let user = seed.user;
    store.put_user(user.clone()).await;

    for entry in seed.links {
        let link = store.save_link(&user, entry.link).await;
        if let Some(folder_id) = entry.folder_id {
            let update = LinkUpdate {
                id: link.id,
                folder_id: Some(folder_id),
                ..LinkUpdate::default()
            };
            store.update_link(&user, &update).await?;
        }
    }

    tracing::info!(user = %user.id, "Seeded link library");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use linksort_core::domain::{LinkFilter, ROOT_FOLDER_ID};
    use std::io::Write;

    const SEED: &str = r#"{
        "user": {
            "id": "u1",
            "email": "reader@example.com",
            "folderTree": {
                "id": "root",
                "name": "root",
                "children": [{ "id": "f1", "name": "Rust" }]
            }
        },
        "links": [
            { "url": "https://doc.rust-lang.org/book", "title": "The Book", "folderId": "f1" },
            { "url": "https://news.ycombinator.com", "title": "HN", "isFavorite": true }
        ]
    }"#;

    #[tokio::test]
    async fn seed_files_links_into_folders() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SEED.as_bytes()).unwrap();

        let store = InMemoryStore::new();
        let user = load(&store, file.path()).await.unwrap();
        assert_eq!(user.id, "u1");

        let links = store.get_links(&user, &LinkFilter::default()).await.unwrap();
        assert_eq!(links.len(), 2);
        let book = links.iter().find(|l| l.title == "The Book").unwrap();
        assert_eq!(book.folder_id, "f1");
        let hn = links.iter().find(|l| l.title == "HN").unwrap();
        assert_eq!(hn.folder_id, ROOT_FOLDER_ID);
        assert!(hn.is_favorite);
    }

    #[tokio::test]
    async fn unknown_folder_in_seed_is_an_error() {
        let seed: SeedFile = serde_json::from_str(
            r#"{ "user": { "id": "u1", "email": "a@b.c", "folderTree": { "id": "root", "name": "root" } },
                 "links": [{ "url": "https://x.dev", "folderId": "nope" }] }"#,
        )
        .unwrap();
        let store = InMemoryStore::new();
        assert!(apply(&store, seed).await.is_err());
    }

    #[tokio::test]
    async fn missing_seed_file_is_reported() {
        let store = InMemoryStore::new();
        let err = load(&store, Path::new("/nonexistent/seed.json")).await.unwrap_err();
        assert!(err.to_string().contains("Failed to read seed file"));
    }
}
