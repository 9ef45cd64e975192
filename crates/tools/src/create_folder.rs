//! `create_folder`: add a folder to the user's folder tree.

use async_trait::async_trait;
use linksort_core::domain::NewFolder;
use linksort_core::error::ToolError;
use linksort_core::tool::{Tool, ToolOutput, ToolSpec};
use tracing::info;

use crate::context::ToolContext;
use crate::input::{optional_str, parse_object, required_str};

pub struct CreateFolderTool {
    ctx: ToolContext,
}

impl CreateFolderTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn run(&self, raw_input: &str) -> Result<String, ToolError> {
        let input = parse_object(raw_input)?;
        let spec = NewFolder {
            name: required_str(&input, "name")?,
            parent_id: optional_str(&input, "parent_id")?,
        };

        let user = self.ctx.user().await;
        let before = user.folder_tree.subtree_ids();
        let updated = self.ctx.folders.create_folder(&user, &spec).await?;
        let new_id = updated
            .folder_tree
            .subtree_ids()
            .into_iter()
            .find(|id| !before.contains(id));
        self.ctx.set_user(updated).await;

        info!(name = %spec.name, folder_id = ?new_id, "Folder created by assistant");
        Ok(match new_id {
            Some(id) => format!("Created folder \"{}\" with id {id}.", spec.name),
            None => format!("Created folder \"{}\".", spec.name),
        })
    }
}

#[async_trait]
impl Tool for CreateFolderTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "create_folder".into(),
            description: "Create a new folder for organizing links. Folders can be nested by \
                giving a parent folder id."
                .into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "name": {
                        "type": "string",
                        "description": "Name of the new folder"
                    },
                    "parent_id": {
                        "type": "string",
                        "description": "Id of the parent folder. Defaults to the top level."
                    }
                },
                "required": ["name"]
            }),
        }
    }

    async fn invoke(&self, _invocation_id: &str, raw_input: &str) -> ToolOutput {
        self.run(raw_input).await.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{failing, seeded};

    #[tokio::test]
    async fn creates_folder_and_reports_its_id() {
        let (store, ctx, _) = seeded(&[]).await;
        let out = CreateFolderTool::new(ctx.clone())
            .invoke("t1", r#"{"name": "Recipes"}"#)
            .await;
        assert!(out.is_success(), "{}", out.text);

        let stored = store.user("u1").await.unwrap();
        let folder = &stored.folder_tree.children[0];
        assert_eq!(folder.name, "Recipes");
        assert!(out.text.contains(&folder.id));
        // The context sees the new tree too.
        assert_eq!(ctx.user().await.folder_tree.children.len(), 1);
    }

    #[tokio::test]
    async fn name_is_required() {
        let (_store, ctx, _) = seeded(&[]).await;
        let out = CreateFolderTool::new(ctx).invoke("t1", r#"{"parent_id": "root"}"#).await;
        assert_eq!(out.text, "The 'name' field is required.");
    }

    #[tokio::test]
    async fn unknown_parent_is_reported() {
        let (_store, ctx, _) = seeded(&[]).await;
        let out = CreateFolderTool::new(ctx)
            .invoke("t1", r#"{"name": "Recipes", "parent_id": "nope"}"#)
            .await;
        assert!(!out.is_success());
        assert_eq!(out.text, "parent folder not found");
    }

    #[tokio::test]
    async fn controller_failure_is_an_error_result() {
        let out = CreateFolderTool::new(failing())
            .invoke("t1", r#"{"name": "Recipes"}"#)
            .await;
        assert_eq!(out.text, "db unavailable");
    }
}
