//! `delete_folder`: remove a folder and its subfolders.

use async_trait::async_trait;
use linksort_core::error::ToolError;
use linksort_core::tool::{Tool, ToolOutput, ToolSpec};
use tracing::info;

use crate::context::ToolContext;
use crate::input::{parse_object, required_str};

pub struct DeleteFolderTool {
    ctx: ToolContext,
}

impl DeleteFolderTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn run(&self, raw_input: &str) -> Result<String, ToolError> {
        let input = parse_object(raw_input)?;
        let folder_id = required_str(&input, "folder_id")?;

        let user = self.ctx.user().await;
        let updated = self.ctx.folders.delete_folder(&user, &folder_id).await?;
        self.ctx.set_user(updated).await;

        info!(folder_id = %folder_id, "Folder deleted by assistant");
        Ok(format!("Deleted folder {folder_id}."))
    }
}

#[async_trait]
impl Tool for DeleteFolderTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "delete_folder".into(),
            description: "Delete a folder and all of its subfolders. Links inside are kept and \
                moved back to the top level. Confirm with the user before deleting."
                .into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "folder_id": {
                        "type": "string",
                        "description": "The id of the folder to delete"
                    }
                },
                "required": ["folder_id"]
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
    use crate::test_support::{seeded, with_folder};

    #[tokio::test]
    async fn deletes_folder() {
        let (store, ctx, _) = seeded(&[]).await;
        let folder_id = with_folder(&store, &ctx, "Old").await;

        let input = serde_json::json!({ "folder_id": folder_id }).to_string();
        let out = DeleteFolderTool::new(ctx.clone()).invoke("t1", &input).await;

        assert!(out.is_success(), "{}", out.text);
        assert!(out.text.contains(&folder_id));
        assert!(ctx.user().await.folder_tree.children.is_empty());
    }

    #[tokio::test]
    async fn unknown_folder_is_reported() {
        let (_store, ctx, _) = seeded(&[]).await;
        let out = DeleteFolderTool::new(ctx).invoke("t1", r#"{"folder_id":"nope"}"#).await;
        assert_eq!(out.text, "folder not found");
    }
}
