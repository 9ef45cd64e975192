//! `rename_folder`: give an existing folder a new name.

use async_trait::async_trait;
use linksort_core::domain::FolderUpdate;
use linksort_core::error::ToolError;
use linksort_core::tool::{Tool, ToolOutput, ToolSpec};

use crate::context::ToolContext;
use crate::input::{parse_object, required_str};

pub struct RenameFolderTool {
    ctx: ToolContext,
}

impl RenameFolderTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn run(&self, raw_input: &str) -> Result<String, ToolError> {
        let input = parse_object(raw_input)?;
        let update = FolderUpdate {
            id: required_str(&input, "folder_id")?,
            name: Some(required_str(&input, "name")?),
            parent_id: None,
        };

        let user = self.ctx.user().await;
        let updated = self.ctx.folders.update_folder(&user, &update).await?;
        self.ctx.set_user(updated).await;

        Ok(format!(
            "Renamed folder {} to \"{}\".",
            update.id,
            update.name.unwrap_or_default()
        ))
    }
}

#[async_trait]
impl Tool for RenameFolderTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "rename_folder".into(),
            description: "Rename an existing folder.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "folder_id": {
                        "type": "string",
                        "description": "The id of the folder to rename"
                    },
                    "name": {
                        "type": "string",
                        "description": "The new folder name"
                    }
                },
                "required": ["folder_id", "name"]
            }),
        }
    }

    async fn invoke(&self, _invocation_id: &str, raw_input: &str) -> ToolOutput {
        self.run(raw_input).await.into()
    }
}
