//! `add_link_to_folder` and `remove_link_from_folder`.
//!
//! Both are thin wrappers over [`LinkController::update_link`] that only
//! touch the link's folder. "Removing" a link from a folder files it back
//! under the root folder; links are never deleted by the assistant.
//!
//! [`LinkController::update_link`]: linksort_core::domain::LinkController::update_link

use async_trait::async_trait;
use linksort_core::domain::{LinkUpdate, ROOT_FOLDER_ID};
use linksort_core::error::ToolError;
use linksort_core::tool::{Tool, ToolOutput, ToolSpec};
use tracing::debug;

use crate::context::ToolContext;
use crate::input::{parse_object, required_str};

async fn move_link(ctx: &ToolContext, link_id: String, folder_id: String) -> Result<String, ToolError> {
    let user = ctx.user().await;
    let update = LinkUpdate {
        id: link_id,
        folder_id: Some(folder_id),
        ..LinkUpdate::default()
    };
    let (link, updated) = ctx.links.update_link(&user, &update).await?;
    ctx.set_user(updated).await;

    debug!(link_id = %link.id, folder_id = %link.folder_id, "Link moved by assistant");
    Ok(if link.folder_id == ROOT_FOLDER_ID {
        format!("Removed link \"{}\" from its folder.", link.title)
    } else {
        format!("Added link \"{}\" to folder {}.", link.title, link.folder_id)
    })
}

pub struct AddLinkToFolderTool {
    ctx: ToolContext,
}

impl AddLinkToFolderTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn run(&self, raw_input: &str) -> Result<String, ToolError> {
        let input = parse_object(raw_input)?;
        let link_id = required_str(&input, "link_id")?;
        let folder_id = required_str(&input, "folder_id")?;
        move_link(&self.ctx, link_id, folder_id).await
    }
}

#[async_trait]
impl Tool for AddLinkToFolderTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "add_link_to_folder".into(),
            description: "Move a link into a folder. A link lives in exactly one folder, so this \
                replaces its current folder."
                .into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "link_id": {
                        "type": "string",
                        "description": "The id of the link to move"
                    },
                    "folder_id": {
                        "type": "string",
                        "description": "The id of the destination folder"
                    }
                },
                "required": ["link_id", "folder_id"]
            }),
        }
    }

    async fn invoke(&self, _invocation_id: &str, raw_input: &str) -> ToolOutput {
        self.run(raw_input).await.into()
    }
}

pub struct RemoveLinkFromFolderTool {
    ctx: ToolContext,
}

impl RemoveLinkFromFolderTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn run(&self, raw_input: &str) -> Result<String, ToolError> {
        let input = parse_object(raw_input)?;
        let link_id = required_str(&input, "link_id")?;
        move_link(&self.ctx, link_id, ROOT_FOLDER_ID.to_string()).await
    }
}

#[async_trait]
impl Tool for RemoveLinkFromFolderTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "remove_link_from_folder".into(),
            description: "Take a link out of its folder. The link itself is kept and becomes \
                unfiled."
                .into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "link_id": {
                        "type": "string",
                        "description": "The id of the link"
                    }
                },
                "required": ["link_id"]
            }),
        }
    }

    async fn invoke(&self, _invocation_id: &str, raw_input: &str) -> ToolOutput {
        self.run(raw_input).await.into()
    }
}
