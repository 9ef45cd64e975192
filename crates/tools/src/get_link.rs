//! `get_link`: fetch one saved link by id.

use async_trait::async_trait;
use linksort_core::error::ToolError;
use linksort_core::tool::{Tool, ToolOutput, ToolSpec};

use crate::context::ToolContext;
use crate::input::{parse_object, required_str, to_json};

pub struct GetLinkTool {
    ctx: ToolContext,
}

impl GetLinkTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn run(&self, raw_input: &str) -> Result<String, ToolError> {
        let input = parse_object(raw_input)?;
        let link_id = required_str(&input, "link_id")?;

        let user = self.ctx.user().await;
        let link = self.ctx.links.get_link(&user, &link_id).await?;
        to_json(&link)
    }
}

#[async_trait]
impl Tool for GetLinkTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "get_link".into(),
            description: "Get the full details of a single saved link by its id.".into(),
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
