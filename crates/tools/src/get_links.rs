//! `get_links`: list the user's saved links.

use async_trait::async_trait;
use linksort_core::domain::{DEFAULT_PAGE_SIZE, LinkFilter};
use linksort_core::error::ToolError;
use linksort_core::tool::{Tool, ToolOutput, ToolSpec};
use tracing::debug;

use crate::context::ToolContext;
use crate::input::{optional_bool, optional_str, optional_u32, parse_object, to_json};

/// Upper bound on links returned in one call, to keep tool results small.
const MAX_PAGE_SIZE: u32 = 50;

pub struct GetLinksTool {
    ctx: ToolContext,
}

impl GetLinksTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn run(&self, raw_input: &str) -> Result<String, ToolError> {
        let input = parse_object(raw_input)?;
        let filter = LinkFilter {
            folder_id: optional_str(&input, "folder_id")?,
            favorites_only: optional_bool(&input, "favorites_only")?.unwrap_or(false),
            search: optional_str(&input, "search")?,
            page: optional_u32(&input, "page")?.unwrap_or(0),
            page_size: optional_u32(&input, "page_size")?
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        };

        let user = self.ctx.user().await;
        let links = self.ctx.links.get_links(&user, &filter).await?;
        debug!(count = links.len(), "get_links returned");
        to_json(&links)
    }
}

#[async_trait]
impl Tool for GetLinksTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "get_links".into(),
            description: "List the user's saved links, newest first. Optionally filter by folder, \
                favorites, or a search term matched against title, URL and description."
                .into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "folder_id": {
                        "type": "string",
                        "description": "Only return links in this folder. Use \"root\" for unfiled links."
                    },
                    "favorites_only": {
                        "type": "boolean",
                        "description": "Only return links marked as favorite"
                    },
                    "search": {
                        "type": "string",
                        "description": "Case-insensitive text to search for"
                    },
                    "page": {
                        "type": "integer",
                        "description": "Zero-based page number (default 0)",
                        "minimum": 0
                    },
                    "page_size": {
                        "type": "integer",
                        "description": "Links per page (default 20, max 50)",
                        "minimum": 1,
                        "maximum": MAX_PAGE_SIZE
                    }
                }
            }),
        }
    }

    async fn invoke(&self, _invocation_id: &str, raw_input: &str) -> ToolOutput {
        self.run(raw_input).await.into()
    }
}
