//! Built-in tools for the Linksort assistant.
//!
//! Each tool is a thin adapter over one domain-controller call: parse the
//! model's JSON input, validate required fields, call the controller and
//! render the result (or the controller's error) as text for the model.

pub mod context;
pub mod create_folder;
pub mod delete_folder;
pub mod get_link;
pub mod get_links;
pub mod input;
pub mod link_folder;
pub mod rename_folder;

#[cfg(test)]
mod test_support;

pub use context::ToolContext;

use linksort_core::tool::ToolRegistry;

/// Create a registry holding every link and folder tool, bound to `ctx`.
pub fn default_registry(ctx: ToolContext) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(get_links::GetLinksTool::new(ctx.clone())));
    registry.register(Box::new(get_link::GetLinkTool::new(ctx.clone())));
    registry.register(Box::new(create_folder::CreateFolderTool::new(ctx.clone())));
    registry.register(Box::new(rename_folder::RenameFolderTool::new(ctx.clone())));
    registry.register(Box::new(delete_folder::DeleteFolderTool::new(ctx.clone())));
    registry.register(Box::new(link_folder::AddLinkToFolderTool::new(ctx.clone())));
    registry.register(Box::new(link_folder::RemoveLinkFromFolderTool::new(ctx)));
    registry
}
