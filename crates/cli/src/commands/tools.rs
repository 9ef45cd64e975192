//! `linksort tools`: print the tool specs offered to the model.

use linksort_core::domain::User;
use linksort_store::InMemoryStore;
use linksort_tools::{ToolContext, default_registry};
use std::sync::Arc;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(InMemoryStore::new());
    let ctx = ToolContext::new(User::new("local", "me@localhost"), store.clone(), store);
    let registry = default_registry(ctx);
    println!("{}", serde_json::to_string_pretty(&registry.specs())?);
    Ok(())
}
