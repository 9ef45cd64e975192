//! System prompt construction.

use linksort_core::domain::{Folder, User};
use std::fmt::Write;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are the Linksort assistant. Linksort is a \
bookmark manager: users save links and organise them into nested folders. Help the user \
find, review and organise their saved links using the tools available to you. Prefer \
looking things up with tools over guessing. Folder and link ids are opaque strings; \
always use the ids returned by tools or listed below. Ask before deleting anything. \
Keep answers short.";

/// The base prompt followed by the user's current folder tree.
pub fn system_prompt(base: &str, user: &User) -> String {
    let mut prompt = base.trim_end().to_string();
    prompt.push_str("\n\n## Folders\n");
    if user.folder_tree.children.is_empty() {
        prompt.push_str("The user has no folders yet. All links are unfiled (folder id \"root\").\n");
    } else {
        prompt.push_str("Unfiled links live in the root folder (id \"root\").\n");
        for child in &user.folder_tree.children {
            render(&mut prompt, child, 0);
        }
    }
    prompt
}

fn render(out: &mut String, folder: &Folder, depth: usize) {
    // Writing into a String cannot fail.
    let _ = writeln!(out, "{}- {} (id: {})", "  ".repeat(depth), folder.name, folder.id);
    for child in &folder.children {
        render(out, child, depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_nested_folders_with_ids() {
        let mut user = User::new("u1", "reader@example.com");
        user.folder_tree.children.push(Folder {
            id: "f1".into(),
            name: "Reading".into(),
            children: vec![Folder {
                id: "f2".into(),
                name: "Rust".into(),
                children: vec![],
            }],
        });

        let prompt = system_prompt(DEFAULT_SYSTEM_PROMPT, &user);
        assert!(prompt.starts_with("You are the Linksort assistant."));
        assert!(prompt.contains("- Reading (id: f1)\n  - Rust (id: f2)"));
    }

    #[test]
    fn empty_tree_is_mentioned() {
        let user = User::new("u1", "reader@example.com");
        assert!(system_prompt("Base.", &user).contains("no folders yet"));
    }
}
