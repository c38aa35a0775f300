//! Markdown export of approved ideas

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::domain::Idea;
use crate::store::IdeaStore;

/// Document heading
pub const EXPORT_TITLE: &str = "IX AI Approved Ideas";

/// Default file name for `ix export` without a path
pub const DEFAULT_EXPORT_FILE: &str = "IX_AI_Approved_Ideas.md";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No ideas to export")]
    Empty,

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Render ideas as a Markdown document, one section per idea
pub fn render_markdown(ideas: &[Idea]) -> String {
    debug!(count = ideas.len(), "render_markdown: called");
    let mut out = format!("# {}\n", EXPORT_TITLE);

    for idea in ideas {
        let revised = if idea.is_revised() { " (Revised)" } else { "" };
        let title = if idea.title.trim().is_empty() { "Untitled" } else { idea.title.as_str() };
        let description = if idea.description.trim().is_empty() {
            "No description"
        } else {
            idea.description.as_str()
        };

        let _ = write!(out, "\n## Idea #{}{}\n\n**{}**\n\n{}\n", idea.ordinal, revised, title, description);
        if !idea.rationale.trim().is_empty() {
            let _ = write!(out, "\n**Rationale:** {}\n", idea.rationale.trim());
        }
        if !idea.notes.trim().is_empty() {
            let _ = write!(out, "\n**Notes:** {}\n", idea.notes.trim());
        }
    }
    out
}

/// Write the session approvals merged with the stored archive to `path`
///
/// Returns the number of ideas written.
pub fn export_approved(store: &mut IdeaStore, path: &Path) -> Result<usize, ExportError> {
    debug!(path = %path.display(), "export_approved: called");
    let ideas = store.archived();
    write_markdown(&ideas, path)?;
    Ok(ideas.len())
}

/// Write ideas to `path` as Markdown; an empty list is refused
pub fn write_markdown(ideas: &[Idea], path: &Path) -> Result<(), ExportError> {
    if ideas.is_empty() {
        return Err(ExportError::Empty);
    }
    fs::write(path, render_markdown(ideas)).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), count = ideas.len(), "Exported ideas");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::APPROVED_KEY;
    use keystore::{KeyValueStore, MemoryStore};
    use tempfile::TempDir;

    #[test]
    fn test_render_sections() {
        let ideas = vec![
            Idea::new("Sock Drop", "Socks fall from the sky.", "Memorable.").with_ordinal(3),
            Idea::new("Sock Drop II", "Bigger socks.", "")
                .with_reaction("Made it bolder")
                .with_notes("Client loves it")
                .with_ordinal(1),
        ];
        let md = render_markdown(&ideas);
        assert!(md.starts_with("# IX AI Approved Ideas\n"));
        assert!(md.contains("## Idea #3\n\n**Sock Drop**\n\nSocks fall from the sky.\n"));
        assert!(md.contains("**Rationale:** Memorable."));
        assert!(md.contains("## Idea #1 (Revised)"));
        assert!(md.contains("**Notes:** Client loves it"));
        // empty rationale is omitted
        assert_eq!(md.matches("**Rationale:**").count(), 1);
    }

    #[test]
    fn test_render_placeholders() {
        let md = render_markdown(&[Idea::new("", " ", "R.").with_ordinal(1)]);
        assert!(md.contains("**Untitled**"));
        assert!(md.contains("No description"));
    }

    #[test]
    fn test_export_merges_archive_without_duplicates() {
        let mut kv = MemoryStore::new();
        let stored = vec![
            Idea::new("Old", "From last week.", "R."),
            Idea::new("Both", "Approved twice.", "R."),
        ];
        kv.set(APPROVED_KEY, &serde_json::to_string(&stored).unwrap()).unwrap();

        let mut store = IdeaStore::open(Box::new(kv));
        store.approve(Idea::new("Both", "Approved twice.", "R."), None);
        store.approve(Idea::new("New", "Today.", "R."), None);

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.md");
        assert_eq!(export_approved(&mut store, &path).unwrap(), 3);

        let md = std::fs::read_to_string(&path).unwrap();
        assert_eq!(md.matches("**Both**").count(), 1);
        assert!(md.contains("**Old**"));
        assert!(md.find("**New**").unwrap() < md.find("**Old**").unwrap());
    }

    #[test]
    fn test_export_empty_is_refused() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.md");
        assert!(matches!(write_markdown(&[], &path), Err(ExportError::Empty)));
        assert!(!path.exists());
    }
}
