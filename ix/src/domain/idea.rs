//! The idea record and its identity

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static BOLD_STARS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("valid regex"));
static BOLD_UNDERSCORE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"__(.*?)__").expect("valid regex"));
static ITALIC_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*(.*?)\*").expect("valid regex"));
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[(.*?)\]\(.*?\)").expect("valid regex"));

/// One generated creative concept
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Idea {
    /// Position assigned at parse time; never used as identity
    pub ordinal: u32,
    pub title: String,
    pub description: String,
    pub rationale: String,
    /// Present only on ideas revised in response to feedback
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reaction: Option<String>,
    /// User-authored notes
    pub notes: String,
}

impl Idea {
    pub fn new(title: impl Into<String>, description: impl Into<String>, rationale: impl Into<String>) -> Self {
        Self {
            ordinal: 0,
            title: title.into(),
            description: description.into(),
            rationale: rationale.into(),
            reaction: None,
            notes: String::new(),
        }
    }

    pub fn with_ordinal(mut self, ordinal: u32) -> Self {
        self.ordinal = ordinal;
        self
    }

    pub fn with_reaction(mut self, reaction: impl Into<String>) -> Self {
        self.reaction = Some(reaction.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// De-duplication key
    pub fn identity(&self) -> IdeaIdentity {
        IdeaIdentity {
            title: self.title.clone(),
            description: self.description.clone(),
            reaction: self.reaction.clone().unwrap_or_default(),
        }
    }

    /// Whether this idea answers earlier feedback
    pub fn is_revised(&self) -> bool {
        self.reaction.as_deref().is_some_and(|r| !r.trim().is_empty())
    }

    /// Canonical labeled block, parseable back into the same content
    pub fn to_block(&self) -> String {
        let mut lines = vec![
            format!("**Title:** {}", self.title),
            format!("**Description:** {}", self.description),
        ];
        if !self.rationale.is_empty() {
            lines.push(format!("**Rationale:** {}", self.rationale));
        }
        if let Some(reaction) = self.reaction.as_deref().filter(|r| !r.trim().is_empty()) {
            lines.push(format!("**Reaction to feedback:** {}", reaction));
        }
        lines.join("\n")
    }
}

/// (title, description, reaction) triple compared by exact string equality
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdeaIdentity {
    pub title: String,
    pub description: String,
    /// Empty when the idea has no reaction
    pub reaction: String,
}

impl std::fmt::Display for IdeaIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// Remove markdown emphasis and links from text pasted back from a chat UI
pub fn clean_pasted_notes(text: &str) -> String {
    let text = BOLD_STARS_RE.replace_all(text, "$1");
    let text = BOLD_UNDERSCORE_RE.replace_all(&text, "$1");
    let text = ITALIC_RE.replace_all(&text, "$1");
    let text = LINK_RE.replace_all(&text, "$1");
    text.trim().to_string()
}
