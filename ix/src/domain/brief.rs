//! Creative brief and idea-type inference

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Output types that get the specialized output contract, checked in order
pub const SPECIFIC_IDEA_TYPES: [&str; 7] = ["tagline", "name", "headline", "stunt", "slogan", "motto", "catchphrase"];

/// Marker that begins the brief body in a pasted prompt
const BRIEF_START_MARKER: &str = "Type of idea:";

/// Prefixes of prompt-instruction lines that must not leak back into a brief
const PROMPT_LINE_PREFIXES: [&str; 7] = [
    "You are",
    "Instructions for Creative Output",
    "- Generate",
    "- Focus",
    "- Draw",
    "- Ensure",
    "- Avoid",
];

/// Optional structured fields of a brief
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BriefFields {
    #[serde(rename = "idea-type")]
    pub idea_type: String,
    #[serde(rename = "brand-product")]
    pub brand_product: String,
    #[serde(rename = "target-audience")]
    pub target_audience: String,
    pub message: String,
    #[serde(rename = "additional-info")]
    pub additional_info: String,
}

impl BriefFields {
    /// True when every field is blank
    pub fn is_empty(&self) -> bool {
        self.labeled().iter().all(|(_, value)| value.trim().is_empty())
    }

    fn labeled(&self) -> [(&'static str, &str); 5] {
        [
            ("Idea type", &self.idea_type),
            ("Brand/product", &self.brand_product),
            ("Target audience", &self.target_audience),
            ("Message", &self.message),
            ("Additional info", &self.additional_info),
        ]
    }

    /// `Label: value` lines for every non-blank field
    pub fn lines(&self) -> Vec<String> {
        self.labeled()
            .iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(label, value)| format!("{}: {}", label, value.trim()))
            .collect()
    }
}

/// Free text plus optional structured fields describing what to generate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreativeBrief {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub fields: BriefFields,
}

impl CreativeBrief {
    /// Brief from free text only
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            fields: BriefFields::default(),
        }
    }

    /// Brief assembled from structured fields alone; `None` when every field is blank
    pub fn from_fields(fields: BriefFields) -> Option<Self> {
        debug!(?fields, "CreativeBrief::from_fields: called");
        if fields.is_empty() {
            debug!("CreativeBrief::from_fields: all fields blank");
            return None;
        }
        Some(Self {
            text: String::new(),
            fields,
        })
    }

    pub fn with_fields(mut self, fields: BriefFields) -> Self {
        self.fields = fields;
        self
    }

    /// A brief needs free text or at least one structured field
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.fields.is_empty()
    }

    /// Free text followed by one `Label: value` line per non-blank field
    pub fn render(&self) -> String {
        let mut parts = Vec::new();
        let text = self.text.trim();
        if !text.is_empty() {
            parts.push(text.to_string());
        }
        parts.extend(self.fields.lines());
        parts.join("\n")
    }

    /// Rendered brief with any pasted prompt scaffolding removed
    pub fn cleaned(&self) -> String {
        clean_brief_text(&self.render())
    }

    /// Idea type inferred from the cleaned brief
    pub fn idea_type(&self) -> IdeaType {
        IdeaType::infer(&self.cleaned())
    }
}

impl std::fmt::Display for CreativeBrief {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// Strip a previously generated prompt down to the brief it carried
pub fn clean_brief_text(text: &str) -> String {
    debug!(len = text.len(), "clean_brief_text: called");
    let body = match text.find(BRIEF_START_MARKER) {
        Some(pos) => {
            debug!(%pos, "clean_brief_text: found start marker");
            &text[pos..]
        }
        None => text,
    };

    body.lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            !PROMPT_LINE_PREFIXES.iter().any(|prefix| trimmed.starts_with(prefix))
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// The kind of output a brief asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdeaType {
    /// One of [`SPECIFIC_IDEA_TYPES`]
    Specific(&'static str),
    /// No specific type mentioned
    Generic,
}

impl IdeaType {
    /// First vocabulary entry found as a case-insensitive substring
    pub fn infer(brief: &str) -> Self {
        let lower = brief.to_lowercase();
        match SPECIFIC_IDEA_TYPES.iter().find(|t| lower.contains(*t)) {
            Some(t) => {
                debug!(idea_type = %t, "IdeaType::infer: specific type");
                Self::Specific(t)
            }
            None => {
                debug!("IdeaType::infer: generic");
                Self::Generic
            }
        }
    }

    /// Singular noun used inside prompt directives
    pub fn label(&self) -> &'static str {
        match self {
            Self::Specific(t) => t,
            Self::Generic => "advertising idea",
        }
    }

    pub fn is_specific(&self) -> bool {
        matches!(self, Self::Specific(_))
    }
}
