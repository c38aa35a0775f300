//! Response parsing
//!
//! Turns free text returned by the model into idea records. Blocks are
//! separated by blank lines; within a block, bolded labels such as
//! `**Title:**` open a field and unlabeled lines continue the open field.
//! Parsing never fails: malformed input just yields fewer ideas.

use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use crate::domain::Idea;

/// New ideas kept from a single response
pub const MAX_NEW_IDEAS: usize = 5;

/// Sentences kept in a description
pub const MAX_DESCRIPTION_SENTENCES: usize = 3;

/// Substituted when a block has no description
pub const NO_DESCRIPTION: &str = "No description provided.";

/// Campaign elements kept from a develop reply
pub const MAX_ELEMENTS: usize = 4;

static BLOCK_SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{2,}").expect("valid regex"));
static CITATION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\d+\]").expect("valid regex"));

/// Ideas parsed from one response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    pub new_ideas: Vec<Idea>,
    pub revised_ideas: Vec<Idea>,
}

impl ParseOutcome {
    /// True when the response held no usable idea
    pub fn is_empty(&self) -> bool {
        self.new_ideas.is_empty() && self.revised_ideas.is_empty()
    }

    pub fn len(&self) -> usize {
        self.new_ideas.len() + self.revised_ideas.len()
    }

    /// Revised ideas first, then new ideas, each in parse order
    pub fn combined(&self) -> Vec<Idea> {
        self.revised_ideas
            .iter()
            .chain(self.new_ideas.iter().take(MAX_NEW_IDEAS))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Description,
    Rationale,
    Reaction,
}

#[derive(Debug, Default)]
struct BlockFields {
    title: Vec<String>,
    description: Vec<String>,
    rationale: Vec<String>,
    reaction: Vec<String>,
    saw_reaction_label: bool,
}

impl BlockFields {
    fn push(&mut self, field: Field, text: &str) {
        if text.is_empty() {
            return;
        }
        let target = match field {
            Field::Title => &mut self.title,
            Field::Description => &mut self.description,
            Field::Rationale => &mut self.rationale,
            Field::Reaction => &mut self.reaction,
        };
        target.push(text.to_string());
    }
}

/// Match a bolded label at the start of a line, returning the field and the rest of the line
fn match_label(line: &str) -> Option<(Field, &str)> {
    let rest = line.strip_prefix("**")?;
    let close = rest.find("**")?;
    let label = rest[..close].trim().strip_suffix(':')?;
    let key: String = label
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    let field = match key.as_str() {
        "title" => Field::Title,
        "description" => Field::Description,
        "rationale" => Field::Rationale,
        "reactiontofeedback" => Field::Reaction,
        _ => return None,
    };
    Some((field, rest[close + 2..].trim()))
}

fn read_block(block: &str) -> BlockFields {
    let mut fields = BlockFields::default();
    let mut current: Option<Field> = None;

    for line in block.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some((field, rest)) = match_label(line) {
            current = Some(field);
            if field == Field::Reaction {
                fields.saw_reaction_label = true;
            }
            fields.push(field, rest);
        } else if let Some(field) = current {
            fields.push(field, line);
        }
    }
    fields
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn flush_sentence(sentences: &mut Vec<String>, current: &mut String) {
    let sentence = current.trim();
    if sentence.chars().any(|c| !is_terminal(c) && !c.is_whitespace()) {
        sentences.push(sentence.to_string());
    }
    current.clear();
}

/// Keep at most `max` sentences, each with its own terminal punctuation
pub fn truncate_sentences(text: &str, max: usize) -> String {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if is_terminal(c) {
            while let Some(&next) = chars.peek() {
                if !is_terminal(next) {
                    break;
                }
                current.push(next);
                chars.next();
            }
            flush_sentence(&mut sentences, &mut current);
        }
    }
    flush_sentence(&mut sentences, &mut current);

    let kept = sentences.into_iter().take(max).collect::<Vec<_>>().join(" ");
    if kept.is_empty() {
        return text.to_string();
    }
    if kept.ends_with(is_terminal) {
        kept
    } else {
        format!("{}.", kept)
    }
}

fn clean_description(lines: &[String]) -> String {
    let joined = collapse_whitespace(&lines.join(" ")).replace(" .", ".");
    if joined.is_empty() {
        return NO_DESCRIPTION.to_string();
    }
    truncate_sentences(&joined, MAX_DESCRIPTION_SENTENCES)
}

fn clean_rationale(lines: &[String]) -> String {
    let joined = lines.join(" ");
    let stripped = CITATION_RE.replace_all(&joined, "");
    collapse_whitespace(&stripped).replace(" .", ".")
}

/// Parse a raw model response
///
/// `approved_count` seeds the numbering of new ideas so they continue after
/// what the user has already approved.
pub fn parse(raw_text: &str, approved_count: usize) -> ParseOutcome {
    debug!(len = raw_text.len(), %approved_count, "parse: called");
    let normalized = raw_text.replace("\r\n", "\n").replace('\r', "\n");
    let normalized = normalized.trim();

    let mut outcome = ParseOutcome::default();
    let mut revised_number: u32 = 1;
    let mut new_number = u32::try_from(approved_count).unwrap_or(u32::MAX).saturating_add(1);

    for block in BLOCK_SPLIT_RE.split(normalized).filter(|b| !b.trim().is_empty()) {
        let fields = read_block(block);

        let title = fields.title.join(" ").trim().to_string();
        let has_title = !title.is_empty();
        let title = if has_title {
            title
        } else if fields.saw_reaction_label {
            format!("Idea {}", revised_number)
        } else {
            format!("Idea {}", new_number)
        };
        let description = clean_description(&fields.description);
        let rationale = clean_rationale(&fields.rationale);
        let reaction = fields.reaction.join(" ").trim().to_string();

        if !has_title && description == NO_DESCRIPTION && rationale.is_empty() {
            debug!("parse: block has no content, skipping");
            continue;
        }

        let idea = Idea::new(title, description, rationale);
        if !reaction.is_empty() {
            debug!(ordinal = %revised_number, "parse: revised idea");
            outcome
                .revised_ideas
                .push(idea.with_reaction(reaction).with_ordinal(revised_number));
            revised_number += 1;
        } else if outcome.new_ideas.len() < MAX_NEW_IDEAS {
            debug!(ordinal = %new_number, "parse: new idea");
            outcome.new_ideas.push(idea.with_ordinal(new_number));
            new_number = new_number.saturating_add(1);
        } else {
            debug!("parse: new idea cap reached, dropping block");
        }
    }

    if outcome.is_empty() {
        warn!("No valid ideas found in response");
    } else {
        info!(
            new = outcome.new_ideas.len(),
            revised = outcome.revised_ideas.len(),
            "Parsed response"
        );
    }
    outcome
}

/// One `Title :: Description` line from a develop reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignElement {
    pub title: String,
    pub description: String,
}

/// Pick out campaign elements; lines without `::` are ignored
pub fn parse_elements(raw_text: &str) -> Vec<CampaignElement> {
    debug!(len = raw_text.len(), "parse_elements: called");
    let elements: Vec<_> = raw_text
        .lines()
        .filter_map(|line| line.split_once("::"))
        .map(|(title, description)| CampaignElement {
            title: title.trim().to_string(),
            description: description.trim().to_string(),
        })
        .take(MAX_ELEMENTS)
        .collect();
    info!(count = elements.len(), "Parsed campaign elements");
    elements
}
