//! Prompt synthesis
//!
//! Turns a brief, a creativity level and the session feedback into the single
//! instruction string handed to the model. Everything here is deterministic
//! except the Microdose seed, which comes from a [`SeedSource`].

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use super::{PromptError, PromptLoader};
use crate::domain::{CreativeBrief, CreativityLevel, Idea, IdeaType, PromptMode};

const FALLBACK_TITLE: &str = "The Empty Desk Challenge";
const FALLBACK_DESCRIPTION: &str = "An X post by the founder launches a provocative challenge: \"Post a pic of your \
     agency's empty desks and tag us, and Ideasicle X will DM you a free idea to fill the gap.\" The post includes a \
     stark image of a deserted office with the caption \"Nothing is unthinkable with our virtual talent\", linking \
     to www.ideasiclex.com.";
const FALLBACK_RATIONALE: &str = "The bold, empathetic call-out to layoffs creates buzz among agency execs, \
     positioning Ideasicle X as a timely, actionable savior.";

const DEFAULT_DEVELOP_INSTRUCTION: &str =
    "Develop this into 4 campaign elements: headlines, activations, visuals, and taglines";

const NO_PRIOR_FEEDBACK: &str = "No prior feedback available.";
const NO_GENERAL_FEEDBACK: &str = "No general feedback provided.";

/// Source of the Microdose diversity seed
pub trait SeedSource: Send + Sync {
    /// An integer in 1..=100
    fn seed(&self) -> u8;
}

/// Seed drawn from the thread-local RNG
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSeed;

impl SeedSource for RandomSeed {
    fn seed(&self) -> u8 {
        rand::rng().random_range(1..=100)
    }
}

/// Always the same seed
#[derive(Debug, Clone, Copy)]
pub struct FixedSeed(pub u8);

impl SeedSource for FixedSeed {
    fn seed(&self) -> u8 {
        self.0
    }
}

/// Notes gathered from approved ideas plus the session-wide feedback
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackDigest {
    /// (title, notes) for every approved idea with notes
    pub idea_notes: Vec<(String, String)>,
    pub general: String,
}

impl FeedbackDigest {
    pub fn from_approved(approved: &[Idea], general: &str) -> Self {
        let idea_notes = approved
            .iter()
            .filter(|idea| !idea.notes.trim().is_empty())
            .map(|idea| (idea.title.clone(), idea.notes.trim().to_string()))
            .collect();
        Self {
            idea_notes,
            general: general.trim().to_string(),
        }
    }

    /// `Idea "<title>": <notes>` lines
    pub fn prior_feedback_text(&self) -> String {
        if self.idea_notes.is_empty() {
            return NO_PRIOR_FEEDBACK.to_string();
        }
        self.idea_notes
            .iter()
            .map(|(title, notes)| format!("Idea \"{}\": {}", title, notes))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn general_text(&self) -> String {
        if self.general.is_empty() {
            NO_GENERAL_FEEDBACK.to_string()
        } else {
            format!("General Feedback: {}", self.general)
        }
    }
}

/// Everything besides brief and level that a prompt may draw on
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    /// Idea to refine
    pub target: Option<Idea>,
    pub feedback: FeedbackDigest,
    /// Extra direction for a new-ideas flurry
    pub guidance: Option<String>,
}

impl PromptContext {
    pub fn refine(target: Idea) -> Self {
        Self {
            target: Some(target),
            ..Default::default()
        }
    }

    pub fn new_ideas(feedback: FeedbackDigest, guidance: Option<String>) -> Self {
        Self {
            target: None,
            feedback,
            guidance: guidance.map(|g| g.trim().to_string()).filter(|g| !g.is_empty()),
        }
    }
}

#[derive(Serialize)]
struct GenerationView {
    persona: &'static str,
    brief: String,
    directives: Vec<String>,
    seed: Option<u8>,
    prior_feedback: String,
    general_feedback: String,
    guidance: Option<String>,
    output_contract: String,
}

#[derive(Serialize)]
struct RefineView {
    title: String,
    description: String,
    rationale: String,
}

#[derive(Serialize)]
struct ReplaceView {
    targets: Vec<String>,
    count: usize,
    guidance: Option<String>,
}

#[derive(Serialize)]
struct DevelopView {
    idea: String,
    instruction: String,
}

#[derive(Serialize)]
struct ContractView {
    idea_type: &'static str,
}

/// Builds instruction strings from templates
pub struct PromptBuilder {
    loader: PromptLoader,
    seeds: Box<dyn SeedSource>,
}

impl PromptBuilder {
    pub fn new(loader: PromptLoader, seeds: Box<dyn SeedSource>) -> Self {
        Self { loader, seeds }
    }

    /// Embedded templates with a random seed
    pub fn embedded() -> Self {
        Self::new(PromptLoader::embedded_only(), Box::new(RandomSeed))
    }

    pub fn build_prompt(
        &self,
        mode: PromptMode,
        brief: &CreativeBrief,
        level: CreativityLevel,
        context: &PromptContext,
    ) -> Result<String, PromptError> {
        debug!(%mode, %level, "PromptBuilder::build_prompt: called");
        let prompt = match mode {
            PromptMode::Initial => self.generation(mode, brief, level, context)?,
            PromptMode::NewIdeas => self.generation(mode, brief, level, context)?,
            PromptMode::Refine => {
                let target = context.target.as_ref().ok_or(PromptError::MissingTarget)?;
                self.refine(target)?
            }
        };
        info!(%mode, %level, len = prompt.len(), "Built prompt");
        Ok(prompt)
    }

    /// Initial prompt followed by a request to swap out `targets` only
    pub fn build_replacement(
        &self,
        brief: &CreativeBrief,
        level: CreativityLevel,
        targets: &[Idea],
        guidance: Option<&str>,
    ) -> Result<String, PromptError> {
        debug!(%level, count = targets.len(), ?guidance, "PromptBuilder::build_replacement: called");
        let base = self.generation(PromptMode::Initial, brief, level, &PromptContext::default())?;
        let view = ReplaceView {
            targets: targets.iter().map(idea_line).collect(),
            count: targets.len(),
            guidance: guidance.map(str::trim).filter(|g| !g.is_empty()).map(str::to_string),
        };
        let context = self.loader.render("replace", &view)?;
        let prompt = format!("{}\n\n{}", base.trim_end(), context.trim_end());
        info!(%level, count = targets.len(), len = prompt.len(), "Built replacement prompt");
        Ok(prompt)
    }

    /// Ask for four campaign elements built out from one idea
    pub fn build_develop(&self, idea: &Idea, instruction: Option<&str>) -> Result<String, PromptError> {
        debug!(title = %idea.title, ?instruction, "PromptBuilder::build_develop: called");
        let instruction = instruction
            .map(str::trim)
            .filter(|i| !i.is_empty())
            .unwrap_or(DEFAULT_DEVELOP_INSTRUCTION);
        let view = DevelopView {
            idea: idea_line(idea),
            instruction: instruction.to_string(),
        };
        Ok(self.loader.render("develop", &view)?.trim_end().to_string())
    }

    fn generation(
        &self,
        mode: PromptMode,
        brief: &CreativeBrief,
        level: CreativityLevel,
        context: &PromptContext,
    ) -> Result<String, PromptError> {
        debug!(%mode, "PromptBuilder::generation: called");
        if brief.is_empty() {
            debug!("PromptBuilder::generation: empty brief");
            return Err(PromptError::MissingBrief);
        }

        let cleaned = brief.cleaned();
        let idea_type = IdeaType::infer(&cleaned);
        let output_contract = self.output_contract(idea_type)?;

        let (template, directives) = match mode {
            PromptMode::NewIdeas => ("new-ideas", level.continuation_directives(idea_type.label())),
            _ => ("initial", level.initial_directives(idea_type.label())),
        };

        let seed = level.uses_seed().then(|| self.seeds.seed());
        debug!(?seed, %template, "PromptBuilder::generation: rendering");

        let view = GenerationView {
            persona: level.persona(),
            brief: cleaned,
            directives,
            seed,
            prior_feedback: context.feedback.prior_feedback_text(),
            general_feedback: context.feedback.general_text(),
            guidance: context.guidance.clone(),
            output_contract,
        };
        self.loader.render(template, &view)
    }

    fn output_contract(&self, idea_type: IdeaType) -> Result<String, PromptError> {
        let template = if idea_type.is_specific() {
            "output-specific"
        } else {
            "output-generic"
        };
        self.loader.render(
            template,
            &ContractView {
                idea_type: idea_type.label(),
            },
        )
    }

    fn refine(&self, target: &Idea) -> Result<String, PromptError> {
        debug!(title = %target.title, "PromptBuilder::refine: called");
        let view = RefineView {
            title: or_fallback(&target.title, FALLBACK_TITLE),
            description: or_fallback(&target.description, FALLBACK_DESCRIPTION),
            rationale: or_fallback(&target.rationale, FALLBACK_RATIONALE),
        };
        self.loader.render("refine", &view)
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `Title: description` on one line
fn idea_line(idea: &Idea) -> String {
    let title = collapse_whitespace(&idea.title);
    let description = collapse_whitespace(&idea.description);
    match (title.is_empty(), description.is_empty()) {
        (false, false) => format!("{}: {}", title, description),
        (false, true) => title,
        _ => description,
    }
}

fn or_fallback(field: &str, fallback: &str) -> String {
    let cleaned = collapse_whitespace(field);
    if cleaned.is_empty() { fallback.to_string() } else { cleaned }
}
