//! Creativity levels, prompt modes and AI engines

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

/// Audience fallback appended to every generation prompt
pub const DEFAULT_AUDIENCE: &str = "If there is no target audience described, then default to all adults 21-60 years old.";

/// How far generated ideas may depart from conventional, feasible advertising
///
/// Ordered by increasing divergence: `None < Microdose < Buzzed < Tripping`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CreativityLevel {
    /// Strictly conventional, no speculative license
    None,
    /// Subtle, practical twists on proven formats
    Microdose,
    /// Bold but implementable; the baseline
    #[default]
    Buzzed,
    /// Surreal, speculative, mandatory hallucination
    Tripping,
}

impl CreativityLevel {
    /// All levels in ascending order
    pub const ALL: [CreativityLevel; 4] = [Self::None, Self::Microdose, Self::Buzzed, Self::Tripping];

    /// Lowercase name as used in config files and the CLI
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Microdose => "microdose",
            Self::Buzzed => "buzzed",
            Self::Tripping => "tripping",
        }
    }

    /// Whether prompts at this level carry a random diversity seed
    pub fn uses_seed(&self) -> bool {
        matches!(self, Self::Microdose)
    }

    /// Persona sentence that opens every generation prompt
    pub fn persona(&self) -> &'static str {
        debug!(?self, "CreativityLevel::persona: called");
        match self {
            Self::None => {
                debug!("CreativityLevel::persona: None branch");
                "You are a strategic advertising expert tasked with creating conventional advertising ideas \
                 that strictly match the idea type specified in the creative brief (e.g., names, taglines, \
                 headlines, stunts), using established advertising principles. You are forbidden from \
                 speculating: stay logical, practical and grounded in proven strategies."
            }
            Self::Microdose => {
                debug!("CreativityLevel::persona: Microdose branch");
                "You are a creative advertising expert tasked with creating practical, audience-focused \
                 advertising ideas that strictly match the idea type specified in the creative brief, enhancing \
                 conventional formats with subtle, innovative twists. You are also an expert in understanding \
                 the target audience described in the brief."
            }
            Self::Buzzed => {
                debug!("CreativityLevel::persona: Buzzed branch");
                "You are a bold, award-winning creative director tasked with creating innovative advertising \
                 ideas that strictly match the idea type specified in the creative brief. Hallucination is \
                 allowed as long as you can rationalize the concepts against the creative brief. The ideas you \
                 come up with connect dots that normal humans would never think of. You are also an expert in \
                 understanding the target audience described in the brief."
            }
            Self::Tripping => {
                debug!("CreativityLevel::persona: Tripping branch");
                "You are a visionary artist tasked with creating groundbreaking advertising ideas that redefine \
                 advertising through surreal and innovative concepts. Hallucination is not only encouraged, it's \
                 mandatory, but try to rationalize the concepts against the creative brief. The more seemingly \
                 disconnected the dots you connect are, the better. You are also an expert in understanding the \
                 target audience described in the brief."
            }
        }
    }

    /// The "generate exactly five" directive for this level
    pub fn generate_directive(&self, idea_type: &str) -> String {
        debug!(?self, %idea_type, "CreativityLevel::generate_directive: called");
        let flavor = match self {
            Self::None => {
                "that strictly match the idea type specified in the creative brief (e.g., if taglines are \
                 requested, generate only taglines with explanations; if names are requested, generate only \
                 names with explanations)"
            }
            Self::Microdose => {
                "that strictly match the idea type specified in the creative brief, introducing subtle, \
                 practical enhancements to conventional ideas while maintaining high feasibility"
            }
            Self::Buzzed => {
                "that strictly match the idea type specified in the creative brief, blending unconventional \
                 elements with familiar formats to create achievable advertising concepts"
            }
            Self::Tripping => {
                "that strictly adhere to the specified idea type in the creative brief, exploring surreal and \
                 uncharted creative territories while maintaining relevance to the brand and audience"
            }
        };
        format!("Generate EXACTLY FIVE {}s {}.", idea_type, flavor)
    }

    /// Level-specific style directives (everything after the generate directive)
    pub fn style_directives(&self) -> Vec<&'static str> {
        debug!(?self, "CreativityLevel::style_directives: called");
        match self {
            Self::None => vec![
                "Ensure each idea aligns with the brand, product, target audience, and message (if provided) in \
                 the brief, without introducing unrelated concepts or deviating from the requested idea type.",
                "Use only established advertising formats and proven strategies; do not speculate.",
            ],
            Self::Microdose => vec![
                "If there is no specific idea type mentioned, then default to general advertising platforms \
                 that are media agnostic and could work in any medium.",
                "Focus on established advertising formats with minor, practical innovations that enhance the \
                 specified idea type without deviating from it.",
                "Draw inspiration from current cultural trends, audience data, and proven advertising \
                 strategies, avoiding surreal or speculative elements.",
                "Ensure ideas are highly feasible, cost-effective, and directly resonate with the target \
                 audience's preferences and behaviors.",
                "Avoid clichés, predictable approaches, or any ideas that do not match the specified idea type.",
            ],
            Self::Buzzed => vec![
                "If there is no specific idea type mentioned, then default to general advertising platforms \
                 that are media agnostic and could work in any medium.",
                "Develop ideas that blend familiar advertising formats with bold, unexpected elements (e.g., \
                 emerging tech like AR, cross-cultural references), but only within the scope of the specified \
                 idea type.",
                "Draw inspiration from diverse but recognizable sources, such as current pop culture, \
                 technology trends, or global movements, ensuring ideas are adventurous yet implementable.",
                "Ensure ideas push creative boundaries but remain anchored to the brand's essence, audience \
                 expectations, and the specified idea type, with clear execution paths.",
                "Avoid overly surreal or impractical concepts, or any ideas that do not match the specified \
                 idea type.",
            ],
            Self::Tripping => vec![
                "Invent bold, unconventional formats or experiences that strictly adhere to the specified idea \
                 type, even if execution is speculative or futuristic.",
                "Draw inspiration from abstract sources like mythology, quantum physics, imagined futures, the \
                 arts, entertainment, or human consciousness, prioritizing imagination.",
                "Create ideas that challenge conventional advertising but remain relevant to the brief's brand, \
                 audience, and message.",
                "Ensure ideas resonate emotionally or culturally with the audience, despite their \
                 unconventional nature, while strictly adhering to the requested idea type.",
            ],
        }
    }

    /// Directive bullets for a first flurry
    pub fn initial_directives(&self, idea_type: &str) -> Vec<String> {
        let mut directives = vec![self.generate_directive(idea_type)];
        directives.extend(self.style_directives().into_iter().map(String::from));
        directives.push(DEFAULT_AUDIENCE.to_string());
        directives
    }

    /// Directive bullets for a follow-up flurry in the same thread
    pub fn continuation_directives(&self, idea_type: &str) -> Vec<String> {
        let mut directives = vec![
            "This is a continuation of the existing LLM thread, so retain the context of the original creative \
             brief and prior feedback."
                .to_string(),
            self.generate_directive(idea_type),
            "Incorporate insights from the prior refinement feedback below to inform the new ideas, without \
             repeating ideas already generated."
                .to_string(),
            "Pay close attention to the general feedback below and let it steer tone, direction and focus."
                .to_string(),
        ];
        directives.extend(self.style_directives().into_iter().map(String::from));
        directives.push(
            "Ensure each idea is distinct in theme, wording, or intent, avoiding overlap with previously \
             generated ideas in this session."
                .to_string(),
        );
        directives.push(DEFAULT_AUDIENCE.to_string());
        directives
    }
}

impl std::fmt::Display for CreativityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for CreativityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "CreativityLevel::from_str: called");
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "microdose" => Ok(Self::Microdose),
            "buzzed" => Ok(Self::Buzzed),
            "tripping" => Ok(Self::Tripping),
            other => Err(format!(
                "Unknown creativity level '{}'. Expected one of: none, microdose, buzzed, tripping",
                other
            )),
        }
    }
}

/// Which kind of prompt to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PromptMode {
    /// First flurry for a brief
    Initial,
    /// Conversational follow-up on one idea
    Refine,
    /// Another flurry informed by session feedback
    NewIdeas,
}

impl std::fmt::Display for PromptMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initial => write!(f, "initial"),
            Self::Refine => write!(f, "refine"),
            Self::NewIdeas => write!(f, "new-ideas"),
        }
    }
}

impl FromStr for PromptMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "initial" => Ok(Self::Initial),
            "refine" => Ok(Self::Refine),
            "new-ideas" | "new_ideas" | "newideas" => Ok(Self::NewIdeas),
            other => Err(format!(
                "Unknown prompt mode '{}'. Expected one of: initial, refine, new-ideas",
                other
            )),
        }
    }
}

/// Chat product the user pastes prompts into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AiEngine {
    #[default]
    Grok,
    ChatGPT,
    Perplexity,
}

impl AiEngine {
    /// Web chat URL for the manual paste workflow
    pub fn url(&self) -> &'static str {
        match self {
            Self::Grok => "https://x.com/i/grok",
            Self::ChatGPT => "https://chat.openai.com",
            Self::Perplexity => "https://www.perplexity.ai",
        }
    }
}

impl std::fmt::Display for AiEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Grok => write!(f, "Grok"),
            Self::ChatGPT => write!(f, "ChatGPT"),
            Self::Perplexity => write!(f, "Perplexity"),
        }
    }
}

impl FromStr for AiEngine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "grok" => Ok(Self::Grok),
            "chatgpt" => Ok(Self::ChatGPT),
            "perplexity" => Ok(Self::Perplexity),
            other => Err(format!(
                "Unknown AI engine '{}'. Expected one of: grok, chatgpt, perplexity",
                other
            )),
        }
    }
}
