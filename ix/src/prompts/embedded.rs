//! Embedded prompts
//!
//! Compiled into the binary from the .pmt files under `ix/prompts/`.

use tracing::debug;

/// First flurry for a brief
pub const INITIAL: &str = include_str!("../../prompts/initial.pmt");

/// Follow-up flurry carrying session feedback
pub const NEW_IDEAS: &str = include_str!("../../prompts/new-ideas.pmt");

/// Conversational refinement of one idea
pub const REFINE: &str = include_str!("../../prompts/refine.pmt");

/// Context appended to an initial prompt when swapping out chosen ideas
pub const REPLACE: &str = include_str!("../../prompts/replace.pmt");

/// Campaign elements built out from one idea
pub const DEVELOP: &str = include_str!("../../prompts/develop.pmt");

/// Output contract when the brief names a specific idea type
pub const OUTPUT_SPECIFIC: &str = include_str!("../../prompts/output-specific.pmt");

/// Output contract for general advertising ideas
pub const OUTPUT_GENERIC: &str = include_str!("../../prompts/output-generic.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "initial" => Some(INITIAL),
        "new-ideas" => Some(NEW_IDEAS),
        "refine" => Some(REFINE),
        "replace" => Some(REPLACE),
        "develop" => Some(DEVELOP),
        "output-specific" => Some(OUTPUT_SPECIFIC),
        "output-generic" => Some(OUTPUT_GENERIC),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}
