//! Refinement cycle: states, errors and the controller that drives them

mod error;
mod refine;
mod state;

pub use error::StudioError;
pub use refine::{ExecuteOutcome, RefinementController, Settings, parse_engine, parse_level};
pub use state::{RefineState, StableState};
