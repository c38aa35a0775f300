//! Session idea state with durable approved ideas
//!
//! Holds the most recent parse result, the approved set and the feedback
//! written against ideas. Approved ideas and general feedback are persisted
//! through a [`KeyValueStore`]; everything else lives for the session only.
//!
//! Persisting the approved set always writes the union of what is approved in
//! memory and what was stored before, so durable storage only grows until
//! [`IdeaStore::reset`].

use std::collections::{HashMap, HashSet};

use keystore::KeyValueStore;
use tracing::{debug, info, warn};

use super::StoreError;
use crate::domain::{Idea, IdeaIdentity};
use crate::parser::ParseOutcome;
use crate::prompts::FeedbackDigest;

/// Durable key holding the approved ideas as a JSON array
pub const APPROVED_KEY: &str = "approved_ideas";

/// Durable key holding the session-wide feedback as plain text
pub const GENERAL_FEEDBACK_KEY: &str = "general_feedback";

/// Result of a mutation that may touch durable storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// State changed and was persisted
    Written,
    /// Nothing to do; no storage write
    Unchanged,
    /// State changed in memory but persisting failed
    Failed(String),
}

impl WriteOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Session idea set
pub struct IdeaStore {
    kv: Box<dyn KeyValueStore>,
    last_generated: Vec<Idea>,
    /// Most recently approved first
    approved: Vec<Idea>,
    feedback_log: HashMap<IdeaIdentity, String>,
    general_feedback: String,
    last_error: Option<StoreError>,
}

impl IdeaStore {
    /// Open a session over `kv`, restoring the stored general feedback
    pub fn open(kv: Box<dyn KeyValueStore>) -> Self {
        debug!("IdeaStore::open: called");
        let mut store = Self {
            kv,
            last_generated: Vec::new(),
            approved: Vec::new(),
            feedback_log: HashMap::new(),
            general_feedback: String::new(),
            last_error: None,
        };
        match store.kv.get(GENERAL_FEEDBACK_KEY) {
            Ok(Some(text)) => {
                debug!(len = text.len(), "IdeaStore::open: restored general feedback");
                store.general_feedback = text;
            }
            Ok(None) => debug!("IdeaStore::open: no stored general feedback"),
            Err(e) => {
                warn!(error = %e, "Failed to read general feedback");
                store.last_error = Some(e.into());
            }
        }
        store
    }

    pub fn last_generated(&self) -> &[Idea] {
        &self.last_generated
    }

    /// Approved ideas, most recently approved first
    pub fn approved(&self) -> &[Idea] {
        &self.approved
    }

    pub fn approved_count(&self) -> usize {
        self.approved.len()
    }

    pub fn is_approved(&self, identity: &IdeaIdentity) -> bool {
        self.position(identity).is_some()
    }

    pub fn general_feedback(&self) -> &str {
        &self.general_feedback
    }

    /// Notes recorded against an idea this session
    pub fn notes_for(&self, identity: &IdeaIdentity) -> Option<&str> {
        self.feedback_log.get(identity).map(String::as_str)
    }

    fn position(&self, identity: &IdeaIdentity) -> Option<usize> {
        self.approved.iter().position(|i| &i.identity() == identity)
    }

    /// Approve an idea unless its identity is already approved
    ///
    /// Without explicit notes the idea keeps notes recorded earlier in the
    /// session, or its own. A storage failure is reported but the approval stands.
    pub fn approve(&mut self, idea: Idea, notes: Option<&str>) -> WriteOutcome {
        let identity = idea.identity();
        debug!(title = %identity, "IdeaStore::approve: called");
        if self.is_approved(&identity) {
            debug!("IdeaStore::approve: already approved");
            return WriteOutcome::Unchanged;
        }

        let notes = match notes {
            Some(text) => text.trim().to_string(),
            None => self.feedback_log.get(&identity).cloned().unwrap_or_else(|| idea.notes.clone()),
        };
        if !notes.is_empty() {
            self.feedback_log.insert(identity.clone(), notes.clone());
        }
        self.approved.insert(0, idea.with_notes(notes));
        info!(title = %identity, "Approved idea");
        self.persist_approved()
    }

    /// Remove an approved idea; a no-op for unapproved identities
    pub fn unapprove(&mut self, identity: &IdeaIdentity) -> WriteOutcome {
        debug!(title = %identity, "IdeaStore::unapprove: called");
        let Some(pos) = self.position(identity) else {
            debug!("IdeaStore::unapprove: not approved");
            return WriteOutcome::Unchanged;
        };
        self.approved.remove(pos);
        info!(title = %identity, "Unapproved idea");
        self.persist_approved()
    }

    /// Remove the approved idea at a display index
    pub fn unapprove_at(&mut self, index: usize) -> WriteOutcome {
        debug!(%index, "IdeaStore::unapprove_at: called");
        match self.approved.get(index).map(Idea::identity) {
            Some(identity) => self.unapprove(&identity),
            None => WriteOutcome::Unchanged,
        }
    }

    /// Record notes against an idea, persisting when it is approved
    pub fn set_notes(&mut self, identity: &IdeaIdentity, text: &str) -> WriteOutcome {
        debug!(title = %identity, len = text.len(), "IdeaStore::set_notes: called");
        let text = text.trim().to_string();
        self.feedback_log.insert(identity.clone(), text.clone());

        match self.position(identity) {
            Some(pos) => {
                self.approved[pos].notes = text;
                self.persist_approved()
            }
            None => {
                debug!("IdeaStore::set_notes: not approved, session log only");
                WriteOutcome::Unchanged
            }
        }
    }

    pub fn set_general_feedback(&mut self, text: &str) -> WriteOutcome {
        debug!(len = text.len(), "IdeaStore::set_general_feedback: called");
        self.general_feedback = text.trim().to_string();
        let result = self.kv.set(GENERAL_FEEDBACK_KEY, &self.general_feedback);
        self.outcome(result.map_err(StoreError::from))
    }

    /// Replace the last generated ideas with a parse result
    ///
    /// Returns how many ideas are now displayed. An empty outcome changes nothing.
    pub fn merge_generated(&mut self, parsed: &ParseOutcome) -> usize {
        debug!(new = parsed.new_ideas.len(), revised = parsed.revised_ideas.len(), "IdeaStore::merge_generated: called");
        if parsed.is_empty() {
            debug!("IdeaStore::merge_generated: empty outcome, keeping previous ideas");
            return 0;
        }
        self.last_generated = parsed.combined();
        self.last_generated.len()
    }

    /// Swap displayed ideas at `indices` for `replacements`, pairwise
    ///
    /// A replacement takes over the ordinal of the idea it displaces. Extra
    /// replacements or out-of-range indices are ignored; returns how many
    /// ideas were swapped.
    pub fn replace_generated(&mut self, indices: &[usize], replacements: Vec<Idea>) -> usize {
        debug!(?indices, count = replacements.len(), "IdeaStore::replace_generated: called");
        let mut replaced = 0;
        for (&index, mut idea) in indices.iter().zip(replacements) {
            let Some(slot) = self.last_generated.get_mut(index) else {
                continue;
            };
            idea.ordinal = slot.ordinal;
            *slot = idea;
            replaced += 1;
        }
        replaced
    }

    /// Replace the displayed ideas directly, e.g. when reopening a job
    pub fn restore_generated(&mut self, ideas: Vec<Idea>) {
        debug!(count = ideas.len(), "IdeaStore::restore_generated: called");
        self.last_generated = ideas;
    }

    /// Notes on approved ideas plus the general feedback
    pub fn feedback_digest(&self) -> FeedbackDigest {
        FeedbackDigest::from_approved(&self.approved, &self.general_feedback)
    }

    /// Everything ever approved since the last reset: this session first, then stored entries
    pub fn archived(&mut self) -> Vec<Idea> {
        debug!("IdeaStore::archived: called");
        let stored = match self.load_stored() {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Failed to read approved ideas");
                self.last_error = Some(e);
                Vec::new()
            }
        };
        union_by_identity(&self.approved, stored)
    }

    /// Clear all session state and the durable approved ideas and feedback
    pub fn reset(&mut self) -> WriteOutcome {
        debug!("IdeaStore::reset: called");
        self.last_generated.clear();
        self.approved.clear();
        self.feedback_log.clear();
        self.general_feedback.clear();

        let result = self
            .kv
            .remove(APPROVED_KEY)
            .and_then(|_| self.kv.remove(GENERAL_FEEDBACK_KEY));
        info!("Reset idea store");
        self.outcome(result.map_err(StoreError::from))
    }

    /// The most recent non-fatal storage failure
    pub fn last_storage_error(&self) -> Option<&StoreError> {
        self.last_error.as_ref()
    }

    pub fn take_storage_error(&mut self) -> Option<StoreError> {
        self.last_error.take()
    }

    fn load_stored(&self) -> Result<Vec<Idea>, StoreError> {
        match self.kv.get(APPROVED_KEY)? {
            Some(json) => serde_json::from_str(&json).map_err(|source| StoreError::Corrupt {
                key: APPROVED_KEY.to_string(),
                source,
            }),
            None => Ok(Vec::new()),
        }
    }

    fn persist_approved(&mut self) -> WriteOutcome {
        debug!(count = self.approved.len(), "IdeaStore::persist_approved: called");
        let stored = match self.load_stored() {
            Ok(stored) => stored,
            Err(StoreError::Corrupt { key, source }) => {
                warn!(%key, error = %source, "Stored approved ideas unreadable, overwriting");
                Vec::new()
            }
            Err(e) => return self.outcome(Err(e)),
        };
        let union = union_by_identity(&self.approved, stored);
        let result = serde_json::to_string(&union)
            .map_err(|source| StoreError::Encode {
                key: APPROVED_KEY.to_string(),
                source,
            })
            .and_then(|json| self.kv.set(APPROVED_KEY, &json).map_err(StoreError::from));
        self.outcome(result)
    }

    fn outcome(&mut self, result: Result<(), StoreError>) -> WriteOutcome {
        match result {
            Ok(()) => WriteOutcome::Written,
            Err(e) => {
                warn!(error = %e, "Storage write failed");
                let message = e.to_string();
                self.last_error = Some(e);
                WriteOutcome::Failed(message)
            }
        }
    }
}

/// `first` in order, then entries of `rest` whose identity is not yet present
fn union_by_identity(first: &[Idea], rest: Vec<Idea>) -> Vec<Idea> {
    let mut seen: HashSet<IdeaIdentity> = first.iter().map(Idea::identity).collect();
    let mut union = first.to_vec();
    for idea in rest {
        if seen.insert(idea.identity()) {
            union.push(idea);
        }
    }
    union
}
