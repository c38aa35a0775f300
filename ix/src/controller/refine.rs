//! RefinementController orchestrates the pick, prompt, paste-back, merge cycle

use tracing::{debug, info, warn};

use super::{RefineState, StableState, StudioError};
use crate::domain::{AiEngine, CreativeBrief, CreativityLevel, Idea, Job, PromptMode, clean_pasted_notes};
use crate::llm::LlmChannel;
use crate::parser::{self, CampaignElement};
use crate::prompts::{PromptBuilder, PromptContext};
use crate::store::{IdeaStore, JobRegistry, StoreError, WriteOutcome};

/// The inputs a flurry is generated from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub brief: CreativeBrief,
    pub level: CreativityLevel,
    pub engine: AiEngine,
}

/// What a model reply turned into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteOutcome {
    /// Ideas were parsed and are now displayed
    Ideas(usize),
    /// A refine reply with no idea blocks; the conversation continues
    Conversation(String),
}

/// State machine owning the session: settings, ideas, jobs and the outstanding prompt
pub struct RefinementController {
    builder: PromptBuilder,
    ideas: IdeaStore,
    jobs: JobRegistry,
    defaults: Settings,
    settings: Settings,
    pending: Option<Settings>,
    skip_confirmation: bool,
    state: RefineState,
    outstanding: Option<String>,
    current_job: Option<String>,
}

impl RefinementController {
    pub fn new(builder: PromptBuilder, ideas: IdeaStore, jobs: JobRegistry, defaults: Settings) -> Self {
        debug!(level = %defaults.level, engine = %defaults.engine, "RefinementController::new: called");
        let state = if defaults.brief.is_empty() {
            RefineState::Idle
        } else {
            RefineState::BriefReady
        };
        Self {
            builder,
            ideas,
            jobs,
            settings: defaults.clone(),
            defaults,
            pending: None,
            skip_confirmation: false,
            state,
            outstanding: None,
            current_job: None,
        }
    }

    pub fn state(&self) -> &RefineState {
        &self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Settings change waiting for confirmation
    pub fn pending_change(&self) -> Option<&Settings> {
        self.pending.as_ref()
    }

    /// Prompt handed out and not yet answered
    pub fn current_prompt(&self) -> Option<&str> {
        self.outstanding.as_deref()
    }

    pub fn current_job(&self) -> Option<&str> {
        self.current_job.as_deref()
    }

    pub fn ideas(&self) -> &IdeaStore {
        &self.ideas
    }

    pub fn jobs(&self) -> &JobRegistry {
        &self.jobs
    }

    /// Session approvals merged with everything stored since the last reset
    pub fn archived(&mut self) -> Vec<Idea> {
        self.ideas.archived()
    }

    fn resting_state(&self) -> StableState {
        if self.settings.brief.is_empty() {
            StableState::Idle
        } else {
            StableState::BriefReady
        }
    }

    fn invalid(&self, action: &'static str) -> StudioError {
        debug!(state = %self.state, %action, "invalid transition");
        StudioError::InvalidTransition {
            state: self.state.to_string(),
            action,
        }
    }

    fn ensure_not_busy(&self) -> Result<(), StudioError> {
        if self.state.is_in_flight() {
            debug!(state = %self.state, "ensure_not_busy: request in flight");
            return Err(StudioError::Busy);
        }
        Ok(())
    }

    fn apply_settings(&mut self, settings: Settings) {
        self.settings = settings;
        self.pending = None;
        self.state = self.resting_state().into();
        info!(level = %self.settings.level, engine = %self.settings.engine, state = %self.state, "Applied settings");
    }

    /// Change brief, level and engine together
    ///
    /// While ideas are displayed a real change is held until confirmed, unless
    /// the user opted out of confirmations.
    pub fn change_settings(&mut self, settings: Settings) -> Result<(), StudioError> {
        debug!(state = %self.state, "change_settings: called");
        self.ensure_not_busy()?;
        if self.state == RefineState::IdeasDisplayed {
            if settings == self.settings {
                debug!("change_settings: no change");
                return Ok(());
            }
            if !self.skip_confirmation {
                debug!("change_settings: holding change for confirmation");
                self.pending = Some(settings);
                return Err(StudioError::ConfirmationRequired);
            }
        }
        self.apply_settings(settings);
        Ok(())
    }

    pub fn set_brief(&mut self, brief: CreativeBrief) -> Result<(), StudioError> {
        let settings = Settings {
            brief,
            ..self.settings.clone()
        };
        self.change_settings(settings)
    }

    pub fn set_level(&mut self, level: CreativityLevel) -> Result<(), StudioError> {
        let settings = Settings {
            level,
            ..self.settings.clone()
        };
        self.change_settings(settings)
    }

    pub fn set_engine(&mut self, engine: AiEngine) -> Result<(), StudioError> {
        let settings = Settings {
            engine,
            ..self.settings.clone()
        };
        self.change_settings(settings)
    }

    /// Apply the held settings change
    pub fn confirm_settings_change(&mut self, dont_ask_again: bool) -> Result<(), StudioError> {
        debug!(%dont_ask_again, "confirm_settings_change: called");
        let Some(settings) = self.pending.take() else {
            return Err(self.invalid("confirm a settings change"));
        };
        self.skip_confirmation |= dont_ask_again;
        self.apply_settings(settings);
        Ok(())
    }

    /// Start a flurry for a brief; returns the prompt to run
    pub fn submit_brief(
        &mut self,
        brief: CreativeBrief,
        level: CreativityLevel,
        engine: AiEngine,
    ) -> Result<String, StudioError> {
        debug!(state = %self.state, %level, %engine, "submit_brief: called");
        self.ensure_not_busy()?;
        if brief.is_empty() {
            return Err(StudioError::MissingBrief);
        }

        let requested = Settings { brief, level, engine };
        let from = match self.state {
            RefineState::IdeasDisplayed => {
                if requested == self.settings {
                    return Err(self.invalid("resubmit an unchanged brief"));
                }
                if !self.skip_confirmation {
                    self.pending = Some(requested);
                    return Err(StudioError::ConfirmationRequired);
                }
                StableState::IdeasDisplayed
            }
            _ => StableState::BriefReady,
        };

        let prompt = self.builder.build_prompt(
            PromptMode::Initial,
            &requested.brief,
            requested.level,
            &PromptContext::default(),
        )?;
        self.settings = requested;
        self.pending = None;
        self.sync_job_settings();
        Ok(self.begin(
            RefineState::Generating {
                from,
                mode: PromptMode::Initial,
            },
            prompt,
        ))
    }

    /// Submit the current settings
    pub fn generate(&mut self) -> Result<String, StudioError> {
        let Settings { brief, level, engine } = self.settings.clone();
        self.submit_brief(brief, level, engine)
    }

    fn begin(&mut self, state: RefineState, prompt: String) -> String {
        info!(state = %state, len = prompt.len(), "Prompt ready");
        self.state = state;
        self.outstanding = Some(prompt.clone());
        prompt
    }

    fn rollback(&mut self) {
        if let Some(target) = self.state.rollback_target() {
            info!(from = %self.state, "Rolling back in-flight request");
            self.state = target.into();
        }
        self.outstanding = None;
    }

    /// Parse a pasted or fetched reply into the displayed ideas
    pub fn receive_raw_response(&mut self, text: &str) -> Result<usize, StudioError> {
        debug!(state = %self.state, len = text.len(), "receive_raw_response: called");
        if !self.state.is_in_flight() {
            return Err(self.invalid("accept a response"));
        }

        let parsed = parser::parse(text, self.ideas.approved_count());
        if parsed.is_empty() {
            warn!("Response held no ideas, rolling back");
            self.rollback();
            return Err(StudioError::NoIdeasFound);
        }

        if let RefineState::Replacing { indices } = &self.state {
            let replaced = self.ideas.replace_generated(indices, parsed.combined());
            self.sync_job_ideas();
            self.state = RefineState::IdeasDisplayed;
            self.outstanding = None;
            info!(replaced, "Replaced selected ideas");
            return Ok(replaced);
        }

        let count = self.ideas.merge_generated(&parsed);
        self.sync_job_ideas();
        self.state = RefineState::IdeasDisplayed;
        self.outstanding = None;
        info!(count, revised = parsed.revised_ideas.len(), "Ideas displayed");
        Ok(count)
    }

    /// Open a refine conversation on a displayed idea; the idea is approved as a side effect
    pub fn select_for_refine(&mut self, index: usize) -> Result<String, StudioError> {
        debug!(%index, "select_for_refine: called");
        self.ensure_not_busy()?;
        if self.state != RefineState::IdeasDisplayed {
            return Err(self.invalid("refine an idea"));
        }
        let target = self
            .ideas
            .last_generated()
            .get(index)
            .cloned()
            .ok_or(StudioError::UnknownIdea(index))?;

        let prompt = self.builder.build_prompt(
            PromptMode::Refine,
            &self.settings.brief,
            self.settings.level,
            &PromptContext::refine(target.clone()),
        )?;
        if let WriteOutcome::Failed(message) = self.ideas.approve(target.clone(), None) {
            warn!(%message, "Auto-approve on refine was not persisted");
        }
        Ok(self.begin(RefineState::Refining { target }, prompt))
    }

    /// Ask for another flurry informed by the session feedback
    pub fn request_new_ideas(&mut self, guidance: Option<&str>) -> Result<String, StudioError> {
        debug!(?guidance, "request_new_ideas: called");
        self.ensure_not_busy()?;
        if self.state != RefineState::IdeasDisplayed {
            return Err(self.invalid("request new ideas"));
        }
        let context = PromptContext::new_ideas(self.ideas.feedback_digest(), guidance.map(str::to_string));
        let prompt =
            self.builder
                .build_prompt(PromptMode::NewIdeas, &self.settings.brief, self.settings.level, &context)?;
        Ok(self.begin(
            RefineState::Generating {
                from: StableState::IdeasDisplayed,
                mode: PromptMode::NewIdeas,
            },
            prompt,
        ))
    }

    /// Ask for replacements of the displayed ideas at `indices`
    ///
    /// Duplicate indices collapse to one. The reply is spliced into the
    /// displayed list at those positions; everything else stays put.
    pub fn request_replacement(&mut self, indices: &[usize], guidance: Option<&str>) -> Result<String, StudioError> {
        debug!(?indices, ?guidance, "request_replacement: called");
        self.ensure_not_busy()?;
        if self.state != RefineState::IdeasDisplayed {
            return Err(self.invalid("replace ideas"));
        }
        let mut selected: Vec<usize> = Vec::with_capacity(indices.len());
        for &index in indices {
            if index >= self.ideas.last_generated().len() {
                return Err(StudioError::UnknownIdea(index));
            }
            if !selected.contains(&index) {
                selected.push(index);
            }
        }
        if selected.is_empty() {
            return Err(StudioError::NothingSelected);
        }

        let targets: Vec<Idea> = selected
            .iter()
            .map(|&index| self.ideas.last_generated()[index].clone())
            .collect();
        let prompt =
            self.builder
                .build_replacement(&self.settings.brief, self.settings.level, &targets, guidance)?;
        Ok(self.begin(RefineState::Replacing { indices: selected }, prompt))
    }

    /// Prompt asking for campaign elements built out from a displayed idea
    pub fn develop_prompt(&self, index: usize, instruction: Option<&str>) -> Result<String, StudioError> {
        debug!(%index, ?instruction, "develop_prompt: called");
        let idea = self
            .ideas
            .last_generated()
            .get(index)
            .ok_or(StudioError::UnknownIdea(index))?;
        Ok(self.builder.build_develop(idea, instruction)?)
    }

    /// Parse a develop reply; the displayed ideas and state are untouched
    pub fn receive_elements(&self, text: &str) -> Result<Vec<CampaignElement>, StudioError> {
        debug!(len = text.len(), "receive_elements: called");
        let elements = parser::parse_elements(text);
        if elements.is_empty() {
            return Err(StudioError::NoElementsFound);
        }
        Ok(elements)
    }

    /// Develop a displayed idea through a channel
    pub async fn develop(
        &self,
        index: usize,
        instruction: Option<&str>,
        channel: &dyn LlmChannel,
    ) -> Result<Vec<CampaignElement>, StudioError> {
        let prompt = self.develop_prompt(index, instruction)?;
        info!(%index, "Sending develop prompt to model");
        let reply = channel.complete(&prompt).await.map_err(|e| {
            warn!(error = %e, status = e.status(), "Develop request failed");
            StudioError::External(e)
        })?;
        self.receive_elements(&reply)
    }

    /// Abandon the outstanding prompt; returns whether anything was cancelled
    pub fn cancel(&mut self) -> bool {
        debug!(state = %self.state, "cancel: called");
        if !self.state.is_in_flight() {
            return false;
        }
        self.rollback();
        true
    }

    /// Record a refine summary as the target's notes and return to the ideas
    pub fn record_refine_summary(&mut self, text: &str) -> Result<WriteOutcome, StudioError> {
        debug!(len = text.len(), "record_refine_summary: called");
        let RefineState::Refining { target } = &self.state else {
            return Err(self.invalid("record a refine summary"));
        };
        let identity = target.identity();
        let outcome = self.ideas.set_notes(&identity, &clean_pasted_notes(text));
        self.state = RefineState::IdeasDisplayed;
        self.outstanding = None;
        info!(title = %identity, "Recorded refine summary");
        Ok(outcome)
    }

    /// Wipe session ideas and durable approvals; optionally reset the settings too
    pub fn clear(&mut self, clear_brief: bool) -> WriteOutcome {
        debug!(%clear_brief, "clear: called");
        let outcome = self.ideas.reset();
        self.pending = None;
        self.outstanding = None;
        if clear_brief {
            self.settings = self.defaults.clone();
            self.current_job = None;
            self.state = RefineState::Idle;
        } else {
            self.state = self.resting_state().into();
        }
        info!(state = %self.state, "Cleared session");
        outcome
    }

    /// Run the outstanding prompt through a channel
    ///
    /// A failed call rolls back to the pre-request state. In a refine
    /// conversation a reply without idea blocks comes back as text.
    pub async fn execute(&mut self, channel: &dyn LlmChannel) -> Result<ExecuteOutcome, StudioError> {
        debug!(state = %self.state, "execute: called");
        if !self.state.is_in_flight() {
            return Err(self.invalid("send a request"));
        }
        let Some(prompt) = self.outstanding.clone() else {
            return Err(self.invalid("send a request"));
        };

        info!("Sending prompt to model");
        let reply = match channel.complete(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, status = e.status(), "Model request failed");
                self.rollback();
                return Err(StudioError::External(e));
            }
        };

        if matches!(self.state, RefineState::Refining { .. })
            && parser::parse(&reply, self.ideas.approved_count()).is_empty()
        {
            debug!("execute: refine reply is conversation");
            self.outstanding = None;
            return Ok(ExecuteOutcome::Conversation(reply));
        }
        self.receive_raw_response(&reply).map(ExecuteOutcome::Ideas)
    }

    /// Approve a displayed idea
    pub fn approve(&mut self, index: usize, notes: Option<&str>) -> Result<WriteOutcome, StudioError> {
        debug!(%index, "approve: called");
        let idea = self
            .ideas
            .last_generated()
            .get(index)
            .cloned()
            .ok_or(StudioError::UnknownIdea(index))?;
        Ok(self.ideas.approve(idea, notes))
    }

    /// Unapprove a displayed idea
    pub fn unapprove(&mut self, index: usize) -> Result<WriteOutcome, StudioError> {
        debug!(%index, "unapprove: called");
        let identity = self
            .ideas
            .last_generated()
            .get(index)
            .map(Idea::identity)
            .ok_or(StudioError::UnknownIdea(index))?;
        Ok(self.ideas.unapprove(&identity))
    }

    /// Unapprove by position in the approved list
    pub fn unapprove_approved(&mut self, index: usize) -> WriteOutcome {
        self.ideas.unapprove_at(index)
    }

    /// Attach notes to a displayed idea
    pub fn set_notes(&mut self, index: usize, text: &str) -> Result<WriteOutcome, StudioError> {
        debug!(%index, "set_notes: called");
        let identity = self
            .ideas
            .last_generated()
            .get(index)
            .map(Idea::identity)
            .ok_or(StudioError::UnknownIdea(index))?;
        Ok(self.ideas.set_notes(&identity, text))
    }

    pub fn set_general_feedback(&mut self, text: &str) -> WriteOutcome {
        self.ideas.set_general_feedback(text)
    }

    /// Load a saved job and make it current
    pub fn open_job(&mut self, name: &str) -> Result<(), StudioError> {
        debug!(%name, "open_job: called");
        self.ensure_not_busy()?;
        let job = self
            .jobs
            .get(name)?
            .ok_or_else(|| StoreError::JobNotFound(name.to_string()))?;

        let has_ideas = job.has_ideas();
        self.settings.brief = job.brief;
        self.settings.level = job.level;
        self.pending = None;
        self.ideas.restore_generated(job.ideas);
        self.current_job = Some(job.name);
        self.state = if has_ideas {
            RefineState::IdeasDisplayed
        } else {
            self.resting_state().into()
        };
        info!(%name, state = %self.state, "Opened job");
        Ok(())
    }

    /// Create (or replace) a job and make it current
    pub fn start_job(&mut self, name: &str, brief: CreativeBrief, level: CreativityLevel) -> Result<(), StudioError> {
        debug!(%name, %level, "start_job: called");
        self.ensure_not_busy()?;
        if brief.is_empty() {
            return Err(StudioError::MissingBrief);
        }
        self.jobs.upsert(Job::new(name, brief.clone(), level))?;

        self.settings.brief = brief;
        self.settings.level = level;
        self.pending = None;
        self.ideas.restore_generated(Vec::new());
        self.current_job = Some(name.to_string());
        self.state = RefineState::BriefReady;
        Ok(())
    }

    pub fn archive_job(&mut self, name: &str, archived: bool) -> Result<(), StudioError> {
        Ok(self.jobs.archive(name, archived)?)
    }

    /// Delete a job; the current job is forgotten if it was the one deleted
    pub fn delete_job(&mut self, name: &str) -> Result<bool, StudioError> {
        let deleted = self.jobs.delete(name)?;
        if deleted && self.current_job.as_deref() == Some(name) {
            self.current_job = None;
        }
        Ok(deleted)
    }

    fn sync_job_settings(&mut self) {
        let Some(name) = self.current_job.clone() else {
            return;
        };
        let job = match self.jobs.get(&name) {
            Ok(Some(mut job)) => {
                job.brief = self.settings.brief.clone();
                job.level = self.settings.level;
                job
            }
            Ok(None) => Job::new(name.as_str(), self.settings.brief.clone(), self.settings.level),
            Err(e) => {
                warn!(job = %name, error = %e, "Failed to read job");
                return;
            }
        };
        if let Err(e) = self.jobs.upsert(job) {
            warn!(job = %name, error = %e, "Failed to update job settings");
        }
    }

    fn sync_job_ideas(&mut self) {
        let Some(name) = self.current_job.clone() else {
            return;
        };
        if let Err(e) = self.jobs.set_ideas(&name, self.ideas.last_generated().to_vec()) {
            warn!(job = %name, error = %e, "Failed to update job ideas");
        }
    }
}

/// Parse a level name from user input
pub fn parse_level(input: &str) -> Result<CreativityLevel, StudioError> {
    input.parse().map_err(StudioError::InvalidLevel)
}

/// Parse an engine name from user input
pub fn parse_engine(input: &str) -> Result<AiEngine, StudioError> {
    input.parse().map_err(StudioError::InvalidEngine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::MockChannel;
    use crate::prompts::{FixedSeed, PromptLoader};
    use keystore::{MemoryStore, SharedStore};

    const FIVE: &str = "**Title:** A\n**Description:** Da.\n**Rationale:** Ra.\n\n\
                        **Title:** B\n**Description:** Db.\n**Rationale:** Rb.\n\n\
                        **Title:** C\n**Description:** Dc.\n**Rationale:** Rc.\n\n\
                        **Title:** D\n**Description:** Dd.\n**Rationale:** Rd.\n\n\
                        **Title:** E\n**Description:** De.\n**Rationale:** Re.";

    fn controller() -> (RefinementController, SharedStore<MemoryStore>) {
        let shared = SharedStore::new(MemoryStore::new());
        let builder = PromptBuilder::new(PromptLoader::embedded_only(), Box::new(FixedSeed(9)));
        let controller = RefinementController::new(
            builder,
            IdeaStore::open(Box::new(shared.clone())),
            JobRegistry::new(Box::new(shared.clone())),
            Settings::default(),
        );
        (controller, shared)
    }

    fn brief() -> CreativeBrief {
        CreativeBrief::new("Acme running socks")
    }

    fn displayed() -> (RefinementController, SharedStore<MemoryStore>) {
        let (mut c, shared) = controller();
        c.submit_brief(brief(), CreativityLevel::Buzzed, AiEngine::Grok).unwrap();
        c.receive_raw_response(FIVE).unwrap();
        (c, shared)
    }

    #[test]
    fn test_initial_state_and_brief() {
        let (mut c, _) = controller();
        assert_eq!(c.state(), &RefineState::Idle);
        c.set_brief(brief()).unwrap();
        assert_eq!(c.state(), &RefineState::BriefReady);
        c.set_brief(CreativeBrief::default()).unwrap();
        assert_eq!(c.state(), &RefineState::Idle);
    }

    #[test]
    fn test_submit_requires_brief() {
        let (mut c, _) = controller();
        let err = c
            .submit_brief(CreativeBrief::default(), CreativityLevel::None, AiEngine::Grok)
            .unwrap_err();
        assert!(matches!(err, StudioError::MissingBrief));
        assert_eq!(c.state(), &RefineState::Idle);
    }

    #[test]
    fn test_submit_then_receive() {
        let (mut c, _) = controller();
        let prompt = c.submit_brief(brief(), CreativityLevel::Buzzed, AiEngine::Grok).unwrap();
        assert!(prompt.contains("EXACTLY FIVE"));
        assert_eq!(c.current_prompt(), Some(prompt.as_str()));
        assert!(c.state().is_in_flight());

        assert_eq!(c.receive_raw_response(FIVE).unwrap(), 5);
        assert_eq!(c.state(), &RefineState::IdeasDisplayed);
        assert!(c.current_prompt().is_none());
        assert_eq!(c.ideas().approved_count(), 0);
    }

    #[test]
    fn test_busy_while_in_flight() {
        let (mut c, _) = controller();
        c.submit_brief(brief(), CreativityLevel::Buzzed, AiEngine::Grok).unwrap();
        assert!(matches!(
            c.submit_brief(brief(), CreativityLevel::None, AiEngine::Grok),
            Err(StudioError::Busy)
        ));
        assert!(matches!(c.select_for_refine(0), Err(StudioError::Busy)));
        assert!(matches!(c.request_new_ideas(None), Err(StudioError::Busy)));
    }

    #[test]
    fn test_empty_response_rolls_back() {
        let (mut c, _) = displayed();
        c.request_new_ideas(None).unwrap();
        let err = c.receive_raw_response("Sorry, I can't help with that.").unwrap_err();
        assert!(matches!(err, StudioError::NoIdeasFound));
        assert_eq!(c.state(), &RefineState::IdeasDisplayed);
        assert_eq!(c.ideas().last_generated().len(), 5);
    }

    #[test]
    fn test_receive_outside_cycle_is_invalid() {
        let (mut c, _) = controller();
        assert!(matches!(
            c.receive_raw_response(FIVE),
            Err(StudioError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_settings_change_needs_confirmation_while_displayed() {
        let (mut c, _) = displayed();
        let err = c.set_level(CreativityLevel::Tripping).unwrap_err();
        assert!(matches!(err, StudioError::ConfirmationRequired));
        assert_eq!(c.settings().level, CreativityLevel::Buzzed);
        assert_eq!(c.pending_change().map(|s| s.level), Some(CreativityLevel::Tripping));

        c.confirm_settings_change(true).unwrap();
        assert_eq!(c.settings().level, CreativityLevel::Tripping);
        assert_eq!(c.state(), &RefineState::BriefReady);
        assert_eq!(c.ideas().last_generated().len(), 5);

        // don't ask again: next change from displayed applies directly
        c.generate().unwrap();
        c.receive_raw_response(FIVE).unwrap();
        c.set_engine(AiEngine::Perplexity).unwrap();
        assert_eq!(c.settings().engine, AiEngine::Perplexity);
    }

    #[test]
    fn test_confirm_without_pending_is_invalid() {
        let (mut c, _) = controller();
        assert!(matches!(
            c.confirm_settings_change(false),
            Err(StudioError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_resubmit_from_displayed() {
        let (mut c, _) = displayed();
        assert!(matches!(
            c.submit_brief(brief(), CreativityLevel::Buzzed, AiEngine::Grok),
            Err(StudioError::InvalidTransition { .. })
        ));
        assert!(matches!(
            c.submit_brief(brief(), CreativityLevel::None, AiEngine::Grok),
            Err(StudioError::ConfirmationRequired)
        ));
    }

    #[test]
    fn test_refine_auto_approves_and_summary_becomes_notes() {
        let (mut c, _) = displayed();
        let prompt = c.select_for_refine(1).unwrap();
        assert!(prompt.contains("Title: B"));
        assert_eq!(c.ideas().approved_count(), 1);
        assert!(matches!(c.state(), RefineState::Refining { .. }));

        c.record_refine_summary("**Sharper** version with [a link](https://x.ai)").unwrap();
        assert_eq!(c.state(), &RefineState::IdeasDisplayed);
        assert_eq!(c.ideas().approved()[0].notes, "Sharper version with a link");
    }

    #[test]
    fn test_refine_unknown_index() {
        let (mut c, _) = displayed();
        assert!(matches!(c.select_for_refine(9), Err(StudioError::UnknownIdea(9))));
        assert_eq!(c.state(), &RefineState::IdeasDisplayed);
    }

    #[test]
    fn test_cancel_restores_and_never_touches_store() {
        let (mut c, shared) = displayed();
        c.approve(0, Some("keep")).unwrap();
        let writes = shared.with(|s| s.write_count()).unwrap();

        c.request_new_ideas(Some("funnier")).unwrap();
        assert!(c.cancel());
        assert_eq!(c.state(), &RefineState::IdeasDisplayed);
        assert!(c.current_prompt().is_none());

        c.select_for_refine(0).unwrap();
        assert!(c.cancel());
        assert_eq!(c.state(), &RefineState::IdeasDisplayed);

        // idea 0 was already approved, so refine wrote nothing either
        assert_eq!(shared.with(|s| s.write_count()).unwrap(), writes);
        assert_eq!(c.ideas().approved_count(), 1);
        assert!(!c.cancel());
    }

    #[test]
    fn test_cancel_initial_returns_to_brief_ready() {
        let (mut c, _) = controller();
        c.submit_brief(brief(), CreativityLevel::Buzzed, AiEngine::Grok).unwrap();
        assert!(c.cancel());
        assert_eq!(c.state(), &RefineState::BriefReady);
    }

    #[test]
    fn test_new_ideas_continue_numbering_after_approved() {
        let (mut c, _) = displayed();
        c.approve(0, None).unwrap();
        c.approve(1, None).unwrap();
        let prompt = c.request_new_ideas(None).unwrap();
        assert!(prompt.contains("Prior Feedback:"));
        c.receive_raw_response(FIVE).unwrap();
        assert_eq!(c.ideas().last_generated()[0].ordinal, 3);
    }

    #[test]
    fn test_clear() {
        let (mut c, _) = displayed();
        c.approve(0, None).unwrap();
        c.clear(false);
        assert_eq!(c.state(), &RefineState::BriefReady);
        assert_eq!(c.ideas().approved_count(), 0);
        assert!(c.ideas().last_generated().is_empty());

        c.clear(true);
        assert_eq!(c.state(), &RefineState::Idle);
        assert!(c.settings().brief.is_empty());
    }

    #[test]
    fn test_jobs_track_brief_and_ideas() {
        let (mut c, _) = controller();
        c.start_job("spring", brief(), CreativityLevel::Microdose).unwrap();
        assert_eq!(c.current_job(), Some("spring"));
        c.generate().unwrap();
        c.receive_raw_response(FIVE).unwrap();

        let job = c.jobs().get("spring").unwrap().unwrap();
        assert_eq!(job.ideas.len(), 5);
        assert_eq!(job.level, CreativityLevel::Microdose);

        c.clear(true);
        c.open_job("spring").unwrap();
        assert_eq!(c.state(), &RefineState::IdeasDisplayed);
        assert_eq!(c.ideas().last_generated().len(), 5);
        assert_eq!(c.settings().level, CreativityLevel::Microdose);

        assert!(c.delete_job("spring").unwrap());
        assert!(c.current_job().is_none());
        assert!(matches!(c.open_job("spring"), Err(StudioError::Store(StoreError::JobNotFound(_)))));
    }

    #[test]
    fn test_parse_level_and_engine() {
        assert_eq!(parse_level("tripping").unwrap(), CreativityLevel::Tripping);
        assert!(parse_level("sober").unwrap_err().is_input_error());
        assert_eq!(parse_engine("ChatGPT").unwrap(), AiEngine::ChatGPT);
        assert!(matches!(parse_engine("bard"), Err(StudioError::InvalidEngine(_))));
    }

    #[tokio::test]
    async fn test_execute_success() {
        let (mut c, _) = controller();
        c.submit_brief(brief(), CreativityLevel::Buzzed, AiEngine::Grok).unwrap();
        let channel = MockChannel::replying(FIVE);
        assert_eq!(c.execute(&channel).await.unwrap(), ExecuteOutcome::Ideas(5));
        assert_eq!(channel.call_count(), 1);
        assert!(channel.prompts()[0].contains("Acme running socks"));
        assert_eq!(c.state(), &RefineState::IdeasDisplayed);
    }

    #[tokio::test]
    async fn test_execute_failure_releases_guard() {
        let (mut c, _) = controller();
        c.submit_brief(brief(), CreativityLevel::Buzzed, AiEngine::Grok).unwrap();
        let err = c.execute(&MockChannel::failing(503)).await.unwrap_err();
        assert!(matches!(err, StudioError::External(ref e) if e.status() == 503));
        assert_eq!(c.state(), &RefineState::BriefReady);
        assert!(c.ideas().last_generated().is_empty());

        // guard released: a new submission is accepted
        assert!(c.generate().is_ok());
    }

    #[tokio::test]
    async fn test_execute_refine_conversation() {
        let (mut c, _) = displayed();
        c.select_for_refine(0).unwrap();
        let outcome = c
            .execute(&MockChannel::replying("What would you like to change?"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ExecuteOutcome::Conversation("What would you like to change?".to_string())
        );
        assert!(matches!(c.state(), RefineState::Refining { .. }));
        assert!(matches!(
            c.execute(&MockChannel::replying("again")).await,
            Err(StudioError::InvalidTransition { .. })
        ));
    }

    const TWO: &str = "**Title:** Y\n**Description:** Dy.\n**Rationale:** Ry.\n\n\
                       **Title:** Z\n**Description:** Dz.\n**Rationale:** Rz.";

    fn titles(c: &RefinementController) -> Vec<String> {
        c.ideas().last_generated().iter().map(|i| i.title.clone()).collect()
    }

    #[test]
    fn test_replacement_splices_selected_ideas_and_syncs_job() {
        let (mut c, _) = controller();
        c.start_job("spring", brief(), CreativityLevel::Buzzed).unwrap();
        c.generate().unwrap();
        c.receive_raw_response(FIVE).unwrap();

        let prompt = c.request_replacement(&[3, 1, 3], Some("warmer")).unwrap();
        assert!(prompt.contains("- B: Db."));
        assert!(prompt.contains("- D: Dd."));
        assert!(prompt.contains("Only the first 2 ideas"));
        assert!(prompt.contains("User guidance: warmer"));
        assert_eq!(c.state(), &RefineState::Replacing { indices: vec![3, 1] });

        assert_eq!(c.receive_raw_response(TWO).unwrap(), 2);
        assert_eq!(titles(&c), vec!["A", "Z", "C", "Y", "E"]);
        assert_eq!(c.ideas().last_generated()[3].ordinal, 4);
        assert_eq!(c.state(), &RefineState::IdeasDisplayed);

        let job = c.jobs().get("spring").unwrap().unwrap();
        let job_titles: Vec<_> = job.ideas.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(job_titles, vec!["A", "Z", "C", "Y", "E"]);
    }

    #[test]
    fn test_replacement_with_short_reply_replaces_what_it_can() {
        let (mut c, _) = displayed();
        c.request_replacement(&[0, 1, 2], None).unwrap();
        assert_eq!(c.receive_raw_response("**Title:** Only\n**Description:** One.").unwrap(), 1);
        assert_eq!(titles(&c), vec!["Only", "B", "C", "D", "E"]);
    }

    #[test]
    fn test_replacement_rejects_bad_selection() {
        let (mut c, _) = displayed();
        assert!(matches!(c.request_replacement(&[], None), Err(StudioError::NothingSelected)));
        assert!(matches!(c.request_replacement(&[0, 5], None), Err(StudioError::UnknownIdea(5))));
        assert_eq!(c.state(), &RefineState::IdeasDisplayed);

        let (mut idle, _) = controller();
        assert!(matches!(
            idle.request_replacement(&[0], None),
            Err(StudioError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_replacement_cancel_and_empty_reply_keep_ideas() {
        let (mut c, shared) = displayed();
        let writes = shared.with(|s| s.write_count()).unwrap();

        c.request_replacement(&[0], None).unwrap();
        assert!(matches!(c.request_new_ideas(None), Err(StudioError::Busy)));
        assert!(c.cancel());
        assert_eq!(c.state(), &RefineState::IdeasDisplayed);

        c.request_replacement(&[0], None).unwrap();
        assert!(matches!(c.receive_raw_response("nothing here"), Err(StudioError::NoIdeasFound)));
        assert_eq!(c.state(), &RefineState::IdeasDisplayed);
        assert_eq!(titles(&c), vec!["A", "B", "C", "D", "E"]);
        assert_eq!(shared.with(|s| s.write_count()).unwrap(), writes);
    }

    #[tokio::test]
    async fn test_execute_replacement() {
        let (mut c, _) = displayed();
        c.request_replacement(&[4], None).unwrap();
        let channel = MockChannel::replying(TWO);
        assert_eq!(c.execute(&channel).await.unwrap(), ExecuteOutcome::Ideas(1));
        assert_eq!(titles(&c), vec!["A", "B", "C", "D", "Y"]);
        assert!(channel.prompts()[0].contains("Replace only the following ideas"));
    }

    #[tokio::test]
    async fn test_develop_leaves_state_alone() {
        let (c, _) = displayed();
        let channel = MockChannel::new(vec![
            Ok("Headline :: Run further\nActivation :: Sock swap at races\nskip me".to_string()),
            Ok("no elements".to_string()),
        ]);

        let elements = c.develop(1, Some("make 4 radio spots"), &channel).await.unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[1].title, "Activation");
        assert!(channel.prompts()[0].starts_with("Based on this idea: \"B: Db.\", make 4 radio spots."));
        assert_eq!(c.state(), &RefineState::IdeasDisplayed);

        assert!(matches!(
            c.develop(1, None, &channel).await,
            Err(StudioError::NoElementsFound)
        ));
        assert!(matches!(c.develop_prompt(9, None), Err(StudioError::UnknownIdea(9))));
    }
}
