//! Integration tests for IX Studio
//!
//! These tests drive the pipeline end to end: prompt synthesis, reply
//! parsing, the refinement controller and durable storage.

use std::sync::Mutex;

use async_trait::async_trait;
use ixstudio::controller::{ExecuteOutcome, RefineState, RefinementController, Settings, StudioError};
use ixstudio::domain::{AiEngine, CreativeBrief, CreativityLevel, Idea, PromptMode};
use ixstudio::llm::{LlmChannel, LlmError};
use ixstudio::parser;
use ixstudio::prompts::{FixedSeed, PromptBuilder, PromptContext, PromptLoader};
use ixstudio::store::{APPROVED_KEY, IdeaStore, JobRegistry, WriteOutcome};
use keystore::{FileStore, KeyValueStore, MemoryStore, SharedStore};
use tempfile::TempDir;

/// Channel that replays scripted replies and records prompts
struct ScriptedChannel {
    replies: Mutex<Vec<Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedChannel {
    fn new(replies: Vec<Result<String, LlmError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().rev().collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmChannel for ScriptedChannel {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Err(LlmError::InvalidResponse("script exhausted".to_string())))
    }
}

fn reply(titles: &[&str]) -> String {
    titles
        .iter()
        .map(|t| format!("**Title:** {}\n**Description:** {} in one line.\n**Rationale:** Fits.", t, t))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn builder() -> PromptBuilder {
    PromptBuilder::new(PromptLoader::embedded_only(), Box::new(FixedSeed(42)))
}

fn controller_over<S: KeyValueStore + 'static>(store: SharedStore<S>) -> RefinementController {
    RefinementController::new(
        builder(),
        IdeaStore::open(Box::new(store.clone())),
        JobRegistry::new(Box::new(store)),
        Settings::default(),
    )
}

fn brief() -> CreativeBrief {
    CreativeBrief::new("Taglines for Acme trail running socks")
}

// =============================================================================
// Prompt and parser
// =============================================================================

#[test]
fn test_every_level_carries_output_contract() {
    let builder = builder();
    let brief = brief();
    for level in CreativityLevel::ALL {
        for mode in [PromptMode::Initial, PromptMode::NewIdeas] {
            let prompt = builder
                .build_prompt(mode, &brief, level, &PromptContext::default())
                .unwrap();
            assert!(prompt.contains("You MUST generate EXACTLY FIVE taglines"), "{level} {mode}");
            assert!(prompt.contains("(e.g., **Title:**)"), "{level} {mode}");
            assert!(prompt.contains("**Description:**"), "{level} {mode}");
            assert!(prompt.contains("**Rationale:**"), "{level} {mode}");
        }
    }
}

#[test]
fn test_microdose_seed_is_verbatim() {
    let prompt = builder()
        .build_prompt(
            PromptMode::Initial,
            &brief(),
            CreativityLevel::Microdose,
            &PromptContext::default(),
        )
        .unwrap();
    assert!(prompt.contains("random integer between 1 and 100: 42."));

    let buzzed = builder()
        .build_prompt(PromptMode::Initial, &brief(), CreativityLevel::Buzzed, &PromptContext::default())
        .unwrap();
    assert!(!buzzed.contains("random integer"));
}

#[test]
fn test_round_trip_five_blocks() {
    let outcome = parser::parse(&reply(&["One", "Two", "Three", "Four", "Five"]), 0);
    assert_eq!(outcome.new_ideas.len(), 5);
    assert!(outcome.revised_ideas.is_empty());
    let titles: Vec<_> = outcome.new_ideas.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["One", "Two", "Three", "Four", "Five"]);
}

#[test]
fn test_reparse_of_canonical_blocks_is_stable() {
    let first = parser::parse(&reply(&["Sole Mates", "Trail Blazers"]), 0);
    let canonical = first
        .combined()
        .iter()
        .map(Idea::to_block)
        .collect::<Vec<_>>()
        .join("\n\n");
    let second = parser::parse(&canonical, 0);
    assert_eq!(first.combined().len(), second.combined().len());
    for (a, b) in first.combined().iter().zip(second.combined().iter()) {
        assert_eq!(a.identity(), b.identity());
        assert_eq!(a.rationale, b.rationale);
    }
}

// =============================================================================
// Controller over durable storage
// =============================================================================

#[tokio::test]
async fn test_generate_approve_refine_summarize() {
    let store = SharedStore::new(MemoryStore::new());
    let mut controller = controller_over(store.clone());
    let channel = ScriptedChannel::new(vec![
        Ok(reply(&["A", "B", "C", "D", "E"])),
        Ok("Happy to refine. What should change?".to_string()),
    ]);

    controller
        .submit_brief(brief(), CreativityLevel::Buzzed, AiEngine::Grok)
        .unwrap();
    assert_eq!(controller.execute(&channel).await.unwrap(), ExecuteOutcome::Ideas(5));

    controller.approve(0, Some("strong opener")).unwrap();
    controller.select_for_refine(2).unwrap();
    assert_eq!(controller.ideas().approved_count(), 2);

    let outcome = controller.execute(&channel).await.unwrap();
    assert!(matches!(outcome, ExecuteOutcome::Conversation(_)));
    controller
        .record_refine_summary("Shorter, with a *wink* at hikers.")
        .unwrap();

    assert_eq!(controller.state(), &RefineState::IdeasDisplayed);
    let stored: Vec<Idea> = serde_json::from_str(&store.get(APPROVED_KEY).unwrap().unwrap()).unwrap();
    let c = stored.iter().find(|i| i.title == "C").unwrap();
    assert_eq!(c.notes, "Shorter, with a wink at hikers.");
    assert_eq!(channel.prompt_count(), 2);
}

#[tokio::test]
async fn test_external_failure_leaves_nothing_behind() {
    let store = SharedStore::new(MemoryStore::new());
    let mut controller = controller_over(store.clone());
    let channel = ScriptedChannel::new(vec![
        Err(LlmError::ApiError {
            status: 500,
            message: "upstream down".to_string(),
        }),
        Ok(reply(&["After", "Retry"])),
    ]);

    controller
        .submit_brief(brief(), CreativityLevel::None, AiEngine::ChatGPT)
        .unwrap();
    let err = controller.execute(&channel).await.unwrap_err();
    assert!(err.to_string().contains("upstream down"));
    assert_eq!(controller.state(), &RefineState::BriefReady);
    assert!(controller.ideas().last_generated().is_empty());
    assert_eq!(store.with(|s| s.write_count()).unwrap(), 0);

    controller.generate().unwrap();
    assert_eq!(controller.execute(&channel).await.unwrap(), ExecuteOutcome::Ideas(2));
}

#[test]
fn test_unparseable_paste_keeps_previous_ideas() {
    let mut controller = controller_over(SharedStore::new(MemoryStore::new()));
    controller
        .submit_brief(brief(), CreativityLevel::Tripping, AiEngine::Grok)
        .unwrap();
    controller.receive_raw_response(&reply(&["Keep", "Me"])).unwrap();

    controller.request_new_ideas(Some("go weirder")).unwrap();
    let err = controller.receive_raw_response("").unwrap_err();
    assert!(matches!(err, StudioError::NoIdeasFound));
    assert_eq!(controller.state(), &RefineState::IdeasDisplayed);
    let titles: Vec<_> = controller
        .ideas()
        .last_generated()
        .iter()
        .map(|i| i.title.clone())
        .collect();
    assert_eq!(titles, vec!["Keep", "Me"]);
}

#[test]
fn test_quota_failure_keeps_approval() {
    let store = SharedStore::new(MemoryStore::with_quota(16));
    let mut controller = controller_over(store.clone());
    controller
        .submit_brief(brief(), CreativityLevel::Buzzed, AiEngine::Grok)
        .unwrap();
    controller.receive_raw_response(&reply(&["Too", "Big"])).unwrap();

    let outcome = controller.approve(0, None).unwrap();
    assert!(outcome.is_failed());
    assert_eq!(controller.ideas().approved_count(), 1);
    assert!(controller.ideas().last_storage_error().is_some_and(|e| e.is_quota()));
    assert!(store.get(APPROVED_KEY).unwrap().is_none());
}

#[test]
fn test_durable_approvals_are_a_superset_until_reset() {
    let temp = TempDir::new().unwrap();

    {
        let store = SharedStore::new(FileStore::open(temp.path()).unwrap());
        let mut controller = controller_over(store);
        controller
            .submit_brief(brief(), CreativityLevel::Buzzed, AiEngine::Grok)
            .unwrap();
        controller.receive_raw_response(&reply(&["A", "B", "C"])).unwrap();
        controller.approve(0, None).unwrap();
        controller.approve(1, None).unwrap();
        assert_eq!(controller.unapprove(1).unwrap(), WriteOutcome::Written);
        assert_eq!(controller.ideas().approved_count(), 1);
    }

    // a new session still sees both
    let store = SharedStore::new(FileStore::open(temp.path()).unwrap());
    let mut controller = controller_over(store.clone());
    let titles: Vec<_> = controller.archived().into_iter().map(|i| i.title).collect();
    assert_eq!(titles.len(), 2);
    assert!(titles.contains(&"A".to_string()));
    assert!(titles.contains(&"B".to_string()));

    // unapproving something never approved writes nothing
    controller
        .submit_brief(brief(), CreativityLevel::Buzzed, AiEngine::Grok)
        .unwrap();
    controller.receive_raw_response(&reply(&["Z"])).unwrap();
    assert_eq!(controller.unapprove(0).unwrap(), WriteOutcome::Unchanged);

    controller.clear(false);
    assert!(controller.archived().is_empty());
    assert!(store.get(APPROVED_KEY).unwrap().is_none());
}

#[test]
fn test_cancel_never_mutates_store() {
    let store = SharedStore::new(MemoryStore::new());
    let mut controller = controller_over(store.clone());
    controller
        .submit_brief(brief(), CreativityLevel::Buzzed, AiEngine::Grok)
        .unwrap();
    assert!(controller.cancel());
    assert_eq!(controller.state(), &RefineState::BriefReady);
    assert!(controller.current_prompt().is_none());
    assert_eq!(store.with(|s| s.write_count()).unwrap(), 0);
    assert!(!controller.cancel());
}

// =============================================================================
// Jobs
// =============================================================================

#[test]
fn test_jobs_survive_reopen() {
    let temp = TempDir::new().unwrap();

    {
        let mut controller = controller_over(SharedStore::new(FileStore::open(temp.path()).unwrap()));
        controller
            .start_job("spring-launch", brief(), CreativityLevel::Microdose)
            .unwrap();
        controller.generate().unwrap();
        controller.receive_raw_response(&reply(&["One", "Two"])).unwrap();
    }

    let mut controller = controller_over(SharedStore::new(FileStore::open(temp.path()).unwrap()));
    let jobs = controller.jobs().list(false).unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].ideas.len(), 2);

    controller.open_job("spring-launch").unwrap();
    assert_eq!(controller.state(), &RefineState::IdeasDisplayed);
    assert_eq!(controller.settings().level, CreativityLevel::Microdose);

    controller.archive_job("spring-launch", true).unwrap();
    assert!(controller.jobs().list(false).unwrap().is_empty());
    assert_eq!(controller.jobs().list(true).unwrap().len(), 1);

    // export and job deletion leave the refinement state alone
    assert!(controller.delete_job("spring-launch").unwrap());
    assert_eq!(controller.state(), &RefineState::IdeasDisplayed);
}

#[tokio::test]
async fn test_replace_selected_ideas_updates_job() {
    let temp = TempDir::new().unwrap();
    let channel = ScriptedChannel::new(vec![
        Ok(reply(&["One", "Two", "Three", "Four", "Five"])),
        Ok(reply(&["Fresh", "Spare"])),
    ]);

    {
        let mut controller = controller_over(SharedStore::new(FileStore::open(temp.path()).unwrap()));
        controller
            .start_job("autumn", brief(), CreativityLevel::Buzzed)
            .unwrap();
        controller.generate().unwrap();
        controller.execute(&channel).await.unwrap();

        let prompt = controller.request_replacement(&[1], Some("more mud")).unwrap();
        assert!(prompt.contains("- Two: Two in one line."));
        assert_eq!(controller.execute(&channel).await.unwrap(), ExecuteOutcome::Ideas(1));
    }

    let mut controller = controller_over(SharedStore::new(FileStore::open(temp.path()).unwrap()));
    controller.open_job("autumn").unwrap();
    let titles: Vec<_> = controller
        .ideas()
        .last_generated()
        .iter()
        .map(|i| i.title.clone())
        .collect();
    assert_eq!(titles, vec!["One", "Fresh", "Three", "Four", "Five"]);
}

#[test]
fn test_corrupt_store_file_does_not_block_startup() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("store.json"), "{ not json").unwrap();

    let store = SharedStore::new(FileStore::open_with_quota(temp.path(), None).unwrap());
    let mut controller = controller_over(store.clone());
    assert!(controller.archived().is_empty());

    controller
        .submit_brief(brief(), CreativityLevel::Buzzed, AiEngine::Grok)
        .unwrap();
    controller.receive_raw_response(&reply(&["Saved"])).unwrap();
    assert_eq!(controller.approve(0, None).unwrap(), WriteOutcome::Written);
    assert!(store.get(APPROVED_KEY).unwrap().is_some());
    assert!(temp.path().join("store.json.corrupt").exists());
}
