//! Studio session management

use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::debug;

use crate::controller::{ExecuteOutcome, RefineState, RefinementController, StudioError, parse_engine, parse_level};
use crate::domain::{BriefFields, CreativeBrief, Idea};
use crate::export::{self, DEFAULT_EXPORT_FILE};
use crate::llm::LlmChannel;
use crate::parser::CampaignElement;
use crate::store::WriteOutcome;

/// Line that ends a multi-line paste
const END_OF_PASTE: &str = ".";

/// Interactive studio session
pub struct StudioSession {
    controller: RefinementController,
    channel: Option<Arc<dyn LlmChannel>>,
}

impl StudioSession {
    /// Create a new studio session; without a channel only the paste workflow is available
    pub fn new(controller: RefinementController, channel: Option<Arc<dyn LlmChannel>>) -> Self {
        Self { controller, channel }
    }

    /// Run the studio main loop
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            let prompt = format!("{} {} ", self.controller.state().name().dimmed(), ">".bright_green());
            match rl.readline(&prompt) {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(input);

                    if input.starts_with('/') {
                        match self.handle_slash_command(input, &mut rl).await {
                            SlashResult::Continue => continue,
                            SlashResult::Quit => break,
                        }
                    } else {
                        self.handle_text(input);
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "IX Idea Studio".bright_cyan().bold());
        let settings = self.controller.settings();
        println!("Level: {}  Engine: {}", settings.level.name().yellow(), settings.engine.to_string().yellow());
        if self.channel.is_none() {
            println!("{}", "No LLM API key configured; paste replies with /paste.".dimmed());
        }
        println!("Type a brief, {} for help, {} to quit", "/help".yellow(), "/quit".yellow());
        println!();
    }

    /// Plain text is a brief before anything is generated
    fn handle_text(&mut self, input: &str) {
        let state = self.controller.state().clone();
        match state {
            RefineState::Idle | RefineState::BriefReady => {
                let brief = CreativeBrief::new(input).with_fields(self.controller.settings().brief.fields.clone());
                self.apply(|c| c.set_brief(brief), "Brief set. /generate to build the prompt.");
            }
            RefineState::Refining { .. } => {
                println!("{}", "Paste the model's summary with /summary, or its ideas with /paste.".dimmed());
            }
            _ => {
                println!("{}", "Use /brief to change the brief, /paste to paste a reply.".dimmed());
            }
        }
    }

    async fn handle_slash_command(&mut self, input: &str, rl: &mut DefaultEditor) -> SlashResult {
        let (cmd, rest) = match input.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (input, ""),
        };
        debug!(%cmd, "handle_slash_command: called");

        match cmd {
            "/help" | "/h" => self.print_help(),
            "/quit" | "/q" | "/exit" => return SlashResult::Quit,
            "/brief" | "/b" => {
                if rest.is_empty() {
                    self.print_settings();
                } else {
                    let brief = CreativeBrief::new(rest).with_fields(self.controller.settings().brief.fields.clone());
                    self.apply(|c| c.set_brief(brief), "Brief set.");
                }
            }
            "/field" => self.set_field(rest),
            "/level" => match parse_level(rest) {
                Ok(level) => self.apply(|c| c.set_level(level), "Level set."),
                Err(e) => print_error(&e),
            },
            "/engine" => match parse_engine(rest) {
                Ok(engine) => self.apply(|c| c.set_engine(engine), "Engine set."),
                Err(e) => print_error(&e),
            },
            "/generate" | "/g" => {
                let result = self.controller.generate();
                self.show_prompt(result);
            }
            "/new" => {
                let guidance = (!rest.is_empty()).then_some(rest);
                let result = self.controller.request_new_ideas(guidance);
                self.show_prompt(result);
            }
            "/refine" => match index_arg(rest) {
                Some(index) => {
                    let result = self.controller.select_for_refine(index);
                    self.show_prompt(result);
                }
                None => println!("{} Usage: /refine <n>", "?".yellow()),
            },
            "/replace" => match split_indices(rest) {
                (Some(indices), guidance) => {
                    let result = self.controller.request_replacement(&indices, guidance);
                    self.show_prompt(result);
                }
                _ => println!("{} Usage: /replace <n[,n...]> [guidance]", "?".yellow()),
            },
            "/develop" => match split_index(rest) {
                (Some(index), instruction) => self.develop(index, instruction, rl).await,
                _ => println!("{} Usage: /develop <n> [instruction]", "?".yellow()),
            },
            "/prompt" => match self.controller.current_prompt() {
                Some(prompt) => println!("{}", prompt),
                None => println!("{}", "No prompt outstanding.".dimmed()),
            },
            "/send" | "/s" => self.send().await,
            "/paste" | "/p" => {
                if let Some(text) = read_block(rl) {
                    match self.controller.receive_raw_response(&text) {
                        Ok(count) => {
                            println!("{} {} ideas", "✓".green(), count);
                            self.print_ideas();
                        }
                        Err(e) => print_error(&e),
                    }
                }
            }
            "/summary" => {
                if let Some(text) = read_block(rl) {
                    match self.controller.record_refine_summary(&text) {
                        Ok(outcome) => report(&outcome, "Summary saved as notes."),
                        Err(e) => print_error(&e),
                    }
                }
            }
            "/cancel" => {
                if self.controller.cancel() {
                    println!("{}", "Cancelled.".dimmed());
                } else {
                    println!("{}", "Nothing to cancel.".dimmed());
                }
            }
            "/confirm" => {
                let always = rest == "always";
                match self.controller.confirm_settings_change(always) {
                    Ok(()) => println!("{} Settings applied.", "✓".green()),
                    Err(e) => print_error(&e),
                }
            }
            "/approve" | "/a" => {
                let (index, notes) = split_index(rest);
                match index {
                    Some(index) => match self.controller.approve(index, notes) {
                        Ok(outcome) => report(&outcome, "Approved."),
                        Err(e) => print_error(&e),
                    },
                    None => println!("{} Usage: /approve <n> [notes]", "?".yellow()),
                }
            }
            "/unapprove" => match index_arg(rest) {
                Some(index) => match self.controller.unapprove(index) {
                    Ok(outcome) => report(&outcome, "Unapproved."),
                    Err(e) => print_error(&e),
                },
                None => println!("{} Usage: /unapprove <n>", "?".yellow()),
            },
            "/notes" => {
                let (index, notes) = split_index(rest);
                match (index, notes) {
                    (Some(index), Some(notes)) => match self.controller.set_notes(index, notes) {
                        Ok(outcome) => report(&outcome, "Notes saved."),
                        Err(e) => print_error(&e),
                    },
                    _ => println!("{} Usage: /notes <n> <text>", "?".yellow()),
                }
            }
            "/feedback" => {
                if rest.is_empty() {
                    let feedback = self.controller.ideas().general_feedback();
                    if feedback.is_empty() {
                        println!("{}", "No general feedback.".dimmed());
                    } else {
                        println!("{}", feedback);
                    }
                } else {
                    let outcome = self.controller.set_general_feedback(rest);
                    report(&outcome, "Feedback saved.");
                }
            }
            "/list" | "/l" => self.print_ideas(),
            "/approved" => self.print_approved(),
            "/export" => {
                let path = if rest.is_empty() {
                    PathBuf::from(DEFAULT_EXPORT_FILE)
                } else {
                    PathBuf::from(rest)
                };
                let ideas = self.controller.archived();
                match export::write_markdown(&ideas, &path) {
                    Ok(()) => println!("{} Wrote {} ideas to {}", "✓".green(), ideas.len(), path.display()),
                    Err(e) => println!("{} {}", "✗".red(), e),
                }
            }
            "/clear" => {
                let outcome = self.controller.clear(rest == "all");
                report(&outcome, "Cleared.");
            }
            "/job" => self.switch_job(rest),
            "/jobs" => self.print_jobs(),
            _ => {
                println!("{} Unknown command: {}", "?".yellow(), cmd);
                println!("Type {} for available commands", "/help".yellow());
            }
        }
        SlashResult::Continue
    }

    fn print_help(&self) {
        println!();
        println!("{}", "Brief and settings:".bright_cyan());
        println!("  {:14} Set the brief (or show settings)", "/brief".yellow());
        println!("  {:14} Set a brief field: type, brand, audience, message, info", "/field".yellow());
        println!("  {:14} none, microdose, buzzed, tripping", "/level".yellow());
        println!("  {:14} grok, chatgpt, perplexity", "/engine".yellow());
        println!("  {:14} Apply a held settings change ('always' stops asking)", "/confirm".yellow());
        println!();
        println!("{}", "Generating:".bright_cyan());
        println!("  {:14} Build the prompt for the brief", "/generate".yellow());
        println!("  {:14} Build a new-ideas prompt, with optional guidance", "/new".yellow());
        println!("  {:14} Start a refine conversation on idea n", "/refine".yellow());
        println!("  {:14} Replace ideas n,m,... with fresh ones, optional guidance", "/replace".yellow());
        println!("  {:14} Build idea n into 4 campaign elements", "/develop".yellow());
        println!("  {:14} Show the outstanding prompt", "/prompt".yellow());
        println!("  {:14} Run the outstanding prompt through the LLM", "/send".yellow());
        println!("  {:14} Paste a reply, ending with a '.' line", "/paste".yellow());
        println!("  {:14} Paste a refine summary, ending with a '.' line", "/summary".yellow());
        println!("  {:14} Abandon the outstanding prompt", "/cancel".yellow());
        println!();
        println!("{}", "Curating:".bright_cyan());
        println!("  {:14} Show the last generated ideas", "/list".yellow());
        println!("  {:14} Approve idea n, with optional notes", "/approve".yellow());
        println!("  {:14} Unapprove idea n", "/unapprove".yellow());
        println!("  {:14} Attach notes to idea n", "/notes".yellow());
        println!("  {:14} Show or set general feedback", "/feedback".yellow());
        println!("  {:14} Show approved ideas", "/approved".yellow());
        println!("  {:14} Write approved ideas to Markdown", "/export".yellow());
        println!("  {:14} Clear ideas and approvals ('all' resets the brief)", "/clear".yellow());
        println!();
        println!("{}", "Jobs:".bright_cyan());
        println!("  {:14} Open a job, or save the brief under a new one", "/job".yellow());
        println!("  {:14} List jobs", "/jobs".yellow());
        println!();
        println!("  {:14} Show this help", "/help".yellow());
        println!("  {:14} Exit the studio", "/quit".yellow());
        println!();
    }

    /// Run a settings change, explaining a held change
    fn apply(&mut self, change: impl FnOnce(&mut RefinementController) -> Result<(), StudioError>, done: &str) {
        match change(&mut self.controller) {
            Ok(()) => println!("{} {}", "✓".green(), done),
            Err(StudioError::ConfirmationRequired) => {
                println!(
                    "{} Ideas are showing. {} to apply the change, {} to stop asking.",
                    "!".yellow(),
                    "/confirm".yellow(),
                    "/confirm always".yellow()
                );
            }
            Err(e) => print_error(&e),
        }
    }

    fn set_field(&mut self, rest: &str) {
        let (name, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let current = self.controller.settings().brief.clone();
        let mut fields: BriefFields = current.fields.clone();
        let slot = match name {
            "type" => &mut fields.idea_type,
            "brand" => &mut fields.brand_product,
            "audience" => &mut fields.target_audience,
            "message" => &mut fields.message,
            "info" => &mut fields.additional_info,
            _ => {
                println!("{} Usage: /field <type|brand|audience|message|info> <value>", "?".yellow());
                return;
            }
        };
        *slot = value.trim().to_string();
        let brief = CreativeBrief::new(current.text).with_fields(fields);
        self.apply(|c| c.set_brief(brief), "Field set.");
    }

    fn show_prompt(&self, result: Result<String, StudioError>) {
        match result {
            Ok(prompt) => {
                println!();
                println!("{}", prompt);
                println!();
                let engine = self.controller.settings().engine;
                println!(
                    "{} Paste into {} ({}) and bring the reply back with {}{}",
                    "→".bright_blue(),
                    engine,
                    engine.url().dimmed(),
                    "/paste".yellow(),
                    if self.channel.is_some() { ", or run it with /send" } else { "" }
                );
            }
            Err(e) => print_error(&e),
        }
    }

    async fn send(&mut self) {
        let Some(channel) = self.channel.clone() else {
            println!("{} No LLM channel configured; use /paste.", "✗".red());
            return;
        };
        println!("{}", "Waiting for the model...".dimmed());
        match self.controller.execute(channel.as_ref()).await {
            Ok(ExecuteOutcome::Ideas(count)) => {
                println!("{} {} ideas", "✓".green(), count);
                self.print_ideas();
            }
            Ok(ExecuteOutcome::Conversation(text)) => {
                println!();
                println!("{}", text);
                println!();
                println!("{}", "Record the outcome with /summary, or /cancel.".dimmed());
            }
            Err(e) => print_error(&e),
        }
    }

    /// Develop through the channel, or print the prompt and take a paste
    async fn develop(&mut self, index: usize, instruction: Option<&str>, rl: &mut DefaultEditor) {
        let result = match self.channel.clone() {
            Some(channel) => {
                println!("{}", "Waiting for the model...".dimmed());
                self.controller.develop(index, instruction, channel.as_ref()).await
            }
            None => match self.controller.develop_prompt(index, instruction) {
                Ok(prompt) => {
                    println!();
                    println!("{}", prompt);
                    println!();
                    match read_block(rl) {
                        Some(text) => self.controller.receive_elements(&text),
                        None => return,
                    }
                }
                Err(e) => Err(e),
            },
        };
        match result {
            Ok(elements) => print_elements(&elements),
            Err(e) => print_error(&e),
        }
    }

    fn switch_job(&mut self, name: &str) {
        if name.is_empty() {
            match self.controller.current_job() {
                Some(job) => println!("Current job: {}", job.yellow()),
                None => println!("{}", "No current job.".dimmed()),
            }
            return;
        }
        let exists = matches!(self.controller.jobs().get(name), Ok(Some(_)));
        let result = if exists {
            self.controller.open_job(name)
        } else {
            let settings = self.controller.settings().clone();
            self.controller.start_job(name, settings.brief, settings.level)
        };
        match result {
            Ok(()) => {
                println!("{} Job {}", "✓".green(), name.yellow());
                if !self.controller.ideas().last_generated().is_empty() {
                    self.print_ideas();
                }
            }
            Err(e) => print_error(&e),
        }
    }

    fn print_settings(&self) {
        let settings = self.controller.settings();
        println!();
        if settings.brief.is_empty() {
            println!("{}", "No brief.".dimmed());
        } else {
            println!("{}", settings.brief.render());
        }
        println!();
        println!("Level: {}  Engine: {}", settings.level.name().yellow(), settings.engine.to_string().yellow());
        if let Some(pending) = self.controller.pending_change() {
            println!(
                "{} Pending: level {}, engine {} ({} to apply)",
                "!".yellow(),
                pending.level.name(),
                pending.engine,
                "/confirm".yellow()
            );
        }
        println!();
    }

    fn print_ideas(&self) {
        let store = self.controller.ideas();
        let ideas = store.last_generated();
        if ideas.is_empty() {
            println!("{}", "No ideas yet.".dimmed());
            return;
        }
        println!();
        for (i, idea) in ideas.iter().enumerate() {
            let mark = if store.is_approved(&idea.identity()) {
                "✓".green()
            } else {
                " ".normal()
            };
            println!("{} {} {}", mark, format!("{}.", i + 1).yellow(), heading(idea).bright_cyan());
            print_idea_body(idea, store.notes_for(&idea.identity()));
        }
    }

    fn print_approved(&self) {
        let approved = self.controller.ideas().approved();
        if approved.is_empty() {
            println!("{}", "No approved ideas this session.".dimmed());
            return;
        }
        println!();
        for (i, idea) in approved.iter().enumerate() {
            println!("{} {} {}", "✓".green(), format!("{}.", i + 1).yellow(), heading(idea).bright_cyan());
            print_idea_body(idea, Some(idea.notes.as_str()));
        }
    }

    fn print_jobs(&self) {
        match self.controller.jobs().list(false) {
            Ok(jobs) if jobs.is_empty() => println!("{}", "No jobs.".dimmed()),
            Ok(jobs) => {
                for job in jobs {
                    let current = if self.controller.current_job() == Some(job.name.as_str()) {
                        "*".green()
                    } else {
                        " ".normal()
                    };
                    println!("{} {:20} {:10} {} ideas", current, job.name.yellow(), job.level.name(), job.ideas.len());
                }
            }
            Err(e) => println!("{} {}", "✗".red(), e),
        }
    }
}

/// Result of handling a slash command
enum SlashResult {
    Continue,
    Quit,
}

fn heading(idea: &Idea) -> String {
    format!("Idea #{}{}", idea.ordinal, if idea.is_revised() { " (Revised)" } else { "" })
}

fn print_idea_body(idea: &Idea, notes: Option<&str>) {
    println!("     {}", idea.title.bold());
    println!("     {}", idea.description);
    if !idea.rationale.is_empty() {
        println!("     {}", idea.rationale.dimmed());
    }
    if let Some(reaction) = &idea.reaction {
        println!("     {} {}", "Reaction:".bright_blue(), reaction);
    }
    if let Some(notes) = notes.filter(|n| !n.is_empty()) {
        println!("     {} {}", "Notes:".bright_blue(), notes);
    }
    println!();
}

fn print_elements(elements: &[CampaignElement]) {
    println!();
    for element in elements {
        println!("  {}", element.title.bold());
        println!("     {}", element.description);
    }
    println!();
}

fn print_error(err: &StudioError) {
    debug!(error = %err, "print_error: called");
    println!("{} {}", "✗".red(), err);
}

/// Report a write; a failed write keeps the in-memory change
fn report(outcome: &WriteOutcome, done: &str) {
    match outcome {
        WriteOutcome::Failed(message) => {
            println!("{} {} (not saved: {})", "!".yellow(), done, message);
        }
        _ => println!("{} {}", "✓".green(), done),
    }
}

/// Read lines until a lone "."; `None` when the paste was aborted
fn read_block(rl: &mut DefaultEditor) -> Option<String> {
    println!("{}", "Paste text, then a line with a single '.'".dimmed());
    let mut lines = Vec::new();
    loop {
        match rl.readline("") {
            Ok(line) if line.trim() == END_OF_PASTE => break,
            Ok(line) => lines.push(line),
            Err(_) => {
                println!("{}", "Paste aborted.".dimmed());
                return None;
            }
        }
    }
    Some(lines.join("\n"))
}

/// 1-based display number to index
fn index_arg(arg: &str) -> Option<usize> {
    arg.trim().parse::<usize>().ok().filter(|n| *n > 0).map(|n| n - 1)
}

/// Split "<n> rest" into an index and optional trailing text
fn split_index(arg: &str) -> (Option<usize>, Option<&str>) {
    let (head, tail) = arg.split_once(char::is_whitespace).unwrap_or((arg, ""));
    let tail = tail.trim();
    (index_arg(head), (!tail.is_empty()).then_some(tail))
}

/// Split "<n,m,...> rest" into indices and optional trailing text
fn split_indices(arg: &str) -> (Option<Vec<usize>>, Option<&str>) {
    let (head, tail) = arg.split_once(char::is_whitespace).unwrap_or((arg, ""));
    let tail = tail.trim();
    let indices = head
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(index_arg)
        .collect::<Option<Vec<_>>>()
        .filter(|indices| !indices.is_empty());
    (indices, (!tail.is_empty()).then_some(tail))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_arg_is_one_based() {
        assert_eq!(index_arg("1"), Some(0));
        assert_eq!(index_arg(" 5 "), Some(4));
        assert_eq!(index_arg("0"), None);
        assert_eq!(index_arg("two"), None);
    }

    #[test]
    fn test_split_index() {
        assert_eq!(split_index("2 love the pun"), (Some(1), Some("love the pun")));
        assert_eq!(split_index("3"), (Some(2), None));
        assert_eq!(split_index(""), (None, None));
    }

    #[test]
    fn test_split_indices() {
        assert_eq!(split_indices("1,3 more outdoors"), (Some(vec![0, 2]), Some("more outdoors")));
        assert_eq!(split_indices("2"), (Some(vec![1]), None));
        assert_eq!(split_indices("1,x"), (None, None));
        assert_eq!(split_indices(""), (None, None));
    }

    #[test]
    fn test_heading_marks_revised() {
        let idea = Idea::new("T", "D.", "R.").with_ordinal(2);
        assert_eq!(heading(&idea), "Idea #2");
        assert_eq!(heading(&idea.with_reaction("tightened")), "Idea #2 (Revised)");
    }
}
