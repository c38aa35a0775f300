//! IX Studio - creative idea pipeline
//!
//! CLI entry point for the studio, prompt building, reply parsing and
//! curation of stored ideas.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use ixstudio::cli::{Cli, Command, JobsCommand, get_log_path};
use ixstudio::config::Config;
use ixstudio::controller::{ExecuteOutcome, RefinementController, Settings, StudioError, parse_level};
use ixstudio::domain::{CreativeBrief, Idea, PromptMode};
use ixstudio::export::{self, DEFAULT_EXPORT_FILE};
use ixstudio::llm::create_channel;
use ixstudio::prompts::{FeedbackDigest, PromptBuilder, PromptContext, PromptLoader, RandomSeed};
use ixstudio::store::{IdeaStore, JobRegistry};
use ixstudio::{parser, repl};
use keystore::{FileStore, SharedStore};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level_str = cli_log_level.or(config_log_level);
    let level = if let Some(s) = level_str {
        debug!(level_str = %s, "setup_logging: level_str is Some");
        match s.to_uppercase().as_str() {
            "TRACE" => {
                debug!("setup_logging: matched TRACE level");
                tracing::Level::TRACE
            }
            "DEBUG" => {
                debug!("setup_logging: matched DEBUG level");
                tracing::Level::DEBUG
            }
            "INFO" => {
                debug!("setup_logging: matched INFO level");
                tracing::Level::INFO
            }
            "WARN" | "WARNING" => {
                debug!("setup_logging: matched WARN level");
                tracing::Level::WARN
            }
            "ERROR" => {
                debug!("setup_logging: matched ERROR level");
                tracing::Level::ERROR
            }
            _ => {
                debug!(level = %s, "setup_logging: unknown level, defaulting to INFO");
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        }
    } else {
        debug!("setup_logging: level_str is None, defaulting to INFO");
        tracing::Level::INFO
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let store_path = cli.store.clone().unwrap_or_else(|| config.storage.path.clone());
    info!(store = %store_path.display(), provider = %config.llm.provider, "IX Studio loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        None | Some(Command::Studio) => {
            debug!("main: matched Studio command");
            cmd_studio(&config, &store_path).await
        }
        Some(Command::Prompt {
            brief,
            level,
            mode,
            guidance,
            title,
            description,
            rationale,
        }) => {
            debug!(?level, %mode, "main: matched Prompt command");
            let target = title.map(|title| {
                Idea::new(title, description.unwrap_or_default(), rationale.unwrap_or_default())
            });
            cmd_prompt(&config, &store_path, &brief, level.as_deref(), &mode, guidance, target)
        }
        Some(Command::Parse { file, approved_count }) => {
            debug!(?file, approved_count, "main: matched Parse command");
            cmd_parse(&file, approved_count)
        }
        Some(Command::Generate { brief, level }) => {
            debug!(?level, "main: matched Generate command");
            cmd_generate(&config, &store_path, &brief, level.as_deref()).await
        }
        Some(Command::Approved) => {
            debug!("main: matched Approved command");
            cmd_approved(&config, &store_path)
        }
        Some(Command::Export { path }) => {
            debug!(?path, "main: matched Export command");
            cmd_export(&config, &store_path, path)
        }
        Some(Command::Jobs { command }) => {
            debug!(?command, "main: matched Jobs command");
            cmd_jobs(&config, &store_path, command)
        }
        Some(Command::Reset { yes }) => {
            debug!(yes, "main: matched Reset command");
            cmd_reset(&config, &store_path, yes)
        }
    }
}

/// Open the durable store shared by the idea store and job registry
fn open_store(config: &Config, path: &Path) -> Result<SharedStore<FileStore>> {
    debug!(path = %path.display(), "open_store: called");
    let store = FileStore::open_with_quota(path, config.storage.quota_bytes)
        .context(format!("Failed to open store at {}", path.display()))?;
    Ok(SharedStore::new(store))
}

fn prompt_builder(config: &Config) -> Result<PromptBuilder> {
    let worktree = std::env::current_dir().context("Failed to read current directory")?;
    let mut loader = PromptLoader::new(worktree);
    if let Some(dir) = &config.prompts.dir {
        loader = loader.with_override_dir(dir);
    }
    Ok(PromptBuilder::new(loader, Box::new(RandomSeed)))
}

fn build_controller(config: &Config, store_path: &Path) -> Result<RefinementController> {
    let store = open_store(config, store_path)?;
    let defaults = Settings {
        brief: CreativeBrief::default(),
        level: config.defaults.level,
        engine: config.defaults.engine,
    };
    Ok(RefinementController::new(
        prompt_builder(config)?,
        IdeaStore::open(Box::new(store.clone())),
        JobRegistry::new(Box::new(store)),
        defaults,
    ))
}

async fn cmd_studio(config: &Config, store_path: &Path) -> Result<()> {
    let controller = build_controller(config, store_path)?;
    repl::run_interactive(config, controller).await
}

fn cmd_prompt(
    config: &Config,
    store_path: &Path,
    brief: &str,
    level: Option<&str>,
    mode: &str,
    guidance: Option<String>,
    target: Option<Idea>,
) -> Result<()> {
    let level = level.map(parse_level).transpose()?.unwrap_or(config.defaults.level);
    let mode: PromptMode = mode.parse().map_err(|e: String| eyre::eyre!(e))?;

    let context = match mode {
        PromptMode::Initial => PromptContext::default(),
        PromptMode::Refine => {
            let target = target.ok_or_else(|| eyre::eyre!("Refine prompts need --title"))?;
            PromptContext::refine(target)
        }
        PromptMode::NewIdeas => {
            let mut ideas = IdeaStore::open(Box::new(open_store(config, store_path)?));
            let archived = ideas.archived();
            let feedback = FeedbackDigest::from_approved(&archived, ideas.general_feedback());
            PromptContext::new_ideas(feedback, guidance)
        }
    };

    let prompt = prompt_builder(config)?
        .build_prompt(mode, &CreativeBrief::new(brief), level, &context)
        .map_err(StudioError::from)?;
    println!("{}", prompt);
    Ok(())
}

fn cmd_parse(file: &Path, approved_count: usize) -> Result<()> {
    let text = if file == Path::new("-") {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text).context("Failed to read stdin")?;
        text
    } else {
        fs::read_to_string(file).context(format!("Failed to read {}", file.display()))?
    };

    let outcome = parser::parse(&text, approved_count);
    if outcome.is_empty() {
        return Err(StudioError::NoIdeasFound.into());
    }
    for idea in outcome.combined() {
        print_idea(&idea);
    }
    Ok(())
}

async fn cmd_generate(config: &Config, store_path: &Path, brief: &str, level: Option<&str>) -> Result<()> {
    config.validate_llm()?;
    let channel = create_channel(&config.llm).context("Failed to create LLM channel")?;
    let level = level.map(parse_level).transpose()?.unwrap_or(config.defaults.level);

    let mut controller = build_controller(config, store_path)?;
    controller.submit_brief(CreativeBrief::new(brief), level, config.defaults.engine)?;
    println!("{}", "Waiting for the model...".dimmed());
    match controller.execute(channel.as_ref()).await? {
        ExecuteOutcome::Ideas(_) => {
            for idea in controller.ideas().last_generated() {
                print_idea(idea);
            }
        }
        ExecuteOutcome::Conversation(text) => println!("{}", text),
    }
    Ok(())
}

fn cmd_approved(config: &Config, store_path: &Path) -> Result<()> {
    let mut ideas = IdeaStore::open(Box::new(open_store(config, store_path)?));
    let approved = ideas.archived();
    if let Some(e) = ideas.take_storage_error() {
        return Err(e).context("Failed to read approved ideas");
    }
    if approved.is_empty() {
        println!("No approved ideas");
        return Ok(());
    }
    for idea in &approved {
        print_idea(idea);
    }
    Ok(())
}

fn cmd_export(config: &Config, store_path: &Path, path: Option<PathBuf>) -> Result<()> {
    let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_FILE));
    let mut ideas = IdeaStore::open(Box::new(open_store(config, store_path)?));
    let count = export::export_approved(&mut ideas, &path)?;
    println!("{} Wrote {} ideas to {}", "✓".green(), count, path.display());
    Ok(())
}

fn cmd_jobs(config: &Config, store_path: &Path, command: JobsCommand) -> Result<()> {
    let mut jobs = JobRegistry::new(Box::new(open_store(config, store_path)?));
    match command {
        JobsCommand::List { all } => {
            let list = jobs.list(all)?;
            if list.is_empty() {
                println!("No jobs found");
            }
            for job in list {
                let archived = if job.archived { " (archived)".dimmed().to_string() } else { String::new() };
                println!(
                    "{:20} {:10} {:>2} ideas{}",
                    job.name.yellow(),
                    job.level.name(),
                    job.ideas.len(),
                    archived
                );
            }
        }
        JobsCommand::Show { name } => {
            let job = jobs
                .get(&name)?
                .ok_or_else(|| eyre::eyre!("Job not found: {}", name))?;
            println!("{} {}", "Job:".bright_cyan(), job.name.yellow());
            println!("{} {}", "Level:".bright_cyan(), job.level.name());
            println!("{}", "Brief:".bright_cyan());
            println!("{}", job.brief.render());
            println!();
            for idea in &job.ideas {
                print_idea(idea);
            }
        }
        JobsCommand::Archive { name } => {
            jobs.archive(&name, true)?;
            println!("{} Archived {}", "✓".green(), name.yellow());
        }
        JobsCommand::Unarchive { name } => {
            jobs.archive(&name, false)?;
            println!("{} Restored {}", "✓".green(), name.yellow());
        }
        JobsCommand::Delete { name } => {
            if jobs.delete(&name)? {
                println!("{} Deleted {}", "✓".green(), name.yellow());
            } else {
                println!("{} Job not found: {}", "✗".red(), name);
            }
        }
    }
    Ok(())
}

fn cmd_reset(config: &Config, store_path: &Path, yes: bool) -> Result<()> {
    if !yes {
        print!("Delete all approved ideas and feedback? [y/N] ");
        io::stdout().flush()?;
        let mut answer = String::new();
        io::stdin().read_line(&mut answer)?;
        if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
            println!("Aborted");
            return Ok(());
        }
    }

    let mut ideas = IdeaStore::open(Box::new(open_store(config, store_path)?));
    let outcome = ideas.reset();
    if let Some(e) = ideas.take_storage_error() {
        return Err(e).context("Failed to reset store");
    }
    debug!(?outcome, "cmd_reset: done");
    println!("{} Store reset", "✓".green());
    Ok(())
}

fn print_idea(idea: &Idea) {
    let revised = if idea.is_revised() { " (Revised)" } else { "" };
    println!("{}", format!("Idea #{}{}", idea.ordinal, revised).bright_cyan());
    println!("  {}", idea.title.bold());
    println!("  {}", idea.description);
    if !idea.rationale.is_empty() {
        println!("  {}", idea.rationale.dimmed());
    }
    if let Some(reaction) = &idea.reaction {
        println!("  {} {}", "Reaction:".bright_blue(), reaction);
    }
    if !idea.notes.is_empty() {
        println!("  {} {}", "Notes:".bright_blue(), idea.notes);
    }
    println!();
}
