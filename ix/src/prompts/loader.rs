//! Prompt Loader
//!
//! Loads prompt templates from files or falls back to embedded defaults.

use std::path::{Path, PathBuf};

use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, info};

use super::PromptError;
use super::embedded;

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// User override directory (e.g., `.ixstudio/prompts/`)
    user_dir: Option<PathBuf>,
    /// Repo default directory (e.g., `prompts/`)
    repo_dir: Option<PathBuf>,
}

fn engine() -> Handlebars<'static> {
    let mut hbs = Handlebars::new();
    // prompts are plain text, not HTML
    hbs.register_escape_fn(handlebars::no_escape);
    hbs
}

impl PromptLoader {
    /// Create a new prompt loader rooted at `worktree`
    ///
    /// Looks for `.ixstudio/prompts/` and `prompts/` under it.
    pub fn new(worktree: impl AsRef<Path>) -> Self {
        let worktree = worktree.as_ref();
        debug!(?worktree, "PromptLoader::new: called");
        let user_dir = worktree.join(".ixstudio/prompts");
        let repo_dir = worktree.join("prompts");

        let user_dir_exists = user_dir.exists();
        let repo_dir_exists = repo_dir.exists();
        debug!(
            ?user_dir,
            %user_dir_exists,
            ?repo_dir,
            %repo_dir_exists,
            "PromptLoader::new: checking directories"
        );

        Self {
            hbs: engine(),
            user_dir: user_dir_exists.then_some(user_dir),
            repo_dir: repo_dir_exists.then_some(repo_dir),
        }
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: engine(),
            user_dir: None,
            repo_dir: None,
        }
    }

    /// Replace the user override directory
    pub fn with_override_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        debug!(?dir, "PromptLoader::with_override_dir: called");
        self.user_dir = Some(dir);
        self
    }

    /// Load a template by name
    ///
    /// Checks in order:
    /// 1. User override: `.ixstudio/prompts/{name}.pmt`
    /// 2. Repo default: `prompts/{name}.pmt`
    /// 3. Embedded fallback
    pub fn load_template(&self, name: &str) -> Result<String, PromptError> {
        debug!(%name, "PromptLoader::load_template: called");
        for dir in [&self.user_dir, &self.repo_dir].into_iter().flatten() {
            let path = dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found on disk");
                return std::fs::read_to_string(&path).map_err(|source| PromptError::Read { path, source });
            }
            debug!(?path, "PromptLoader::load_template: not found on disk");
        }

        debug!("PromptLoader::load_template: trying embedded fallback");
        if let Some(content) = embedded::get_embedded(name) {
            return Ok(content.to_string());
        }

        debug!(%name, "PromptLoader::load_template: not found anywhere");
        Err(PromptError::TemplateNotFound(name.to_string()))
    }

    /// Render a template with the given context
    pub fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String, PromptError> {
        debug!(%template_name, "PromptLoader::render: called");
        let template = self.load_template(template_name)?;
        info!("Rendering template '{}'", template_name);

        self.hbs
            .render_template(&template, context)
            .map_err(|e| PromptError::Render {
                name: template_name.to_string(),
                message: e.to_string(),
            })
    }
}
