//! Named multi-brief workflow container

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{CreativeBrief, CreativityLevel, Idea};

/// A named brief with its level and the latest ideas produced for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    #[serde(default)]
    pub brief: CreativeBrief,
    #[serde(default)]
    pub level: CreativityLevel,
    #[serde(default)]
    pub ideas: Vec<Idea>,
    #[serde(default)]
    pub archived: bool,
    /// Unix milliseconds
    #[serde(rename = "createdAt", default)]
    pub created_at: i64,
}

impl Job {
    pub fn new(name: impl Into<String>, brief: CreativeBrief, level: CreativityLevel) -> Self {
        Self {
            name: name.into(),
            brief,
            level,
            ideas: Vec::new(),
            archived: false,
            created_at: Utc::now().timestamp_millis(),
        }
    }

    pub fn has_ideas(&self) -> bool {
        !self.ideas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_defaults() {
        let job = Job::new("Spring", CreativeBrief::new("Sell socks"), CreativityLevel::Tripping);
        assert_eq!(job.name, "Spring");
        assert!(!job.archived);
        assert!(!job.has_ideas());
        assert!(job.created_at > 0);
    }

    #[test]
    fn test_job_json_uses_created_at_key() {
        let job = Job::new("Spring", CreativeBrief::new("Sell socks"), CreativityLevel::None);
        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains("\"createdAt\""));

        let back: Job = serde_json::from_str(&json).unwrap();
        assert_eq!(back, job);
    }
}
