//! Onboard command for Skillpath.
//!
//! Seeds a new player's gates and skill states from a self-reported level.

use serde::{Deserialize, Serialize};

use crate::core::{ExperienceLevel, SkillBackfill};
use crate::engine::Engine;
use crate::storage::ProgressStore;

/// Options for the onboard command.
#[derive(Debug, Clone, Default)]
pub struct OnboardOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the onboard command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardOutput {
    pub success: bool,
    pub player_id: String,
    pub level: ExperienceLevel,
    /// Skill rows created, in curriculum order.
    pub seeded: Vec<SkillBackfill>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The onboard command implementation.
pub struct OnboardCommand<S: ProgressStore> {
    engine: Engine<S>,
}

impl<S: ProgressStore> OnboardCommand<S> {
    pub fn new(engine: Engine<S>) -> Self {
        Self { engine }
    }

    pub fn run(&self, player_id: &str, level: ExperienceLevel) -> OnboardOutput {
        match self.engine.onboard(player_id, level) {
            Ok(seeded) => OnboardOutput {
                success: true,
                player_id: player_id.to_string(),
                level,
                seeded,
                error: None,
            },
            Err(e) => OnboardOutput {
                success: false,
                player_id: player_id.to_string(),
                level,
                seeded: Vec::new(),
                error: Some(e.to_string()),
            },
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &OnboardOutput, options: &OnboardOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            format_text(output)
        }
    }
}

pub fn format_text(output: &OnboardOutput) -> String {
    if !output.success {
        return format!(
            "Onboarding failed: {}\n",
            output.error.as_deref().unwrap_or("unknown error")
        );
    }

    let mut lines = vec![format!(
        "Onboarded {} as {} ({} skill(s) seeded)",
        output.player_id,
        output.level.as_str(),
        output.seeded.len()
    )];
    for seed in &output.seeded {
        lines.push(format!(
            "  gate {}  {:<26} {}",
            seed.gate, seed.skill_id, seed.state
        ));
    }
    lines.push(String::new());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::core::SkillRegistry;
    use crate::storage::{FileProgressStore, ProgressStore};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_onboard_persists_and_rejects_repeat() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileProgressStore::with_dir(dir.path()).unwrap());
        let cmd = OnboardCommand::new(Engine::new(
            Arc::clone(&store),
            Arc::new(SkillRegistry::builtin()),
            Config::default(),
        ));

        let output = cmd.run("hero", ExperienceLevel::Advanced);
        assert!(output.success);
        assert_eq!(output.seeded.len(), 8);
        assert!(store.exists("hero").unwrap());

        let text = format_text(&output);
        assert!(text.starts_with("Onboarded hero as advanced (8 skill(s) seeded)"));
        assert!(text.contains("gate 1  fold_trash_preflop"));

        let again = cmd.run("hero", ExperienceLevel::Beginner);
        assert!(!again.success);
        assert!(format_text(&again).contains("onboarding runs once"));
    }

    #[test]
    fn test_onboard_rejects_existing_record_from_another_process() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileProgressStore::with_dir(dir.path()).unwrap());
        store
            .put(&crate::core::PlayerProgress::new("hero"))
            .unwrap();

        let cmd = OnboardCommand::new(Engine::new(
            store,
            Arc::new(SkillRegistry::builtin()),
            Config::default(),
        ));
        let output = cmd.run("hero", ExperienceLevel::Beginner);
        assert!(!output.success);
    }

    #[test]
    fn test_json_output() {
        let cmd = OnboardCommand::new(Engine::new(
            Arc::new(crate::storage::MemoryProgressStore::new()),
            Arc::new(SkillRegistry::builtin()),
            Config::default(),
        ));
        let output = cmd.run("p", ExperienceLevel::Beginner);
        let json = cmd.format_output(
            &output,
            &OnboardOptions {
                json: true,
                quiet: false,
            },
        );
        assert!(json.contains("\"level\": \"beginner\""));
        assert!(json.contains("\"state\": \"introduced\""));
    }
}
