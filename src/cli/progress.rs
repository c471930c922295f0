//! Progress command for Skillpath.
//!
//! Shows a player's gates, skill states, windowed accuracy and coaching modes.

use serde::{Deserialize, Serialize};

use crate::core::ExperienceLevel;
use crate::engine::{Engine, SkillSummary};
use crate::error::Result;
use crate::storage::ProgressStore;

/// Options for the progress command.
#[derive(Debug, Clone, Default)]
pub struct ProgressOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// One gate as seen by a player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateInfo {
    pub number: u32,
    pub name: String,
    pub unlocked: bool,
    /// Member skills currently reliable or automatic.
    pub graduated: u32,
    pub required_reliable: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlocked_at: Option<String>,
}

/// Output format for the progress command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressOutput {
    pub success: bool,
    pub player_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frontier_gate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onboarded: Option<ExperienceLevel>,
    pub gates: Vec<GateInfo>,
    pub skills: Vec<SkillSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressOutput {
    pub fn failure(player_id: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            player_id: player_id.to_string(),
            frontier_gate: None,
            onboarded: None,
            gates: Vec::new(),
            skills: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// The progress command implementation.
pub struct ProgressCommand<S: ProgressStore> {
    engine: Engine<S>,
}

impl<S: ProgressStore> ProgressCommand<S> {
    pub fn new(engine: Engine<S>) -> Self {
        Self { engine }
    }

    pub fn run(&self, player_id: &str, _options: &ProgressOptions) -> ProgressOutput {
        match self.collect(player_id) {
            Ok(output) => output,
            Err(e) => ProgressOutput::failure(player_id, e.to_string()),
        }
    }

    fn collect(&self, player_id: &str) -> Result<ProgressOutput> {
        let progress = self.engine.player_progress(player_id)?;
        let skills = self.engine.skill_summaries(player_id)?;

        let gates = self
            .engine
            .registry()
            .gates()
            .map(|gate| {
                let record = progress.gates.get(&gate.number);
                let graduated = gate
                    .skills
                    .iter()
                    .filter_map(|id| progress.skill(id))
                    .filter(|s| s.state.is_graduated())
                    .count() as u32;
                GateInfo {
                    number: gate.number,
                    name: gate.name.clone(),
                    unlocked: record.map(|g| g.unlocked).unwrap_or(false),
                    graduated,
                    required_reliable: gate.required_reliable,
                    unlocked_at: record
                        .and_then(|g| g.unlocked_at)
                        .map(|t| t.format("%Y-%m-%d %H:%M").to_string()),
                }
            })
            .collect();

        Ok(ProgressOutput {
            success: true,
            player_id: player_id.to_string(),
            frontier_gate: progress.frontier_gate(),
            onboarded: progress.onboarded,
            gates,
            skills,
            error: None,
        })
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ProgressOutput, options: &ProgressOptions) -> String {
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

/// Human-readable progress report.
pub fn format_text(output: &ProgressOutput) -> String {
    if !output.success {
        return format!(
            "Progress failed: {}\n",
            output.error.as_deref().unwrap_or("unknown error")
        );
    }

    let mut lines = Vec::new();
    let frontier = output
        .frontier_gate
        .map(|g| g.to_string())
        .unwrap_or_else(|| "none".to_string());
    lines.push(format!(
        "Player {} (frontier gate: {})",
        output.player_id, frontier
    ));
    if let Some(level) = output.onboarded {
        lines.push(format!("Onboarded as {}", level.as_str()));
    }

    for gate in &output.gates {
        lines.push(String::new());
        let status = if gate.unlocked { "unlocked" } else { "locked" };
        lines.push(format!(
            "Gate {}: {} [{}] {}/{} graduated",
            gate.number, gate.name, status, gate.graduated, gate.required_reliable
        ));

        for skill in output.skills.iter().filter(|s| s.gate == gate.number) {
            match skill.state {
                Some(state) => lines.push(format!(
                    "  {:<26} {:<11} {:>4.0}% over {:>2} ({} total)  mode: {}",
                    skill.skill_id,
                    state.as_str(),
                    skill.accuracy * 100.0,
                    skill.window_len,
                    skill.opportunities,
                    skill.mode
                )),
                None => lines.push(format!("  {:<26} -", skill.skill_id)),
            }
        }
    }

    lines.push(String::new());
    lines.join("\n")
}
