//! Replay command for Skillpath.
//!
//! Runs a recorded sequence of decisions through one session and reports what
//! the engine made of them.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::context::{DecisionInput, LiveAction};
use crate::core::{SkillBackfill, SkillEvaluation, SkillTransition};
use crate::engine::Engine;
use crate::error::{Result, SkillpathError};
use crate::session::SessionSummary;
use crate::storage::ProgressStore;

/// One recorded decision: the situation and what the player did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayRecord {
    pub decision: DecisionInput,
    pub action: LiveAction,
}

/// Options for the replay command.
#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Session id to replay under (default: "replay").
    pub session_id: Option<String>,
}

/// Review of one hand after replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandReplay {
    pub hand_number: u32,
    /// Evaluations, worst first.
    pub review: Vec<SkillEvaluation>,
}

/// Output format for the replay command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayOutput {
    pub success: bool,
    pub session_id: String,
    /// Number of decisions replayed.
    pub decisions: usize,
    pub transitions: Vec<SkillTransition>,
    pub unlocked_gates: Vec<u32>,
    pub backfilled: Vec<SkillBackfill>,
    pub hands: Vec<HandReplay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SessionSummary>,
    /// Decisions whose progress could not be written.
    pub unpersisted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReplayOutput {
    fn empty(session_id: &str) -> Self {
        Self {
            success: true,
            session_id: session_id.to_string(),
            decisions: 0,
            transitions: Vec::new(),
            unlocked_gates: Vec::new(),
            backfilled: Vec::new(),
            hands: Vec::new(),
            summary: None,
            unpersisted: 0,
            error: None,
        }
    }

    pub fn failure(session_id: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::empty(session_id)
        }
    }
}

/// Parse replay records from a JSON array or from JSON lines.
pub fn parse_records(content: &str) -> Result<Vec<ReplayRecord>> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed)
            .map_err(|e| SkillpathError::serde(format!("Invalid replay file: {}", e)));
    }

    let mut records = Vec::new();
    for (line_num, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(line).map_err(|e| {
            SkillpathError::serde(format!(
                "Invalid replay record on line {}: {}",
                line_num + 1,
                e
            ))
        })?;
        records.push(record);
    }
    Ok(records)
}

/// The replay command implementation.
pub struct ReplayCommand<S: ProgressStore> {
    engine: Engine<S>,
}

impl<S: ProgressStore> ReplayCommand<S> {
    pub fn new(engine: Engine<S>) -> Self {
        Self { engine }
    }

    /// Replay the records in `path`.
    pub fn run(&self, path: &Path, options: &ReplayOptions) -> ReplayOutput {
        let session_id = options.session_id.as_deref().unwrap_or("replay");

        let records = match fs::read_to_string(path)
            .map_err(|e| SkillpathError::storage(path, e))
            .and_then(|content| parse_records(&content))
        {
            Ok(records) => records,
            Err(e) => return ReplayOutput::failure(session_id, e.to_string()),
        };

        self.run_records(&records, session_id)
    }

    /// Replay already-parsed records.
    pub fn run_records(&self, records: &[ReplayRecord], session_id: &str) -> ReplayOutput {
        let mut output = ReplayOutput::empty(session_id);

        let Some(first) = records.first() else {
            return output;
        };
        if let Err(e) = self
            .engine
            .start_session(session_id, &first.decision.player_id)
        {
            return ReplayOutput::failure(session_id, e.to_string());
        }

        let mut hand_numbers = Vec::new();
        for record in records {
            let report = self
                .engine
                .on_action(session_id, &record.decision, &record.action);

            output.decisions += 1;
            if !report.persisted {
                output.unpersisted += 1;
            }
            if !hand_numbers.contains(&report.hand_number) {
                hand_numbers.push(report.hand_number);
            }
            output.transitions.extend(report.transitions);
            output.unlocked_gates.extend(report.unlocked_gates);
            output.backfilled.extend(report.backfilled);
        }

        for hand_number in hand_numbers {
            let review = self
                .engine
                .hand_review(session_id, hand_number)
                .unwrap_or_default();
            if !review.is_empty() {
                output.hands.push(HandReplay {
                    hand_number,
                    review,
                });
            }
        }

        match self.engine.end_session(session_id) {
            Ok(summary) => output.summary = Some(summary),
            Err(e) => tracing::debug!("replay session already closed: {}", e),
        }

        output
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ReplayOutput, options: &ReplayOptions) -> String {
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

/// Human-readable replay report.
pub fn format_text(output: &ReplayOutput) -> String {
    if !output.success {
        return format!(
            "Replay failed: {}\n",
            output.error.as_deref().unwrap_or("unknown error")
        );
    }

    if output.decisions == 0 {
        return "No decisions to replay.\n".to_string();
    }

    let mut lines = Vec::new();
    lines.push(format!(
        "Replayed {} decision(s) in session {}",
        output.decisions, output.session_id
    ));

    if let Some(summary) = &output.summary {
        lines.push(format!(
            "  {} evaluation(s): {} correct, {} marginal, {} incorrect",
            summary.evaluations, summary.correct, summary.marginal, summary.incorrect
        ));
    }
    if output.unpersisted > 0 {
        lines.push(format!(
            "  warning: {} decision(s) could not be saved",
            output.unpersisted
        ));
    }
    lines.push(String::new());

    for hand in &output.hands {
        lines.push(format!("Hand {}", hand.hand_number));
        for eval in &hand.review {
            lines.push(format!(
                "  [{}] {} ({}): {}",
                eval.outcome, eval.skill_id, eval.action, eval.reasoning
            ));
        }
    }

    if !output.transitions.is_empty() {
        lines.push(String::new());
        lines.push("Transitions:".to_string());
        for t in &output.transitions {
            lines.push(format!(
                "  {}: {} -> {} (accuracy {:.0}%, {} opportunities)",
                t.skill_id,
                t.from,
                t.to,
                t.accuracy * 100.0,
                t.opportunities
            ));
        }
    }

    if !output.unlocked_gates.is_empty() {
        let gates: Vec<String> = output.unlocked_gates.iter().map(|g| g.to_string()).collect();
        lines.push(String::new());
        lines.push(format!("Gates unlocked: {}", gates.join(", ")));
    }

    lines.push(String::new());
    lines.join("\n")
}
