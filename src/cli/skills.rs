//! Skills command for Skillpath.
//!
//! Lists the curriculum in use, or with `--check` only validates it.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::context::Phase;
use crate::core::{EvidenceRule, SkillRegistry};

/// Options for the skills command.
#[derive(Debug, Clone, Default)]
pub struct SkillsOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Validate the curriculum without listing it.
    pub check: bool,
}

/// A skill as listed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillInfo {
    pub id: String,
    pub name: String,
    pub phases: Vec<Phase>,
    pub tags: Vec<String>,
    pub evidence: EvidenceRule,
}

/// A gate and its skills, in teaching order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateInfo {
    pub number: u32,
    pub name: String,
    pub required_reliable: u32,
    pub skills: Vec<SkillInfo>,
}

/// Output format for the skills command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillsOutput {
    pub success: bool,
    /// Curriculum file path, or "built-in".
    pub source: String,
    pub skill_count: usize,
    pub gates: Vec<GateInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SkillsOutput {
    fn from_registry(registry: &SkillRegistry, source: String, list: bool) -> Self {
        let gates = if list {
            registry
                .gates()
                .map(|gate| GateInfo {
                    number: gate.number,
                    name: gate.name.clone(),
                    required_reliable: gate.required_reliable,
                    skills: gate
                        .skills
                        .iter()
                        .filter_map(|id| registry.skill(id))
                        .map(|s| SkillInfo {
                            id: s.id.clone(),
                            name: s.name.clone(),
                            phases: s.phases.clone(),
                            tags: s.tags.clone(),
                            evidence: s.evidence,
                        })
                        .collect(),
                })
                .collect()
        } else {
            Vec::new()
        };

        Self {
            success: true,
            source,
            skill_count: registry.skill_count(),
            gates,
            warning: None,
            error: None,
        }
    }

    fn failure(source: String, error: impl Into<String>) -> Self {
        Self {
            success: false,
            source,
            skill_count: 0,
            gates: Vec::new(),
            warning: None,
            error: Some(error.into()),
        }
    }
}

/// The skills command implementation.
pub struct SkillsCommand {
    config: Config,
}

impl SkillsCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn run(&self, options: &SkillsOptions) -> SkillsOutput {
        let Some(path) = self.config.curriculum.path.as_deref() else {
            return SkillsOutput::from_registry(
                &SkillRegistry::builtin(),
                "built-in".to_string(),
                !options.check,
            );
        };
        let source = path.display().to_string();

        match SkillRegistry::load_from_file(path) {
            Ok(registry) => SkillsOutput::from_registry(&registry, source, !options.check),
            Err(e) if options.check => SkillsOutput::failure(source, e.to_string()),
            Err(e) => {
                // Listing shows what the engine would actually run with.
                let mut output = SkillsOutput::from_registry(
                    &SkillRegistry::builtin(),
                    "built-in".to_string(),
                    true,
                );
                output.warning = Some(format!(
                    "curriculum {} is invalid ({}); using built-in curriculum",
                    source, e
                ));
                output
            }
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &SkillsOutput, options: &SkillsOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            format_text(output, options)
        }
    }
}

pub fn format_text(output: &SkillsOutput, options: &SkillsOptions) -> String {
    if !output.success {
        return format!(
            "Curriculum {} is invalid: {}\n",
            output.source,
            output.error.as_deref().unwrap_or("unknown error")
        );
    }

    if options.check {
        return format!(
            "Curriculum {} is valid ({} skills)\n",
            output.source, output.skill_count
        );
    }

    let mut lines = Vec::new();
    if let Some(warning) = &output.warning {
        lines.push(format!("warning: {}", warning));
    }
    lines.push(format!(
        "Curriculum: {} ({} skills)",
        output.source, output.skill_count
    ));

    for gate in &output.gates {
        lines.push(String::new());
        lines.push(format!(
            "Gate {}: {} (needs {} reliable to advance)",
            gate.number, gate.name, gate.required_reliable
        ));
        for skill in &gate.skills {
            let phases = if skill.phases.is_empty() {
                "any".to_string()
            } else {
                skill
                    .phases
                    .iter()
                    .map(|p| p.as_str())
                    .collect::<Vec<_>>()
                    .join("/")
            };
            lines.push(format!("  {:<26} {} [{}]", skill.id, skill.name, phases));
            lines.push(format!(
                "  {:<26} min {} | window {} | advance >= {:.2} | regress <= {:.2}",
                "",
                skill.evidence.min_opportunities,
                skill.evidence.window_size,
                skill.evidence.advancement_threshold,
                skill.evidence.regression_threshold
            ));
        }
    }

    lines.push(String::new());
    lines.join("\n")
}
