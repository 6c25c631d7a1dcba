//! Section Generator — renders the 9-section hybrid prompt in one of three verbosity modes.
//!
//! # Section order (fixed)
//! Context, Requirements, Role, Objectives, Instructions, Success Criteria, Constraints,
//! Validation Loop, Output Format.
//!
//! The Requirements section is always the caller's input text verbatim, without any
//! appended file context. Content preservation is validated against that exact text,
//! so it must never be summarized.
//!
//! # Modes (by input word count)
//! - Short  (≤ 20):   5 criteria, minimal wording, flat task list
//! - Medium (21–100): 7 criteria, short role, 2-phase outline
//! - Long   (> 100):  all criteria, full role, 3-phase breakdown

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::transform::analyzer::{word_count, InputAnalysis};
use crate::transform::criteria::MAX_CRITERIA;
use crate::transform::domain::Domain;

/// Upper word-count bound (inclusive) for `Mode::Short`.
pub const SHORT_MODE_MAX_WORDS: usize = 20;
/// Upper word-count bound (inclusive) for `Mode::Medium`.
pub const MEDIUM_MODE_MAX_WORDS: usize = 100;

// ────────────────────────────────────────────────────────────────────────────
// Sections
// ────────────────────────────────────────────────────────────────────────────

/// The nine named sections of a generated document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Section {
    Context,
    Requirements,
    Role,
    Objectives,
    Instructions,
    SuccessCriteria,
    Constraints,
    Validation,
    Output,
}

impl Section {
    pub const ALL: [Section; 9] = [
        Section::Context,
        Section::Requirements,
        Section::Role,
        Section::Objectives,
        Section::Instructions,
        Section::SuccessCriteria,
        Section::Constraints,
        Section::Validation,
        Section::Output,
    ];

    /// Lowercase token whose presence marks the section as present in a document.
    pub fn required_token(&self) -> &'static str {
        match self {
            Section::Context => "context",
            Section::Requirements => "requirements",
            Section::Role => "role",
            Section::Objectives => "objectives",
            Section::Instructions => "instructions",
            Section::SuccessCriteria => "success criteria",
            Section::Constraints => "constraints",
            Section::Validation => "validation loop",
            Section::Output => "output format",
        }
    }

    /// Short name used to recognise a heading line when splitting a document.
    pub fn heading_marker(&self) -> &'static str {
        match self {
            Section::Context => "Context",
            Section::Requirements => "Requirements",
            Section::Role => "Role",
            Section::Objectives => "Objectives",
            Section::Instructions => "Instructions",
            Section::SuccessCriteria => "Success Criteria",
            Section::Constraints => "Constraints",
            Section::Validation => "Validation",
            Section::Output => "Output",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Modes and techniques
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Short,
    Medium,
    Long,
}

impl Mode {
    pub fn for_word_count(words: usize) -> Self {
        if words <= SHORT_MODE_MAX_WORDS {
            Mode::Short
        } else if words <= MEDIUM_MODE_MAX_WORDS {
            Mode::Medium
        } else {
            Mode::Long
        }
    }

    /// Maximum number of criteria lines rendered in this mode.
    pub fn criteria_cap(&self) -> usize {
        match self {
            Mode::Short => 5,
            Mode::Medium => 7,
            Mode::Long => MAX_CRITERIA,
        }
    }

    pub fn techniques(&self) -> &'static [Technique] {
        match self {
            Mode::Short => &[
                Technique::RolePrompting,
                Technique::ChainOfThought,
                Technique::RecursiveValidation,
            ],
            Mode::Medium => &[
                Technique::GenerateKnowledge,
                Technique::RolePrompting,
                Technique::ChainOfThought,
                Technique::RecursiveValidation,
            ],
            Mode::Long => &[
                Technique::GenerateKnowledge,
                Technique::RolePrompting,
                Technique::ChainOfThought,
                Technique::TreeOfThoughts,
                Technique::Decomposition,
                Technique::RecursiveValidation,
            ],
        }
    }
}

/// Prompt engineering technique labels, reported back to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Technique {
    #[serde(rename = "Generate-Knowledge")]
    GenerateKnowledge,
    #[serde(rename = "Role Prompting")]
    RolePrompting,
    #[serde(rename = "Chain-of-Thought (CoT)")]
    ChainOfThought,
    #[serde(rename = "Tree-of-Thoughts")]
    TreeOfThoughts,
    #[serde(rename = "Decomposition")]
    Decomposition,
    #[serde(rename = "Recursive Validation")]
    RecursiveValidation,
}

impl Technique {
    pub fn label(&self) -> &'static str {
        match self {
            Technique::GenerateKnowledge => "Generate-Knowledge",
            Technique::RolePrompting => "Role Prompting",
            Technique::ChainOfThought => "Chain-of-Thought (CoT)",
            Technique::TreeOfThoughts => "Tree-of-Thoughts",
            Technique::Decomposition => "Decomposition",
            Technique::RecursiveValidation => "Recursive Validation",
        }
    }
}

/// Append-only record of techniques applied during one transform call.
///
/// Reporting only, never consulted for control flow. A label is recorded once even
/// when the generator runs again during refinement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TechniqueLog(Vec<Technique>);

impl TechniqueLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, technique: Technique) {
        if !self.0.contains(&technique) {
            self.0.push(technique);
        }
    }

    #[cfg(test)]
    pub fn techniques(&self) -> &[Technique] {
        &self.0
    }

    pub fn labels(&self) -> Vec<String> {
        self.0.iter().map(|t| t.label().to_string()).collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Generation
// ────────────────────────────────────────────────────────────────────────────

/// Everything the generator reads. Borrowed for the lifetime of one transform call.
#[derive(Debug, Clone, Copy)]
pub struct GenerationContext<'a> {
    /// Text that drives mode selection and section wording. Includes any file context.
    pub input: &'a str,
    /// The caller's text without file context. Echoed verbatim as Requirements.
    pub original: &'a str,
    /// Must already carry the synthesized criteria.
    pub analysis: &'a InputAnalysis,
    pub domain: Domain,
}

impl<'a> GenerationContext<'a> {
    /// Context for an input with no file context appended.
    pub fn new(input: &'a str, analysis: &'a InputAnalysis, domain: Domain) -> Self {
        Self {
            input,
            original: input,
            analysis,
            domain,
        }
    }

    /// Sets the text echoed in the Requirements section.
    pub fn with_original(self, original: &'a str) -> Self {
        Self { original, ..self }
    }

    pub fn mode(&self) -> Mode {
        Mode::for_word_count(word_count(self.input))
    }
}

/// Renders a complete document for `ctx` and records the mode's techniques in `log`.
pub fn generate_document(ctx: &GenerationContext<'_>, log: &mut TechniqueLog) -> String {
    let mode = ctx.mode();
    for technique in mode.techniques() {
        log.record(*technique);
    }

    let criteria: Vec<String> = ctx
        .analysis
        .success_criteria
        .iter()
        .take(mode.criteria_cap())
        .cloned()
        .collect();

    let parts = match mode {
        Mode::Short => render_short(ctx, &criteria),
        Mode::Medium => render_medium(ctx, &criteria),
        Mode::Long => render_long(ctx, &criteria),
    };

    parts.join("\n\n")
}

/// `**SC{i}:** text` lines for a criteria list. Numbering starts at 1.
pub fn render_criteria_lines(criteria: &[String]) -> String {
    criteria
        .iter()
        .enumerate()
        .map(|(i, sc)| format!("**SC{}:** {sc}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_short(ctx: &GenerationContext<'_>, criteria: &[String]) -> Vec<String> {
    let sc_lines = criteria
        .iter()
        .enumerate()
        .map(|(i, sc)| format!("SC{}: {sc}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");

    vec![
        format!("# Context\nBackground: {} task", ctx.domain),
        format!("# Requirements\n{}", ctx.original),
        format!("# Role\nYou are an expert {}.", short_role(ctx.domain)),
        "# Objectives\nExecute requirements with precision".to_string(),
        "# Instructions\nReason step by step (chain-of-thought).\n\
         Task 1: Parse requirements\n\
         Task 2: Execute task\n\
         Task 3: Validate quality"
            .to_string(),
        format!("# Success Criteria\n{sc_lines}"),
        "# Constraints\nMaintain original requirements".to_string(),
        "# Validation Loop\nWHILE any SC is unmet AND iteration < 3: regenerate the failing part, then re-check"
            .to_string(),
        "# Output Format\nMarkdown".to_string(),
    ]
}

fn render_medium(ctx: &GenerationContext<'_>, criteria: &[String]) -> Vec<String> {
    vec![
        format!("# Context\n{}", context_description(ctx.input, ctx.domain)),
        format!("# Requirements\n{}", ctx.original),
        format!("# Role\n{}", role_summary(ctx.domain)),
        "# Objectives\nDeliver high-quality outputs meeting all requirements".to_string(),
        format!(
            "# Instructions\nReason through each phase in order (chain-of-thought).\n\n{}",
            task_phases(ctx.input, 2)
        ),
        format!("# Success Criteria\n{}", render_criteria_lines(criteria)),
        "# Constraints\nMaintain fidelity to requirements".to_string(),
        "# Validation Loop\n\
         iteration = 0\n\
         WHILE any SC is unmet AND iteration < 5:\n  \
           check each SC and regenerate failing sections\n  \
           iteration += 1"
            .to_string(),
        "# Output Format\nMarkdown with clear sections".to_string(),
    ]
}

fn render_long(ctx: &GenerationContext<'_>, criteria: &[String]) -> Vec<String> {
    let mut constraints = vec!["- Maintain fidelity to original requirements".to_string()];
    constraints.extend(extract_constraints(ctx.input).into_iter().map(|c| format!("- {c}")));

    vec![
        format!(
            "# Context [Generate-Knowledge]\n{}\nKnowledge: {}",
            context_description(ctx.input, ctx.domain),
            domain_knowledge(ctx.domain)
        ),
        format!("# Requirements Analysis\n{}", ctx.original),
        format!("# Role [Role Prompting]\n{}", role_description(ctx.domain)),
        format!("# Objectives\n{}", objectives(ctx.analysis)),
        format!(
            "# Instructions/Tasks [CoT + ToT]\n\
             Decompose the work into phases and reason step by step (chain-of-thought). \
             Where several approaches are viable, compare the options before committing \
             (tree-of-thoughts).\n\n{}",
            task_phases(ctx.input, 3)
        ),
        format!("# Success Criteria\n{}", render_criteria_lines(criteria)),
        format!("# Constraints\n{}", constraints.join("\n")),
        "# Validation Loop\n```\n\
         VALIDATION_LOOP:\n\
         iteration = 0\n\
         WHILE iteration < MAX_ITERATIONS:\n  \
           FOR each SC:\n    \
             IF NOT met: REGENERATE affected section\n  \
           IF all SCs met: MARK COMPLETE and stop\n  \
           iteration += 1\n\
         REPEAT until 100% completion\n\
         ```"
            .to_string(),
        "# Output Format\nMarkdown with clear sections, one heading per deliverable".to_string(),
    ]
}

// ────────────────────────────────────────────────────────────────────────────
// Section content helpers
// ────────────────────────────────────────────────────────────────────────────

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn context_description(input: &str, domain: Domain) -> String {
    let lower = input.to_lowercase();
    let has_business_terms =
        contains_any(&lower, &["market", "strategy", "customer", "revenue", "business", "plan"]);
    let has_tech_terms =
        contains_any(&lower, &["code", "api", "software", "system", "database", "develop"]);
    let has_audience = contains_any(&lower, &["target", "audience", "user", "customer", "demographic"]);
    let has_metrics = contains_any(&lower, &["metric", "kpi", "measure", "track", "data", "analytics"]);

    let scenario = match domain {
        Domain::Business if has_business_terms && has_audience => {
            "Strategic business planning with target audience analysis and market positioning"
        }
        Domain::Business => "Business strategy development with data-driven decision making",
        Domain::Technology if has_tech_terms => {
            "Technical system design and development with best practices implementation"
        }
        Domain::Technology => "Technology solution architecture and implementation",
        Domain::Education => "Instructional content development with measurable learning outcomes",
        Domain::Creative => "Creative content development with audience engagement focus",
        Domain::Analysis if has_metrics => {
            "Data-driven analysis with comprehensive metrics and insights"
        }
        Domain::Analysis => "Systematic research and analytical evaluation",
        Domain::General => "Comprehensive task execution with quality assurance",
    };

    format!(
        "Background: {domain} domain\nScenario: {scenario}\nApproach: Systematic methodology with validation"
    )
}

fn domain_knowledge(domain: Domain) -> &'static str {
    match domain {
        Domain::Business => "Effective business strategies require data-driven analysis, market understanding, and strategic foresight.",
        Domain::Technology => "Modern software development emphasizes best practices, code quality, scalability, and maintainability.",
        Domain::Education => "Quality educational content requires clear structure, engagement strategies, and measurable learning outcomes.",
        Domain::Creative => "Professional content creation balances creativity with audience needs and brand voice.",
        Domain::Analysis => "Rigorous research includes systematic data collection, objective analysis, and evidence-based conclusions.",
        Domain::General => "Quality output requires a systematic approach, attention to detail, and validation against success criteria.",
    }
}

fn short_role(domain: Domain) -> &'static str {
    match domain {
        Domain::Business => "business strategist",
        Domain::Technology => "technical architect",
        Domain::Education => "educator",
        Domain::Creative => "content writer",
        Domain::Analysis => "research analyst",
        Domain::General => "specialist",
    }
}

fn role_summary(domain: Domain) -> String {
    let full = role_description(domain);
    match full.find(". ") {
        Some(end) => full[..=end].to_string(),
        None => full.to_string(),
    }
}

fn role_description(domain: Domain) -> &'static str {
    match domain {
        Domain::Business => "You are a Senior Business Strategist with expertise in market analysis, competitive positioning, and strategic planning. Apply data-driven insights and proven frameworks.",
        Domain::Technology => "You are a Senior Technical Architect with expertise in system design, software development, and best practices. Ensure scalable, maintainable solutions.",
        Domain::Education => "You are an Expert Educator with deep knowledge of pedagogy, learning outcomes, and curriculum design. Focus on clear, engaging instruction.",
        Domain::Creative => "You are a Professional Content Creator with expertise in storytelling, audience engagement, and brand voice. Deliver compelling, original content.",
        Domain::Analysis => "You are a Senior Analyst with expertise in research methodology, data analysis, and evidence-based conclusions. Provide thorough, objective insights.",
        Domain::General => "You are an Expert Specialist with comprehensive knowledge and proven methodologies. Deliver professional, high-quality outputs.",
    }
}

fn objectives(analysis: &InputAnalysis) -> String {
    let headline = if analysis.requirements.is_empty() {
        "Complete the task as specified with comprehensive validation"
    } else {
        "Execute all specified requirements with precision and quality assurance"
    };

    let mut lines = vec![headline.to_string()];
    lines.extend(analysis.objectives.iter().map(|o| format!("- {o}")));
    lines.join("\n")
}

/// Phase/task outline. `phases` is 2 (Medium) or 3 (Long).
fn task_phases(input: &str, phases: u8) -> String {
    let lower = input.to_lowercase();
    let mut tasks = vec![
        "**Phase 1: Analysis & Planning**".to_string(),
        "- Task 1.1: Analyze input requirements and extract key objectives".to_string(),
    ];

    if contains_any(&lower, &["market", "audience", "customer"]) {
        tasks.push("- Task 1.2: Identify target audience and market context".to_string());
    }

    tasks.push(String::new());
    tasks.push("**Phase 2: Execution**".to_string());

    let (first, second) = if contains_any(&lower, &["create", "develop", "design"]) {
        (
            "Develop solution framework and structure",
            "Create detailed content addressing all requirements",
        )
    } else if contains_any(&lower, &["analyze", "evaluate", "assess"]) {
        (
            "Conduct systematic analysis of relevant factors",
            "Evaluate findings and derive insights",
        )
    } else {
        (
            "Execute primary task objectives",
            "Ensure comprehensive coverage of all requirements",
        )
    };
    tasks.push(format!("- Task 2.1: {first}"));
    tasks.push(format!("- Task 2.2: {second}"));

    if phases >= 3 {
        tasks.push(String::new());
        tasks.push("**Phase 3: Validation & Quality Assurance**".to_string());
        tasks.push("- Task 3.1: Validate outputs against success criteria".to_string());
        tasks.push("- Task 3.2: Refine and optimize for quality".to_string());
    }

    tasks.join("\n")
}

static CONSTRAINT_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

fn constraint_patterns() -> &'static [Regex] {
    CONSTRAINT_PATTERNS.get_or_init(|| {
        [
            r"(?i)constraints?\s*:\s*([^\n]+)",
            r"(?i)must not\s+([^\n]+)",
            r"(?i)cannot\s+([^\n]+)",
            r"(?i)avoid\s+([^\n]+)",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("Invalid constraint pattern"))
        .collect()
    })
}

/// Explicit constraint phrases from the input, at most 5.
fn extract_constraints(input: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for caps in constraint_patterns().iter().flat_map(|p| p.captures_iter(input)) {
        if let Some(m) = caps.get(1) {
            let text = m.as_str().trim().to_string();
            if text.chars().count() > 5 && !found.contains(&text) {
                found.push(text);
            }
        }
    }
    found.truncate(5);
    found
}
