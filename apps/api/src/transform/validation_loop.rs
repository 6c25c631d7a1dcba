//! Validation Loop — bounded validate/refine iteration over a candidate document.
//!
//! Exhausting the iteration budget is not an error: the last candidate is returned
//! with a `MaxIterationsReached` state and a warning.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::transform::refinement::refine_document;
use crate::transform::sections::{GenerationContext, TechniqueLog};
use crate::transform::validator::validate_document;

pub const DEFAULT_MAX_ITERATIONS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Iterating,
    Converged,
    MaxIterationsReached,
}

#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub document: String,
    pub iterations: u32,
    pub state: LoopState,
    pub log: Vec<String>,
}

/// Validates `initial` up to `max_iterations` times, refining after each failed pass.
///
/// The iteration counter increments on every pass including the first, so a document
/// that is already valid converges with `iterations == 1`.
pub fn run_validation_loop(
    initial: String,
    ctx: &GenerationContext<'_>,
    log: &mut TechniqueLog,
    max_iterations: u32,
) -> LoopOutcome {
    let mut document = initial;
    let mut state = LoopState::Iterating;
    let mut iterations = 0;
    let mut lines = vec![format!("Start validation (max {max_iterations})")];

    while state == LoopState::Iterating && iterations < max_iterations {
        iterations += 1;
        lines.push(format!("Iter {iterations}: Checking SCs"));

        let verdict = validate_document(&document, ctx.original);
        if verdict.all_met {
            lines.push(format!("Iter {iterations}: ✓ All met"));
            state = LoopState::Converged;
            break;
        }

        let labels = verdict.labels();
        debug!(iteration = iterations, unmet = ?labels, "Candidate failed validation");
        lines.push(format!("Iter {iterations}: {} unmet", labels.len()));

        document = refine_document(&document, &verdict, ctx, log);
        lines.push(format!("Iter {iterations}: Regenerated"));
    }

    if state == LoopState::Converged {
        lines.push(format!("✓ Complete ({iterations} iters)"));
    } else {
        state = LoopState::MaxIterationsReached;
        warn!(
            max_iterations,
            "Validation loop exhausted without converging; returning last candidate"
        );
        lines.push(format!("⚠ Max reached ({max_iterations})"));
    }

    LoopOutcome {
        document,
        iterations,
        state,
        log: lines,
    }
}
