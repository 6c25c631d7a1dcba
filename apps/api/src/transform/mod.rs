// Rule-based prompt transformation engine.
// Implements: analysis, criteria synthesis, section generation, the recursive
// validation loop, metrics, character limits and the 7-check scorecard.

pub mod analyzer;
pub mod char_limit;
pub mod criteria;
pub mod domain;
pub mod handlers;
pub mod metrics;
pub mod pipeline;
pub mod refinement;
pub mod scorecard;
pub mod sections;
pub mod validation_loop;
pub mod validator;
