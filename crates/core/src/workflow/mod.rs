pub mod engine;
pub mod states;

pub use engine::{validate_submission, DecisionEngine, DecisionFlow, StandardDecisionFlow};
pub use states::{DecisionAction, DecisionContext, FollowUpAction, TransitionOutcome};
