pub mod priority;

pub use priority::{is_at_risk, PriorityCalculator, ScoreBreakdown};
