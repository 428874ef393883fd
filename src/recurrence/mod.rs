pub mod schedule;

pub use schedule::{next_due_date, next_due_date_anchored, validate_interval, validate_rule};
