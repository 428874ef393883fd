use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::config::ScoringConfig;
use crate::models::{Effort, Task, MAX_USER_PRIORITY, MIN_USER_PRIORITY};

const USER_PRIORITY_WEIGHT: f64 = 0.4;
const TIME_DECAY_WEIGHT: f64 = 0.3;
const DEADLINE_URGENCY_WEIGHT: f64 = 0.2;
const BUMP_PENALTY_WEIGHT: f64 = 0.1;

const BUMP_PENALTY_STEP: i64 = 10;
const BUMP_PENALTY_CAP: i64 = 50;

/// Share of the parent's score added to each of its subtasks.
const SUBTASK_PARENT_SHARE: f64 = 0.15;

const AT_RISK_BUMPS: i64 = 3;
const AT_RISK_OVERDUE_DAYS: i64 = 3;

/// The four weighted inputs of a score, each on a 0–100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub user_priority: f64,
    pub time_decay: f64,
    pub deadline_urgency: f64,
    pub bump_penalty: f64,
    pub effort_boost: f64,
    pub weighted_sum: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityCalculator {
    config: ScoringConfig,
}

impl PriorityCalculator {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn calculate(&self, task: &Task) -> i64 {
        self.calculate_at(task, Utc::now())
    }

    pub fn calculate_at(&self, task: &Task, now: DateTime<Utc>) -> i64 {
        self.calculate_with_breakdown_at(task, now).0
    }

    pub fn calculate_with_breakdown(&self, task: &Task) -> (i64, ScoreBreakdown) {
        self.calculate_with_breakdown_at(task, Utc::now())
    }

    pub fn calculate_with_breakdown_at(
        &self,
        task: &Task,
        now: DateTime<Utc>,
    ) -> (i64, ScoreBreakdown) {
        let user_priority = user_priority_component(task.user_priority);
        let time_decay = self.time_decay_component(task.created_at, now);
        let deadline_urgency = self.deadline_urgency_component(task.due_date, now);
        let bump_penalty = bump_penalty_component(task.bump_count) as f64;
        let effort_boost = effort_boost(task.estimated_effort);

        let weighted_sum = user_priority * USER_PRIORITY_WEIGHT
            + time_decay * TIME_DECAY_WEIGHT
            + deadline_urgency * DEADLINE_URGENCY_WEIGHT
            + bump_penalty * BUMP_PENALTY_WEIGHT;
        let score = (weighted_sum * effort_boost).round().max(0.0) as i64;

        (
            score,
            ScoreBreakdown {
                user_priority,
                time_decay,
                deadline_urgency,
                bump_penalty,
                effort_boost,
                weighted_sum,
            },
        )
    }

    pub fn calculate_for_subtask(&self, subtask: &Task, parent_score: i64) -> i64 {
        self.calculate_for_subtask_at(subtask, parent_score, Utc::now())
    }

    pub fn calculate_for_subtask_at(
        &self,
        subtask: &Task,
        parent_score: i64,
        now: DateTime<Utc>,
    ) -> i64 {
        let own = self.calculate_at(subtask, now);
        let boost = (parent_score.max(0) as f64 * SUBTASK_PARENT_SHARE).round() as i64;
        own + boost
    }

    fn time_decay_component(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let age_days = fractional_days(now - created_at).max(0.0);
        (age_days / self.config.decay_horizon_days * 100.0).min(100.0)
    }

    /// Quadratic ramp: negligible until the deadline is close, 100 once it passes.
    fn deadline_urgency_component(&self, due: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
        let Some(due) = due else { return 0.0 };
        let days_left = fractional_days(due - now);
        let window = self.config.urgency_window_days;
        if days_left <= 0.0 {
            100.0
        } else if days_left >= window {
            0.0
        } else {
            let closeness = 1.0 - days_left / window;
            100.0 * closeness * closeness
        }
    }
}

/// True when a task has been delayed repeatedly or is well past due.
pub fn is_at_risk(task: &Task, now: DateTime<Utc>) -> bool {
    if task.bump_count >= AT_RISK_BUMPS {
        return true;
    }
    match task.due_date {
        Some(due) => now - due >= Duration::days(AT_RISK_OVERDUE_DAYS),
        None => false,
    }
}

pub fn bump_penalty_component(bump_count: i64) -> i64 {
    (bump_count.max(0) * BUMP_PENALTY_STEP).min(BUMP_PENALTY_CAP)
}

fn user_priority_component(user_priority: i32) -> f64 {
    f64::from(user_priority.clamp(MIN_USER_PRIORITY, MAX_USER_PRIORITY)) * 10.0
}

fn effort_boost(effort: Option<Effort>) -> f64 {
    match effort {
        Some(Effort::Small) => 1.30,
        Some(Effort::Medium) => 1.15,
        Some(Effort::Large) => 1.05,
        Some(Effort::Xlarge) | None => 1.0,
    }
}

fn fractional_days(d: Duration) -> f64 {
    d.num_seconds() as f64 / 86_400.0
}
