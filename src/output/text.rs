use chrono::{DateTime, Utc};

use crate::engine::lifecycle::CompletionOutcome;
use crate::engine::recurrence::PreferenceSummary;
use crate::engine::subtask::SubtaskCompletion;
use crate::engine::tasks::TaskDetail;
use crate::engine::RankedTask;
use crate::models::{HistoryEvent, SeriesHistory, Task, TaskSeries};

fn date(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M").to_string()
}

fn task_line(t: &Task) -> String {
    let mut line = format!(
        "[{}] {:>3}  {} ({})",
        t.status.as_str(),
        t.priority_score,
        t.title,
        t.id
    );
    if let Some(ref due) = t.due_date {
        line.push_str(&format!(" due {}", date(due)));
    }
    if let Some(ref category) = t.category {
        line.push_str(&format!(" #{category}"));
    }
    line
}

pub fn print_task(t: &Task) {
    println!("Task: {} ({})", t.title, t.id);
    if let Some(ref desc) = t.description {
        println!("  Description: {desc}");
    }
    println!("  Status: {}", t.status.as_str());
    println!("  Type: {}", t.task_type.as_str());
    println!("  Priority: {} (score {})", t.user_priority, t.priority_score);
    if let Some(ref category) = t.category {
        println!("  Category: {category}");
    }
    if let Some(ref context) = t.context {
        println!("  Context: {context}");
    }
    if !t.related_people.is_empty() {
        println!("  People: {}", t.related_people.join(", "));
    }
    if let Some(ref due) = t.due_date {
        println!("  Due: {}", date(due));
    }
    if let Some(effort) = t.estimated_effort {
        println!("  Effort: {}", effort.as_str());
    }
    if t.bump_count > 0 {
        println!("  Bumped: {} times", t.bump_count);
    }
    if let Some(ref parent) = t.parent_task_id {
        println!("  Parent: {parent}");
    }
    if let Some(ref series) = t.series_id {
        println!("  Series: {series}");
    }
    if let Some(ref completed) = t.completed_at {
        println!("  Completed: {}", date(completed));
    }
}

pub fn print_task_list(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks found.");
        return;
    }
    for t in tasks {
        println!("  {}", task_line(t));
    }
}

pub fn print_task_detail(d: &TaskDetail) {
    print_task(&d.task);
    let b = &d.breakdown;
    println!(
        "  Score breakdown: priority={:.1} decay={:.1} urgency={:.1} bumps={:.1} x effort {:.2}",
        b.user_priority, b.time_decay, b.deadline_urgency, b.bump_penalty, b.effort_boost
    );
    if d.at_risk {
        println!("  AT RISK");
    }
    if !d.blocked_by.is_empty() {
        println!("  Blocked by: {}", d.blocked_by.join(", "));
    }
    if !d.blocking.is_empty() {
        println!("  Blocking: {}", d.blocking.join(", "));
    }
    if !d.subtasks.is_empty() {
        println!("  Subtasks:");
        for s in &d.subtasks {
            println!("    {}", task_line(s));
        }
    }
}

pub fn print_ranked(ranked: &[RankedTask]) {
    if ranked.is_empty() {
        println!("Nothing to do.");
        return;
    }
    for (i, r) in ranked.iter().enumerate() {
        let mut line = format!("{:>3}. {}", i + 1, task_line(&r.task));
        if r.incomplete_blockers > 0 {
            line.push_str(&format!(" (blocked by {})", r.incomplete_blockers));
        }
        if r.open_subtasks > 0 {
            line.push_str(&format!(" ({} open subtasks)", r.open_subtasks));
        }
        println!("{line}");
    }
}

pub fn print_completion(outcome: &CompletionOutcome) {
    println!("Completed: {} ({})", outcome.task.title, outcome.task.id);
    for t in &outcome.unblocked {
        println!("  Unblocked: {} ({})", t.title, t.id);
    }
    if let Some(ref parent) = outcome.parent_ready {
        println!("  All subtasks of {} ({}) are done", parent.title, parent.id);
    }
    if let Some(ref next) = outcome.next_instance {
        let due = next.due_date.as_ref().map(date).unwrap_or_else(|| "-".to_string());
        println!("  Next occurrence: {} due {}", next.id, due);
    }
}

pub fn print_subtask_completion(c: &SubtaskCompletion) {
    println!("Completed subtask: {} ({})", c.subtask.title, c.subtask.id);
    if let Some(ref parent) = c.parent {
        if c.all_subtasks_complete {
            println!("  All subtasks done; {} ({}) can be completed", parent.title, parent.id);
        } else {
            println!("  {} open subtasks left under {}", c.open_subtasks, parent.id);
        }
    }
}

fn series_line(s: &TaskSeries) -> String {
    let until = s.end_date.as_ref().map(date).unwrap_or_else(|| "-".to_string());
    format!(
        "{} every {} {} until {} [{}] {}",
        s.id,
        s.interval_value,
        s.pattern.as_str(),
        until,
        s.due_date_calculation.as_str(),
        if s.is_active { "active" } else { "stopped" }
    )
}

pub fn print_series(s: &TaskSeries) {
    println!("Series: {}", series_line(s));
    println!("  Original task: {}", s.original_task_id);
}

pub fn print_series_list(series: &[TaskSeries]) {
    if series.is_empty() {
        println!("No series found.");
        return;
    }
    for s in series {
        println!("  {}", series_line(s));
    }
}

pub fn print_series_history(h: &SeriesHistory) {
    print_series(&h.series);
    for i in &h.instances {
        let due = i.due_date.as_ref().map(date).unwrap_or_else(|| "-".to_string());
        println!("  [{}] {} ({}) due {}", i.status, i.title, i.task_id, due);
    }
}

pub fn print_history(events: &[HistoryEvent]) {
    if events.is_empty() {
        println!("No history.");
        return;
    }
    for e in events {
        let change = match (&e.old_value, &e.new_value) {
            (Some(old), Some(new)) => format!(" {old} -> {new}"),
            (None, Some(new)) => format!(" {new}"),
            (Some(old), None) => format!(" {old} ->"),
            (None, None) => String::new(),
        };
        println!("  {} {}{}", date(&e.created_at), e.kind.as_str(), change);
    }
}

pub fn print_preferences(p: &PreferenceSummary) {
    let stored = p
        .user_default
        .map(|c| c.as_str().to_string())
        .unwrap_or_else(|| "not set".to_string());
    println!("Default: {} ({})", p.effective_default.as_str(), stored);
    if p.categories.is_empty() {
        println!("No category overrides.");
        return;
    }
    println!("Categories:");
    for c in &p.categories {
        println!("  {}: {}", c.category, c.due_date_calculation.as_str());
    }
}
