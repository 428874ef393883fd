use serde::Serialize;
use serde_json::{json, Value};

use crate::engine::RankedTask;
use crate::error::TaskrankError;
use crate::models::{HistoryEvent, Task, TaskSeries};

pub fn success(data: Value) -> Value {
    json!({
        "success": true,
        "data": data
    })
}

/// The command's main effect happened, but a follow-up step failed.
pub fn partial(data: Value, err: &TaskrankError) -> Value {
    json!({
        "success": true,
        "partial": true,
        "data": data,
        "warning": error_body(err)
    })
}

pub fn error(err: &TaskrankError) -> Value {
    json!({
        "success": false,
        "error": error_body(err)
    })
}

fn error_body(err: &TaskrankError) -> Value {
    json!({
        "code": err.code.as_str(),
        "kind": err.kind().as_str(),
        "message": err.message
    })
}

pub fn emit(value: &Value) {
    let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    println!("{text}");
}

/// Serialize any model; these never fail for our types.
pub fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

pub fn task_summary(t: &Task) -> Value {
    let mut v = json!({
        "id": t.id,
        "title": t.title,
        "status": t.status.as_str(),
        "task_type": t.task_type.as_str(),
        "user_priority": t.user_priority,
        "priority_score": t.priority_score
    });
    if let Some(ref due) = t.due_date {
        v["due_date"] = json!(due);
    }
    if let Some(ref category) = t.category {
        v["category"] = json!(category);
    }
    if let Some(ref parent) = t.parent_task_id {
        v["parent_task_id"] = json!(parent);
    }
    if let Some(ref series) = t.series_id {
        v["series_id"] = json!(series);
    }
    v
}

pub fn ranked_entry(r: &RankedTask) -> Value {
    let mut v = task_summary(&r.task);
    v["incomplete_blockers"] = json!(r.incomplete_blockers);
    v["open_subtasks"] = json!(r.open_subtasks);
    v["actionable"] = json!(r.actionable);
    v
}

pub fn series_json(s: &TaskSeries) -> Value {
    json!({
        "id": s.id,
        "original_task_id": s.original_task_id,
        "pattern": s.pattern.as_str(),
        "interval_value": s.interval_value,
        "end_date": s.end_date,
        "due_date_calculation": s.due_date_calculation.as_str(),
        "is_active": s.is_active,
        "created_at": s.created_at,
        "updated_at": s.updated_at
    })
}

pub fn history_json(e: &HistoryEvent) -> Value {
    json!({
        "kind": e.kind.as_str(),
        "old_value": e.old_value,
        "new_value": e.new_value,
        "created_at": e.created_at
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_carries_kind() {
        let v = error(&TaskrankError::task_blocked("t1", 2));
        assert_eq!(v["success"], false);
        assert_eq!(v["error"]["code"], "TASK_BLOCKED");
        assert_eq!(v["error"]["kind"], "state_gated");
    }

    #[test]
    fn partial_is_still_success() {
        let v = partial(json!({"id": "t1"}), &TaskrankError::database("disk full"));
        assert_eq!(v["success"], true);
        assert_eq!(v["partial"], true);
        assert_eq!(v["warning"]["kind"], "internal");
    }
}
