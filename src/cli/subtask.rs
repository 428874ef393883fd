use serde_json::json;

use crate::cli::commands::SubtaskCommands;
use crate::cli::task::draft_from;
use crate::cli::{finish, resolve_task_id, Context};
use crate::clock::SystemClock;
use crate::error::TaskrankError;
use crate::output;

pub fn run(cmd: SubtaskCommands, ctx: &Context) -> i32 {
    finish(run_inner(cmd, ctx), ctx.json)
}

fn run_inner(cmd: SubtaskCommands, ctx: &Context) -> Result<i32, TaskrankError> {
    let store = ctx.open_store()?;
    let clock = SystemClock;
    let engine = ctx.engine(&store, &clock);
    let owner = ctx.owner.as_str();

    match cmd {
        SubtaskCommands::Add {
            parent,
            title,
            fields,
        } => {
            let parent = resolve_task_id(&engine, owner, &parent)?;
            // Category always comes from the parent.
            let draft = draft_from(title, None, fields);
            let sub = engine.subtasks().create_subtask(owner, &parent, draft)?;
            ctx.respond(json!({ "task": output::json::to_value(&sub) }), || {
                println!(
                    "Added subtask: {} ({}) under {} score {}",
                    sub.title, sub.id, parent, sub.priority_score
                )
            });
        }
        SubtaskCommands::Done { id } => {
            let id = resolve_task_id(&engine, owner, &id)?;
            let completion = engine.subtasks().complete_subtask(owner, &id)?;
            ctx.respond(
                json!({
                    "subtask": output::json::task_summary(&completion.subtask),
                    "parent": completion.parent.as_ref().map(output::json::task_summary),
                    "open_subtasks": completion.open_subtasks,
                    "all_subtasks_complete": completion.all_subtasks_complete
                }),
                || output::text::print_subtask_completion(&completion),
            );
        }
    }
    Ok(0)
}
