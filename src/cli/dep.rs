use serde_json::json;

use crate::cli::commands::DepCommands;
use crate::cli::{finish, resolve_task_id, Context};
use crate::clock::SystemClock;
use crate::error::TaskrankError;
use crate::output;

pub fn run(cmd: DepCommands, ctx: &Context) -> i32 {
    finish(run_inner(cmd, ctx), ctx.json)
}

fn run_inner(cmd: DepCommands, ctx: &Context) -> Result<i32, TaskrankError> {
    let store = ctx.open_store()?;
    let clock = SystemClock;
    let engine = ctx.engine(&store, &clock);
    let deps = engine.dependencies();
    let owner = ctx.owner.as_str();

    match cmd {
        DepCommands::Add { task, blocker } => {
            // Resolve both ends before any write.
            let task = resolve_task_id(&engine, owner, &task)?;
            let blocker = resolve_task_id(&engine, owner, &blocker)?;
            let edge = deps.add_dependency(owner, &task, &blocker)?;
            ctx.respond(output::json::to_value(&edge), || {
                println!("{} is now blocked by {}", edge.task_id, edge.blocked_by_id)
            });
        }
        DepCommands::Remove { task, blocker } => {
            let task = resolve_task_id(&engine, owner, &task)?;
            let blocker = resolve_task_id(&engine, owner, &blocker)?;
            deps.remove_dependency(owner, &task, &blocker)?;
            ctx.respond(
                json!({ "task_id": task, "blocked_by_id": blocker, "removed": true }),
                || println!("{task} is no longer blocked by {blocker}"),
            );
        }
        DepCommands::List { task, all } => {
            let task = resolve_task_id(&engine, owner, &task)?;
            let list = if all {
                deps.all_dependencies(owner, &task)?
            } else {
                deps.blockers(owner, &task)?
            };
            let summaries: Vec<_> = list.iter().map(output::json::task_summary).collect();
            ctx.respond(
                json!({ "task_id": task, "transitive": all, "dependencies": summaries }),
                || output::text::print_task_list(&list),
            );
        }
        DepCommands::Check => {
            let has_cycle = deps.check_graph(owner)?;
            ctx.respond(json!({ "has_cycle": has_cycle }), || {
                if has_cycle {
                    println!("Dependency graph contains a cycle.");
                } else {
                    println!("Dependency graph is acyclic.");
                }
            });
            if has_cycle {
                return Ok(1);
            }
        }
    }
    Ok(0)
}
