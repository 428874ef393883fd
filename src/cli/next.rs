use serde_json::json;

use crate::cli::{finish, Context};
use crate::clock::SystemClock;
use crate::error::TaskrankError;
use crate::output;

/// `taskrank next`: the ranked to-do list.
pub fn run(limit: usize, all: bool, ctx: &Context) -> i32 {
    finish(run_next(limit, all, ctx), ctx.json)
}

pub fn run_at_risk(ctx: &Context) -> i32 {
    finish(run_at_risk_inner(ctx), ctx.json)
}

pub fn run_rescore(ctx: &Context) -> i32 {
    finish(run_rescore_inner(ctx), ctx.json)
}

fn run_next(limit: usize, all: bool, ctx: &Context) -> Result<i32, TaskrankError> {
    let store = ctx.open_store()?;
    let clock = SystemClock;
    let engine = ctx.engine(&store, &clock);
    let ranked = engine.tasks().rescore_and_rank(&ctx.owner, limit, !all)?;
    let rows: Vec<_> = ranked.iter().map(output::json::ranked_entry).collect();
    ctx.respond(json!({ "tasks": rows }), || output::text::print_ranked(&ranked));
    Ok(0)
}

fn run_at_risk_inner(ctx: &Context) -> Result<i32, TaskrankError> {
    let store = ctx.open_store()?;
    let clock = SystemClock;
    let engine = ctx.engine(&store, &clock);

    let at_risk = engine.tasks().at_risk(&ctx.owner)?;
    let rows: Vec<_> = at_risk
        .iter()
        .map(|t| {
            let mut v = output::json::task_summary(t);
            v["bump_count"] = json!(t.bump_count);
            v
        })
        .collect();
    ctx.respond(json!({ "tasks": rows }), || {
        output::text::print_task_list(&at_risk)
    });
    Ok(0)
}

fn run_rescore_inner(ctx: &Context) -> Result<i32, TaskrankError> {
    let store = ctx.open_store()?;
    let clock = SystemClock;
    let engine = ctx.engine(&store, &clock);

    let updated = engine.tasks().refresh_scores(&ctx.owner)?;
    ctx.respond(json!({ "updated": updated }), || {
        println!("Rescored {updated} task(s).")
    });
    Ok(0)
}
