use serde_json::json;

use crate::cli::commands::SeriesCommands;
use crate::cli::{finish, Context};
use crate::clock::SystemClock;
use crate::error::TaskrankError;
use crate::models::SeriesUpdate;
use crate::output;

pub fn run(cmd: SeriesCommands, ctx: &Context) -> i32 {
    finish(run_inner(cmd, ctx), ctx.json)
}

fn run_inner(cmd: SeriesCommands, ctx: &Context) -> Result<i32, TaskrankError> {
    let store = ctx.open_store()?;
    let clock = SystemClock;
    let engine = ctx.engine(&store, &clock);
    let recurrence = engine.recurrence();
    let owner = ctx.owner.as_str();

    match cmd {
        SeriesCommands::List { all } => {
            let series = recurrence.list_series(owner, !all)?;
            let rows: Vec<_> = series.iter().map(output::json::series_json).collect();
            ctx.respond(json!({ "series": rows }), || {
                output::text::print_series_list(&series)
            });
        }
        SeriesCommands::Show { id } => {
            let history = recurrence.series_history(owner, &id)?;
            let instances: Vec<_> = history
                .instances
                .iter()
                .map(output::json::to_value)
                .collect();
            ctx.respond(
                json!({
                    "series": output::json::series_json(&history.series),
                    "instances": instances
                }),
                || output::text::print_series_history(&history),
            );
        }
        SeriesCommands::Update {
            id,
            pattern,
            every,
            until,
            clear_until,
            calc,
            activate,
        } => {
            let update = SeriesUpdate {
                pattern,
                interval_value: every,
                end_date: if clear_until { Some(None) } else { until.map(Some) },
                due_date_calculation: calc,
                is_active: activate.then_some(true),
            };
            let series = recurrence.update_series(owner, &id, update)?;
            ctx.respond(json!({ "series": output::json::series_json(&series) }), || {
                output::text::print_series(&series)
            });
        }
        SeriesCommands::Stop { id } => {
            let series = recurrence.deactivate_series(owner, &id)?;
            ctx.respond(json!({ "series": output::json::series_json(&series) }), || {
                println!("Stopped series {}", series.id)
            });
        }
    }
    Ok(0)
}
