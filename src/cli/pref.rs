use serde_json::json;

use crate::cli::commands::PrefCommands;
use crate::cli::{finish, Context};
use crate::clock::SystemClock;
use crate::error::TaskrankError;
use crate::output;

pub fn run(cmd: PrefCommands, ctx: &Context) -> i32 {
    finish(run_inner(cmd, ctx), ctx.json)
}

fn run_inner(cmd: PrefCommands, ctx: &Context) -> Result<i32, TaskrankError> {
    let store = ctx.open_store()?;
    let clock = SystemClock;
    let engine = ctx.engine(&store, &clock);
    let recurrence = engine.recurrence();
    let owner = ctx.owner.as_str();

    match cmd {
        PrefCommands::Show => {
            let summary = recurrence.preferences(owner)?;
            ctx.respond(output::json::to_value(&summary), || {
                output::text::print_preferences(&summary)
            });
        }
        PrefCommands::SetDefault { calc } => {
            recurrence.set_default_calculation(owner, calc)?;
            ctx.respond(json!({ "due_date_calculation": calc.as_str() }), || {
                println!("Default due date calculation: {}", calc.as_str())
            });
        }
        PrefCommands::SetCategory { category, calc } => {
            recurrence.set_category_calculation(owner, &category, calc)?;
            ctx.respond(
                json!({ "category": category, "due_date_calculation": calc.as_str() }),
                || println!("{category}: {}", calc.as_str()),
            );
        }
        PrefCommands::UnsetCategory { category } => {
            let removed = recurrence.clear_category_calculation(owner, &category)?;
            ctx.respond(json!({ "category": category, "removed": removed }), || {
                if removed {
                    println!("Removed override for {category}");
                } else {
                    println!("No override for {category}");
                }
            });
        }
    }
    Ok(0)
}
