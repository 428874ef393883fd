use chrono::Duration;
use serde_json::json;

use crate::cli::commands::{CompletionArgs, TaskCommands, TaskFields};
use crate::cli::{finish, resolve_task_id, Context};
use crate::clock::SystemClock;
use crate::engine::{CompletionOptions, PreferenceScope};
use crate::error::TaskrankError;
use crate::models::{RecurrenceRule, TaskDraft, TaskUpdate};
use crate::output;
use crate::store::TaskFilter;

pub fn run(cmd: TaskCommands, ctx: &Context) -> i32 {
    finish(run_inner(cmd, ctx), ctx.json)
}

fn run_inner(cmd: TaskCommands, ctx: &Context) -> Result<i32, TaskrankError> {
    let store = ctx.open_store()?;
    let clock = SystemClock;
    let engine = ctx.engine(&store, &clock);
    let tasks = engine.tasks();
    let owner = ctx.owner.as_str();

    match cmd {
        TaskCommands::Add {
            title,
            category,
            fields,
            repeat,
            every,
            until,
            calc,
        } => {
            let draft = draft_from(title, category, fields);
            let rule = repeat.map(|pattern| RecurrenceRule {
                pattern,
                interval_value: every.unwrap_or(1),
                end_date: until,
                due_date_calculation: calc,
            });
            let (task, series) = tasks.create_task(owner, draft, rule.as_ref())?;
            ctx.respond(
                json!({
                    "task": output::json::to_value(&task),
                    "series": series.as_ref().map(output::json::series_json)
                }),
                || {
                    println!("Added task: {} ({}) score {}", task.title, task.id, task.priority_score);
                    if let Some(ref s) = series {
                        println!("  Recurring: every {} {} (series {})", s.interval_value, s.pattern.as_str(), s.id);
                    }
                },
            );
        }
        TaskCommands::List {
            all,
            status,
            due_within,
        } => {
            let list = match (due_within, status) {
                (Some(days), _) => {
                    if days < 0 {
                        return Err(TaskrankError::validation("--due-within must not be negative"));
                    }
                    let now = engine.now();
                    tasks.due_between(owner, now, now + Duration::days(days))?
                }
                (None, Some(status)) => tasks.list_tasks(owner, TaskFilter::Status(status))?,
                (None, None) if all => tasks.list_tasks(owner, TaskFilter::All)?,
                (None, None) => tasks.list_tasks(owner, TaskFilter::Open)?,
            };
            let summaries: Vec<_> = list.iter().map(output::json::task_summary).collect();
            ctx.respond(
                json!({ "tasks": summaries, "count": list.len() }),
                || output::text::print_task_list(&list),
            );
        }
        TaskCommands::Show { id } => {
            let id = resolve_task_id(&engine, owner, &id)?;
            let detail = tasks.detail(owner, &id)?;
            ctx.respond(output::json::to_value(&detail), || {
                output::text::print_task_detail(&detail)
            });
        }
        TaskCommands::Update {
            id,
            title,
            category,
            clear_category,
            fields,
            clear_description,
            clear_context,
            clear_people,
            clear_due,
            clear_effort,
        } => {
            let id = resolve_task_id(&engine, owner, &id)?;
            let update = TaskUpdate {
                title,
                description: clearable(fields.description, clear_description),
                category: clearable(category, clear_category),
                context: clearable(fields.context, clear_context),
                related_people: if clear_people {
                    Some(Vec::new())
                } else if fields.people.is_empty() {
                    None
                } else {
                    Some(fields.people)
                },
                user_priority: fields.priority,
                due_date: clearable(fields.due, clear_due),
                estimated_effort: clearable(fields.effort, clear_effort),
            };
            let task = tasks.update_task(owner, &id, update)?;
            ctx.respond(json!({ "task": output::json::to_value(&task) }), || {
                println!("Updated task: {} ({}) score {}", task.title, task.id, task.priority_score)
            });
        }
        TaskCommands::Start { id } => {
            let id = resolve_task_id(&engine, owner, &id)?;
            let task = tasks.start_task(owner, &id)?;
            ctx.respond(json!({ "task": output::json::task_summary(&task) }), || {
                println!("Started task: {} ({})", task.title, task.id)
            });
        }
        TaskCommands::Bump { id } => {
            let id = resolve_task_id(&engine, owner, &id)?;
            let task = tasks.bump_task(owner, &id)?;
            ctx.respond(
                json!({
                    "task": output::json::task_summary(&task),
                    "bump_count": task.bump_count
                }),
                || {
                    println!(
                        "Bumped task: {} ({}) {} times, score {}",
                        task.title, task.id, task.bump_count, task.priority_score
                    )
                },
            );
        }
        TaskCommands::Done { id, recurrence } => {
            let id = resolve_task_id(&engine, owner, &id)?;
            let options = completion_options(&recurrence);
            let outcome = engine.lifecycle().complete_task(owner, &id, &options)?;
            let data = json!({
                "task": output::json::task_summary(&outcome.task),
                "unblocked": outcome.unblocked.iter().map(output::json::task_summary).collect::<Vec<_>>(),
                "parent_ready": outcome.parent_ready.as_ref().map(output::json::task_summary),
                "next_instance": outcome.next_instance.as_ref().map(output::json::task_summary)
            });
            if let Some(ref err) = outcome.regeneration_error {
                if ctx.json {
                    output::json::emit(&output::json::partial(data, err));
                } else {
                    output::text::print_completion(&outcome);
                    eprintln!("Warning: next occurrence not created: {}", err.message);
                }
                return Ok(3);
            }
            ctx.respond(data, || output::text::print_completion(&outcome));
        }
        TaskCommands::Delete { id } => {
            let id = resolve_task_id(&engine, owner, &id)?;
            let task = tasks.delete_task(owner, &id)?;
            ctx.respond(json!({ "deleted": task.id }), || {
                println!("Deleted task: {} ({})", task.title, task.id)
            });
        }
        TaskCommands::History { id } => {
            let id = resolve_task_id(&engine, owner, &id)?;
            let events = tasks.task_history(owner, &id)?;
            let rows: Vec<_> = events.iter().map(output::json::history_json).collect();
            ctx.respond(json!({ "task_id": id, "events": rows }), || {
                output::text::print_history(&events)
            });
        }
    }
    Ok(0)
}

pub(crate) fn draft_from(title: String, category: Option<String>, fields: TaskFields) -> TaskDraft {
    TaskDraft {
        title,
        description: fields.description,
        category,
        context: fields.context,
        related_people: fields.people,
        user_priority: fields.priority,
        due_date: fields.due,
        estimated_effort: fields.effort,
    }
}

/// `--x value` sets, `--clear-x` unsets, neither leaves the field alone.
fn clearable<T>(value: Option<T>, clear: bool) -> Option<Option<T>> {
    if clear {
        Some(None)
    } else {
        value.map(Some)
    }
}

fn completion_options(args: &CompletionArgs) -> CompletionOptions {
    let save_preference = if args.save_default {
        Some(PreferenceScope::Global)
    } else if args.save_category {
        Some(PreferenceScope::Category)
    } else {
        None
    };
    CompletionOptions {
        stop_recurrence: args.stop_recurrence,
        skip_next: args.skip_next,
        due_date_calculation: args.calc,
        save_preference,
    }
}
