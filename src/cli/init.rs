use serde_json::json;

use crate::cli::{finish, Context};
use crate::config::CONFIG_FILE;
use crate::db::connection;
use crate::error::TaskrankError;

pub fn run(ctx: &Context) -> i32 {
    finish(run_inner(ctx), ctx.json)
}

fn run_inner(ctx: &Context) -> Result<i32, TaskrankError> {
    let db = connection::init_db(&ctx.home)?;
    let config_path = ctx.home.join(CONFIG_FILE);
    let created_config = !config_path.exists();
    if created_config {
        ctx.config.save(&ctx.home)?;
    }
    tracing::info!(path = %db.display(), "initialized");

    ctx.respond(
        json!({
            "path": db.to_string_lossy(),
            "config": config_path.to_string_lossy(),
            "config_created": created_config
        }),
        || println!("Initialized taskrank at {}", db.display()),
    );
    Ok(0)
}
