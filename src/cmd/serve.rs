//! Server commands: `serve`, `init` and `add-user`.

use std::path::Path;

use anyhow::{Context, Result};

use learnstack::config::LearnstackConfig;
use learnstack::server::app::start_server;
use learnstack::server::db::PlannerDb;

pub async fn cmd_serve(config: &LearnstackConfig, open: bool) -> Result<()> {
    let mut server = config.server_config();
    // No browser inside dev containers.
    server.open_browser = open && !server.dev_mode;
    start_server(server).await
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    PlannerDb::new(db_path).context("Failed to initialize planner database")?;
    println!("Database initialized at {}", db_path.display());
    Ok(())
}

pub fn cmd_add_user(db_path: &Path, name: &str, email: &str) -> Result<()> {
    let db = PlannerDb::new(db_path).context("Failed to open planner database")?;
    let user = db.create_user(name, email)?;
    let token = db.create_session(user.id)?;
    tracing::info!(user_id = user.id, "Created user");
    println!("Created user {} <{}> (id {})", user.name, user.email, user.id);
    println!("Session token: {}", token);
    println!();
    println!("Use it with client commands:");
    println!("  learnstack --token {} board", token);
    Ok(())
}
