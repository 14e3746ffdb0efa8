//! Task board commands: `board` and `toggle`.

use anyhow::{Context, Result, bail};

use learnstack::client::View;
use learnstack::client::categories::{CategoryFilter, subtask_progress};
use learnstack::client::projects::{load_current_project, open_project};
use learnstack::client::store::Store;
use learnstack::client::sync::TaskSync;
use learnstack::client::view::TaskView;
use learnstack::config::LearnstackConfig;
use learnstack::models::TaskId;

use super::ClientContext;

async fn load(ctx: &ClientContext, project: Option<i64>) -> Result<Option<i64>> {
    let view = match project {
        Some(id) => open_project(ctx.api.as_ref(), &ctx.store, id).await?,
        None => load_current_project(ctx.api.as_ref(), &ctx.store).await?,
    };
    Ok(match view {
        View::Tasks { project_id } => Some(project_id),
        View::NewProject => None,
    })
}

/// Print the project header and its tasks grouped by category.
pub fn print_board(store: &Store, view: &TaskView) {
    if let Some(project) = store.current_project() {
        println!("{} (#{})", project.name, project.id);
        println!("Priority: {}  Type: {}", project.priority, project.project_type);
    }
    let progress = view.progress();
    println!("Progress: {} ({}%)", progress, progress.percent());
    if view.filter() != CategoryFilter::All {
        println!("Filter: {}", view.filter());
    }
    println!();

    view.with_groups(|groups| {
        if groups.is_empty() {
            println!("No tasks.");
        }
        for group in groups {
            println!("{} [{}]", group.category.title(), group.progress);
            for task in &group.tasks {
                let mark = if task.completed { "x" } else { " " };
                println!("  [{}] {}  ({})", mark, task.text, task.id);
                if !task.subtasks.is_empty() {
                    println!("      subtasks {}", subtask_progress(task));
                }
            }
        }
    });
}

pub async fn cmd_board(
    config: &LearnstackConfig,
    category: Option<&str>,
    project: Option<i64>,
) -> Result<()> {
    let filter = match category {
        Some(raw) => raw.parse::<CategoryFilter>()?,
        None => CategoryFilter::All,
    };
    let ctx = ClientContext::from_config(config)?;
    if load(&ctx, project).await?.is_none() {
        println!("No projects yet. Create one with `learnstack new`.");
        return Ok(());
    }

    let sync = TaskSync::new(ctx.store.clone(), ctx.api.clone(), ctx.notifier.clone());
    let mut view = TaskView::new(sync);
    view.set_filter(filter);
    print_board(&ctx.store, &view);
    Ok(())
}

pub async fn cmd_toggle(
    config: &LearnstackConfig,
    task_id: &str,
    completed: bool,
    project: Option<i64>,
) -> Result<()> {
    let ctx = ClientContext::from_config(config)?;
    if load(&ctx, project).await?.is_none() {
        bail!("No current project");
    }

    let id = TaskId::from(task_id);
    if ctx.store.task_completed(&id).is_none() {
        bail!("Task {} is not in the current project", id);
    }
    let sync = TaskSync::new(ctx.store.clone(), ctx.api.clone(), ctx.notifier.clone());
    let view = TaskView::new(sync);
    let stored = view
        .set_completed(id.clone(), completed)?
        .await
        .context("Task update was interrupted")??;

    println!(
        "Task {} marked {}",
        id,
        if stored { "done" } else { "not done" }
    );
    let progress = view.progress();
    println!("Progress: {} ({}%)", progress, progress.percent());
    Ok(())
}
