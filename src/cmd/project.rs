//! Project form commands: `new`, `enhance` and `signout`.

use anyhow::{Result, bail};

use learnstack::client::View;
use learnstack::client::enhance::IdeaEnhancer;
use learnstack::client::form::ProjectCreation;
use learnstack::client::projects::sign_out;
use learnstack::client::sync::TaskSync;
use learnstack::client::view::TaskView;
use learnstack::config::LearnstackConfig;
use learnstack::errors::ClientError;
use learnstack::models::Priority;

use super::{ClientContext, board::print_board, drafts};

pub fn cmd_reset_draft(config: &LearnstackConfig) -> Result<()> {
    drafts(config).clear()?;
    println!("Draft cleared.");
    Ok(())
}

/// Merge the given fields into the saved draft, save it, then submit.
pub async fn cmd_new(
    config: &LearnstackConfig,
    name: Option<String>,
    description: Option<String>,
    priority: Option<String>,
) -> Result<()> {
    let drafts = drafts(config);
    let mut form = drafts.load().unwrap_or_default();
    if let Some(name) = name {
        form.name = name;
    }
    if let Some(description) = description {
        form.description = description;
    }
    if let Some(priority) = priority {
        form.priority = priority;
    }
    drafts.save(&form)?;

    let ctx = ClientContext::from_config(config)?;
    let creation = ProjectCreation::new(
        ctx.api.clone(),
        ctx.store.clone(),
        ctx.drafts.clone(),
        ctx.notifier.clone(),
    );

    match creation.submit(&form).await {
        Ok(View::Tasks { project_id }) => {
            println!("Created project #{}", project_id);
            println!();
            let sync = TaskSync::new(ctx.store.clone(), ctx.api.clone(), ctx.notifier.clone());
            print_board(&ctx.store, &TaskView::new(sync));
            Ok(())
        }
        Ok(View::NewProject) => Ok(()),
        Err(ClientError::Validation(errors)) => {
            eprintln!("The project form is incomplete:");
            for (field, message) in errors.iter() {
                eprintln!("  {}: {}", field, message);
            }
            eprintln!();
            eprintln!("Priorities:");
            for p in Priority::ALL {
                eprintln!("  {}", p.label());
            }
            bail!(
                "Draft saved; complete it with `learnstack new --{}`",
                errors.fields().next().map(|f| f.as_str()).unwrap_or("name")
            )
        }
        Err(e) => bail!("Project was not created, draft kept for retry: {}", e),
    }
}

pub async fn cmd_enhance(config: &LearnstackConfig, description: &str, accept: bool) -> Result<()> {
    let ctx = ClientContext::from_config(config)?;
    let enhancer = IdeaEnhancer::new(ctx.api.clone(), ctx.notifier.clone());
    let enhancement = enhancer.enhance(description).await?;

    println!("{}", enhancement.enhanced_description);
    if !enhancement.suggested_features.is_empty() {
        println!();
        println!("Suggested features:");
        for feature in &enhancement.suggested_features {
            println!("  - {}", feature);
        }
    }

    if accept {
        let mut form = ctx.drafts.load().unwrap_or_default();
        enhancer.accept(enhancement, &mut form, &ctx.drafts)?;
        println!();
        println!("Draft description updated.");
    } else {
        enhancer.discard(enhancement);
    }
    Ok(())
}

pub async fn cmd_signout(config: &LearnstackConfig) -> Result<()> {
    let ctx = ClientContext::from_config(config)?;
    sign_out(ctx.api.as_ref(), &ctx.store).await?;
    println!("Signed out.");
    Ok(())
}
