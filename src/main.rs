use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use learnstack::config::LearnstackConfig;

mod cmd;

#[derive(Parser)]
#[command(name = "learnstack")]
#[command(version, about = "Turn a project idea into a categorized, trackable task list")]
pub struct Cli {
    /// Path to learnstack.toml (defaults to ./learnstack.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Base URL of the learnstack server, for client commands
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Session token, as printed by `add-user`
    #[arg(long, global = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the REST server
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Base URL of the AI task-generation service
        #[arg(long)]
        ai_url: Option<String>,

        /// Enable dev mode (permissive CORS, bind on all interfaces)
        #[arg(long)]
        dev: bool,

        /// Open the server URL in a browser once listening
        #[arg(long)]
        open: bool,
    },
    /// Create the database without starting the server
    Init {
        #[arg(long)]
        db_path: Option<PathBuf>,
    },
    /// Create a user and print a session token for it
    AddUser {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        db_path: Option<PathBuf>,
    },
    /// Show the tasks of the current project, grouped by category
    Board {
        /// Only show one category (setup, frontend, backend, testing, deploy, maintain)
        #[arg(short, long)]
        category: Option<String>,

        /// Open this project instead of the current one
        #[arg(short, long)]
        project: Option<i64>,
    },
    /// Mark a task of the current project as done
    Toggle {
        task_id: String,

        /// Mark the task as not done instead
        #[arg(long)]
        undo: bool,

        #[arg(short, long)]
        project: Option<i64>,
    },
    /// Fill in the project form and generate a project from it
    New {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Speed, Scalability or Learning
        #[arg(long)]
        priority: Option<String>,

        /// Discard the saved draft
        #[arg(long)]
        reset: bool,
    },
    /// Ask the AI service to improve a project idea
    Enhance {
        description: String,

        /// Write the enhanced description into the saved draft
        #[arg(long)]
        accept: bool,
    },
    /// End the session on the server
    Signout,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    learnstack::logging::init_tracing(cli.verbose, cli.log_json);

    let mut config = LearnstackConfig::load(cli.config.as_deref())?;
    config.apply_env()?;
    if let Some(url) = &cli.api_url {
        config.client.api_url = url.clone();
    }
    if let Some(token) = &cli.token {
        config.client.token = Some(token.clone());
    }

    match cli.command {
        Commands::Serve {
            port,
            db_path,
            ai_url,
            dev,
            open,
        } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(db_path) = db_path {
                config.server.db_path = db_path;
            }
            if let Some(ai_url) = ai_url {
                config.ai.base_url = ai_url;
            }
            config.server.dev |= dev;
            cmd::cmd_serve(&config, open).await?;
        }
        Commands::Init { db_path } => {
            cmd::cmd_init(&db_path.unwrap_or(config.server.db_path))?;
        }
        Commands::AddUser {
            name,
            email,
            db_path,
        } => {
            cmd::cmd_add_user(&db_path.unwrap_or(config.server.db_path), &name, &email)?;
        }
        Commands::Board { category, project } => {
            cmd::cmd_board(&config, category.as_deref(), project).await?;
        }
        Commands::Toggle {
            task_id,
            undo,
            project,
        } => {
            cmd::cmd_toggle(&config, &task_id, !undo, project).await?;
        }
        Commands::New {
            name,
            description,
            priority,
            reset,
        } => {
            if reset {
                cmd::cmd_reset_draft(&config)?;
            } else {
                cmd::cmd_new(&config, name, description, priority).await?;
            }
        }
        Commands::Enhance {
            description,
            accept,
        } => {
            cmd::cmd_enhance(&config, &description, accept).await?;
        }
        Commands::Signout => cmd::cmd_signout(&config).await?,
    }

    Ok(())
}
