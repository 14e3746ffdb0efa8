//! CLI command implementations.
//!
//! | Module    | Commands handled                         |
//! |-----------|------------------------------------------|
//! | `serve`   | `Serve`, `Init`, `AddUser`               |
//! | `board`   | `Board`, `Toggle`                        |
//! | `project` | `New`, `Enhance`, `Signout`              |

pub mod board;
pub mod project;
pub mod serve;

pub use board::{cmd_board, cmd_toggle};
pub use project::{cmd_enhance, cmd_new, cmd_reset_draft, cmd_signout};
pub use serve::{cmd_add_user, cmd_init, cmd_serve};

use std::sync::Arc;

use anyhow::{Context, Result};

use learnstack::client::api::{HttpPlannerClient, PlannerApi};
use learnstack::client::draft::{DraftStore, LocalStorage};
use learnstack::client::store::Store;
use learnstack::client::{Notifier, TerminalNotifier};
use learnstack::config::LearnstackConfig;

/// Everything a client command needs, wired from configuration.
pub struct ClientContext {
    pub api: Arc<dyn PlannerApi>,
    pub store: Store,
    pub notifier: Arc<dyn Notifier>,
    pub drafts: DraftStore,
}

impl ClientContext {
    pub fn from_config(config: &LearnstackConfig) -> Result<Self> {
        let client = HttpPlannerClient::new(
            &config.client.api_url,
            config.client.token.clone(),
            config.client_timeout(),
        )
        .context("Failed to build API client")?;
        Ok(Self {
            api: Arc::new(client),
            store: Store::new(),
            notifier: Arc::new(TerminalNotifier),
            drafts: drafts(config),
        })
    }
}

pub fn drafts(config: &LearnstackConfig) -> DraftStore {
    DraftStore::new(LocalStorage::open(&config.client_data_dir()))
}
