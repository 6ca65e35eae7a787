use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use rotabot_agent::llm::{LlmClient, LlmError};
use rotabot_agent::provider::HttpLlmClient;
use rotabot_agent::reorder::ReorderEngine;
use rotabot_core::config::{AppConfig, ConfigError, LoadOptions};
use rotabot_core::repository::RepositoryError;
use rotabot_core::slot::{SlotRepository, UpcomingSlot};
use rotabot_core::user::{UserProfile, UserRepository};
use rotabot_slack::api::SlackApiClient;
use rotabot_slack::messenger::{Messenger, TransportError};
use rotabot_slack::thread::ThreadReader;
use rotabot_slack::writer::MessageWriter;

use crate::handlers::ThreadMentionFlow;
use crate::ingress::IngressState;
use crate::tasks::TaskSupervisor;
use crate::toggle::ProgressToggle;

const SLACK_TIMEOUT_SECS: u64 = 30;

pub struct Application {
    pub config: AppConfig,
    pub tasks: Arc<TaskSupervisor>,
    mention_flow: Arc<ThreadMentionFlow>,
    toggle: Arc<ProgressToggle>,
}

impl Application {
    pub fn ingress_state(&self) -> IngressState {
        IngressState::new(
            self.config.slack.signing_secret.clone(),
            self.mention_flow.clone(),
            self.toggle.clone(),
            self.tasks.clone(),
        )
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("slack client construction failed: {0}")]
    SlackClient(#[source] TransportError),
    #[error("llm client construction failed: {0}")]
    LlmClient(#[source] LlmError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let messenger: Arc<dyn Messenger> = Arc::new(
        SlackApiClient::new(config.slack.bot_token.clone(), SLACK_TIMEOUT_SECS)
            .map_err(BootstrapError::SlackClient)?,
    );

    let llm: Arc<dyn LlmClient> =
        Arc::new(HttpLlmClient::from_config(&config.llm).map_err(BootstrapError::LlmClient)?);

    // Repositories are noop until an external scheduler backend is wired in.
    let users: Arc<dyn UserRepository> = Arc::new(NoopUserRepository);
    let slots: Arc<dyn SlotRepository> = Arc::new(NoopSlotRepository);

    info!(
        event_name = "system.bootstrap.llm_mode",
        correlation_id = "bootstrap",
        provider = ?config.llm.provider,
        model = %config.llm.model,
        "llm transport initialized"
    );

    let mention_flow = Arc::new(ThreadMentionFlow::new(
        ThreadReader::new(messenger.clone()),
        ReorderEngine::new(llm),
        MessageWriter::new(messenger.clone()),
        users.clone(),
        slots.clone(),
    ));
    let toggle = Arc::new(ProgressToggle::new(MessageWriter::new(messenger), users, slots));

    Ok(Application { config, tasks: Arc::new(TaskSupervisor::new()), mention_flow, toggle })
}

/// Stand-in user store for deployments without a directory backend.
pub struct NoopUserRepository;

#[async_trait]
impl UserRepository for NoopUserRepository {
    async fn users(&self) -> Result<Vec<UserProfile>, RepositoryError> {
        Ok(Vec::new())
    }
}

/// Stand-in slot store. Reports no upcoming slots, which makes every
/// toggle a no-match and every reconciliation render an empty completion
/// set.
pub struct NoopSlotRepository;

#[async_trait]
impl SlotRepository for NoopSlotRepository {
    async fn upcoming_slots(&self) -> Result<Vec<UpcomingSlot>, RepositoryError> {
        Ok(Vec::new())
    }

    async fn add_completed_user(&self, _: &str, _: &str) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn remove_completed_user(&self, _: &str, _: &str) -> Result<(), RepositoryError> {
        Ok(())
    }
}
