use std::sync::Arc;

use numera_core::config::{AppConfig, ConfigError, LoadOptions};
use numera_oracle::HttpTextGenerator;
use numera_store::{StateStore, StoreError};
use numera_telegram::{EventProcessor, HttpBotApi};
use thiserror::Error;
use tracing::info;

use crate::dispatch::Dispatcher;
use crate::webhook::GatewayState;

pub struct Application {
    pub config: AppConfig,
    pub store: Arc<StateStore>,
    pub dispatcher: Dispatcher,
    pub gateway: GatewayState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!("starting application bootstrap");

    let store = Arc::new(StateStore::open(&config.storage.data_dir).await?);
    info!(
        data_dir = %config.storage.data_dir.display(),
        users = store.user_count().await,
        "state store opened"
    );

    let generator = Arc::new(HttpTextGenerator::new(&config.llm));
    let api = Arc::new(HttpBotApi::new(&config.telegram));
    let processor = Arc::new(EventProcessor::new(
        store.clone(),
        generator,
        api,
        config.telegram.admin_ids.clone(),
    ));

    let dispatcher = Dispatcher::start(config.server.queue_capacity);
    let gateway = GatewayState::new(
        config.telegram.webhook_secret.clone(),
        dispatcher.clone(),
        processor,
        store.clone(),
    );

    Ok(Application { config, store, dispatcher, gateway })
}
