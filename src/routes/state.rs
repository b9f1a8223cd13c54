use std::sync::Arc;

use crate::{
    config::Config,
    db::{create_pool, BookStore},
    services::{
        catalog::CatalogClient,
        llm::{OpenAiModel, RecommendationModel},
    },
};

/// Shared application state: one catalog client, one recommendation model,
/// one book store. All are cheaply cloneable; requests share no mutable
/// state.
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogClient,
    pub model: Arc<dyn RecommendationModel>,
    pub store: BookStore,
}

impl AppState {
    pub fn new(
        catalog: CatalogClient,
        model: Arc<dyn RecommendationModel>,
        store: BookStore,
    ) -> Self {
        Self {
            catalog,
            model,
            store,
        }
    }

    /// Wire up state from configuration: real providers, real model, real
    /// database pool
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let pool = create_pool(&config.database_url).await?;
        Ok(Self::new(
            CatalogClient::from_config(config),
            Arc::new(OpenAiModel::from_config(config)),
            BookStore::new(pool),
        ))
    }
}
