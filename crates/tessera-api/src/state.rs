//! Shared handler state.

use std::sync::Arc;

use tokio::sync::Mutex;

use tessera_core::{CompletionProvider, ItemStore};
use tessera_suggest::{
    ClusterConfig, ClusterSuggester, ConnectionSuggester, DismissalWindow, FeedConfig,
    StarterConfig, StarterGenerator, SuggestConfig, SuggestionFeed, SynthesisGenerator,
};

/// Pipeline settings bundled for [`AppState::new`].
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub suggest: SuggestConfig,
    pub clusters: ClusterConfig,
    pub starters: StarterConfig,
    pub feed: FeedConfig,
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        Self {
            suggest: SuggestConfig::from_env(),
            clusters: ClusterConfig::from_env(),
            starters: StarterConfig::from_env(),
            feed: FeedConfig::from_env(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ItemStore>,
    /// Model name of the completion provider, if one is configured.
    pub model: Option<String>,
    pub connections: Arc<ConnectionSuggester>,
    pub clusters: Arc<ClusterSuggester>,
    pub starters: Arc<StarterGenerator>,
    pub synthesis: Arc<SynthesisGenerator>,
    pub dismissals: Arc<Mutex<DismissalWindow>>,
    pub feed: Arc<Mutex<SuggestionFeed>>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ItemStore>,
        provider: Option<Arc<dyn CompletionProvider>>,
        config: PipelineConfig,
    ) -> Self {
        let connections = Arc::new(ConnectionSuggester::new(config.suggest.clone()));
        let dismissals = DismissalWindow::new(
            config.suggest.dismissal_window(),
            config.suggest.dismissal_capacity,
        );
        Self {
            store,
            model: provider.as_ref().map(|p| p.model_name().to_string()),
            clusters: Arc::new(ClusterSuggester::new(config.clusters)),
            starters: Arc::new(StarterGenerator::new(
                provider.clone(),
                config.starters.clone(),
            )),
            synthesis: Arc::new(SynthesisGenerator::new(provider, config.starters)),
            dismissals: Arc::new(Mutex::new(dismissals)),
            feed: Arc::new(Mutex::new(SuggestionFeed::new(
                config.feed,
                connections.clone(),
            ))),
            connections,
        }
    }
}
