use std::sync::Arc;

use crate::backends::{BackendContext, BackendProvider, PacmanProvider, WingetProvider, YayProvider};

/// Ordered, append-only set of providers. Availability is asked fresh on
/// every query.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn BackendProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers yay, pacman and winget, in that order.
    pub fn with_default_backends(context: BackendContext) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(YayProvider::new(context.clone())));
        registry.register(Arc::new(PacmanProvider::new(context.clone())));
        registry.register(Arc::new(WingetProvider::new(context)));
        registry
    }

    pub fn register(&mut self, provider: Arc<dyn BackendProvider>) {
        tracing::debug!(provider = provider.name(), priority = provider.priority(), "registered provider");
        self.providers.push(provider);
    }

    pub fn providers(&self) -> &[Arc<dyn BackendProvider>] {
        &self.providers
    }

    pub fn available_providers(&self) -> Vec<Arc<dyn BackendProvider>> {
        self.providers
            .iter()
            .filter(|provider| provider.is_available())
            .cloned()
            .collect()
    }

    /// Lowest priority among available providers; the earliest registration
    /// wins a tie.
    pub fn select_best(&self) -> Option<Arc<dyn BackendProvider>> {
        let mut best: Option<&Arc<dyn BackendProvider>> = None;
        for provider in self.providers.iter().filter(|p| p.is_available()) {
            match best {
                Some(current) if current.priority() <= provider.priority() => {}
                _ => best = Some(provider),
            }
        }
        best.cloned()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|provider| provider.name()))
            .finish()
    }
}
