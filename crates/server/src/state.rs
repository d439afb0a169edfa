use exeforge_core::{BatchCoordinator, Config};

/// Shared application state
pub struct AppState {
    config: Config,
    coordinator: BatchCoordinator,
}

impl AppState {
    pub fn new(config: Config, coordinator: BatchCoordinator) -> Self {
        Self {
            config,
            coordinator,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn coordinator(&self) -> &BatchCoordinator {
        &self.coordinator
    }
}
