//! # Web API Application State

use std::sync::Arc;

use crate::config::WebConfig;
use crate::database::DatabaseConnection;
use crate::orchestration::BatchScheduler;
use crate::services::BatchTaskService;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub service: BatchTaskService,
    pub database: DatabaseConnection,
    pub config: Arc<WebConfig>,
    /// Present when the scheduler runs in the same process
    pub scheduler: Option<Arc<BatchScheduler>>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("scheduler_attached", &self.scheduler.is_some())
            .finish()
    }
}

impl AppState {
    pub fn new(database: DatabaseConnection, config: WebConfig) -> Self {
        Self {
            service: BatchTaskService::new(database.pool().clone()),
            database,
            config: Arc::new(config),
            scheduler: None,
        }
    }

    pub fn with_scheduler(mut self, scheduler: Arc<BatchScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }
}
