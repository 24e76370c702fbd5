use crate::config::Config;
use crate::database::{Collection, JsonFileStore, StoreError};
use crate::models::{Feedback, Resource};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub resources: Arc<Collection<Resource>>,
    pub feedback: Arc<Collection<Feedback>>,
}

impl AppState {
    pub fn new(resources: Collection<Resource>, feedback: Collection<Feedback>) -> Self {
        AppState {
            resources: Arc::new(resources),
            feedback: Arc::new(feedback),
        }
    }

    /// Opens both JSON file stores named by the config, creating empty ones
    /// where the files do not exist yet.
    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        let resources: JsonFileStore<Resource> = JsonFileStore::new(&config.resources_file);
        let feedback: JsonFileStore<Feedback> = JsonFileStore::new(&config.feedback_file);

        resources.ensure_exists()?;
        feedback.ensure_exists()?;

        Ok(Self::new(Collection::new(resources), Collection::new(feedback)))
    }
}
