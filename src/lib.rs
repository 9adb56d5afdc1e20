//! Declarative action runner.
//!
//! Actions are read from a JSON document into a [`Catalog`], looked up by id,
//! filled in from user inputs through `{name}` command templates, and handed
//! to the operating system by a [`Dispatcher`] according to their execution
//! type.

pub mod actions;
pub mod common;
pub mod config;
pub mod database;
pub mod error;
pub mod events;
pub mod settings;

use std::sync::Arc;

pub use actions::catalog::Catalog;
pub use actions::dispatcher::{Dispatcher, ExecutionOutcome};
pub use actions::launcher::{Launcher, SystemLauncher};
pub use actions::loader::CatalogLoader;
pub use actions::runner::{ActionRunner, ExecutionRequest, ProvidedInputs};
pub use actions::{ActionDefinition, ExecutionType, InputSpec};
pub use config::Config;
pub use error::RunnerError;
pub use events::{EventBus, RunnerEvent, Topic};

/// The wired-up engine: one catalog, its loader and a runner dispatching
/// through `launcher`.
pub struct Engine {
    pub catalog: Arc<Catalog>,
    pub events: Arc<EventBus>,
    pub loader: CatalogLoader,
    pub runner: ActionRunner,
}

impl Engine {
    pub fn new(config: &Config, launcher: Arc<dyn Launcher>, events: Arc<EventBus>) -> Self {
        let catalog = Arc::new(Catalog::new());
        let loader = CatalogLoader::new(catalog.clone(), events.clone(), &config.resource_dir);
        let runner = ActionRunner::new(catalog.clone(), Dispatcher::new(launcher), events.clone());
        Self {
            catalog,
            events,
            loader,
            runner,
        }
    }

    /// Engine launching real processes on this platform.
    pub fn with_system_launcher(config: &Config) -> Self {
        let events = Arc::new(EventBus::new());
        let launcher = Arc::new(SystemLauncher::new(config, events.clone()));
        Self::new(config, launcher, events)
    }
}
