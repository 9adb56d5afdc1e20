use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};
use serde_json::Value;

use super::catalog::{Catalog, CatalogSnapshot};
use super::ActionDefinition;
use crate::common::executable_dir;
use crate::error::RunnerError;
use crate::events::{EventBus, RunnerEvent};

/// Top-level key holding the array of action objects.
pub const ACTIONS_KEY: &str = "actions";

/// Reads actions documents and swaps them into a [`Catalog`].
#[derive(Debug)]
pub struct CatalogLoader {
    catalog: Arc<Catalog>,
    events: Arc<EventBus>,
    resource_dir: String,
}

impl CatalogLoader {
    pub fn new(catalog: Arc<Catalog>, events: Arc<EventBus>, resource_dir: &str) -> Self {
        Self {
            catalog,
            events,
            resource_dir: resource_dir.to_string(),
        }
    }

    /// Loads `hint` and replaces the catalog on success. On failure the
    /// previous catalog is left untouched.
    pub fn load(&self, hint: &Path) -> Result<PathBuf, RunnerError> {
        let result = self.read_snapshot(hint);

        match result {
            Ok((path, snapshot)) => {
                info!(
                    "Loaded {} actions from {:?}",
                    snapshot.actions().len(),
                    path
                );
                self.catalog.replace(snapshot);
                self.events.publish(RunnerEvent::ActionsLoaded { success: true });
                self.events.publish(RunnerEvent::ActionsChanged);
                Ok(path)
            }
            Err(e) => {
                warn!("Failed to load actions: {}", e);
                self.events.publish(RunnerEvent::ActionsLoaded { success: false });
                Err(e)
            }
        }
    }

    fn read_snapshot(&self, hint: &Path) -> Result<(PathBuf, CatalogSnapshot), RunnerError> {
        let path = self
            .locate(hint)
            .ok_or_else(|| RunnerError::CatalogNotFound(hint.to_path_buf()))?;
        debug!("Reading actions from {:?}", path);

        let data = fs::read(&path).map_err(|e| {
            warn!("Could not open actions file {:?}: {}", path, e);
            RunnerError::CatalogNotFound(path.clone())
        })?;

        let snapshot = parse_document(&data).map_err(|reason| RunnerError::InvalidFormat {
            path: path.clone(),
            reason,
        })?;

        Ok((path, snapshot))
    }

    /// Search order: the literal path, the working directory, the resource
    /// directory beneath it, the executable's directory, and the resource
    /// directory beneath that.
    pub fn candidates(&self, hint: &Path) -> Vec<PathBuf> {
        let mut candidates = vec![hint.to_path_buf()];

        if let Ok(cwd) = env::current_dir() {
            candidates.push(cwd.join(hint));
            candidates.push(cwd.join(&self.resource_dir).join(hint));
        }

        if let Some(exe_dir) = executable_dir() {
            candidates.push(exe_dir.join(hint));
            candidates.push(exe_dir.join(&self.resource_dir).join(hint));
        }

        candidates
    }

    pub fn locate(&self, hint: &Path) -> Option<PathBuf> {
        self.candidates(hint).into_iter().find(|path| path.is_file())
    }
}

/// Parses a whole document into a snapshot without touching any catalog.
/// Array elements that are not objects are skipped.
pub fn parse_document(data: &[u8]) -> Result<CatalogSnapshot, String> {
    let root: Value = serde_json::from_slice(data).map_err(|e| e.to_string())?;
    let root = root
        .as_object()
        .ok_or_else(|| "document root is not an object".to_string())?;
    let entries = root
        .get(ACTIONS_KEY)
        .and_then(Value::as_array)
        .ok_or_else(|| format!("no '{}' array found", ACTIONS_KEY))?;

    let actions: Vec<ActionDefinition> = entries
        .iter()
        .filter_map(Value::as_object)
        .map(ActionDefinition::from_json)
        .collect();

    let skipped = entries.len() - actions.len();
    if skipped > 0 {
        debug!("Skipped {} non-object entries in actions array", skipped);
    }

    Ok(CatalogSnapshot::new(actions))
}
