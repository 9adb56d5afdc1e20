use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use log::warn;

use super::ActionDefinition;

/// Immutable view of one loaded actions document.
#[derive(Debug, Default, Clone)]
pub struct CatalogSnapshot {
    actions: Vec<ActionDefinition>,
    by_category: BTreeMap<String, Vec<ActionDefinition>>,
}

impl CatalogSnapshot {
    pub fn new(actions: Vec<ActionDefinition>) -> Self {
        let mut by_category: BTreeMap<String, Vec<ActionDefinition>> = BTreeMap::new();
        for action in &actions {
            by_category
                .entry(action.category.clone())
                .or_default()
                .push(action.clone());
        }

        for (index, action) in actions.iter().enumerate() {
            if actions[..index].iter().any(|a| a.id == action.id) {
                warn!(
                    "Duplicate action id '{}' at position {}; lookups use the first one",
                    action.id, index
                );
            }
        }

        Self {
            actions,
            by_category,
        }
    }

    pub fn actions(&self) -> &[ActionDefinition] {
        &self.actions
    }

    pub fn lookup(&self, id: &str) -> Option<&ActionDefinition> {
        self.actions.iter().find(|action| action.id == id)
    }

    pub fn by_category(&self) -> &BTreeMap<String, Vec<ActionDefinition>> {
        &self.by_category
    }
}

/// Shared action catalog. Writers swap in a whole snapshot, so readers never
/// see a partially rebuilt grouping.
#[derive(Debug)]
pub struct Catalog {
    snap: ArcSwap<CatalogSnapshot>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            snap: ArcSwap::from_pointee(CatalogSnapshot::default()),
        }
    }

    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.snap.load_full()
    }

    pub(crate) fn replace(&self, snapshot: CatalogSnapshot) {
        self.snap.store(Arc::new(snapshot));
    }

    /// First action declared with `id`.
    pub fn lookup(&self, id: &str) -> Option<ActionDefinition> {
        self.snap.load().lookup(id).cloned()
    }

    pub fn categorized(&self) -> BTreeMap<String, Vec<ActionDefinition>> {
        self.snap.load().by_category.clone()
    }

    pub fn category_names(&self) -> Vec<String> {
        self.snap.load().by_category.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.snap.load().actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(id: &str, category: &str, command: &str) -> ActionDefinition {
        ActionDefinition {
            id: id.to_string(),
            name: None,
            description: None,
            category: category.to_string(),
            command: command.to_string(),
            kind: "direct".to_string(),
            inputs: Vec::new(),
        }
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = Catalog::new();
        assert!(catalog.is_empty());
        assert!(catalog.categorized().is_empty());
        assert!(catalog.category_names().is_empty());
        assert_eq!(catalog.lookup("calc"), None);
    }

    #[test]
    fn test_grouping_keeps_declaration_order() {
        let catalog = Catalog::new();
        catalog.replace(CatalogSnapshot::new(vec![
            action("b", "web", "firefox"),
            action("a", "tools", "calc"),
            action("c", "web", "chromium"),
        ]));

        let grouped = catalog.categorized();
        let web: Vec<&str> = grouped["web"].iter().map(|a| a.id.as_str()).collect();
        assert_eq!(web, vec!["b", "c"]);
        assert_eq!(grouped["tools"].len(), 1);
        assert_eq!(catalog.category_names(), vec!["tools", "web"]);
    }

    #[test]
    fn test_duplicate_ids_resolve_to_first() {
        let catalog = Catalog::new();
        catalog.replace(CatalogSnapshot::new(vec![
            action("calc", "tools", "first"),
            action("calc", "other", "second"),
        ]));

        assert_eq!(catalog.lookup("calc").unwrap().command, "first");
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.categorized()["other"][0].command, "second");
    }

    #[test]
    fn test_snapshot_survives_replace() {
        let catalog = Catalog::new();
        catalog.replace(CatalogSnapshot::new(vec![action("a", "tools", "x")]));
        let before = catalog.snapshot();

        catalog.replace(CatalogSnapshot::new(vec![action("b", "tools", "y")]));

        assert!(before.lookup("a").is_some());
        assert!(catalog.lookup("a").is_none());
        assert!(catalog.lookup("b").is_some());
    }
}
