//! Named label registry
//!
//! Maps names to selections, case-insensitively but case-preservingly: `Total`
//! and `total` are one label, displayed with whatever casing was saved last.
//! A label may point at another label; cycles are rejected at save time so
//! resolution always terminates.

use std::collections::BTreeMap;

use gridstore_core::{
    window, Error, Result, SaveEvent, Selection, Store, WatcherHandle, WatcherHub,
};

use crate::resolver;

/// One registry entry: the display-cased name and what it maps to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMapping {
    /// The name as saved, original casing preserved
    pub name: String,
    /// What the label points at
    pub selection: Selection,
}

/// Case-insensitive name → selection store with save-time cycle rejection
#[derive(Debug, Default)]
pub struct LabelRegistry {
    /// Keyed by lowercased name; the mapping keeps the display casing
    labels: BTreeMap<String, LabelMapping>,
    on_save: WatcherHub<SaveEvent<String, Selection>>,
    on_delete: WatcherHub<String>,
}

impl LabelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hub fired after each state-changing save
    pub fn on_save(&self) -> &WatcherHub<SaveEvent<String, Selection>> {
        &self.on_save
    }

    /// Hub fired when a label is deleted
    pub fn on_delete(&self) -> &WatcherHub<String> {
        &self.on_delete
    }

    /// Map `name` to `selection`, replacing any previous mapping.
    ///
    /// The name is trimmed and must be non-empty. Cell and range selections
    /// are stored with absolute markers stripped; a label selection keeps its
    /// casing for display and resolves case-insensitively. A save whose
    /// selection would make resolution cyclic is rejected before any state
    /// changes. Returns whether state changed; only a change fires the save
    /// hub.
    pub fn save(&mut self, name: &str, selection: &Selection) -> Result<bool> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidName("label name must not be blank".into()));
        }

        let stored = match selection {
            Selection::Label(next) => Selection::label(next.trim()),
            concrete => concrete.canonical(),
        };
        if let Selection::Label(next) = &stored {
            if next.is_empty() {
                return Err(Error::InvalidName(
                    "label target name must not be blank".into(),
                ));
            }
        }

        if let Some(chain) = resolver::would_cycle(self, name, &stored) {
            log::debug!("rejecting label {}: cycle {}", name, chain.join(" -> "));
            return Err(Error::cycle(chain));
        }

        let mapping = LabelMapping {
            name: name.to_string(),
            selection: stored,
        };
        let key = name.to_lowercase();
        let previous = self.labels.insert(key, mapping.clone());
        if previous.as_ref() == Some(&mapping) {
            return Ok(false);
        }

        self.on_save.accept(&SaveEvent {
            key: mapping.name,
            value: mapping.selection,
        });
        Ok(true)
    }

    /// Delete a label. Fires the delete hub with the stored display-cased
    /// name, and only when the label existed.
    pub fn delete(&mut self, name: &str) -> bool {
        let Some(mapping) = self.labels.remove(&name.trim().to_lowercase()) else {
            return false;
        };
        self.on_delete.accept(&mapping.name);
        true
    }

    /// The mapping stored for a name, if any (case-insensitive)
    pub fn load(&self, name: &str) -> Option<&LabelMapping> {
        self.labels.get(&name.trim().to_lowercase())
    }

    /// [`load`](Self::load), but absence is an error naming the label
    pub fn load_or_fail(&self, name: &str) -> Result<&LabelMapping> {
        self.load(name)
            .ok_or_else(|| Error::LabelNotFound(name.trim().to_string()))
    }

    /// Follow a label chain to its concrete cell or range, if every link
    /// exists
    pub fn resolve_label(&self, name: &str) -> Option<Selection> {
        resolver::resolve(self, name)
    }

    /// [`resolve_label`](Self::resolve_label), but a missing link is an
    /// error naming the label it stopped at
    pub fn resolve_label_or_fail(&self, name: &str) -> Result<Selection> {
        resolver::resolve_or_fail(self, name)
    }

    /// Every concrete selection reachable from a name
    pub fn load_cell_or_cell_ranges(&self, name: &str) -> Vec<Selection> {
        resolver::concrete_selections(self, name)
    }

    /// A window of labels whose display name contains `pattern`,
    /// case-insensitively, in name order
    pub fn find_labels_by_name(
        &self,
        pattern: &str,
        offset: usize,
        count: usize,
    ) -> Vec<LabelMapping> {
        let pattern = pattern.to_lowercase();
        window(
            self.labels
                .values()
                .filter(|mapping| mapping.name.to_lowercase().contains(&pattern))
                .cloned(),
            offset,
            count,
        )
    }

    /// A window of labels whose resolved footprint shares at least one cell
    /// with `selection`, in name order.
    ///
    /// A label query is resolved through the registry first; a query that
    /// resolves to nothing matches nothing.
    pub fn find_labels_with_reference(
        &self,
        selection: &Selection,
        offset: usize,
        count: usize,
    ) -> Vec<LabelMapping> {
        let query: Vec<Selection> = match selection {
            Selection::Label(name) => resolver::concrete_selections(self, name),
            concrete => vec![concrete.canonical()],
        };
        if query.is_empty() {
            return Vec::new();
        }

        window(
            self.labels
                .values()
                .filter(|mapping| {
                    resolver::concrete_selections(self, &mapping.name)
                        .iter()
                        .any(|resolved| query.iter().any(|q| q.intersects(resolved)))
                })
                .cloned(),
            offset,
            count,
        )
    }

    /// A window of display-cased names in case-insensitive name order
    pub fn names(&self, offset: usize, count: usize) -> Vec<String> {
        window(self.labels.values().map(|m| m.name.clone()), offset, count)
    }

    /// Number of labels stored
    pub fn count(&self) -> usize {
        self.labels.len()
    }

    pub fn clear(&mut self) {
        self.labels.clear();
    }
}

impl Store for LabelRegistry {
    type Key = String;
    type Value = Selection;

    fn save(&mut self, key: String, value: Selection) -> Result<()> {
        LabelRegistry::save(self, &key, &value)?;
        Ok(())
    }

    fn load(&self, key: &String) -> Result<Option<Selection>> {
        Ok(LabelRegistry::load(self, key).map(|mapping| mapping.selection.clone()))
    }

    fn delete(&mut self, key: &String) -> Result<bool> {
        Ok(LabelRegistry::delete(self, key))
    }

    fn contains(&self, key: &String) -> bool {
        LabelRegistry::load(self, key).is_some()
    }

    fn len(&self) -> usize {
        self.labels.len()
    }

    fn keys(&self, offset: usize, count: usize) -> Vec<String> {
        self.names(offset, count)
    }

    fn values(&self, offset: usize, count: usize) -> Vec<Selection> {
        window(
            self.labels.values().map(|m| m.selection.clone()),
            offset,
            count,
        )
    }

    fn watch_save(
        &self,
        watcher: Box<dyn Fn(&SaveEvent<String, Selection>)>,
    ) -> Result<WatcherHandle<SaveEvent<String, Selection>>> {
        Ok(self.on_save.register(watcher))
    }
}
