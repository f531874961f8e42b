//! Bidirectional reference graph
//!
//! Tracks which cells reference which targets (labels or other cells), with
//! a mirrored back-reference map so both directions answer in one lookup.

use std::collections::{BTreeMap, BTreeSet};

use gridstore_core::{
    window, CellRef, Error, Result, SaveEvent, Store, WatcherHandle, WatcherHub,
};

/// Something a cell can refer to: a named label or another cell.
///
/// Labels order before cells. The graph stores every target in normalized
/// form (lowercase label names, absolute markers stripped from cells), so
/// label lookup is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Target {
    Label(String),
    Cell(CellRef),
}

impl Target {
    /// A label target, lowered so `Total` and `total` are one key
    pub fn label(name: impl Into<String>) -> Self {
        Target::Label(name.into().to_lowercase())
    }

    pub fn cell(cell: CellRef) -> Self {
        Target::Cell(cell.normalized())
    }

    /// The canonical form used as a map key: lowercase label names,
    /// absolute markers stripped from cells
    pub fn normalized(&self) -> Self {
        match self {
            Target::Label(name) => Target::Label(name.to_lowercase()),
            Target::Cell(cell) => Target::Cell(cell.normalized()),
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Label(name) => write!(f, "{}", name),
            Target::Cell(cell) => write!(f, "{}", cell),
        }
    }
}

impl From<CellRef> for Target {
    fn from(cell: CellRef) -> Self {
        Target::cell(cell)
    }
}

/// One edge of the graph: `cell` references `target`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeEvent {
    pub target: Target,
    pub cell: CellRef,
}

/// Edge store between referencing cells and their targets
#[derive(Debug, Default)]
pub struct ReferenceGraph {
    /// Target → cells referencing it
    refs: BTreeMap<Target, BTreeSet<CellRef>>,
    /// Cell → targets it references (mirror of `refs`)
    back_refs: BTreeMap<CellRef, BTreeSet<Target>>,
    on_add: WatcherHub<EdgeEvent>,
    on_remove: WatcherHub<EdgeEvent>,
    on_delete: WatcherHub<Target>,
}

impl ReferenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hub fired per edge added
    pub fn on_add(&self) -> &WatcherHub<EdgeEvent> {
        &self.on_add
    }

    /// Hub fired per edge removed
    pub fn on_remove(&self) -> &WatcherHub<EdgeEvent> {
        &self.on_remove
    }

    /// Hub fired when a target is deleted outright
    pub fn on_delete(&self) -> &WatcherHub<Target> {
        &self.on_delete
    }

    /// Replace the full set of cells referencing `target`.
    ///
    /// Computes the difference against the current set and fires one remove
    /// event per departed cell and one add event per arrived cell, after all
    /// map mutation is done. Saving the set a target already has fires
    /// nothing. An empty set removes the target key entirely.
    pub fn save_references(&mut self, target: &Target, cells: &[CellRef]) {
        let target = target.normalized();
        let new: BTreeSet<CellRef> = cells.iter().map(|c| c.normalized()).collect();
        let old = self.refs.get(&target).cloned().unwrap_or_default();
        if new == old {
            return;
        }

        let removed: Vec<CellRef> = old.difference(&new).copied().collect();
        let added: Vec<CellRef> = new.difference(&old).copied().collect();

        for cell in &removed {
            self.unlink(&target, cell);
        }
        for cell in &added {
            self.link(&target, *cell);
        }

        for cell in removed {
            self.on_remove.accept(&EdgeEvent {
                target: target.clone(),
                cell,
            });
        }
        for cell in added {
            self.on_add.accept(&EdgeEvent {
                target: target.clone(),
                cell,
            });
        }
    }

    /// Add one referencing cell. No-op when the edge exists; returns
    /// whether state changed.
    pub fn add_cell(&mut self, target: &Target, cell: &CellRef) -> bool {
        let target = target.normalized();
        let cell = cell.normalized();
        if !self.link(&target, cell) {
            return false;
        }
        self.on_add.accept(&EdgeEvent { target, cell });
        true
    }

    /// Remove one referencing cell. No-op when the edge is absent; returns
    /// whether state changed.
    pub fn remove_cell(&mut self, target: &Target, cell: &CellRef) -> bool {
        let target = target.normalized();
        let cell = cell.normalized();
        if !self.unlink(&target, &cell) {
            return false;
        }
        self.on_remove.accept(&EdgeEvent { target, cell });
        true
    }

    /// Delete a target and all its edges, firing exactly one delete event
    /// (no per-edge removes). Returns whether the target existed.
    pub fn delete(&mut self, target: &Target) -> bool {
        let target = target.normalized();
        let Some(cells) = self.refs.remove(&target) else {
            return false;
        };
        for cell in cells {
            if let Some(targets) = self.back_refs.get_mut(&cell) {
                targets.remove(&target);
                if targets.is_empty() {
                    self.back_refs.remove(&cell);
                }
            }
        }
        self.on_delete.accept(&target);
        true
    }

    /// Drop every edge a cell participates in, across all its targets.
    ///
    /// Fires one remove event per edge dropped. Used when a cell's content
    /// is cleared and its outgoing references go with it.
    pub fn remove_references_with_cell(&mut self, cell: &CellRef) {
        let cell = cell.normalized();
        let Some(targets) = self.back_refs.remove(&cell) else {
            return;
        };
        log::debug!("removing {} reference(s) from {}", targets.len(), cell);

        for target in &targets {
            if let Some(cells) = self.refs.get_mut(target) {
                cells.remove(&cell);
                if cells.is_empty() {
                    self.refs.remove(target);
                }
            }
        }
        for target in targets {
            self.on_remove.accept(&EdgeEvent { target, cell });
        }
    }

    /// A window of cells referencing `target`, in cell order
    pub fn find_cells_with_reference(
        &self,
        target: &Target,
        offset: usize,
        count: usize,
    ) -> Vec<CellRef> {
        let target = target.normalized();
        self.refs
            .get(&target)
            .map(|cells| window(cells.iter().copied(), offset, count))
            .unwrap_or_default()
    }

    /// A window of targets referenced by `cell`, labels first then cells
    pub fn find_references_with_cell(
        &self,
        cell: &CellRef,
        offset: usize,
        count: usize,
    ) -> Vec<Target> {
        let cell = cell.normalized();
        self.back_refs
            .get(&cell)
            .map(|targets| window(targets.iter().cloned(), offset, count))
            .unwrap_or_default()
    }

    /// How many cells reference `target`
    pub fn count_cells_with_reference(&self, target: &Target) -> usize {
        let target = target.normalized();
        self.refs.get(&target).map_or(0, |cells| cells.len())
    }

    /// Whether `cell` references `target`
    pub fn contains_edge(&self, target: &Target, cell: &CellRef) -> bool {
        let target = target.normalized();
        let cell = cell.normalized();
        self.refs
            .get(&target)
            .is_some_and(|cells| cells.contains(&cell))
    }

    /// A window of targets with at least one referencing cell
    pub fn targets(&self, offset: usize, count: usize) -> Vec<Target> {
        window(self.refs.keys().cloned(), offset, count)
    }

    /// Number of targets with at least one referencing cell
    pub fn target_count(&self) -> usize {
        self.refs.len()
    }

    pub fn clear(&mut self) {
        self.refs.clear();
        self.back_refs.clear();
    }

    fn link(&mut self, target: &Target, cell: CellRef) -> bool {
        if !self.refs.entry(target.clone()).or_default().insert(cell) {
            return false;
        }
        self.back_refs.entry(cell).or_default().insert(target.clone());
        true
    }

    fn unlink(&mut self, target: &Target, cell: &CellRef) -> bool {
        let Some(cells) = self.refs.get_mut(target) else {
            return false;
        };
        if !cells.remove(cell) {
            return false;
        }
        if cells.is_empty() {
            self.refs.remove(target);
        }
        if let Some(targets) = self.back_refs.get_mut(cell) {
            targets.remove(target);
            if targets.is_empty() {
                self.back_refs.remove(cell);
            }
        }
        true
    }

    /// Check that both directions agree and no empty sets are stored.
    /// Panics if any invariant is violated.
    #[cfg(test)]
    pub fn assert_consistent(&self) {
        for (target, cells) in &self.refs {
            assert!(!cells.is_empty(), "empty cell set stored for {}", target);
            for cell in cells {
                assert!(
                    self.back_refs
                        .get(cell)
                        .is_some_and(|targets| targets.contains(target)),
                    "back_refs missing {} -> {}",
                    cell,
                    target
                );
            }
        }
        for (cell, targets) in &self.back_refs {
            assert!(!targets.is_empty(), "empty target set stored for {}", cell);
            for target in targets {
                assert!(
                    self.refs
                        .get(target)
                        .is_some_and(|cells| cells.contains(cell)),
                    "refs missing {} -> {}",
                    target,
                    cell
                );
            }
        }
    }
}

impl Store for ReferenceGraph {
    type Key = Target;
    type Value = Vec<CellRef>;

    /// The graph's unit of mutation is the edge, not a whole value;
    /// [`save_references`](Self::save_references) is the diffing bulk path
    fn save(&mut self, _key: Target, _value: Vec<CellRef>) -> Result<()> {
        Err(Error::Unsupported(
            "ReferenceGraph mutates per edge; use save_references",
        ))
    }

    fn load(&self, key: &Target) -> Result<Option<Vec<CellRef>>> {
        let key = key.normalized();
        Ok(self
            .refs
            .get(&key)
            .map(|cells| cells.iter().copied().collect()))
    }

    fn delete(&mut self, key: &Target) -> Result<bool> {
        Ok(ReferenceGraph::delete(self, key))
    }

    fn contains(&self, key: &Target) -> bool {
        self.refs.contains_key(&key.normalized())
    }

    fn len(&self) -> usize {
        self.refs.len()
    }

    fn keys(&self, offset: usize, count: usize) -> Vec<Target> {
        self.targets(offset, count)
    }

    fn values(&self, offset: usize, count: usize) -> Vec<Vec<CellRef>> {
        window(
            self.refs
                .values()
                .map(|cells| cells.iter().copied().collect()),
            offset,
            count,
        )
    }

    /// Edge-level hubs carry per-edge detail; a whole-set save watcher would
    /// only see a coarser view of the same mutations
    fn watch_save(
        &self,
        _watcher: Box<dyn Fn(&SaveEvent<Target, Vec<CellRef>>)>,
    ) -> Result<WatcherHandle<SaveEvent<Target, Vec<CellRef>>>> {
        Err(Error::Unsupported(
            "ReferenceGraph fires per-edge add/remove; watch those hubs instead",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn cell(s: &str) -> CellRef {
        CellRef::parse(s).unwrap()
    }

    fn cells(graph: &ReferenceGraph, target: &Target) -> Vec<CellRef> {
        graph.find_cells_with_reference(target, 0, usize::MAX)
    }

    #[test]
    fn test_add_and_remove_cell() {
        let mut graph = ReferenceGraph::new();
        let total = Target::label("total");

        assert!(graph.add_cell(&total, &cell("A1")));
        assert!(!graph.add_cell(&total, &cell("A1")));
        graph.assert_consistent();

        assert_eq!(cells(&graph, &total), vec![cell("A1")]);
        assert_eq!(
            graph.find_references_with_cell(&cell("A1"), 0, usize::MAX),
            vec![total.clone()]
        );

        assert!(graph.remove_cell(&total, &cell("A1")));
        assert!(!graph.remove_cell(&total, &cell("A1")));
        graph.assert_consistent();
        assert!(graph.is_empty());
    }

    #[test]
    fn test_target_name_case_insensitive() {
        let mut graph = ReferenceGraph::new();
        graph.add_cell(&Target::label("Total"), &cell("A1"));
        graph.add_cell(&Target::label("TOTAL"), &cell("B2"));
        graph.assert_consistent();

        assert_eq!(
            cells(&graph, &Target::label("total")),
            vec![cell("A1"), cell("B2")]
        );
        assert_eq!(graph.target_count(), 1);
    }

    #[test]
    fn test_cell_targets_normalized() {
        let mut graph = ReferenceGraph::new();
        let abs = Target::cell(CellRef::absolute(0, 0));
        let rel = Target::cell(cell("A1"));

        graph.add_cell(&abs, &CellRef::absolute(4, 4));
        assert!(graph.contains_edge(&rel, &cell("E5")));
        assert_eq!(cells(&graph, &rel), vec![cell("E5")]);
    }

    #[test]
    fn test_save_references_diffs() {
        let mut graph = ReferenceGraph::new();
        let total = Target::label("total");
        graph.save_references(&total, &[cell("A1"), cell("B2")]);
        graph.assert_consistent();

        let added: Rc<RefCell<Vec<EdgeEvent>>> = Rc::new(RefCell::new(Vec::new()));
        let removed: Rc<RefCell<Vec<EdgeEvent>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&added);
        let _a = graph.on_add().register(move |e| sink.borrow_mut().push(e.clone()));
        let sink = Rc::clone(&removed);
        let _r = graph.on_remove().register(move |e| sink.borrow_mut().push(e.clone()));

        // B2 stays, A1 leaves, C3 arrives
        graph.save_references(&total, &[cell("B2"), cell("C3")]);
        graph.assert_consistent();

        assert_eq!(cells(&graph, &total), vec![cell("B2"), cell("C3")]);
        assert_eq!(
            *removed.borrow(),
            vec![EdgeEvent {
                target: total.clone(),
                cell: cell("A1")
            }]
        );
        assert_eq!(
            *added.borrow(),
            vec![EdgeEvent {
                target: total.clone(),
                cell: cell("C3")
            }]
        );
    }

    #[test]
    fn test_save_references_unchanged_fires_nothing() {
        let mut graph = ReferenceGraph::new();
        let total = Target::label("total");
        graph.save_references(&total, &[cell("A1")]);

        let fired = Rc::new(RefCell::new(0usize));
        let sink = Rc::clone(&fired);
        let _a = graph.on_add().register(move |_| *sink.borrow_mut() += 1);
        let sink = Rc::clone(&fired);
        let _r = graph.on_remove().register(move |_| *sink.borrow_mut() += 1);

        // Same set, different order and absoluteness
        graph.save_references(&total, &[CellRef::absolute(0, 0)]);
        assert_eq!(*fired.borrow(), 0);
    }

    #[test]
    fn test_save_references_empty_removes_target() {
        let mut graph = ReferenceGraph::new();
        let total = Target::label("total");
        graph.save_references(&total, &[cell("A1")]);

        graph.save_references(&total, &[]);
        graph.assert_consistent();
        assert!(!graph.contains(&total));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_delete_fires_once() {
        let mut graph = ReferenceGraph::new();
        let total = Target::label("total");
        graph.save_references(&total, &[cell("A1"), cell("B2"), cell("C3")]);

        let deleted: Rc<RefCell<Vec<Target>>> = Rc::new(RefCell::new(Vec::new()));
        let removed = Rc::new(RefCell::new(0usize));
        let sink = Rc::clone(&deleted);
        let _d = graph.on_delete().register(move |t| sink.borrow_mut().push(t.clone()));
        let sink = Rc::clone(&removed);
        let _r = graph.on_remove().register(move |_| *sink.borrow_mut() += 1);

        assert!(graph.delete(&total));
        assert!(!graph.delete(&total));
        graph.assert_consistent();

        // One delete, zero per-edge removes
        assert_eq!(*deleted.borrow(), vec![total.clone()]);
        assert_eq!(*removed.borrow(), 0);
        assert!(graph.is_empty());
    }

    #[test]
    fn test_remove_references_with_cell() {
        let mut graph = ReferenceGraph::new();
        let total = Target::label("total");
        let tax = Target::label("tax");
        graph.add_cell(&total, &cell("A1"));
        graph.add_cell(&tax, &cell("A1"));
        graph.add_cell(&tax, &cell("B2"));

        let removed: Rc<RefCell<Vec<EdgeEvent>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&removed);
        let _r = graph.on_remove().register(move |e| sink.borrow_mut().push(e.clone()));

        graph.remove_references_with_cell(&cell("A1"));
        graph.assert_consistent();

        // total lost its only cell; tax keeps B2
        assert!(!graph.contains(&total));
        assert_eq!(cells(&graph, &tax), vec![cell("B2")]);
        assert_eq!(removed.borrow().len(), 2);

        // A cell with no references is a no-op
        graph.remove_references_with_cell(&cell("Z9"));
        assert_eq!(removed.borrow().len(), 2);
    }

    #[test]
    fn test_find_windows() {
        let mut graph = ReferenceGraph::new();
        let total = Target::label("total");
        graph.save_references(&total, &[cell("A1"), cell("B2"), cell("C3")]);

        assert_eq!(
            graph.find_cells_with_reference(&total, 1, 1),
            vec![cell("B2")]
        );
        assert!(graph.find_cells_with_reference(&total, 3, 10).is_empty());
        assert!(graph
            .find_cells_with_reference(&Target::label("missing"), 0, 10)
            .is_empty());
        assert_eq!(graph.count_cells_with_reference(&total), 3);
        assert_eq!(graph.count_cells_with_reference(&Target::label("missing")), 0);
    }

    #[test]
    fn test_targets_ordering() {
        let mut graph = ReferenceGraph::new();
        graph.add_cell(&Target::cell(cell("A1")), &cell("D4"));
        graph.add_cell(&Target::label("zeta"), &cell("D4"));
        graph.add_cell(&Target::label("alpha"), &cell("D4"));

        // Labels sort before cell targets
        assert_eq!(
            graph.targets(0, usize::MAX),
            vec![
                Target::label("alpha"),
                Target::label("zeta"),
                Target::cell(cell("A1")),
            ]
        );
    }

    #[test]
    fn test_store_contract() {
        let mut graph = ReferenceGraph::new();
        let total = Target::label("total");

        assert!(matches!(
            Store::save(&mut graph, total.clone(), vec![cell("A1")]),
            Err(Error::Unsupported(_))
        ));

        graph.save_references(&total, &[cell("A1")]);
        assert_eq!(Store::load(&graph, &total).unwrap(), Some(vec![cell("A1")]));
        assert_eq!(Store::load(&graph, &Target::label("missing")).unwrap(), None);
        assert!(Store::contains(&graph, &total));
        assert_eq!(Store::len(&graph), 1);
        assert_eq!(graph.keys(0, 10), vec![total.clone()]);
        assert_eq!(Store::values(&graph, 0, 10), vec![vec![cell("A1")]]);
        assert!(matches!(
            graph.watch_save(Box::new(|_| {})),
            Err(Error::Unsupported(_))
        ));
        assert!(Store::delete(&mut graph, &total).unwrap());
        assert!(Store::is_empty(&graph));
    }
}
