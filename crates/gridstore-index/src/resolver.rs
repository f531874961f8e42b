//! Recursive label resolution
//!
//! Labels may point at other labels; these walks follow the chain until a
//! concrete cell or range appears, using a visited set of canonical
//! selections so a cyclic registry can never loop.

use ahash::AHashSet;
use gridstore_core::{Error, Result, Selection};

use crate::label_registry::LabelRegistry;

/// Follow `name` until a concrete selection appears.
///
/// Returns `None` when the label (or any link in its chain) is missing, and
/// also when the chain revisits a label, which can only happen on a registry
/// mutated around the save-time cycle check.
pub fn resolve(registry: &LabelRegistry, name: &str) -> Option<Selection> {
    let mut visited = AHashSet::new();
    let mut current = name.to_lowercase();
    loop {
        if !visited.insert(Selection::label(current.clone())) {
            return None;
        }
        let mapping = registry.load(&current)?;
        match &mapping.selection {
            Selection::Label(next) => current = next.to_lowercase(),
            concrete => return Some(concrete.clone()),
        }
    }
}

/// [`resolve`], but a missing link or runtime cycle is an error naming the
/// label it stopped at
pub fn resolve_or_fail(registry: &LabelRegistry, name: &str) -> Result<Selection> {
    let mut chain = Vec::new();
    let mut visited = AHashSet::new();
    let mut current = name.to_lowercase();
    loop {
        chain.push(current.clone());
        if !visited.insert(Selection::label(current.clone())) {
            return Err(Error::cycle(chain));
        }
        let Some(mapping) = registry.load(&current) else {
            return Err(Error::LabelNotFound(current));
        };
        match &mapping.selection {
            Selection::Label(next) => current = next.to_lowercase(),
            concrete => return Ok(concrete.clone()),
        }
    }
}

/// Every concrete selection reachable from `name`, deduplicated by canonical
/// form and in selection order.
///
/// Unlike [`resolve`] this keeps walking past the first concrete answer, so
/// a label chain where each link exists yields exactly one entry, and a
/// missing or cyclic link contributes nothing rather than failing.
pub fn concrete_selections(registry: &LabelRegistry, name: &str) -> Vec<Selection> {
    let mut out = std::collections::BTreeSet::new();
    let mut visited = AHashSet::new();
    let mut stack = vec![name.to_lowercase()];

    while let Some(current) = stack.pop() {
        if !visited.insert(Selection::label(current.clone())) {
            continue;
        }
        let Some(mapping) = registry.load(&current) else {
            continue;
        };
        match &mapping.selection {
            Selection::Label(next) => stack.push(next.to_lowercase()),
            concrete => {
                out.insert(concrete.canonical());
            }
        }
    }

    out.into_iter().collect()
}

/// Test whether mapping `name` to `target` would close a label cycle,
/// without mutating the registry.
///
/// Walks the chain starting from `target` through the registry as it stands;
/// if the walk ever reaches `name` again (or any label twice), returns the
/// chain of label names that forms the loop. `None` means the save is safe.
pub fn would_cycle(
    registry: &LabelRegistry,
    name: &str,
    target: &Selection,
) -> Option<Vec<String>> {
    let name = name.to_lowercase();
    let mut visited = AHashSet::new();
    visited.insert(Selection::label(name.clone()));
    let mut chain = vec![name];

    let mut current = match target {
        Selection::Label(next) => next.to_lowercase(),
        _ => return None,
    };
    loop {
        chain.push(current.clone());
        if !visited.insert(Selection::label(current.clone())) {
            return Some(chain);
        }
        let mapping = registry.load(&current)?;
        match &mapping.selection {
            Selection::Label(next) => current = next.to_lowercase(),
            _ => return None,
        }
    }
}
