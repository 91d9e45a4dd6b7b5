//! Resolution of a changeset against the shape of a base State.

use super::types::Changeset;
use crate::error::{EngineError, Result};
use crate::types::IndexPath;
use std::collections::{BTreeMap, BTreeSet};

/// Where an item of the resulting State comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    /// Base item kept in place (its index may still shift).
    Kept(IndexPath),
    /// Base item moved by the changeset.
    Moved { from: IndexPath },
    /// New item; the path is its key in `inserted_items`.
    Inserted(IndexPath),
}

/// The resolved changeset: final slot arrangement plus the operations that
/// survived tie-breaking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Plan {
    pub sections: Vec<Vec<Slot>>,
    /// Base paths whose model is replaced.
    pub updated: BTreeSet<IndexPath>,
    /// Base paths removed individually (not via a removed section).
    pub removed: BTreeSet<IndexPath>,
    /// Moves that survived tie-breaking.
    pub moved: BTreeMap<IndexPath, IndexPath>,
}

fn check_base_path(path: IndexPath, shape: &[usize]) -> Result<()> {
    let len = *shape
        .get(path.section)
        .ok_or(EngineError::SectionOutOfBounds {
            section: path.section,
            count: shape.len(),
        })?;
    if path.item >= len {
        return Err(EngineError::ItemOutOfBounds { path, len });
    }
    Ok(())
}

/// Resolve `changeset` against a base State whose section lengths are `shape`.
///
/// Removal wins over updates and moves of the same item. Two placements
/// targeting the same resulting path are a conflict. `reload_all` is not
/// handled here; callers short-circuit it.
pub fn plan<M>(changeset: &Changeset<M>, shape: &[usize]) -> Result<Plan> {
    for &section in &changeset.removed_sections {
        if section >= shape.len() {
            return Err(EngineError::SectionOutOfBounds {
                section,
                count: shape.len(),
            });
        }
    }
    for path in changeset
        .removed_items
        .iter()
        .chain(changeset.updated_items.keys())
        .chain(changeset.moved_items.keys())
    {
        check_base_path(*path, shape)?;
    }

    let is_removed = |path: &IndexPath| {
        changeset.removed_sections.contains(&path.section) || changeset.removed_items.contains(path)
    };

    let removed: BTreeSet<IndexPath> = changeset
        .removed_items
        .iter()
        .filter(|path| !changeset.removed_sections.contains(&path.section))
        .copied()
        .collect();

    let updated: BTreeSet<IndexPath> = changeset
        .updated_items
        .keys()
        .filter(|path| !is_removed(path))
        .copied()
        .collect();

    let moved: BTreeMap<IndexPath, IndexPath> = changeset
        .moved_items
        .iter()
        .filter(|(from, _)| !is_removed(from))
        .map(|(from, to)| (*from, *to))
        .collect();

    let mut placements: BTreeMap<IndexPath, Slot> = changeset
        .inserted_items
        .keys()
        .map(|path| (*path, Slot::Inserted(*path)))
        .collect();
    for (from, to) in &moved {
        if placements.insert(*to, Slot::Moved { from: *from }).is_some() {
            return Err(EngineError::Conflict(format!(
                "{} is the destination of more than one insert or move",
                to
            )));
        }
    }

    let mut sections: Vec<Vec<Slot>> = Vec::with_capacity(shape.len());
    for (section, &len) in shape.iter().enumerate() {
        if changeset.removed_sections.contains(&section) {
            continue;
        }
        let slots = (0..len)
            .map(|item| IndexPath::new(section, item))
            .filter(|path| !changeset.removed_items.contains(path) && !moved.contains_key(path))
            .map(Slot::Kept)
            .collect();
        sections.push(slots);
    }

    for &section in &changeset.inserted_sections {
        if section > sections.len() {
            return Err(EngineError::SectionOutOfBounds {
                section,
                count: sections.len(),
            });
        }
        sections.insert(section, Vec::new());
    }

    // Ascending placement leaves every slot at its final index.
    for (path, slot) in placements {
        let count = sections.len();
        let items = sections
            .get_mut(path.section)
            .ok_or(EngineError::SectionOutOfBounds {
                section: path.section,
                count,
            })?;
        if path.item > items.len() {
            return Err(EngineError::ItemOutOfBounds {
                path,
                len: items.len(),
            });
        }
        items.insert(path.item, slot);
    }

    for &section in &changeset.reloaded_sections {
        if section >= sections.len() {
            return Err(EngineError::SectionOutOfBounds {
                section,
                count: sections.len(),
            });
        }
    }

    Ok(Plan {
        sections,
        updated,
        removed,
        moved,
    })
}
