//! Changeset value and its builder.

use crate::types::IndexPath;
use std::collections::{BTreeMap, BTreeSet};

/// An immutable batch of edits.
#[derive(Clone, Debug, PartialEq)]
pub struct Changeset<M> {
    pub(crate) updated_items: BTreeMap<IndexPath, M>,
    pub(crate) removed_items: BTreeSet<IndexPath>,
    pub(crate) removed_sections: BTreeSet<usize>,
    pub(crate) moved_items: BTreeMap<IndexPath, IndexPath>,
    pub(crate) inserted_sections: BTreeSet<usize>,
    pub(crate) inserted_items: BTreeMap<IndexPath, M>,
    pub(crate) reloaded_sections: BTreeSet<usize>,
    pub(crate) reload_all: bool,
}

impl<M> Default for Changeset<M> {
    fn default() -> Self {
        Self {
            updated_items: BTreeMap::new(),
            removed_items: BTreeSet::new(),
            removed_sections: BTreeSet::new(),
            moved_items: BTreeMap::new(),
            inserted_sections: BTreeSet::new(),
            inserted_items: BTreeMap::new(),
            reloaded_sections: BTreeSet::new(),
            reload_all: false,
        }
    }
}

impl<M> Changeset<M> {
    pub fn builder() -> ChangesetBuilder<M> {
        ChangesetBuilder::new()
    }

    /// Base-State paths whose model is replaced.
    pub fn updated_items(&self) -> &BTreeMap<IndexPath, M> {
        &self.updated_items
    }

    /// Base-State paths removed.
    pub fn removed_items(&self) -> &BTreeSet<IndexPath> {
        &self.removed_items
    }

    /// Base-State sections removed.
    pub fn removed_sections(&self) -> &BTreeSet<usize> {
        &self.removed_sections
    }

    /// Base-State path to resulting-State path.
    pub fn moved_items(&self) -> &BTreeMap<IndexPath, IndexPath> {
        &self.moved_items
    }

    /// Resulting-State sections inserted empty.
    pub fn inserted_sections(&self) -> &BTreeSet<usize> {
        &self.inserted_sections
    }

    /// Resulting-State paths inserted.
    pub fn inserted_items(&self) -> &BTreeMap<IndexPath, M> {
        &self.inserted_items
    }

    /// Resulting-State sections whose items are all re-rendered.
    pub fn reloaded_sections(&self) -> &BTreeSet<usize> {
        &self.reloaded_sections
    }

    /// When set, every other field is ignored and every item is re-rendered.
    pub fn is_reload_all(&self) -> bool {
        self.reload_all
    }

    pub fn is_empty(&self) -> bool {
        !self.reload_all
            && self.updated_items.is_empty()
            && self.removed_items.is_empty()
            && self.removed_sections.is_empty()
            && self.moved_items.is_empty()
            && self.inserted_sections.is_empty()
            && self.inserted_items.is_empty()
            && self.reloaded_sections.is_empty()
    }

    /// Whether the changeset touches section structure.
    pub fn has_section_changes(&self) -> bool {
        !self.removed_sections.is_empty() || !self.inserted_sections.is_empty()
    }

    /// Number of items that will need rendering (inserts plus updates).
    pub fn render_count(&self) -> usize {
        self.inserted_items.len() + self.updated_items.len()
    }
}

/// Builder for [`Changeset`].
#[derive(Debug)]
pub struct ChangesetBuilder<M> {
    changeset: Changeset<M>,
}

impl<M> Default for ChangesetBuilder<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> ChangesetBuilder<M> {
    pub fn new() -> Self {
        Self {
            changeset: Changeset::default(),
        }
    }

    pub fn with_updated_items(mut self, items: impl IntoIterator<Item = (IndexPath, M)>) -> Self {
        self.changeset.updated_items.extend(items);
        self
    }

    pub fn with_removed_items(mut self, paths: impl IntoIterator<Item = IndexPath>) -> Self {
        self.changeset.removed_items.extend(paths);
        self
    }

    pub fn with_removed_sections(mut self, sections: impl IntoIterator<Item = usize>) -> Self {
        self.changeset.removed_sections.extend(sections);
        self
    }

    pub fn with_moved_items(
        mut self,
        moves: impl IntoIterator<Item = (IndexPath, IndexPath)>,
    ) -> Self {
        self.changeset.moved_items.extend(moves);
        self
    }

    pub fn with_inserted_sections(mut self, sections: impl IntoIterator<Item = usize>) -> Self {
        self.changeset.inserted_sections.extend(sections);
        self
    }

    pub fn with_inserted_items(mut self, items: impl IntoIterator<Item = (IndexPath, M)>) -> Self {
        self.changeset.inserted_items.extend(items);
        self
    }

    pub fn with_reloaded_sections(mut self, sections: impl IntoIterator<Item = usize>) -> Self {
        self.changeset.reloaded_sections.extend(sections);
        self
    }

    pub fn reload_all(mut self) -> Self {
        self.changeset.reload_all = true;
        self
    }

    pub fn build(self) -> Changeset<M> {
        self.changeset
    }
}
