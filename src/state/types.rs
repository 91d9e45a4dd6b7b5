//! State and item snapshots.

use crate::error::{EngineError, Result};
use crate::render::{Configuration, Renderer};
use crate::types::{Generation, IndexPath};
use std::fmt;
use std::sync::Arc;

/// One rendered item.
pub struct Item<R: Renderer> {
    model: R::Model,
    state: R::ItemState,
    output: R::Output,
}

impl<R: Renderer> Item<R> {
    pub fn new(model: R::Model, state: R::ItemState, output: R::Output) -> Self {
        Self {
            model,
            state,
            output,
        }
    }

    pub fn model(&self) -> &R::Model {
        &self.model
    }

    /// The item's own internal state.
    pub fn state(&self) -> &R::ItemState {
        &self.state
    }

    pub fn output(&self) -> &R::Output {
        &self.output
    }
}

impl<R: Renderer> Clone for Item<R> {
    fn clone(&self) -> Self {
        Self {
            model: self.model.clone(),
            state: self.state.clone(),
            output: self.output.clone(),
        }
    }
}

impl<R: Renderer> PartialEq for Item<R> {
    fn eq(&self, other: &Self) -> bool {
        self.model == other.model && self.state == other.state && self.output == other.output
    }
}

impl<R: Renderer> fmt::Debug for Item<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("model", &self.model)
            .field("state", &self.state)
            .field("output", &self.output)
            .finish()
    }
}

/// Immutable snapshot of sections of rendered items.
pub struct State<R: Renderer> {
    sections: Vec<Vec<Arc<Item<R>>>>,
    configuration: Configuration<R>,
    generation: Generation,
}

impl<R: Renderer> State<R> {
    /// The initial state: no sections, generation zero.
    pub fn empty(configuration: Configuration<R>) -> Self {
        Self {
            sections: Vec::new(),
            configuration,
            generation: Generation::default(),
        }
    }

    /// Build the state that follows `self`, one generation later.
    pub fn successor(
        &self,
        sections: Vec<Vec<Arc<Item<R>>>>,
        configuration: Configuration<R>,
    ) -> Self {
        Self {
            sections,
            configuration,
            generation: self.generation.next(),
        }
    }

    pub fn sections(&self) -> &[Vec<Arc<Item<R>>>] {
        &self.sections
    }

    pub fn section(&self, index: usize) -> Option<&[Arc<Item<R>>]> {
        self.sections.get(index).map(Vec::as_slice)
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// Total number of items across all sections.
    pub fn item_count(&self) -> usize {
        self.sections.iter().map(Vec::len).sum()
    }

    /// Item count per section.
    pub fn shape(&self) -> Vec<usize> {
        self.sections.iter().map(Vec::len).collect()
    }

    pub fn item(&self, path: IndexPath) -> Option<&Arc<Item<R>>> {
        self.sections.get(path.section)?.get(path.item)
    }

    /// Like [`State::item`] but reports which bound was violated.
    pub(crate) fn checked_item(&self, path: IndexPath) -> Result<&Arc<Item<R>>> {
        let items = self
            .sections
            .get(path.section)
            .ok_or(EngineError::SectionOutOfBounds {
                section: path.section,
                count: self.sections.len(),
            })?;
        items.get(path.item).ok_or(EngineError::ItemOutOfBounds {
            path,
            len: items.len(),
        })
    }

    pub fn configuration(&self) -> &Configuration<R> {
        &self.configuration
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Models per section, in order.
    pub fn models(&self) -> Vec<Vec<R::Model>> {
        self.sections
            .iter()
            .map(|items| items.iter().map(|item| item.model().clone()).collect())
            .collect()
    }

    /// Outputs per section, in order.
    pub fn outputs(&self) -> Vec<Vec<R::Output>> {
        self.sections
            .iter()
            .map(|items| items.iter().map(|item| item.output().clone()).collect())
            .collect()
    }

    /// Equality ignoring the generation counter.
    pub fn content_eq(&self, other: &Self) -> bool {
        self.configuration == other.configuration && self.sections == other.sections
    }
}

impl<R: Renderer> Clone for State<R> {
    fn clone(&self) -> Self {
        Self {
            sections: self.sections.clone(),
            configuration: self.configuration.clone(),
            generation: self.generation,
        }
    }
}

impl<R: Renderer> PartialEq for State<R> {
    fn eq(&self, other: &Self) -> bool {
        self.generation == other.generation && self.content_eq(other)
    }
}

impl<R: Renderer> fmt::Debug for State<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("generation", &self.generation)
            .field("configuration", &self.configuration)
            .field("sections", &self.sections)
            .finish()
    }
}
