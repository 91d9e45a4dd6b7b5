//! Default splitter: visible content first.

use super::SplitStrategy;
use crate::changeset::{plan, Changeset, Slot};
use crate::config::SplitConfig;
use crate::render::Renderer;
use crate::state::State;
use crate::types::{IndexPath, Viewport};
use std::collections::BTreeSet;

/// One insert or update the splitter may defer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Unit {
    Insert(IndexPath),
    Update { base: IndexPath, target: IndexPath },
}

/// Splits a changeset so that inserts and updates intersecting the viewport
/// land in the first sub-batch.
///
/// The first sub-batch also carries every removal, move and section reload.
/// The remaining inserts and updates follow in chunks of at most
/// `batch_size`: first those after the viewport in layout order, then those
/// before it, nearest first. Indices of each sub-batch are translated into
/// the coordinates of the intermediate State it will be applied to.
#[derive(Clone, Debug, Default)]
pub struct ViewportSplitter {
    config: SplitConfig,
}

impl ViewportSplitter {
    pub fn new(config: SplitConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    fn is_splittable<M>(changeset: &Changeset<M>) -> bool {
        !changeset.is_reload_all()
            && !changeset.has_section_changes()
            && changeset.render_count() > 1
            && changeset
                .moved_items()
                .iter()
                .all(|(from, to)| from.section == to.section)
    }
}

/// Position of `target` once every path in `absent` is left out.
fn translate(target: IndexPath, absent: &BTreeSet<IndexPath>) -> IndexPath {
    let skipped = absent
        .range(IndexPath::new(target.section, 0)..target)
        .count();
    IndexPath::new(target.section, target.item - skipped)
}

impl<R: Renderer> SplitStrategy<R> for ViewportSplitter {
    fn split(
        &self,
        base: &State<R>,
        changeset: Changeset<R::Model>,
        viewport: &Viewport,
    ) -> Vec<Changeset<R::Model>> {
        if !Self::is_splittable(&changeset) {
            return vec![changeset];
        }
        // Invalid changesets are reported when applied, not here.
        let plan = match plan(&changeset, &base.shape()) {
            Ok(plan) => plan,
            Err(_) => return vec![changeset],
        };

        let renderer = base.configuration().renderer();
        let estimate = self.config.estimated_item_extent;
        let (start, end) = viewport.span(self.config.axis);

        let mut visible = Vec::new();
        let mut after = Vec::new();
        let mut before = Vec::new();
        let mut cursor = 0.0;

        for (section, slots) in plan.sections.iter().enumerate() {
            for (index, slot) in slots.iter().enumerate() {
                let target = IndexPath::new(section, index);
                let (unit, extent) = match *slot {
                    Slot::Inserted(_) => (Some(Unit::Insert(target)), estimate),
                    Slot::Kept(from) if plan.updated.contains(&from) => {
                        (Some(Unit::Update { base: from, target }), estimate)
                    }
                    // Moved items travel with the first batch.
                    Slot::Moved { from } if plan.updated.contains(&from) => (None, estimate),
                    Slot::Kept(from) | Slot::Moved { from } => {
                        let known = base.item(from).and_then(|item| renderer.extent(item.output()));
                        (None, known.unwrap_or(estimate))
                    }
                };

                if let Some(unit) = unit {
                    if cursor < end && cursor + extent > start {
                        visible.push(unit);
                    } else if cursor >= end {
                        after.push(unit);
                    } else {
                        before.push(unit);
                    }
                }
                cursor += extent;
            }
        }

        if after.is_empty() && before.is_empty() {
            return vec![changeset];
        }
        before.reverse();

        let batch_size = self.config.batch_size.max(1);
        let mut groups: Vec<Vec<Unit>> = vec![visible];
        groups.extend(after.chunks(batch_size).map(<[Unit]>::to_vec));
        groups.extend(before.chunks(batch_size).map(<[Unit]>::to_vec));

        // Inserts not yet applied by an earlier sub-batch.
        let mut pending: BTreeSet<IndexPath> = changeset.inserted_items.keys().copied().collect();
        let mut batches = Vec::with_capacity(groups.len());

        for (position, group) in groups.into_iter().enumerate() {
            let group_inserts: BTreeSet<IndexPath> = group
                .iter()
                .filter_map(|unit| match unit {
                    Unit::Insert(target) => Some(*target),
                    Unit::Update { .. } => None,
                })
                .collect();
            let remaining: BTreeSet<IndexPath> =
                pending.difference(&group_inserts).copied().collect();

            let mut batch = Changeset::default();
            if position == 0 {
                batch.removed_items = changeset.removed_items.clone();
                batch.reloaded_sections = changeset.reloaded_sections.clone();
                for (from, to) in &plan.moved {
                    batch.moved_items.insert(*from, translate(*to, &remaining));
                    if let Some(model) = changeset.updated_items.get(from) {
                        if plan.updated.contains(from) {
                            batch.updated_items.insert(*from, model.clone());
                        }
                    }
                }
            }

            for unit in &group {
                match *unit {
                    Unit::Insert(target) => {
                        if let Some(model) = changeset.inserted_items.get(&target) {
                            batch
                                .inserted_items
                                .insert(translate(target, &remaining), model.clone());
                        }
                    }
                    Unit::Update { base: from, target } => {
                        let path = if position == 0 {
                            from
                        } else {
                            translate(target, &pending)
                        };
                        if let Some(model) = changeset.updated_items.get(&from) {
                            batch.updated_items.insert(path, model.clone());
                        }
                    }
                }
            }

            pending = remaining;
            if !batch.is_empty() {
                batches.push(batch);
            }
        }

        batches
    }
}
