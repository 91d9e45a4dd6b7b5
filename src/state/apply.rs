//! Pure state transitions.

use super::changes::AppliedChanges;
use super::types::{Item, State};
use crate::changeset::{plan, Changeset, Slot};
use crate::error::{EngineError, Result};
use crate::render::{Configuration, Renderer};
use crate::types::IndexPath;
use std::sync::Arc;

/// Apply a changeset to `base`.
///
/// Removals and moves are resolved first, then insertions, then updates,
/// then section reloads. Every inserted, updated or reloaded item is
/// rendered; untouched items are shared with `base`.
pub fn apply_changeset<R: Renderer>(
    base: &State<R>,
    changeset: &Changeset<R::Model>,
) -> Result<(State<R>, AppliedChanges)> {
    if changeset.is_reload_all() {
        return rerender_all(base, base.configuration().clone());
    }

    let plan = plan(changeset, &base.shape())?;
    let configuration = base.configuration();

    let mut changes = AppliedChanges {
        updated: plan.updated.clone(),
        removed: plan.removed.clone(),
        removed_sections: changeset.removed_sections().clone(),
        moved: plan.moved.clone(),
        inserted_sections: changeset.inserted_sections().clone(),
        inserted: changeset.inserted_items().keys().copied().collect(),
    };

    let mut sections = Vec::with_capacity(plan.sections.len());
    for (section, slots) in plan.sections.iter().enumerate() {
        let reload = changeset.reloaded_sections().contains(&section);
        let mut items = Vec::with_capacity(slots.len());

        for (index, slot) in slots.iter().enumerate() {
            let path = IndexPath::new(section, index);
            let item = match *slot {
                Slot::Inserted(key) => {
                    let model = changeset.inserted_items().get(&key).ok_or_else(|| {
                        EngineError::Validation(format!("no model for inserted item {}", key))
                    })?;
                    let state = R::ItemState::default();
                    let output = configuration.render_item(path, model, &state)?;
                    Arc::new(Item::new(model.clone(), state, output))
                }
                Slot::Kept(from) | Slot::Moved { from } => {
                    let existing = base.checked_item(from)?;
                    let replacement = if plan.updated.contains(&from) {
                        changeset.updated_items().get(&from)
                    } else {
                        None
                    };
                    match replacement {
                        Some(model) => {
                            let output = configuration.render_item(path, model, existing.state())?;
                            Arc::new(Item::new(model.clone(), existing.state().clone(), output))
                        }
                        None if reload => {
                            changes.updated.insert(from);
                            rerender(configuration, path, existing)?
                        }
                        None => Arc::clone(existing),
                    }
                }
            };
            items.push(item);
        }
        sections.push(items);
    }

    Ok((base.successor(sections, configuration.clone()), changes))
}

/// Re-render every item of `base` against `configuration`.
///
/// Models, item states and section structure are preserved.
pub fn rerender_all<R: Renderer>(
    base: &State<R>,
    configuration: Configuration<R>,
) -> Result<(State<R>, AppliedChanges)> {
    let mut sections = Vec::with_capacity(base.section_count());
    for (section, items) in base.sections().iter().enumerate() {
        let rendered = items
            .iter()
            .enumerate()
            .map(|(index, item)| rerender(&configuration, IndexPath::new(section, index), item))
            .collect::<Result<Vec<_>>>()?;
        sections.push(rendered);
    }

    let changes = AppliedChanges::all_updated(&base.shape());
    Ok((base.successor(sections, configuration), changes))
}

/// Replace the internal state of the item at `path` and re-render it.
pub fn apply_item_state<R, F>(
    base: &State<R>,
    path: IndexPath,
    updater: F,
) -> Result<(State<R>, AppliedChanges)>
where
    R: Renderer,
    F: FnOnce(&R::ItemState) -> R::ItemState,
{
    let existing = base.checked_item(path)?;
    let state = updater(existing.state());
    let output = base
        .configuration()
        .render_item(path, existing.model(), &state)?;
    let item = Arc::new(Item::new(existing.model().clone(), state, output));

    let mut sections = base.sections().to_vec();
    sections[path.section][path.item] = item;

    let mut changes = AppliedChanges::default();
    changes.updated.insert(path);
    Ok((base.successor(sections, base.configuration().clone()), changes))
}

fn rerender<R: Renderer>(
    configuration: &Configuration<R>,
    path: IndexPath,
    item: &Item<R>,
) -> Result<Arc<Item<R>>> {
    let output = configuration.render_item(path, item.model(), item.state())?;
    Ok(Arc::new(Item::new(
        item.model().clone(),
        item.state().clone(),
        output,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{config, models, s, LabelRenderer};

    fn p(section: usize, item: usize) -> IndexPath {
        IndexPath::new(section, item)
    }

    fn seeded(items: &[&str]) -> State<LabelRenderer> {
        let empty = State::empty(config("w320"));
        let changeset = Changeset::builder()
            .with_inserted_sections([0])
            .with_inserted_items(items.iter().enumerate().map(|(i, m)| (p(0, i), s(m))))
            .build();
        apply_changeset(&empty, &changeset).unwrap().0
    }

    #[test]
    fn test_insert_at_end() {
        let base = seeded(&["A", "B"]);
        let changeset = Changeset::builder()
            .with_inserted_items([(p(0, 2), s("C"))])
            .build();
        let (next, changes) = apply_changeset(&base, &changeset).unwrap();

        assert_eq!(models(&next), vec![vec![s("A"), s("B"), s("C")]]);
        assert_eq!(changes.inserted.into_iter().collect::<Vec<_>>(), vec![p(0, 2)]);
        assert_eq!(next.generation(), base.generation().next());
        assert_eq!(next.item(p(0, 2)).unwrap().output(), "C:0@w320");
        // Untouched items are shared.
        assert!(Arc::ptr_eq(
            base.item(p(0, 0)).unwrap(),
            next.item(p(0, 0)).unwrap()
        ));
    }

    #[test]
    fn test_remove_resolved_before_insert() {
        let base = seeded(&["A", "B"]);
        let changeset = Changeset::builder()
            .with_removed_items([p(0, 0)])
            .with_inserted_items([(p(0, 0), s("D"))])
            .build();
        let (next, _) = apply_changeset(&base, &changeset).unwrap();
        assert_eq!(models(&next), vec![vec![s("D"), s("B")]]);
    }

    #[test]
    fn test_update_keeps_item_state() {
        let base = seeded(&["A", "B"]);
        let (base, _) = apply_item_state(&base, p(0, 1), |count| count + 5).unwrap();

        let changeset = Changeset::builder()
            .with_updated_items([(p(0, 1), s("B2"))])
            .build();
        let (next, changes) = apply_changeset(&base, &changeset).unwrap();

        let item = next.item(p(0, 1)).unwrap();
        assert_eq!(item.model(), "B2");
        assert_eq!(*item.state(), 5);
        assert_eq!(item.output(), "B2:5@w320");
        assert!(changes.updated.contains(&p(0, 1)));
    }

    #[test]
    fn test_moved_and_updated() {
        let base = seeded(&["A", "B", "C"]);
        let changeset = Changeset::builder()
            .with_moved_items([(p(0, 2), p(0, 0))])
            .with_updated_items([(p(0, 2), s("C2"))])
            .build();
        let (next, changes) = apply_changeset(&base, &changeset).unwrap();
        assert_eq!(models(&next), vec![vec![s("C2"), s("A"), s("B")]]);
        assert_eq!(changes.moved[&p(0, 2)], p(0, 0));
    }

    #[test]
    fn test_removed_item_update_is_noop() {
        let base = seeded(&["A", "B"]);
        let changeset = Changeset::builder()
            .with_removed_items([p(0, 1)])
            .with_updated_items([(p(0, 1), s("!never rendered"))])
            .build();
        let (next, changes) = apply_changeset(&base, &changeset).unwrap();
        assert_eq!(models(&next), vec![vec![s("A")]]);
        assert!(changes.updated.is_empty());
    }

    #[test]
    fn test_reloaded_section_rerenders() {
        let base = seeded(&["A", "B"]);
        let changeset: Changeset<String> = Changeset::builder().with_reloaded_sections([0]).build();
        let (next, changes) = apply_changeset(&base, &changeset).unwrap();
        assert_eq!(changes.updated.len(), 2);
        assert!(!Arc::ptr_eq(
            base.item(p(0, 0)).unwrap(),
            next.item(p(0, 0)).unwrap()
        ));
        assert!(next.content_eq(&base));
    }

    #[test]
    fn test_reload_all_ignores_other_fields() {
        let base = seeded(&["A", "B"]);
        let changeset = Changeset::builder()
            .with_inserted_items([(p(0, 99), s("ignored"))])
            .reload_all()
            .build();
        let (next, changes) = apply_changeset(&base, &changeset).unwrap();
        assert_eq!(models(&next), models(&base));
        assert_eq!(changes, AppliedChanges::all_updated(&[2]));
    }

    #[test]
    fn test_out_of_bounds_is_error() {
        let base = seeded(&["A", "B"]);
        let changeset = Changeset::builder()
            .with_inserted_items([(p(0, 3), s("X"))])
            .build();
        let result = apply_changeset(&base, &changeset);
        assert!(matches!(result, Err(EngineError::ItemOutOfBounds { .. })));
    }

    #[test]
    fn test_render_failure_is_reported() {
        let base = seeded(&["A"]);
        let changeset = Changeset::builder()
            .with_inserted_items([(p(0, 1), s("!bad"))])
            .build();
        match apply_changeset(&base, &changeset) {
            Err(EngineError::Render { path, message }) => {
                assert_eq!(path, p(0, 1));
                assert!(message.contains("!bad"));
            }
            other => panic!("expected render error, got {:?}", other),
        }
    }

    #[test]
    fn test_rerender_all_with_new_configuration() {
        let base = seeded(&["A", "B"]);
        let configuration = base.configuration().with_context(s("w640"));
        let (next, changes) = rerender_all(&base, configuration).unwrap();
        assert_eq!(
            next.outputs(),
            vec![vec![s("A:0@w640"), s("B:0@w640")]]
        );
        assert_eq!(next.configuration().context(), "w640");
        assert_eq!(changes.updated.len(), 2);
    }

    #[test]
    fn test_item_state_out_of_bounds() {
        let base = seeded(&["A"]);
        let result = apply_item_state(&base, p(0, 4), |count| count + 1);
        assert!(matches!(result, Err(EngineError::ItemOutOfBounds { .. })));
    }
}
