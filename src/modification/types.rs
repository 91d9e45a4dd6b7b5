//! The modification sum type and its dispatch.

use crate::changeset::Changeset;
use crate::error::Result;
use crate::render::{Configuration, Renderer};
use crate::state::{apply_changeset, apply_item_state, rerender_all, AppliedChanges, State};
use crate::types::{IndexPath, Qos, UserInfo};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Replaces the internal state of one rendered item.
pub type ItemStateUpdater<R> =
    Box<dyn FnOnce(&<R as Renderer>::ItemState) -> <R as Renderer>::ItemState + Send>;

/// Caller-defined transition, carried by [`Modification::Custom`].
pub trait StateModifier<R: Renderer>: Send {
    /// Short name used in logs and notifications.
    fn name(&self) -> &str;

    /// Compute the next State. Implementations build it with
    /// [`State::successor`] or one of the transition functions.
    fn apply(self: Box<Self>, base: &State<R>) -> Result<(State<R>, AppliedChanges)>;
}

/// Discriminant of a [`Modification`], reported to listeners.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "name", rename_all = "snake_case")]
pub enum ModificationKind {
    ApplyChangeset,
    UpdateConfiguration,
    Reload,
    ApplyStateUpdate,
    Custom(String),
}

impl fmt::Display for ModificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModificationKind::ApplyChangeset => write!(f, "apply_changeset"),
            ModificationKind::UpdateConfiguration => write!(f, "update_configuration"),
            ModificationKind::Reload => write!(f, "reload"),
            ModificationKind::ApplyStateUpdate => write!(f, "apply_state_update"),
            ModificationKind::Custom(name) => write!(f, "custom({})", name),
        }
    }
}

/// A unit of work consuming one State and producing the next.
pub enum Modification<R: Renderer> {
    ApplyChangeset {
        changeset: Changeset<R::Model>,
        qos: Qos,
        user_info: UserInfo,
    },
    UpdateConfiguration {
        configuration: Configuration<R>,
        user_info: UserInfo,
    },
    Reload {
        user_info: UserInfo,
    },
    ApplyStateUpdate {
        path: IndexPath,
        updater: ItemStateUpdater<R>,
        user_info: UserInfo,
    },
    Custom {
        modifier: Box<dyn StateModifier<R>>,
        user_info: UserInfo,
    },
}

impl<R: Renderer> Modification<R> {
    pub fn apply_changeset(changeset: Changeset<R::Model>, qos: Qos, user_info: UserInfo) -> Self {
        Modification::ApplyChangeset {
            changeset,
            qos,
            user_info,
        }
    }

    pub fn state_update<F>(path: IndexPath, updater: F, user_info: UserInfo) -> Self
    where
        F: FnOnce(&R::ItemState) -> R::ItemState + Send + 'static,
    {
        Modification::ApplyStateUpdate {
            path,
            updater: Box::new(updater),
            user_info,
        }
    }

    pub fn kind(&self) -> ModificationKind {
        match self {
            Modification::ApplyChangeset { .. } => ModificationKind::ApplyChangeset,
            Modification::UpdateConfiguration { .. } => ModificationKind::UpdateConfiguration,
            Modification::Reload { .. } => ModificationKind::Reload,
            Modification::ApplyStateUpdate { .. } => ModificationKind::ApplyStateUpdate,
            Modification::Custom { modifier, .. } => {
                ModificationKind::Custom(modifier.name().to_string())
            }
        }
    }

    pub fn user_info(&self) -> &UserInfo {
        match self {
            Modification::ApplyChangeset { user_info, .. }
            | Modification::UpdateConfiguration { user_info, .. }
            | Modification::Reload { user_info }
            | Modification::ApplyStateUpdate { user_info, .. }
            | Modification::Custom { user_info, .. } => user_info,
        }
    }

    /// Priority requested for background computation.
    pub fn qos(&self) -> Qos {
        match self {
            Modification::ApplyChangeset { qos, .. } => *qos,
            _ => Qos::Default,
        }
    }

    /// Compute the State that follows `base`. Never touches `base`.
    pub fn apply(self, base: &State<R>) -> Result<(State<R>, AppliedChanges)> {
        match self {
            Modification::ApplyChangeset { changeset, .. } => apply_changeset(base, &changeset),
            Modification::UpdateConfiguration { configuration, .. } => {
                rerender_all(base, configuration)
            }
            Modification::Reload { .. } => rerender_all(base, base.configuration().clone()),
            Modification::ApplyStateUpdate { path, updater, .. } => {
                apply_item_state(base, path, updater)
            }
            Modification::Custom { modifier, .. } => modifier.apply(base),
        }
    }
}

impl<R: Renderer> fmt::Debug for Modification<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modification::ApplyChangeset { changeset, qos, .. } => f
                .debug_struct("ApplyChangeset")
                .field("changeset", changeset)
                .field("qos", qos)
                .finish(),
            Modification::UpdateConfiguration { configuration, .. } => f
                .debug_struct("UpdateConfiguration")
                .field("configuration", configuration)
                .finish(),
            Modification::Reload { .. } => f.write_str("Reload"),
            Modification::ApplyStateUpdate { path, .. } => f
                .debug_struct("ApplyStateUpdate")
                .field("path", path)
                .finish_non_exhaustive(),
            Modification::Custom { modifier, .. } => f
                .debug_struct("Custom")
                .field("name", &modifier.name())
                .finish_non_exhaustive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{config, s, LabelRenderer};
    use std::sync::Arc;

    struct Reverse;

    impl StateModifier<LabelRenderer> for Reverse {
        fn name(&self) -> &str {
            "reverse"
        }

        fn apply(
            self: Box<Self>,
            base: &State<LabelRenderer>,
        ) -> Result<(State<LabelRenderer>, AppliedChanges)> {
            let sections: Vec<Vec<_>> = base
                .sections()
                .iter()
                .map(|items| items.iter().rev().map(Arc::clone).collect())
                .collect();
            Ok((
                base.successor(sections, base.configuration().clone()),
                AppliedChanges::default(),
            ))
        }
    }

    fn seeded() -> State<LabelRenderer> {
        let changeset = Changeset::builder()
            .with_inserted_sections([0])
            .with_inserted_items([(IndexPath::new(0, 0), s("A")), (IndexPath::new(0, 1), s("B"))])
            .build();
        Modification::apply_changeset(changeset, Qos::Default, UserInfo::new())
            .apply(&State::empty(config("w")))
            .unwrap()
            .0
    }

    #[test]
    fn test_kind_and_qos() {
        let modification: Modification<LabelRenderer> =
            Modification::apply_changeset(Changeset::default(), Qos::UserInteractive, UserInfo::new());
        assert_eq!(modification.kind(), ModificationKind::ApplyChangeset);
        assert_eq!(modification.qos(), Qos::UserInteractive);

        let reload: Modification<LabelRenderer> = Modification::Reload {
            user_info: UserInfo::new(),
        };
        assert_eq!(reload.qos(), Qos::Default);
        assert_eq!(reload.kind().to_string(), "reload");
    }

    #[test]
    fn test_state_update_dispatch() {
        let base = seeded();
        let modification =
            Modification::state_update(IndexPath::new(0, 1), |count: &u32| count + 1, UserInfo::new());
        let (next, changes) = modification.apply(&base).unwrap();
        assert_eq!(*next.item(IndexPath::new(0, 1)).unwrap().state(), 1);
        assert_eq!(changes.updated.len(), 1);
        assert_eq!(next.models(), base.models());
    }

    #[test]
    fn test_custom_dispatch() {
        let base = seeded();
        let modification = Modification::Custom {
            modifier: Box::new(Reverse),
            user_info: UserInfo::new(),
        };
        assert_eq!(modification.kind(), ModificationKind::Custom("reverse".to_string()));
        let (next, _) = modification.apply(&base).unwrap();
        assert_eq!(next.models(), vec![vec![s("B"), s("A")]]);
    }

    #[test]
    fn test_kind_serializes() {
        let json = serde_json::to_value(ModificationKind::Custom("x".to_string())).unwrap();
        assert_eq!(json, serde_json::json!({"type": "custom", "name": "x"}));
    }
}
