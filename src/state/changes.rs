//! Structured description of what a transition changed.

use crate::types::IndexPath;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Per-transition diff, enough to drive an incremental view update.
///
/// `updated`, `removed` and the keys of `moved` address the previous State;
/// `inserted`, `inserted_sections` and the values of `moved` address the new
/// one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedChanges {
    pub updated: BTreeSet<IndexPath>,
    pub removed: BTreeSet<IndexPath>,
    pub removed_sections: BTreeSet<usize>,
    #[serde(with = "move_pairs")]
    pub moved: BTreeMap<IndexPath, IndexPath>,
    pub inserted_sections: BTreeSet<usize>,
    pub inserted: BTreeSet<IndexPath>,
}

impl AppliedChanges {
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty()
            && self.removed.is_empty()
            && self.removed_sections.is_empty()
            && self.moved.is_empty()
            && self.inserted_sections.is_empty()
            && self.inserted.is_empty()
    }

    /// Changes reporting every path of `shape` as updated.
    pub fn all_updated(shape: &[usize]) -> Self {
        let updated = shape
            .iter()
            .enumerate()
            .flat_map(|(section, &len)| (0..len).map(move |item| IndexPath::new(section, item)))
            .collect();
        Self {
            updated,
            ..Default::default()
        }
    }
}

/// JSON object keys must be strings, so moves travel as `[from, to]` pairs.
mod move_pairs {
    use crate::types::IndexPath;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S>(moves: &BTreeMap<IndexPath, IndexPath>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let pairs: Vec<(IndexPath, IndexPath)> = moves.iter().map(|(k, v)| (*k, *v)).collect();
        pairs.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<IndexPath, IndexPath>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let pairs = Vec::<(IndexPath, IndexPath)>::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}
