//! Strategy hook for turning changesets into modifications.

use super::types::Modification;
use crate::changeset::Changeset;
use crate::render::Renderer;
use crate::types::{Qos, UserInfo};

/// Maps an incoming changeset to the modification that will apply it.
///
/// When no generator is installed the data source produces
/// [`Modification::ApplyChangeset`].
pub trait ChangesetModificationGenerator<R: Renderer>: Send + Sync {
    fn generate(
        &self,
        changeset: Changeset<R::Model>,
        user_info: UserInfo,
        qos: Qos,
    ) -> Modification<R>;
}

impl<R, F> ChangesetModificationGenerator<R> for F
where
    R: Renderer,
    F: Fn(Changeset<R::Model>, UserInfo, Qos) -> Modification<R> + Send + Sync,
{
    fn generate(
        &self,
        changeset: Changeset<R::Model>,
        user_info: UserInfo,
        qos: Qos,
    ) -> Modification<R> {
        self(changeset, user_info, qos)
    }
}
