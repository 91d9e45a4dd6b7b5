//! Viewport-driven splitting of large changesets.
//!
//! A [`SplitStrategy`] turns one changeset into an ordered list of smaller
//! changesets. Applying them in order must reach the same final content as
//! applying the original; only the intermediate States differ.

mod viewport;

pub use viewport::ViewportSplitter;

use crate::changeset::Changeset;
use crate::render::Renderer;
use crate::state::State;
use crate::types::Viewport;

pub trait SplitStrategy<R: Renderer>: Send + Sync {
    /// Split `changeset`, which is about to be applied to `base`.
    ///
    /// Returning a single element means "do not split".
    fn split(
        &self,
        base: &State<R>,
        changeset: Changeset<R::Model>,
        viewport: &Viewport,
    ) -> Vec<Changeset<R::Model>>;
}
