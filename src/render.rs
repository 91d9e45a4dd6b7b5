//! The rendering collaborator and the configuration that carries it.
//!
//! The engine never looks inside models or outputs. It only calls
//! [`Renderer::render`] for every item it inserts, updates or reloads, and
//! [`Renderer::extent`] when the viewport splitter needs item sizes.

use crate::error::{EngineError, Result};
use crate::types::IndexPath;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by a [`Renderer`] for a single item.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct RenderFailure(pub String);

impl RenderFailure {
    pub fn new(message: impl Into<String>) -> Self {
        RenderFailure(message.into())
    }
}

/// Turns a model item into a rendered output.
///
/// `render` must be a pure function of its three inputs; the engine relies
/// on that to re-render items freely (reloads, configuration updates,
/// viewport splitting).
pub trait Renderer: Send + Sync + 'static {
    /// Model object supplied through changesets.
    type Model: Clone + PartialEq + fmt::Debug + Send + Sync + 'static;
    /// Per-item internal state owned by the rendered item.
    type ItemState: Clone + Default + PartialEq + fmt::Debug + Send + Sync + 'static;
    /// Rendered output.
    type Output: Clone + PartialEq + fmt::Debug + Send + Sync + 'static;
    /// Global rendering input (sizing constraints, environment).
    type Context: Clone + PartialEq + fmt::Debug + Send + Sync + 'static;

    fn render(
        &self,
        model: &Self::Model,
        state: &Self::ItemState,
        context: &Self::Context,
    ) -> std::result::Result<Self::Output, RenderFailure>;

    /// Extent of a rendered output along the layout axis, if known.
    fn extent(&self, _output: &Self::Output) -> Option<f64> {
        None
    }
}

/// Renderer plus the context it renders against.
pub struct Configuration<R: Renderer> {
    renderer: Arc<R>,
    context: R::Context,
}

impl<R: Renderer> Configuration<R> {
    pub fn new(renderer: R, context: R::Context) -> Self {
        Self {
            renderer: Arc::new(renderer),
            context,
        }
    }

    /// Build from an already shared renderer.
    pub fn from_shared(renderer: Arc<R>, context: R::Context) -> Self {
        Self { renderer, context }
    }

    /// Same renderer, new context.
    pub fn with_context(&self, context: R::Context) -> Self {
        Self {
            renderer: Arc::clone(&self.renderer),
            context,
        }
    }

    pub fn renderer(&self) -> &Arc<R> {
        &self.renderer
    }

    pub fn context(&self) -> &R::Context {
        &self.context
    }

    /// Render one item, attributing any failure to `path`.
    pub(crate) fn render_item(
        &self,
        path: IndexPath,
        model: &R::Model,
        state: &R::ItemState,
    ) -> Result<R::Output> {
        self.renderer
            .render(model, state, &self.context)
            .map_err(|failure| EngineError::Render {
                path,
                message: failure.0,
            })
    }
}

impl<R: Renderer> Clone for Configuration<R> {
    fn clone(&self) -> Self {
        Self {
            renderer: Arc::clone(&self.renderer),
            context: self.context.clone(),
        }
    }
}

/// Two configurations are equal when they share the renderer instance and
/// carry equal contexts.
impl<R: Renderer> PartialEq for Configuration<R> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.renderer, &other.renderer) && self.context == other.context
    }
}

impl<R: Renderer> fmt::Debug for Configuration<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
