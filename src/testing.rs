//! Renderer used by unit tests.

use crate::render::{Configuration, RenderFailure, Renderer};
use crate::state::State;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Renders `model:state@context`; models starting with `!` fail.
#[derive(Debug, Default)]
pub(crate) struct LabelRenderer {
    pub extent: Option<f64>,
    pub renders: AtomicUsize,
}

impl Renderer for LabelRenderer {
    type Model = String;
    type ItemState = u32;
    type Output = String;
    type Context = String;

    fn render(&self, model: &String, state: &u32, context: &String) -> Result<String, RenderFailure> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        if model.starts_with('!') {
            return Err(RenderFailure::new(format!("cannot render {}", model)));
        }
        Ok(format!("{}:{}@{}", model, state, context))
    }

    fn extent(&self, _output: &String) -> Option<f64> {
        self.extent
    }
}

pub(crate) fn config(context: &str) -> Configuration<LabelRenderer> {
    Configuration::new(LabelRenderer::default(), context.to_string())
}

pub(crate) fn s(value: &str) -> String {
    value.to_string()
}

/// Models of every section as `&str`-comparable strings.
pub(crate) fn models(state: &State<LabelRenderer>) -> Vec<Vec<String>> {
    state.models()
}
