//! Shared fixtures for integration tests.

#![allow(dead_code)]

use cascade::{
    Changeset, Configuration, DataSource, EngineConfig, IndexPath, RenderFailure, Renderer,
    Transition, UpdateMode, UserInfo,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Renders `model#count@context`. Models starting with `!` fail to render.
#[derive(Debug, Default)]
pub struct CardRenderer {
    pub extent: Option<f64>,
}

impl Renderer for CardRenderer {
    type Model = String;
    type ItemState = u32;
    type Output = String;
    type Context = String;

    fn render(&self, model: &String, state: &u32, context: &String) -> Result<String, RenderFailure> {
        if model.starts_with('!') {
            return Err(RenderFailure::new(format!("unrenderable model {}", model)));
        }
        Ok(format!("{}#{}@{}", model, state, context))
    }

    fn extent(&self, _output: &String) -> Option<f64> {
        self.extent
    }
}

pub fn configuration(context: &str) -> Configuration<CardRenderer> {
    Configuration::new(CardRenderer::default(), context.to_string())
}

pub fn data_source() -> DataSource<CardRenderer> {
    data_source_with(EngineConfig::default())
}

/// Route engine logs to the test harness output. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn data_source_with(config: EngineConfig) -> DataSource<CardRenderer> {
    init_tracing();
    DataSource::new(configuration("w"), config).unwrap()
}

pub fn p(section: usize, item: usize) -> IndexPath {
    IndexPath::new(section, item)
}

pub fn s(value: &str) -> String {
    value.to_string()
}

/// One section holding `items`, applied synchronously.
pub fn seed(source: &DataSource<CardRenderer>, items: &[&str]) {
    let changeset = Changeset::builder()
        .with_inserted_sections([0])
        .with_inserted_items(items.iter().enumerate().map(|(i, m)| (p(0, i), s(m))))
        .build();
    source
        .apply_changeset(changeset, UpdateMode::Synchronous, UserInfo::new())
        .unwrap();
}

/// Records every transition in notification order.
pub fn record(source: &DataSource<CardRenderer>) -> Arc<Mutex<Vec<Transition<CardRenderer>>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    source.add_listener(Arc::new(move |transition: &Transition<CardRenderer>| {
        sink.lock().push(transition.clone());
    }));
    log
}

pub fn tagged(tag: &str) -> UserInfo {
    let mut info = UserInfo::new();
    info.insert("tag".to_string(), serde_json::Value::String(tag.to_string()));
    info
}

pub fn tag_of(transition: &Transition<CardRenderer>) -> Option<String> {
    transition
        .user_info()
        .get("tag")
        .and_then(|value| value.as_str())
        .map(str::to_string)
}
