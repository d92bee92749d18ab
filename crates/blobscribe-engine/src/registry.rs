use crate::null_engine::NullRecognizer;
use crate::recognizer::Recognizer;
use blobscribe_core::{RecognizerError, SpeechConfig};
use std::collections::BTreeMap;

pub type RecognizerFactory = fn() -> Box<dyn Recognizer>;

/// Engine names as written in `[speech] engine`, mapped to constructors.
/// Names are matched case-insensitively.
pub struct RecognizerRegistry {
    engines: BTreeMap<String, RecognizerFactory>,
}

impl RecognizerRegistry {
    /// A registry with the built-in `null` engine.
    pub fn new() -> Self {
        Self::empty().with_engine("null", || Box::new(NullRecognizer::new()))
    }

    pub fn empty() -> Self {
        Self {
            engines: BTreeMap::new(),
        }
    }

    /// Adds or replaces an engine.
    pub fn with_engine(mut self, name: &str, factory: RecognizerFactory) -> Self {
        self.register(name, factory);
        self
    }

    pub fn register(&mut self, name: &str, factory: RecognizerFactory) {
        self.engines.insert(normalize(name), factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.engines.contains_key(&normalize(name))
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn Recognizer>, RecognizerError> {
        let factory = self
            .engines
            .get(&normalize(name))
            .ok_or_else(|| RecognizerError::EngineNotFound(name.to_string()))?;
        Ok(factory())
    }

    /// Fresh, uninitialized recognizer for the engine the config selects.
    pub fn for_config(
        &self,
        config: &SpeechConfig,
    ) -> Result<Box<dyn Recognizer>, RecognizerError> {
        self.create(&config.engine)
    }

    /// Registered names in sorted order.
    pub fn list_engines(&self) -> Vec<&str> {
        self.engines.keys().map(String::as_str).collect()
    }
}

impl Default for RecognizerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}
