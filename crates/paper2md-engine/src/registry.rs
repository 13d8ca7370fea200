use crate::engine_trait::RecognitionEngine;
use paper2md_core::RecognitionError;
use std::collections::HashMap;

pub struct EngineRegistry {
    factories: HashMap<String, fn() -> Box<dyn RecognitionEngine>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register("mathpix", || Box::new(crate::mathpix::MathpixEngine::new()));
        registry.register("null", || Box::new(crate::null_engine::NullEngine::new()));
        registry
    }

    pub fn register(&mut self, name: &str, factory: fn() -> Box<dyn RecognitionEngine>) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn RecognitionEngine>, RecognitionError> {
        self.factories
            .get(name)
            .map(|f| f())
            .ok_or_else(|| RecognitionError::EngineNotFound(name.to_string()))
    }

    /// Create and initialise an engine in one step.
    pub async fn build(
        &self,
        name: &str,
        config: toml::Value,
    ) -> Result<Box<dyn RecognitionEngine>, RecognitionError> {
        let mut engine = self.create(name)?;
        engine.initialize(config).await?;
        Ok(engine)
    }

    pub fn list_engines(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::new()
    }
}
