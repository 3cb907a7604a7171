//! Configuration recognized by the core.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub language: String,
    pub confidence_threshold: f64,
    pub enable_learning: bool,
    pub memory_storage_path: PathBuf,
    pub max_memory_entries: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            language: "eng".to_string(),
            confidence_threshold: 0.60,
            enable_learning: true,
            memory_storage_path: PathBuf::from("uploads/learning_memory.json"),
            max_memory_entries: 1000,
        }
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        EngineConfigBuilder {
            config: EngineConfig::default(),
        }
    }
}

impl EngineConfigBuilder {
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.config.language = language.into();
        self
    }

    pub fn confidence_threshold(mut self, threshold: f64) -> Self {
        self.config.confidence_threshold = threshold;
        self
    }

    pub fn enable_learning(mut self, enable: bool) -> Self {
        self.config.enable_learning = enable;
        self
    }

    pub fn memory_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.memory_storage_path = path.into();
        self
    }

    pub fn max_memory_entries(mut self, max: usize) -> Self {
        self.config.max_memory_entries = max;
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.language, "eng");
        assert_eq!(cfg.confidence_threshold, 0.60);
        assert!(cfg.enable_learning);
        assert_eq!(cfg.max_memory_entries, 1000);
    }

    #[test]
    fn builder_overrides_defaults() {
        let cfg = EngineConfig::builder()
            .language("fra")
            .confidence_threshold(0.5)
            .enable_learning(false)
            .max_memory_entries(50)
            .build();
        assert_eq!(cfg.language, "fra");
        assert_eq!(cfg.confidence_threshold, 0.5);
        assert!(!cfg.enable_learning);
        assert_eq!(cfg.max_memory_entries, 50);
    }
}
