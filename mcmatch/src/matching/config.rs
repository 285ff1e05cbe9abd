use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use serde::{Deserialize, Serialize};
use mccore::algorithm::resolver::ResolverKind;
use crate::data::event::InputTag;
use crate::error::{MatchingError, Result};

/// Settings of the hit to truth-particle matcher.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Hit collection to attribute.
    pub hit_label: InputTag,
    /// Truth particle collection to attribute hits to.
    pub particle_label: InputTag,
    pub resolver: ResolverKind,
    /// Worker threads used when processing several events.
    pub num_threads: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        MatchingConfig {
            hit_label: InputTag::new("gaushit"),
            particle_label: InputTag::new("largeant"),
            resolver: ResolverKind::Linear,
            num_threads: 4,
        }
    }
}

impl MatchingConfig {
    pub fn new(hit_label: &str, particle_label: &str) -> Self {
        MatchingConfig {
            hit_label: InputTag::new(hit_label),
            particle_label: InputTag::new(particle_label),
            ..Default::default()
        }
    }

    /// Read a JSON configuration; missing keys take their default value.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: MatchingConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.hit_label.label().trim().is_empty() {
            return Err(MatchingError::Config("hit_label must not be empty".to_string()));
        }
        if self.particle_label.label().trim().is_empty() {
            return Err(MatchingError::Config("particle_label must not be empty".to_string()));
        }
        if self.num_threads == 0 {
            return Err(MatchingError::Config("num_threads must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MatchingConfig::default();
        assert_eq!(config.hit_label.label(), "gaushit");
        assert_eq!(config.particle_label.label(), "largeant");
        assert_eq!(config.resolver, ResolverKind::Linear);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: MatchingConfig = serde_json::from_str(r#"{"hit_label": "linecluster", "resolver": "indexed"}"#).unwrap();
        assert_eq!(config.hit_label.label(), "linecluster");
        assert_eq!(config.particle_label.label(), "largeant");
        assert_eq!(config.resolver, ResolverKind::Indexed);
        assert_eq!(config.num_threads, 4);
    }

    #[test]
    fn test_invalid_config() {
        let mut config = MatchingConfig::new("", "largeant");
        assert!(matches!(config.validate(), Err(MatchingError::Config(_))));
        config.hit_label = InputTag::new("gaushit");
        config.num_threads = 0;
        assert!(matches!(config.validate(), Err(MatchingError::Config(_))));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matching.json");
        std::fs::write(&path, r#"{"particle_label": "g4", "num_threads": 2}"#).unwrap();

        let config = MatchingConfig::from_json_file(&path).unwrap();
        assert_eq!(config.particle_label.label(), "g4");
        assert_eq!(config.num_threads, 2);

        std::fs::write(&path, r#"{"num_threads": 0}"#).unwrap();
        assert!(MatchingConfig::from_json_file(&path).is_err());
    }
}
