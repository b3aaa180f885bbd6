//! Engine settings, read through the `config` crate.
//!
//! Sources are layered: built-in defaults, then an optional TOML file, then
//! environment variables prefixed `SUCCESSION_` (e.g. `SUCCESSION_ROOT_NAME`).

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use crate::error::Result;

pub const DEFAULT_ROOT_NAME: &str = "object";
pub const ENVIRONMENT_PREFIX: &str = "SUCCESSION";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Name of the root class every hierarchy terminates in.
    pub root_name: String,
    /// Linearize each class while it is declared, so that an inconsistent
    /// declaration is refused up front instead of on first use.
    pub validate_on_declare: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root_name: DEFAULT_ROOT_NAME.to_owned(),
            validate_on_declare: false,
        }
    }
}

impl EngineConfig {
    /// Loads defaults, then `path` if given and present, then the environment.
    pub fn load(path: Option<&str>) -> Result<Self> {
        Self::load_with_environment(path, None)
    }
    /// Like [`EngineConfig::load`], but reads the `SUCCESSION_*` variables
    /// from `environment` instead of the process environment when given.
    pub fn load_with_environment(
        path: Option<&str>,
        environment: Option<config::Map<String, String>>,
    ) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("root_name", DEFAULT_ROOT_NAME)?
            .set_default("validate_on_declare", false)?;
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(false));
        }
        let settings = builder
            .add_source(
                Environment::with_prefix(ENVIRONMENT_PREFIX)
                    .try_parsing(true)
                    .source(environment),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }
    /// Reads settings from an inline TOML document; missing keys keep their defaults.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_keeps_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn document_overrides_defaults() {
        let config = EngineConfig::from_toml_str(
            "root_name = \"Base\"\nvalidate_on_declare = true\n",
        )
        .unwrap();
        assert_eq!(config.root_name, "Base");
        assert!(config.validate_on_declare);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let config = EngineConfig::load(Some("does/not/exist/succession")).unwrap();
        assert!(!config.root_name.is_empty());
    }

    #[test]
    fn malformed_values_are_config_errors() {
        let err = EngineConfig::from_toml_str("validate_on_declare = \"often\"").unwrap_err();
        assert!(matches!(err, crate::error::SuccessionError::Config(_)));
    }
}
