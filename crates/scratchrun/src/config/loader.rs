//! Configuration file loading
//!
//! Handles loading and parsing the language registry using the config crate.

use std::path::Path;

use config::{Config as ConfigBuilder, File, FileFormat};
use regex::Regex;
use tracing::warn;

use crate::config::{Config, ConfigError};

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = ConfigBuilder::builder()
            .add_source(File::from(path))
            .build()?;

        let mut config: Config = config.try_deserialize()?;
        config.drop_unnamed_languages();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config = ConfigBuilder::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;

        let mut config: Config = config.try_deserialize()?;
        config.drop_unnamed_languages();
        config.validate()?;
        Ok(config)
    }

    /// Languages without a display name are skipped rather than rejected,
    /// so a half-written registry entry doesn't take the whole config down.
    fn drop_unnamed_languages(&mut self) {
        self.languages.retain(|id, lang| {
            let keep = !lang.name.trim().is_empty();
            if !keep {
                warn!(%id, "skipping language with blank name");
            }
            keep
        });
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        for (id, lang) in &self.languages {
            Self::validate_template(id, "run_command", Some(&lang.run_command))?;
            Self::validate_template(id, "init_command", lang.init_command.as_deref())?;
            Self::validate_template(id, "dependency_command", lang.dependency_command.as_deref())?;
            Self::validate_template(id, "compile_command", lang.compile_command.as_deref())?;

            if let Some(ref pattern) = lang.filename_pattern {
                let re = Regex::new(pattern).map_err(|e| {
                    ConfigError::Invalid(format!(
                        "language '{id}' has invalid filename_pattern: {e}"
                    ))
                })?;
                if re.captures_len() < 2 {
                    return Err(ConfigError::Invalid(format!(
                        "language '{id}' filename_pattern has no capture group"
                    )));
                }
            }
        }

        Ok(())
    }

    /// A present template must expand to at least one token; an absent
    /// stage is expressed by omitting the template, not by leaving it blank.
    fn validate_template(id: &str, field: &str, template: Option<&str>) -> Result<(), ConfigError> {
        if let Some(template) = template
            && template.split_whitespace().next().is_none()
        {
            return Err(ConfigError::Invalid(format!(
                "language '{id}' has empty {field}"
            )));
        }
        Ok(())
    }
}
