// SPDX-License-Identifier: GPL-3.0-or-later

//! This module defines the configuration of the application.
//!
//! The configuration is either loaded from a file or used with default
//! values, which are defined in the code. It controls how strictly the
//! trace is interpreted and how the build tool output is recognized.
//!
//! The configuration file syntax is based on the YAML format.
//! The default configuration file name is `fsracer-adapter.yml`.
//!
//! Without an explicit file, it is looked up in the current working
//! directory, then in the configuration directory of the application.
//! The settings the file omits keep their defaults, and these are logged.
//!
//! ```yaml
//! schema: 1.0
//!
//! parser:
//!   duplicate_unfinished: overwrite
//!   orphan_resumed: fail
//!
//! translation:
//!   unknown_calls: fail
//!
//! make:
//!   include_extension: d
//!
//! gradle:
//!   min_descriptor: 2
//!   max_descriptor: 1024
//! ```

// Re-Export the types and the loader module content.
pub use loader::{ConfigError, Loader};
pub use types::*;
pub use validation::Validator;

mod types {
    use serde::Deserialize;
    use std::fmt;

    /// Represents the application configuration.
    #[derive(Debug, PartialEq, serde::Deserialize, serde::Serialize)]
    pub struct Main {
        #[serde(deserialize_with = "validate_schema_version")]
        pub schema: String,
        #[serde(default)]
        pub parser: Parser,
        #[serde(default)]
        pub translation: Translation,
        #[serde(default)]
        pub make: Make,
        #[serde(default)]
        pub gradle: Gradle,
    }

    impl Default for Main {
        fn default() -> Self {
            Self {
                schema: String::from(SUPPORTED_SCHEMA_VERSION),
                parser: Parser::default(),
                translation: Translation::default(),
                make: Make::default(),
                gradle: Gradle::default(),
            }
        }
    }

    impl fmt::Display for Main {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            writeln!(f, "Configuration:")?;
            let yaml = serde_yml::to_string(self).map_err(|_| fmt::Error)?;
            for line in yaml.lines() {
                writeln!(f, "{}", line)?;
            }
            Ok(())
        }
    }

    /// Controls how the trace line parser treats inconsistent input.
    #[derive(Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
    pub struct Parser {
        #[serde(default)]
        pub duplicate_unfinished: DuplicateUnfinished,
        #[serde(default)]
        pub orphan_resumed: OrphanResumed,
    }

    /// What to do when a call is reported unfinished twice for the same
    /// process, without being resumed in between.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
    #[serde(rename_all = "lowercase")]
    pub enum DuplicateUnfinished {
        /// Keep the latest fragment, log a warning.
        #[default]
        Overwrite,
        /// Stop processing.
        Fail,
    }

    /// What to do with a resumed call that was never reported unfinished.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
    #[serde(rename_all = "lowercase")]
    pub enum OrphanResumed {
        #[default]
        Fail,
        /// Drop the line, log a warning.
        Skip,
    }

    #[derive(Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
    pub struct Translation {
        #[serde(default)]
        pub unknown_calls: UnknownCalls,
    }

    /// What to do with system calls the translator does not know.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
    #[serde(rename_all = "lowercase")]
    pub enum UnknownCalls {
        #[default]
        Fail,
        /// Ignore the call, log a warning once per call name.
        Skip,
    }

    /// Make specific settings.
    #[derive(Debug, PartialEq, serde::Deserialize, serde::Serialize)]
    pub struct Make {
        /// The file extension of the generated dependency include files.
        #[serde(default = "default_include_extension")]
        pub include_extension: String,
    }

    impl Default for Make {
        fn default() -> Self {
            Self { include_extension: default_include_extension() }
        }
    }

    /// Gradle specific settings.
    ///
    /// The build plugin reports the task events on a dedicated descriptor.
    /// Writes to descriptors within the open range are interpreted.
    #[derive(Debug, PartialEq, serde::Deserialize, serde::Serialize)]
    pub struct Gradle {
        #[serde(default = "default_min_descriptor")]
        pub min_descriptor: i64,
        #[serde(default = "default_max_descriptor")]
        pub max_descriptor: i64,
    }

    impl Default for Gradle {
        fn default() -> Self {
            Self { min_descriptor: default_min_descriptor(), max_descriptor: default_max_descriptor() }
        }
    }

    const SUPPORTED_SCHEMA_VERSION: &str = "1.0";

    fn default_include_extension() -> String {
        String::from("d")
    }

    fn default_min_descriptor() -> i64 {
        2
    }

    fn default_max_descriptor() -> i64 {
        1024
    }

    // Custom deserialization function to validate the schema version
    fn validate_schema_version<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let schema: String = Deserialize::deserialize(deserializer)?;
        if schema != SUPPORTED_SCHEMA_VERSION {
            use serde::de::Error;
            Err(Error::custom(format!(
                "Unsupported schema version: {schema}. Expected: {SUPPORTED_SCHEMA_VERSION}"
            )))
        } else {
            Ok(schema)
        }
    }
}

pub mod validation {

    use super::types::*;
    use thiserror::Error;

    /// Trait for validating configuration objects
    pub trait Validator<T> {
        type Error: std::error::Error;

        fn validate(config: &T) -> Result<(), Self::Error>;
    }

    /// Validation errors for configuration
    #[derive(Debug, Error)]
    pub enum ValidationError {
        #[error("Empty string value for field '{field}'")]
        EmptyString { field: &'static str },
        #[error("Invalid value for field '{field}': {message}")]
        InvalidValue { field: &'static str, message: String },
        #[error("Multiple validation errors: {errors:?}")]
        Multiple { errors: Vec<ValidationError> },
    }

    /// Combinator for collecting and handling validation errors
    #[derive(Default)]
    struct ValidationCollector {
        errors: Vec<ValidationError>,
    }

    impl ValidationCollector {
        fn add_result(&mut self, result: Result<(), ValidationError>) {
            if let Err(error) = result {
                match error {
                    ValidationError::Multiple { errors } => {
                        self.errors.extend(errors);
                    }
                    single_error => self.errors.push(single_error),
                }
            }
        }

        fn finish(mut self) -> Result<(), ValidationError> {
            match self.errors.len() {
                0 => Ok(()),
                1 => Err(self.errors.remove(0)),
                _ => Err(ValidationError::Multiple { errors: self.errors }),
            }
        }
    }

    impl Validator<Main> for Main {
        type Error = ValidationError;

        fn validate(config: &Main) -> Result<(), Self::Error> {
            let mut collector = ValidationCollector::default();

            collector.add_result(Make::validate(&config.make));
            collector.add_result(Gradle::validate(&config.gradle));

            collector.finish()
        }
    }

    impl Validator<Make> for Make {
        type Error = ValidationError;

        fn validate(config: &Make) -> Result<(), Self::Error> {
            if config.include_extension.is_empty() {
                Err(ValidationError::EmptyString { field: "make.include_extension" })
            } else if config.include_extension.starts_with('.') {
                Err(ValidationError::InvalidValue {
                    field: "make.include_extension",
                    message: format!("'{}' shall not start with a dot", config.include_extension),
                })
            } else {
                Ok(())
            }
        }
    }

    impl Validator<Gradle> for Gradle {
        type Error = ValidationError;

        fn validate(config: &Gradle) -> Result<(), Self::Error> {
            // Both bounds are exclusive, at least one descriptor has to fit between.
            if config.max_descriptor.saturating_sub(config.min_descriptor) < 2 {
                Err(ValidationError::InvalidValue {
                    field: "gradle.min_descriptor",
                    message: format!(
                        "no descriptor is between {} and max_descriptor {}",
                        config.min_descriptor, config.max_descriptor
                    ),
                })
            } else {
                Ok(())
            }
        }
    }

}

pub mod loader {
    use super::{Main, Validator};
    use directories::ProjectDirs;
    use log::{debug, info};
    use std::fs;
    use std::path::{Path, PathBuf};
    use thiserror::Error;

    const CONFIG_FILE_NAME: &str = "fsracer-adapter.yml";

    /// The settings which fall back to their default when the file omits them.
    const SETTINGS: &[(&str, &str)] = &[
        ("parser", "duplicate_unfinished"),
        ("parser", "orphan_resumed"),
        ("translation", "unknown_calls"),
        ("make", "include_extension"),
        ("gradle", "min_descriptor"),
        ("gradle", "max_descriptor"),
    ];

    pub struct Loader;

    impl Loader {
        /// Loads the configuration from the given file, or from the first
        /// file found in the default locations. Without a file the default
        /// configuration is used.
        pub fn load(context: &crate::context::Context, filename: &Option<String>) -> Result<Main, ConfigError> {
            let path = match filename {
                Some(path) => PathBuf::from(path),
                None => match Self::discover(context) {
                    Some(path) => path,
                    None => {
                        debug!("Configuration file not found. Using the default configuration.");
                        return Ok(Main::default());
                    }
                },
            };
            Self::from_file(&path)
        }

        fn discover(context: &crate::context::Context) -> Option<PathBuf> {
            Self::candidates(context).into_iter().find(|candidate| {
                debug!("Checking configuration file: {}", candidate.display());
                candidate.is_file()
            })
        }

        fn candidates(context: &crate::context::Context) -> Vec<PathBuf> {
            let mut directories = vec![context.current_directory.clone()];
            if let Some(project) = ProjectDirs::from("org", "fsracer", "adapter") {
                directories.push(project.config_dir().to_path_buf());
            }
            directories.into_iter().map(|directory| directory.join(CONFIG_FILE_NAME)).collect()
        }

        /// Loads and validates the configuration from the specified file.
        pub fn from_file(path: &Path) -> Result<Main, ConfigError> {
            info!("Loading configuration file: {}", path.display());

            let content = fs::read_to_string(path)
                .map_err(|source| ConfigError::FileAccess { path: path.to_path_buf(), source })?;

            let (config, defaulted) =
                Self::parse(&content).map_err(|source| ConfigError::ParseError { path: path.to_path_buf(), source })?;

            Main::validate(&config)
                .map_err(|source| ConfigError::ValidationError { path: path.to_path_buf(), source })?;

            if !defaulted.is_empty() {
                info!("Settings not in the configuration file, defaults used: {}", defaulted.join(", "));
            }
            Ok(config)
        }

        /// Parses the configuration, and names the settings the document
        /// leaves to their defaults.
        fn parse(content: &str) -> serde_yml::Result<(Main, Vec<String>)> {
            let config: Main = serde_yml::from_str(content)?;
            let document: serde_yml::Value = serde_yml::from_str(content)?;

            let defaulted = SETTINGS
                .iter()
                .filter(|&&(section, key)| document.get(section).and_then(|values| values.get(key)).is_none())
                .map(|(section, key)| format!("{section}.{key}"))
                .collect();
            Ok((config, defaulted))
        }
    }

    /// Represents all possible configuration-related errors.
    #[derive(Debug, Error)]
    pub enum ConfigError {
        #[error("Failed to access configuration file '{path}': {source}")]
        FileAccess {
            path: PathBuf,
            #[source]
            source: std::io::Error,
        },
        #[error("Failed to parse configuration from file '{path}': {source}")]
        ParseError {
            path: PathBuf,
            #[source]
            source: serde_yml::Error,
        },
        #[error("Configuration validation failed for '{path}': {source}")]
        ValidationError {
            path: PathBuf,
            #[source]
            source: crate::config::validation::ValidationError,
        },
    }

}
