use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

use fatstub_common::Arch;
use fatstub_common::arch::ArchParseError;

/// Name of the parameter holding the architecture used when none is given on the command line.
pub const DEFAULT_ARCH_PARAMETER: &str = "default_arch";

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error raised when a parameter value can not be interpreted.
    #[error("Parameter '{name}' is invalid.")]
    Invalid {
        /// Parameter name.
        name: String,
        /// Parsing error.
        #[source]
        source: ArchParseError,
    },
}

/// Configuration parameters holder
#[derive(Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfigParameters {
    parameters: HashMap<String, String>,
}

impl ConfigParameters {
    /// Constructor
    pub fn new(parameters: HashMap<String, String>) -> Self {
        Self { parameters }
    }

    /// Useful constructor for testing
    #[cfg(test)]
    pub fn build(parameters: &[(&str, &str)]) -> Self {
        let parameters = parameters
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Self::new(parameters)
    }

    /// Fetch a parameter from the holder.
    pub fn get(&self, name: &str) -> Option<String> {
        self.parameters.get(name).cloned()
    }

    /// Fetch an architecture parameter from the holder, `None` if it is not set.
    pub fn get_arch(&self, name: &str) -> Result<Option<Arch>, ConfigError> {
        let Some(value) = self.get(name) else {
            return Ok(None);
        };

        value
            .parse()
            .map(Some)
            .map_err(|source| ConfigError::Invalid {
                name: name.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_constructor() {
        let config = ConfigParameters::build(&[("default_arch", "arm64")]);

        assert_eq!(
            ConfigParameters {
                parameters: [("default_arch".to_string(), "arm64".to_string())]
                    .into_iter()
                    .collect()
            },
            config
        );
    }

    #[test]
    fn test_config_get() {
        let config = ConfigParameters::build(&[("default_arch", "arm64")]);

        assert_eq!("arm64".to_string(), config.get("default_arch").unwrap());
        assert!(config.get("whatever").is_none());
    }

    #[test]
    fn test_config_get_arch() {
        let config =
            ConfigParameters::build(&[("default_arch", "arm64e"), ("other_arch", "sparc")]);

        assert_eq!(
            Some(Arch::from_name("arm64e").unwrap()),
            config.get_arch("default_arch").unwrap()
        );
        assert_eq!(None, config.get_arch("whatever").unwrap());
        assert!(matches!(
            config.get_arch("other_arch"),
            Err(ConfigError::Invalid { name, .. }) if name == "other_arch"
        ));
    }
}
