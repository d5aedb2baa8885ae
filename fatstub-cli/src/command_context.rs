use config::ConfigBuilder;
use config::builder::DefaultState;
use slog::Logger;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use fatstub_common::{BinaryFile, BinaryFileReader, StdResult};

use crate::configuration::ConfigParameters;

/// Context for the command execution
pub struct CommandContext {
    config_builder: ConfigBuilder<DefaultState>,
    reader: Arc<dyn BinaryFileReader>,
    logger: Logger,
}

impl CommandContext {
    /// Create a new command context
    pub fn new(
        config_builder: ConfigBuilder<DefaultState>,
        reader: Arc<dyn BinaryFileReader>,
        logger: Logger,
    ) -> Self {
        Self {
            config_builder,
            reader,
            logger,
        }
    }

    /// Get the configured parameters
    pub fn config_parameters(&self) -> StdResult<ConfigParameters> {
        let config = self.config_builder.clone().build()?;
        let config_hash_map = config.try_deserialize::<HashMap<String, String>>()?;
        Ok(ConfigParameters::new(config_hash_map))
    }

    /// Read and decode the file at `path`
    pub fn read_binary_file(&self, path: &Path) -> StdResult<BinaryFile> {
        self.reader.read(path)
    }

    /// Get the shared logger
    pub fn logger(&self) -> &Logger {
        &self.logger
    }
}
