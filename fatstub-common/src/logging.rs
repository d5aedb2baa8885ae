//! Logging utilities shared by the fatstub crates.

use slog::Logger;

/// Extension trait for `slog::Logger`
pub trait LoggerExtensions {
    /// Create a new child logger with a `src` key containing the component name.
    fn new_with_component_name<T>(&self) -> Self;

    /// Create a new child logger with a `src` key containing the provided name.
    fn new_with_name(&self, name: &str) -> Self;

    /// Create a new child logger with a `file` key containing the decoded file name.
    fn new_with_filename(&self, filename: &str) -> Self;
}

impl LoggerExtensions for Logger {
    fn new_with_component_name<T>(&self) -> Self {
        self.new_with_name(component_name::<T>())
    }

    fn new_with_name(&self, name: &str) -> Self {
        self.new(slog::o!("src" => name.to_owned()))
    }

    fn new_with_filename(&self, filename: &str) -> Self {
        self.new(slog::o!("file" => filename.to_owned()))
    }
}

/// Type name of `T`, without its module path nor its generic parameters.
pub fn component_name<T>() -> &'static str {
    let complete_name = std::any::type_name::<T>();
    let without_generic = complete_name.split('<').next().unwrap_or(complete_name);

    without_generic.rsplit("::").next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use slog::info;

    use super::*;
    use crate::test_utils::{TempDir, TestLogger};
    use crate::{BinaryFileLoader, FatFile};

    struct Decoder<T> {
        _phantom: std::marker::PhantomData<T>,
    }

    #[test]
    fn component_name_strips_module_path_and_generics() {
        assert_eq!("FatFile", component_name::<FatFile>());
        assert_eq!("BinaryFileLoader", component_name::<BinaryFileLoader>());
        assert_eq!("Decoder", component_name::<Decoder<FatFile>>());
        assert_eq!("Decoder", component_name::<Decoder<&str>>());
    }

    #[test]
    fn child_logger_carries_the_component_name() {
        let log_path =
            TempDir::create("logging", "child_logger_carries_the_component_name").join("test.log");
        {
            let root_logger = TestLogger::file(&log_path);
            let child_logger = root_logger.new_with_component_name::<BinaryFileLoader>();
            info!(child_logger, "Child log");
        }

        let logs = std::fs::read_to_string(&log_path).unwrap();
        assert!(
            logs.contains("src") && logs.contains("BinaryFileLoader"),
            "log should contain the `src` key with the component name, logs:\n{logs}"
        );
    }

    #[test]
    fn child_logger_carries_the_filename() {
        let log_path =
            TempDir::create("logging", "child_logger_carries_the_filename").join("test.log");
        {
            let root_logger = TestLogger::file(&log_path);
            let child_logger = root_logger
                .new_with_name("loader")
                .new_with_filename("/usr/lib/libfoo.dylib");
            info!(child_logger, "Child log");
        }

        let logs = std::fs::read_to_string(&log_path).unwrap();
        assert!(
            logs.contains("loader") && logs.contains("/usr/lib/libfoo.dylib"),
            "log should contain both the `src` and `file` keys, logs:\n{logs}"
        );
    }
}
