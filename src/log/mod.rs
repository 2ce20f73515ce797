//! The `log` module controls the store's internal logging. Every mutation of a data manager
//! emits a `trace!` or `debug!` message through the `log` facade; this module decides whether and
//! where those messages are written.
//!
//! This module (re)exports the five logging macros: `error!`, `warn!`, `info!`, `debug!` and
//! `trace!`. Logging is _disabled_ by default and is controlled with:
//!
//!  - `enable_logging()`: turns on all log messages
//!  - `disable_logging()`: turns off all log messages
//!  - `set_log_level(level: LevelFilter)`: enables only log messages with priority at least `level`
//!
//! Per-module filtering of messages can be configured using `set_module_filter()` /
//! `set_module_filters()` and `remove_module_filter()`:
//!
//! ```rust
//! use ixa_relations::log::{set_module_filter, set_log_level, LevelFilter};
//!
//! pub fn setup_logging() {
//!     // Enable `info` log messages globally.
//!     set_log_level(LevelFilter::Info);
//!     // Show every membership change made by the groups data manager.
//!     set_module_filter("ixa_relations::groups", LevelFilter::Trace);
//! }
//! ```
#[cfg(all(not(target_arch = "wasm32"), feature = "logging"))]
mod standard_logger;

#[cfg(not(all(not(target_arch = "wasm32"), feature = "logging")))]
mod null_logger;

pub use log::{debug, error, info, trace, warn, LevelFilter};
use std::collections::hash_map::Entry;

use crate::HashMap;
#[cfg(all(not(target_arch = "wasm32"), feature = "logging"))]
use log4rs::Handle;
use std::sync::LazyLock;
use std::sync::{Mutex, MutexGuard};

// Logging disabled
const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Off;
/// Filters applied before any call to `set_module_filter`. `WeightedSampler::sample` emits a
/// `trace!` for every weighted draw, which would drown out the mutation log of the data managers
/// once `enable_logging()` is called, so the sampler's module is capped at `Info` unless a filter
/// for it is set explicitly.
const DEFAULT_MODULE_FILTERS: [(&str, LevelFilter); 1] =
    [("ixa_relations::random", LevelFilter::Info)];

/// A global instance of the logging configuration.
static LOG_CONFIGURATION: LazyLock<Mutex<LogConfiguration>> = LazyLock::new(Mutex::default);

/// A level filter for the messages emitted from one module path (e.g.
/// `"ixa_relations::regions"`).
#[derive(Debug, PartialEq)]
struct ModuleLogConfiguration {
    module: String,
    level: LevelFilter,
}

impl From<(&str, LevelFilter)> for ModuleLogConfiguration {
    fn from((module, level): (&str, LevelFilter)) -> Self {
        Self {
            module: module.to_string(),
            level,
        }
    }
}

/// Keeps track of the filter levels of modules and holds a handle to the global logger.
///
/// Loggers are installed globally, so only one instance of this struct exists. The public API
/// are free functions which fetch the singleton and call the appropriate member function.
#[derive(Debug)]
pub(in crate::log) struct LogConfiguration {
    /// The level filter for modules without an explicitly set filter. `LevelFilter::Off`
    /// disables logging.
    pub(in crate::log) global_log_level: LevelFilter,
    pub(in crate::log) module_configurations: HashMap<String, ModuleLogConfiguration>,

    #[cfg(all(not(target_arch = "wasm32"), feature = "logging"))]
    root_handle: Option<Handle>,
}

impl Default for LogConfiguration {
    fn default() -> Self {
        let module_configurations = DEFAULT_MODULE_FILTERS
            .map(|(module, level)| (module.to_string(), (module, level).into()));
        let module_configurations = HashMap::from_iter(module_configurations);
        Self {
            global_log_level: DEFAULT_LOG_LEVEL,
            module_configurations,

            #[cfg(all(not(target_arch = "wasm32"), feature = "logging"))]
            root_handle: None,
        }
    }
}

impl LogConfiguration {
    pub(in crate::log) fn set_log_level(&mut self, level: LevelFilter) {
        self.global_log_level = level;
        self.set_config();
    }

    /// Returns true if the configuration was mutated, false otherwise.
    fn insert_module_filter(&mut self, module: &str, level: LevelFilter) -> bool {
        match self.module_configurations.entry(module.to_string()) {
            Entry::Occupied(mut entry) => {
                let module_config = entry.get_mut();
                if module_config.level == level {
                    return false;
                }
                module_config.level = level;
            }

            Entry::Vacant(entry) => {
                entry.insert((module, level).into());
            }
        }
        true
    }

    pub(in crate::log) fn set_module_filters(&mut self, module_filters: &[(&str, LevelFilter)]) {
        let mut mutated = false;
        for (module, level) in module_filters {
            mutated |= self.insert_module_filter(module, *level);
        }
        if mutated {
            self.set_config();
        }
    }

    pub(in crate::log) fn remove_module_filter(&mut self, module: &str) {
        if self.module_configurations.remove(module).is_some() {
            self.set_config();
        }
    }
}

// The public API

/// Enables the logger with no global level filter / full logging. Equivalent to
/// `set_log_level(LevelFilter::Trace)`.
pub fn enable_logging() {
    set_log_level(LevelFilter::Trace);
}

/// Disables logging completely. Equivalent to `set_log_level(LevelFilter::Off)`.
pub fn disable_logging() {
    set_log_level(LevelFilter::Off);
}

/// Sets the global log level. A global filter level of `LevelFilter::Off` disables logging.
pub fn set_log_level(level: LevelFilter) {
    get_log_configuration().set_log_level(level);
}

/// Sets a level filter for the given module path.
pub fn set_module_filter(module_path: &str, level_filter: LevelFilter) {
    get_log_configuration().set_module_filters(&[(module_path, level_filter)]);
}

/// Removes a module-specific level filter for the given module path. The global level filter will
/// apply to the module.
pub fn remove_module_filter(module_path: &str) {
    get_log_configuration().remove_module_filter(module_path);
}

/// Sets the level filters for a set of modules. Use this instead of `set_module_filter()` to set
/// filters in bulk; the logger is rebuilt at most once.
pub fn set_module_filters(module_filters: &[(&str, LevelFilter)]) {
    get_log_configuration().set_module_filters(module_filters);
}

fn get_log_configuration() -> MutexGuard<'static, LogConfiguration> {
    LOG_CONFIGURATION
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::sync::{LazyLock, Mutex};

    use super::*;

    // The configuration is global, so tests that change it take turns.
    static SERIAL: LazyLock<Mutex<()>> = LazyLock::new(Mutex::default);

    fn module_level(module: &str) -> Option<LevelFilter> {
        get_log_configuration()
            .module_configurations
            .get(module)
            .map(|configuration| configuration.level)
    }

    #[test]
    fn sampler_stays_capped_when_logging_is_enabled() {
        let _serial = SERIAL.lock().unwrap();
        enable_logging();
        assert_eq!(get_log_configuration().global_log_level, LevelFilter::Trace);
        assert_eq!(module_level("ixa_relations::random"), Some(LevelFilter::Info));
        trace!("emitted by the groups and regions data managers");

        set_module_filter("ixa_relations::random", LevelFilter::Trace);
        assert_eq!(module_level("ixa_relations::random"), Some(LevelFilter::Trace));

        set_module_filter("ixa_relations::random", LevelFilter::Info);
        disable_logging();
        assert_eq!(get_log_configuration().global_log_level, LevelFilter::Off);
    }

    #[test]
    fn data_manager_filters_can_be_set_in_bulk_and_removed() {
        let _serial = SERIAL.lock().unwrap();
        set_log_level(LevelFilter::Warn);
        set_module_filters(&[
            ("ixa_relations::groups", LevelFilter::Trace),
            ("ixa_relations::regions", LevelFilter::Debug),
        ]);
        assert_eq!(module_level("ixa_relations::groups"), Some(LevelFilter::Trace));
        assert_eq!(module_level("ixa_relations::regions"), Some(LevelFilter::Debug));
        assert_eq!(get_log_configuration().module_configurations.len(), 3);

        // Setting a filter to its current level leaves the configuration untouched.
        assert!(!get_log_configuration()
            .insert_module_filter("ixa_relations::groups", LevelFilter::Trace));

        remove_module_filter("ixa_relations::groups");
        remove_module_filter("ixa_relations::regions");
        assert_eq!(module_level("ixa_relations::groups"), None);
        assert_eq!(module_level("ixa_relations::random"), Some(LevelFilter::Info));
        disable_logging();
    }
}
