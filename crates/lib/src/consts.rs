//! Crate-wide constants.

pub const APP_NAME: &str = "webuild";

/// Prefix marking a variable reference in paths and JSON strings (`%prj`).
pub const VAR_PREFIX: &str = "%";

/// Field-filter prefix that splices a nested object into the top level.
pub const SPLICE_PREFIX: char = '<';

/// Literal produced by substituting an unset (`null`) variable.
pub const NULL_PATH: &str = "null";

/// Editor settings file, relative to the project directory.
pub const SETTINGS_FILE: &str = ".vscode/settings.json";

/// Editor settings key holding java dependencies.
pub const SETTINGS_CLASSPATH_KEY: &str = "java.classPath";

/// Editor settings key holding the file exclusion map.
pub const SETTINGS_EXCLUDE_KEY: &str = "files.exclude";

/// Variable exposing every declared classpath entry, sorted.
pub const CLASSPATH_VAR: &str = "classPath";

/// Variable exposing the classpath entries seeded from the editor settings.
pub const VSC_CLASSPATH_VAR: &str = "vscClassPath";

/// Command-line flag switching the defaults to distribution mode.
pub const DIST_FLAG: &str = "--dist";

/// Maximum nesting depth accepted by the deep merge.
pub const MAX_MERGE_DEPTH: usize = 128;
