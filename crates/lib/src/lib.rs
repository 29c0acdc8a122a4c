//! webuild-lib: declarative builds for web and application projects
//!
//! A [`Build`] accumulates content entries (static files, generated files,
//! templates, JSON merges, compiled sources and custom tasks) and runs them
//! in declaration order:
//! - `placeholder`/`path`: `%name` expansion into concrete path lists
//! - `merge`: deep merge of JSON documents with filters and substitution
//! - `content`: the entry model and its registry
//! - `execute`: sequential execution with first-error halt
//! - `adapters`: external compilers, minifiers and the template renderer
//! - `vscode`: editor project files

pub mod adapters;
pub mod build;
pub mod classpath;
pub mod config;
pub mod consts;
pub mod content;
pub mod execute;
pub mod files;
pub mod merge;
pub mod path;
pub mod placeholder;
pub mod settings;
pub mod util;
pub mod vars;
pub mod vscode;

pub use build::{Build, BuildSeries};
pub use config::{BuildConfig, BuildEnv, ConfigHandle, LogLevel};
pub use content::{BuildContent, ContentError, ContentKind};
pub use execute::{BuildContext, BuildError, RunReport};
pub use merge::{JsonFilter, JsonSource, MergeOptions};
pub use path::PathSpec;
pub use vars::{VarMap, VarValue};
