//! Build configuration and process environment.
//!
//! A [`BuildConfig`] is a JSON object. Its top-level scalar and list fields
//! double as `%name` variables. It is shared through a [`ConfigHandle`] so
//! that configuration entries can update it while a build (or a series of
//! builds) is running.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use serde_json::{Map, Value};

use crate::consts::DIST_FLAG;
use crate::merge::{MergeError, deep_merge};
use crate::vars::VarMap;

/// Verbosity requested through `LOG` / `log`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
  Error,
  Warn,
  #[default]
  Info,
  Verbose,
  Debug,
  Silly,
}

impl LogLevel {
  /// The matching `tracing` filter directive.
  pub fn as_filter(&self) -> &'static str {
    match self {
      LogLevel::Error => "error",
      LogLevel::Warn => "warn",
      LogLevel::Info => "info",
      LogLevel::Verbose | LogLevel::Debug => "debug",
      LogLevel::Silly => "trace",
    }
  }
}

impl FromStr for LogLevel {
  type Err = String;

  /// Accepts `level` or `level,<log file>`; the file part is ignored.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let level = s.split(',').next().unwrap_or_default().trim().to_ascii_lowercase();
    match level.as_str() {
      "error" => Ok(LogLevel::Error),
      "warn" | "warning" => Ok(LogLevel::Warn),
      "info" => Ok(LogLevel::Info),
      "verbose" => Ok(LogLevel::Verbose),
      "debug" => Ok(LogLevel::Debug),
      "silly" | "trace" => Ok(LogLevel::Silly),
      other => Err(format!("unknown log level '{other}'")),
    }
  }
}

/// Settings taken from the process environment, read once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildEnv {
  pub minify: bool,
  pub sourcemaps: bool,
  pub dist: bool,
  pub log_level: LogLevel,
}

impl BuildEnv {
  /// Read `minify`, `sourcemaps`, `LOG`/`log` and the `--dist` flag.
  pub fn from_env() -> Self {
    let log = std::env::var("LOG").or_else(|_| std::env::var("log")).ok();
    Self::from_parts(
      std::env::var("minify").ok().as_deref(),
      std::env::var("sourcemaps").ok().as_deref(),
      log.as_deref(),
      std::env::args(),
    )
  }

  /// Derive the environment from explicit values.
  ///
  /// Distribution mode turns minification on and source maps off.
  pub fn from_parts(
    minify: Option<&str>,
    sourcemaps: Option<&str>,
    log: Option<&str>,
    args: impl IntoIterator<Item = String>,
  ) -> Self {
    let env = Self {
      minify: minify == Some("true"),
      sourcemaps: sourcemaps != Some("false"),
      dist: false,
      log_level: log.and_then(|l| l.parse().ok()).unwrap_or_default(),
    };
    if args.into_iter().any(|a| a == DIST_FLAG) {
      env.dist_mode()
    } else {
      env
    }
  }

  /// Switch to distribution mode: minify, no source maps.
  pub fn dist_mode(self) -> Self {
    Self {
      minify: true,
      sourcemaps: false,
      dist: true,
      ..self
    }
  }
}

/// The live configuration document of a build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildConfig(Map<String, Value>);

impl BuildConfig {
  /// Built-in defaults: `prj`, `minify` and `sourcemaps`.
  pub fn defaults(env: &BuildEnv, prj: &Path) -> Self {
    let mut map = Map::new();
    map.insert("prj".to_string(), Value::String(prj.to_string_lossy().to_string()));
    map.insert("minify".to_string(), Value::Bool(env.minify));
    map.insert("sourcemaps".to_string(), Value::Bool(env.sourcemaps));
    Self(map)
  }

  /// Wrap an existing object. Anything else yields `None`.
  pub fn from_value(value: Value) -> Option<Self> {
    match value {
      Value::Object(map) => Some(Self(map)),
      _ => None,
    }
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.0.get(key)
  }

  pub fn set(&mut self, key: impl Into<String>, value: Value) {
    self.0.insert(key.into(), value);
  }

  /// Deep-merge `overlay` into the configuration.
  pub fn merge(&mut self, overlay: &Value) -> Result<(), MergeError> {
    let mut value = Value::Object(std::mem::take(&mut self.0));
    let result = deep_merge(&mut value, overlay);
    self.0 = match value {
      Value::Object(map) => map,
      _ => Map::new(),
    };
    result
  }

  pub fn prj(&self) -> PathBuf {
    self
      .0
      .get("prj")
      .and_then(Value::as_str)
      .map(PathBuf::from)
      .unwrap_or_else(|| PathBuf::from("."))
  }

  pub fn minify(&self) -> bool {
    self.flag("minify")
  }

  pub fn sourcemaps(&self) -> bool {
    self.flag("sourcemaps")
  }

  fn flag(&self, key: &str) -> bool {
    match self.0.get(key) {
      Some(Value::Bool(b)) => *b,
      Some(Value::String(s)) => s == "true",
      _ => false,
    }
  }

  /// Global option bag stored under `key` (`tsc`, `scss`, `javac`).
  pub fn options(&self, key: &str) -> Value {
    match self.0.get(key) {
      Some(v @ Value::Object(_)) => v.clone(),
      _ => Value::Object(Map::new()),
    }
  }

  /// Every top-level scalar or list field as a variable.
  pub fn vars(&self) -> VarMap {
    VarMap::from_json_object(&self.as_value())
  }

  pub fn as_value(&self) -> Value {
    Value::Object(self.0.clone())
  }
}

/// Shared, mutable access to a [`BuildConfig`].
///
/// Cloning the handle shares the configuration. Guards never escape the
/// accessor closures, so the lock is never held across an await.
#[derive(Debug, Clone, Default)]
pub struct ConfigHandle(Arc<RwLock<BuildConfig>>);

impl ConfigHandle {
  pub fn new(config: BuildConfig) -> Self {
    Self(Arc::new(RwLock::new(config)))
  }

  pub fn read<R>(&self, f: impl FnOnce(&BuildConfig) -> R) -> R {
    let guard = self.0.read().unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&guard)
  }

  pub fn update<R>(&self, f: impl FnOnce(&mut BuildConfig) -> R) -> R {
    let mut guard = self.0.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&mut guard)
  }

  pub fn snapshot(&self) -> BuildConfig {
    self.read(|cfg| cfg.clone())
  }

  pub fn vars(&self) -> VarMap {
    self.read(BuildConfig::vars)
  }

  /// True when both handles share the same configuration.
  pub fn ptr_eq(&self, other: &ConfigHandle) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
  }
}
