//! Editor settings (`.vscode/settings.json`).
//!
//! The settings file is JSON with comments. It is read once when a build is
//! constructed: `java.classPath` seeds the build's classpath and
//! `files.exclude` is exposed for clean-up tooling.

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::consts::{SETTINGS_CLASSPATH_KEY, SETTINGS_EXCLUDE_KEY, SETTINGS_FILE};

#[derive(Debug, Error)]
pub enum SettingsError {
  #[error("failed to read {path}: {source}")]
  Read { path: PathBuf, source: std::io::Error },

  #[error("failed to parse {path}: {source}")]
  Parse { path: PathBuf, source: serde_json::Error },
}

/// Parsed editor settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditorSettings {
  raw: Value,
}

impl EditorSettings {
  /// Load `<prj>/.vscode/settings.json`. A missing file is `Ok(None)`.
  pub fn load(prj: &Path) -> Result<Option<Self>, SettingsError> {
    let path = prj.join(SETTINGS_FILE);
    if !path.is_file() {
      debug!(path = ?path, "no editor settings");
      return Ok(None);
    }

    let text = std::fs::read_to_string(&path).map_err(|source| SettingsError::Read {
      path: path.clone(),
      source,
    })?;
    let raw = parse_json_lenient(&text).map_err(|source| SettingsError::Parse { path, source })?;
    Ok(Some(Self { raw }))
  }

  pub fn from_value(raw: Value) -> Self {
    Self { raw }
  }

  pub fn raw(&self) -> &Value {
    &self.raw
  }

  /// Entries of `java.classPath`, in file order.
  pub fn class_path(&self) -> Vec<String> {
    match self.raw.get(SETTINGS_CLASSPATH_KEY) {
      Some(Value::Array(items)) => items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
      Some(Value::String(single)) => vec![single.clone()],
      _ => Vec::new(),
    }
  }

  /// Paths excluded in `files.exclude`, minus those listed in `keep`.
  pub fn excluded_paths(&self, keep: &[&str]) -> Vec<String> {
    let Some(Value::Object(map)) = self.raw.get(SETTINGS_EXCLUDE_KEY) else {
      return Vec::new();
    };
    map
      .iter()
      .filter(|(path, enabled)| enabled.as_bool() == Some(true) && !keep.contains(&path.as_str()))
      .map(|(path, _)| path.clone())
      .collect()
  }
}

/// Parse JSON that may contain `//` and `/* */` comments and trailing commas.
pub fn parse_json_lenient(text: &str) -> Result<Value, serde_json::Error> {
  serde_json::from_str(&strip_json_comments(text))
}

/// Remove comments and trailing commas outside string literals.
pub fn strip_json_comments(input: &str) -> String {
  let mut out = String::with_capacity(input.len());
  let mut chars = input.chars().peekable();
  let mut in_string = false;

  while let Some(c) = chars.next() {
    if in_string {
      out.push(c);
      match c {
        '\\' => {
          if let Some(escaped) = chars.next() {
            out.push(escaped);
          }
        }
        '"' => in_string = false,
        _ => {}
      }
      continue;
    }

    match c {
      '"' => {
        in_string = true;
        out.push(c);
      }
      '/' if chars.peek() == Some(&'/') => {
        for next in chars.by_ref() {
          if next == '\n' {
            out.push('\n');
            break;
          }
        }
      }
      '/' if chars.peek() == Some(&'*') => {
        chars.next();
        let mut prev = '\0';
        for next in chars.by_ref() {
          if prev == '*' && next == '/' {
            break;
          }
          prev = next;
        }
      }
      _ => out.push(c),
    }
  }

  strip_trailing_commas(&out)
}

fn strip_trailing_commas(input: &str) -> String {
  let chars: Vec<char> = input.chars().collect();
  let mut out = String::with_capacity(input.len());
  let mut in_string = false;
  let mut i = 0;

  while i < chars.len() {
    let c = chars[i];
    if in_string {
      out.push(c);
      if c == '\\' && i + 1 < chars.len() {
        out.push(chars[i + 1]);
        i += 2;
        continue;
      }
      if c == '"' {
        in_string = false;
      }
      i += 1;
      continue;
    }

    if c == '"' {
      in_string = true;
    } else if c == ',' {
      let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
      if matches!(next, Some('}') | Some(']')) {
        i += 1;
        continue;
      }
    }
    out.push(c);
    i += 1;
  }
  out
}
