//! Variable substitution for `%name` placeholders.
//!
//! Paths, JSON string leaves and file names may reference build variables with
//! a `%` prefix. Substitution is textual: every occurrence of `%key` is
//! replaced for each key of the [`VarMap`], in the map's insertion order.
//!
//! # Multi-valued variables
//!
//! A variable bound to a list expands a string into one candidate per value.
//! Expanding several list variables produces their cross product. The
//! candidate set is de-duplicated (first-seen order) after every key, so a
//! string that references the same list twice does not blow up.
//!
//! # Example
//!
//! ```
//! use webuild_lib::placeholder::expand;
//! use webuild_lib::vars::VarMap;
//!
//! let vars = VarMap::new().with("a", vec!["x", "y"]).with("ext", "js");
//! assert_eq!(expand("%a/file.%ext", &vars), vec!["x/file.js", "y/file.js"]);
//! ```
//!
//! Text that does not match any key passes through unchanged, so `%` on its
//! own or an unknown `%name` is left as written.

use std::collections::HashSet;

use tracing::trace;

use crate::consts::VAR_PREFIX;
use crate::vars::VarMap;

/// Expand every `%key` reference in `input`.
///
/// Returns the de-duplicated candidate strings in first-seen order. A list
/// variable with no values removes every candidate that references it, so the
/// result may be empty.
pub fn expand(input: &str, vars: &VarMap) -> Vec<String> {
  let mut candidates = vec![input.to_string()];

  for (key, value) in vars.iter() {
    let token = format!("{VAR_PREFIX}{key}");
    if !candidates.iter().any(|c| c.contains(&token)) {
      continue;
    }

    let expanded = candidates.iter().flat_map(|candidate| {
      if candidate.contains(&token) {
        value.values().iter().map(|v| candidate.replace(&token, v)).collect::<Vec<_>>()
      } else {
        vec![candidate.clone()]
      }
    });
    candidates = dedup_stable(expanded);
    trace!(token = %token, candidates = candidates.len(), "expanded variable");
  }

  candidates
}

/// Expand `input` and return the first candidate, if any.
pub fn expand_first(input: &str, vars: &VarMap) -> Option<String> {
  expand(input, vars).into_iter().next()
}

/// Remove duplicates while keeping the first occurrence of each value.
pub fn dedup_stable(items: impl IntoIterator<Item = String>) -> Vec<String> {
  let mut seen = HashSet::new();
  items.into_iter().filter(|item| seen.insert(item.clone())).collect()
}
