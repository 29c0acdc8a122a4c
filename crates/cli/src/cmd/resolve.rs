//! Implementation of the `webuild resolve` command.

use anyhow::{Context, Result, bail};
use serde_json::Value;

use webuild_lib::{Build, PathSpec, VarMap, VarValue};

use crate::output::{OutputFormat, print_json, print_warning};

/// Parse a `NAME=VALUE` binding.
pub fn parse_var(s: &str) -> Result<(String, String), String> {
  let (name, value) = s
    .split_once('=')
    .ok_or_else(|| format!("invalid binding '{s}': expected NAME=VALUE"))?;
  if name.is_empty() {
    return Err(format!("invalid binding '{s}': empty name"));
  }
  Ok((name.to_string(), value.to_string()))
}

/// Variables from `--var` bindings. A comma-separated value is a list.
fn binding_vars(vars: &[(String, String)]) -> VarMap {
  vars
    .iter()
    .map(|(name, value)| {
      let value = if value.contains(',') {
        VarValue::List(value.split(',').map(str::to_string).collect())
      } else {
        VarValue::Scalar(value.clone())
      };
      (name.clone(), value)
    })
    .collect()
}

/// Resolve each spec against the working directory's configuration plus the
/// given bindings, and print the resulting paths.
pub fn cmd_resolve(specs: &[String], vars: &[(String, String)], format: OutputFormat) -> Result<()> {
  let build = Build::new(Value::Null).context("Failed to create build")?;
  let vars = build.vars().overlay(&binding_vars(vars));

  let spec = PathSpec::Many(specs.to_vec());
  let resolved = webuild_lib::path::resolve(&spec, &vars).unwrap_or_default();

  if format.is_json() {
    return print_json(&resolved);
  }
  if resolved.is_empty() {
    print_warning("Nothing to resolve");
    bail!("'{}' resolves to nothing", spec);
  }
  for path in &resolved {
    println!("{path}");
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_var_splits_on_first_equals() {
    assert_eq!(parse_var("a=b=c").unwrap(), ("a".to_string(), "b=c".to_string()));
    assert!(parse_var("novalue").is_err());
    assert!(parse_var("=x").is_err());
  }

  #[test]
  fn comma_values_become_lists() {
    let vars = binding_vars(&[
      ("lang".to_string(), "en,de".to_string()),
      ("name".to_string(), "app".to_string()),
    ]);
    assert_eq!(vars.get("lang").unwrap().values(), &["en".to_string(), "de".to_string()]);
    assert_eq!(vars.get("name").unwrap().values(), &["app".to_string()]);
  }
}
