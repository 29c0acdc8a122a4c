//! Build series: consecutive builds over one shared configuration.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use super::{Build, initial_config};
use crate::adapters::Adapters;
use crate::config::{BuildEnv, ConfigHandle};
use crate::execute::{BuildError, RunReport};
use crate::merge::{JsonSource, MergeOptions};

/// An ordered list of builds sharing one configuration handle.
///
/// A series always holds at least one build. [`BuildSeries::set_cfg`]
/// schedules a configuration change and starts a new build, so everything
/// declared afterwards runs with the changed configuration.
#[derive(Debug)]
pub struct BuildSeries {
  config: ConfigHandle,
  adapters: Arc<Adapters>,
  builds: Vec<Build>,
}

impl BuildSeries {
  pub fn new(overrides: Value) -> Result<Self, BuildError> {
    Self::with_env(overrides, &BuildEnv::from_env())
  }

  pub fn with_env(overrides: Value, env: &BuildEnv) -> Result<Self, BuildError> {
    let config = ConfigHandle::new(initial_config(overrides, env)?);
    Ok(Self::from_build(Build::attach(config, Arc::new(Adapters::default()))?))
  }

  /// Start a series with an existing build.
  pub fn from_build(build: Build) -> Self {
    Self {
      config: build.config().clone(),
      adapters: Arc::clone(build.adapters()),
      builds: vec![build],
    }
  }

  /// Replace the adapters of every current and future build.
  pub fn with_adapters(mut self, adapters: Adapters) -> Self {
    let adapters = Arc::new(adapters);
    for build in &mut self.builds {
      build.adapters = Arc::clone(&adapters);
    }
    self.adapters = adapters;
    self
  }

  pub fn config(&self) -> &ConfigHandle {
    &self.config
  }

  /// The build new content is declared on.
  pub fn current(&mut self) -> &mut Build {
    let last = self.builds.len() - 1;
    &mut self.builds[last]
  }

  /// Append a new build over the shared configuration and return it.
  pub fn next(&mut self) -> Result<&mut Build, BuildError> {
    let build = Build::attach(self.config.clone(), Arc::clone(&self.adapters))?;
    self.builds.push(build);
    Ok(self.current())
  }

  /// Schedule a configuration merge on the current build, then start the
  /// next one.
  pub fn set_cfg(&mut self, src: impl Into<JsonSource>, merge: MergeOptions) -> Result<&mut Build, BuildError> {
    self.current().add_config(src, None, merge)?;
    self.next()
  }

  pub fn builds(&self) -> &[Build] {
    &self.builds
  }

  /// Run every build in order, stopping at the first failure.
  pub async fn run(&self) -> Result<Vec<RunReport>, BuildError> {
    let mut reports = Vec::with_capacity(self.builds.len());
    for (index, build) in self.builds.iter().enumerate() {
      info!(build = index, total = self.builds.len(), "running series build");
      reports.push(build.run().await?);
    }
    Ok(reports)
  }
}
