//! Custom tasks.

use tracing::debug;

use crate::content::CustomContent;
use crate::execute::{BuildContext, BuildError, Operation, Outcome};

pub fn prepare(content: &CustomContent, ctx: &BuildContext) -> Result<Operation, BuildError> {
  let name = content.name.clone();
  let task = content.start(ctx.clone());
  Ok(Operation::task(async move {
    debug!(task = %name, "running custom task");
    task.await.map_err(|source| BuildError::Custom { name, source })?;
    Ok(Outcome::default())
  }))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::adapters::Adapters;
  use crate::content::CustomError;
  use crate::util::testutil::{context, run_op};
  use serde_json::json;
  use tempfile::TempDir;

  #[tokio::test]
  async fn task_sees_and_updates_configuration() {
    let temp = TempDir::new().unwrap();
    let ctx = context(temp.path(), json!({ "count": 1 }), Adapters::default());

    let content = CustomContent::new("bump", |ctx: BuildContext| async move {
      ctx.config().update(|cfg| {
        let next = cfg.get("count").and_then(|v| v.as_i64()).unwrap_or(0) + 1;
        cfg.set("count", json!(next));
      });
      Ok::<(), CustomError>(())
    });
    run_op(prepare(&content, &ctx).unwrap()).await;

    assert_eq!(ctx.config().read(|c| c.get("count").cloned()), Some(json!(2)));
  }

  #[tokio::test]
  async fn failure_carries_task_name() {
    let temp = TempDir::new().unwrap();
    let ctx = context(temp.path(), json!({}), Adapters::default());

    let content = CustomContent::new("deploy", |_ctx: BuildContext| async move {
      Err::<(), CustomError>("host unreachable".into())
    });
    let Operation::Task(task) = prepare(&content, &ctx).unwrap() else {
      panic!("expected a task");
    };
    let err = task.await.unwrap_err();
    assert_eq!(err.to_string(), "custom task 'deploy' failed: host unreachable");
  }
}
