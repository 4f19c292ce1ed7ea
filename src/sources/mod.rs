pub mod http;
pub mod scripted;

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;

use crate::task::Task;

/// Something that answers for a target. Could be an HTTP server, a test
/// script, anything that eventually yields text.
#[async_trait]
pub trait Source: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch(&self, target: &str) -> Result<String>;
}

/// Start one task per target. Each rejection names the target it came from.
pub fn tasks_for(source: &Arc<dyn Source>, targets: &[String]) -> Vec<Task<String>> {
    targets
        .iter()
        .map(|target| {
            let source = Arc::clone(source);
            let target = target.clone();
            Task::spawn(async move {
                source
                    .fetch(&target)
                    .await
                    .with_context(|| format!("error querying {}", target))
            })
        })
        .collect()
}
