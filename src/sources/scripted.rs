use anyhow::{Result, bail};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use super::Source;

#[derive(Debug, Clone)]
struct Reply {
    delay: Duration,
    body: Result<String, String>,
}

/// A scripted source for tests and dry runs. Each target answers after a
/// fixed delay with a canned body or failure. Unknown targets fail at once.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    replies: HashMap<String, Reply>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// `target` answers `body` after `delay`.
    pub fn reply(mut self, target: &str, delay: Duration, body: &str) -> Self {
        self.replies.insert(
            target.to_string(),
            Reply {
                delay,
                body: Ok(body.to_string()),
            },
        );
        self
    }

    /// `target` fails with `reason` after `delay`.
    pub fn fail(mut self, target: &str, delay: Duration, reason: &str) -> Self {
        self.replies.insert(
            target.to_string(),
            Reply {
                delay,
                body: Err(reason.to_string()),
            },
        );
        self
    }
}

#[async_trait]
impl Source for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch(&self, target: &str) -> Result<String> {
        let Some(reply) = self.replies.get(target) else {
            bail!("no scripted reply");
        };
        tokio::time::sleep(reply.delay).await;
        match &reply.body {
            Ok(body) => Ok(body.clone()),
            Err(reason) => bail!("{}", reason),
        }
    }
}
