use std::sync::Arc;

use aichat_core::{Generator, RequestFailed};
use async_trait::async_trait;

/// Generator that answers every prompt with the same text, without any I/O.
pub struct StubGenerator {
    reply: String,
}

impl StubGenerator {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
        })
    }
}

#[async_trait]
impl Generator for StubGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, RequestFailed> {
        Ok(self.reply.clone())
    }
}

/// Generator whose request task dies before producing anything.
pub struct PanickingGenerator;

#[async_trait]
impl Generator for PanickingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, RequestFailed> {
        panic!("generator blew up")
    }
}
