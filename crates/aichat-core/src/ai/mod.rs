pub mod endpoint;

use async_trait::async_trait;

use crate::error::RequestFailed;

pub use endpoint::EndpointClient;

/// Anything that can turn a prompt into generated text.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, RequestFailed>;
}
