use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::Generator;
use crate::error::RequestFailed;

#[derive(Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    text: String,
}

/// Client for the hosted "generate answer" endpoint.
#[derive(Clone)]
pub struct EndpointClient {
    client: Client,
    url: String,
}

impl EndpointClient {
    pub fn new(url: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn query(&self, prompt: &str) -> Result<String, RequestFailed> {
        let request = GenerateRequest { prompt };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RequestFailed::Status(status));
        }

        // Read the body ourselves so a bad shape is reported as malformed, not transport
        let body = response.bytes().await?;
        let generated: GenerateResponse = serde_json::from_slice(&body)?;
        Ok(generated.text)
    }
}

#[async_trait]
impl Generator for EndpointClient {
    async fn generate(&self, prompt: &str) -> Result<String, RequestFailed> {
        tracing::debug!(url = %self.url, prompt_len = prompt.len(), "posting prompt");
        self.query(prompt).await
    }
}
