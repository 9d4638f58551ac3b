use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use restabot_core::{GenerateRequest, GenerateResponse, GenerativeModel};

type Responder = dyn Fn(&GenerateRequest) -> Result<String> + Send + Sync;

/// A model that answers through a closure and records every request.
pub struct MockModel {
    name: String,
    responder: Box<Responder>,
    requests: Arc<Mutex<Vec<GenerateRequest>>>,
}

impl MockModel {
    pub fn new(responder: impl Fn(&GenerateRequest) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            name: "mock".to_string(),
            responder: Box::new(responder),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Always answers with `response`.
    pub fn with_response(response: impl Into<String>) -> Self {
        let response = response.into();
        Self::new(move |_| Ok(response.clone()))
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl GenerativeModel for MockModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let text = (self.responder)(request)?;
        Ok(GenerateResponse {
            text,
            provider: self.name.clone(),
            model: "mock".to_string(),
            tokens_used: 0,
            latency_ms: 0,
        })
    }
}
