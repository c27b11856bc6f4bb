use async_trait::async_trait;

use crate::error::ServerError;
use crate::http::HttpClient;
use crate::mock::MockService;

use super::ServerBackend;

/// Server backend backed by the in-memory [`MockService`].
pub struct MockServer {
    max_upload_bytes: usize,
    service: Option<MockService>,
}

impl MockServer {
    pub fn new(max_upload_bytes: usize) -> Self {
        Self {
            max_upload_bytes,
            service: None,
        }
    }
}

#[async_trait]
impl ServerBackend for MockServer {
    fn kind(&self) -> &'static str {
        "mock"
    }

    async fn start(&mut self) -> Result<(), ServerError> {
        self.service = Some(MockService::start(self.max_upload_bytes).await?);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), ServerError> {
        if let Some(mut service) = self.service.take() {
            service.stop().await;
        }
        Ok(())
    }

    fn base_url(&self) -> Option<String> {
        self.service.as_ref().map(|s| s.base_url().to_string())
    }

    async fn is_healthy(&self) -> bool {
        let Some(url) = self.base_url() else {
            return false;
        };
        match HttpClient::new() {
            Ok(client) => client
                .is_ok(&format!("{}/health", url))
                .await
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    fn request_count(&self) -> Option<usize> {
        self.service.as_ref().map(MockService::request_count)
    }

    fn kill_now(&mut self) {
        // Dropping the handle signals shutdown.
        self.service = None;
    }
}
