/// HTTP client for the remote workflow backend
///
/// Only the delete call is needed by the lifecycle manager:
/// `DELETE {base_url}/me/workflows?id=<workflow_id>`.

use crate::collaborators::{CollaboratorError, RemoteBackend};
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self, CollaboratorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }
}

#[async_trait]
impl RemoteBackend for HttpBackend {
    async fn delete_workflow(&self, workflow_id: &str) -> Result<(), CollaboratorError> {
        let url = format!("{}/me/workflows", self.base_url);
        let mut request = self.client.delete(&url).query(&[("id", workflow_id)]);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::RemoteStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        tracing::debug!("Deleted remote copy of workflow {}", workflow_id);
        Ok(())
    }
}
