use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::user::ports::MediaUploader;
use crate::user::errors::UploadError;

/// HTTP client for the external media store.
///
/// Takes a locally spooled file, pushes it as multipart to the configured
/// endpoint, and hands back the hosted URL. The temp file is removed once
/// the store has accepted it.
pub struct HttpMediaStore {
    client: reqwest::Client,
    storage_url: String,
}

impl HttpMediaStore {
    pub fn new(storage_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            storage_url: storage_url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

#[async_trait]
impl MediaUploader for HttpMediaStore {
    async fn upload(&self, local_path: &Path) -> Result<String, UploadError> {
        let bytes = tokio::fs::read(local_path)
            .await
            .map_err(|e| UploadError::Io(e.to_string()))?;

        let file_name = local_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let form = reqwest::multipart::Form::new()
            .part("file", reqwest::multipart::Part::bytes(bytes).file_name(file_name));

        let response = self
            .client
            .post(&self.storage_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(UploadError::Rejected(response.status().as_u16()));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| UploadError::MalformedResponse(e.to_string()))?;

        // The spooled copy is no longer needed once the store has it
        if let Err(e) = tokio::fs::remove_file(local_path).await {
            tracing::debug!(path = %local_path.display(), cause = %e, "Failed to remove temp file");
        }

        Ok(body.url)
    }
}
