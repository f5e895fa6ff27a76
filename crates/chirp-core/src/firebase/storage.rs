//! Cloud Storage for Firebase: media upload and download URLs.

use bytes::Bytes;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use super::{FirebaseBackend, USER_AGENT, network_message};
use crate::backend::BlobStore;
use crate::error::{AuthError, StorageError, StorageErrorKind, StorageResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMetadata {
    #[serde(default)]
    download_tokens: Option<String>,
}

impl From<AuthError> for StorageError {
    fn from(err: AuthError) -> Self {
        StorageError::new(StorageErrorKind::Unauthorized, err.message)
    }
}

impl FirebaseBackend {
    /// `{base}/v0/b/{bucket}/o`, optionally followed by the encoded object path.
    fn object_url(&self, path: Option<&str>) -> StorageResult<Url> {
        let mut url = Url::parse(&self.endpoints.storage_base_url).map_err(|e| {
            StorageError::new(StorageErrorKind::Parse, format!("Invalid storage URL: {e}"))
        })?;
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                StorageError::new(StorageErrorKind::Parse, "Storage URL cannot be a base")
            })?;
            segments
                .pop_if_empty()
                .extend(["v0", "b", self.endpoints.storage_bucket.as_str(), "o"]);
            if let Some(path) = path {
                segments.push(path);
            }
        }
        Ok(url)
    }

    async fn upload_media(
        &self,
        path: &str,
        file: Bytes,
        content_type: Option<&str>,
    ) -> StorageResult<()> {
        let token = self.optional_id_token().await?;
        let mut url = self.object_url(None)?;
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", path);

        let mut request = self
            .http
            .post(url)
            .header("user-agent", USER_AGENT)
            .header(
                "content-type",
                content_type.unwrap_or("application/octet-stream"),
            )
            .body(file);
        if let Some(token) = token {
            request = request.header("authorization", format!("Firebase {token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| StorageError::new(StorageErrorKind::Network, network_message(&e)))?;
        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(path, status = status.as_u16(), "upload failed");
            return Err(StorageError::http_status(status.as_u16(), &error_body));
        }
        debug!(path, "upload complete");
        Ok(())
    }

    async fn fetch_download_url(&self, path: &str) -> StorageResult<String> {
        let token = self.optional_id_token().await?;
        let url = self.object_url(Some(path))?;

        let mut request = self.http.get(url.clone()).header("user-agent", USER_AGENT);
        if let Some(token) = token {
            request = request.header("authorization", format!("Firebase {token}"));
        }
        let response = request
            .send()
            .await
            .map_err(|e| StorageError::new(StorageErrorKind::Network, network_message(&e)))?;
        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(StorageError::http_status(status.as_u16(), &error_body));
        }

        let metadata: ObjectMetadata = response.json().await.map_err(|e| {
            StorageError::new(StorageErrorKind::Parse, format!("Invalid object metadata: {e}"))
        })?;
        let download_token = metadata
            .download_tokens
            .as_deref()
            .and_then(|tokens| tokens.split(',').map(str::trim).find(|t| !t.is_empty()))
            .ok_or_else(|| {
                StorageError::new(
                    StorageErrorKind::NotFound,
                    format!("Object '{path}' has no download token"),
                )
            })?;

        let mut download = url;
        download
            .query_pairs_mut()
            .append_pair("alt", "media")
            .append_pair("token", download_token);
        Ok(download.into())
    }
}

impl BlobStore for FirebaseBackend {
    fn upload<'a>(
        &'a self,
        path: &'a str,
        file: Bytes,
        content_type: Option<&'a str>,
    ) -> BoxFuture<'a, StorageResult<()>> {
        self.upload_media(path, file, content_type).boxed()
    }

    fn download_url<'a>(&'a self, path: &'a str) -> BoxFuture<'a, StorageResult<String>> {
        self.fetch_download_url(path).boxed()
    }
}
