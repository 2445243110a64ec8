//! REST client for the image-generation backend.
//!
//! Wraps the backend HTTP API using [`reqwest`]. Holds no state besides
//! the connection pool and base URL; every call either returns the decoded
//! payload or an [`ApiError`].

use prodgen_core::product::ImageFile;
use reqwest::multipart::Part;
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::ApiError;

/// HTTP client for one backend deployment.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client with default reqwest settings.
    ///
    /// * `base_url` - e.g. `http://localhost:8000/api/products`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let config = ClientConfig::new(base_url);
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url,
        }
    }

    /// Build a client honouring the configured request timeout.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// Reuse an existing [`reqwest::Client`] (shared connection pool).
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let config = ClientConfig::new(base_url);
        Self {
            client,
            base_url: config.base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an endpoint path starting with `/`.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Underlying connection pool, shared with file downloads.
    pub fn http(&self) -> &reqwest::Client {
        &self.client
    }

    /// `GET` a JSON resource.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        tracing::debug!(path, "GET");
        let response = self
            .client
            .get(self.url(path))
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `POST` a JSON body and decode the JSON reply.
    pub(crate) async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        tracing::debug!(path, "POST json");
        let response = self
            .client
            .post(self.url(path))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `POST` a multipart form and decode the JSON reply. The boundary and
    /// content type are set by reqwest.
    pub(crate) async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T, ApiError> {
        tracing::debug!(path, "POST multipart");
        let response = self
            .client
            .post(self.url(path))
            .header(reqwest::header::ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`ApiError::Status`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|source| ApiError::Decode { source, body })
    }
}

/// Multipart part for an in-memory image file.
pub(crate) fn file_part(file: &ImageFile) -> Result<Part, ApiError> {
    Ok(Part::bytes(file.bytes.clone())
        .file_name(file.file_name.clone())
        .mime_str(file.mime_type())?)
}
