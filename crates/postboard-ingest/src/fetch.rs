//! Remote collection fetcher
//!
//! One HTTP GET per call against a parameterized endpoint, decoding the JSON
//! array response into a typed sequence. Used for both the post collection
//! and, per post, its comment collection.

use crate::config::ApiConfig;
use crate::pipeline::PostSource;
use futures::StreamExt;
use postboard_common::types::{Comment, Post};
use postboard_common::PostboardError;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Fetch failure, tagged with the phase that failed
#[derive(Error, Debug)]
pub enum FetchError {
    /// The GET itself failed (connection, DNS, request IO)
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: StatusCode },

    /// Reading the response body failed mid-stream
    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The body is not a JSON array of the expected record type
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// HTTP client for the remote post/comment API
pub struct ApiClient {
    client: Client,
    posts_url: String,
    comments_url: String,
}

impl ApiClient {
    /// Create a new API client from configuration
    pub fn new(config: &ApiConfig) -> postboard_common::Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let client = builder
            .build()
            .map_err(|e| PostboardError::Network(e.to_string()))?;

        Ok(Self {
            client,
            posts_url: config.posts_url.clone(),
            comments_url: config.comments_url.clone(),
        })
    }

    /// Fetch one collection: GET the endpoint with `param` appended, read the
    /// full body, decode it as a JSON array of `T`.
    ///
    /// The sequence keeps the array order of the response. No retries; a
    /// failed call is reported to the caller and nothing else.
    pub async fn fetch_collection<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        param: &str,
    ) -> Result<Vec<T>, FetchError> {
        let url = format!("{}{}", endpoint, param);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url, status });
        }

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| FetchError::Body {
                url: url.clone(),
                source,
            })?;
            body.extend_from_slice(&chunk);
        }

        serde_json::from_slice(&body).map_err(|source| FetchError::Decode { url, source })
    }
}

impl PostSource for ApiClient {
    fn fetch_posts(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<Post>, FetchError>> + Send {
        self.fetch_collection::<Post>(&self.posts_url, user_id)
    }

    fn fetch_comments(
        &self,
        post_id: i32,
    ) -> impl Future<Output = Result<Vec<Comment>, FetchError>> + Send {
        async move {
            let param = post_id.to_string();
            self.fetch_collection::<Comment>(&self.comments_url, &param)
                .await
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_COMMENTS_URL, DEFAULT_POSTS_URL};

    fn test_config() -> ApiConfig {
        ApiConfig {
            posts_url: DEFAULT_POSTS_URL.to_string(),
            comments_url: DEFAULT_COMMENTS_URL.to_string(),
            timeout_secs: Some(30),
        }
    }

    #[test]
    fn test_api_client_creation() {
        let client = ApiClient::new(&test_config()).unwrap();
        assert!(client.posts_url.ends_with("userId="));
    }

    #[tokio::test]
    async fn test_fetch_collection_unreachable_is_request_error() {
        let client = ApiClient::new(&test_config()).unwrap();
        let result = client
            .fetch_collection::<Post>("http://127.0.0.1:9/posts?userId=", "7")
            .await;
        assert!(matches!(result, Err(FetchError::Request { .. })));
    }
}
