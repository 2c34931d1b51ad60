use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE};
use tracing::{debug, warn};

use super::{public_url, validate_name, AssetStore};
use crate::error::StoreError;

/// Bucket-style object storage reached over its REST API.
///
/// | Operation | Request |
/// |-----------|---------|
/// | write     | `POST {api}/object/{bucket}/{name}` (no upsert) |
/// | delete    | `DELETE {api}/object/{bucket}/{name}` |
/// | public URL | `{api}/object/public/{bucket}/{name}` |
///
/// Requests carry the service key both as a bearer token and as `apikey`.
pub struct HttpStore {
    client: reqwest::Client,
    api_base: String,
    bucket: String,
    api_key: String,
    cache_control_secs: u64,
    public_base: String,
}

impl HttpStore {
    pub fn new(
        api_base: impl Into<String>,
        bucket: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let api_base = api_base.into().trim_end_matches('/').to_string();
        let bucket = bucket.into();
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| StoreError::Unreachable(format!("HTTP client: {e}")))?;
        let public_base = format!("{api_base}/object/public/{bucket}");
        Ok(Self {
            client,
            api_base,
            bucket,
            api_key: api_key.into(),
            cache_control_secs: 3600,
            public_base,
        })
    }

    /// `Cache-Control: max-age` sent with each write. Default: 3600.
    pub fn with_cache_control_secs(mut self, secs: u64) -> Self {
        self.cache_control_secs = secs;
        self
    }

    fn object_endpoint(&self, name: &str) -> String {
        format!("{}/object/{}/{}", self.api_base, self.bucket, name)
    }

    fn authorised(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header("apikey", &self.api_key)
    }
}

#[async_trait]
impl AssetStore for HttpStore {
    fn public_base(&self) -> &str {
        &self.public_base
    }

    async fn put(
        &self,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StoreError> {
        validate_name(name)?;
        let size = bytes.len();

        let response = self
            .authorised(self.client.post(self.object_endpoint(name)))
            .header(CONTENT_TYPE, content_type)
            .header(CACHE_CONTROL, format!("max-age={}", self.cache_control_secs))
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Store rejected '{}': HTTP {}", name, status);
            return Err(StoreError::Rejected {
                name: name.to_string(),
                detail: format!("HTTP {status}: {}", body.trim()),
            });
        }

        debug!("Uploaded {} ({} bytes, {})", name, size, content_type);
        Ok(public_url(&self.public_base, name))
    }

    async fn delete(&self, url: &str) -> Result<(), StoreError> {
        let name = self.object_name(url)?;
        validate_name(&name)?;

        let response = self
            .authorised(self.client.delete(self.object_endpoint(&name)))
            .send()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(StoreError::Rejected {
                name,
                detail: format!("HTTP {status}"),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn put_posts_object_and_returns_public_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/post-images/a.png"))
            .and(header("authorization", "Bearer secret"))
            .and(header("content-type", "image/png"))
            .and(header("x-upsert", "false"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let store =
            HttpStore::new(format!("{}/storage/v1/", server.uri()), "post-images", "secret").unwrap();
        let url = store.put("a.png", vec![1, 2, 3], "image/png").await.unwrap();

        assert_eq!(
            url,
            format!("{}/storage/v1/object/public/post-images/a.png", server.uri())
        );
        assert!(store.owns(&url));
    }

    #[tokio::test]
    async fn put_surfaces_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(409).set_body_string("Duplicate"))
            .mount(&server)
            .await;

        let store = HttpStore::new(server.uri(), "b", "k").unwrap();
        let err = store.put("a.png", vec![1], "image/png").await.unwrap_err();
        match err {
            StoreError::Rejected { name, detail } => {
                assert_eq!(name, "a.png");
                assert!(detail.contains("409"), "got: {detail}");
                assert!(detail.contains("Duplicate"));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_treats_missing_object_as_done() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/object/b/gone.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = HttpStore::new(server.uri(), "b", "k").unwrap();
        let url = format!("{}/object/public/b/gone.png", server.uri());
        store.delete(&url).await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_store_is_reported() {
        // Nothing listens on port 9 (discard) in the test environment.
        let store = HttpStore::new("http://127.0.0.1:9", "b", "k").unwrap();
        let err = store.put("a.png", vec![1], "image/png").await.unwrap_err();
        assert!(matches!(err, StoreError::Unreachable(_)));
    }
}
