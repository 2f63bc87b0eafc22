// src/client/request.rs - HTTP plumbing shared by every REST call

use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use super::DojoClient;
use crate::infra::errors::DojoError;
use crate::util::truncate_str;

/// Longest error body echoed back in `DojoError::Http::message`.
const MAX_ERROR_BODY: usize = 500;

impl DojoClient {
    /// `{base}/api/{segments...}` with each segment percent-encoded.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("api").extend(segments);
        }
        url
    }

    fn builder(&self, method: Method, segments: &[&str], query: &[(&str, String)]) -> RequestBuilder {
        let mut url = self.endpoint(segments);
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        self.http
            .request(method, url)
            .timeout(self.config.server.request_timeout())
    }

    pub(crate) fn stream_builder(&self, segments: &[&str]) -> RequestBuilder {
        // no per-request timeout: the streaming path enforces its own budget
        self.http.post(self.endpoint(segments))
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, DojoError> {
        self.get_with(segments, &[]).await
    }

    pub(crate) async fn get_with<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, DojoError> {
        let response = send(self.builder(Method::GET, segments, query)).await?;
        Ok(response.json().await?)
    }

    pub(crate) async fn post<B, T>(&self, segments: &[&str], body: &B) -> Result<T, DojoError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.with_body(Method::POST, segments, body).await
    }

    pub(crate) async fn put<B, T>(&self, segments: &[&str], body: &B) -> Result<T, DojoError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.with_body(Method::PUT, segments, body).await
    }

    async fn with_body<B, T>(&self, method: Method, segments: &[&str], body: &B) -> Result<T, DojoError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = send(self.builder(method, segments, &[]).json(body)).await?;
        Ok(response.json().await?)
    }

    /// Body-less POST whose response is decoded.
    pub(crate) async fn post_empty<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, DojoError> {
        let response = send(self.builder(Method::POST, segments, &[])).await?;
        Ok(response.json().await?)
    }

    /// Call whose response body is ignored (DELETE, approve, enable...).
    pub(crate) async fn execute(&self, method: Method, segments: &[&str]) -> Result<(), DojoError> {
        send(self.builder(method, segments, &[])).await?;
        Ok(())
    }

    pub(crate) async fn put_unit<B: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<(), DojoError> {
        send(self.builder(Method::PUT, segments, &[]).json(body)).await?;
        Ok(())
    }
}

/// Send and turn non-2xx responses into `DojoError::Http`.
pub(crate) async fn send(builder: RequestBuilder) -> Result<Response, DojoError> {
    let response = builder.send().await?;
    check_status(response).await
}

pub(crate) async fn check_status(response: Response) -> Result<Response, DojoError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let err = http_error(status.as_u16(), &body);
    tracing::debug!("Request failed: {}", err);
    Err(err)
}

/// Build the typed error for a failed response. A JSON body contributes its
/// `message`/`error` and `code` fields; any other body is used verbatim.
pub(crate) fn http_error(status: u16, body: &str) -> DojoError {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let field = |name: &str| {
        parsed
            .as_ref()
            .and_then(|v| v.get(name))
            .and_then(|v| v.as_str())
            .map(String::from)
    };

    let message = field("message")
        .or_else(|| field("error"))
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| truncate_str(trimmed, MAX_ERROR_BODY).to_string())
        })
        .unwrap_or_else(|| "Request failed".to_string());

    DojoError::Http {
        status,
        message,
        code: field("code"),
    }
}
