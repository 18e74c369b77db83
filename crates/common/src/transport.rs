use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Method, Request, Response};
use reqwest::Client;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Whether the failure happened on the wire rather than while building
    /// the request
    pub fn is_network(&self) -> bool {
        matches!(self, TransportError::Reqwest(_))
    }
}

/// Issues HTTP requests on behalf of the hub connector and file protocol.
///
/// Anything that can turn a request into a response will do: the default
/// `ReqwestTransport`, an in-memory hub in tests, or a platform fetch shim.
/// Implementations must not treat non-2xx statuses as errors; status
/// handling belongs to the caller.
#[async_trait]
pub trait HubTransport: Send + Sync + std::fmt::Debug {
    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError>;
}

#[async_trait]
impl<T: HubTransport + ?Sized> HubTransport for std::sync::Arc<T> {
    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        (**self).send(request).await
    }
}

/// Build a request against an absolute URL string.
///
/// The URL is run through `url::Url` first so that path characters such as
/// spaces are percent-encoded the way a browser fetch would.
pub fn build_request(
    method: Method,
    url: &str,
    headers: &[(HeaderName, String)],
    body: Bytes,
) -> Result<Request<Bytes>, TransportError> {
    let url = Url::parse(url)?;
    let mut builder = Request::builder().method(method).uri(url.as_str());
    for (name, value) in headers {
        let value = HeaderValue::from_str(value)
            .map_err(|_| TransportError::InvalidRequest(format!("invalid {} header", name)))?;
        builder = builder.header(name, value);
    }
    builder
        .body(body)
        .map_err(|e| TransportError::InvalidRequest(e.to_string()))
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder().build()?;
        Ok(Self { client })
    }

    /// Reuse an existing client (shared connection pool, custom timeouts)
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Get the underlying HTTP client
    pub fn http_client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl HubTransport for ReqwestTransport {
    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        let (parts, body) = request.into_parts();
        let url = Url::parse(&parts.uri.to_string())?;
        tracing::debug!("{} {}", parts.method, url);

        let response = self
            .client
            .request(parts.method, url)
            .headers(parts.headers)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let headers: HeaderMap = response.headers().clone();
        let body = response.bytes().await?;
        tracing::debug!("response {} ({} bytes)", status, body.len());

        let mut out = Response::new(body);
        *out.status_mut() = status;
        *out.headers_mut() = headers;
        Ok(out)
    }
}
