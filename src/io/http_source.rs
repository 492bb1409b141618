use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use tracing::trace;
use url::Url;

use super::ByteSource;
use crate::error::IoError;

/// HTTP(S)-backed implementation of `ByteSource`.
///
/// Issues a single GET per fetch with the configured extra headers. Any
/// non-success status is an error; 404 maps to [`IoError::NotFound`].
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
    url: Url,
    headers: HeaderMap,
}

impl HttpSource {
    /// Create a source for `url`.
    ///
    /// Returns an error if the URL does not parse, is not http/https, or a
    /// header name/value is not valid HTTP.
    pub fn new(client: Client, url: &str, headers: &[(String, String)]) -> Result<Self, IoError> {
        let url = parse_http_url(url)?;

        let mut map = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| IoError::InvalidUrl(format!("header name {:?}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| IoError::InvalidUrl(format!("header value for {}: {}", name, e)))?;
            map.append(name, value);
        }

        Ok(Self {
            client,
            url,
            headers: map,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Parse and check that `url` is an absolute http or https URL.
pub fn parse_http_url(url: &str) -> Result<Url, IoError> {
    let parsed = Url::parse(url).map_err(|e| IoError::InvalidUrl(format!("{}: {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(IoError::InvalidUrl(format!(
            "{}: unsupported scheme {:?}",
            url, scheme
        ))),
    }
}

#[async_trait]
impl ByteSource for HttpSource {
    async fn fetch(&self) -> Result<Bytes, IoError> {
        trace!(url = %self.url, "Fetching image");

        let response = self
            .client
            .get(self.url.clone())
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(|e| IoError::Connection(format!("{}: {}", self.url, e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(IoError::NotFound(self.url.to_string()));
        }
        if !status.is_success() {
            return Err(IoError::Http {
                status: status.as_u16(),
                url: self.url.to_string(),
            });
        }

        response
            .bytes()
            .await
            .map_err(|e| IoError::Connection(format!("{}: {}", self.url, e)))
    }

    fn identifier(&self) -> &str {
        self.url.as_str()
    }
}
