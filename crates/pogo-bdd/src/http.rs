//! HTTP client used by server health checks and HTTP-specific directives.

use std::path::Path;
use std::time::Duration;

use log::debug;
use reqwest::header::{HeaderMap, ACCESS_CONTROL_REQUEST_METHOD, ORIGIN};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method};

use crate::error::HttpError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Status, body and headers of one HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpExchange {
    pub status: u16,
    pub body: String,
    /// Lower-cased header names in response order.
    pub headers: Vec<(String, String)>,
}

impl HttpExchange {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> Result<Self, HttpError> {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .build()
            .map_err(|e| HttpError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    pub async fn get(&self, url: &str) -> Result<HttpExchange, HttpError> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| request_error(url, source))?;
        exchange(url, response).await
    }

    /// Uploads `path` as multipart field `field`. The part's MIME type is
    /// guessed from the file extension.
    pub async fn upload(
        &self,
        url: &str,
        path: &Path,
        field: &str,
        query: &[(String, String)],
    ) -> Result<HttpExchange, HttpError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| HttpError::ReadUpload {
                path: path.to_path_buf(),
                source,
            })?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let mime = mime_guess::from_path(path).first_or_octet_stream();

        debug!("POST {} ({} bytes as '{}', {})", url, bytes.len(), field, mime);

        let part = Part::bytes(bytes)
            .file_name(filename)
            .mime_str(mime.essence_str())
            .map_err(|source| request_error(url, source))?;
        let form = Form::new().part(field.to_string(), part);

        let response = self
            .client
            .post(url)
            .query(query)
            .multipart(form)
            .send()
            .await
            .map_err(|source| request_error(url, source))?;
        exchange(url, response).await
    }

    /// Sends a CORS preflight for a POST from `origin`.
    pub async fn preflight(&self, url: &str, origin: &str) -> Result<HttpExchange, HttpError> {
        debug!("OPTIONS {} (origin {})", url, origin);
        let response = self
            .client
            .request(Method::OPTIONS, url)
            .header(ORIGIN, origin)
            .header(ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .send()
            .await
            .map_err(|source| request_error(url, source))?;
        exchange(url, response).await
    }

    /// `Ok(true)` only for HTTP 200.
    pub async fn is_ok(&self, url: &str) -> Result<bool, HttpError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| request_error(url, source))?;
        Ok(response.status().as_u16() == 200)
    }
}

fn request_error(url: &str, source: reqwest::Error) -> HttpError {
    HttpError::Request {
        url: url.to_string(),
        source,
    }
}

async fn exchange(url: &str, response: reqwest::Response) -> Result<HttpExchange, HttpError> {
    let status = response.status().as_u16();
    let headers = collect_headers(response.headers());
    let body = response
        .text()
        .await
        .map_err(|source| request_error(url, source))?;
    debug!("{} -> {}", url, status);
    Ok(HttpExchange {
        status,
        body,
        headers,
    })
}

fn collect_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}
