//! HTTP request helpers.
//!
//! Responses are collected in full and pre-parsed by content type: `text/*`
//! bodies are exposed as [`Response::text`], JSON bodies as
//! [`Response::data`].

use crate::error::{Result, ServerError};
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Body of an outgoing request.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// Raw bytes, sent as `application/octet-stream`.
    Bytes(Vec<u8>),
    /// Text, sent as `text/plain`.
    Text(String),
    /// Structured data, sent as `application/json`.
    Json(Value),
}

impl From<Vec<u8>> for RequestBody {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for RequestBody {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<String> for RequestBody {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for RequestBody {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// Client bound to the base URL of a running instance.
#[derive(Debug, Clone)]
pub struct Client {
    base: Url,
    http: reqwest::Client,
}

impl Client {
    /// Create a client resolving relative URLs against `base_url`.
    ///
    /// # Errors
    /// Returns error if the base URL is malformed.
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| ServerError::InvalidUrl(format!("{base_url}: {e}")))?;
        Ok(Self {
            base,
            http: reqwest::Client::new(),
        })
    }

    /// Get the base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    /// Start a request with any method.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let url = self
            .base
            .join(url)
            .map_err(|e| ServerError::InvalidUrl(format!("{url}: {e}")));

        RequestBuilder {
            http: self.http.clone(),
            method,
            url,
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            error: None,
        }
    }

    /// Start a GET request.
    pub fn get(&self, url: &str) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    /// Start a POST request.
    pub fn post(&self, url: &str) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    /// Start a PUT request.
    pub fn put(&self, url: &str) -> RequestBuilder {
        self.request(Method::PUT, url)
    }

    /// Start a PATCH request.
    pub fn patch(&self, url: &str) -> RequestBuilder {
        self.request(Method::PATCH, url)
    }

    /// Start a DELETE request.
    pub fn delete(&self, url: &str) -> RequestBuilder {
        self.request(Method::DELETE, url)
    }

    /// Start a HEAD request.
    pub fn head(&self, url: &str) -> RequestBuilder {
        self.request(Method::HEAD, url)
    }

    /// Start an OPTIONS request.
    pub fn options(&self, url: &str) -> RequestBuilder {
        self.request(Method::OPTIONS, url)
    }

    /// Start a TRACE request.
    pub fn trace(&self, url: &str) -> RequestBuilder {
        self.request(Method::TRACE, url)
    }
}

/// A request being assembled. Errors are reported by [`RequestBuilder::send`].
#[derive(Debug)]
#[must_use = "requests do nothing until sent"]
pub struct RequestBuilder {
    http: reqwest::Client,
    method: Method,
    url: Result<Url>,
    headers: HeaderMap,
    body: RequestBody,
    /// First failure while assembling headers or body.
    error: Option<ServerError>,
}

impl RequestBuilder {
    /// Set the request body.
    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = body.into();
        self
    }

    /// Send text.
    pub fn text(self, text: impl Into<String>) -> Self {
        self.body(RequestBody::Text(text.into()))
    }

    /// Send raw bytes.
    pub fn bytes(self, bytes: impl Into<Vec<u8>>) -> Self {
        self.body(RequestBody::Bytes(bytes.into()))
    }

    /// Send a value serialized as JSON.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => self.body = RequestBody::Json(value),
            Err(e) => self.fail(ServerError::Json(e)),
        }
        self
    }

    /// Set a header, replacing earlier values and the body's default
    /// content type.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        let Ok(header) = HeaderName::from_bytes(name.as_bytes()) else {
            self.fail(ServerError::InvalidHeader(name.to_string()));
            return self;
        };
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.insert(header, value);
            }
            Err(_) => self.fail(ServerError::InvalidHeader(format!("{name}: {value}"))),
        }
        self
    }

    /// Set several headers.
    pub fn headers<'a>(self, headers: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        headers
            .into_iter()
            .fold(self, |builder, (name, value)| builder.header(name, value))
    }

    fn fail(&mut self, error: ServerError) {
        self.error.get_or_insert(error);
    }

    /// Send the request and collect the response.
    ///
    /// # Errors
    /// Returns error if the request was malformed or the connection failed.
    /// A JSON response with a malformed body is still returned, without
    /// [`Response::data`].
    pub async fn send(self) -> Result<Response> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let url = self.url?;
        let headers = self.headers;

        debug!(method = %self.method, url = %url, "Sending request");

        let request = self.http.request(self.method, url);
        let request = match self.body {
            RequestBody::Empty => request,
            RequestBody::Bytes(bytes) => request
                .header(CONTENT_TYPE, "application/octet-stream")
                .body(bytes),
            RequestBody::Text(text) => request
                .header(CONTENT_TYPE, "text/plain; charset=utf-8")
                .body(text),
            RequestBody::Json(value) => request.json(&value),
        };

        let response = request.headers(headers).send().await?;
        Response::collect(response).await
    }
}

/// A fully received response.
#[derive(Debug, Clone)]
pub struct Response {
    /// Status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Raw body.
    pub body: Bytes,
    /// Body as text, for `text/*` responses.
    pub text: Option<String>,
    /// Parsed body, for JSON responses whose body is valid JSON.
    pub data: Option<Value>,
}

impl Response {
    async fn collect(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        let mut out = Self {
            status,
            headers,
            body,
            text: None,
            data: None,
        };

        match out.mime_type().as_deref() {
            _ if out.body.is_empty() => {}
            Some(mime) if mime == "application/json" || mime.ends_with("+json") => {
                match serde_json::from_slice(&out.body) {
                    Ok(data) => out.data = Some(data),
                    Err(e) => debug!(status = %status, error = %e, "Response body is not valid JSON"),
                }
            }
            Some(mime) if mime.starts_with("text/") => {
                out.text = Some(String::from_utf8_lossy(&out.body).into_owned());
            }
            _ => {}
        }

        Ok(out)
    }

    /// Media type without parameters, lowercased.
    #[must_use]
    pub fn mime_type(&self) -> Option<String> {
        let value = self.headers.get(CONTENT_TYPE)?.to_str().ok()?;
        let essence = value.split(';').next()?.trim();
        (!essence.is_empty()).then(|| essence.to_ascii_lowercase())
    }

    /// Deserialize the JSON body.
    ///
    /// # Errors
    /// Returns error if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}
