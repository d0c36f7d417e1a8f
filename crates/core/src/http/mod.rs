//! Request and response snapshots seen by the worker.
//!
//! These are deliberately small: the worker only needs the method, URL,
//! a handful of headers and the destination to route a request, and a
//! status/headers/body triple to store a response.

pub mod url;

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use ::url::Url;

pub use self::url::{UrlError, canonicalize};

use crate::Error;

/// HTTP request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    /// Only GET requests are ever cached.
    pub fn is_retrieval(&self) -> bool {
        matches!(self, Method::Get)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "OPTIONS" => Ok(Method::Options),
            other => Err(Error::InvalidInput(format!("unsupported method: {other}"))),
        }
    }
}

/// What the page intends to do with the response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Script,
    Style,
    Image,
    Font,
    Manifest,
    #[default]
    Empty,
}

impl Destination {
    /// Documents are the only destination a browser navigates to.
    pub fn is_navigable(&self) -> bool {
        matches!(self, Destination::Document)
    }
}

impl FromStr for Destination {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "document" => Ok(Destination::Document),
            "script" => Ok(Destination::Script),
            "style" => Ok(Destination::Style),
            "image" => Ok(Destination::Image),
            "font" => Ok(Destination::Font),
            "manifest" => Ok(Destination::Manifest),
            "" | "empty" => Ok(Destination::Empty),
            other => Err(Error::InvalidInput(format!("unsupported destination: {other}"))),
        }
    }
}

/// Origin classification of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin response.
    Basic,
    /// Cross-origin response readable through CORS.
    Cors,
    /// Cross-origin response whose contents are hidden.
    Opaque,
    /// Network error placeholder.
    Error,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Basic => "basic",
            ResponseType::Cors => "cors",
            ResponseType::Opaque => "opaque",
            ResponseType::Error => "error",
        }
    }
}

impl FromStr for ResponseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(ResponseType::Basic),
            "cors" => Ok(ResponseType::Cors),
            "opaque" => Ok(ResponseType::Opaque),
            "error" => Ok(ResponseType::Error),
            other => Err(Error::InvalidInput(format!("unknown response type: {other}"))),
        }
    }
}

/// Lookup key for a stored entry: method plus fragment-free URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestKey {
    pub method: Method,
    pub url: String,
}

impl RequestKey {
    pub fn new(method: Method, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self { method, url: url.to_string() }
    }
}

/// An outgoing request from a controlled page.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub destination: Destination,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, headers: Vec::new(), destination: Destination::Empty }
    }

    /// A plain GET for a subresource.
    pub fn get(url: Url) -> Self {
        Self::new(Method::Get, url)
    }

    /// A top-level navigation, as a browser would issue it.
    pub fn navigate(url: Url) -> Self {
        Self::get(url)
            .with_destination(Destination::Document)
            .with_header("accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn accept(&self) -> Option<&str> {
        self.header("accept")
    }

    /// Whether the Accept header asks for an HTML document.
    pub fn accepts_html(&self) -> bool {
        self.accept().is_some_and(|a| a.to_ascii_lowercase().contains("text/html"))
    }

    pub fn key(&self) -> RequestKey {
        RequestKey::new(self.method, &self.url)
    }
}

/// A response snapshot: status, headers and body bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub response_type: ResponseType,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, headers: Vec::new(), body: body.into(), response_type: ResponseType::Basic }
    }

    /// Empty-bodied 503, the worker's universal "nothing to give you".
    pub fn service_unavailable() -> Self {
        Self::new(503, Bytes::new())
    }

    pub fn html(status: u16, body: impl Into<Bytes>) -> Self {
        Self::new(status, body).with_header("content-type", "text/html; charset=utf-8")
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    pub fn with_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// 2xx status.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Only same-origin 200s are ever persisted.
    pub fn is_storable(&self) -> bool {
        self.status == 200 && self.response_type == ResponseType::Basic
    }
}
