//! HTTP client options for alert delivery.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};

use crate::error::SentryError;
use crate::render::RunContext;

pub(crate) const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);
pub(crate) const DEFAULT_READ_IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);
pub(crate) const DEFAULT_POOL_IDLE_TIMEOUT: Duration = Duration::ZERO;
pub(crate) const DEFAULT_MAX_CONTENT_LENGTH: usize = 10 * 1024 * 1024;

/// Request charset, attached to the `Content-Type` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Charset {
    #[default]
    #[serde(rename = "utf-8")]
    Utf8,
    #[serde(rename = "utf-16")]
    Utf16,
    #[serde(rename = "iso-8859-1")]
    Latin1,
}

impl Charset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Utf16 => "utf-16",
            Self::Latin1 => "iso-8859-1",
        }
    }
}

/// Tuning knobs for the outbound request: timeouts, charset, headers and the
/// response size cap. Every field has a default, so an empty options object
/// always deserializes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestOptions {
    /// Socket connect timeout; when unset the transport default applies.
    pub connect_timeout: Option<Duration>,

    /// Bound on the total response wait.
    pub read_timeout: Duration,

    /// Closes a connection that stalls mid-read.
    pub read_idle_timeout: Duration,

    /// Idle lifetime in the connection pool.
    pub pool_idle_timeout: Duration,

    /// Upper bound for buffered response bytes.
    pub max_content_length: usize,

    /// Charset advertised on the request.
    pub default_charset: Charset,

    /// Header map, rendered against the run context before use.
    pub headers: HashMap<String, String>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            connect_timeout: None,
            read_timeout: DEFAULT_READ_TIMEOUT,
            read_idle_timeout: DEFAULT_READ_IDLE_TIMEOUT,
            pool_idle_timeout: DEFAULT_POOL_IDLE_TIMEOUT,
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            default_charset: Charset::Utf8,
            headers: HashMap::new(),
        }
    }
}

impl RequestOptions {
    fn apply(&self, mut builder: ClientBuilder) -> ClientBuilder {
        if let Some(connect) = self.connect_timeout {
            builder = builder.connect_timeout(connect);
        }
        builder
            .timeout(self.read_timeout)
            .read_timeout(self.read_idle_timeout)
            .pool_idle_timeout(self.pool_idle_timeout)
    }

    /// Render every header value against the run context and build the
    /// request header map in one pass (colliding names: last write wins).
    ///
    /// A single unresolved reference aborts the whole map; a partial header
    /// set is never sent.
    pub fn rendered_headers(&self, ctx: &RunContext) -> Result<HeaderMap, SentryError> {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let rendered = ctx.render(value)?;
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                SentryError::Configuration(format!("invalid header name `{name}`: {e}"))
            })?;
            let value = HeaderValue::from_str(&rendered).map_err(|e| {
                SentryError::Configuration(format!("invalid value for header `{name}`: {e}"))
            })?;
            map.insert(name, value);
        }
        Ok(map)
    }
}

/// Build the HTTP client. Absent options leave the transport untouched.
pub fn build_client(options: Option<&RequestOptions>) -> Result<Client, SentryError> {
    let builder = match options {
        Some(options) => options.apply(Client::builder()),
        None => Client::builder(),
    };
    Ok(builder.build()?)
}
