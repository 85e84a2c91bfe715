//! Single-shot event delivery over HTTP.

use futures_util::StreamExt;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Client, Response};
use tracing::{debug, info, warn};

use crate::dsn::Dsn;
use crate::error::SentryError;
use crate::options::{build_client, Charset, RequestOptions, DEFAULT_MAX_CONTENT_LENGTH};

/// Posts assembled payloads to a DSN-derived store endpoint.
///
/// One sender serves one task invocation; there is no retry and no state
/// shared between invocations.
pub struct AlertSender {
    client: Client,
    charset: Charset,
    max_content_length: usize,
}

impl AlertSender {
    pub fn new(options: Option<&RequestOptions>) -> Result<Self, SentryError> {
        let client = build_client(options)?;
        let (charset, max_content_length) = match options {
            Some(options) => (options.default_charset, options.max_content_length),
            None => (Charset::default(), DEFAULT_MAX_CONTENT_LENGTH),
        };
        Ok(Self {
            client,
            charset,
            max_content_length,
        })
    }

    /// POST the payload once. Non-2xx responses and transport failures both
    /// surface as errors carrying whatever the endpoint returned.
    pub async fn send(
        &self,
        dsn: &Dsn,
        payload: String,
        headers: HeaderMap,
    ) -> Result<(), SentryError> {
        let endpoint = dsn.store_endpoint();
        debug!(endpoint = %endpoint, bytes = payload.len(), "posting event");

        let response = self
            .client
            .post(&endpoint)
            .header(
                CONTENT_TYPE,
                format!("application/json; charset={}", self.charset.as_str()),
            )
            .headers(headers)
            .body(payload)
            .send()
            .await?;

        let status = response.status();
        let body = self.read_body(response).await?;

        if status.is_success() {
            info!(status = status.as_u16(), project = %dsn.project_id, "event accepted");
            Ok(())
        } else {
            warn!(status = status.as_u16(), body = %body, "event rejected");
            Err(SentryError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }

    /// Drain the response body with a hard size cap, so a misbehaving
    /// endpoint cannot make us buffer unbounded data.
    async fn read_body(&self, response: Response) -> Result<String, SentryError> {
        if let Some(length) = response.content_length() {
            if length > self.max_content_length as u64 {
                return Err(SentryError::ResponseTooLarge {
                    limit: self.max_content_length,
                });
            }
        }

        let mut buf: Vec<u8> = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if buf.len() + chunk.len() > self.max_content_length {
                return Err(SentryError::ResponseTooLarge {
                    limit: self.max_content_length,
                });
            }
            buf.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
