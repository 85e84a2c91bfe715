//! DSN parsing and store endpoint derivation.
//!
//! A DSN has the shape `scheme://public_key@host[:port]/project_id` and acts
//! as a pre-authenticated pointer to one project's ingestion endpoint.

use url::Url;

use crate::error::SentryError;

const SENTRY_PROTOCOL_VERSION: u8 = 7;

/// Parsed DSN components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dsn {
    pub scheme: String,
    pub public_key: String,
    pub host: String,
    pub port: Option<u16>,
    pub project_id: String,
}

impl Dsn {
    pub fn parse(input: &str) -> Result<Self, SentryError> {
        let url = Url::parse(input.trim())
            .map_err(|e| SentryError::Configuration(format!("invalid DSN: {e}")))?;

        let scheme = url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(SentryError::Configuration(format!(
                "DSN scheme must be http or https, got `{scheme}`"
            )));
        }

        let public_key = url.username();
        if public_key.is_empty() {
            return Err(SentryError::Configuration(
                "DSN is missing a public key".to_string(),
            ));
        }

        let host = url
            .host_str()
            .ok_or_else(|| SentryError::Configuration("DSN is missing a host".to_string()))?
            .to_string();

        let project_id = url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .ok_or_else(|| {
                SentryError::Configuration("DSN is missing a project id".to_string())
            })?
            .to_string();

        Ok(Self {
            scheme: scheme.to_string(),
            public_key: public_key.to_string(),
            host,
            port: url.port(),
            project_id,
        })
    }

    /// The `/store/` ingestion endpoint this DSN points at.
    pub fn store_endpoint(&self) -> String {
        let authority = match self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        };
        format!(
            "{}://{}/api/{}/store/?sentry_key={}&sentry_version={}",
            self.scheme, authority, self.project_id, self.public_key, SENTRY_PROTOCOL_VERSION
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_dsn() {
        let dsn = Dsn::parse("https://abc123@sentry.example.com/42").unwrap();
        assert_eq!(dsn.scheme, "https");
        assert_eq!(dsn.public_key, "abc123");
        assert_eq!(dsn.host, "sentry.example.com");
        assert_eq!(dsn.port, None);
        assert_eq!(dsn.project_id, "42");
    }

    #[test]
    fn derives_store_endpoint() {
        let dsn = Dsn::parse("https://abc123@sentry.example.com/42").unwrap();
        assert_eq!(
            dsn.store_endpoint(),
            "https://sentry.example.com/api/42/store/?sentry_key=abc123&sentry_version=7"
        );
    }

    #[test]
    fn keeps_explicit_port() {
        let dsn = Dsn::parse("http://key@127.0.0.1:9000/7").unwrap();
        assert_eq!(dsn.port, Some(9000));
        assert_eq!(
            dsn.store_endpoint(),
            "http://127.0.0.1:9000/api/7/store/?sentry_key=key&sentry_version=7"
        );
    }

    #[test]
    fn rejects_missing_public_key() {
        let err = Dsn::parse("https://sentry.example.com/42").unwrap_err();
        assert!(matches!(err, SentryError::Configuration(msg) if msg.contains("public key")));
    }

    #[test]
    fn rejects_missing_project_id() {
        let err = Dsn::parse("https://abc123@sentry.example.com/").unwrap_err();
        assert!(matches!(err, SentryError::Configuration(msg) if msg.contains("project id")));
    }

    #[test]
    fn rejects_non_http_scheme() {
        let err = Dsn::parse("ftp://abc123@sentry.example.com/42").unwrap_err();
        assert!(matches!(err, SentryError::Configuration(msg) if msg.contains("scheme")));
    }

    #[test]
    fn rejects_garbage() {
        assert!(Dsn::parse("not a dsn").is_err());
    }
}
