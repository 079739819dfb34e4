use crate::{
    api::{SandboxApi, SnapshotApi},
    config::Config,
    error::{Error, Result},
};
use reqwest::{header, Client as HttpClient, Response, StatusCode};
use std::fmt;
use std::time::Duration;
use tracing::debug;
use url::Url;

const USER_AGENT: &str = concat!("daytona-rust-sdk/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct Client {
    http: HttpClient,
    config: Config,
}

impl Client {
    pub fn new() -> Result<Self> {
        let config = Config::new()?;
        Self::with_config(config)
    }

    pub fn with_api_key(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(Config::with_api_key(api_key))
    }

    pub fn with_config(mut config: Config) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::ApiKeyNotFound);
        }

        let api_url = Url::parse(&config.api_url)?;
        config.api_url = api_url.as_str().trim_end_matches('/').to_string();

        let mut headers = header::HeaderMap::new();

        let auth = header::HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| Error::Configuration("Invalid API key format".to_string()))?;
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert("X-Daytona-Source", header::HeaderValue::from_static("rust-sdk"));
        headers.insert(header::USER_AGENT, header::HeaderValue::from_static(USER_AGENT));

        if let Some(org) = &config.organization_id {
            let value = header::HeaderValue::from_str(org)
                .map_err(|_| Error::Configuration("Invalid organization id".to_string()))?;
            headers.insert("X-Daytona-Organization-ID", value);
        }

        let mut builder = HttpClient::builder().default_headers(headers);
        if config.timeout_seconds > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_seconds));
        }
        let http = builder.build()?;

        debug!("Daytona client initialized with API URL: {}", config.api_url);

        Ok(Self { http, config })
    }

    pub fn snapshot(&self) -> SnapshotApi {
        SnapshotApi::new(self.clone())
    }

    pub fn sandbox(&self) -> SandboxApi {
        SandboxApi::new(self.clone())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn http(&self) -> &HttpClient {
        &self.http
    }

    pub(crate) fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url, path)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Turns a non-success response into an [`Error`]. `what` names the resource
/// for 404s.
pub(crate) async fn error_from_response(response: Response, what: &str) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    error_from_parts(status, &body, what)
}

fn error_from_parts(status: StatusCode, body: &str, what: &str) -> Error {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Authentication(message),
        StatusCode::NOT_FOUND => Error::NotFound(what.to_string()),
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimit,
        status => Error::Api {
            status: status.as_u16(),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_message_is_extracted() {
        let err = error_from_parts(
            StatusCode::BAD_REQUEST,
            r#"{"statusCode":400,"message":"Snapshot name already exists"}"#,
            "Snapshot x",
        );
        match err {
            Error::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Snapshot name already exists");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn plain_body_is_kept_verbatim() {
        let err = error_from_parts(StatusCode::BAD_GATEWAY, "upstream down", "x");
        assert!(matches!(err, Error::Api { status: 502, ref message } if message == "upstream down"));
    }

    #[test]
    fn status_codes_map_to_variants() {
        assert!(matches!(
            error_from_parts(StatusCode::UNAUTHORIZED, "", "x"),
            Error::Authentication(_)
        ));
        assert!(matches!(
            error_from_parts(StatusCode::FORBIDDEN, "", "x"),
            Error::Authentication(_)
        ));
        assert!(matches!(
            error_from_parts(StatusCode::NOT_FOUND, "", "Sandbox abc"),
            Error::NotFound(ref what) if what == "Sandbox abc"
        ));
        assert!(matches!(
            error_from_parts(StatusCode::TOO_MANY_REQUESTS, "", "x"),
            Error::RateLimit
        ));
    }

    #[test]
    fn empty_key_is_rejected() {
        let config = Config::with_api_key("x").api_url("https://app.daytona.io/api");
        let config = Config { api_key: String::new(), ..config };
        assert!(matches!(Client::with_config(config), Err(Error::ApiKeyNotFound)));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let config = Config::with_api_key("key").api_url("http://localhost:3000/api/");
        let client = Client::with_config(config).unwrap();
        assert_eq!(client.build_url("/snapshots"), "http://localhost:3000/api/snapshots");
    }

    #[test]
    fn bad_url_is_rejected() {
        let config = Config::with_api_key("key").api_url("not a url");
        assert!(matches!(Client::with_config(config), Err(Error::Url(_))));
    }

    #[test]
    fn debug_output_hides_the_key() {
        let client = Client::with_config(Config::with_api_key("dtn_secret_value")).unwrap();
        let printed = format!("{:?}", client);
        assert!(printed.starts_with("Client"));
        assert!(!printed.contains("dtn_secret_value"));
    }
}
