use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Request};
use std::time::Duration;

/// Status and body of a completed HTTP exchange.
///
/// Any status counts as completed; transport errors are reported separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Connection failed: {0}")]
    Connect(String),
    #[error("Request failed: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_builder() {
            TransportError::InvalidUrl(e.to_string())
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

/// Outbound HTTP used by the reputation lookup and the webhooks.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// GET expecting JSON, authorized with a bearer token.
    async fn get_json(&self, url: &str, bearer_token: &str) -> Result<HttpReply, TransportError>;

    /// POST a prebuilt JSON document.
    async fn post_json(&self, url: &str, body: String) -> Result<HttpReply, TransportError>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout_seconds: u64) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(concat!("phoneblock-screen/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    /// Reputation GET: bearer token plus `Accept: application/json`.
    pub fn lookup_request(&self, url: &str, bearer_token: &str) -> reqwest::Result<Request> {
        self.client
            .get(url)
            .bearer_auth(bearer_token)
            .header(ACCEPT, "application/json")
            .build()
    }

    pub fn webhook_request(&self, url: &str, body: String) -> reqwest::Result<Request> {
        self.client
            .post(url)
            .header(CONTENT_TYPE, "application/json; charset=utf-8")
            .body(body)
            .build()
    }

    async fn execute(&self, request: Request) -> Result<HttpReply, TransportError> {
        let response = self.client.execute(request).await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpReply { status, body })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get_json(&self, url: &str, bearer_token: &str) -> Result<HttpReply, TransportError> {
        let request = self.lookup_request(url, bearer_token)?;
        self.execute(request).await
    }

    async fn post_json(&self, url: &str, body: String) -> Result<HttpReply, TransportError> {
        let request = self.webhook_request(url, body)?;
        self.execute(request).await
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::AUTHORIZATION;

    #[test]
    fn test_success_range() {
        let ok = HttpReply {
            status: 204,
            body: String::new(),
        };
        let bad = HttpReply {
            status: 400,
            body: String::new(),
        };
        let redirect = HttpReply {
            status: 302,
            body: String::new(),
        };
        assert!(ok.is_success());
        assert!(!bad.is_success());
        assert!(!redirect.is_success());
    }

    #[test]
    fn test_client_builds_with_timeout() {
        assert!(ReqwestTransport::new(6).is_ok());
    }

    #[test]
    fn test_lookup_request_headers() {
        let transport = ReqwestTransport::new(6).unwrap();
        let request = transport
            .lookup_request("https://api.test/api/num/4989123?format=json", "secret-token")
            .unwrap();

        assert_eq!(request.method(), reqwest::Method::GET);
        assert_eq!(
            request.url().as_str(),
            "https://api.test/api/num/4989123?format=json"
        );
        let headers = request.headers();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer secret-token");
        assert_eq!(headers.get(ACCEPT).unwrap(), "application/json");
    }

    #[test]
    fn test_webhook_request_headers() {
        let transport = ReqwestTransport::new(6).unwrap();
        let request = transport
            .webhook_request("https://hooks.test/in", "{\"state\":\"blocked\"}".to_string())
            .unwrap();

        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(
            request.headers().get(CONTENT_TYPE).unwrap(),
            "application/json; charset=utf-8"
        );
        assert!(request.headers().get(AUTHORIZATION).is_none());
        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(body, br#"{"state":"blocked"}"#);
    }

    #[test]
    fn test_invalid_url_is_a_request_error() {
        let transport = ReqwestTransport::new(6).unwrap();
        let err = transport.lookup_request("not a url", "t").unwrap_err();
        assert!(matches!(
            TransportError::from(err),
            TransportError::InvalidUrl(_)
        ));
    }
}
