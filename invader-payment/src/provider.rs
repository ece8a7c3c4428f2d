//! Acquirer status trait and the shared HTTP client

use crate::error::{PaymentError, PaymentResult};
use crate::types::{PaymentTransaction, TransactionState};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use url::Url;

/// Default timeout of outbound acquirer calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Transaction status as reported by the acquirer
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub state: TransactionState,
    /// Acquirer message worth keeping on the transaction (decline reason)
    pub message: Option<String>,
}

impl StatusUpdate {
    pub fn new(state: TransactionState) -> Self {
        Self {
            state,
            message: None,
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Re-queries an acquirer about a transaction.
///
/// Notifications only say "something changed"; the state applied comes
/// from this call, never from the notification payload.
#[async_trait]
pub trait TransactionStatusProvider: Send + Sync {
    /// Provider tag (`pagseguro`, `bacenpix`)
    fn name(&self) -> &'static str;

    async fn check_transaction(&self, transaction: &PaymentTransaction)
    -> PaymentResult<StatusUpdate>;
}

/// Common HTTP client for acquirers
pub struct ProviderClient {
    client: reqwest::Client,
    base_url: Url,
    bearer: Option<SecretString>,
}

impl ProviderClient {
    pub fn new(base_url: &str, timeout: Duration) -> PaymentResult<Self> {
        // Url::join drops the last segment unless the base ends with a slash
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalized).map_err(|e| {
            PaymentError::Configuration(format!("invalid acquirer URL {}: {}", base_url, e))
        })?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PaymentError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            bearer: None,
        })
    }

    /// Send `token` as bearer credentials on every request
    pub fn with_bearer(mut self, token: SecretString) -> Self {
        self.bearer = Some(token);
        self
    }

    /// Absolute URL of `path` under the base URL
    pub fn url(&self, path: &str) -> PaymentResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| PaymentError::Configuration(format!("invalid path {}: {}", path, e)))
    }

    /// Request builder with the client's credentials applied
    pub fn request(
        &self,
        method: reqwest::Method,
        path: &str,
    ) -> PaymentResult<reqwest::RequestBuilder> {
        let builder = self.client.request(method, self.url(path)?);
        Ok(match &self.bearer {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        })
    }

    /// Raw client, for calls outside the base URL (OAuth endpoints)
    pub fn http(&self) -> &reqwest::Client {
        &self.client
    }

    /// GET request
    pub async fn get(&self, path: &str) -> PaymentResult<reqwest::Response> {
        Ok(self.request(reqwest::Method::GET, path)?.send().await?)
    }

    /// POST request with JSON body
    pub async fn post<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> PaymentResult<reqwest::Response> {
        Ok(self
            .request(reqwest::Method::POST, path)?
            .json(body)
            .send()
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_url_join_keeps_base_path() {
        let client = ProviderClient::new("https://api.example.com/pix/v2", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(
            client.url("/cob/abc").unwrap().as_str(),
            "https://api.example.com/pix/v2/cob/abc"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            ProviderClient::new("not a url", DEFAULT_TIMEOUT),
            Err(PaymentError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_bearer_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/charges/CHAR_1"))
            .and(header("authorization", "Bearer secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "CHAR_1"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = ProviderClient::new(&server.uri(), DEFAULT_TIMEOUT)
            .unwrap()
            .with_bearer(SecretString::from("secret-token".to_string()));
        let response = client.get("/charges/CHAR_1").await.unwrap();
        assert!(response.status().is_success());
    }
}
