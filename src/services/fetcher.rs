//! Authenticated HTTP access to external catalog sources.

use std::collections::HashMap;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::domain::external::{CategoryListing, ProductPage};
use crate::domain::source::SourceConfig;
use crate::domain::types::ExternalId;
use crate::services::errors::TransportError;

/// Outbound GET request.
#[derive(Debug, Clone)]
pub struct HttpRequest<'a> {
    pub url: &'a str,
    pub headers: Vec<(&'static str, String)>,
    pub timeout: Duration,
}

/// Response of a GET request. Header names are lowercased.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Turns a non-2xx response into [`TransportError::Status`].
    pub fn error_for_status(self, url: &str) -> Result<Self, TransportError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(TransportError::Status {
                url: url.to_string(),
                status: self.status,
            })
        }
    }

    pub fn json<T: DeserializeOwned>(&self, url: &str) -> Result<T, TransportError> {
        serde_json::from_slice(&self.body).map_err(|e| TransportError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

/// Minimal blocking HTTP client used by the fetcher and the image acquirer.
pub trait HttpClient {
    fn get(&self, request: &HttpRequest<'_>) -> Result<HttpResponse, TransportError>;
}

/// [`HttpClient`] backed by `reqwest`.
#[derive(Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::blocking::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("pushkind-importer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Request {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestHttpClient {
    fn get(&self, request: &HttpRequest<'_>) -> Result<HttpResponse, TransportError> {
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                TransportError::Timeout {
                    url: request.url.to_string(),
                }
            } else {
                TransportError::Request {
                    url: request.url.to_string(),
                    message: e.to_string(),
                }
            }
        };

        let mut builder = self.client.get(request.url).timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }
        let response = builder.send().map_err(map_err)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.bytes().map_err(map_err)?.to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Performs authenticated GETs against one source.
pub struct RemoteFetcher<'a, C: HttpClient> {
    client: &'a C,
    source: &'a SourceConfig,
    timeout: Duration,
}

impl<'a, C: HttpClient> RemoteFetcher<'a, C> {
    pub fn new(client: &'a C, source: &'a SourceConfig, timeout: Duration) -> Self {
        Self {
            client,
            source,
            timeout,
        }
    }

    /// GET `url` with the source's auth header. Non-2xx responses are
    /// returned as is.
    pub fn fetch(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let request = HttpRequest {
            url,
            headers: self.source.auth.header().into_iter().collect(),
            timeout: self.timeout,
        };
        log::debug!("GET {url} (source {})", self.source.slug);
        self.client.get(&request)
    }

    fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, TransportError> {
        self.fetch(url)?.error_for_status(url)?.json(url)
    }

    /// The full flat category list of the source.
    pub fn fetch_category_listing(&self) -> Result<CategoryListing, TransportError> {
        self.fetch_json(&self.source.endpoints.category_listing())
    }

    /// Categories matching `query`, for picking a task's source category.
    pub fn search_categories(&self, query: &str) -> Result<CategoryListing, TransportError> {
        self.fetch_json(&self.source.endpoints.category_search(query))
    }

    /// One page of products of an external category.
    pub fn fetch_products_page(
        &self,
        category_id: &ExternalId,
        page: u32,
    ) -> Result<ProductPage, TransportError> {
        self.fetch_json(&self.source.endpoints.products_by_category(category_id, page))
    }

    /// One page of the unscoped product listing.
    pub fn fetch_product_listing(&self, page: u32) -> Result<ProductPage, TransportError> {
        self.fetch_json(&self.source.endpoints.product_listing(page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::source::AuthMode;
    use crate::services::fixtures::{source, StubHttpClient};

    #[test]
    fn adds_bearer_header() {
        let client = StubHttpClient::default();
        client.json("https://api.acme.test/categories", serde_json::json!({ "categories": [] }));
        let source = source(AuthMode::BearerToken("secret".into()));
        let fetcher = RemoteFetcher::new(&client, &source, Duration::from_secs(60));

        let listing = fetcher.fetch_category_listing().unwrap();
        assert!(listing.categories.is_empty());
        let requests = client.requests.borrow();
        assert_eq!(
            requests[0].1,
            vec![("Authorization", "Bearer secret".to_string())]
        );
    }

    #[test]
    fn sends_no_header_without_auth() {
        let client = StubHttpClient::default();
        let source = source(AuthMode::None);
        let fetcher = RemoteFetcher::new(&client, &source, Duration::from_secs(60));

        let response = fetcher.fetch("https://api.acme.test/anything").unwrap();
        assert_eq!(response.status, 404);
        assert!(client.requests.borrow()[0].1.is_empty());
    }

    #[test]
    fn non_success_status_is_a_transport_error_for_typed_fetches() {
        let client = StubHttpClient::default();
        client.status("https://api.acme.test/categories/7/products?page=1", 500);
        let source = source(AuthMode::ApiKey("k".into()));
        let fetcher = RemoteFetcher::new(&client, &source, Duration::from_secs(60));

        let err = fetcher
            .fetch_products_page(&ExternalId::new("7").unwrap(), 1)
            .unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 500, .. }));
        assert_eq!(
            client.requests.borrow()[0].1,
            vec![("X-API-Key", "k".to_string())]
        );
    }

    #[test]
    fn search_uses_query_parameter() {
        let client = StubHttpClient::default();
        client.json(
            "https://api.acme.test/categories/search?search=drills",
            serde_json::json!({ "categories": [{ "id": 1, "name": "Drills" }] }),
        );
        let source = source(AuthMode::None);
        let fetcher = RemoteFetcher::new(&client, &source, Duration::from_secs(60));

        let listing = fetcher.search_categories("drills").unwrap();
        assert_eq!(listing.categories.len(), 1);
    }

    #[test]
    fn undecodable_body_is_reported() {
        let client = StubHttpClient::default();
        client.bytes(
            "https://api.acme.test/products?page=2",
            "text/html",
            b"<html>",
        );
        let source = source(AuthMode::None);
        let fetcher = RemoteFetcher::new(&client, &source, Duration::from_secs(60));

        let err = fetcher.fetch_product_listing(2).unwrap_err();
        assert!(matches!(err, TransportError::Decode { .. }));
    }
}
