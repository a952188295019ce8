//! Shared fixtures for service tests.
//!
//! Compiled for unit tests and, through the `test-util` feature, for the
//! integration tests under `tests/`.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::domain::source::{AuthMode, EndpointTemplate, SourceConfig, SourceEndpoints};
use crate::domain::task::{CategorySelector, ImportKind, ImportTask};
use crate::domain::types::{
    BaseUrl, CategoryId, CurrencyCode, SellerId, SourceName, SourceSlug, TaskName,
};
use crate::services::errors::TransportError;
use crate::services::fetcher::{HttpClient, HttpRequest, HttpResponse};

type Hook = Box<dyn Fn()>;

/// [`HttpClient`] answering from canned responses keyed by URL and recording
/// every request. Unknown URLs get a 404.
///
/// Responses can be registered through a shared reference, so a stub owned by
/// a test harness stays configurable between runs.
#[derive(Default)]
pub struct StubHttpClient {
    responses: RefCell<HashMap<String, Option<HttpResponse>>>,
    hooks: RefCell<HashMap<String, Hook>>,
    pub requests: RefCell<Vec<(String, Vec<(&'static str, String)>)>>,
}

impl StubHttpClient {
    fn insert(&self, url: &str, response: Option<HttpResponse>) -> &Self {
        self.responses.borrow_mut().insert(url.to_string(), response);
        self
    }

    pub fn json(&self, url: &str, body: serde_json::Value) -> &Self {
        self.bytes(url, "application/json", body.to_string().as_bytes())
    }

    pub fn bytes(&self, url: &str, content_type: &str, body: &[u8]) -> &Self {
        self.insert(
            url,
            Some(HttpResponse {
                status: 200,
                headers: HashMap::from([(
                    "content-type".to_string(),
                    content_type.to_string(),
                )]),
                body: body.to_vec(),
            }),
        )
    }

    /// A `200` JPEG image.
    pub fn image(&self, url: &str, body: &[u8]) -> &Self {
        self.bytes(url, "image/jpeg", body)
    }

    pub fn status(&self, url: &str, status: u16) -> &Self {
        self.insert(
            url,
            Some(HttpResponse {
                status,
                ..HttpResponse::default()
            }),
        )
    }

    /// Requests to `url` time out.
    pub fn timeout(&self, url: &str) -> &Self {
        self.insert(url, None)
    }

    /// Runs `hook` every time `url` is requested, before the response is
    /// produced.
    pub fn on_request(&self, url: &str, hook: impl Fn() + 'static) -> &Self {
        self.hooks
            .borrow_mut()
            .insert(url.to_string(), Box::new(hook));
        self
    }

    pub fn requested(&self, url: &str) -> bool {
        self.requests.borrow().iter().any(|(u, _)| u == url)
    }
}

impl HttpClient for StubHttpClient {
    fn get(&self, request: &HttpRequest<'_>) -> Result<HttpResponse, TransportError> {
        self.requests
            .borrow_mut()
            .push((request.url.to_string(), request.headers.clone()));
        if let Some(hook) = self.hooks.borrow().get(request.url) {
            hook();
        }
        match self.responses.borrow().get(request.url) {
            Some(Some(response)) => Ok(response.clone()),
            Some(None) => Err(TransportError::Timeout {
                url: request.url.to_string(),
            }),
            None => Ok(HttpResponse {
                status: 404,
                ..HttpResponse::default()
            }),
        }
    }
}

/// Source `acme` at `https://api.acme.test` with images on
/// `https://cdn.acme.test`.
pub fn source(auth: AuthMode) -> SourceConfig {
    let now = chrono::Utc::now().naive_utc();
    SourceConfig {
        id: 1.try_into().unwrap(),
        slug: SourceSlug::new("acme").unwrap(),
        name: SourceName::new("Acme").unwrap(),
        endpoints: SourceEndpoints::new(
            BaseUrl::new("https://api.acme.test").unwrap(),
            EndpointTemplate::plain("/categories").unwrap(),
            EndpointTemplate::plain("/categories/search").unwrap(),
            EndpointTemplate::plain("/products").unwrap(),
            EndpointTemplate::with_category_id("/categories/{category_id}/products").unwrap(),
        )
        .unwrap(),
        image_base_url: Some(BaseUrl::new("https://cdn.acme.test/").unwrap()),
        auth,
        default_currency: Some(CurrencyCode::new("USD").unwrap()),
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

pub fn task(
    kind: ImportKind,
    selector: CategorySelector,
    target_category_id: Option<CategoryId>,
) -> ImportTask {
    let now = chrono::Utc::now().naive_utc();
    ImportTask {
        id: 1.try_into().unwrap(),
        name: TaskName::new("acme import").unwrap(),
        source_config_id: 1.try_into().unwrap(),
        target_category_id,
        seller_id: SellerId::new(3).unwrap(),
        kind,
        selector,
        created_at: now,
        updated_at: now,
    }
}
