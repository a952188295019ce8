use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::domain::types::{
    BaseUrl, CurrencyCode, ExternalId, SourceConfigId, SourceName, SourceSlug, TypeConstraintError,
};

/// Placeholder substituted with an external category id.
pub const CATEGORY_ID_PLACEHOLDER: &str = "{category_id}";

/// How requests to a source are authenticated.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", content = "credential", rename_all = "snake_case")]
pub enum AuthMode {
    None,
    /// Sent as `X-API-Key: <key>`.
    ApiKey(String),
    /// Sent as `Authorization: Bearer <token>`.
    BearerToken(String),
}

impl AuthMode {
    /// String representation used in persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ApiKey(_) => "api_key",
            Self::BearerToken(_) => "bearer_token",
        }
    }

    /// Rebuilds the mode from its persisted name and credential blob.
    pub fn from_parts(mode: &str, credential: Option<String>) -> Result<Self, TypeConstraintError> {
        let credential = credential.map(|c| c.trim().to_string());
        match (mode.trim(), credential) {
            ("none", _) => Ok(Self::None),
            ("api_key", Some(key)) if !key.is_empty() => Ok(Self::ApiKey(key)),
            ("bearer_token", Some(token)) if !token.is_empty() => Ok(Self::BearerToken(token)),
            ("api_key" | "bearer_token", _) => Err(TypeConstraintError::EmptyString("credential")),
            (other, _) => Err(TypeConstraintError::InvalidValue(format!(
                "auth mode: {other}"
            ))),
        }
    }

    /// Credential blob stored alongside the mode.
    pub fn credential(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::ApiKey(value) | Self::BearerToken(value) => Some(value.as_str()),
        }
    }

    /// The single header this mode adds to every request, if any.
    pub fn header(&self) -> Option<(&'static str, String)> {
        match self {
            Self::None => None,
            Self::ApiKey(key) => Some(("X-API-Key", key.clone())),
            Self::BearerToken(token) => Some(("Authorization", format!("Bearer {token}"))),
        }
    }
}

/// An endpoint path appended to a source base URL.
///
/// Placeholders are checked when the template is built, so a malformed
/// template is rejected when the source is configured rather than when a
/// request is made.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct EndpointTemplate(String);

impl EndpointTemplate {
    /// A template that must not contain any placeholder.
    pub fn plain<S: Into<String>>(value: S) -> Result<Self, TypeConstraintError> {
        let value = value.into().trim().to_string();
        if value.contains('{') || value.contains('}') {
            return Err(TypeConstraintError::InvalidTemplate {
                template: value,
                reason: "placeholders are not allowed here",
            });
        }
        Ok(Self(value))
    }

    /// A template that must contain `{category_id}` exactly once and no other
    /// placeholder.
    pub fn with_category_id<S: Into<String>>(value: S) -> Result<Self, TypeConstraintError> {
        let value = value.into().trim().to_string();
        if value.matches(CATEGORY_ID_PLACEHOLDER).count() != 1 {
            return Err(TypeConstraintError::InvalidTemplate {
                template: value,
                reason: "must contain {category_id} exactly once",
            });
        }
        let rest = value.replace(CATEGORY_ID_PLACEHOLDER, "");
        if rest.contains('{') || rest.contains('}') {
            return Err(TypeConstraintError::InvalidTemplate {
                template: value,
                reason: "unknown placeholder",
            });
        }
        Ok(Self(value))
    }

    /// Borrow the raw template.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn has_category_placeholder(&self) -> bool {
        self.0.contains(CATEGORY_ID_PLACEHOLDER)
    }
}

impl Display for EndpointTemplate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The four endpoint templates of a source together with its base URL.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct SourceEndpoints {
    base_url: BaseUrl,
    category_listing: EndpointTemplate,
    category_search: EndpointTemplate,
    product_listing: EndpointTemplate,
    products_by_category: EndpointTemplate,
}

impl SourceEndpoints {
    pub fn new(
        base_url: BaseUrl,
        category_listing: EndpointTemplate,
        category_search: EndpointTemplate,
        product_listing: EndpointTemplate,
        products_by_category: EndpointTemplate,
    ) -> Result<Self, TypeConstraintError> {
        for template in [&category_listing, &category_search, &product_listing] {
            if template.has_category_placeholder() {
                return Err(TypeConstraintError::InvalidTemplate {
                    template: template.to_string(),
                    reason: "placeholders are not allowed here",
                });
            }
        }
        if !products_by_category.has_category_placeholder() {
            return Err(TypeConstraintError::InvalidTemplate {
                template: products_by_category.to_string(),
                reason: "must contain {category_id} exactly once",
            });
        }
        Ok(Self {
            base_url,
            category_listing,
            category_search,
            product_listing,
            products_by_category,
        })
    }

    pub fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    pub fn category_listing_template(&self) -> &EndpointTemplate {
        &self.category_listing
    }

    pub fn category_search_template(&self) -> &EndpointTemplate {
        &self.category_search
    }

    pub fn product_listing_template(&self) -> &EndpointTemplate {
        &self.product_listing
    }

    pub fn products_by_category_template(&self) -> &EndpointTemplate {
        &self.products_by_category
    }

    fn join(&self, template: &EndpointTemplate) -> String {
        format!("{}{}", self.base_url.as_str(), template.as_str())
    }

    /// URL of the full category listing.
    pub fn category_listing(&self) -> String {
        self.join(&self.category_listing)
    }

    /// URL of the category search endpoint for `query`.
    pub fn category_search(&self, query: &str) -> String {
        with_query_param(&self.join(&self.category_search), "search", query)
    }

    /// URL of one page of the unscoped product listing.
    pub fn product_listing(&self, page: u32) -> String {
        with_query_param(&self.join(&self.product_listing), "page", &page.to_string())
    }

    /// URL of one page of products belonging to an external category.
    pub fn products_by_category(&self, category_id: &ExternalId, page: u32) -> String {
        let encoded: String =
            url::form_urlencoded::byte_serialize(category_id.as_str().as_bytes()).collect();
        let path = self
            .products_by_category
            .as_str()
            .replace(CATEGORY_ID_PLACEHOLDER, &encoded);
        let url = format!("{}{}", self.base_url.as_str(), path);
        with_query_param(&url, "page", &page.to_string())
    }
}

fn with_query_param(url: &str, key: &str, value: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    let mut pair = url::form_urlencoded::Serializer::new(String::new());
    pair.append_pair(key, value);
    format!("{url}{separator}{}", pair.finish())
}

/// An external catalog API the importer can pull from.
#[derive(Clone, Debug, Serialize)]
pub struct SourceConfig {
    pub id: SourceConfigId,
    pub slug: SourceSlug,
    pub name: SourceName,
    pub endpoints: SourceEndpoints,
    /// Base used to resolve relative image paths. Falls back to the API base
    /// URL when absent.
    pub image_base_url: Option<BaseUrl>,
    pub auth: AuthMode,
    pub default_currency: Option<CurrencyCode>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl SourceConfig {
    /// Base URL for resolving relative image paths.
    pub fn asset_base_url(&self) -> &str {
        self.image_base_url
            .as_ref()
            .unwrap_or(self.endpoints.base_url())
            .as_str()
    }
}

/// Data required to register a new [`SourceConfig`].
#[derive(Clone, Debug, Serialize)]
pub struct NewSourceConfig {
    pub slug: SourceSlug,
    pub name: SourceName,
    pub endpoints: SourceEndpoints,
    pub image_base_url: Option<BaseUrl>,
    pub auth: AuthMode,
    pub default_currency: Option<CurrencyCode>,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> SourceEndpoints {
        SourceEndpoints::new(
            BaseUrl::new("https://api.acme.test").unwrap(),
            EndpointTemplate::plain("/v1/categories").unwrap(),
            EndpointTemplate::plain("/v1/categories/search").unwrap(),
            EndpointTemplate::plain("/v1/products").unwrap(),
            EndpointTemplate::with_category_id("/v1/categories/{category_id}/products").unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn substitutes_category_id_and_page() {
        let url = endpoints().products_by_category(&ExternalId::new("42").unwrap(), 3);
        assert_eq!(url, "https://api.acme.test/v1/categories/42/products?page=3");
        assert!(!url.contains(CATEGORY_ID_PLACEHOLDER));
    }

    #[test]
    fn encodes_category_id() {
        let url = endpoints().products_by_category(&ExternalId::new("a b/c").unwrap(), 1);
        assert_eq!(url, "https://api.acme.test/v1/categories/a+b%2Fc/products?page=1");
    }

    #[test]
    fn appends_to_existing_query() {
        let endpoints = SourceEndpoints::new(
            BaseUrl::new("https://api.acme.test").unwrap(),
            EndpointTemplate::plain("/categories?lang=en").unwrap(),
            EndpointTemplate::plain("/categories/search?lang=en").unwrap(),
            EndpointTemplate::plain("/products?lang=en").unwrap(),
            EndpointTemplate::with_category_id("/products?category={category_id}").unwrap(),
        )
        .unwrap();
        assert_eq!(
            endpoints.category_search("power tools"),
            "https://api.acme.test/categories/search?lang=en&search=power+tools"
        );
        assert_eq!(
            endpoints.products_by_category(&ExternalId::new("7").unwrap(), 2),
            "https://api.acme.test/products?category=7&page=2"
        );
        assert_eq!(
            endpoints.category_listing(),
            "https://api.acme.test/categories?lang=en"
        );
    }

    #[test]
    fn rejects_malformed_templates() {
        assert!(EndpointTemplate::with_category_id("/products").is_err());
        assert!(EndpointTemplate::with_category_id("/c/{category_id}/{category_id}").is_err());
        assert!(EndpointTemplate::with_category_id("/c/{category_id}/{page}").is_err());
        assert!(EndpointTemplate::plain("/c/{category_id}").is_err());
    }

    #[test]
    fn auth_mode_builds_exactly_one_header() {
        assert_eq!(AuthMode::None.header(), None);
        assert_eq!(
            AuthMode::ApiKey("k".into()).header(),
            Some(("X-API-Key", "k".to_string()))
        );
        assert_eq!(
            AuthMode::BearerToken("t".into()).header(),
            Some(("Authorization", "Bearer t".to_string()))
        );
    }

    #[test]
    fn auth_mode_round_trips_through_parts() {
        let mode = AuthMode::from_parts("bearer_token", Some("secret".into())).unwrap();
        assert_eq!(mode.as_str(), "bearer_token");
        assert_eq!(mode.credential(), Some("secret"));
        assert!(AuthMode::from_parts("api_key", None).is_err());
        assert!(AuthMode::from_parts("oauth", None).is_err());
    }
}
