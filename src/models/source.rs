use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::source::{
    AuthMode, EndpointTemplate, NewSourceConfig as DomainNewSourceConfig,
    SourceConfig as DomainSourceConfig, SourceEndpoints,
};
use crate::domain::types::{BaseUrl, CurrencyCode, SourceName, SourceSlug, TypeConstraintError};

/// Diesel model representing the `sources` table.
#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::sources)]
pub struct Source {
    pub id: i32,
    pub slug: String,
    pub name: String,
    pub base_url: String,
    pub image_base_url: Option<String>,
    pub category_list_path: String,
    pub category_search_path: String,
    pub product_list_path: String,
    pub products_by_category_path: String,
    pub auth_mode: String,
    pub credentials: Option<String>,
    pub default_currency: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::sources)]
pub struct NewSource {
    pub slug: String,
    pub name: String,
    pub base_url: String,
    pub image_base_url: Option<String>,
    pub category_list_path: String,
    pub category_search_path: String,
    pub product_list_path: String,
    pub products_by_category_path: String,
    pub auth_mode: String,
    pub credentials: Option<String>,
    pub default_currency: Option<String>,
    pub is_active: bool,
}

/// Stored templates are validated again on load, so a row edited by hand
/// with a broken placeholder never reaches the fetcher.
impl TryFrom<Source> for DomainSourceConfig {
    type Error = TypeConstraintError;

    fn try_from(source: Source) -> Result<Self, Self::Error> {
        let endpoints = SourceEndpoints::new(
            BaseUrl::new(source.base_url)?,
            EndpointTemplate::plain(source.category_list_path)?,
            EndpointTemplate::plain(source.category_search_path)?,
            EndpointTemplate::plain(source.product_list_path)?,
            EndpointTemplate::with_category_id(source.products_by_category_path)?,
        )?;
        Ok(Self {
            id: source.id.try_into()?,
            slug: SourceSlug::new(source.slug)?,
            name: SourceName::new(source.name)?,
            endpoints,
            image_base_url: source
                .image_base_url
                .filter(|u| !u.trim().is_empty())
                .map(BaseUrl::new)
                .transpose()?,
            auth: AuthMode::from_parts(&source.auth_mode, source.credentials)?,
            default_currency: source
                .default_currency
                .filter(|c| !c.trim().is_empty())
                .map(CurrencyCode::new)
                .transpose()?,
            is_active: source.is_active,
            created_at: source.created_at,
            updated_at: source.updated_at,
        })
    }
}

impl From<&DomainNewSourceConfig> for NewSource {
    fn from(source: &DomainNewSourceConfig) -> Self {
        let endpoints = &source.endpoints;
        Self {
            slug: source.slug.as_str().to_string(),
            name: source.name.as_str().to_string(),
            base_url: endpoints.base_url().as_str().to_string(),
            image_base_url: source.image_base_url.as_ref().map(|u| u.as_str().to_string()),
            category_list_path: endpoints.category_listing_template().as_str().to_string(),
            category_search_path: endpoints.category_search_template().as_str().to_string(),
            product_list_path: endpoints.product_listing_template().as_str().to_string(),
            products_by_category_path: endpoints
                .products_by_category_template()
                .as_str()
                .to_string(),
            auth_mode: source.auth.as_str().to_string(),
            credentials: source.auth.credential().map(str::to_string),
            default_currency: source.default_currency.as_ref().map(|c| c.as_str().to_string()),
            is_active: source.is_active,
        }
    }
}
